use plsdraw_core::{BackendError, ImageData, ImageFormat};
use std::{
    marker::PhantomData,
    ops::{Deref, Index, IndexMut},
};

/// A `width x height` image of `0xAARRGGBB` pixels, not premultiplied.
#[derive(Clone, Debug, Default)]
pub struct Buffer {
    data: Box<[u32]>,
    width: usize,
    height: usize,
}

/// A borrowed, possibly strided, view into a [`Buffer`].
#[derive(Clone, Copy)]
pub struct BufferRef<'a> {
    data: *const u32,
    width: usize,
    height: usize,
    stride: usize,
    phantom: PhantomData<&'a [u32]>,
}

pub struct BufferMut<'a>(BufferRef<'a>);

// SAFETY: a BufferRef is a shared borrow of u32s
unsafe impl Send for BufferRef<'_> {}
unsafe impl Sync for BufferRef<'_> {}

impl Buffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0; width * height].into_boxed_slice(),
            width,
            height,
        }
    }

    /// Resize, keeping the pixel data only where rows happen to line up.
    pub fn resize(&mut self, width: usize, height: usize) {
        let mut data = std::mem::take(&mut self.data).into_vec();
        data.resize(width * height, 0);
        self.data = data.into_boxed_slice();
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn fill(&mut self, color: u32) {
        self.data.fill(color);
    }

    pub fn pixels(&self) -> &[u32] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    /// The pixels as tightly packed RGBA8, e.g. for saving a png.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.data
            .iter()
            .flat_map(|&color| {
                let (a, r, g, b) = unpack_argb(color);
                [r, g, b, a]
            })
            .collect()
    }

    pub fn as_ref(&self) -> BufferRef<'_> {
        BufferRef::from_slice(&self.data, self.width, self.height)
    }

    pub fn as_mut(&mut self) -> BufferMut<'_> {
        BufferMut::from_slice(&mut self.data, self.width, self.height)
    }
}

impl TryFrom<ImageData<'_>> for Buffer {
    type Error = BackendError;

    fn try_from(data: ImageData) -> Result<Self, Self::Error> {
        let bpp = data.format.bytes_per_pixel();
        let expected = data.width as usize * data.height as usize * bpp;
        if data.data.len() != expected {
            return Err(BackendError::InvalidImage(format!(
                "{:?} data length {} != {} ({}x{}x{bpp})",
                data.format,
                data.data.len(),
                expected,
                data.width,
                data.height
            )));
        }

        let mut buffer = Self::new(data.width as usize, data.height as usize);
        for (pixel, texel) in buffer.data.iter_mut().zip(data.data.chunks_exact(bpp)) {
            *pixel = match data.format {
                ImageFormat::RGBA8 => pack_argb(texel[3], texel[0], texel[1], texel[2]),
                ImageFormat::RGB8 => pack_argb(0xff, texel[0], texel[1], texel[2]),
                ImageFormat::R8 => pack_argb(0xff, texel[0], 0, 0),
            };
        }

        Ok(buffer)
    }
}

impl<'a> BufferRef<'a> {
    pub fn from_slice(data: &'a [u32], width: usize, height: usize) -> Self {
        Self {
            data: data.as_ptr(),
            width,
            height,
            stride: width,
            phantom: PhantomData,
        }
    }

    pub fn into_raw_parts(self) -> (*const u32, usize, usize, usize) {
        (self.data, self.width, self.height, self.stride)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn subregion(&self, x: usize, y: usize, width: usize, height: usize) -> Self {
        let width = width.min(self.width.saturating_sub(x));
        let height = height.min(self.height.saturating_sub(y));

        Self {
            data: if width == 0 || height == 0 {
                std::ptr::null()
            } else {
                // SAFETY: (x, y) is inside the buffer
                unsafe { self.data.add(y * self.stride + x) }
            },

            width,
            height,
            stride: self.stride,
            phantom: PhantomData,
        }
    }

    fn clamped(&self, x: isize, y: isize) -> u32 {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self[(x, y)]
    }

    /// Bilinear sample at texel coordinates (texel centers at `+0.5`), clamped to the edges.
    ///
    /// Returns premultiplied `[r, g, b, a]` in `0..=1`.
    pub fn sample(&self, x: f32, y: f32) -> [f32; 4] {
        if self.width == 0 || self.height == 0 || !(x.is_finite() && y.is_finite()) {
            return [0.0; 4];
        }

        let x = x - 0.5;
        let y = y - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as isize, y0 as isize);

        let p00 = crate::blend::unpack_premultiplied(self.clamped(x0, y0));
        let p10 = crate::blend::unpack_premultiplied(self.clamped(x0 + 1, y0));
        let p01 = crate::blend::unpack_premultiplied(self.clamped(x0, y0 + 1));
        let p11 = crate::blend::unpack_premultiplied(self.clamped(x0 + 1, y0 + 1));

        std::array::from_fn(|i| {
            let a = p00[i] + (p10[i] - p00[i]) * fx;
            let b = p01[i] + (p11[i] - p01[i]) * fx;
            a + (b - a) * fy
        })
    }

    /// Sample one row, interpolating horizontally only.
    pub fn sample_row(&self, x: f32, row: usize) -> [f32; 4] {
        if self.height == 0 {
            return [0.0; 4];
        }

        self.sample(x, row.min(self.height - 1) as f32 + 0.5)
    }
}

impl<'a> BufferMut<'a> {
    pub fn from_slice(data: &'a mut [u32], width: usize, height: usize) -> Self {
        Self(BufferRef {
            data: data.as_mut_ptr(),
            width,
            height,
            stride: width,
            phantom: PhantomData,
        })
    }

    /// # Safety
    /// `data` must point to `height` rows of `stride` pixels that outlive `'a` and that nothing else
    /// writes to within `width` columns.
    pub unsafe fn from_raw_parts(data: *mut u32, width: usize, height: usize, stride: usize) -> Self {
        Self(BufferRef {
            data,
            width,
            height,
            stride,
            phantom: PhantomData,
        })
    }

    pub fn into_raw_parts(self) -> (*mut u32, usize, usize, usize) {
        (self.0.data as *mut u32, self.0.width, self.0.height, self.0.stride)
    }

    pub fn subregion_mut(&mut self, x: usize, y: usize, width: usize, height: usize) -> Self {
        Self(self.subregion(x, y, width, height))
    }
}

impl Index<(usize, usize)> for BufferRef<'_> {
    type Output = u32;

    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        assert!(x < self.width);
        assert!(y < self.height);

        // SAFETY: bounds checked above
        unsafe { &*self.data.add(y * self.stride + x) }
    }
}

impl Index<(usize, usize)> for BufferMut<'_> {
    type Output = u32;

    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.0[(x, y)]
    }
}

impl IndexMut<(usize, usize)> for BufferMut<'_> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        assert!(x < self.0.width);
        assert!(y < self.0.height);

        // SAFETY: bounds checked above, and a BufferMut is the only writer of its region
        unsafe { &mut *(self.0.data as *mut u32).add(y * self.0.stride + x) }
    }
}

impl<'a> Deref for BufferMut<'a> {
    type Target = BufferRef<'a>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for BufferRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BufferRef({}x{})", self.width, self.height)
    }
}

impl Default for BufferRef<'_> {
    fn default() -> Self {
        Self::from_slice(&[], 0, 0)
    }
}

#[inline(always)]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | (b as u32)
}

/// `(a, r, g, b)`
#[inline(always)]
pub fn unpack_argb(color: u32) -> (u8, u8, u8, u8) {
    (
        (color >> 24) as u8,
        ((color >> 16) & 0xff) as u8,
        ((color >> 8) & 0xff) as u8,
        (color & 0xff) as u8,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_image_data() {
        let rgb = [10, 20, 30, 40, 50, 60];
        let buffer = Buffer::try_from(ImageData {
            width: 2,
            height: 1,
            format: ImageFormat::RGB8,
            data: &rgb,
        })
        .unwrap();
        assert_eq!(buffer.pixel(1, 0), Some(0xff28_323c));
        assert_eq!(buffer.to_rgba8(), vec![10, 20, 30, 255, 40, 50, 60, 255]);

        let err = Buffer::try_from(ImageData {
            width: 3,
            height: 1,
            format: ImageFormat::RGBA8,
            data: &rgb,
        });
        assert!(matches!(err, Err(BackendError::InvalidImage(_))));
    }

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let mut buffer = Buffer::new(2, 1);
        buffer.pixels_mut().copy_from_slice(&[0xff00_0000, 0xffff_ffff]);
        let view = buffer.as_ref();

        assert_eq!(view.sample(0.5, 0.5), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(view.sample(-10.0, 0.5), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(view.sample(5.0, 3.0), [1.0, 1.0, 1.0, 1.0]);

        let mid = view.sample(1.0, 0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_subregion() {
        let mut buffer = Buffer::new(4, 4);
        {
            let mut view = buffer.as_mut();
            let mut sub = view.subregion_mut(2, 1, 8, 8);
            assert_eq!((sub.width(), sub.height()), (2, 3));
            sub[(1, 2)] = 7;
        }
        assert_eq!(buffer.pixel(3, 3), Some(7));
    }
}
