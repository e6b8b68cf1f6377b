/// Pixel format of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    R8,
    RGB8,
    RGBA8,
}

impl ImageFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::R8 => 1,
            ImageFormat::RGB8 => 3,
            ImageFormat::RGBA8 => 4,
        }
    }
}

/// Image/texture data. Used for uploading static textures to the backend.
#[derive(Clone, Copy, Debug)]
pub struct ImageData<'a> {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data: &'a [u8],
}

/// A struct representing a size in physical pixels.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// A struct representing an axis aligned rectangle in physical pixels with origin in the top left corner.
///
/// `right` and `bottom` are exclusive.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Bounds {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Size {
    pub fn bounds(&self) -> Bounds {
        Bounds {
            left: 0,
            top: 0,
            right: self.width,
            bottom: self.height,
        }
    }
}

impl Bounds {
    /// An empty rectangle, the identity of [`Bounds::union`].
    pub const EMPTY: Self = Self {
        left: u32::MAX,
        right: 0,
        top: u32::MAX,
        bottom: 0,
    };

    /// Get the size of the rectangle
    pub fn size(&self) -> Size {
        Size {
            width: self.right.saturating_sub(self.left),
            height: self.bottom.saturating_sub(self.top),
        }
    }

    /// Get the width of the rectangle
    pub fn width(&self) -> u32 {
        self.size().width
    }

    /// Get the height of the rectangle
    pub fn height(&self) -> u32 {
        self.size().height
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Do the two rectangles share at least one pixel?
    pub fn intersects(&self, other: Self) -> bool {
        self.left < other.right && other.left < self.right && self.top < other.bottom && other.top < self.bottom
    }

    /// Does this rectangle contain every pixel of `other`?
    pub fn contains(&self, other: Self) -> bool {
        self.left <= other.left && self.top <= other.top && self.right >= other.right && self.bottom >= other.bottom
    }

    pub fn intersect(&self, other: Self) -> Self {
        let left = self.left.max(other.left);
        let right = self.right.min(other.right);
        let top = self.top.max(other.top);
        let bottom = self.bottom.min(other.bottom);

        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn union(&self, other: Self) -> Self {
        if other.is_empty() {
            return *self;
        }

        if self.is_empty() {
            return other;
        }

        let left = self.left.min(other.left);
        let right = self.right.max(other.right);
        let top = self.top.min(other.top);
        let bottom = self.bottom.max(other.bottom);

        Self {
            left,
            right,
            top,
            bottom,
        }
    }
}

impl From<[u32; 2]> for Size {
    fn from(value: [u32; 2]) -> Self {
        Self {
            width: value[0],
            height: value[1],
        }
    }
}

impl From<[u32; 4]> for Bounds {
    fn from(value: [u32; 4]) -> Self {
        Self {
            left: value[0],
            right: value[2],
            top: value[1],
            bottom: value[3],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bounds_intersects_is_exclusive() {
        let a = Bounds::from([0, 0, 1, 1]);
        let b = Bounds::from([1, 0, 2, 1]);
        let c = Bounds::from([0, 0, 2, 2]);

        assert!(!a.intersects(b));
        assert!(a.intersects(c));
        assert!(c.contains(a));
        assert!(!a.contains(c));
    }

    #[test]
    fn test_bounds_union_with_empty() {
        let a = Bounds::from([3, 4, 5, 6]);
        assert_eq!(Bounds::EMPTY.union(a), a);
        assert_eq!(a.union(Bounds::EMPTY), a);
        assert!(Bounds::EMPTY.is_empty());
    }
}
