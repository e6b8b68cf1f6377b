use crate::{
    ImageTexture, PaintType,
    math::{Mat2d, Vec2},
};
use std::sync::Arc;

/// A color packed as `0xAARRGGBB`, not premultiplied.
pub type ColorInt = u32;

pub const fn color_argb(a: u8, r: u8, g: u8, b: u8) -> ColorInt {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientKind {
    Linear { start: Vec2, end: Vec2 },
    Radial { center: Vec2, radius: f32 },
}

/// A multi-stop gradient in path-local coordinates.
///
/// Stops are clamped to `[0, 1]` and made monotonic on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    kind: GradientKind,
    colors: Vec<ColorInt>,
    stops: Vec<f32>,
}

/// Content key of a complex gradient: its colors followed by its stop positions' bits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GradientKey(Box<[u32]>);

impl Gradient {
    pub fn linear(start: Vec2, end: Vec2, colors: &[ColorInt], stops: &[f32]) -> Arc<Self> {
        Arc::new(Self::new(GradientKind::Linear { start, end }, colors, stops))
    }

    pub fn radial(center: Vec2, radius: f32, colors: &[ColorInt], stops: &[f32]) -> Arc<Self> {
        Arc::new(Self::new(GradientKind::Radial { center, radius }, colors, stops))
    }

    fn new(kind: GradientKind, colors: &[ColorInt], stops: &[f32]) -> Self {
        let count = colors.len().min(stops.len());
        let mut colors = colors[..count].to_vec();
        let mut stops = stops[..count].to_vec();

        let mut last = 0.0f32;
        for stop in stops.iter_mut() {
            if !stop.is_nan() {
                last = stop.clamp(last, 1.0);
            }
            *stop = last;
        }

        match count {
            0 => {
                colors = vec![0, 0];
                stops = vec![0.0, 1.0];
            }
            1 => {
                colors.push(colors[0]);
                stops = vec![0.0, 1.0];
            }
            _ => {}
        }

        Self { kind, colors, stops }
    }

    pub fn kind(&self) -> GradientKind {
        self.kind
    }

    pub fn colors(&self) -> &[ColorInt] {
        &self.colors
    }

    pub fn stops(&self) -> &[f32] {
        &self.stops
    }

    pub fn paint_type(&self) -> PaintType {
        match self.kind {
            GradientKind::Linear { .. } => PaintType::LinearGradient,
            GradientKind::Radial { .. } => PaintType::RadialGradient,
        }
    }

    /// Two stops exactly at 0 and 1 fit into a two-texel ramp.
    pub fn is_simple(&self) -> bool {
        self.stops.len() == 2 && self.stops[0] == 0.0 && self.stops[1] == 1.0
    }

    /// `color0 << 32 | color1` of a simple gradient.
    pub fn simple_key(&self) -> Option<u64> {
        self.is_simple()
            .then(|| (self.colors[0] as u64) << 32 | self.colors[1] as u64)
    }

    pub fn content_key(&self) -> GradientKey {
        GradientKey(
            self.colors
                .iter()
                .copied()
                .chain(self.stops.iter().map(|x| x.to_bits()))
                .collect(),
        )
    }

    /// Number of stop intervals a complex ramp of this gradient renders.
    pub fn span_count(&self) -> usize {
        self.stops.len() - 1
    }

    /// Transform from device space into gradient space, given the path's local-to-device matrix.
    ///
    /// In gradient space a linear gradient's `t` is the x coordinate, a radial gradient's `t` is the
    /// distance from the origin. Returns `None` when the gradient or the matrix is degenerate.
    pub fn device_to_gradient(&self, local_to_device: &Mat2d) -> Option<Mat2d> {
        let local_to_gradient = match self.kind {
            GradientKind::Linear { start, end } => {
                let d = end - start;
                let len2 = d.dot(d);
                if len2 == 0.0 || !len2.is_finite() {
                    return None;
                }

                Mat2d {
                    xx: d.x / len2,
                    xy: 0.0,
                    yx: d.y / len2,
                    yy: 0.0,
                    tx: -start.dot(d) / len2,
                    ty: 0.0,
                }
            }
            GradientKind::Radial { center, radius } => {
                if radius <= 0.0 || !radius.is_finite() {
                    return None;
                }

                Mat2d {
                    xx: 1.0 / radius,
                    xy: 0.0,
                    yx: 0.0,
                    yy: 1.0 / radius,
                    tx: -center.x / radius,
                    ty: -center.y / radius,
                }
            }
        };

        Some(local_to_device.invert()?.then(&local_to_gradient))
    }
}

/// What fills the coverage of a path.
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(ColorInt),
    Gradient(Arc<Gradient>),
    /// Path-local coordinates map 1:1 onto image texels.
    Image { texture: ImageTexture, opacity: f32 },
    /// Writes `clip_id` into the clip buffer instead of color. With a non-zero `outer_clip_id` the
    /// new clip is intersected with the outer one.
    ClipUpdate { outer_clip_id: u32 },
}

impl Paint {
    pub fn paint_type(&self) -> PaintType {
        match self {
            Paint::Solid(_) => PaintType::SolidColor,
            Paint::Gradient(gradient) => gradient.paint_type(),
            Paint::Image { .. } => PaintType::Image,
            Paint::ClipUpdate { .. } => PaintType::ClipUpdate,
        }
    }

    pub fn gradient(&self) -> Option<&Arc<Gradient>> {
        match self {
            Paint::Gradient(gradient) => Some(gradient),
            _ => None,
        }
    }

    pub fn image_texture(&self) -> Option<ImageTexture> {
        match self {
            Paint::Image { texture, .. } => Some(*texture),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stops_made_monotonic() {
        let g = Gradient::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), &[1, 2, 3, 4], &[0.5, 0.2, 1.5, 0.9]);
        assert_eq!(g.stops(), &[0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_simple_key() {
        let white = color_argb(255, 255, 255, 255);
        let black = color_argb(255, 0, 0, 0);
        let g = Gradient::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), &[white, black], &[0.0, 1.0]);
        assert_eq!(g.simple_key(), Some((white as u64) << 32 | black as u64));

        let g = Gradient::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), &[white, black], &[0.1, 1.0]);
        assert_eq!(g.simple_key(), None);
    }

    #[test]
    fn test_single_color_is_simple() {
        let g = Gradient::radial(Vec2::ZERO, 4.0, &[7], &[0.3]);
        assert!(g.is_simple());
        assert_eq!(g.colors(), &[7, 7]);
    }

    #[test]
    fn test_linear_device_to_gradient() {
        let g = Gradient::linear(Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0), &[0, 1], &[0.0, 1.0]);
        let m = g.device_to_gradient(&Mat2d::translate(5.0, 5.0)).unwrap();

        assert!((m.map(Vec2::new(15.0, 100.0)).x - 0.0).abs() < 1e-5);
        assert!((m.map(Vec2::new(20.0, -3.0)).x - 0.5).abs() < 1e-5);
        assert!((m.map(Vec2::new(25.0, 0.0)).x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_radial_device_to_gradient() {
        let g = Gradient::radial(Vec2::new(0.0, 0.0), 10.0, &[0, 1], &[0.0, 1.0]);
        let m = g.device_to_gradient(&Mat2d::scale(2.0, 2.0)).unwrap();
        assert!((m.map(Vec2::new(20.0, 0.0)).length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_gradients() {
        let g = Gradient::linear(Vec2::ZERO, Vec2::ZERO, &[0, 1], &[0.0, 1.0]);
        assert!(g.device_to_gradient(&Mat2d::IDENTITY).is_none());

        let g = Gradient::radial(Vec2::ZERO, 1.0, &[0, 1], &[0.0, 1.0]);
        assert!(g.device_to_gradient(&Mat2d::scale(0.0, 0.0)).is_none());
    }
}
