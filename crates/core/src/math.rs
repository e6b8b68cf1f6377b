use crate::{Bounds, GpuRecord, RecordReader, RecordWriter};
use std::ops::{Add, Mul, Neg, Sub};

/// A 2D point or vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// A 2D affine transform: `[xx yx tx; xy yy ty]`.
///
/// Maps `p` to `(xx * p.x + yx * p.y + tx, xy * p.x + yy * p.y + ty)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat2d {
    pub xx: f32,
    pub xy: f32,
    pub yx: f32,
    pub yy: f32,
    pub tx: f32,
    pub ty: f32,
}

/// A floating point axis aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > 0.0 { self * (1.0 / len) } else { Self::ZERO }
    }

    /// Angle between two vectors in `[0, PI]`.
    pub fn angle_between(self, other: Self) -> f32 {
        let d = self.length() * other.length();
        if d == 0.0 {
            return 0.0;
        }

        (self.dot(other) / d).clamp(-1.0, 1.0).acos()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<[f32; 2]> for Vec2 {
    fn from(value: [f32; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl GpuRecord for Vec2 {
    const WORDS: usize = 2;

    fn write(&self, writer: &mut dyn RecordWriter) {
        writer.write_f32(self.x);
        writer.write_f32(self.y);
    }

    fn read(reader: &mut dyn RecordReader) -> Self {
        let x = reader.read_f32();
        let y = reader.read_f32();
        Self { x, y }
    }
}

impl Default for Mat2d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat2d {
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        xy: 0.0,
        yx: 0.0,
        yy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self {
            xx: sx,
            yy: sy,
            ..Self::IDENTITY
        }
    }

    pub fn rotate(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            xx: c,
            xy: s,
            yx: -s,
            yy: c,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Map a point.
    pub fn map(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.xx * p.x + self.yx * p.y + self.tx,
            self.xy * p.x + self.yy * p.y + self.ty,
        )
    }

    /// Map a vector (ignores translation).
    pub fn map_vector(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.xx * v.x + self.yx * v.y, self.xy * v.x + self.yy * v.y)
    }

    /// Concatenate: the result applies `self` first, then `outer`.
    pub fn then(&self, outer: &Self) -> Self {
        Self {
            xx: outer.xx * self.xx + outer.yx * self.xy,
            xy: outer.xy * self.xx + outer.yy * self.xy,
            yx: outer.xx * self.yx + outer.yx * self.yy,
            yy: outer.xy * self.yx + outer.yy * self.yy,
            tx: outer.xx * self.tx + outer.yx * self.ty + outer.tx,
            ty: outer.xy * self.tx + outer.yy * self.ty + outer.ty,
        }
    }

    pub fn determinant(&self) -> f32 {
        self.xx * self.yy - self.xy * self.yx
    }

    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let inv = 1.0 / det;
        let xx = self.yy * inv;
        let xy = -self.xy * inv;
        let yx = -self.yx * inv;
        let yy = self.xx * inv;

        Some(Self {
            xx,
            xy,
            yx,
            yy,
            tx: -(xx * self.tx + yx * self.ty),
            ty: -(xy * self.tx + yy * self.ty),
        })
    }

    /// Largest factor by which this transform stretches a vector.
    pub fn max_scale(&self) -> f32 {
        let a = self.xx * self.xx + self.xy * self.xy;
        let b = self.xx * self.yx + self.xy * self.yy;
        let c = self.yx * self.yx + self.yy * self.yy;
        let half_trace = (a + c) * 0.5;
        let disc = (half_trace * half_trace - (a * c - b * b)).max(0.0).sqrt();
        (half_trace + disc).sqrt()
    }

    /// The 2x2 part, column-major.
    pub fn linear(&self) -> [f32; 4] {
        [self.xx, self.xy, self.yx, self.yy]
    }

    pub fn translation(&self) -> [f32; 2] {
        [self.tx, self.ty]
    }
}

impl GpuRecord for Mat2d {
    const WORDS: usize = 6;

    fn write(&self, writer: &mut dyn RecordWriter) {
        for x in [self.xx, self.xy, self.yx, self.yy, self.tx, self.ty] {
            writer.write_f32(x);
        }
    }

    fn read(reader: &mut dyn RecordReader) -> Self {
        let [xx, xy, yx, yy, tx, ty] = <[f32; 6]>::read(reader);
        Self { xx, xy, yx, yy, tx, ty }
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec2::new(f32::INFINITY, f32::INFINITY),
        max: Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            min: Vec2::new(left, top),
            max: Vec2::new(right, bottom),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min.x < self.max.x && self.min.y < self.max.y)
    }

    pub fn add_point(&mut self, p: Vec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn outset(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec2::new(amount, amount),
            max: self.max + Vec2::new(amount, amount),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        self.min.lerp(self.max, 0.5)
    }

    /// Round outwards to whole pixels, clamped to non-negative coordinates.
    pub fn round_out(&self) -> Bounds {
        if !(self.min.x <= self.max.x && self.min.y <= self.max.y) {
            return Bounds::default();
        }

        let clamp = |x: f32| x.clamp(0.0, u32::MAX as f32) as u32;
        Bounds {
            left: clamp(self.min.x.floor()),
            top: clamp(self.min.y.floor()),
            right: clamp(self.max.x.ceil()),
            bottom: clamp(self.max.y.ceil()),
        }
    }
}

/// Evaluate a cubic bezier at `t`.
pub fn eval_cubic(pts: &[Vec2; 4], t: f32) -> Vec2 {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    pts[0] * a + pts[1] * b + pts[2] * c + pts[3] * d
}

/// Wang's formula: the number of uniform parametric segments a cubic needs so that no segment
/// deviates from the curve by more than `1 / precision` pixels.
pub fn wangs_formula_cubic(pts: &[Vec2; 4], precision: f32) -> f32 {
    let v0 = pts[0] - pts[1] * 2.0 + pts[2];
    let v1 = pts[1] - pts[2] * 2.0 + pts[3];
    let m = v0.dot(v0).max(v1.dot(v1)).sqrt();
    (m * precision * 0.75).sqrt()
}

/// Polar segments needed per radian of rotation for a stroke of the given device-space radius.
pub fn polar_segments_per_radian(device_radius: f32) -> f32 {
    const POLAR_PRECISION: f32 = 8.0;
    let cos_theta = (1.0 - 1.0 / (POLAR_PRECISION * device_radius.max(1.0 / POLAR_PRECISION))).max(-1.0);
    0.5 / cos_theta.acos()
}

/// Total tangent rotation of a cubic, assuming it does not inflect.
pub fn cubic_rotation(pts: &[Vec2; 4]) -> f32 {
    let (start, end) = cubic_tangents(pts);
    start.angle_between(end)
}

/// Start and end tangents of a cubic, falling back to further control points on degeneracies.
pub fn cubic_tangents(pts: &[Vec2; 4]) -> (Vec2, Vec2) {
    let first = |candidates: [Vec2; 3]| {
        candidates
            .into_iter()
            .find(|v| *v != Vec2::ZERO)
            .unwrap_or(Vec2::ZERO)
    };

    let start = first([pts[1] - pts[0], pts[2] - pts[0], pts[3] - pts[0]]);
    let end = first([pts[3] - pts[2], pts[3] - pts[1], pts[3] - pts[0]]);
    (start, end)
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(a: Vec2, b: Vec2) -> [Vec2; 4] {
        [a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b]
    }

    #[test]
    fn test_invert_roundtrip() {
        let m = Mat2d::translate(10.0, -4.0).then(&Mat2d::rotate(0.3)).then(&Mat2d::scale(2.0, 3.0));
        let inv = m.invert().unwrap();
        let p = Vec2::new(5.0, 7.0);
        let q = inv.map(m.map(p));

        assert!((q.x - p.x).abs() < 1e-4);
        assert!((q.y - p.y).abs() < 1e-4);
        assert!(Mat2d::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_then_order() {
        let m = Mat2d::scale(2.0, 2.0).then(&Mat2d::translate(1.0, 0.0));
        assert_eq!(m.map(Vec2::new(1.0, 1.0)), Vec2::new(3.0, 2.0));
    }

    #[test]
    fn test_max_scale() {
        assert!((Mat2d::scale(2.0, 5.0).max_scale() - 5.0).abs() < 1e-5);
        assert!((Mat2d::rotate(1.0).max_scale() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_wangs_formula_line_is_flat() {
        let pts = line(Vec2::new(0.0, 0.0), Vec2::new(100.0, 50.0));
        assert!(wangs_formula_cubic(&pts, 4.0) < 1e-2);
    }

    #[test]
    fn test_wangs_formula_grows_with_curvature() {
        let small = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(10.0, 0.0),
        ];
        let big = small.map(|p| p * 10.0);
        assert!(wangs_formula_cubic(&big, 4.0) > wangs_formula_cubic(&small, 4.0));
    }

    #[test]
    fn test_eval_cubic_endpoints() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(3.0, 2.0),
            Vec2::new(4.0, 0.0),
        ];
        assert_eq!(eval_cubic(&pts, 0.0), pts[0]);
        assert_eq!(eval_cubic(&pts, 1.0), pts[3]);
    }

    #[test]
    fn test_round_out() {
        let b = Aabb::new(0.5, 1.0, 2.2, 3.0).round_out();
        assert_eq!(b, Bounds::from([0, 1, 3, 3]));
        assert_eq!(Aabb::EMPTY.round_out(), Bounds::default());
    }
}
