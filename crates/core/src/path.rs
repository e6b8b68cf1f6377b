use crate::math::{Aabb, Vec2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathVerb {
    Move(Vec2),
    Line(Vec2),
    Cubic(Vec2, Vec2, Vec2),
    Close,
}

/// A path made of move/line/cubic/close verbs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPath {
    verbs: Vec<PathVerb>,
}

/// One subpath of a [`RawPath`], with every segment expressed as a cubic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawContour {
    pub cubics: Vec<[Vec2; 4]>,
    pub closed: bool,
}

/// Control point distance that approximates a quarter circle with a cubic.
const CIRCLE_KAPPA: f32 = 0.552_284_8;

impl RawPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// A closed axis aligned rectangle, wound clockwise in a y-down space.
    pub fn rect(rect: Aabb) -> Self {
        let mut path = Self::new();
        path.move_to(rect.min)
            .line_to(Vec2::new(rect.max.x, rect.min.y))
            .line_to(rect.max)
            .line_to(Vec2::new(rect.min.x, rect.max.y))
            .close();
        path
    }

    /// A closed circle made of four cubics.
    pub fn circle(center: Vec2, radius: f32) -> Self {
        let k = radius * CIRCLE_KAPPA;
        let (cx, cy, r) = (center.x, center.y, radius);

        let mut path = Self::new();
        path.move_to(Vec2::new(cx + r, cy))
            .cubic_to(Vec2::new(cx + r, cy + k), Vec2::new(cx + k, cy + r), Vec2::new(cx, cy + r))
            .cubic_to(Vec2::new(cx - k, cy + r), Vec2::new(cx - r, cy + k), Vec2::new(cx - r, cy))
            .cubic_to(Vec2::new(cx - r, cy - k), Vec2::new(cx - k, cy - r), Vec2::new(cx, cy - r))
            .cubic_to(Vec2::new(cx + k, cy - r), Vec2::new(cx + r, cy - k), Vec2::new(cx + r, cy))
            .close();
        path
    }

    pub fn move_to(&mut self, p: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::Move(p));
        self
    }

    pub fn line_to(&mut self, p: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::Line(p));
        self
    }

    pub fn cubic_to(&mut self, c0: Vec2, c1: Vec2, p: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::Cubic(c0, c1, p));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.verbs.push(PathVerb::Close);
        self
    }

    pub fn verbs(&self) -> &[PathVerb] {
        &self.verbs
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Split the path into contours. Lines become flat cubics. Closing a contour whose end does not
    /// meet its start adds the closing line.
    ///
    /// Segments before the first move start at the origin.
    pub fn contours(&self) -> Vec<RawContour> {
        let mut contours = Vec::new();
        let mut current = RawContour::default();
        let mut start = Vec2::ZERO;
        let mut pen = Vec2::ZERO;

        for verb in self.verbs.iter() {
            match *verb {
                PathVerb::Move(p) => {
                    if !current.cubics.is_empty() {
                        contours.push(std::mem::take(&mut current));
                    }

                    current.closed = false;
                    start = p;
                    pen = p;
                }
                PathVerb::Line(p) => {
                    current.cubics.push(line_as_cubic(pen, p));
                    pen = p;
                }
                PathVerb::Cubic(c0, c1, p) => {
                    current.cubics.push([pen, c0, c1, p]);
                    pen = p;
                }
                PathVerb::Close => {
                    if !current.cubics.is_empty() {
                        if pen != start {
                            current.cubics.push(line_as_cubic(pen, start));
                        }

                        current.closed = true;
                        contours.push(std::mem::take(&mut current));
                    }

                    pen = start;
                }
            }
        }

        if !current.cubics.is_empty() {
            contours.push(current);
        }

        contours
    }
}

/// A straight line as a cubic with evenly spaced control points.
pub fn line_as_cubic(a: Vec2, b: Vec2) -> [Vec2; 4] {
    [a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b]
}
