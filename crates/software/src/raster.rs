//! Coverage of edges, strokes, rects and triangles, accumulated into a tile.

use plsdraw_core::{
    Bounds, FillRule,
    math::{Aabb, Mat2d, Vec2},
};

/// Samples per pixel along each axis.
pub const SAMPLES: usize = 4;
const SAMPLE_WEIGHT: f32 = 1.0 / (SAMPLES * SAMPLES) as f32;

#[inline(always)]
fn sample_offset(i: usize) -> f32 {
    (i as f32 + 0.5) / SAMPLES as f32
}

/// A directed edge. Edges pointing up (decreasing `y`) add `weight` to the winding number of points
/// to their right, edges pointing down subtract it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub a: Vec2,
    pub b: Vec2,
    pub weight: i32,
}

impl Edge {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b, weight: 1 }
    }

    pub fn weighted(a: Vec2, b: Vec2, weight: i32) -> Self {
        Self { a, b, weight }
    }

    fn distance_squared(&self, p: Vec2) -> f32 {
        let ab = self.b - self.a;
        let len2 = ab.dot(ab);
        let t = if len2 > 0.0 {
            ((p - self.a).dot(ab) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let d = p - (self.a + ab * t);
        d.dot(d)
    }
}

/// A textured triangle in device space; `uvs` are in texels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshTriangle {
    pub pts: [Vec2; 3],
    pub uvs: [Vec2; 3],
}

impl MeshTriangle {
    fn barycentric(&self, p: Vec2) -> Option<[f32; 3]> {
        let [a, b, c] = self.pts;
        let area = (b - a).cross(c - a);
        if area == 0.0 {
            return None;
        }

        let w0 = (b - p).cross(c - p) / area;
        let w1 = (c - p).cross(a - p) / area;
        let w2 = 1.0 - w0 - w1;
        let eps = -1e-5;
        (w0 >= eps && w1 >= eps && w2 >= eps).then_some([w0, w1, w2])
    }
}

pub fn edge_bounds(edges: &[Edge]) -> Aabb {
    let mut bounds = Aabb::EMPTY;
    for edge in edges {
        bounds.add_point(edge.a);
        bounds.add_point(edge.b);
    }
    bounds
}

/// Where a tile sits on the render target and how its scratch arrays are laid out.
#[derive(Clone, Copy, Debug)]
pub struct TileGeometry {
    pub x: u32,
    pub y: u32,
    pub stride: usize,
}

impl TileGeometry {
    #[inline(always)]
    pub fn index(&self, px: u32, py: u32) -> usize {
        (py - self.y) as usize * self.stride + (px - self.x) as usize
    }
}

/// Add the coverage of a filled edge set to the pixels of `region`.
pub fn fill(
    edges: &[Edge],
    rule: FillRule,
    region: Bounds,
    tile: TileGeometry,
    coverage: &mut [f32],
    crossings: &mut Vec<(f32, i32)>,
) {
    for py in region.top..region.bottom {
        for sy in 0..SAMPLES {
            let y = py as f32 + sample_offset(sy);

            crossings.clear();
            for edge in edges {
                let (y0, y1) = (edge.a.y, edge.b.y);
                if (y0 <= y) != (y1 <= y) {
                    let x = edge.a.x + (y - y0) * (edge.b.x - edge.a.x) / (y1 - y0);
                    crossings.push((x, if y0 > y1 { edge.weight } else { -edge.weight }));
                }
            }

            if crossings.is_empty() {
                continue;
            }

            crossings.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut next = 0;
            let mut winding = 0;
            for px in region.left..region.right {
                let index = tile.index(px, py);
                for sx in 0..SAMPLES {
                    let x = px as f32 + sample_offset(sx);
                    while next < crossings.len() && crossings[next].0 < x {
                        winding += crossings[next].1;
                        next += 1;
                    }

                    let inside = match rule {
                        FillRule::NonZero => winding != 0,
                        FillRule::EvenOdd => winding & 1 != 0,
                    };

                    if inside {
                        coverage[index] += SAMPLE_WEIGHT;
                    }
                }
            }
        }
    }
}

/// Add the coverage of round-capped, round-joined segments of half width `radius`.
pub fn stroke(
    edges: &[Edge],
    radius: f32,
    region: Bounds,
    tile: TileGeometry,
    coverage: &mut [f32],
    nearby: &mut Vec<Edge>,
) {
    if !(radius > 0.0) {
        return;
    }

    let area = Aabb::new(
        region.left as f32,
        region.top as f32,
        region.right as f32,
        region.bottom as f32,
    )
    .outset(radius);

    nearby.clear();
    nearby.extend(edges.iter().filter(|edge| {
        edge.a.x.min(edge.b.x) <= area.max.x
            && edge.a.x.max(edge.b.x) >= area.min.x
            && edge.a.y.min(edge.b.y) <= area.max.y
            && edge.a.y.max(edge.b.y) >= area.min.y
    }));

    if nearby.is_empty() {
        return;
    }

    let r2 = radius * radius;
    for py in region.top..region.bottom {
        for px in region.left..region.right {
            let index = tile.index(px, py);
            for sy in 0..SAMPLES {
                for sx in 0..SAMPLES {
                    let p = Vec2::new(px as f32 + sample_offset(sx), py as f32 + sample_offset(sy));
                    if nearby.iter().any(|edge| edge.distance_squared(p) <= r2) {
                        coverage[index] += SAMPLE_WEIGHT;
                    }
                }
            }
        }
    }
}

/// Add the coverage of the unit square mapped through the inverse of `inverse`.
pub fn rect(inverse: &Mat2d, region: Bounds, tile: TileGeometry, coverage: &mut [f32]) {
    for py in region.top..region.bottom {
        for px in region.left..region.right {
            let index = tile.index(px, py);
            for sy in 0..SAMPLES {
                for sx in 0..SAMPLES {
                    let p = inverse.map(Vec2::new(px as f32 + sample_offset(sx), py as f32 + sample_offset(sy)));
                    if (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y) {
                        coverage[index] += SAMPLE_WEIGHT;
                    }
                }
            }
        }
    }
}

/// Set full coverage and the interpolated uv for pixel centers inside any triangle.
pub fn mesh(triangles: &[MeshTriangle], region: Bounds, tile: TileGeometry, coverage: &mut [f32], uvs: &mut [Vec2]) {
    for triangle in triangles {
        for py in region.top..region.bottom {
            for px in region.left..region.right {
                let p = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                if let Some([w0, w1, w2]) = triangle.barycentric(p) {
                    let index = tile.index(px, py);
                    coverage[index] = 1.0;
                    uvs[index] = triangle.uvs[0] * w0 + triangle.uvs[1] * w1 + triangle.uvs[2] * w2;
                }
            }
        }
    }
}
