use crate::{
    BlendMode, Bounds, ContourFlags, FillRule, ImageTexture, InterlockMode, MAX_PARAMETRIC_SEGMENTS,
    MAX_POLAR_SEGMENTS, MIDPOINT_FAN_PATCH_SEGMENT_SPAN, MITER_LIMIT, NUM_SEGMENTS_IN_MITER_OR_BEVEL_JOIN,
    OUTER_CURVE_PATCH_SEGMENT_SPAN, PARAMETRIC_PRECISION, PaintType, RenderBuffer, ShaderFeatures,
    TESS_TEXTURE_WIDTH,
    flush::ResourceCounters,
    math::{Aabb, Mat2d, Vec2, cubic_rotation, cubic_tangents, polar_segments_per_radian, wangs_formula_cubic},
    paint::{Gradient, Paint},
    path::RawPath,
};
use std::{f32::consts::PI, sync::Arc};

/// A high-level draw command.
///
/// Draws are pushed into a logical flush in batches and turned into GPU records and draw batches
/// when the frame is flushed.
#[derive(Clone, Debug)]
pub enum Draw {
    /// A fill or stroke rendered from midpoint fan patches.
    Path(PathDraw),
    /// A fill split into a triangulated interior and antialiased outer curves.
    InteriorTriangulation(InteriorTriangulationDraw),
    ImageRect(ImageRectDraw),
    ImageMesh(ImageMeshDraw),
    /// Every draw after the barrier observes every draw before it.
    Barrier,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokeJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokeCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub join: StrokeJoin,
    pub cap: StrokeCap,
}

impl StrokeStyle {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            join: StrokeJoin::default(),
            cap: StrokeCap::default(),
        }
    }

    fn join_flags(&self) -> ContourFlags {
        match self.join {
            StrokeJoin::Miter => ContourFlags::MITER_REVERT_JOIN,
            StrokeJoin::Round => ContourFlags::ROUND_JOIN,
            StrokeJoin::Bevel => ContourFlags::BEVEL_JOIN,
        }
    }

    fn cap_flags(&self) -> ContourFlags {
        ContourFlags::EMULATED_STROKE_CAP
            | match self.cap {
                StrokeCap::Butt => ContourFlags::BEVEL_JOIN,
                StrokeCap::Round => ContourFlags::ROUND_JOIN,
                StrokeCap::Square => ContourFlags::MITER_CLIP_JOIN,
            }
    }
}

/// One cubic of a contour together with its tessellation segment counts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicSegment {
    pub pts: [Vec2; 4],
    pub join_tangent: Vec2,
    pub flags: ContourFlags,
    pub parametric_segments: u32,
    pub polar_segments: u32,
    pub join_segments: u32,
}

impl CubicSegment {
    /// Tessellation vertices this cubic produces.
    pub fn vertex_count(&self) -> u32 {
        (self.parametric_segments + self.polar_segments + self.join_segments).saturating_sub(1)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContourGeometry {
    pub midpoint: Vec2,
    pub closed: bool,
    pub cubics: Vec<CubicSegment>,
    patch_span: u32,
}

impl ContourGeometry {
    /// Vertices of all cubics, without padding.
    pub fn curve_vertex_count(&self) -> u32 {
        self.cubics.iter().map(CubicSegment::vertex_count).sum()
    }

    /// Vertices collocated at the contour's start so the contour fills whole patches.
    pub fn padding_vertex_count(&self) -> u32 {
        let count = self.curve_vertex_count();
        (self.patch_span - count % self.patch_span) % self.patch_span
    }

    pub fn vertex_count(&self) -> u32 {
        self.curve_vertex_count() + self.padding_vertex_count()
    }

    pub fn is_empty(&self) -> bool {
        self.curve_vertex_count() == 0
    }
}

/// Paint state shared by every draw that resolves through a paint.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintState {
    pub paint: Paint,
    pub clip_id: u32,
    /// Device space to clip rect space, where the rect is `[-1, 1]²`.
    pub clip_rect: Option<Mat2d>,
    pub blend_mode: BlendMode,
}

impl PaintState {
    fn new(paint: Paint) -> Self {
        Self {
            paint,
            clip_id: 0,
            clip_rect: None,
            blend_mode: BlendMode::SrcOver,
        }
    }

    fn shader_features(&self) -> ShaderFeatures {
        let mut features = self.blend_mode.shader_features();
        if self.clip_id != 0 {
            features |= ShaderFeatures::ENABLE_CLIPPING;
        }

        if self.clip_rect.is_some() {
            features |= ShaderFeatures::ENABLE_CLIP_RECT;
        }

        if let Paint::ClipUpdate { outer_clip_id } = self.paint
            && outer_clip_id != 0
        {
            features |= ShaderFeatures::ENABLE_NESTED_CLIPPING;
        }

        features
    }
}

/// Inverse of the transform that maps `[-1, 1]²` onto `rect` under `matrix`.
///
/// A degenerate rect maps everything outside, so it clips everything.
pub fn clip_rect_inverse_matrix(rect: Aabb, matrix: &Mat2d) -> Mat2d {
    let center = rect.center();
    let unit_to_local = Mat2d {
        xx: rect.width() * 0.5,
        xy: 0.0,
        yx: 0.0,
        yy: rect.height() * 0.5,
        tx: center.x,
        ty: center.y,
    };

    unit_to_local.then(matrix).invert().unwrap_or(Mat2d {
        xx: 0.0,
        xy: 0.0,
        yx: 0.0,
        yy: 0.0,
        tx: 2.0,
        ty: 2.0,
    })
}

/// A path fill or stroke.
///
/// Built either from a [`RawPath`] (segment counts are computed here) or by pushing contours and
/// cubics with caller-computed segment counts, in path → contour → cubic order.
#[derive(Clone, Debug, PartialEq)]
pub struct PathDraw {
    matrix: Mat2d,
    stroked: bool,
    stroke_radius: f32,
    fill_rule: FillRule,
    paint: PaintState,
    contours: Vec<ContourGeometry>,
    patch_span: u32,
    bounds: Aabb,
}

impl PathDraw {
    /// An empty non-zero fill.
    pub fn new(matrix: Mat2d, paint: Paint) -> Self {
        let paint = match paint {
            Paint::Gradient(gradient) if gradient.device_to_gradient(&matrix).is_none() => {
                Paint::Solid(gradient.colors().last().copied().unwrap_or(0))
            }
            paint => paint,
        };

        Self {
            matrix,
            stroked: false,
            stroke_radius: 0.0,
            fill_rule: FillRule::NonZero,
            paint: PaintState::new(paint),
            contours: Vec::new(),
            patch_span: MIDPOINT_FAN_PATCH_SEGMENT_SPAN,
            bounds: Aabb::EMPTY,
        }
    }

    /// Fill a path, computing parametric segment counts with Wang's formula.
    pub fn fill(path: &RawPath, matrix: Mat2d, paint: Paint) -> Self {
        let mut draw = Self::new(matrix, paint);

        for contour in path.contours() {
            let sum = contour.cubics.iter().fold(Vec2::ZERO, |acc, c| acc + c[0]);
            let midpoint = sum * (1.0 / contour.cubics.len() as f32);
            draw.push_contour(midpoint, true);

            for pts in contour.cubics.iter() {
                let parametric = draw.parametric_segments(pts);
                draw.push_cubic(*pts, Vec2::ZERO, ContourFlags::empty(), parametric, 0, 1);
            }
        }

        draw
    }

    /// Stroke a path, computing parametric, polar and join segment counts.
    ///
    /// A width that is not positive and finite strokes nothing: the draw has no contours.
    pub fn stroke(path: &RawPath, matrix: Mat2d, paint: Paint, style: StrokeStyle) -> Self {
        let mut draw = Self::new(matrix, paint);
        draw.stroked = true;
        if !(style.width > 0.0 && style.width.is_finite()) {
            return draw;
        }

        draw.stroke_radius = style.width * 0.5;

        let device_radius = draw.stroke_radius * matrix.max_scale();
        let polar_per_radian = polar_segments_per_radian(device_radius);
        let join_segments = |angle: f32, flags: ContourFlags| {
            if flags.join_type() == ContourFlags::ROUND_JOIN {
                ((angle * polar_per_radian).ceil() as u32 + 1).min(MAX_POLAR_SEGMENTS)
            } else {
                NUM_SEGMENTS_IN_MITER_OR_BEVEL_JOIN
            }
        };

        for contour in path.contours() {
            let first = contour.cubics[0];
            draw.push_contour(first[0], contour.closed);

            if !contour.closed {
                // The start cap is a zero-length cubic whose join turns into the first segment.
                let (start_tangent, _) = cubic_tangents(&first);
                let flags = style.cap_flags();
                let join = join_segments(PI, flags);
                draw.push_cubic([first[0]; 4], start_tangent, flags, 1, 0, join);
            }

            let count = contour.cubics.len();
            for (i, pts) in contour.cubics.iter().enumerate() {
                let (_, end_tangent) = cubic_tangents(pts);
                let (join_tangent, flags, angle) = if i + 1 < count || contour.closed {
                    let (next_tangent, _) = cubic_tangents(&contour.cubics[(i + 1) % count]);
                    (next_tangent, style.join_flags(), end_tangent.angle_between(next_tangent))
                } else {
                    (-end_tangent, style.cap_flags(), PI)
                };

                let parametric = draw.parametric_segments(pts);
                let polar = ((cubic_rotation(pts) * polar_per_radian).ceil() as u32).min(MAX_POLAR_SEGMENTS);
                let join = join_segments(angle, flags);
                draw.push_cubic(*pts, join_tangent, flags, parametric, polar, join);
            }
        }

        draw
    }

    fn parametric_segments(&self, pts: &[Vec2; 4]) -> u32 {
        let device = pts.map(|p| self.matrix.map(p));
        let n = wangs_formula_cubic(&device, PARAMETRIC_PRECISION).ceil();
        if n.is_finite() {
            (n as u32).clamp(1, MAX_PARAMETRIC_SEGMENTS)
        } else {
            MAX_PARAMETRIC_SEGMENTS
        }
    }

    /// Start a new contour. Following cubics belong to it.
    pub fn push_contour(&mut self, midpoint: Vec2, closed: bool) {
        self.contours.push(ContourGeometry {
            midpoint,
            closed,
            cubics: Vec::new(),
            patch_span: self.patch_span,
        });
    }

    /// Append a cubic to the current contour.
    ///
    /// The cubic must start where the previous cubic of the contour ended.
    pub fn push_cubic(
        &mut self,
        pts: [Vec2; 4],
        join_tangent: Vec2,
        flags: ContourFlags,
        parametric_segments: u32,
        polar_segments: u32,
        join_segments: u32,
    ) {
        debug_assert!(!self.contours.is_empty(), "push_cubic without a contour");
        debug_assert!(parametric_segments + polar_segments + join_segments >= 2);
        debug_assert!(parametric_segments <= MAX_PARAMETRIC_SEGMENTS && polar_segments <= MAX_POLAR_SEGMENTS);

        let matrix = self.matrix;
        let Some(contour) = self.contours.last_mut() else {
            return;
        };

        if let Some(last) = contour.cubics.last() {
            debug_assert_eq!(last.pts[3], pts[0], "cubic does not start where the previous one ended");
        }

        for p in pts {
            self.bounds.add_point(matrix.map(p));
        }

        contour.cubics.push(CubicSegment {
            pts,
            join_tangent,
            flags: flags - ContourFlags::CONTOUR_ID_MASK,
            parametric_segments,
            polar_segments,
            join_segments,
        });
    }

    pub fn with_fill_rule(mut self, fill_rule: FillRule) -> Self {
        self.fill_rule = fill_rule;
        self
    }

    pub fn with_clip_id(mut self, clip_id: u32) -> Self {
        self.paint.clip_id = clip_id;
        self
    }

    /// Clip to `rect` (in the space `matrix` maps from).
    pub fn with_clip_rect(mut self, rect: Aabb, matrix: &Mat2d) -> Self {
        self.paint.clip_rect = Some(clip_rect_inverse_matrix(rect, matrix));
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.paint.blend_mode = blend_mode;
        self
    }

    pub fn matrix(&self) -> &Mat2d {
        &self.matrix
    }

    pub fn stroke_radius(&self) -> f32 {
        self.stroke_radius
    }

    pub fn is_stroke(&self) -> bool {
        self.stroked
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn paint(&self) -> &PaintState {
        &self.paint
    }

    pub fn contours(&self) -> impl Iterator<Item = &ContourGeometry> {
        self.contours.iter().filter(|c| !c.is_empty())
    }

    /// Tessellation vertices of this path, including contour padding, not counting a mirrored copy.
    pub fn tess_vertex_count(&self) -> u32 {
        self.contours().map(ContourGeometry::vertex_count).sum()
    }

    /// Device-space bounds, outset by the stroke.
    pub fn bounds(&self) -> Aabb {
        if self.is_stroke() {
            let outset = self.stroke_radius * self.matrix.max_scale() * MITER_LIMIT.max(1.0) + 1.0;
            self.bounds.outset(outset)
        } else {
            self.bounds
        }
    }

    /// Fills in atomic mode also write a mirrored copy of their tessellation.
    pub fn is_mirrored(&self, interlock_mode: InterlockMode) -> bool {
        interlock_mode == InterlockMode::Atomics
            && !self.is_stroke()
            && self.patch_span == MIDPOINT_FAN_PATCH_SEGMENT_SPAN
    }

    pub fn shader_features(&self) -> ShaderFeatures {
        let mut features = self.paint.shader_features();
        if !self.is_stroke() && self.fill_rule == FillRule::EvenOdd {
            features |= ShaderFeatures::ENABLE_EVEN_ODD;
        }

        features
    }

    fn max_tessellated_segment_count(&self) -> u32 {
        let rows = |n: u32| n.div_ceil(TESS_TEXTURE_WIDTH) + 1;
        self.contours()
            .map(|c| {
                let padding = c.padding_vertex_count();
                let padding_spans = if padding > 0 { rows(padding) } else { 0 };
                padding_spans + c.cubics.iter().map(|x| rows(x.vertex_count())).sum::<u32>()
            })
            .sum()
    }

    fn resource_counts(&self, interlock_mode: InterlockMode) -> ResourceCounters {
        let vertices = self.tess_vertex_count() as usize;
        ResourceCounters {
            midpoint_fan_tess_vertex_count: if self.is_mirrored(interlock_mode) { vertices * 2 } else { vertices },
            path_count: 1,
            contour_count: self.contours().count(),
            max_tessellated_segment_count: self.max_tessellated_segment_count() as usize,
            ..Default::default()
        }
    }
}

/// A triangle of an interior triangulation, in path-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteriorTriangle {
    pub pts: [Vec2; 3],
    /// Winding contribution, ±1.
    pub weight: i16,
}

/// A fill whose interior is triangulated on the CPU; only the curved boundary is tessellated.
#[derive(Clone, Debug, PartialEq)]
pub struct InteriorTriangulationDraw {
    path: PathDraw,
    triangles: Vec<InteriorTriangle>,
}

impl InteriorTriangulationDraw {
    pub fn fill(raw: &RawPath, matrix: Mat2d, paint: Paint) -> Self {
        let mut path = PathDraw::new(matrix, paint);
        path.patch_span = OUTER_CURVE_PATCH_SEGMENT_SPAN;

        let mut triangles = Vec::new();
        for contour in raw.contours() {
            path.push_contour(contour.cubics[0][0], true);
            for pts in contour.cubics.iter() {
                path.push_cubic(*pts, Vec2::ZERO, ContourFlags::empty(), OUTER_CURVE_PATCH_SEGMENT_SPAN, 0, 1);
            }

            // Fan over the chord polygon. Weights carry the device-space orientation so they agree
            // with the orientation of the outer curve patches.
            let chord = contour.cubics.iter().map(|c| c[0]).collect::<Vec<_>>();
            for i in 1..chord.len().saturating_sub(1) {
                let pts = [chord[0], chord[i], chord[i + 1]];
                let [a, b, c] = pts.map(|p| matrix.map(p));
                let area = (b - a).cross(c - a);
                if area != 0.0 {
                    triangles.push(InteriorTriangle {
                        pts,
                        weight: if area > 0.0 { 1 } else { -1 },
                    });
                }
            }
        }

        Self { path, triangles }
    }

    pub fn with_fill_rule(mut self, fill_rule: FillRule) -> Self {
        self.path = self.path.with_fill_rule(fill_rule);
        self
    }

    pub fn with_clip_id(mut self, clip_id: u32) -> Self {
        self.path = self.path.with_clip_id(clip_id);
        self
    }

    pub fn with_clip_rect(mut self, rect: Aabb, matrix: &Mat2d) -> Self {
        self.path = self.path.with_clip_rect(rect, matrix);
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.path = self.path.with_blend_mode(blend_mode);
        self
    }

    /// The outer curves, one patch per cubic.
    pub fn path(&self) -> &PathDraw {
        &self.path
    }

    pub fn triangles(&self) -> &[InteriorTriangle] {
        &self.triangles
    }

    fn resource_counts(&self) -> ResourceCounters {
        ResourceCounters {
            outer_cubic_tess_vertex_count: self.path.tess_vertex_count() as usize,
            path_count: 1,
            contour_count: self.path.contours().count(),
            max_tessellated_segment_count: self.path.max_tessellated_segment_count() as usize,
            max_triangle_vertex_count: self.triangles.len() * 3,
            ..Default::default()
        }
    }
}

/// A textured rectangle: the unit square mapped through `matrix`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRectDraw {
    pub texture: ImageTexture,
    pub matrix: Mat2d,
    pub opacity: f32,
    pub paint: PaintState,
}

impl ImageRectDraw {
    pub fn new(texture: ImageTexture, matrix: Mat2d, opacity: f32) -> Self {
        Self {
            texture,
            matrix,
            opacity,
            paint: PaintState::new(Paint::Image { texture, opacity }),
        }
    }

    pub fn with_clip_id(mut self, clip_id: u32) -> Self {
        self.paint.clip_id = clip_id;
        self
    }

    pub fn with_clip_rect(mut self, rect: Aabb, matrix: &Mat2d) -> Self {
        self.paint.clip_rect = Some(clip_rect_inverse_matrix(rect, matrix));
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.paint.blend_mode = blend_mode;
        self
    }

    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for p in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
            bounds.add_point(self.matrix.map(p.into()));
        }
        bounds
    }
}

/// A textured triangle mesh from caller-owned render buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageMeshDraw {
    pub texture: ImageTexture,
    /// `[f32; 2]` positions.
    pub vertices: RenderBuffer,
    /// `[f32; 2]` texture coordinates in `[0, 1]`.
    pub uvs: RenderBuffer,
    /// `u16` indices, three per triangle.
    pub indices: RenderBuffer,
    pub index_count: u32,
    pub matrix: Mat2d,
    pub opacity: f32,
    /// Bounds of the mesh vertices before `matrix`.
    pub local_bounds: Aabb,
    pub paint: PaintState,
}

impl ImageMeshDraw {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        texture: ImageTexture,
        vertices: RenderBuffer,
        uvs: RenderBuffer,
        indices: RenderBuffer,
        index_count: u32,
        local_bounds: Aabb,
        matrix: Mat2d,
        opacity: f32,
    ) -> Self {
        Self {
            texture,
            vertices,
            uvs,
            indices,
            index_count,
            matrix,
            opacity,
            local_bounds,
            paint: PaintState::new(Paint::Image { texture, opacity }),
        }
    }

    pub fn with_clip_id(mut self, clip_id: u32) -> Self {
        self.paint.clip_id = clip_id;
        self
    }

    pub fn with_clip_rect(mut self, rect: Aabb, matrix: &Mat2d) -> Self {
        self.paint.clip_rect = Some(clip_rect_inverse_matrix(rect, matrix));
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.paint.blend_mode = blend_mode;
        self
    }

    pub fn bounds(&self) -> Aabb {
        let b = self.local_bounds;
        let mut bounds = Aabb::EMPTY;
        for p in [b.min, Vec2::new(b.max.x, b.min.y), b.max, Vec2::new(b.min.x, b.max.y)] {
            bounds.add_point(self.matrix.map(p));
        }
        bounds
    }
}

impl Draw {
    /// Resources this draw consumes in a logical flush.
    pub fn resource_counts(&self, interlock_mode: InterlockMode) -> ResourceCounters {
        match self {
            Draw::Path(draw) => draw.resource_counts(interlock_mode),
            Draw::InteriorTriangulation(draw) => draw.resource_counts(),
            Draw::ImageRect(_) | Draw::ImageMesh(_) => ResourceCounters {
                image_draw_count: 1,
                ..Default::default()
            },
            Draw::Barrier => ResourceCounters::default(),
        }
    }

    /// Pixels this draw may touch.
    pub fn pixel_bounds(&self) -> Bounds {
        match self {
            Draw::Path(draw) => draw.bounds().round_out(),
            Draw::InteriorTriangulation(draw) => draw.path.bounds().round_out(),
            Draw::ImageRect(draw) => draw.bounds().round_out(),
            Draw::ImageMesh(draw) => draw.bounds().round_out(),
            Draw::Barrier => Bounds::default(),
        }
    }

    pub fn paint(&self) -> Option<&PaintState> {
        match self {
            Draw::Path(draw) => Some(&draw.paint),
            Draw::InteriorTriangulation(draw) => Some(&draw.path.paint),
            Draw::ImageRect(draw) => Some(&draw.paint),
            Draw::ImageMesh(draw) => Some(&draw.paint),
            Draw::Barrier => None,
        }
    }

    pub fn gradient(&self) -> Option<&Arc<Gradient>> {
        self.paint()?.paint.gradient()
    }

    /// Texture the draw's batch must bind.
    pub fn image_texture(&self) -> Option<ImageTexture> {
        self.paint()?.paint.image_texture()
    }

    pub fn shader_features(&self) -> ShaderFeatures {
        match self {
            Draw::Path(draw) => draw.shader_features(),
            Draw::InteriorTriangulation(draw) => draw.path.shader_features(),
            Draw::ImageRect(draw) => draw.paint.shader_features(),
            Draw::ImageMesh(draw) => draw.paint.shader_features(),
            Draw::Barrier => ShaderFeatures::empty(),
        }
    }

    /// Fills other than clip updates. Dropped when a frame disables fills.
    pub fn is_fill(&self) -> bool {
        let is_clip = self.paint().is_some_and(|p| p.paint.paint_type() == PaintType::ClipUpdate);
        match self {
            Draw::Path(draw) => !draw.is_stroke() && !is_clip,
            Draw::InteriorTriangulation(_) => !is_clip,
            _ => false,
        }
    }

    pub fn is_stroke(&self) -> bool {
        matches!(self, Draw::Path(draw) if draw.is_stroke())
    }

    /// Ordering of draw kinds within a draw group.
    pub(crate) fn sort_rank(&self) -> u8 {
        match self {
            Draw::Path(_) => 0,
            Draw::InteriorTriangulation(_) => 1,
            Draw::ImageRect(_) => 2,
            Draw::ImageMesh(_) => 3,
            Draw::Barrier => 7,
        }
    }
}

impl From<PathDraw> for Draw {
    fn from(draw: PathDraw) -> Self {
        Draw::Path(draw)
    }
}

impl From<InteriorTriangulationDraw> for Draw {
    fn from(draw: InteriorTriangulationDraw) -> Self {
        Draw::InteriorTriangulation(draw)
    }
}

impl From<ImageRectDraw> for Draw {
    fn from(draw: ImageRectDraw) -> Self {
        Draw::ImageRect(draw)
    }
}

impl From<ImageMeshDraw> for Draw {
    fn from(draw: ImageMeshDraw) -> Self {
        Draw::ImageMesh(draw)
    }
}
