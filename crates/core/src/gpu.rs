//! GPU-visible constants, flags and record layouts shared by the core and every backend.

use crate::{
    Bounds, GpuRecord, ImageTexture, RenderBuffer, RenderTarget,
    math::{Mat2d, Vec2},
};
use bitflags::bitflags;
use std::{any::Any, sync::Arc};

/// Width of the tessellation texture. Vertex spans wrap to the next row past this.
pub const TESS_TEXTURE_WIDTH: u32 = 2048;

/// Width of the gradient texture.
pub const GRAD_TEXTURE_WIDTH: u32 = 512;

/// Number of two-texel ramps that fit in one gradient texture row.
pub const SIMPLE_GRADIENTS_PER_ROW: u32 = GRAD_TEXTURE_WIDTH / 2;

/// Vertices per patch in the midpoint fan region of the tessellation texture.
pub const MIDPOINT_FAN_PATCH_SEGMENT_SPAN: u32 = 8;

/// Vertices per patch in the outer curve region (one patch per cubic).
pub const OUTER_CURVE_PATCH_SEGMENT_SPAN: u32 = 17;

/// Largest addressable path (and clip) ID.
pub const MAX_PATH_ID: u32 = 0xffff;

/// Largest addressable contour ID.
pub const MAX_CONTOUR_ID: u32 = 0xffff;

pub const MAX_PARAMETRIC_SEGMENTS: u32 = 1023;
pub const MAX_POLAR_SEGMENTS: u32 = 1023;

/// Segments in a join that is not round (miter or bevel).
pub const NUM_SEGMENTS_IN_MITER_OR_BEVEL_JOIN: u32 = 5;

/// Miter limit used for strokes.
pub const MITER_LIMIT: f32 = 4.0;

/// Precision used for Wang's formula, in segments per pixel of deviation.
pub const PARAMETRIC_PRECISION: f32 = 4.0;

/// Every flush's region of a storage buffer starts on a multiple of this many elements.
pub const STORAGE_BUFFER_ELEMENT_ALIGNMENT: usize = 4;

/// Gradient span flags, packed in the upper bits of [`GradientSpan::y_with_flags`].
pub const GRADIENT_SPAN_LEFT_BORDER: u32 = 0x8000_0000;
pub const GRADIENT_SPAN_RIGHT_BORDER: u32 = 0x4000_0000;
pub const GRADIENT_SPAN_COMPLEX_BORDER: u32 = 0x2000_0000;

/// Paint params flags, see [`PaintData::params`].
pub const PAINT_FLAG_NON_ZERO_FILL: u32 = 0x100;
pub const PAINT_FLAG_EVEN_ODD: u32 = 0x200;
pub const PAINT_FLAG_HAS_CLIP_RECT: u32 = 0x400;

/// Tolerance used when comparing a packed clip ID that went through an 8-bit-per-channel
/// attachment against the expected ID.
pub const CLIP_ID_TOLERANCE: f32 = 0.25 / 255.0;

bitflags! {
    /// Flags packed together with a contour ID into every tessellation span.
    ///
    /// The bit positions are part of the GPU-visible layout.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContourFlags: u32 {
        /// The cubic is really a triangle `p0, p1, p3` (used for interior triangulation).
        const RETROFITTED_TRIANGLE = 1 << 31;
        /// Vertices past the declared segment counts are collapsed instead of drawn.
        const CULL_EXCESS_TESSELLATION_SEGMENTS = 1 << 30;
        const JOIN_TYPE_MASK = 7 << 27;
        const MITER_CLIP_JOIN = 5 << 27;
        const MITER_REVERT_JOIN = 4 << 27;
        const BEVEL_JOIN = 3 << 27;
        const ROUND_JOIN = 2 << 27;
        const FEATHER_JOIN = 1 << 27;
        /// The join at the end of this cubic emulates a stroke cap.
        const EMULATED_STROKE_CAP = 1 << 26;
        const NEGATE_PATH_FILL_COVERAGE = 1 << 25;
        /// The span was written right to left into the mirrored region of its path.
        const MIRRORED_CONTOUR = 1 << 24;
        const CONTOUR_ID_MASK = 0xffff;
    }
}

bitflags! {
    /// Shader features a draw batch needs. Backends pick a shader permutation from these.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShaderFeatures: u32 {
        const ENABLE_CLIPPING = 1 << 0;
        const ENABLE_CLIP_RECT = 1 << 1;
        const ENABLE_ADVANCED_BLEND = 1 << 2;
        const ENABLE_EVEN_ODD = 1 << 3;
        const ENABLE_NESTED_CLIPPING = 1 << 4;
        const ENABLE_HSL_BLEND_MODES = 1 << 5;
    }
}

impl ContourFlags {
    /// Pack a contour ID together with these flags.
    pub fn with_contour_id(self, contour_id: u32) -> u32 {
        debug_assert!(contour_id <= MAX_CONTOUR_ID);
        (self - Self::CONTOUR_ID_MASK).bits() | (contour_id & Self::CONTOUR_ID_MASK.bits())
    }

    /// Split a packed value into its contour ID and flags.
    pub fn unpack(contour_id_with_flags: u32) -> (u32, Self) {
        (
            contour_id_with_flags & Self::CONTOUR_ID_MASK.bits(),
            Self::from_bits_retain(contour_id_with_flags & !Self::CONTOUR_ID_MASK.bits()),
        )
    }

    pub fn join_type(self) -> Self {
        self & Self::JOIN_TYPE_MASK
    }
}

/// Paint type, stored in the low 4 bits of [`PaintData::params`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PaintType {
    ClipUpdate = 0,
    SolidColor = 1,
    LinearGradient = 2,
    RadialGradient = 3,
    Image = 4,
}

impl PaintType {
    pub fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits & 0xf {
            0 => Self::ClipUpdate,
            1 => Self::SolidColor,
            2 => Self::LinearGradient,
            3 => Self::RadialGradient,
            4 => Self::Image,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// Blend mode, stored in bits 4..8 of [`PaintData::params`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BlendMode {
    #[default]
    SrcOver = 0,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Multiply,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub const ALL: [BlendMode; 16] = [
        BlendMode::SrcOver,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Multiply,
        BlendMode::Hue,
        BlendMode::Saturation,
        BlendMode::Color,
        BlendMode::Luminosity,
    ];

    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 0xf) as usize]
    }

    pub fn is_hsl(self) -> bool {
        matches!(self, Self::Hue | Self::Saturation | Self::Color | Self::Luminosity)
    }

    /// Shader features a draw with this blend mode needs.
    pub fn shader_features(self) -> ShaderFeatures {
        match self {
            Self::SrcOver => ShaderFeatures::empty(),
            mode if mode.is_hsl() => ShaderFeatures::ENABLE_ADVANCED_BLEND | ShaderFeatures::ENABLE_HSL_BLEND_MODES,
            _ => ShaderFeatures::ENABLE_ADVANCED_BLEND,
        }
    }
}

/// Type of a GPU draw batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawType {
    /// Path coverage from the midpoint fan region of the tessellation texture.
    /// Elements are patches of [`MIDPOINT_FAN_PATCH_SEGMENT_SPAN`] vertices.
    MidpointFanPatches,
    /// Antialiased curve boundaries of interior-triangulated paths.
    /// Elements are patches of [`OUTER_CURVE_PATCH_SEGMENT_SPAN`] vertices.
    OuterCurvePatches,
    /// Solid interior triangles. Elements are vertices of the triangle buffer.
    InteriorTriangulation,
    ImageRect,
    ImageMesh,
    /// Resolves accumulated coverage into the render target (atomic mode only).
    AtomicResolve,
}

/// How overlapping draws are synchronized on the GPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InterlockMode {
    /// Fragment shader invocations are ordered by the rasterizer; paths resolve in draw order.
    #[default]
    RasterOrdering,
    /// Coverage is accumulated with atomics; overlapping draw groups are separated by barriers
    /// and resolved at the end of the flush.
    Atomics,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadAction {
    #[default]
    Clear,
    Preserve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlushType {
    /// The last flush of a frame. Closes the frame.
    EndOfFrame,
    /// A flush in the middle of a frame. The frame stays open and later flushes preserve the target.
    Intermediate,
}

/// Where a color ramp landed in the gradient texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorRampLocation {
    /// Row within the simple region, or within the complex region when `col == COMPLEX_COL`.
    pub row: u16,
    pub col: u16,
}

impl ColorRampLocation {
    pub const COMPLEX_COL: u16 = u16::MAX;

    pub fn is_complex(&self) -> bool {
        self.col == Self::COMPLEX_COL
    }

    /// Row in the full gradient texture, given where the complex rows begin.
    pub fn texture_row(&self, complex_offset_y: u32) -> u32 {
        if self.is_complex() {
            complex_offset_y + self.row as u32
        } else {
            self.row as u32
        }
    }
}

/// Pack a clip ID as the two unorm8 channels it occupies in the clip attachment.
pub fn clip_id_to_unorm(clip_id: u32) -> [f32; 2] {
    [
        (clip_id & 0xff) as f32 / 255.0,
        ((clip_id >> 8) & 0xff) as f32 / 255.0,
    ]
}

/// Fuzzy equality between a stored clip value and an expected clip ID.
pub fn clip_ids_equal(stored: [f32; 2], clip_id: u32) -> bool {
    let expected = clip_id_to_unorm(clip_id);
    (stored[0] - expected[0]).abs() < CLIP_ID_TOLERANCE && (stored[1] - expected[1]).abs() < CLIP_ID_TOLERANCE
}

/// Per-flush uniforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, GpuRecord)]
pub struct FlushUniforms {
    pub render_target_width: u32,
    pub render_target_height: u32,
    pub color_clear_value: u32,
    pub coverage_clear_value: u32,
    /// `[left, top, right, bottom]` of everything this flush touches.
    pub render_target_update_bounds: [u32; 4],
    pub gradient_inverse_viewport_y: f32,
    pub tess_inverse_viewport_y: f32,
    pub path_id_granularity: u32,
}

/// One record per path.
#[derive(Clone, Copy, Debug, Default, PartialEq, GpuRecord)]
pub struct PathData {
    pub matrix: Mat2d,
    /// 0 for fills.
    pub stroke_radius: f32,
}

/// One record per path.
#[derive(Clone, Copy, Debug, Default, PartialEq, GpuRecord)]
pub struct PaintData {
    /// Paint type (bits 0..4), blend mode (bits 4..8), fill and clip rect flags, clip ID (bits 16..32).
    pub params: u32,
    /// Color, packed clip IDs, gradient row or opacity, depending on the paint type.
    pub value: u32,
}

impl PaintData {
    pub fn paint_type(&self) -> Option<PaintType> {
        PaintType::from_bits(self.params)
    }

    pub fn blend_mode(&self) -> BlendMode {
        BlendMode::from_bits(self.params >> 4)
    }

    pub fn clip_id(&self) -> u32 {
        self.params >> 16
    }

    pub fn fill_rule(&self) -> FillRule {
        if self.params & PAINT_FLAG_EVEN_ODD != 0 {
            FillRule::EvenOdd
        } else {
            FillRule::NonZero
        }
    }

    pub fn has_clip_rect(&self) -> bool {
        self.params & PAINT_FLAG_HAS_CLIP_RECT != 0
    }
}

/// Auxiliary paint data: gradient/image transform and clip rect.
#[derive(Clone, Copy, Debug, Default, PartialEq, GpuRecord)]
pub struct PaintAuxData {
    /// Device to paint space, 2x2 part (column-major).
    pub matrix: [f32; 4],
    pub translate: [f32; 2],
    /// Scale and offset from ramp `t` to normalized gradient texture `x`.
    pub gradient_span: [f32; 2],
    /// Device to clip rect space, where the rect is `[-1, 1]²`.
    pub clip_rect_matrix: [f32; 4],
    pub clip_rect_translate: [f32; 2],
}

/// One record per contour.
#[derive(Clone, Copy, Debug, Default, PartialEq, GpuRecord)]
pub struct ContourData {
    pub midpoint: Vec2,
    pub path_id: u32,
    pub vertex_index0: u32,
    pub closed: u32,
}

/// A run of tessellation vertices generated from one cubic (or one wrap of it).
#[derive(Clone, Copy, Debug, Default, PartialEq, GpuRecord)]
pub struct TessVertexSpan {
    pub pts: [Vec2; 4],
    pub join_tangent: Vec2,
    pub y: i32,
    /// Row of the mirrored copy, or -1 when there is none.
    pub reflection_y: i32,
    pub x0: i32,
    pub x1: i32,
    pub reflection_x0: i32,
    pub reflection_x1: i32,
    /// `parametric | polar << 10 | join << 20`
    pub segment_counts: u32,
    pub contour_id_with_flags: u32,
}

impl TessVertexSpan {
    pub fn pack_segment_counts(parametric: u32, polar: u32, join: u32) -> u32 {
        debug_assert!(parametric < 1 << 10 && polar < 1 << 10 && join < 1 << 10);
        parametric | polar << 10 | join << 20
    }

    /// `(parametric, polar, join)`
    pub fn segment_counts(&self) -> (u32, u32, u32) {
        (
            self.segment_counts & 0x3ff,
            (self.segment_counts >> 10) & 0x3ff,
            (self.segment_counts >> 20) & 0x3ff,
        )
    }
}

/// A two-stop ramp occupying two adjacent gradient texels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, GpuRecord)]
pub struct TwoTexelRamp {
    pub color0: u32,
    pub color1: u32,
}

/// One stop interval of a complex ramp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, GpuRecord)]
pub struct GradientSpan {
    /// Start and end of the interval on the ramp, unorm16 each.
    pub x0x1: u32,
    /// Row within the complex region, plus border flags.
    pub y_with_flags: u32,
    pub color0: u32,
    pub color1: u32,
}

impl GradientSpan {
    pub fn x0(&self) -> f32 {
        (self.x0x1 & 0xffff) as f32 / 65535.0
    }

    pub fn x1(&self) -> f32 {
        (self.x0x1 >> 16) as f32 / 65535.0
    }

    pub fn row(&self) -> u32 {
        self.y_with_flags & 0x1fff_ffff
    }
}

/// A vertex of an interior triangulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, GpuRecord)]
pub struct TriangleVertex {
    pub point: Vec2,
    /// `weight << 16 | path_id`
    pub weight_path_id: i32,
}

impl TriangleVertex {
    pub fn new(point: Vec2, weight: i16, path_id: u32) -> Self {
        Self {
            point,
            weight_path_id: (weight as i32) << 16 | (path_id & 0xffff) as i32,
        }
    }

    pub fn weight(&self) -> i32 {
        self.weight_path_id >> 16
    }

    pub fn path_id(&self) -> u32 {
        (self.weight_path_id & 0xffff) as u32
    }
}

/// Per-draw uniforms of image rects and image meshes.
#[derive(Clone, Copy, Debug, Default, PartialEq, GpuRecord)]
pub struct ImageDrawUniforms {
    /// Maps the unit square (rects) or mesh vertices to device space.
    pub view_matrix: Mat2d,
    pub opacity: f32,
    pub clip_rect_matrix: [f32; 4],
    pub clip_rect_translate: [f32; 2],
    pub clip_id: u32,
    pub blend_mode: u32,
}

/// Vertex, uv and index buffers of an image mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageMeshBuffers {
    pub vertices: RenderBuffer,
    pub uvs: RenderBuffer,
    pub indices: RenderBuffer,
}

/// One GPU dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawBatch {
    pub draw_type: DrawType,
    pub base_element: u32,
    pub element_count: u32,
    pub shader_features: ShaderFeatures,
    /// A memory barrier must be issued before this batch.
    pub needs_barrier: bool,
    pub image_texture: Option<ImageTexture>,
    /// Index of the [`ImageDrawUniforms`] record, relative to the flush's first image draw.
    pub image_draw_index: u32,
    pub mesh: Option<ImageMeshBuffers>,
}

impl DrawBatch {
    pub fn new(draw_type: DrawType, base_element: u32) -> Self {
        Self {
            draw_type,
            base_element,
            element_count: 0,
            shader_features: ShaderFeatures::empty(),
            needs_barrier: false,
            image_texture: None,
            image_draw_index: 0,
            mesh: None,
        }
    }
}

/// Gradient texture layout of one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GradientTextureLayout {
    /// First row of the complex region.
    pub complex_offset_y: u32,
    /// Rows this flush uses.
    pub height: u32,
}

/// Everything a backend needs to execute one logical flush.
#[derive(Clone, Default)]
pub struct FlushDescriptor {
    pub render_target: RenderTarget,
    pub interlock_mode: InterlockMode,
    pub load_action: LoadAction,
    pub clear_color: u32,

    pub flush_uniform_index: usize,
    pub first_path: usize,
    pub first_paint: usize,
    pub first_paint_aux: usize,
    pub first_contour: usize,
    pub first_simple_gradient: usize,
    pub simple_gradient_count: usize,
    pub first_complex_gradient_span: usize,
    pub complex_gradient_span_count: usize,
    pub first_tess_vertex_span: usize,
    pub tess_vertex_span_count: usize,
    pub first_triangle_vertex: usize,
    pub has_triangle_vertices: bool,
    pub first_image_draw: usize,

    pub gradient_layout: GradientTextureLayout,
    /// Rows of the tessellation texture this flush uses.
    pub tess_data_height: u32,
    pub combined_shader_features: ShaderFeatures,
    pub draw_list: Vec<DrawBatch>,

    pub wireframe: bool,
    pub is_final_flush_of_frame: bool,
    pub flush_index: usize,
    pub backend_data: Option<Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for FlushDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushDescriptor")
            .field("render_target", &self.render_target)
            .field("interlock_mode", &self.interlock_mode)
            .field("load_action", &self.load_action)
            .field("first_path", &self.first_path)
            .field("tess_vertex_span_count", &self.tess_vertex_span_count)
            .field("combined_shader_features", &self.combined_shader_features)
            .field("draw_list", &self.draw_list)
            .field("flush_index", &self.flush_index)
            .finish_non_exhaustive()
    }
}

/// Device-space update bounds in the `[left, top, right, bottom]` order of [`FlushUniforms`].
pub fn bounds_to_uniform(bounds: Bounds) -> [u32; 4] {
    if bounds.is_empty() {
        [0; 4]
    } else {
        [bounds.left, bounds.top, bounds.right, bounds.bottom]
    }
}
