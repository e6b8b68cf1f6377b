use crate::{
    FlushDescriptor, GpuRecord, ImageData, Size,
    gpu::{
        ContourData, FlushUniforms, GradientSpan, ImageDrawUniforms, PaintAuxData, PaintData, PathData,
        TessVertexSpan, TriangleVertex, TwoTexelRamp,
    },
};
use bitflags::bitflags;
use thiserror::Error;

/// The interface every graphics API implements.
///
/// The core calls these in a fixed order each frame: resize (if needed), map, write, unmap, flush.
pub trait Backend {
    /// What the platform supports. Queried once per frame.
    fn platform_features(&self) -> PlatformFeatures;

    /// Reallocate one of the per-frame buffers. Previous contents may be discarded.
    fn resize_buffer(
        &mut self,
        kind: BufferKind,
        size_in_bytes: usize,
        structure: BufferStructure,
    ) -> Result<(), BackendError>;

    /// Map the first `size_in_bytes` of a buffer for writing.
    ///
    /// The returned staging memory must be handed back through [`Backend::unmap_buffer`].
    fn map_buffer(&mut self, kind: BufferKind, size_in_bytes: usize) -> Result<MappedBuffer, BackendError>;

    /// Finish writing a buffer that was mapped with [`Backend::map_buffer`].
    fn unmap_buffer(&mut self, buffer: MappedBuffer);

    fn resize_gradient_texture(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    fn resize_tessellation_texture(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// Create a vertex/index buffer owned by the caller.
    fn make_render_buffer(
        &mut self,
        kind: RenderBufferType,
        flags: RenderBufferFlags,
        size_in_bytes: usize,
    ) -> Result<RenderBuffer, BackendError>;

    /// Map a render buffer for writing.
    fn map_render_buffer(&mut self, buffer: RenderBuffer) -> Result<&mut [u8], BackendError>;

    fn unmap_render_buffer(&mut self, buffer: RenderBuffer);

    /// Decode an encoded image (png, webp, ...) into a texture.
    fn decode_image_texture(&mut self, encoded: &[u8]) -> Result<ImageTexture, BackendError>;

    /// Upload raw pixels into a texture.
    fn make_image_texture(&mut self, data: ImageData) -> Result<ImageTexture, BackendError>;

    /// Execute one logical flush.
    fn flush(&mut self, desc: &FlushDescriptor) -> Result<(), BackendError>;
}

/// Platform capabilities the core adapts to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlatformFeatures {
    /// Fragment shader invocations can be ordered by the rasterizer.
    /// Without it the core falls back to [`InterlockMode::Atomics`](crate::InterlockMode::Atomics).
    pub supports_raster_ordering: bool,
}

/// A render target the backend created.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: u64,
    pub size: Size,
}

/// A static image texture.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ImageTexture(pub u64);

/// A caller-owned vertex, uv or index buffer.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct RenderBuffer(pub u64);

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum RenderBufferType {
    Vertex,
    Index,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RenderBufferFlags: u32 {
        /// The buffer is written once and never mapped again.
        const MAPPED_ONCE_AT_INITIALIZATION = 1 << 0;
    }
}

/// How a buffer will be bound.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum BufferStructure {
    Uniform,
    Storage,
    Vertex,
    /// Staging memory copied into a texture by the backend.
    TextureTransfer,
}

/// The per-frame buffers the core sizes, maps and writes.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum BufferKind {
    FlushUniform,
    ImageDrawUniform,
    Path,
    Paint,
    PaintAux,
    Contour,
    SimpleGradient,
    ComplexGradientSpan,
    TessVertexSpan,
    TriangleVertex,
}

impl BufferKind {
    pub const COUNT: usize = 10;

    pub const ALL: [BufferKind; Self::COUNT] = [
        BufferKind::FlushUniform,
        BufferKind::ImageDrawUniform,
        BufferKind::Path,
        BufferKind::Paint,
        BufferKind::PaintAux,
        BufferKind::Contour,
        BufferKind::SimpleGradient,
        BufferKind::ComplexGradientSpan,
        BufferKind::TessVertexSpan,
        BufferKind::TriangleVertex,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Size of one element in bytes.
    pub fn element_size(self) -> usize {
        match self {
            BufferKind::FlushUniform => FlushUniforms::BYTES,
            BufferKind::ImageDrawUniform => ImageDrawUniforms::BYTES,
            BufferKind::Path => PathData::BYTES,
            BufferKind::Paint => PaintData::BYTES,
            BufferKind::PaintAux => PaintAuxData::BYTES,
            BufferKind::Contour => ContourData::BYTES,
            BufferKind::SimpleGradient => TwoTexelRamp::BYTES,
            BufferKind::ComplexGradientSpan => GradientSpan::BYTES,
            BufferKind::TessVertexSpan => TessVertexSpan::BYTES,
            BufferKind::TriangleVertex => TriangleVertex::BYTES,
        }
    }

    pub fn structure(self) -> BufferStructure {
        match self {
            BufferKind::FlushUniform | BufferKind::ImageDrawUniform => BufferStructure::Uniform,
            BufferKind::Path | BufferKind::Paint | BufferKind::PaintAux | BufferKind::Contour => {
                BufferStructure::Storage
            }
            BufferKind::SimpleGradient => BufferStructure::TextureTransfer,
            BufferKind::ComplexGradientSpan | BufferKind::TessVertexSpan | BufferKind::TriangleVertex => {
                BufferStructure::Vertex
            }
        }
    }
}

/// Write-only staging memory of one mapped buffer.
///
/// Owned by the core between [`Backend::map_buffer`] and [`Backend::unmap_buffer`].
#[derive(Debug)]
pub struct MappedBuffer {
    pub kind: BufferKind,
    pub bytes: Vec<u8>,
}

impl MappedBuffer {
    pub fn new(kind: BufferKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }
}

/// Errors a backend can report. Any of them is fatal to the current frame.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to allocate {size} bytes for {what}")]
    AllocationFailed { what: &'static str, size: usize },

    #[error("mapped {requested} bytes of {kind:?} but only {allocated} are allocated")]
    MapOutOfRange {
        kind: BufferKind,
        requested: usize,
        allocated: usize,
    },

    #[error("{kind:?} is already mapped")]
    AlreadyMapped { kind: BufferKind },

    #[error("unknown {what} handle {id:#x}")]
    UnknownHandle { what: &'static str, id: u64 },

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("invalid image data: {0}")]
    InvalidImage(String),
}
