use plsdraw_core::{
    BufferKind, ContourData, FlushDescriptor, FlushUniforms, GpuRecord, GradientSpan, ImageDrawUniforms,
    PaintAuxData, PaintData, PathData, TessVertexSpan, TriangleVertex, TwoTexelRamp, read_record,
};

/// Typed access to the records one logical flush wrote into the backend's buffers.
///
/// Path, paint and contour IDs are flush-relative; the flush's first element is added here.
pub struct FlushRecords<'a> {
    buffers: &'a [Vec<u8>; BufferKind::COUNT],
    desc: &'a FlushDescriptor,
}

impl<'a> FlushRecords<'a> {
    pub fn new(buffers: &'a [Vec<u8>; BufferKind::COUNT], desc: &'a FlushDescriptor) -> Self {
        Self { buffers, desc }
    }

    pub fn desc(&self) -> &'a FlushDescriptor {
        self.desc
    }

    fn read<T: GpuRecord>(&self, kind: BufferKind, index: usize) -> T {
        read_record(&self.buffers[kind.index()], index)
    }

    pub fn uniforms(&self) -> FlushUniforms {
        self.read(BufferKind::FlushUniform, self.desc.flush_uniform_index)
    }

    pub fn path(&self, path_id: u32) -> PathData {
        self.read(BufferKind::Path, self.desc.first_path + path_id as usize)
    }

    pub fn paint(&self, path_id: u32) -> PaintData {
        self.read(BufferKind::Paint, self.desc.first_paint + path_id as usize)
    }

    pub fn paint_aux(&self, path_id: u32) -> PaintAuxData {
        self.read(BufferKind::PaintAux, self.desc.first_paint_aux + path_id as usize)
    }

    pub fn contour(&self, contour_id: u32) -> ContourData {
        self.read(BufferKind::Contour, self.desc.first_contour + contour_id as usize)
    }

    pub fn tess_span(&self, index: usize) -> TessVertexSpan {
        self.read(BufferKind::TessVertexSpan, self.desc.first_tess_vertex_span + index)
    }

    pub fn simple_ramp(&self, index: usize) -> TwoTexelRamp {
        self.read(BufferKind::SimpleGradient, self.desc.first_simple_gradient + index)
    }

    pub fn complex_span(&self, index: usize) -> GradientSpan {
        self.read(BufferKind::ComplexGradientSpan, self.desc.first_complex_gradient_span + index)
    }

    /// `index` is absolute, as in the draw list.
    pub fn triangle_vertex(&self, index: usize) -> TriangleVertex {
        self.read(BufferKind::TriangleVertex, index)
    }

    pub fn image_draw(&self, image_draw_index: u32) -> ImageDrawUniforms {
        self.read(BufferKind::ImageDrawUniform, self.desc.first_image_draw + image_draw_index as usize)
    }
}
