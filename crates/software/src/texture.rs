use crate::{blend::lerp_unpremultiplied, buffer::Buffer, records::FlushRecords};
use plsdraw_core::{
    ContourFlags, GRAD_TEXTURE_WIDTH, GRADIENT_SPAN_LEFT_BORDER, GRADIENT_SPAN_RIGHT_BORDER, SIMPLE_GRADIENTS_PER_ROW,
    TESS_TEXTURE_WIDTH, TessVertexSpan,
    math::{Vec2, eval_cubic},
};

/// One texel of the tessellation texture: a device-space vertex and its packed contour ID.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TessVertex {
    pub point: Vec2,
    pub contour_id_with_flags: u32,
}

impl TessVertex {
    /// 0 for texels no span wrote.
    pub fn contour_id(&self) -> u32 {
        ContourFlags::unpack(self.contour_id_with_flags).0
    }

    pub fn is_mirrored(&self) -> bool {
        self.contour_id_with_flags & ContourFlags::MIRRORED_CONTOUR.bits() != 0
    }
}

/// Local-space position of vertex `k` of a span.
///
/// The first `parametric + polar - 1` vertices walk the curve, the join vertices sit on its end point.
pub fn span_vertex(span: &TessVertexSpan, k: u32) -> Vec2 {
    let (parametric, polar, _) = span.segment_counts();
    let curve = (parametric + polar).saturating_sub(1);
    if k < curve {
        eval_cubic(&span.pts, k as f32 / curve as f32)
    } else {
        span.pts[3]
    }
}

#[derive(Debug, Default)]
pub struct TessellationTexture {
    vertices: Vec<TessVertex>,
    height: u32,
}

impl TessellationTexture {
    pub fn resize(&mut self, height: u32) {
        self.vertices.clear();
        self.vertices.resize(TESS_TEXTURE_WIDTH as usize * height as usize, TessVertex::default());
        self.height = height;
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn vertex(&self, index: u32) -> TessVertex {
        self.vertices.get(index as usize).copied().unwrap_or_default()
    }

    /// Expand every span of a flush into device-space vertices, including mirrored copies.
    pub fn write_spans(&mut self, records: &FlushRecords) {
        let desc = records.desc();
        if desc.tess_data_height > self.height {
            log::warn!(
                "tessellation texture has {} rows, flush needs {}",
                self.height,
                desc.tess_data_height
            );
            self.resize(desc.tess_data_height);
        }

        let used = (TESS_TEXTURE_WIDTH * desc.tess_data_height) as usize;
        self.vertices[..used].fill(TessVertex::default());

        let width = TESS_TEXTURE_WIDTH as i32;
        for i in 0..desc.tess_vertex_span_count {
            let span = records.tess_span(i);
            let (contour_id, _) = ContourFlags::unpack(span.contour_id_with_flags);
            let matrix = records.path(records.contour(contour_id).path_id).matrix;

            for x in span.x0.max(0)..span.x1.min(width) {
                let point = matrix.map(span_vertex(&span, (x - span.x0) as u32));
                self.set(span.y, x, point, span.contour_id_with_flags);
            }

            if span.reflection_y >= 0 {
                let flags = span.contour_id_with_flags | ContourFlags::MIRRORED_CONTOUR.bits();
                for x in span.reflection_x1.max(0)..span.reflection_x0.min(width) {
                    let point = matrix.map(span_vertex(&span, (span.reflection_x0 - 1 - x) as u32));
                    self.set(span.reflection_y, x, point, flags);
                }
            }
        }
    }

    fn set(&mut self, y: i32, x: i32, point: Vec2, contour_id_with_flags: u32) {
        let index = y as usize * TESS_TEXTURE_WIDTH as usize + x as usize;
        if let Some(vertex) = self.vertices.get_mut(index) {
            *vertex = TessVertex {
                point,
                contour_id_with_flags,
            };
        }
    }
}

/// Render the color ramps of a flush: two-texel simple ramps first, one row per complex ramp after.
pub fn render_gradients(texture: &mut Buffer, records: &FlushRecords) {
    let desc = records.desc();
    let layout = desc.gradient_layout;
    let width = GRAD_TEXTURE_WIDTH as usize;
    if texture.height() < layout.height as usize || texture.width() != width {
        log::warn!("gradient texture has {} rows, flush needs {}", texture.height(), layout.height);
        texture.resize(width, layout.height as usize);
    }

    let pixels = texture.pixels_mut();
    for i in 0..desc.simple_gradient_count {
        let ramp = records.simple_ramp(i);
        let row = i / SIMPLE_GRADIENTS_PER_ROW as usize;
        let col = (i % SIMPLE_GRADIENTS_PER_ROW as usize) * 2;
        pixels[row * width + col] = ramp.color0;
        pixels[row * width + col + 1] = ramp.color1;
    }

    for i in 0..desc.complex_gradient_span_count {
        let span = records.complex_span(i);
        let row = (layout.complex_offset_y + span.row()) as usize;
        let Some(line) = pixels.get_mut(row * width..(row + 1) * width) else {
            continue;
        };

        let (t0, t1) = (span.x0(), span.x1());
        let x0 = ((t0 * width as f32).round() as usize).min(width);
        let x1 = ((t1 * width as f32).round() as usize).min(width);
        for (x, pixel) in line.iter_mut().enumerate().take(x1).skip(x0) {
            let t = ((x as f32 + 0.5) / width as f32 - t0) / (t1 - t0).max(f32::EPSILON);
            *pixel = lerp_unpremultiplied(span.color0, span.color1, t.clamp(0.0, 1.0));
        }

        if span.y_with_flags & GRADIENT_SPAN_LEFT_BORDER != 0 {
            line[..x0].fill(span.color0);
        }
        if span.y_with_flags & GRADIENT_SPAN_RIGHT_BORDER != 0 {
            line[x1..].fill(span.color1);
        }
    }
}
