use crate::{
    ContourFlags, TESS_TEXTURE_WIDTH, TessVertexSpan, allocator::RecordSink, draw::CubicSegment, math::Vec2,
};

/// Writes the tessellation vertex spans of paths into a mapped span buffer.
///
/// A path owns a contiguous run of the tessellation texture. Spans that cross the right edge of the
/// texture are repeated on the next row with shifted `x` ranges. Mirrored paths own twice the run:
/// the first half receives a right-to-left copy of the second.
pub struct TessellationWriter<'a> {
    spans: RecordSink<'a, TessVertexSpan>,
    span_count: usize,
    vertices_written: usize,
    location: u32,
    end: u32,
    mirrored_location: Option<u32>,
    mirrored_end: u32,
}

impl<'a> TessellationWriter<'a> {
    pub fn new(spans: RecordSink<'a, TessVertexSpan>) -> Self {
        Self {
            spans,
            span_count: 0,
            vertices_written: 0,
            location: 0,
            end: 0,
            mirrored_location: None,
            mirrored_end: 0,
        }
    }

    /// Start a path of `vertex_count` vertices at `base`. Returns where its forward vertices begin.
    pub fn begin_path(&mut self, base: u32, vertex_count: u32, mirrored: bool) -> u32 {
        debug_assert_eq!(self.location, self.end, "previous path was not finished");

        if mirrored {
            self.mirrored_location = Some(base + vertex_count);
            self.mirrored_end = base;
            self.location = base + vertex_count;
        } else {
            self.mirrored_location = None;
            self.location = base;
        }

        self.end = self.location + vertex_count;
        self.location
    }

    /// Pad the current contour with `count` vertices collocated at `point`.
    pub fn push_padding(&mut self, point: Vec2, count: u32, contour_id: u32) {
        if count == 0 {
            return;
        }

        self.push_span(
            [point; 4],
            Vec2::ZERO,
            TessVertexSpan::pack_segment_counts(0, 0, 0),
            ContourFlags::empty().with_contour_id(contour_id),
            count,
        );
    }

    pub fn push_cubic(&mut self, cubic: &CubicSegment, contour_id: u32) {
        self.push_span(
            cubic.pts,
            cubic.join_tangent,
            TessVertexSpan::pack_segment_counts(
                cubic.parametric_segments,
                cubic.polar_segments,
                cubic.join_segments,
            ),
            cubic.flags.with_contour_id(contour_id),
            cubic.vertex_count(),
        );
    }

    pub fn end_path(&mut self) {
        debug_assert_eq!(self.location, self.end, "path wrote the wrong number of vertices");
        if let Some(mirrored) = self.mirrored_location {
            debug_assert_eq!(mirrored, self.mirrored_end, "mirrored copy wrote the wrong number of vertices");
        }

        self.mirrored_location = None;
    }

    fn push_span(
        &mut self,
        pts: [Vec2; 4],
        join_tangent: Vec2,
        segment_counts: u32,
        contour_id_with_flags: u32,
        count: u32,
    ) {
        let width = TESS_TEXTURE_WIDTH as i32;
        let n = count as i32;

        let mut y = (self.location / TESS_TEXTURE_WIDTH) as i32;
        let mut x0 = (self.location % TESS_TEXTURE_WIDTH) as i32;
        let mut x1 = x0 + n;

        let (mut reflection_y, mut reflection_x0, mut reflection_x1) = match self.mirrored_location {
            Some(location) => {
                let y = ((location - 1) / TESS_TEXTURE_WIDTH) as i32;
                let x0 = ((location - 1) % TESS_TEXTURE_WIDTH) as i32 + 1;
                (y, x0, x0 - n)
            }
            None => (-1, 0, 0),
        };

        loop {
            self.spans.push(&TessVertexSpan {
                pts,
                join_tangent,
                y,
                reflection_y,
                x0,
                x1,
                reflection_x0,
                reflection_x1,
                segment_counts,
                contour_id_with_flags,
            });
            self.span_count += 1;

            if x1 <= width && reflection_x1 >= 0 {
                break;
            }

            y += 1;
            x0 -= width;
            x1 -= width;
            reflection_y -= 1;
            reflection_x0 += width;
            reflection_x1 += width;
        }

        self.location += count;
        self.vertices_written += count as usize;
        if let Some(location) = self.mirrored_location.as_mut() {
            *location -= count;
            self.vertices_written += count as usize;
        }
    }

    /// Vertices written so far, counting mirrored copies.
    pub fn vertices_written(&self) -> usize {
        self.vertices_written
    }

    pub fn span_count(&self) -> usize {
        self.span_count
    }
}
