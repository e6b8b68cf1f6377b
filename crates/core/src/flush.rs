use crate::{
    Bounds, ColorRampLocation, ContourData, DrawType, FillRule, FlushDescriptor, FlushUniforms, GRAD_TEXTURE_WIDTH,
    GRADIENT_SPAN_COMPLEX_BORDER, GRADIENT_SPAN_LEFT_BORDER, GRADIENT_SPAN_RIGHT_BORDER, GradientSpan,
    GradientTextureLayout, ImageDrawUniforms, ImageMeshBuffers, InterlockMode, LoadAction, MAX_CONTOUR_ID,
    MIDPOINT_FAN_PATCH_SEGMENT_SPAN, OUTER_CURVE_PATCH_SEGMENT_SPAN, PAINT_FLAG_EVEN_ODD, PAINT_FLAG_HAS_CLIP_RECT,
    PAINT_FLAG_NON_ZERO_FILL, PaintAuxData, PaintData, PathData, RenderContextConfig, ResourceAllocationCounts,
    SIMPLE_GRADIENTS_PER_ROW, STORAGE_BUFFER_ELEMENT_ALIGNMENT, ShaderFeatures, TESS_TEXTURE_WIDTH, TriangleVertex,
    TwoTexelRamp,
    allocator::{MappedResources, RecordSink},
    batch::DrawBatcher,
    bounds_to_uniform,
    context::FrameDescriptor,
    draw::{Draw, PaintState, PathDraw},
    gradient::{GradientCache, GradientContent},
    intersection::IntersectionBoard,
    math::Mat2d,
    paint::Paint,
    tessellation::TessellationWriter,
};
use bumpalo::Bump;
use std::ops::{Add, AddAssign};

/// Resources a draw (or a whole logical flush) consumes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceCounters {
    /// Includes the mirrored copies of fills in atomic mode.
    pub midpoint_fan_tess_vertex_count: usize,
    pub outer_cubic_tess_vertex_count: usize,
    pub path_count: usize,
    pub contour_count: usize,
    /// Upper bound of span records, counting wraps and padding.
    pub max_tessellated_segment_count: usize,
    pub max_triangle_vertex_count: usize,
    pub image_draw_count: usize,
    pub complex_gradient_span_count: usize,
}

impl Add for ResourceCounters {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            midpoint_fan_tess_vertex_count: self.midpoint_fan_tess_vertex_count + rhs.midpoint_fan_tess_vertex_count,
            outer_cubic_tess_vertex_count: self.outer_cubic_tess_vertex_count + rhs.outer_cubic_tess_vertex_count,
            path_count: self.path_count + rhs.path_count,
            contour_count: self.contour_count + rhs.contour_count,
            max_tessellated_segment_count: self.max_tessellated_segment_count + rhs.max_tessellated_segment_count,
            max_triangle_vertex_count: self.max_triangle_vertex_count + rhs.max_triangle_vertex_count,
            image_draw_count: self.image_draw_count + rhs.image_draw_count,
            complex_gradient_span_count: self.complex_gradient_span_count + rhs.complex_gradient_span_count,
        }
    }
}

impl AddAssign for ResourceCounters {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl ResourceCounters {
    /// Vertices of the tessellation texture: the midpoint fan region, padding to a whole outer
    /// curve patch, then the outer curve region.
    pub fn tess_vertex_count(&self) -> usize {
        if self.outer_cubic_tess_vertex_count == 0 {
            self.midpoint_fan_tess_vertex_count
        } else {
            self.outer_curve_base() + self.outer_cubic_tess_vertex_count
        }
    }

    fn outer_curve_base(&self) -> usize {
        align_up(self.midpoint_fan_tess_vertex_count, OUTER_CURVE_PATCH_SEGMENT_SPAN as usize)
    }
}

/// Where a logical flush's records land in the frame's buffers and textures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushLayout {
    pub flush_uniform_index: usize,
    pub first_image_draw: usize,
    pub first_path: usize,
    pub first_paint: usize,
    pub first_paint_aux: usize,
    pub first_contour: usize,
    pub first_simple_gradient: usize,
    pub first_complex_gradient_span: usize,
    pub first_tess_vertex_span: usize,
    pub first_triangle_vertex: usize,
    /// First vertex of the outer curve region.
    pub outer_curve_base: u32,
    pub tess_data_height: u32,
    pub gradient_layout: GradientTextureLayout,
}

/// What a logical flush wrote, reported back from [`RenderContext::flush`](crate::RenderContext::flush).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlushSummary {
    pub path_count: usize,
    pub contour_count: usize,
    pub tess_vertex_count: usize,
    pub tess_span_count: usize,
    pub simple_gradient_count: usize,
    pub complex_gradient_count: usize,
    pub triangle_vertex_count: usize,
    pub image_draw_count: usize,
    pub draw_list: Vec<crate::DrawBatch>,
    pub combined_shader_features: ShaderFeatures,
}

pub(crate) fn align_up(x: usize, alignment: usize) -> usize {
    x.div_ceil(alignment) * alignment
}

/// One pass of the frame: the draws that fit into the fixed-size textures and the 16-bit ID space.
///
/// Draws are pushed in batches. When the frame is flushed, every logical flush first lays out its
/// records ([`LogicalFlush::layout_resources`]) and then writes them into the mapped buffers
/// ([`LogicalFlush::write_resources`]).
#[derive(Debug)]
pub struct LogicalFlush {
    interlock_mode: InterlockMode,
    draws: Vec<Draw>,
    ramps: Vec<Option<ColorRampLocation>>,
    counters: ResourceCounters,
    gradients: GradientContent,
    finalized: bool,
    layout: FlushLayout,
}

impl LogicalFlush {
    pub fn new(interlock_mode: InterlockMode) -> Self {
        Self {
            interlock_mode,
            draws: Vec::new(),
            ramps: Vec::new(),
            counters: ResourceCounters::default(),
            gradients: GradientContent::default(),
            finalized: false,
            layout: FlushLayout::default(),
        }
    }

    pub fn interlock_mode(&self) -> InterlockMode {
        self.interlock_mode
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    pub fn counters(&self) -> &ResourceCounters {
        &self.counters
    }

    pub fn layout(&self) -> &FlushLayout {
        &self.layout
    }

    /// Push every draw of `draws`, or none of them.
    ///
    /// On success `draws` is drained. On failure the flush, `gradients` and `draws` are unchanged and
    /// the caller should retry against a new logical flush.
    pub fn push_draw_batch(
        &mut self,
        draws: &mut Vec<Draw>,
        gradients: &mut GradientCache,
        config: &RenderContextConfig,
    ) -> bool {
        debug_assert!(!self.finalized, "push into a finalized logical flush");

        let mut counters = self.counters;
        for draw in draws.iter() {
            counters += draw.resource_counts(self.interlock_mode);
        }

        let tess_capacity = TESS_TEXTURE_WIDTH as usize * config.max_tessellation_texture_height as usize;
        if counters.path_count > config.path_id_limit() as usize
            || counters.contour_count > MAX_CONTOUR_ID as usize
            || counters.tess_vertex_count() > tess_capacity
        {
            return false;
        }

        let checkpoint = gradients.checkpoint();
        let mut ramps = Vec::with_capacity(draws.len());
        for draw in draws.iter() {
            let ramp = match draw.gradient() {
                Some(gradient) => match gradients.allocate(gradient) {
                    Some(location) => Some(location),
                    None => {
                        gradients.rollback(checkpoint);
                        return false;
                    }
                },
                None => None,
            };
            ramps.push(ramp);
        }

        counters.complex_gradient_span_count = gradients.complex_span_count();
        self.counters = counters;
        self.ramps.extend(ramps);
        self.draws.append(draws);
        true
    }

    /// Take ownership of the gradient ramps this flush allocated. No more draws can be pushed.
    pub fn finalize(&mut self, gradients: &mut GradientCache) {
        if !self.finalized {
            self.gradients = gradients.take();
            self.finalized = true;
        }
    }

    /// Phase 1: place this flush's records after the ones already laid out in `running`, and grow
    /// `running` to cover them.
    pub fn layout_resources(&mut self, running: &mut ResourceAllocationCounts) {
        let a = STORAGE_BUFFER_ELEMENT_ALIGNMENT;
        let place = |total: &mut usize, alignment: usize, count: usize| {
            let first = align_up(*total, alignment);
            *total = first + count;
            first
        };

        let c = self.counters;
        let gradients = &self.gradients;
        let simple_count = gradients.simple_ramps.len();
        let complex_count = gradients.complex_ramps.len();
        let complex_span_count = gradients.complex_span_count;
        let simple_rows = gradients.simple_rows();

        let tess_height = c.tess_vertex_count().div_ceil(TESS_TEXTURE_WIDTH as usize);
        let gradient_height = simple_rows as usize + complex_count;

        let layout = FlushLayout {
            flush_uniform_index: place(&mut running.flush_uniform_buffer_count, 1, 1),
            first_image_draw: place(&mut running.image_draw_uniform_buffer_count, a, c.image_draw_count),
            // Index 0 of the path, paint and contour regions is reserved for "none".
            first_path: place(&mut running.path_buffer_count, a, c.path_count + 1),
            first_paint: place(&mut running.paint_buffer_count, a, c.path_count + 1),
            first_paint_aux: place(&mut running.paint_aux_buffer_count, a, c.path_count + 1),
            first_contour: place(&mut running.contour_buffer_count, a, c.contour_count + 1),
            first_simple_gradient: place(
                &mut running.simple_gradient_buffer_count,
                SIMPLE_GRADIENTS_PER_ROW as usize,
                simple_count,
            ),
            first_complex_gradient_span: place(&mut running.complex_gradient_span_buffer_count, a, complex_span_count),
            first_tess_vertex_span: place(
                &mut running.tessellation_span_buffer_count,
                a,
                c.max_tessellated_segment_count,
            ),
            first_triangle_vertex: place(&mut running.triangle_vertex_buffer_count, a, c.max_triangle_vertex_count),
            outer_curve_base: c.outer_curve_base() as u32,
            tess_data_height: tess_height as u32,
            gradient_layout: GradientTextureLayout {
                complex_offset_y: simple_rows,
                height: gradient_height as u32,
            },
        };

        running.gradient_texture_height = running.gradient_texture_height.max(gradient_height);
        running.tessellation_texture_height = running.tessellation_texture_height.max(tess_height);

        log::trace!("logical flush layout: {layout:?}");
        self.layout = layout;
    }

    /// Phase 2: write every record into `mapped` and build the draw list.
    #[allow(clippy::too_many_arguments)]
    pub fn write_resources(
        &self,
        mapped: &mut MappedResources,
        frame: &FrameDescriptor,
        load_action: LoadAction,
        arena: &Bump,
        board: &mut IntersectionBoard,
        flush_index: usize,
        is_final_flush_of_frame: bool,
    ) -> (FlushDescriptor, FlushSummary) {
        let layout = self.layout;
        let gradients = &self.gradients;
        let target_size = frame.render_target.size;

        // Gradient ramps.
        let mut simple = RecordSink::<TwoTexelRamp>::new(&mut mapped.simple_gradients, layout.first_simple_gradient);
        for ramp in gradients.simple_ramps.iter() {
            simple.push(ramp);
        }

        let mut spans = RecordSink::<GradientSpan>::new(
            &mut mapped.complex_gradient_spans,
            layout.first_complex_gradient_span,
        );
        for (row, gradient) in gradients.complex_ramps.iter().enumerate() {
            let (colors, stops) = (gradient.colors(), gradient.stops());
            let last = stops.len() - 2;
            for i in 0..=last {
                let mut flags = GRADIENT_SPAN_COMPLEX_BORDER;
                if i == 0 {
                    flags |= GRADIENT_SPAN_LEFT_BORDER;
                }
                if i == last {
                    flags |= GRADIENT_SPAN_RIGHT_BORDER;
                }

                let fixed = |x: f32| (x.clamp(0.0, 1.0) * 65535.0).round() as u32;
                spans.push(&GradientSpan {
                    x0x1: fixed(stops[i]) | fixed(stops[i + 1]) << 16,
                    y_with_flags: row as u32 | flags,
                    color0: colors[i],
                    color1: colors[i + 1],
                });
            }
        }

        // Order draws by (group, type, push index). Overlapping draws land in increasing groups.
        board.reset(target_size);
        let mut keys = bumpalo::collections::Vec::with_capacity_in(self.draws.len(), arena);
        let mut floor = 0u32;
        let mut max_group = 0u32;
        let mut update_bounds = Bounds::EMPTY;
        for (index, draw) in self.draws.iter().enumerate() {
            let group = match draw {
                Draw::Barrier => {
                    let group = max_group;
                    floor = max_group + 1;
                    group
                }
                _ => {
                    let bounds = draw.pixel_bounds();
                    update_bounds = update_bounds.union(bounds.intersect(target_size.bounds()));
                    let group = board.add_rectangle(bounds, floor);
                    max_group = max_group.max(group);
                    group
                }
            };

            keys.push((group as u64) << 40 | (draw.sort_rank() as u64) << 32 | index as u64);
        }
        keys.sort_unstable();

        let spans = RecordSink::new(&mut mapped.tess_spans, layout.first_tess_vertex_span);
        let mut writer = TessellationWriter::new(spans);
        let mut paths = RecordSink::<PathData>::new(&mut mapped.paths, layout.first_path);
        let mut paints = RecordSink::<PaintData>::new(&mut mapped.paints, layout.first_paint);
        let mut paint_aux = RecordSink::<PaintAuxData>::new(&mut mapped.paint_aux, layout.first_paint_aux);
        let mut contours = RecordSink::<ContourData>::new(&mut mapped.contours, layout.first_contour);
        let mut triangles =
            RecordSink::<TriangleVertex>::new(&mut mapped.triangle_vertices, layout.first_triangle_vertex);
        let mut images = RecordSink::<ImageDrawUniforms>::new(&mut mapped.image_draw_uniforms, layout.first_image_draw);

        // Slot 0 of each region means "no path" / "no contour".
        paths.push(&PathData::default());
        paints.push(&PaintData::default());
        paint_aux.push(&PaintAuxData::default());
        contours.push(&ContourData::default());

        let mut batcher = DrawBatcher::new();
        let mut path_id = 0u32;
        let mut contour_id = 0u32;
        let mut fan_location = 0u32;
        let mut outer_location = layout.outer_curve_base;
        let mut image_draw_index = 0u32;
        let mut last_group = None;

        for &key in keys.iter() {
            let group = (key >> 40) as u32;
            let draw = &self.draws[(key & 0xffff_ffff) as usize];
            let ramp = self.ramps[(key & 0xffff_ffff) as usize];

            if self.interlock_mode == InterlockMode::Atomics && last_group.is_some_and(|g| g != group) {
                batcher.push_barrier();
            }
            last_group = Some(group);

            let features = draw.shader_features();
            match draw {
                Draw::Path(path) => {
                    path_id += 1;
                    self.write_path_records(path, ramp, path_id, &mut paths, &mut paints, &mut paint_aux);

                    let mirrored = path.is_mirrored(self.interlock_mode);
                    let count = path.tess_vertex_count();
                    let base = fan_location;
                    let mut location = writer.begin_path(base, count, mirrored);
                    for contour in path.contours() {
                        contour_id += 1;
                        contours.push(&ContourData {
                            midpoint: contour.midpoint,
                            path_id,
                            vertex_index0: location,
                            closed: contour.closed as u32,
                        });

                        let padding = contour.padding_vertex_count();
                        writer.push_padding(contour.cubics[0].pts[0], padding, contour_id);
                        for cubic in contour.cubics.iter() {
                            writer.push_cubic(cubic, contour_id);
                        }
                        location += contour.vertex_count();
                    }
                    writer.end_path();

                    let total = if mirrored { count * 2 } else { count };
                    fan_location += total;
                    batcher.push(
                        DrawType::MidpointFanPatches,
                        base / MIDPOINT_FAN_PATCH_SEGMENT_SPAN,
                        total / MIDPOINT_FAN_PATCH_SEGMENT_SPAN,
                        features,
                        path.paint().paint.image_texture(),
                    );
                }
                Draw::InteriorTriangulation(draw) => {
                    let path = draw.path();
                    path_id += 1;
                    self.write_path_records(path, ramp, path_id, &mut paths, &mut paints, &mut paint_aux);

                    let count = path.tess_vertex_count();
                    let base = outer_location;
                    let mut location = writer.begin_path(base, count, false);
                    for contour in path.contours() {
                        contour_id += 1;
                        contours.push(&ContourData {
                            midpoint: contour.midpoint,
                            path_id,
                            vertex_index0: location,
                            closed: 1,
                        });

                        for cubic in contour.cubics.iter() {
                            writer.push_cubic(cubic, contour_id);
                        }
                        location += contour.vertex_count();
                    }
                    writer.end_path();
                    outer_location += count;

                    let texture = path.paint().paint.image_texture();
                    batcher.push(
                        DrawType::OuterCurvePatches,
                        base / OUTER_CURVE_PATCH_SEGMENT_SPAN,
                        count / OUTER_CURVE_PATCH_SEGMENT_SPAN,
                        features,
                        texture,
                    );

                    let first_vertex = triangles.next_index() as u32;
                    for triangle in draw.triangles() {
                        for point in triangle.pts {
                            triangles.push(&TriangleVertex::new(point, triangle.weight, path_id));
                        }
                    }
                    let vertex_count = triangles.next_index() as u32 - first_vertex;
                    batcher.push(DrawType::InteriorTriangulation, first_vertex, vertex_count, features, texture);
                }
                Draw::ImageRect(draw) => {
                    images.push(&image_uniforms(&draw.matrix, draw.opacity, &draw.paint));
                    batcher.push_image_rect(draw.texture, image_draw_index, features);
                    image_draw_index += 1;
                }
                Draw::ImageMesh(draw) => {
                    images.push(&image_uniforms(&draw.matrix, draw.opacity, &draw.paint));
                    let mesh = ImageMeshBuffers {
                        vertices: draw.vertices,
                        uvs: draw.uvs,
                        indices: draw.indices,
                    };
                    batcher.push_image_mesh(draw.texture, mesh, draw.index_count, image_draw_index, features);
                    image_draw_index += 1;
                }
                Draw::Barrier => batcher.push_barrier(),
            }
        }

        if self.interlock_mode == InterlockMode::Atomics && !self.draws.is_empty() {
            batcher.push_atomic_resolve();
        }

        let inverse_height = |height: u32| if height > 0 { 1.0 / height as f32 } else { 0.0 };
        let mut uniforms = RecordSink::<FlushUniforms>::new(&mut mapped.flush_uniforms, layout.flush_uniform_index);
        uniforms.push(&FlushUniforms {
            render_target_width: target_size.width,
            render_target_height: target_size.height,
            color_clear_value: frame.clear_color,
            coverage_clear_value: 0,
            render_target_update_bounds: bounds_to_uniform(update_bounds),
            gradient_inverse_viewport_y: inverse_height(layout.gradient_layout.height),
            tess_inverse_viewport_y: inverse_height(layout.tess_data_height),
            path_id_granularity: 1,
        });

        let tess_vertex_count = writer.vertices_written();
        let tess_span_count = writer.span_count();
        let triangle_vertex_count = triangles.next_index() - layout.first_triangle_vertex;
        debug_assert_eq!(
            tess_vertex_count,
            self.counters.midpoint_fan_tess_vertex_count + self.counters.outer_cubic_tess_vertex_count
        );

        let (draw_list, combined_shader_features) = batcher.finish();
        log::debug!(
            "logical flush {flush_index}: {path_id} paths, {tess_vertex_count} tess vertices, {} batches",
            draw_list.len()
        );

        let summary = FlushSummary {
            path_count: path_id as usize,
            contour_count: contour_id as usize,
            tess_vertex_count,
            tess_span_count,
            simple_gradient_count: gradients.simple_ramps.len(),
            complex_gradient_count: gradients.complex_ramps.len(),
            triangle_vertex_count,
            image_draw_count: image_draw_index as usize,
            draw_list: draw_list.clone(),
            combined_shader_features,
        };

        let desc = FlushDescriptor {
            render_target: frame.render_target,
            interlock_mode: self.interlock_mode,
            load_action,
            clear_color: frame.clear_color,
            flush_uniform_index: layout.flush_uniform_index,
            first_path: layout.first_path,
            first_paint: layout.first_paint,
            first_paint_aux: layout.first_paint_aux,
            first_contour: layout.first_contour,
            first_simple_gradient: layout.first_simple_gradient,
            simple_gradient_count: gradients.simple_ramps.len(),
            first_complex_gradient_span: layout.first_complex_gradient_span,
            complex_gradient_span_count: gradients.complex_span_count,
            first_tess_vertex_span: layout.first_tess_vertex_span,
            tess_vertex_span_count: tess_span_count,
            first_triangle_vertex: layout.first_triangle_vertex,
            has_triangle_vertices: triangle_vertex_count > 0,
            first_image_draw: layout.first_image_draw,
            gradient_layout: layout.gradient_layout,
            tess_data_height: layout.tess_data_height,
            combined_shader_features,
            draw_list,
            wireframe: frame.wireframe,
            is_final_flush_of_frame,
            flush_index,
            backend_data: frame.backend_data.clone(),
        };

        (desc, summary)
    }

    fn write_path_records(
        &self,
        path: &PathDraw,
        ramp: Option<ColorRampLocation>,
        path_id: u32,
        paths: &mut RecordSink<PathData>,
        paints: &mut RecordSink<PaintData>,
        paint_aux: &mut RecordSink<PaintAuxData>,
    ) {
        let index = paths.push(&PathData {
            matrix: *path.matrix(),
            stroke_radius: path.stroke_radius(),
        });
        debug_assert_eq!(index, self.layout.first_path + path_id as usize);

        let fill_rule = (!path.is_stroke()).then(|| path.fill_rule());
        let (paint, aux) = paint_records(
            path.paint(),
            fill_rule,
            path.matrix(),
            ramp,
            &self.layout.gradient_layout,
        );
        paints.push(&paint);
        paint_aux.push(&aux);
    }
}

fn clip_rect_words(state: &PaintState) -> ([f32; 4], [f32; 2]) {
    match state.clip_rect {
        Some(m) => (m.linear(), m.translation()),
        None => ([0.0; 4], [0.0; 2]),
    }
}

/// Pack a paint into its [`PaintData`] and [`PaintAuxData`] records.
pub fn paint_records(
    state: &PaintState,
    fill_rule: Option<FillRule>,
    matrix: &Mat2d,
    ramp: Option<ColorRampLocation>,
    gradient_layout: &GradientTextureLayout,
) -> (PaintData, PaintAuxData) {
    let mut params = state.paint.paint_type() as u32 | (state.blend_mode as u32) << 4 | state.clip_id << 16;
    match fill_rule {
        Some(FillRule::NonZero) => params |= PAINT_FLAG_NON_ZERO_FILL,
        Some(FillRule::EvenOdd) => params |= PAINT_FLAG_EVEN_ODD,
        None => {}
    }

    let (clip_rect_matrix, clip_rect_translate) = clip_rect_words(state);
    if state.clip_rect.is_some() {
        params |= PAINT_FLAG_HAS_CLIP_RECT;
    }

    let mut aux = PaintAuxData {
        clip_rect_matrix,
        clip_rect_translate,
        ..Default::default()
    };

    let value = match &state.paint {
        Paint::Solid(color) => *color,
        Paint::ClipUpdate { outer_clip_id } => state.clip_id | outer_clip_id << 16,
        Paint::Gradient(gradient) => {
            let device_to_gradient = gradient.device_to_gradient(matrix).unwrap_or(Mat2d {
                xx: 0.0,
                xy: 0.0,
                yx: 0.0,
                yy: 0.0,
                tx: 0.0,
                ty: 0.0,
            });
            aux.matrix = device_to_gradient.linear();
            aux.translate = device_to_gradient.translation();

            let width = GRAD_TEXTURE_WIDTH as f32;
            let location = ramp.unwrap_or(ColorRampLocation { row: 0, col: 0 });
            aux.gradient_span = if location.is_complex() {
                [(width - 1.0) / width, 0.5 / width]
            } else {
                [1.0 / width, (location.col as f32 + 0.5) / width]
            };

            let row = location.texture_row(gradient_layout.complex_offset_y) as f32;
            let height = gradient_layout.height.max(1) as f32;
            ((row + 0.5) / height).to_bits()
        }
        Paint::Image { opacity, .. } => {
            let device_to_local = matrix.invert().unwrap_or_default();
            aux.matrix = device_to_local.linear();
            aux.translate = device_to_local.translation();
            opacity.to_bits()
        }
    };

    (PaintData { params, value }, aux)
}

fn image_uniforms(matrix: &Mat2d, opacity: f32, state: &PaintState) -> ImageDrawUniforms {
    let (clip_rect_matrix, clip_rect_translate) = clip_rect_words(state);
    ImageDrawUniforms {
        view_matrix: *matrix,
        opacity,
        clip_rect_matrix,
        clip_rect_translate,
        clip_id: state.clip_id,
        blend_mode: state.blend_mode as u32,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        BlendMode, ImageTexture, PaintType, RenderTarget, Size,
        allocator::test::RecordingBackend,
        draw::{ImageRectDraw, InteriorTriangulationDraw},
        math::{Aabb, Vec2},
        paint::{Gradient, color_argb},
        path::RawPath,
        read_record,
    };

    fn rect(x: f32, y: f32, size: f32, paint: Paint) -> Draw {
        PathDraw::fill(&RawPath::rect(Aabb::new(x, y, x + size, y + size)), Mat2d::IDENTITY, paint).into()
    }

    fn black() -> Paint {
        Paint::Solid(color_argb(255, 0, 0, 0))
    }

    fn frame() -> FrameDescriptor {
        FrameDescriptor::new(RenderTarget {
            id: 1,
            size: Size::from([64, 64]),
        })
    }

    /// Lay out and write a single logical flush.
    fn write(
        flush: &mut LogicalFlush,
        gradients: &mut GradientCache,
    ) -> (FlushDescriptor, FlushSummary, RecordingBackend) {
        flush.finalize(gradients);
        let mut running = ResourceAllocationCounts::default();
        flush.layout_resources(&mut running);

        let mut backend = RecordingBackend::default();
        let mut mapped = MappedResources::map(&mut backend, &running).unwrap();
        let arena = Bump::new();
        let mut board = IntersectionBoard::default();
        let (desc, summary) =
            flush.write_resources(&mut mapped, &frame(), LoadAction::Clear, &arena, &mut board, 0, true);
        mapped.unmap(&mut backend);
        (desc, summary, backend)
    }

    #[test]
    fn test_single_rect() {
        let mut gradients = GradientCache::new(16);
        let mut flush = LogicalFlush::new(InterlockMode::RasterOrdering);
        let mut draws = vec![rect(8.0, 8.0, 16.0, black())];
        assert!(flush.push_draw_batch(&mut draws, &mut gradients, &RenderContextConfig::default()));
        assert!(draws.is_empty());

        let (desc, summary, backend) = write(&mut flush, &mut gradients);
        assert_eq!(summary.path_count, 1);
        assert_eq!(summary.tess_vertex_count, 8);
        assert_eq!(desc.draw_list.len(), 1);
        assert_eq!(desc.draw_list[0].draw_type, DrawType::MidpointFanPatches);
        assert_eq!((desc.draw_list[0].base_element, desc.draw_list[0].element_count), (0, 1));

        let paths = backend.unmapped(crate::BufferKind::Paint).unwrap();
        let paint: PaintData = read_record(paths, desc.first_paint + 1);
        assert_eq!(paint.paint_type(), Some(PaintType::SolidColor));
        assert_eq!(paint.value, color_argb(255, 0, 0, 0));
        assert_eq!(paint.params & PAINT_FLAG_NON_ZERO_FILL, PAINT_FLAG_NON_ZERO_FILL);

        let contours = backend.unmapped(crate::BufferKind::Contour).unwrap();
        let contour: ContourData = read_record(contours, desc.first_contour + 1);
        assert_eq!((contour.path_id, contour.vertex_index0, contour.closed), (1, 0, 1));

        let uniforms = backend.unmapped(crate::BufferKind::FlushUniform).unwrap();
        let uniforms: FlushUniforms = read_record(uniforms, 0);
        assert_eq!(uniforms.render_target_update_bounds, [8, 8, 24, 24]);
    }

    #[test]
    fn test_path_limit_leaves_flush_untouched() {
        let config = RenderContextConfig::default().with_max_path_id(2);
        let mut gradients = GradientCache::new(16);
        let mut flush = LogicalFlush::new(InterlockMode::RasterOrdering);

        let g = Gradient::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), &[1, 2], &[0.0, 1.0]);
        let mut first = vec![rect(0.0, 0.0, 4.0, black())];
        assert!(flush.push_draw_batch(&mut first, &mut gradients, &config));

        let mut second = vec![
            rect(0.0, 0.0, 4.0, Paint::Gradient(g.clone())),
            rect(4.0, 0.0, 4.0, black()),
        ];
        assert!(!flush.push_draw_batch(&mut second, &mut gradients, &config));
        assert_eq!(second.len(), 2);
        assert_eq!(flush.draws().len(), 1);
        assert_eq!(flush.counters().path_count, 1);
        assert!(gradients.is_empty());

        let mut fresh = LogicalFlush::new(InterlockMode::RasterOrdering);
        assert!(fresh.push_draw_batch(&mut second, &mut gradients, &config));
        assert_eq!(gradients.simple_count(), 1);
    }

    #[test]
    fn test_gradient_failure_rolls_back() {
        let config = RenderContextConfig::default();
        let mut gradients = GradientCache::new(1);
        let mut flush = LogicalFlush::new(InterlockMode::RasterOrdering);

        let complex = |c: u32| Gradient::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), &[c, c, c], &[0.0, 0.5, 1.0]);
        let mut draws = vec![
            rect(0.0, 0.0, 4.0, Paint::Gradient(complex(1))),
            rect(0.0, 0.0, 4.0, Paint::Gradient(complex(2))),
        ];
        assert!(!flush.push_draw_batch(&mut draws, &mut gradients, &config));
        assert_eq!(gradients.complex_count(), 0);
        assert!(flush.is_empty());
    }

    #[test]
    fn test_tess_capacity() {
        let config = RenderContextConfig::default().with_max_tessellation_texture_height(1);
        let mut gradients = GradientCache::new(16);
        let mut flush = LogicalFlush::new(InterlockMode::RasterOrdering);

        // 8 vertices each, 256 of them fill one row exactly.
        let mut draws = (0..256).map(|i| rect(i as f32, 0.0, 1.0, black())).collect::<Vec<_>>();
        assert!(flush.push_draw_batch(&mut draws, &mut gradients, &config));
        let mut one_more = vec![rect(0.0, 0.0, 1.0, black())];
        assert!(!flush.push_draw_batch(&mut one_more, &mut gradients, &config));
    }

    #[test]
    fn test_overlapping_draws_keep_order() {
        let mut gradients = GradientCache::new(16);
        let mut flush = LogicalFlush::new(InterlockMode::RasterOrdering);
        let image = ImageRectDraw::new(ImageTexture(9), Mat2d::scale(10.0, 10.0), 1.0).into();
        let mut draws = vec![rect(0.0, 0.0, 8.0, black()), image, rect(4.0, 4.0, 8.0, black())];
        assert!(flush.push_draw_batch(&mut draws, &mut gradients, &RenderContextConfig::default()));

        let (desc, _, _) = write(&mut flush, &mut gradients);
        let types = desc.draw_list.iter().map(|b| b.draw_type).collect::<Vec<_>>();
        assert_eq!(
            types,
            vec![DrawType::MidpointFanPatches, DrawType::ImageRect, DrawType::MidpointFanPatches]
        );
    }

    #[test]
    fn test_disjoint_draws_batch_together() {
        let mut gradients = GradientCache::new(16);
        let mut flush = LogicalFlush::new(InterlockMode::RasterOrdering);
        let image = ImageRectDraw::new(ImageTexture(9), Mat2d::translate(40.0, 40.0), 1.0).into();
        let mut draws = vec![rect(0.0, 0.0, 8.0, black()), image, rect(20.0, 0.0, 8.0, black())];
        assert!(flush.push_draw_batch(&mut draws, &mut gradients, &RenderContextConfig::default()));

        let (desc, summary, _) = write(&mut flush, &mut gradients);
        assert_eq!(desc.draw_list.len(), 2);
        assert_eq!(desc.draw_list[0].element_count, 2);
        assert_eq!(summary.image_draw_count, 1);
    }

    #[test]
    fn test_atomic_mode_barriers_and_mirroring() {
        let mut gradients = GradientCache::new(16);
        let mut flush = LogicalFlush::new(InterlockMode::Atomics);
        let mut draws = vec![rect(0.0, 0.0, 8.0, black()), rect(4.0, 4.0, 8.0, black())];
        assert!(flush.push_draw_batch(&mut draws, &mut gradients, &RenderContextConfig::default()));
        assert_eq!(flush.counters().midpoint_fan_tess_vertex_count, 32);

        let (desc, summary, backend) = write(&mut flush, &mut gradients);
        assert_eq!(summary.tess_vertex_count, 32);

        let list = &desc.draw_list;
        assert_eq!(list.len(), 3);
        assert!(!list[0].needs_barrier);
        assert!(list[1].needs_barrier);
        assert_eq!(list[2].draw_type, DrawType::AtomicResolve);
        assert_eq!((list[1].base_element, list[1].element_count), (2, 2));

        // The forward half of the first path starts after its mirrored half.
        let contours = backend.unmapped(crate::BufferKind::Contour).unwrap();
        let contour: ContourData = read_record(contours, desc.first_contour + 1);
        assert_eq!(contour.vertex_index0, 8);
    }

    #[test]
    fn test_interior_triangulation_layout() {
        let mut gradients = GradientCache::new(16);
        let mut flush = LogicalFlush::new(InterlockMode::RasterOrdering);
        let path = RawPath::circle(Vec2::new(32.0, 32.0), 20.0);
        let circle = InteriorTriangulationDraw::fill(&path, Mat2d::IDENTITY, black());
        let mut draws = vec![rect(0.0, 0.0, 4.0, black()), circle.into()];
        assert!(flush.push_draw_batch(&mut draws, &mut gradients, &RenderContextConfig::default()));

        let (desc, summary, _) = write(&mut flush, &mut gradients);
        assert_eq!(flush.layout().outer_curve_base, 17);
        assert_eq!(summary.triangle_vertex_count, 6);
        assert!(desc.has_triangle_vertices);

        let outer = desc.draw_list.iter().find(|b| b.draw_type == DrawType::OuterCurvePatches).unwrap();
        assert_eq!((outer.base_element, outer.element_count), (1, 4));
    }

    #[test]
    fn test_layout_aligns_regions() {
        let mut gradients = GradientCache::new(16);
        let config = RenderContextConfig::default();
        let mut running = ResourceAllocationCounts::default();

        let mut a = LogicalFlush::new(InterlockMode::RasterOrdering);
        a.push_draw_batch(&mut vec![rect(0.0, 0.0, 4.0, black())], &mut gradients, &config);
        a.finalize(&mut gradients);
        a.layout_resources(&mut running);

        let g = Gradient::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), &[1, 2], &[0.0, 1.0]);
        let mut b = LogicalFlush::new(InterlockMode::RasterOrdering);
        b.push_draw_batch(&mut vec![rect(0.0, 0.0, 4.0, Paint::Gradient(g))], &mut gradients, &config);
        b.finalize(&mut gradients);
        b.layout_resources(&mut running);

        assert_eq!(a.layout().first_path, 0);
        assert_eq!(b.layout().first_path, STORAGE_BUFFER_ELEMENT_ALIGNMENT);
        assert_eq!(b.layout().flush_uniform_index, 1);
        assert_eq!(b.layout().gradient_layout, GradientTextureLayout { complex_offset_y: 1, height: 1 });
        assert_eq!(running.path_buffer_count, STORAGE_BUFFER_ELEMENT_ALIGNMENT + 2);
        assert_eq!(running.tessellation_texture_height, 1);
        assert_eq!(running.gradient_texture_height, 1);
    }

    #[test]
    fn test_paint_records() {
        let state = PaintState {
            paint: Paint::ClipUpdate { outer_clip_id: 3 },
            clip_id: 5,
            clip_rect: None,
            blend_mode: BlendMode::Screen,
        };
        let (paint, _) = paint_records(&state, Some(FillRule::EvenOdd), &Mat2d::IDENTITY, None, &Default::default());

        assert_eq!(paint.paint_type(), Some(PaintType::ClipUpdate));
        assert_eq!(paint.blend_mode(), BlendMode::Screen);
        assert_eq!(paint.clip_id(), 5);
        assert_eq!(paint.fill_rule(), FillRule::EvenOdd);
        assert_eq!(paint.value, 5 | 3 << 16);
    }
}
