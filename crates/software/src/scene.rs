//! Turns the draw list of one flush back into device-space geometry the dispatcher can rasterize.

use crate::{
    backend::RenderBufferStorage,
    blend::unpack_premultiplied,
    buffer::{Buffer, BufferRef},
    dispatch::{Coverage, DispatchObject, Dispatcher, Shading},
    raster::{Edge, MeshTriangle, edge_bounds},
    records::FlushRecords,
    texture::TessellationTexture,
};
use bumpalo::{Bump, collections::Vec as BumpVec};
use plsdraw_core::{
    BackendError, BlendMode, DrawBatch, DrawType, ImageTexture, MIDPOINT_FAN_PATCH_SEGMENT_SPAN,
    OUTER_CURVE_PATCH_SEGMENT_SPAN, PAINT_FLAG_EVEN_ODD, PAINT_FLAG_NON_ZERO_FILL, PaintType, RenderBuffer,
    math::{Aabb, Mat2d, Vec2},
};
use slotmap::{DefaultKey, KeyData, SlotMap};

/// Half width of wireframe lines, in pixels.
const WIREFRAME_RADIUS: f32 = 0.5;

/// Everything a flush can reference besides its own records.
pub struct SceneResources<'a> {
    pub tessellation: &'a TessellationTexture,
    pub gradients: BufferRef<'a>,
    pub images: &'a SlotMap<DefaultKey, Buffer>,
    pub render_buffers: &'a SlotMap<DefaultKey, RenderBufferStorage>,
}

struct PathEdges<'a> {
    path_id: u32,
    texture: Option<ImageTexture>,
    edges: BumpVec<'a, Edge>,
}

enum Entry<'a> {
    Path(usize),
    Object(DispatchObject<'a>),
}

/// Collects the edges of every path in a flush, in draw order.
pub struct SceneBuilder<'a> {
    arena: &'a Bump,
    records: FlushRecords<'a>,
    resources: SceneResources<'a>,
    paths: Vec<PathEdges<'a>>,
    path_slots: Vec<Option<usize>>,
    entries: Vec<Entry<'a>>,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(arena: &'a Bump, records: FlushRecords<'a>, resources: SceneResources<'a>) -> Self {
        Self {
            arena,
            records,
            resources,
            paths: Vec::new(),
            path_slots: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn push_batch(&mut self, batch: &DrawBatch) -> Result<(), BackendError> {
        match batch.draw_type {
            DrawType::MidpointFanPatches => {
                let first = batch.base_element * MIDPOINT_FAN_PATCH_SEGMENT_SPAN;
                let count = batch.element_count * MIDPOINT_FAN_PATCH_SEGMENT_SPAN;
                self.push_contours(first..first + count, batch.image_texture);
            }
            DrawType::OuterCurvePatches => self.push_outer_curves(batch),
            DrawType::InteriorTriangulation => self.push_triangles(batch),
            DrawType::ImageRect => self.push_image_rect(batch)?,
            DrawType::ImageMesh => self.push_image_mesh(batch)?,
            DrawType::AtomicResolve => {}
        }

        Ok(())
    }

    fn path_index(&mut self, path_id: u32, texture: Option<ImageTexture>) -> usize {
        let slot = path_id as usize;
        if slot >= self.path_slots.len() {
            self.path_slots.resize(slot + 1, None);
        }

        if let Some(index) = self.path_slots[slot] {
            return index;
        }

        let index = self.paths.len();
        self.paths.push(PathEdges {
            path_id,
            texture,
            edges: BumpVec::new_in(self.arena),
        });
        self.path_slots[slot] = Some(index);
        self.entries.push(Entry::Path(index));
        index
    }

    /// Walk fan vertices contour by contour, connecting consecutive vertices.
    fn push_contours(&mut self, vertices: std::ops::Range<u32>, texture: Option<ImageTexture>) {
        let tess = self.resources.tessellation;

        // (path index, contour first point, previous point, closes)
        let mut current: Option<(u32, usize, Vec2, Vec2, bool)> = None;
        for v in vertices {
            let vertex = tess.vertex(v);
            let contour_id = vertex.contour_id();
            if contour_id == 0 || vertex.is_mirrored() {
                continue;
            }

            match &mut current {
                Some((id, index, _, prev, _)) if *id == contour_id => {
                    self.paths[*index].edges.push(Edge::new(*prev, vertex.point));
                    *prev = vertex.point;
                }
                _ => {
                    if let Some(contour) = current.take() {
                        self.close_contour(contour);
                    }

                    let contour = self.records.contour(contour_id);
                    let paint = self.records.paint(contour.path_id);
                    let is_fill = paint.params & (PAINT_FLAG_NON_ZERO_FILL | PAINT_FLAG_EVEN_ODD) != 0;
                    let index = self.path_index(contour.path_id, texture);
                    let start = tess.vertex(contour.vertex_index0).point;
                    current = Some((contour_id, index, start, vertex.point, is_fill || contour.closed != 0));
                }
            }
        }

        if let Some(contour) = current {
            self.close_contour(contour);
        }
    }

    fn close_contour(&mut self, (_, index, start, prev, closes): (u32, usize, Vec2, Vec2, bool)) {
        if closes && start != prev {
            self.paths[index].edges.push(Edge::new(prev, start));
        }
    }

    /// Every outer patch is a closed loop: the curve, then its chord back.
    fn push_outer_curves(&mut self, batch: &DrawBatch) {
        let tess = self.resources.tessellation;
        let span = OUTER_CURVE_PATCH_SEGMENT_SPAN;
        for patch in batch.base_element..batch.base_element + batch.element_count {
            let base = patch * span;
            let first = tess.vertex(base);
            if first.contour_id() == 0 {
                continue;
            }

            let path_id = self.records.contour(first.contour_id()).path_id;
            let index = self.path_index(path_id, batch.image_texture);
            let edges = &mut self.paths[index].edges;

            let mut prev = first.point;
            for k in 1..span {
                let p = tess.vertex(base + k).point;
                edges.push(Edge::new(prev, p));
                prev = p;
            }
            edges.push(Edge::new(prev, first.point));
        }
    }

    fn push_triangles(&mut self, batch: &DrawBatch) {
        let first = batch.base_element as usize;
        for t in 0..batch.element_count as usize / 3 {
            let vertices: [_; 3] = std::array::from_fn(|k| self.records.triangle_vertex(first + t * 3 + k));
            let path_id = vertices[0].path_id();
            let matrix = self.records.path(path_id).matrix;
            let [a, b, c] = vertices.map(|v| matrix.map(v.point));

            let area = (b - a).cross(c - a);
            if area == 0.0 || vertices[0].weight() == 0 {
                continue;
            }

            let weight = vertices[0].weight() * if area > 0.0 { 1 } else { -1 };
            let index = self.path_index(path_id, batch.image_texture);
            let edges = &mut self.paths[index].edges;
            edges.push(Edge::weighted(a, b, weight));
            edges.push(Edge::weighted(b, c, weight));
            edges.push(Edge::weighted(c, a, weight));
        }
    }

    fn image(&self, texture: Option<ImageTexture>) -> Result<BufferRef<'a>, BackendError> {
        let id = texture.map_or(0, |texture| texture.0);
        let images: &'a SlotMap<DefaultKey, Buffer> = self.resources.images;
        images
            .get(KeyData::from_ffi(id).into())
            .map(Buffer::as_ref)
            .ok_or(BackendError::UnknownHandle { what: "image texture", id })
    }

    fn render_buffer(&self, buffer: RenderBuffer) -> Result<&'a [u8], BackendError> {
        let buffers: &'a SlotMap<DefaultKey, RenderBufferStorage> = self.resources.render_buffers;
        buffers
            .get(KeyData::from_ffi(buffer.0).into())
            .map(|storage| &storage.bytes[..])
            .ok_or(BackendError::UnknownHandle {
                what: "render buffer",
                id: buffer.0,
            })
    }

    fn push_image_rect(&mut self, batch: &DrawBatch) -> Result<(), BackendError> {
        let texture = self.image(batch.image_texture)?;
        let uniforms = self.records.image_draw(batch.image_draw_index);
        let Some(inverse) = uniforms.view_matrix.invert() else {
            return Ok(());
        };

        let mut bounds = Aabb::EMPTY;
        for corner in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            bounds.add_point(uniforms.view_matrix.map(Vec2::new(corner.0, corner.1)));
        }

        self.entries.push(Entry::Object(DispatchObject {
            bounds: bounds.round_out(),
            coverage: Coverage::Rect { inverse },
            shading: Shading::Image {
                matrix: inverse.then(&Mat2d::scale(texture.width() as f32, texture.height() as f32)),
                opacity: uniforms.opacity,
                texture,
            },
            blend_mode: BlendMode::from_bits(uniforms.blend_mode),
            clip_id: uniforms.clip_id,
            clip_rect: clip_rect(uniforms.clip_rect_matrix, uniforms.clip_rect_translate),
        }));

        Ok(())
    }

    fn push_image_mesh(&mut self, batch: &DrawBatch) -> Result<(), BackendError> {
        let Some(mesh) = batch.mesh else {
            return Ok(());
        };

        let texture = self.image(batch.image_texture)?;
        let uniforms = self.records.image_draw(batch.image_draw_index);
        let vertices = self.render_buffer(mesh.vertices)?;
        let uvs = self.render_buffer(mesh.uvs)?;
        let indices = self.render_buffer(mesh.indices)?;

        let read_vec2 = |bytes: &[u8], i: usize| -> Option<Vec2> {
            let chunk = bytes.get(i * 8..i * 8 + 8)?;
            let x = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let y = f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            Some(Vec2::new(x, y))
        };

        let size = Vec2::new(texture.width() as f32, texture.height() as f32);
        let mut bounds = Aabb::EMPTY;
        let mut triangles = BumpVec::new_in(self.arena);
        let index_count = (batch.element_count as usize).min(indices.len() / 2);
        for triangle in indices[..index_count * 2].chunks_exact(6) {
            let ids = [0, 2, 4].map(|k| u16::from_le_bytes([triangle[k], triangle[k + 1]]) as usize);
            let pts = ids.map(|i| read_vec2(vertices, i).map(|p| uniforms.view_matrix.map(p)));
            let uv = ids.map(|i| read_vec2(uvs, i));

            let ([Some(p0), Some(p1), Some(p2)], [Some(t0), Some(t1), Some(t2)]) = (pts, uv) else {
                log::warn!("image mesh index out of range");
                continue;
            };

            for p in [p0, p1, p2] {
                bounds.add_point(p);
            }

            triangles.push(MeshTriangle {
                pts: [p0, p1, p2],
                uvs: [t0, t1, t2].map(|t| Vec2::new(t.x * size.x, t.y * size.y)),
            });
        }

        self.entries.push(Entry::Object(DispatchObject {
            bounds: bounds.round_out(),
            coverage: Coverage::Mesh {
                triangles: triangles.into_bump_slice(),
            },
            shading: Shading::MeshImage {
                opacity: uniforms.opacity,
                texture,
            },
            blend_mode: BlendMode::from_bits(uniforms.blend_mode),
            clip_id: uniforms.clip_id,
            clip_rect: clip_rect(uniforms.clip_rect_matrix, uniforms.clip_rect_translate),
        }));

        Ok(())
    }

    fn path_object(&self, path: PathEdges<'a>) -> Result<Option<DispatchObject<'a>>, BackendError> {
        let records = &self.records;
        let data = records.path(path.path_id);
        let paint = records.paint(path.path_id);
        let aux = records.paint_aux(path.path_id);
        let edges = path.edges.into_bump_slice();

        let Some(paint_type) = paint.paint_type() else {
            log::warn!("path {} has an unknown paint type {:#x}", path.path_id, paint.params);
            return Ok(None);
        };

        let aux_matrix = matrix(aux.matrix, aux.translate);
        let shading = match paint_type {
            PaintType::ClipUpdate => Shading::ClipUpdate {
                clip_id: paint.value & 0xffff,
                outer_clip_id: paint.value >> 16,
            },
            PaintType::SolidColor => Shading::Solid(unpack_premultiplied(paint.value)),
            PaintType::LinearGradient | PaintType::RadialGradient => {
                let height = records.desc().gradient_layout.height.max(1) as f32;
                Shading::Gradient {
                    radial: paint_type == PaintType::RadialGradient,
                    matrix: aux_matrix,
                    span: aux.gradient_span,
                    row: (f32::from_bits(paint.value) * height).floor().max(0.0) as usize,
                    ramps: self.resources.gradients,
                }
            }
            PaintType::Image => Shading::Image {
                matrix: aux_matrix,
                opacity: f32::from_bits(paint.value),
                texture: self.image(path.texture)?,
            },
        };

        let is_fill = paint.params & (PAINT_FLAG_NON_ZERO_FILL | PAINT_FLAG_EVEN_ODD) != 0;
        let radius = if records.desc().wireframe {
            Some(WIREFRAME_RADIUS)
        } else if is_fill {
            None
        } else {
            Some(data.stroke_radius * data.matrix.max_scale())
        };

        let outset = radius.unwrap_or(0.0);
        let coverage = match radius {
            Some(radius) => Coverage::Stroke { edges, radius },
            None => Coverage::Fill {
                edges,
                rule: paint.fill_rule(),
            },
        };

        Ok(Some(DispatchObject {
            bounds: edge_bounds(edges).outset(outset).round_out(),
            coverage,
            shading,
            blend_mode: paint.blend_mode(),
            clip_id: if paint_type == PaintType::ClipUpdate {
                0
            } else {
                paint.clip_id()
            },
            clip_rect: paint
                .has_clip_rect()
                .then(|| matrix(aux.clip_rect_matrix, aux.clip_rect_translate)),
        }))
    }

    /// Hand every collected object to `dispatcher`, in draw order.
    pub fn finish(mut self, dispatcher: &mut Dispatcher<'a>) -> Result<(), BackendError> {
        let mut paths = std::mem::take(&mut self.paths).into_iter().map(Some).collect::<Vec<_>>();
        for entry in std::mem::take(&mut self.entries) {
            let object = match entry {
                Entry::Object(object) => Some(object),
                Entry::Path(index) => match paths[index].take() {
                    Some(path) => self.path_object(path)?,
                    None => None,
                },
            };

            if let Some(object) = object {
                dispatcher.push(object);
            }
        }

        Ok(())
    }
}

fn matrix(linear: [f32; 4], translate: [f32; 2]) -> Mat2d {
    let [xx, xy, yx, yy] = linear;
    let [tx, ty] = translate;
    Mat2d { xx, xy, yx, yy, tx, ty }
}

/// Image draws always carry clip rect words; all zeros means no clip rect.
fn clip_rect(linear: [f32; 4], translate: [f32; 2]) -> Option<Mat2d> {
    (linear != [0.0; 4] || translate != [0.0; 2]).then(|| matrix(linear, translate))
}
