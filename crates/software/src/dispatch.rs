use crate::{
    blend::{Color, blend, pack_premultiplied, scale, unpack_premultiplied},
    buffer::{BufferMut, BufferRef},
    raster::{self, Edge, MeshTriangle, TileGeometry},
    simd,
};
use bumpalo::{Bump, collections::Vec};
use plsdraw_core::{
    BlendMode, Bounds, FillRule, clip_id_to_unorm, clip_ids_equal,
    math::{Mat2d, Vec2},
};
use std::iter::from_fn;

pub const TILE_SIZE: usize = 32;
pub const PIXEL_COUNT: usize = TILE_SIZE * TILE_SIZE;

/// Which pixels an object touches, and by how much.
#[derive(Debug)]
pub enum Coverage<'a> {
    Fill { edges: &'a [Edge], rule: FillRule },
    Stroke { edges: &'a [Edge], radius: f32 },
    /// The unit square under the inverse of this device-to-unit matrix.
    Rect { inverse: Mat2d },
    Mesh { triangles: &'a [MeshTriangle] },
}

/// What color a covered pixel gets.
#[derive(Debug)]
pub enum Shading<'a> {
    Solid(Color),
    Gradient {
        radial: bool,
        /// Device to gradient space.
        matrix: Mat2d,
        span: [f32; 2],
        row: usize,
        ramps: BufferRef<'a>,
    },
    Image {
        /// Device to texel space.
        matrix: Mat2d,
        opacity: f32,
        texture: BufferRef<'a>,
    },
    /// Texel coordinates come from the mesh.
    MeshImage { opacity: f32, texture: BufferRef<'a> },
    ClipUpdate { clip_id: u32, outer_clip_id: u32 },
}

#[derive(Debug)]
pub struct DispatchObject<'a> {
    pub bounds: Bounds,
    pub coverage: Coverage<'a>,
    pub shading: Shading<'a>,
    pub blend_mode: BlendMode,
    pub clip_id: u32,
    /// Device to clip rect space, where the rect is `[-1, 1]^2`.
    pub clip_rect: Option<Mat2d>,
}

pub struct Dispatcher<'a> {
    arena: &'a Bump,
    objects: Vec<'a, DispatchObject<'a>>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            objects: Vec::new_in(arena),
        }
    }

    pub fn push(&mut self, object: DispatchObject<'a>) {
        if !object.bounds.is_empty() {
            self.objects.push(object);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Draw every object, in order, into `buffer`.
    pub fn dispatch(self, buffer: BufferMut<'a>) {
        let objects = self.objects.into_bump_slice();
        let (buffer_ptr, width, height, stride) = buffer.into_raw_parts();
        let buffer_ptr = buffer_ptr as usize;
        let target = Bounds {
            left: 0,
            top: 0,
            right: width as u32,
            bottom: height as u32,
        };

        // tile objects into separate buckets
        let tiles_width = width.div_ceil(TILE_SIZE);
        let tiles_height = height.div_ceil(TILE_SIZE);
        let mut tiles = Vec::from_iter_in(
            from_fn(|| Some(Vec::new_in(self.arena))).take(tiles_width * tiles_height),
            self.arena,
        );

        for object in objects.iter() {
            let bounds = object.bounds.intersect(target);
            if bounds.is_empty() {
                continue;
            }

            let x0 = bounds.left as usize / TILE_SIZE;
            let y0 = bounds.top as usize / TILE_SIZE;
            let x1 = (bounds.right as usize).div_ceil(TILE_SIZE);
            let y1 = (bounds.bottom as usize).div_ceil(TILE_SIZE);

            for y in y0..y1 {
                for x in x0..x1 {
                    tiles[y * tiles_width + x].push(object);
                }
            }
        }

        // filter empty tiles out and make a list of jobs
        let jobs = Vec::from_iter_in(
            tiles
                .into_iter()
                .enumerate()
                .filter(|(_, objects)| !objects.is_empty())
                .map(|(i, objects)| DispatchJob {
                    x: ((i % tiles_width) * TILE_SIZE) as u32,
                    y: ((i / tiles_width) * TILE_SIZE) as u32,
                    objects: objects.into_bump_slice(),
                }),
            self.arena,
        )
        .into_bump_slice();

        log::trace!("dispatching {} objects over {} tiles", objects.len(), jobs.len());

        let run = |worker: &mut TileWorker, job: &DispatchJob| {
            simd::dispatch(
                #[inline(always)]
                || {
                    // SAFETY: the buffer outlives this call, and every job writes a different tile
                    let tile = unsafe {
                        BufferMut::from_raw_parts(buffer_ptr as *mut u32, width, height, stride).subregion_mut(
                            job.x as usize,
                            job.y as usize,
                            TILE_SIZE,
                            TILE_SIZE,
                        )
                    };

                    worker.run(job, tile);
                },
            )
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            jobs.par_iter().for_each_init(TileWorker::new, |worker, job| run(worker, job));
        }

        #[cfg(not(feature = "parallel"))]
        {
            let mut worker = TileWorker::new();
            for job in jobs.iter() {
                run(&mut worker, job);
            }
        }
    }
}

struct DispatchJob<'a> {
    x: u32,
    y: u32,
    objects: &'a [&'a DispatchObject<'a>],
}

/// Per-thread scratch memory for one tile at a time.
struct TileWorker {
    color: Box<[Color; PIXEL_COUNT]>,
    clip: Box<[[f32; 2]; PIXEL_COUNT]>,
    coverage: Box<[f32; PIXEL_COUNT]>,
    uv: Box<[Vec2; PIXEL_COUNT]>,
    crossings: std::vec::Vec<(f32, i32)>,
    nearby: std::vec::Vec<Edge>,
}

impl TileWorker {
    fn new() -> Self {
        Self {
            color: Box::new([[0.0; 4]; PIXEL_COUNT]),
            clip: Box::new([[0.0; 2]; PIXEL_COUNT]),
            coverage: Box::new([0.0; PIXEL_COUNT]),
            uv: Box::new([Vec2::ZERO; PIXEL_COUNT]),
            crossings: std::vec::Vec::new(),
            nearby: std::vec::Vec::new(),
        }
    }

    fn run(&mut self, job: &DispatchJob, mut buffer: BufferMut) {
        let (width, height) = (buffer.width(), buffer.height());
        for j in 0..height {
            for i in 0..width {
                self.color[j * TILE_SIZE + i] = unpack_premultiplied(buffer[(i, j)]);
            }
        }

        // the clip buffer starts out empty for every flush
        self.clip.fill([0.0; 2]);

        let tile_bounds = Bounds {
            left: job.x,
            top: job.y,
            right: job.x + width as u32,
            bottom: job.y + height as u32,
        };
        let tile = TileGeometry {
            x: job.x,
            y: job.y,
            stride: TILE_SIZE,
        };

        for object in job.objects.iter() {
            let region = object.bounds.intersect(tile_bounds);
            if region.is_empty() {
                continue;
            }

            for y in region.top..region.bottom {
                let row = tile.index(region.left, y);
                self.coverage[row..row + region.width() as usize].fill(0.0);
            }

            match &object.coverage {
                Coverage::Fill { edges, rule } => {
                    raster::fill(edges, *rule, region, tile, &mut self.coverage[..], &mut self.crossings)
                }
                Coverage::Stroke { edges, radius } => {
                    raster::stroke(edges, *radius, region, tile, &mut self.coverage[..], &mut self.nearby)
                }
                Coverage::Rect { inverse } => raster::rect(inverse, region, tile, &mut self.coverage[..]),
                Coverage::Mesh { triangles } => {
                    raster::mesh(triangles, region, tile, &mut self.coverage[..], &mut self.uv[..])
                }
            }

            self.shade(object, region, tile);
        }

        for j in 0..height {
            for i in 0..width {
                buffer[(i, j)] = pack_premultiplied(self.color[j * TILE_SIZE + i]);
            }
        }
    }

    fn shade(&mut self, object: &DispatchObject, region: Bounds, tile: TileGeometry) {
        for py in region.top..region.bottom {
            for px in region.left..region.right {
                let index = tile.index(px, py);
                let coverage = self.coverage[index].min(1.0);
                if coverage <= 0.0 {
                    continue;
                }

                let center = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                if let Some(clip_rect) = &object.clip_rect {
                    let q = clip_rect.map(center);
                    if !(q.x.abs() <= 1.0 && q.y.abs() <= 1.0) {
                        continue;
                    }
                }

                if let Shading::ClipUpdate { clip_id, outer_clip_id } = object.shading {
                    if coverage >= 0.5 && (outer_clip_id == 0 || clip_ids_equal(self.clip[index], outer_clip_id)) {
                        self.clip[index] = clip_id_to_unorm(clip_id);
                    }
                    continue;
                }

                if object.clip_id != 0 && !clip_ids_equal(self.clip[index], object.clip_id) {
                    continue;
                }

                let src = shade_pixel(&object.shading, center, self.uv[index]);
                self.color[index] = blend(object.blend_mode, scale(src, coverage), self.color[index]);
            }
        }
    }
}

fn shade_pixel(shading: &Shading, center: Vec2, uv: Vec2) -> Color {
    match shading {
        Shading::Solid(color) => *color,
        Shading::Gradient {
            radial,
            matrix,
            span,
            row,
            ramps,
        } => {
            let p = matrix.map(center);
            let t = if *radial { p.length() } else { p.x };
            let x = t.clamp(0.0, 1.0) * span[0] + span[1];
            ramps.sample_row(x * ramps.width() as f32, *row)
        }
        Shading::Image {
            matrix,
            opacity,
            texture,
        } => {
            let p = matrix.map(center);
            scale(texture.sample(p.x, p.y), *opacity)
        }
        Shading::MeshImage { opacity, texture } => scale(texture.sample(uv.x, uv.y), *opacity),
        Shading::ClipUpdate { .. } => [0.0; 4],
    }
}
