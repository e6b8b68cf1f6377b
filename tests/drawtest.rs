use plsdraw::{
    Aabb, BlendMode, Draw, FillRule, FlushReport, FlushType, FrameDescriptor, Gradient, ImageData, ImageFormat,
    ImageMeshDraw, ImageRectDraw, ImageTexture, InteriorTriangulationDraw, Mat2d, Paint, PathDraw, RawPath,
    RenderBufferFlags, RenderBufferType, RenderContext, RenderTarget, Size, StrokeStyle, Vec2, color_argb,
    software::{Buffer, SoftwareBackend},
};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

const BLACK: u32 = 0xff00_0000;
const WHITE: u32 = 0xffff_ffff;
const RED: u32 = 0xffff_0000;

/// a single opaque rect on a cleared target
/// - tests that a frame produces exactly one logical flush with one path
/// - the rect covers exactly its pixels
#[test]
fn fill_rect() {
    run("fill-rect", [64, 64], |cx, target| {
        let report = frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            vec![rect(16.0, 16.0, 48.0, 48.0, Paint::Solid(BLACK))]
        });

        assert_eq!(report.flushes.len(), 1);
        assert_eq!(report.path_count(), 1);
        assert_eq!(report.flushes[0].draw_list.len(), 1);
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(16, 16), Some(BLACK));
        assert_eq!(buffer.pixel(47, 47), Some(BLACK));
        assert_eq!(buffer.pixel(15, 16), Some(WHITE));
        assert_eq!(buffer.pixel(48, 47), Some(WHITE));
    });
}

/// two paths sharing a gradient
/// - tests that the ramp is written once per flush
/// - the gradient is sampled left to right
#[test]
fn shared_linear_gradient() {
    run("shared-linear-gradient", [64, 64], |cx, target| {
        let gradient = Gradient::linear(Vec2::new(0.0, 0.0), Vec2::new(64.0, 0.0), &[BLACK, WHITE], &[0.0, 1.0]);
        let report = frame(cx, FrameDescriptor::new(target), |_| {
            vec![
                rect(0.0, 0.0, 64.0, 32.0, Paint::Gradient(gradient.clone())),
                rect(0.0, 32.0, 64.0, 64.0, Paint::Gradient(gradient.clone())),
            ]
        });

        assert_eq!(report.flushes[0].simple_gradient_count, 1);
    })
    .check(|buffer| {
        let red = |x, y| (buffer.pixel(x, y).unwrap_or_default() >> 16) & 0xff;
        assert!(red(0, 10) < 8, "{:#x}", red(0, 10));
        assert!(red(63, 10) > 247, "{:#x}", red(63, 10));
        assert!((120..=140).contains(&red(32, 10)), "{:#x}", red(32, 10));
        assert_eq!(red(32, 10), red(32, 50));
    });
}

/// more paths than one logical flush can address
/// - tests that the frame is split into two logical flushes
/// - that every path still lands in its own pixel, in order
#[test]
fn many_paths_split_flushes() {
    const COUNT: u32 = 65540;
    let color = |i: u32| color_argb(0xff, (i & 0xff) as u8, ((i >> 8) & 0xff) as u8, 0x80);

    run("many-paths", [256, 256], |cx, target| {
        cx.begin_frame(FrameDescriptor::new(target));
        for i in 0..COUNT {
            let (x, y) = ((i % 256) as f32, ((i / 256) % 256) as f32);
            cx.push_draws(vec![rect(x, y, x + 1.0, y + 1.0, Paint::Solid(color(i)))])
                .unwrap();
        }

        let report = cx.flush(FlushType::EndOfFrame).unwrap();
        assert_eq!(report.flushes.len(), 2);
        assert_eq!(report.path_count(), COUNT as usize);
    })
    .check(|buffer| {
        for i in 0..256 * 256 {
            let (x, y) = ((i % 256) as usize, (i / 256) as usize);
            assert_eq!(buffer.pixel(x, y), Some(color(i)), "pixel ({x}, {y})");
        }
    });
}

/// a clip path followed by content clipped to it
/// - tests clip updates and clip ID tests
/// - that clipped content does not leak outside the clip
#[test]
fn clip_left_half() {
    run("clip-left-half", [64, 64], |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |cx| {
            let clip_id = cx.generate_clip_id().unwrap();
            vec![
                rect(0.0, 0.0, 32.0, 64.0, Paint::ClipUpdate { outer_clip_id: 0 }).with_clip(clip_id),
                rect(8.0, 8.0, 56.0, 56.0, Paint::Solid(RED)).with_clip(clip_id),
            ]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(10, 10), Some(RED));
        assert_eq!(buffer.pixel(31, 40), Some(RED));
        assert_eq!(buffer.pixel(32, 40), Some(WHITE));
        assert_eq!(buffer.pixel(50, 50), Some(WHITE));
    });
}

/// a clip nested inside another clip
/// - tests that the inner clip is intersected with the outer one
#[test]
fn nested_clip() {
    run("nested-clip", [64, 64], |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |cx| {
            let outer = cx.generate_clip_id().unwrap();
            let inner = cx.generate_clip_id().unwrap();
            vec![
                rect(0.0, 0.0, 32.0, 64.0, Paint::ClipUpdate { outer_clip_id: 0 }).with_clip(outer),
                rect(0.0, 0.0, 64.0, 32.0, Paint::ClipUpdate { outer_clip_id: outer }).with_clip(inner),
                rect(0.0, 0.0, 64.0, 64.0, Paint::Solid(BLACK)).with_clip(inner),
            ]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(10, 10), Some(BLACK));
        assert_eq!(buffer.pixel(40, 10), Some(WHITE));
        assert_eq!(buffer.pixel(10, 40), Some(WHITE));
        assert_eq!(buffer.pixel(40, 40), Some(WHITE));
    });
}

/// overlapping translucent shapes
/// - tests that atomic mode renders exactly what raster ordering renders
#[test]
fn atomic_mode_matches_raster_ordering() {
    let scene = |_: &mut RenderContext<SoftwareBackend>| {
        vec![
            rect(4.0, 4.0, 40.0, 40.0, Paint::Solid(0x80ff_0000)),
            circle(36.0, 36.0, 20.0, Paint::Solid(0x8000_80ff)),
            rect(20.0, 10.0, 60.0, 30.0, Paint::Solid(0xc000_ff00)).with_blend(BlendMode::Multiply),
        ]
    };

    let raster = run("atomic-raster-ordering", [64, 64], move |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), scene);
    });
    let atomic = run("atomic-atomics", [64, 64], move |cx, target| {
        let report = frame(
            cx,
            FrameDescriptor::new(target).with_clear_color(WHITE).with_atomic_mode(true),
            scene,
        );
        let last = report.flushes[0].draw_list.last().map(|batch| batch.draw_type);
        assert_eq!(last, Some(plsdraw::DrawType::AtomicResolve));
    });

    atomic.check(|buffer| assert_eq!(buffer.pixels(), raster.buffer.pixels()));
}

/// a thick horizontal line
/// - tests strokes use the stroke radius in device space
/// - open contours are not closed
#[test]
fn stroke_line() {
    run("stroke-line", [64, 64], |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            let mut path = RawPath::new();
            path.move_to(Vec2::new(8.0, 32.0)).line_to(Vec2::new(56.0, 32.0));
            vec![PathDraw::stroke(&path, Mat2d::IDENTITY, Paint::Solid(BLACK), StrokeStyle::new(8.0)).into()]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(32, 32), Some(BLACK));
        assert_eq!(buffer.pixel(32, 29), Some(BLACK));
        assert_eq!(buffer.pixel(32, 40), Some(WHITE));
        assert_eq!(buffer.pixel(32, 20), Some(WHITE));
    });
}

/// a closed rect stroked with zero width next to a filled rect
/// - tests a zero-width stroke paints nothing instead of filling its outline
#[test]
fn stroke_zero_width() {
    run("stroke-zero-width", [64, 64], |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            let outline = RawPath::rect(Aabb::new(16.0, 16.0, 48.0, 48.0));
            vec![
                PathDraw::stroke(&outline, Mat2d::IDENTITY, Paint::Solid(BLACK), StrokeStyle::new(0.0)).into(),
                rect(0.0, 0.0, 8.0, 8.0, Paint::Solid(BLACK)),
            ]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(32, 32), Some(WHITE));
        assert_eq!(buffer.pixel(16, 32), Some(WHITE));
        assert_eq!(buffer.pixel(4, 4), Some(BLACK));
    });
}

/// a stroked rect scaled up by its matrix
/// - tests the stroke radius scales with the path matrix
/// - closed contours get their closing segment
#[test]
fn stroke_scaled_rect() {
    run("stroke-scaled-rect", [64, 64], |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            let path = RawPath::rect(Aabb::new(4.0, 4.0, 28.0, 28.0));
            vec![PathDraw::stroke(&path, Mat2d::scale(2.0, 2.0), Paint::Solid(BLACK), StrokeStyle::new(2.0)).into()]
        });
    })
    .check(|buffer| {
        // the left edge sits at x = 8 with a device half width of 2
        assert_eq!(buffer.pixel(7, 32), Some(BLACK));
        assert_eq!(buffer.pixel(3, 32), Some(WHITE));
        assert_eq!(buffer.pixel(32, 8), Some(BLACK));
        assert_eq!(buffer.pixel(32, 32), Some(WHITE));
    });
}

/// two nested squares in one path
/// - tests the even-odd fill rule leaves a hole, non-zero does not
#[test]
fn even_odd_hole() {
    let nested = || {
        let mut path = RawPath::new();
        for (l, r) in [(8.0, 56.0), (24.0, 40.0)] {
            path.move_to(Vec2::new(l, l))
                .line_to(Vec2::new(r, l))
                .line_to(Vec2::new(r, r))
                .line_to(Vec2::new(l, r))
                .close();
        }
        path
    };

    run("even-odd", [64, 64], move |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            vec![
                PathDraw::fill(&nested(), Mat2d::IDENTITY, Paint::Solid(BLACK))
                    .with_fill_rule(FillRule::EvenOdd)
                    .into(),
            ]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(12, 12), Some(BLACK));
        assert_eq!(buffer.pixel(32, 32), Some(WHITE));
    });

    run("non-zero", [64, 64], move |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            vec![PathDraw::fill(&nested(), Mat2d::IDENTITY, Paint::Solid(BLACK)).into()]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(12, 12), Some(BLACK));
        assert_eq!(buffer.pixel(32, 32), Some(BLACK));
    });
}

/// a circle drawn through interior triangulation and through midpoint fans
/// - tests both paths produce the same shape up to edge pixels
#[test]
fn interior_triangulation_matches_fan() {
    let path = RawPath::circle(Vec2::new(32.0, 32.0), 24.0);
    let fan_path = path.clone();
    let fan = run("circle-fan", [64, 64], move |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            vec![PathDraw::fill(&fan_path, Mat2d::IDENTITY, Paint::Solid(BLACK)).into()]
        });
    });

    run("circle-triangulation", [64, 64], move |cx, target| {
        let report = frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            vec![InteriorTriangulationDraw::fill(&path, Mat2d::IDENTITY, Paint::Solid(BLACK)).into()]
        });
        assert!(report.flushes[0].triangle_vertex_count > 0);
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(32, 32), Some(BLACK));
        assert_eq!(buffer.pixel(32, 10), Some(BLACK));
        assert_eq!(buffer.pixel(2, 2), Some(WHITE));

        let differing = buffer
            .pixels()
            .iter()
            .zip(fan.buffer.pixels())
            .filter(|(a, b)| channel_difference(**a, **b) > 64)
            .count();
        assert!(differing < 40, "{differing} pixels differ");
    });
}

/// a 2x2 texture stretched over a rect, with and without a mesh
/// - tests image rects, image meshes and texture sampling
/// - a clip rect cuts the mesh in half
#[test]
fn image_rect_and_mesh() {
    const TEXELS: [u8; 16] = [
        255, 0, 0, 255, 0, 255, 0, 255, //
        0, 0, 255, 255, 255, 255, 0, 255,
    ];

    let check = |buffer: &Buffer| {
        assert_eq!(buffer.pixel(20, 20), Some(0xffff_0000));
        assert_eq!(buffer.pixel(44, 20), Some(0xff00_ff00));
        assert_eq!(buffer.pixel(20, 44), Some(0xff00_00ff));
        assert_eq!(buffer.pixel(44, 44), Some(0xffff_ff00));
        assert_eq!(buffer.pixel(8, 8), Some(WHITE));
    };

    run("image-rect", [64, 64], |cx, target| {
        let texture = make_texture(cx, &TEXELS);
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            let matrix = Mat2d::scale(32.0, 32.0).then(&Mat2d::translate(16.0, 16.0));
            vec![ImageRectDraw::new(texture, matrix, 1.0).into()]
        });
    })
    .check(check);

    run("image-mesh", [64, 64], |cx, target| {
        let texture = make_texture(cx, &TEXELS);
        let positions = f32_bytes(&[16.0, 16.0, 48.0, 16.0, 48.0, 48.0, 16.0, 48.0]);
        let vertices = make_buffer(cx, RenderBufferType::Vertex, &positions);
        let uvs = make_buffer(cx, RenderBufferType::Vertex, &f32_bytes(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]));
        let indices = make_buffer(
            cx,
            RenderBufferType::Index,
            &[0u16, 1, 2, 0, 2, 3].iter().flat_map(|i| i.to_le_bytes()).collect::<Vec<_>>(),
        );

        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            vec![
                ImageMeshDraw::new(
                    texture,
                    vertices,
                    uvs,
                    indices,
                    6,
                    Aabb::new(16.0, 16.0, 48.0, 48.0),
                    Mat2d::IDENTITY,
                    1.0,
                )
                .into(),
            ]
        });
    })
    .check(check);

    run("image-mesh-clip-rect", [64, 64], |cx, target| {
        let texture = make_texture(cx, &TEXELS);
        let positions = f32_bytes(&[16.0, 16.0, 48.0, 16.0, 48.0, 48.0, 16.0, 48.0]);
        let vertices = make_buffer(cx, RenderBufferType::Vertex, &positions);
        let uvs = make_buffer(cx, RenderBufferType::Vertex, &f32_bytes(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]));
        let indices = make_buffer(
            cx,
            RenderBufferType::Index,
            &[0u16, 1, 2, 0, 2, 3].iter().flat_map(|i| i.to_le_bytes()).collect::<Vec<_>>(),
        );

        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            vec![
                ImageMeshDraw::new(
                    texture,
                    vertices,
                    uvs,
                    indices,
                    6,
                    Aabb::new(16.0, 16.0, 48.0, 48.0),
                    Mat2d::IDENTITY,
                    1.0,
                )
                .with_clip_rect(Aabb::new(0.0, 0.0, 32.0, 64.0), &Mat2d::IDENTITY)
                .into(),
            ]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(20, 20), Some(0xffff_0000));
        assert_eq!(buffer.pixel(20, 44), Some(0xff00_00ff));
        assert_eq!(buffer.pixel(44, 20), Some(WHITE));
        assert_eq!(buffer.pixel(44, 44), Some(WHITE));
    });
}

/// a path filled with an image paint
/// - tests that path-local coordinates map onto texels
#[test]
fn image_paint() {
    run("image-paint", [64, 64], |cx, target| {
        let texture = make_texture(cx, &[0, 0, 255, 255]);
        frame(cx, FrameDescriptor::new(target).with_clear_color(WHITE), |_| {
            vec![rect(8.0, 8.0, 24.0, 24.0, Paint::Image { texture, opacity: 1.0 })]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(12, 12), Some(0xff00_00ff));
        assert_eq!(buffer.pixel(30, 30), Some(WHITE));
    });
}

/// a multiply blend over white
/// - tests that blend modes reach the backend
#[test]
fn multiply_blend() {
    run("multiply", [32, 32], |cx, target| {
        frame(cx, FrameDescriptor::new(target).with_clear_color(0xff80_80ff), |_| {
            vec![rect(0.0, 0.0, 32.0, 32.0, Paint::Solid(0xffff_ff00)).with_blend(BlendMode::Multiply)]
        });
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(16, 16), Some(0xff80_8000));
    });
}

/// an intermediate flush in the middle of a frame
/// - tests that the second pass draws on top of the first instead of clearing
#[test]
fn intermediate_flush_preserves() {
    run("intermediate-flush", [32, 32], |cx, target| {
        cx.begin_frame(FrameDescriptor::new(target).with_clear_color(WHITE));
        cx.push_draws(vec![rect(0.0, 0.0, 16.0, 32.0, Paint::Solid(BLACK))]).unwrap();
        cx.flush(FlushType::Intermediate).unwrap();
        cx.push_draws(vec![rect(16.0, 0.0, 32.0, 32.0, Paint::Solid(RED))]).unwrap();
        cx.flush(FlushType::EndOfFrame).unwrap();
        assert_eq!(cx.backend().flush_count(), 2);
    })
    .check(|buffer| {
        assert_eq!(buffer.pixel(4, 4), Some(BLACK));
        assert_eq!(buffer.pixel(20, 4), Some(RED));
    });
}

/// wireframe rendering of a filled rect
/// - tests that only the outline is drawn
#[test]
fn wireframe() {
    run("wireframe", [64, 64], |cx, target| {
        let mut desc = FrameDescriptor::new(target).with_clear_color(WHITE);
        desc.wireframe = true;
        frame(cx, desc, |_| vec![rect(16.0, 16.0, 48.0, 48.0, Paint::Solid(BLACK))]);
    })
    .check(|buffer| {
        assert_ne!(buffer.pixel(16, 32), Some(WHITE));
        assert_eq!(buffer.pixel(32, 32), Some(WHITE));
    });
}

trait DrawExt {
    fn with_clip(self, clip_id: u32) -> Draw;
    fn with_blend(self, blend_mode: BlendMode) -> Draw;
}

impl DrawExt for Draw {
    fn with_clip(self, clip_id: u32) -> Draw {
        match self {
            Draw::Path(path) => path.with_clip_id(clip_id).into(),
            other => other,
        }
    }

    fn with_blend(self, blend_mode: BlendMode) -> Draw {
        match self {
            Draw::Path(path) => path.with_blend_mode(blend_mode).into(),
            other => other,
        }
    }
}

fn rect(l: f32, t: f32, r: f32, b: f32, paint: Paint) -> Draw {
    PathDraw::fill(&RawPath::rect(Aabb::new(l, t, r, b)), Mat2d::IDENTITY, paint).into()
}

fn circle(x: f32, y: f32, radius: f32, paint: Paint) -> Draw {
    PathDraw::fill(&RawPath::circle(Vec2::new(x, y), radius), Mat2d::IDENTITY, paint).into()
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn make_texture(cx: &mut RenderContext<SoftwareBackend>, rgba: &[u8]) -> ImageTexture {
    let side = ((rgba.len() / 4) as f32).sqrt() as u32;
    cx.make_image_texture(ImageData {
        width: side,
        height: side,
        format: ImageFormat::RGBA8,
        data: rgba,
    })
    .unwrap()
}

fn make_buffer(
    cx: &mut RenderContext<SoftwareBackend>,
    kind: RenderBufferType,
    bytes: &[u8],
) -> plsdraw::RenderBuffer {
    let buffer = cx
        .make_render_buffer(kind, RenderBufferFlags::MAPPED_ONCE_AT_INITIALIZATION, bytes.len())
        .unwrap();
    cx.map_render_buffer(buffer).unwrap().copy_from_slice(bytes);
    cx.unmap_render_buffer(buffer);
    buffer
}

fn channel_difference(a: u32, b: u32) -> u32 {
    a.to_le_bytes()
        .iter()
        .zip(b.to_le_bytes())
        .map(|(a, b)| a.abs_diff(b) as u32)
        .max()
        .unwrap_or(0)
}

/// Open a frame, push `draws` in one batch and end the frame.
fn frame(
    cx: &mut RenderContext<SoftwareBackend>,
    desc: FrameDescriptor,
    draws: impl FnOnce(&mut RenderContext<SoftwareBackend>) -> Vec<Draw>,
) -> FlushReport {
    cx.begin_frame(desc);
    let draws = draws(cx);
    cx.push_draws(draws).unwrap();
    cx.flush(FlushType::EndOfFrame).unwrap()
}

struct Rendered {
    id: String,
    buffer: Buffer,
}

impl Rendered {
    /// Run `check` on the rendered image, saving it under `tests/drawtest/failures` if it panics.
    fn check(self, check: impl FnOnce(&Buffer)) {
        let result = catch_unwind(AssertUnwindSafe(|| check(&self.buffer)));
        let path = format!("./tests/drawtest/failures/{}.png", self.id);

        match result {
            Ok(()) => {
                std::fs::remove_file(path).ok();
            }
            Err(panic) => {
                std::fs::create_dir_all("./tests/drawtest/failures").ok();
                let saved = image::RgbaImage::from_raw(
                    self.buffer.width() as u32,
                    self.buffer.height() as u32,
                    self.buffer.to_rgba8(),
                )
                .map(|image| image.save(&path));
                eprintln!("{}: saved {path}: {saved:?}", self.id);
                resume_unwind(panic);
            }
        }
    }
}

fn run(id: &str, size: [u32; 2], render: impl FnOnce(&mut RenderContext<SoftwareBackend>, RenderTarget)) -> Rendered {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut cx = RenderContext::new(SoftwareBackend::new());
    let target = cx.backend_mut().make_render_target(Size::from(size));
    render(&mut cx, target);

    let buffer = cx.backend().render_target(target).cloned().unwrap_or_default();
    Rendered {
        id: id.to_string(),
        buffer,
    }
}
