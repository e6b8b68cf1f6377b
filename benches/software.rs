use criterion::{Criterion, criterion_group, criterion_main};
use plsdraw::software::SoftwareBackend;
use plsdraw::*;
use std::hint::black_box;

fn circles(count: usize) -> Vec<Draw> {
    (0..count)
        .map(|i| {
            let t = i as f32 / count as f32;
            let path = RawPath::circle(Vec2::new(256.0, 256.0), 240.0 * (1.0 - t) + 8.0);
            let color = color_argb(0x80, (t * 255.0) as u8, 0x40, 0xff);
            PathDraw::fill(&path, Mat2d::IDENTITY, Paint::Solid(color)).into()
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("circles (prepare)", |b| {
        let mut cx = RenderContext::new(SoftwareBackend::new());
        let target = cx.backend_mut().make_render_target(Size::from([512, 512]));

        b.iter(|| {
            cx.begin_frame(FrameDescriptor::new(target));
            cx.push_draws(circles(10)).unwrap();
            black_box(cx.pending_path_count());
            cx.drop_frame();
        });
    });

    c.bench_function("circles (draw)", |b| {
        let mut cx = RenderContext::new(SoftwareBackend::new());
        let target = cx.backend_mut().make_render_target(Size::from([512, 512]));

        b.iter(|| {
            cx.begin_frame(FrameDescriptor::new(target).with_clear_color(0xffff_ffff));
            cx.push_draws(circles(10)).unwrap();
            black_box(cx.flush(FlushType::EndOfFrame).unwrap());
        })
    });

    c.bench_function("small rects (draw)", |b| {
        let mut cx = RenderContext::new(SoftwareBackend::new());
        let target = cx.backend_mut().make_render_target(Size::from([512, 512]));
        let rects = (0..4096)
            .map(|i| {
                let (x, y) = ((i % 64) as f32 * 8.0, (i / 64) as f32 * 8.0);
                let path = RawPath::rect(Aabb::new(x, y, x + 6.0, y + 6.0));
                PathDraw::fill(&path, Mat2d::IDENTITY, Paint::Solid(0xff20_4080 | i)).into()
            })
            .collect::<Vec<Draw>>();

        b.iter(|| {
            cx.begin_frame(FrameDescriptor::new(target));
            cx.push_draws(rects.clone()).unwrap();
            black_box(cx.flush(FlushType::EndOfFrame).unwrap());
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
