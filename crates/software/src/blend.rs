//! Color conversion and the sixteen blend modes, on premultiplied `[r, g, b, a]` floats.

use crate::buffer::{pack_argb, unpack_argb};
use plsdraw_core::BlendMode;

pub type Color = [f32; 4];

/// `0xAARRGGBB` to premultiplied `[r, g, b, a]`.
#[inline]
pub fn unpack_premultiplied(color: u32) -> Color {
    let (a, r, g, b) = unpack_argb(color);
    let a = a as f32 / 255.0;
    [r as f32 / 255.0 * a, g as f32 / 255.0 * a, b as f32 / 255.0 * a, a]
}

/// Premultiplied `[r, g, b, a]` to `0xAARRGGBB`.
#[inline]
pub fn pack_premultiplied(color: Color) -> u32 {
    let to_u8 = |x: f32| if x.is_nan() { 0 } else { (x.clamp(0.0, 1.0) * 255.0).round() as u8 };

    let a = color[3];
    if a.is_nan() || a <= 0.0 {
        return 0;
    }

    pack_argb(to_u8(a), to_u8(color[0] / a), to_u8(color[1] / a), to_u8(color[2] / a))
}

/// Channel-wise interpolation between two `0xAARRGGBB` colors.
pub fn lerp_unpremultiplied(color0: u32, color1: u32, t: f32) -> u32 {
    let (a0, r0, g0, b0) = unpack_argb(color0);
    let (a1, r1, g1, b1) = unpack_argb(color1);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    pack_argb(mix(a0, a1), mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

pub fn scale(color: Color, s: f32) -> Color {
    color.map(|x| x * s)
}

/// Composite `src` over `dst` with `mode`. Both are premultiplied.
pub fn blend(mode: BlendMode, src: Color, dst: Color) -> Color {
    let (sa, da) = (src[3], dst[3]);
    if mode == BlendMode::SrcOver || sa <= 0.0 || da <= 0.0 {
        return std::array::from_fn(|i| src[i] + dst[i] * (1.0 - sa));
    }

    let cs = [src[0] / sa, src[1] / sa, src[2] / sa];
    let cb = [dst[0] / da, dst[1] / da, dst[2] / da];
    let mixed = if mode.is_hsl() {
        non_separable(mode, cs, cb)
    } else {
        std::array::from_fn(|i| separable(mode, cs[i], cb[i]))
    };

    let mut out = [0.0; 4];
    for i in 0..3 {
        out[i] = src[i] * (1.0 - da) + dst[i] * (1.0 - sa) + sa * da * mixed[i];
    }
    out[3] = sa + da * (1.0 - sa);
    out
}

fn separable(mode: BlendMode, cs: f32, cb: f32) -> f32 {
    let multiply = |cb: f32, cs: f32| cb * cs;
    let screen = |cb: f32, cs: f32| cb + cs - cb * cs;
    let hard_light = |cb: f32, cs: f32| {
        if cs <= 0.5 {
            multiply(cb, 2.0 * cs)
        } else {
            screen(cb, 2.0 * cs - 1.0)
        }
    };

    match mode {
        BlendMode::Multiply => multiply(cb, cs),
        BlendMode::Screen => screen(cb, cs),
        BlendMode::Overlay => hard_light(cs, cb),
        BlendMode::Darken => cb.min(cs),
        BlendMode::Lighten => cb.max(cs),
        BlendMode::ColorDodge => {
            if cb <= 0.0 {
                0.0
            } else if cs >= 1.0 {
                1.0
            } else {
                (cb / (1.0 - cs)).min(1.0)
            }
        }
        BlendMode::ColorBurn => {
            if cb >= 1.0 {
                1.0
            } else if cs <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - cb) / cs).min(1.0)
            }
        }
        BlendMode::HardLight => hard_light(cb, cs),
        BlendMode::SoftLight => {
            if cs <= 0.5 {
                cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
            } else {
                let d = if cb <= 0.25 {
                    ((16.0 * cb - 12.0) * cb + 4.0) * cb
                } else {
                    cb.sqrt()
                };
                cb + (2.0 * cs - 1.0) * (d - cb)
            }
        }
        BlendMode::Difference => (cb - cs).abs(),
        BlendMode::Exclusion => cb + cs - 2.0 * cb * cs,
        _ => cs,
    }
}

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);

    c.map(|c| {
        let mut c = c;
        if n < 0.0 && l - n > 0.0 {
            c = l + (c - l) * l / (l - n);
        }
        if x > 1.0 && x - l > 0.0 {
            c = l + (c - l) * (1.0 - l) / (x - l);
        }
        c
    })
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color(c.map(|c| c + d))
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let max = c[0].max(c[1]).max(c[2]);
    let min = c[0].min(c[1]).min(c[2]);
    if max > min {
        c.map(|c| (c - min) * s / (max - min))
    } else {
        [0.0; 3]
    }
}

fn non_separable(mode: BlendMode, cs: [f32; 3], cb: [f32; 3]) -> [f32; 3] {
    match mode {
        BlendMode::Hue => set_lum(set_sat(cs, sat(cb)), lum(cb)),
        BlendMode::Saturation => set_lum(set_sat(cb, sat(cs)), lum(cb)),
        BlendMode::Color => set_lum(cs, lum(cb)),
        _ => set_lum(cb, lum(cs)),
    }
}
