//! Blend mode definitions and per-pixel compositing.

use image::Rgba;
use serde::{Deserialize, Serialize};

/// Blend modes for compositing a layer against the accumulated backdrop.
///
/// These are the standard 2D compositing operators; the list order is the
/// order they appear in the blend picker.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Multiply => "Multiply",
            Self::Screen => "Screen",
            Self::Overlay => "Overlay",
            Self::Darken => "Darken",
            Self::Lighten => "Lighten",
            Self::ColorDodge => "Color Dodge",
            Self::ColorBurn => "Color Burn",
            Self::HardLight => "Hard Light",
            Self::SoftLight => "Soft Light",
            Self::Difference => "Difference",
            Self::Exclusion => "Exclusion",
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::Color => "Color",
            Self::Luminosity => "Luminosity",
        }
    }

    /// All blend modes in picker order.
    pub fn all() -> &'static [BlendMode] {
        &[
            Self::Normal,
            Self::Multiply,
            Self::Screen,
            Self::Overlay,
            Self::Darken,
            Self::Lighten,
            Self::ColorDodge,
            Self::ColorBurn,
            Self::HardLight,
            Self::SoftLight,
            Self::Difference,
            Self::Exclusion,
            Self::Hue,
            Self::Saturation,
            Self::Color,
            Self::Luminosity,
        ]
    }
}

/// Blends one straight-alpha pixel over another.
///
/// The color mix follows the W3C compositing model: the blended color is
/// interpolated toward the raw source color where the backdrop is
/// transparent, then composited source-over. Alpha is always source-over
/// regardless of mode.
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, mode: BlendMode) -> Rgba<u8> {
    // Fast path: fully transparent top pixel, nothing to blend
    if top[3] == 0 {
        return base;
    }
    // Fast path: Normal blend with a fully opaque top pixel just overwrites
    if matches!(mode, BlendMode::Normal) && top[3] == 255 {
        return top;
    }

    let base_c = [
        base[0] as f32 / 255.0,
        base[1] as f32 / 255.0,
        base[2] as f32 / 255.0,
    ];
    let top_c = [
        top[0] as f32 / 255.0,
        top[1] as f32 / 255.0,
        top[2] as f32 / 255.0,
    ];
    let base_a = base[3] as f32 / 255.0;
    let top_a = top[3] as f32 / 255.0;

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blended = blend_color(base_c, top_c, mode);
    let mut out = [0u8; 4];
    for i in 0..3 {
        // Where the backdrop is transparent the source contributes its raw
        // color; where it is opaque it contributes the blend result.
        let mixed = (1.0 - base_a) * top_c[i] + base_a * blended[i];
        let c = (top_a * mixed + base_a * (1.0 - top_a) * base_c[i]) / out_a;
        out[i] = (c * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

fn blend_color(base: [f32; 3], top: [f32; 3], mode: BlendMode) -> [f32; 3] {
    match mode {
        BlendMode::Normal => top,
        BlendMode::Multiply => per_channel(base, top, |b, s| b * s),
        BlendMode::Screen => per_channel(base, top, |b, s| 1.0 - (1.0 - b) * (1.0 - s)),
        BlendMode::Overlay => per_channel(base, top, overlay_channel),
        BlendMode::Darken => per_channel(base, top, f32::min),
        BlendMode::Lighten => per_channel(base, top, f32::max),
        BlendMode::ColorDodge => per_channel(base, top, color_dodge_channel),
        BlendMode::ColorBurn => per_channel(base, top, color_burn_channel),
        BlendMode::HardLight => per_channel(base, top, |b, s| overlay_channel(s, b)),
        BlendMode::SoftLight => per_channel(base, top, soft_light_channel),
        BlendMode::Difference => per_channel(base, top, |b, s| (b - s).abs()),
        BlendMode::Exclusion => per_channel(base, top, |b, s| b + s - 2.0 * b * s),
        BlendMode::Hue => set_lum(set_sat(top, sat(base)), lum(base)),
        BlendMode::Saturation => set_lum(set_sat(base, sat(top)), lum(base)),
        BlendMode::Color => set_lum(top, lum(base)),
        BlendMode::Luminosity => set_lum(base, lum(top)),
    }
}

fn per_channel(base: [f32; 3], top: [f32; 3], f: impl Fn(f32, f32) -> f32) -> [f32; 3] {
    [
        f(base[0], top[0]),
        f(base[1], top[1]),
        f(base[2], top[2]),
    ]
}

fn overlay_channel(base: f32, top: f32) -> f32 {
    if base <= 0.5 {
        2.0 * base * top
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - top)
    }
}

fn color_dodge_channel(base: f32, top: f32) -> f32 {
    if base == 0.0 {
        0.0
    } else if top >= 1.0 {
        1.0
    } else {
        (base / (1.0 - top)).min(1.0)
    }
}

fn color_burn_channel(base: f32, top: f32) -> f32 {
    if base >= 1.0 {
        1.0
    } else if top == 0.0 {
        0.0
    } else {
        1.0 - ((1.0 - base) / top).min(1.0)
    }
}

fn soft_light_channel(base: f32, top: f32) -> f32 {
    if top <= 0.5 {
        base - (1.0 - 2.0 * top) * base * (1.0 - base)
    } else {
        let d = if base <= 0.25 {
            ((16.0 * base - 12.0) * base + 4.0) * base
        } else {
            base.sqrt()
        };
        base + (2.0 * top - 1.0) * (d - base)
    }
}

// Non-separable helpers, straight out of the compositing spec.

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(mut c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    if n < 0.0 {
        for ch in &mut c {
            *ch = l + (*ch - l) * l / (l - n);
        }
    }
    if x > 1.0 {
        for ch in &mut c {
            *ch = l + (*ch - l) * (1.0 - l) / (x - l);
        }
    }
    c
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color([c[0] + d, c[1] + d, c[2] + d])
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    // Order the channel indices so min <= mid <= max.
    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| c[a].partial_cmp(&c[b]).unwrap_or(std::cmp::Ordering::Equal));
    let [min_i, mid_i, max_i] = idx;

    let mut out = [0.0f32; 3];
    if c[max_i] > c[min_i] {
        out[mid_i] = (c[mid_i] - c[min_i]) * s / (c[max_i] - c[min_i]);
        out[max_i] = s;
    }
    out
}
