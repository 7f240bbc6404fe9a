//! Per-pixel blend functions.
//!
//! Backdrop is the accumulated output (photo plus the layers below), source is a
//! step's tinted layer. Channel math follows the usual separable blend formulas
//! on normalized [0, 1] values:
//!
//! `result = (1 - αs) · Cb + αs · B(Cb, Cs)` with `αs = layer alpha × opacity`.

use tracing::debug;

use crate::steps::BlendMode;
use crate::types::RasterBuffer;

/// Separable blend function B(Cb, Cs) for one normalized channel.
#[inline]
pub fn blend_channel(mode: BlendMode, cb: f32, cs: f32) -> f32 {
    match mode {
        BlendMode::Normal => cs,
        BlendMode::Multiply => cb * cs,
        BlendMode::Screen => screen(cb, cs),
        BlendMode::Overlay => hard_light(cs, cb),
        BlendMode::SoftLight => soft_light(cb, cs),
    }
}

#[inline]
fn screen(cb: f32, cs: f32) -> f32 {
    cb + cs - cb * cs
}

/// Overlay is hard-light with the operands swapped.
#[inline]
fn hard_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 { cb * 2.0 * cs } else { screen(cb, 2.0 * cs - 1.0) }
}

#[inline]
fn soft_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
    } else {
        let d = if cb <= 0.25 { ((16.0 * cb - 12.0) * cb + 4.0) * cb } else { cb.sqrt() };
        cb + (2.0 * cs - 1.0) * (d - cb)
    }
}

/// Composite `layer` onto `out` in place with `mode` at `opacity` (clamped to [0, 1]).
/// Pixels where the layer contributes nothing are left bit-identical.
pub fn composite_layer(out: &mut RasterBuffer, layer: &RasterBuffer, mode: BlendMode, opacity: f32) {
    debug_assert!(layer.same_size(out.width, out.height));
    let opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
    if opacity == 0.0 {
        return;
    }

    let mut touched = 0usize;
    for (dst, src) in out.data.chunks_exact_mut(4).zip(layer.data.chunks_exact(4)) {
        if src[3] == 0 {
            continue;
        }
        let alpha = src[3] as f32 / 255.0 * opacity;
        for c in 0..3 {
            let cb = dst[c] as f32 / 255.0;
            let cs = src[c] as f32 / 255.0;
            let mixed = (1.0 - alpha) * cb + alpha * blend_channel(mode, cb, cs);
            dst[c] = (mixed * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        // Source-over coverage; an opaque photo stays opaque.
        let ab = dst[3] as f32 / 255.0;
        dst[3] = ((alpha + ab * (1.0 - alpha)) * 255.0).round().clamp(0.0, 255.0) as u8;
        touched += 1;
    }
    debug!(blend_mode = mode.display_name(), opacity, touched, "composited layer");
}
