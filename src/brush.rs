// Brush stamps: one reusable dab per (kind, radius).
// Visual: soft round dabs; powder looks speckled, gloss has a denser sheen near the top-left.
use rand::Rng;
use tracing::debug;

use crate::steps::BrushKind;
use crate::types::{AlphaStencil, BrushStamp, RasterBuffer, mul_255};

/// Darkest grain a powder texel can get (0..=79 subtracted from white).
const POWDER_GRAIN_MAX: u8 = 80;
/// Opacity of the gloss sheen laid over the base gradient (0.35).
const SHEEN_ALPHA: u8 = 89;
/// Sheen ellipse, in units of the radius: center, radii, rotation (radians).
const SHEEN_CENTER: f32 = 0.6;
const SHEEN_RX: f32 = 0.35;
const SHEEN_RY: f32 = 0.15;
const SHEEN_ANGLE: f32 = -0.6;

/// Source-over of the sheen onto coverage `a`.
fn with_sheen(a: u8) -> u8 {
    a + mul_255(SHEEN_ALPHA, 255 - a)
}

/// Build the stamp for `kind` at `radius` (clamped to ≥ 1).
/// Every kind starts as a radial gradient: opaque at the center, zero at the rim.
/// Grain is rolled here, once per build, from `rng`, not per placement.
///
/// The eraser footprint is the gradient lifted by the sheen opacity for every kind. It is
/// at least what any brush of this radius or smaller deposits at the same offset, so
/// erasing a stroke with an equal or larger brush removes all of it.
pub fn build_stamp<R: Rng + ?Sized>(kind: BrushKind, radius: u32, rng: &mut R) -> BrushStamp {
    let radius = radius.max(1);
    let size = (radius * 2) as usize;
    let r = radius as f32;
    let mut image = RasterBuffer::new(size, size);
    let mut eraser = AlphaStencil::empty(size, size);

    let (sin, cos) = SHEEN_ANGLE.sin_cos();
    let (rx, ry) = (r * SHEEN_RX, r * SHEEN_RY);
    for y in 0..size {
        for x in 0..size {
            // Sample at the pixel center so the dab is symmetric.
            let dx = x as f32 + 0.5 - r;
            let dy = y as f32 + 0.5 - r;
            let d = dx.hypot(dy);
            if d >= r {
                continue;
            }
            let base = (255.0 * (1.0 - d / r)).round() as u8;
            if base == 0 {
                continue;
            }
            eraser.set(x, y, with_sheen(base));

            let (gray, alpha) = match kind {
                BrushKind::Soft | BrushKind::Cream => (255, base),
                BrushKind::Powder => (255 - rng.gen_range(0..POWDER_GRAIN_MAX), base),
                BrushKind::Gloss => {
                    let hx = x as f32 + 0.5 - r * SHEEN_CENTER;
                    let hy = y as f32 + 0.5 - r * SHEEN_CENTER;
                    let u = hx * cos + hy * sin;
                    let v = -hx * sin + hy * cos;
                    let in_sheen = (u / rx).powi(2) + (v / ry).powi(2) <= 1.0;
                    (255, if in_sheen { with_sheen(base) } else { base })
                }
            };
            image.set_pixel(x, y, [gray, gray, gray, alpha]);
        }
    }

    debug!(?kind, radius, "built brush stamp");
    BrushStamp { radius, image, eraser }
}
