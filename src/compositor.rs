// Layer compositor: photo first, then every step in the given order.
// Visual: this builds the one frame you see, the photo wearing all painted layers.
use tracing::debug;

use crate::blend::composite_layer;
use crate::detect::PartMaskSet;
use crate::paint::StepPaintStore;
use crate::stencil::intersect_in_place;
use crate::steps::{Step, StepStates};
use crate::types::RasterBuffer;

/// Render the preview frame.
///
/// `order` is the explicit bottom-to-top layer order (normally `Step::ORDER`).
/// `masks` is `None` while detection is still pending, which means no clipping at all.
/// Every step composites on every call, painted or not; empty layers simply leave
/// the output untouched.
pub fn render(
    photo: &RasterBuffer,
    order: &[Step],
    store: &StepPaintStore,
    states: &StepStates,
    masks: Option<&PartMaskSet>,
) -> RasterBuffer {
    debug_assert_eq!((store.width(), store.height()), (photo.width, photo.height));

    // 1) base layer: the photo, unmodified
    let mut out = photo.clone();

    for &step in order {
        let state = states.get(step);
        let config = step.config();

        // 2) what the user painted for this step
        let mut coverage = store.mask(step).clone();

        // 3) optional anatomical clamp
        if state.clamp_to_part {
            if let Some(part) = masks.and_then(|m| m.part(config.part)) {
                intersect_in_place(&mut coverage, part);
            }
        }

        // 4) hard face boundary
        if let Some(m) = masks {
            intersect_in_place(&mut coverage, &m.face_clip);
        }

        // 5) flat tint, visible only where coverage survived
        let mut layer = RasterBuffer::filled(photo.width, photo.height, state.color);
        layer.set_alpha_from(&coverage);

        // 6) blend at the step's strength
        composite_layer(&mut out, &layer, config.blend, state.strength());
    }

    debug!(layers = order.len(), clipped = masks.is_some(), "rendered frame");
    out
}
