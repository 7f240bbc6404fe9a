// Guide outlines: a coarse ellipse around a part stencil, drawn as an orientation cue.
// Visual: a faint oval around the lips / brows / eyes / face for the active step.
// It does not trace the contour and the compositor never looks at it.
use std::f32::consts::TAU;

use crate::detect::PartMaskSet;
use crate::stencil::bounding_box;
use crate::steps::Step;
use crate::types::{AlphaStencil, Point};

/// Axis-aligned ellipse in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GuidePath {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
}

impl GuidePath {
    /// SVG path data: two half-arcs from the left extreme to the right and back.
    pub fn to_svg(&self) -> String {
        let GuidePath { cx, cy, rx, ry } = *self;
        format!(
            "M {} {} a {} {} 0 1 0 {} 0 a {} {} 0 1 0 {} 0",
            cx - rx,
            cy,
            rx,
            ry,
            rx * 2.0,
            rx,
            ry,
            -rx * 2.0
        )
    }

    /// Closed polyline with `n` vertices (at least 3) for raster overlays.
    pub fn points(&self, n: usize) -> Vec<Point> {
        let n = n.max(3);
        (0..n)
            .map(|i| {
                let t = TAU * i as f32 / n as f32;
                Point::new(self.cx + self.rx * t.cos(), self.cy + self.ry * t.sin())
            })
            .collect()
    }
}

/// Ellipse inscribed in the tight bounding box of non-zero alpha; `None` for an empty stencil.
pub fn guide_path(stencil: &AlphaStencil) -> Option<GuidePath> {
    let (x0, y0, x1, y1) = bounding_box(stencil)?;
    let (x0, y0, x1, y1) = (x0 as f32, y0 as f32, x1 as f32, y1 as f32);
    Some(GuidePath { cx: (x0 + x1) / 2.0, cy: (y0 + y1) / 2.0, rx: (x1 - x0) / 2.0, ry: (y1 - y0) / 2.0 })
}

/// Guide for a step: lips, brows and shadow follow their part, skin steps follow the skin.
/// No masks yet, or no stencil for that part, means no guide.
pub fn guide_for_step(step: Step, masks: Option<&PartMaskSet>) -> Option<GuidePath> {
    let stencil = masks?.part(step.config().part)?;
    guide_path(stencil)
}
