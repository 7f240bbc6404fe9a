// Per-step paint masks and the brush rasterizer that writes into them.
// Visual: each step remembers where you brushed; switching steps never touches the others.
use tracing::trace;

use crate::steps::Step;
use crate::types::{AlphaStencil, BrushStamp, Point};

/// Whether a stroke adds coverage or removes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaintMode {
    #[default]
    Paint,
    Erase,
}

/// Default distance between dabs, as a fraction of the brush radius.
pub const DEFAULT_SPACING: f32 = 0.6;

/// One alpha mask per step, all at photo resolution.
#[derive(Clone, Debug)]
pub struct StepPaintStore {
    width: usize,
    height: usize,
    masks: Vec<AlphaStencil>, // indexed by Step::index()
}

impl StepPaintStore {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            masks: (0..Step::COUNT).map(|_| AlphaStencil::empty(width, height)).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mask(&self, step: Step) -> &AlphaStencil {
        &self.masks[step.index()]
    }

    /// Reset exactly one step to fully transparent.
    pub fn clear_step(&mut self, step: Step) {
        self.masks[step.index()].clear();
    }

    /// Stamp a single dab centered at `p` onto `step`'s mask.
    pub fn paint_dot(&mut self, step: Step, p: Point, mode: PaintMode, stamp: &BrushStamp) {
        dab(&mut self.masks[step.index()], p, mode, stamp);
    }

    /// Stamp dabs along a→b and always finish with one exactly on `b`.
    ///
    /// Paint walks a whole-pixel stride of `floor(spacing × radius)` (at least 1 px). Erase
    /// walks every whole pixel, so it lands on every center a paint stroke over the same
    /// segment used, whatever that brush's radius was. Dabs whose footprint misses the
    /// canvas are skipped. Returns the number of dabs that touched the canvas.
    pub fn paint_stroke(
        &mut self,
        step: Step,
        a: Point,
        b: Point,
        mode: PaintMode,
        stamp: &BrushStamp,
        spacing: f32,
    ) -> usize {
        let dist = a.distance(b);
        if !dist.is_finite() {
            trace!(%step, ?a, ?b, "non-finite stroke ignored");
            return 0;
        }
        let stride = match mode {
            PaintMode::Paint => (stamp.radius as f32 * spacing).floor().max(1.0),
            PaintMode::Erase => 1.0,
        };
        let mask = &mut self.masks[step.index()];

        // Samples at i × stride for every i with i × stride < dist; b closes the segment.
        let count = (dist / stride).ceil() as usize;
        let dir = if dist > 0.0 { ((b.x - a.x) / dist, (b.y - a.y) / dist) } else { (0.0, 0.0) };
        let margin = stamp.radius as f32 + 2.0;
        let mut placed = 0;
        if let Some((lo, hi)) = visible_span(a, dir, dist, mask.width as f32, mask.height as f32, margin) {
            let first = ((lo / stride).floor() as usize).saturating_sub(1);
            let end = ((hi / stride).ceil() as usize).saturating_add(2).min(count);
            for i in first..end {
                let t = i as f32 * stride;
                if t >= dist {
                    break;
                }
                if dab(mask, Point::new(a.x + dir.0 * t, a.y + dir.1 * t), mode, stamp) {
                    placed += 1;
                }
            }
        }
        if dab(mask, b, mode, stamp) {
            placed += 1;
        }
        trace!(%step, ?mode, dist, stride, placed, "stroke segment");
        placed
    }
}

/// Range of `t` in `[0, dist]` where `a + t·dir` lies within `margin` of the canvas.
fn visible_span(a: Point, dir: (f32, f32), dist: f32, w: f32, h: f32, margin: f32) -> Option<(f32, f32)> {
    let (mut lo, mut hi) = (0.0f32, dist);
    for (start, d, size) in [(a.x, dir.0, w), (a.y, dir.1, h)] {
        let (min, max) = (-margin, size + margin);
        if d == 0.0 {
            if start < min || start > max {
                return None;
            }
            continue;
        }
        let (t0, t1) = ((min - start) / d, (max - start) / d);
        lo = lo.max(t0.min(t1));
        hi = hi.min(t0.max(t1));
    }
    (lo <= hi).then_some((lo, hi))
}

/// Apply one stamp to a mask. Paint accumulates (capped at 255); erase subtracts (floored at 0).
/// The stamp is centered on the pixel nearest `p`. Returns false when it misses the mask.
fn dab(mask: &mut AlphaStencil, p: Point, mode: PaintMode, stamp: &BrushStamp) -> bool {
    let r = stamp.radius as i64;
    let d = stamp.diameter() as i64;
    let ox = p.x.round() as i64 - r;
    let oy = p.y.round() as i64 - r;
    let (x0, x1) = (ox.max(0), (ox + d).min(mask.width as i64));
    let (y0, y1) = (oy.max(0), (oy + d).min(mask.height as i64));
    if x0 >= x1 || y0 >= y1 {
        return false;
    }

    for sy in y0..y1 {
        let ky = (sy - oy) as usize;
        let row = sy as usize * mask.width;
        for sx in x0..x1 {
            let kx = (sx - ox) as usize;
            let a = &mut mask.alpha[row + sx as usize];
            match mode {
                PaintMode::Paint => *a = a.saturating_add(stamp.paint_coverage(kx, ky)),
                PaintMode::Erase => *a = a.saturating_sub(stamp.erase_coverage(kx, ky)),
            }
        }
    }
    true
}
