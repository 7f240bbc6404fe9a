// One editing session: the loaded photo, every step's paint, brush settings and
// the detected masks, with the composited frame pulled on demand.
//
// Painting and rendering are synchronous on the caller's thread. Only detection
// is asynchronous; its replies are matched against the current photo token.
use std::path::Path;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::brush::build_stamp;
use crate::compositor::render;
use crate::config::EngineConfig;
use crate::detect::{MaskReply, MaskStatus, MaskWorker, PartMaskSet};
use crate::error::{DetectorError, Error};
use crate::guide::{GuidePath, guide_for_step};
use crate::io::export_jpeg;
use crate::paint::{DEFAULT_SPACING, PaintMode, StepPaintStore};
use crate::steps::{BrushKind, Step, StepStates};
use crate::types::{BrushStamp, Point, RasterBuffer, Rgb};

/// Where the part masks for the current photo stand.
#[derive(Clone, Debug, PartialEq)]
pub enum MaskState {
    /// Detection in flight; nothing is clipped meanwhile.
    Pending,
    Ready(PartMaskSet),
    /// Whole-canvas masks after a detector problem.
    Fallback { masks: PartMaskSet, reason: DetectorError },
}

impl MaskState {
    pub fn masks(&self) -> Option<&PartMaskSet> {
        match self {
            MaskState::Pending => None,
            MaskState::Ready(masks) | MaskState::Fallback { masks, .. } => Some(masks),
        }
    }

    /// Short HUD label.
    pub fn label(&self) -> &'static str {
        match self {
            MaskState::Pending => "DETECTING",
            MaskState::Ready(_) => "FACE",
            MaskState::Fallback { .. } => "NO FACE CLIP",
        }
    }
}

pub struct MakeupSession {
    photo: Option<Arc<RasterBuffer>>,
    /// Bumped on every photo load; detection replies for older tokens are dropped.
    token: u64,
    store: Option<StepPaintStore>,
    states: StepStates,
    order: Vec<Step>,
    active: Step,
    mode: PaintMode,
    brush_radius: u32,
    spacing: f32,
    stamp: Option<((BrushKind, u32), BrushStamp)>,
    rng: StdRng,
    masks: MaskState,
    worker: Option<MaskWorker>,
    frame: Option<RasterBuffer>,
    dirty: bool,
}

impl Default for MakeupSession {
    fn default() -> Self {
        Self::new(StepStates::default(), StdRng::from_entropy())
    }
}

impl MakeupSession {
    pub fn new(states: StepStates, rng: StdRng) -> Self {
        Self {
            photo: None,
            token: 0,
            store: None,
            states,
            order: Step::ORDER.to_vec(),
            active: Step::ORDER[0],
            mode: PaintMode::Paint,
            brush_radius: 18,
            spacing: DEFAULT_SPACING,
            stamp: None,
            rng,
            masks: MaskState::Pending,
            worker: None,
            frame: None,
            dirty: true,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, Error> {
        let mut session = Self::new(config.step_states()?, StdRng::from_entropy());
        session.set_brush_radius(config.brush_radius);
        session.spacing = config.stroke_spacing.max(0.0);
        Ok(session)
    }

    /// Hand detection over to a background worker. The current photo, if any, is submitted.
    pub fn attach_worker(&mut self, worker: MaskWorker) {
        if let Some(photo) = &self.photo {
            worker.submit(self.token, photo.clone());
            self.masks = MaskState::Pending;
            self.dirty = true;
        }
        self.worker = Some(worker);
    }

    /// Start working on a new photo and return its token.
    /// Paint survives the reload when the dimensions match; otherwise every step starts empty.
    pub fn load_photo(&mut self, photo: RasterBuffer) -> u64 {
        self.token += 1;
        let (w, h) = (photo.width, photo.height);
        let keep = self.store.as_ref().is_some_and(|s| s.width() == w && s.height() == h);
        if !keep {
            self.store = Some(StepPaintStore::new(w, h));
        }

        let photo = Arc::new(photo);
        self.masks = match &self.worker {
            Some(worker) => {
                worker.submit(self.token, photo.clone());
                MaskState::Pending
            }
            None => MaskState::Fallback {
                masks: PartMaskSet::fallback(w, h),
                reason: DetectorError::Unavailable("no detector attached".into()),
            },
        };
        self.photo = Some(photo);
        self.dirty = true;
        info!(token = self.token, width = w, height = h, kept_paint = keep, "photo loaded into session");
        self.token
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn photo(&self) -> Option<&RasterBuffer> {
        self.photo.as_deref()
    }

    /// Drain finished detections. Returns true when the current photo's masks changed.
    pub fn poll_masks(&mut self) -> bool {
        let mut replies = Vec::new();
        if let Some(worker) = &self.worker {
            while let Some(reply) = worker.try_recv() {
                replies.push(reply);
            }
        }
        let mut changed = false;
        for reply in replies {
            changed |= self.apply_masks(reply);
        }
        changed
    }

    /// Install a detection result if it belongs to the current photo.
    pub fn apply_masks(&mut self, reply: MaskReply) -> bool {
        if reply.token != self.token {
            debug!(stale = reply.token, current = self.token, "discarding stale detection");
            return false;
        }
        let MaskReply { outcome, .. } = reply;
        self.masks = match outcome.status {
            MaskStatus::Detected => MaskState::Ready(outcome.masks),
            MaskStatus::Fallback(reason) => MaskState::Fallback { masks: outcome.masks, reason },
        };
        self.dirty = true;
        true
    }

    pub fn mask_state(&self) -> &MaskState {
        &self.masks
    }

    pub fn active_step(&self) -> Step {
        self.active
    }

    /// Changes which guide is shown; the composited frame stays as it is.
    pub fn set_active_step(&mut self, step: Step) {
        self.active = step;
    }

    pub fn mode(&self) -> PaintMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PaintMode) {
        self.mode = mode;
    }

    pub fn brush_radius(&self) -> u32 {
        self.brush_radius
    }

    pub fn set_brush_radius(&mut self, radius: u32) {
        self.brush_radius = radius.max(1);
    }

    pub fn states(&self) -> &StepStates {
        &self.states
    }

    pub fn set_color(&mut self, step: Step, color: Rgb) {
        self.states.get_mut(step).color = color;
        self.dirty = true;
    }

    pub fn set_strength(&mut self, step: Step, strength: f32) {
        self.states.get_mut(step).set_strength(strength);
        self.dirty = true;
    }

    pub fn set_clamp_to_part(&mut self, step: Step, on: bool) {
        self.states.get_mut(step).clamp_to_part = on;
        self.dirty = true;
    }

    /// Paint or erase along a→b on `step`, with that step's brush at the session radius.
    pub fn paint_stroke(&mut self, step: Step, a: Point, b: Point, mode: PaintMode) -> Result<usize, Error> {
        let store = self.store.as_mut().ok_or(Error::ImageNotReady)?;

        let key = (step.config().brush, self.brush_radius);
        if self.stamp.as_ref().map(|(k, _)| *k) != Some(key) {
            self.stamp = None;
        }
        let rng = &mut self.rng;
        let (_, stamp) = self.stamp.get_or_insert_with(|| (key, build_stamp(key.0, key.1, rng)));

        let placed = store.paint_stroke(step, a, b, mode, stamp, self.spacing);
        self.dirty = true;
        Ok(placed)
    }

    /// Stroke on the active step in the current mode.
    pub fn paint_active(&mut self, a: Point, b: Point) -> Result<usize, Error> {
        self.paint_stroke(self.active, a, b, self.mode)
    }

    pub fn clear_step(&mut self, step: Step) -> Result<(), Error> {
        let store = self.store.as_mut().ok_or(Error::ImageNotReady)?;
        store.clear_step(step);
        self.dirty = true;
        Ok(())
    }

    pub fn store(&self) -> Option<&StepPaintStore> {
        self.store.as_ref()
    }

    /// The composited preview; re-rendered only after something changed.
    pub fn frame(&mut self) -> Result<&RasterBuffer, Error> {
        let (Some(photo), Some(store)) = (&self.photo, &self.store) else {
            return Err(Error::ImageNotReady);
        };
        if self.dirty || self.frame.is_none() {
            self.frame = Some(render(photo, &self.order, store, &self.states, self.masks.masks()));
            self.dirty = false;
        }
        self.frame.as_ref().ok_or(Error::ImageNotReady)
    }

    /// Guide outline for the active step, once masks exist.
    pub fn guide_path(&self) -> Option<GuidePath> {
        guide_for_step(self.active, self.masks.masks())
    }

    pub fn export_jpeg(&mut self, path: impl AsRef<Path>, quality: u8) -> Result<(), Error> {
        let frame = self.frame()?;
        export_jpeg(frame, path, quality)
    }
}
