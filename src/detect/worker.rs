// Background detection: the window thread never waits on the detector.
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, warn};

use super::part_masks::{MaskOutcome, MaskParams, MaskStatus, build_part_masks};
use super::provider::DetectorHandle;
use crate::error::Error;
use crate::types::RasterBuffer;

struct MaskRequest {
    token: u64,
    photo: Arc<RasterBuffer>,
}

/// Masks for the photo identified by `token`.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskReply {
    pub token: u64,
    pub outcome: MaskOutcome,
}

/// Owns the detector on its own thread.
/// Requests queue up; only the newest one is processed, older ones are stale anyway.
pub struct MaskWorker {
    requests: Option<Sender<MaskRequest>>,
    replies: Receiver<MaskReply>,
    thread: Option<JoinHandle<()>>,
}

impl MaskWorker {
    pub fn spawn(detector: DetectorHandle, params: MaskParams) -> Result<Self, Error> {
        let (req_tx, req_rx) = unbounded::<MaskRequest>();
        let (reply_tx, reply_rx) = unbounded::<MaskReply>();

        let thread = thread::Builder::new()
            .name("mask-worker".into())
            .spawn(move || run(detector, params, req_rx, reply_tx))?;

        Ok(Self { requests: Some(req_tx), replies: reply_rx, thread: Some(thread) })
    }

    /// Queue detection for a photo. Never blocks.
    pub fn submit(&self, token: u64, photo: Arc<RasterBuffer>) {
        if let Some(tx) = &self.requests {
            if tx.send(MaskRequest { token, photo }).is_err() {
                debug!(token, "mask worker gone, request dropped");
            }
        }
    }

    pub fn try_recv(&self) -> Option<MaskReply> {
        self.replies.try_recv().ok()
    }

    /// Wait up to `timeout` for the next reply.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<MaskReply> {
        match self.replies.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for MaskWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn run(mut detector: DetectorHandle, params: MaskParams, requests: Receiver<MaskRequest>, replies: Sender<MaskReply>) {
    let mut reported_unavailable = false;

    while let Ok(mut req) = requests.recv() {
        // Skip straight to the newest photo.
        for newer in requests.try_iter() {
            debug!(stale = req.token, current = newer.token, "skipping superseded detection request");
            req = newer;
        }

        let outcome = build_part_masks(&req.photo, &mut detector, &params);
        if let MaskStatus::Fallback(err) = &outcome.status {
            if err.is_unavailable() {
                if reported_unavailable {
                    debug!(error = %err, "detector unavailable, fallback masks");
                } else {
                    warn!(error = %err, "face detector unavailable; painting without face clipping");
                    reported_unavailable = true;
                }
            }
        }

        if replies.send(MaskReply { token: req.token, outcome }).is_err() {
            break;
        }
    }
}
