//! Face detection boundary.
//!
//! The engine never talks to a concrete model. A [`DetectorFactory`] opens a
//! [`FaceDetector`] on the first execution provider that initializes; the
//! detector answers either with landmark contours or a per-pixel class map,
//! and [`build_part_masks`] turns either answer into a [`PartMaskSet`].
//! Failure anywhere here degrades to [`PartMaskSet::fallback`]; it never
//! reaches painting.

mod class_map;
mod landmarks;
mod part_masks;
mod provider;
mod sources;
mod worker;

pub use class_map::{ClassIds, ClassMap};
pub use landmarks::{FaceLandmarks, LandmarkFile, NormPoint};
pub use part_masks::{MaskOutcome, MaskParams, MaskStatus, PartMaskSet, build_part_masks};
pub use provider::{DetectorHandle, ExecutionProvider, open_with_fallback};
pub use sources::{ClassMapFileFactory, LandmarkFileFactory, NoDetectorFactory, StaticDetector};
pub use worker::{MaskReply, MaskWorker};

use crate::error::DetectorError;
use crate::types::RasterBuffer;

/// What a detector hands back for one photo.
#[derive(Clone, Debug, PartialEq)]
pub enum Detection {
    /// Normalized contour groups.
    Landmarks(FaceLandmarks),
    /// Class id per pixel, at the detector's own resolution.
    ClassMap(ClassMap),
}

/// A ready-to-run face detector.
pub trait FaceDetector: Send {
    fn detect(&mut self, photo: &RasterBuffer) -> Result<Detection, DetectorError>;
}

/// Opens a detector on a given execution provider.
pub trait DetectorFactory: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn create(&self, provider: ExecutionProvider) -> Result<Box<dyn FaceDetector>, DetectorError>;
}
