// Concrete detector sources: precomputed answers read from disk, fixed answers for
// tests, and the "no detector at all" mode.
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::class_map::ClassMap;
use super::landmarks::LandmarkFile;
use super::{Detection, DetectorFactory, ExecutionProvider, FaceDetector};
use crate::error::DetectorError;
use crate::types::RasterBuffer;

/// Answers every photo with the same detection.
#[derive(Clone, Debug)]
pub struct StaticDetector {
    detection: Detection,
}

impl StaticDetector {
    pub fn new(detection: Detection) -> Self {
        Self { detection }
    }
}

impl FaceDetector for StaticDetector {
    fn detect(&mut self, _photo: &RasterBuffer) -> Result<Detection, DetectorError> {
        Ok(self.detection.clone())
    }
}

/// No detector configured. Always unavailable; the session runs on fallback masks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDetectorFactory;

impl DetectorFactory for NoDetectorFactory {
    fn name(&self) -> &str {
        "none"
    }

    fn create(&self, _provider: ExecutionProvider) -> Result<Box<dyn FaceDetector>, DetectorError> {
        Err(DetectorError::Unavailable("no detector configured".into()))
    }
}

// File sources run on the CPU only.
fn require_cpu(provider: ExecutionProvider) -> Result<(), DetectorError> {
    match provider {
        ExecutionProvider::Cpu => Ok(()),
        other => Err(DetectorError::Provider { provider: other.to_string(), reason: "file source runs on cpu".into() }),
    }
}

/// Landmarks exported by an external face-mesh run, as JSON
/// (named contour groups or `{"mesh": [[x, y], ...]}`).
#[derive(Clone, Debug)]
pub struct LandmarkFileFactory {
    pub path: PathBuf,
}

impl LandmarkFileFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DetectorFactory for LandmarkFileFactory {
    fn name(&self) -> &str {
        "landmark-file"
    }

    fn create(&self, provider: ExecutionProvider) -> Result<Box<dyn FaceDetector>, DetectorError> {
        require_cpu(provider)?;
        let text = fs::read_to_string(&self.path)
            .map_err(|e| DetectorError::Unavailable(format!("{}: {e}", self.path.display())))?;
        let file: LandmarkFile = serde_json::from_str(&text)
            .map_err(|e| DetectorError::Unavailable(format!("{}: {e}", self.path.display())))?;
        let landmarks = file.into_landmarks()?;
        debug!(path = %self.path.display(), oval = landmarks.face_oval.len(), "loaded landmarks");
        Ok(Box::new(StaticDetector::new(Detection::Landmarks(landmarks))))
    }
}

/// Face-parsing output saved as an 8-bit grayscale PNG whose gray level is the class id.
#[derive(Clone, Debug)]
pub struct ClassMapFileFactory {
    pub path: PathBuf,
}

impl ClassMapFileFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DetectorFactory for ClassMapFileFactory {
    fn name(&self) -> &str {
        "class-map-file"
    }

    fn create(&self, provider: ExecutionProvider) -> Result<Box<dyn FaceDetector>, DetectorError> {
        require_cpu(provider)?;
        let img = image::open(&self.path)
            .map_err(|e| DetectorError::Unavailable(format!("{}: {e}", self.path.display())))?
            .to_luma8();
        let (w, h) = img.dimensions();
        let map = ClassMap::new(w as usize, h as usize, img.into_raw())?;
        debug!(path = %self.path.display(), width = w, height = h, "loaded class map");
        Ok(Box::new(StaticDetector::new(Detection::ClassMap(map))))
    }
}
