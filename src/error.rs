// Error taxonomy for the engine and the practice window.
// Only the detector boundary and the outer shell (files, window, camera) are fallible;
// raster and stencil math never returns an error.
use thiserror::Error;

/// Crate-wide error. Every variant states *where* things went wrong.
#[derive(Debug, Error)]
pub enum Error {
    /// The face detector could not initialize on any backend.
    #[error("face detector unavailable: {0}")]
    DetectorUnavailable(String),

    /// The detector ran but found no usable face in this photo.
    #[error("face detection failed: {0}")]
    DetectionFailed(String),

    /// A paint/render request arrived before a photo was loaded.
    #[error("image not ready")]
    ImageNotReady,

    /// A step name outside the fixed cosmetic sequence.
    #[error("invalid step reference: {0:?}")]
    InvalidStepReference(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("image decode error: {0}")]
    ImageDecode(String),

    #[error("image export error: {0}")]
    ImageExport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),

    #[error("camera init error: {0}")]
    CameraInit(String),

    #[error("camera frame error: {0}")]
    CameraFrame(String),
}

/// Errors at the detector boundary. Never fatal to painting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    /// Nothing to run: model missing, every provider refused, or a previous attempt failed.
    #[error("detector unavailable: {0}")]
    Unavailable(String),

    /// One execution provider refused to initialize.
    #[error("provider {provider} failed: {reason}")]
    Provider { provider: String, reason: String },

    #[error("no face found")]
    NoFace,

    /// The detector answered with something the mask builder cannot use.
    #[error("malformed detector output: {0}")]
    MalformedOutput(String),
}

impl DetectorError {
    /// Unavailable-class errors put the session into fallback mode for good.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DetectorError::Unavailable(_) | DetectorError::Provider { .. })
    }
}

impl From<DetectorError> for Error {
    fn from(err: DetectorError) -> Self {
        match err {
            DetectorError::Unavailable(_) | DetectorError::Provider { .. } => {
                Error::DetectorUnavailable(err.to_string())
            }
            DetectorError::NoFace | DetectorError::MalformedOutput(_) => {
                Error::DetectionFailed(err.to_string())
            }
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}
