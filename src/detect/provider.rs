// Execution-provider fallback and the init-once detector handle.
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use super::{Detection, DetectorFactory, FaceDetector};
use crate::error::{DetectorError, Error};
use crate::types::RasterBuffer;

/// Acceleration backends, most capable first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionProvider {
    Gpu,
    Shader,
    Cpu,
}

impl ExecutionProvider {
    pub const DEFAULT_ORDER: [ExecutionProvider; 3] =
        [ExecutionProvider::Gpu, ExecutionProvider::Shader, ExecutionProvider::Cpu];

    pub fn name(self) -> &'static str {
        match self {
            Self::Gpu => "gpu",
            Self::Shader => "shader",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecutionProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpu" => Ok(Self::Gpu),
            "shader" => Ok(Self::Shader),
            "cpu" => Ok(Self::Cpu),
            other => Err(Error::Config(format!("unknown execution provider {other:?}"))),
        }
    }
}

/// Try each provider in turn; the first that initializes wins.
/// If none does, the detector is unavailable.
pub fn open_with_fallback(
    factory: &dyn DetectorFactory,
    providers: &[ExecutionProvider],
) -> Result<(Box<dyn FaceDetector>, ExecutionProvider), DetectorError> {
    let mut reasons = Vec::new();
    for &provider in providers {
        match factory.create(provider) {
            Ok(detector) => {
                info!(detector = factory.name(), %provider, "detector initialized");
                return Ok((detector, provider));
            }
            Err(err) => {
                debug!(detector = factory.name(), %provider, error = %err, "provider refused, trying next");
                reasons.push(format!("{provider}: {err}"));
            }
        }
    }
    if reasons.is_empty() {
        reasons.push("no execution providers configured".to_string());
    }
    Err(DetectorError::Unavailable(format!("{} ({})", factory.name(), reasons.join("; "))))
}

enum HandleState {
    Uninit,
    Ready { detector: Box<dyn FaceDetector>, provider: ExecutionProvider },
    Unavailable(String),
}

/// Lazily opened detector with a terminal "unavailable" state.
/// Initialization is attempted exactly once; after it fails every call
/// short-circuits with the same error instead of retrying.
pub struct DetectorHandle {
    factory: Box<dyn DetectorFactory>,
    providers: Vec<ExecutionProvider>,
    state: HandleState,
}

impl DetectorHandle {
    pub fn new(factory: Box<dyn DetectorFactory>, providers: Vec<ExecutionProvider>) -> Self {
        Self { factory, providers, state: HandleState::Uninit }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.state, HandleState::Unavailable(_))
    }

    /// Provider in use once initialized.
    pub fn provider(&self) -> Option<ExecutionProvider> {
        match self.state {
            HandleState::Ready { provider, .. } => Some(provider),
            _ => None,
        }
    }

    pub fn detect(&mut self, photo: &RasterBuffer) -> Result<Detection, DetectorError> {
        if let HandleState::Uninit = self.state {
            self.state = match open_with_fallback(self.factory.as_ref(), &self.providers) {
                Ok((detector, provider)) => HandleState::Ready { detector, provider },
                Err(err) => HandleState::Unavailable(err.to_string()),
            };
        }

        match &mut self.state {
            HandleState::Ready { detector, .. } => {
                let result = detector.detect(photo);
                if let Err(err) = &result {
                    if err.is_unavailable() {
                        self.state = HandleState::Unavailable(err.to_string());
                    }
                }
                result
            }
            HandleState::Unavailable(reason) => Err(DetectorError::Unavailable(reason.clone())),
            HandleState::Uninit => Err(DetectorError::Unavailable("detector not initialized".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ClassMap, StaticDetector};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Refuses every provider except `accept`; counts attempts.
    struct PickyFactory {
        accept: Option<ExecutionProvider>,
        attempts: Arc<AtomicUsize>,
    }

    impl DetectorFactory for PickyFactory {
        fn name(&self) -> &str {
            "picky"
        }

        fn create(&self, provider: ExecutionProvider) -> Result<Box<dyn FaceDetector>, DetectorError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if Some(provider) == self.accept {
                let map = ClassMap::new(1, 1, vec![1])?;
                Ok(Box::new(StaticDetector::new(Detection::ClassMap(map))))
            } else {
                Err(DetectorError::Provider { provider: provider.to_string(), reason: "refused".into() })
            }
        }
    }

    fn picky(accept: Option<ExecutionProvider>) -> (PickyFactory, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        (PickyFactory { accept, attempts: attempts.clone() }, attempts)
    }

    #[test]
    fn falls_back_until_a_provider_initializes() {
        let (factory, attempts) = picky(Some(ExecutionProvider::Cpu));
        let (_, provider) = open_with_fallback(&factory, &ExecutionProvider::DEFAULT_ORDER).unwrap();
        assert_eq!(provider, ExecutionProvider::Cpu);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn stops_at_first_success() {
        let (factory, attempts) = picky(Some(ExecutionProvider::Gpu));
        let (_, provider) = open_with_fallback(&factory, &ExecutionProvider::DEFAULT_ORDER).unwrap();
        assert_eq!(provider, ExecutionProvider::Gpu);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn all_refusals_mean_unavailable() {
        let (factory, _) = picky(None);
        let err = open_with_fallback(&factory, &ExecutionProvider::DEFAULT_ORDER).err().unwrap();
        assert!(matches!(err, DetectorError::Unavailable(ref m) if m.contains("shader")));
        let err = open_with_fallback(&factory, &[]).err().unwrap();
        assert!(err.is_unavailable());
    }

    #[test]
    fn handle_initializes_once_and_never_retries_after_failure() {
        let (factory, attempts) = picky(None);
        let mut handle = DetectorHandle::new(Box::new(factory), ExecutionProvider::DEFAULT_ORDER.to_vec());
        let photo = RasterBuffer::new(2, 2);

        assert!(handle.detect(&photo).unwrap_err().is_unavailable());
        assert!(handle.is_unavailable());
        assert!(handle.detect(&photo).is_err());
        assert!(handle.detect(&photo).is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3, "providers were retried");
    }

    #[test]
    fn handle_reuses_the_ready_detector() {
        let (factory, attempts) = picky(Some(ExecutionProvider::Shader));
        let mut handle = DetectorHandle::new(Box::new(factory), ExecutionProvider::DEFAULT_ORDER.to_vec());
        let photo = RasterBuffer::new(2, 2);
        assert!(handle.detect(&photo).is_ok());
        assert!(handle.detect(&photo).is_ok());
        assert_eq!(handle.provider(), Some(ExecutionProvider::Shader));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn provider_names_parse() {
        assert_eq!("cpu".parse::<ExecutionProvider>().unwrap(), ExecutionProvider::Cpu);
        assert!("npu".parse::<ExecutionProvider>().is_err());
    }
}
