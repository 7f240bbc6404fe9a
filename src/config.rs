// Engine settings, optionally loaded from a TOML file.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::detect::{ExecutionProvider, MaskParams};
use crate::error::Error;
use crate::steps::{Step, StepStates};
use crate::types::Rgb;

/// Everything tunable without recompiling. Missing keys take the defaults below.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Brush radius in pixels.
    pub brush_radius: u32,
    /// Distance between dabs as a fraction of the radius.
    pub stroke_spacing: f32,
    pub feather_px: usize,
    pub face_clip_margin_px: usize,
    /// Width of the translucent band drawn along the guide outline.
    pub guide_band_px: usize,
    /// JPEG quality for exported looks (1..=100).
    pub export_quality: u8,
    /// Execution providers to try, in order.
    pub providers: Vec<String>,
    /// Step name → `#rrggbb` starting color.
    pub colors: BTreeMap<String, String>,
    /// Step name → starting strength in [0, 1].
    pub strengths: BTreeMap<String, f32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            brush_radius: 18,
            stroke_spacing: 0.6,
            feather_px: 1,
            face_clip_margin_px: 6,
            guide_band_px: 12,
            export_quality: 92,
            providers: ExecutionProvider::DEFAULT_ORDER.iter().map(|p| p.name().to_string()).collect(),
            colors: BTreeMap::new(),
            strengths: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate. Step names and colors are checked here so mistakes fail at startup.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let config: EngineConfig = toml::from_str(text)?;
        config.step_states()?;
        config.providers()?;
        Ok(config)
    }

    /// Default step states with the configured overrides applied.
    pub fn step_states(&self) -> Result<StepStates, Error> {
        let mut states = StepStates::default();
        for (name, hex) in &self.colors {
            let step: Step = name.parse()?;
            let color = Rgb::from_hex(hex)
                .ok_or_else(|| Error::Config(format!("color for {name}: {hex:?} is not #rrggbb")))?;
            states.get_mut(step).color = color;
        }
        for (name, &strength) in &self.strengths {
            let step: Step = name.parse()?;
            states.get_mut(step).set_strength(strength);
        }
        Ok(states)
    }

    pub fn providers(&self) -> Result<Vec<ExecutionProvider>, Error> {
        self.providers.iter().map(|p| p.parse()).collect()
    }

    pub fn mask_params(&self) -> MaskParams {
        MaskParams { feather_px: self.feather_px, face_clip_margin_px: self.face_clip_margin_px }
    }
}
