// The fixed cosmetic sequence and each step's look.
// Visual: layers are stacked bottom → top in `Step::ORDER`, primer first, lips last.
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::Rgb;

/// One application stage. The set is closed; its order is `Step::ORDER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    Primer,
    Foundation,
    Concealer,
    Powder,
    Contour,
    Highlight,
    Brows,
    Shadow,
    Lips,
}

impl Step {
    pub const COUNT: usize = 9;

    /// Compositing order, bottom layer first.
    pub const ORDER: [Step; Step::COUNT] = [
        Step::Primer,
        Step::Foundation,
        Step::Concealer,
        Step::Powder,
        Step::Contour,
        Step::Highlight,
        Step::Brows,
        Step::Shadow,
        Step::Lips,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Position in `ORDER`; out-of-range indices are a caller bug.
    pub fn from_index(index: usize) -> Result<Step, Error> {
        Step::ORDER
            .get(index)
            .copied()
            .ok_or_else(|| Error::InvalidStepReference(format!("#{index}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::Primer => "primer",
            Step::Foundation => "foundation",
            Step::Concealer => "concealer",
            Step::Powder => "powder",
            Step::Contour => "contour",
            Step::Highlight => "highlight",
            Step::Brows => "brows",
            Step::Shadow => "shadow",
            Step::Lips => "lips",
        }
    }

    pub fn config(self) -> &'static StepConfig {
        &STEP_CONFIG[self.index()]
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ORDER
            .iter()
            .copied()
            .find(|step| step.name() == s)
            .ok_or_else(|| Error::InvalidStepReference(s.to_string()))
    }
}

/// How a step's tinted layer combines with what is already on the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    SoftLight,
}

impl BlendMode {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Multiply => "Multiply",
            Self::Screen => "Screen",
            Self::Overlay => "Overlay",
            Self::SoftLight => "Soft Light",
        }
    }
}

/// Stamp texture family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BrushKind {
    Soft,
    Powder,
    Cream,
    Gloss,
}

/// Detected facial region a step is guided toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Part {
    Skin,
    Lips,
    Brows,
    Eyes,
}

/// Immutable defaults for a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepConfig {
    pub label: &'static str,
    pub blend: BlendMode,
    pub default_strength: f32, // 0..1
    pub brush: BrushKind,
    pub default_color: Rgb,
    pub part: Part,
}

pub static STEP_CONFIG: [StepConfig; Step::COUNT] = [
    StepConfig {
        label: "Primer",
        blend: BlendMode::SoftLight,
        default_strength: 0.35,
        brush: BrushKind::Cream,
        default_color: Rgb::new(0xff, 0xff, 0xff),
        part: Part::Skin,
    },
    StepConfig {
        label: "Foundation (BB)",
        blend: BlendMode::Multiply,
        default_strength: 0.5,
        brush: BrushKind::Cream,
        default_color: Rgb::new(0xe7, 0xc7, 0xa5),
        part: Part::Skin,
    },
    StepConfig {
        label: "Concealer",
        blend: BlendMode::Normal,
        default_strength: 0.75,
        brush: BrushKind::Cream,
        default_color: Rgb::new(0xf2, 0xd7, 0xb6),
        part: Part::Skin,
    },
    StepConfig {
        label: "Powder",
        blend: BlendMode::Overlay,
        default_strength: 0.25,
        brush: BrushKind::Powder,
        default_color: Rgb::new(0xf5, 0xe8, 0xdb),
        part: Part::Skin,
    },
    StepConfig {
        label: "Contour",
        blend: BlendMode::Multiply,
        default_strength: 0.3,
        brush: BrushKind::Powder,
        default_color: Rgb::new(0x7a, 0x5b, 0x3b),
        part: Part::Skin,
    },
    StepConfig {
        label: "Highlight / Blush",
        blend: BlendMode::Screen,
        default_strength: 0.35,
        brush: BrushKind::Soft,
        default_color: Rgb::new(0xff, 0xd7, 0xdf),
        part: Part::Skin,
    },
    StepConfig {
        label: "Brows",
        blend: BlendMode::Multiply,
        default_strength: 0.65,
        brush: BrushKind::Powder,
        default_color: Rgb::new(0x3f, 0x35, 0x2f),
        part: Part::Brows,
    },
    StepConfig {
        label: "Eyeshadow",
        blend: BlendMode::Multiply,
        default_strength: 0.45,
        brush: BrushKind::Soft,
        default_color: Rgb::new(0x6a, 0x60, 0x79),
        part: Part::Eyes,
    },
    StepConfig {
        label: "Lips",
        blend: BlendMode::Overlay,
        default_strength: 0.55,
        brush: BrushKind::Gloss,
        default_color: Rgb::new(0xc8, 0x4a, 0x58),
        part: Part::Lips,
    },
];

/// Mutable per-session settings of one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepState {
    pub color: Rgb,
    strength: f32,
    /// Restrict the layer to its detected part stencil (off for freeform painting).
    pub clamp_to_part: bool,
}

impl StepState {
    pub fn from_config(config: &StepConfig) -> Self {
        Self { color: config.default_color, strength: config.default_strength, clamp_to_part: false }
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Always stored inside [0, 1]; NaN counts as 0.
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };
    }
}

/// Session state for every step, indexed by `Step`.
#[derive(Clone, Debug, PartialEq)]
pub struct StepStates {
    states: [StepState; Step::COUNT],
}

impl Default for StepStates {
    fn default() -> Self {
        Self { states: std::array::from_fn(|i| StepState::from_config(&STEP_CONFIG[i])) }
    }
}

impl StepStates {
    pub fn get(&self, step: Step) -> &StepState {
        &self.states[step.index()]
    }

    pub fn get_mut(&mut self, step: Step) -> &mut StepState {
        &mut self.states[step.index()]
    }

    pub fn set_all_strengths(&mut self, strength: f32) {
        for state in &mut self.states {
            state.set_strength(strength);
        }
    }
}
