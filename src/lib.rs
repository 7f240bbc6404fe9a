//! Layered cosmetic compositing on a still photo.
//!
//! Each step of a makeup routine (primer through lips) owns an alpha mask the user
//! paints with a textured brush. [`compositor::render`] tints every mask with the
//! step's color, clips it to the detected face and blends it onto the photo with the
//! step's blend mode and strength. Face detection sits behind the [`detect`] traits
//! and always degrades to whole-canvas masks instead of failing.

pub mod blend;
pub mod brush;
pub mod compositor;
pub mod config;
pub mod detect;
pub mod error;
pub mod guide;
pub mod io;
pub mod paint;
pub mod session;
pub mod stencil;
pub mod steps;
pub mod types;

pub use config::EngineConfig;
pub use error::{DetectorError, Error};
pub use paint::{PaintMode, StepPaintStore};
pub use session::{MakeupSession, MaskState};
pub use steps::{BlendMode, BrushKind, Part, Step, StepConfig, StepState, StepStates};
pub use types::{AlphaStencil, BrushStamp, Point, RasterBuffer, Rgb};
