//! Hardware abstraction layer for a handset's indicator LED and backlights.
//!
//! Three logical sources (battery, notifications, attention) compete for
//! one physical tri-color LED. [`Lights`] arbitrates between them and
//! encodes the winning color and blink pattern for whichever kernel LED
//! driver the device carries, probed once at startup. The LCD and button
//! backlights are driven directly, with no arbitration.

use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod arbiter;
pub mod driver;
pub mod state;
pub mod sysfs;

pub use arbiter::Lights;
pub use driver::LedDriver;
pub use state::{Flash, FlashModeCode, LightState};
pub use sysfs::{ControlWriter, LedPaths, SysfsWriter};

/// Initialize logging with the given default level. Respects `RUST_LOG`
/// overrides.
pub fn init_logging(default_level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

/// Errors surfaced by the lights HAL.
#[derive(Debug, Error)]
pub enum LightsError {
    /// The host asked for a light this module doesn't expose.
    #[error("unknown light id {0:?}")]
    UnknownLight(String),
    /// A raw flash-mode code from the host was out of range.
    #[error("invalid flash mode code {0}")]
    InvalidFlashMode(i32),
    /// A control-file write failed.
    #[error("writing {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

impl LightsError {
    /// The errno a C shim should report for this error.
    pub fn errno(&self) -> i32 {
        match self {
            LightsError::UnknownLight(_) | LightsError::InvalidFlashMode(_) => libc::EINVAL,
            LightsError::Write { source, .. } => source.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

/// The logical lights this module exposes, by protocol name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightId {
    Backlight,
    Buttons,
    Notifications,
    Attention,
    Battery,
}

impl LightId {
    pub const ALL: [LightId; 5] = [
        LightId::Backlight,
        LightId::Buttons,
        LightId::Notifications,
        LightId::Attention,
        LightId::Battery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LightId::Backlight => "backlight",
            LightId::Buttons => "buttons",
            LightId::Notifications => "notifications",
            LightId::Attention => "attention",
            LightId::Battery => "battery",
        }
    }
}

impl std::fmt::Display for LightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LightId {
    type Err = LightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlight" => Ok(LightId::Backlight),
            "buttons" => Ok(LightId::Buttons),
            "notifications" => Ok(LightId::Notifications),
            "attention" => Ok(LightId::Attention),
            "battery" => Ok(LightId::Battery),
            _ => Err(LightsError::UnknownLight(s.to_string())),
        }
    }
}

/// A handle to one logical light, resolved by [`Lights::open`].
pub struct Light<'a, W = SysfsWriter> {
    lights: &'a Lights<W>,
    id: LightId,
}

impl<W> std::fmt::Debug for Light<'_, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Light").field("id", &self.id).finish()
    }
}

impl<W: ControlWriter> Lights<W> {
    /// Resolve a light by its protocol name. Unknown names fail with
    /// [`LightsError::UnknownLight`] without touching hardware.
    pub fn open(&self, name: &str) -> Result<Light<'_, W>, LightsError> {
        Ok(Light {
            lights: self,
            id: name.parse()?,
        })
    }
}

impl<W: ControlWriter> Light<'_, W> {
    pub fn id(&self) -> LightId {
        self.id
    }

    /// Apply a state to this light.
    ///
    /// Backlight and button updates report their write result; the LED
    /// sources are best-effort, with failures logged by the writer and
    /// swallowed here.
    pub fn set(&self, state: &LightState) -> Result<(), LightsError> {
        match self.id {
            LightId::Backlight => self.lights.set_backlight(state),
            LightId::Buttons => self.lights.set_buttons(state),
            LightId::Notifications => {
                self.lights.set_notifications(*state);
                Ok(())
            }
            LightId::Attention => {
                self.lights.set_attention(*state);
                Ok(())
            }
            LightId::Battery => {
                self.lights.set_battery(*state);
                Ok(())
            }
        }
    }
}
