//! Light request types and packed-color arithmetic.
//!
//! A request's color is a packed `u32`: the top byte optionally carries a
//! user brightness preference, the low three bytes are 8-bit red, green and
//! blue. Only the low three bytes, after any pre-scaling, ever reach
//! hardware.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::LightsError;

const RGB_MASK: u32 = 0x00ff_ffff;

/// Extract the 8-bit red, green, blue channels from a packed color.
pub fn rgb_channels(color: u32) -> [u8; 3] {
    [(color >> 16) as u8, (color >> 8) as u8, color as u8]
}

/// A color is lit when any of its low three bytes is nonzero. The top
/// (brightness) byte never counts.
pub fn is_lit(color: u32) -> bool {
    color & RGB_MASK != 0
}

/// Collapse a packed color to one perceptual brightness value, using the
/// standard luma weights scaled to 256.
pub fn luma(color: u32) -> u32 {
    let [r, g, b] = rgb_channels(color);
    (77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b)) >> 8
}

/// Apply the user brightness carried in a color's top byte, if any.
///
/// 0 and 0xFF both mean "no scaling requested" and leave the color
/// untouched. Any other value scales each channel by `brightness / 255`
/// (flooring) and clears the top byte.
pub fn scale_user_brightness(color: u32) -> u32 {
    let brightness = color >> 24;
    if brightness == 0 || brightness == 0xff {
        return color;
    }
    let [r, g, b] = rgb_channels(color).map(|c| u32::from(c) * brightness / 255);
    (r << 16) | (g << 8) | b
}

/// Raw flash-mode codes as submitted by the host across the HAL boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum FlashModeCode {
    None = 0,
    Timed = 1,
    Hardware = 2,
}

/// Flash behavior of a light request.
///
/// Only `Timed` timing is ever encoded into hardware blinking. `Hardware`
/// keeps the submitted timing solely so the attention normalization rule
/// can recognize a malformed request; its timing is never written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flash {
    None,
    Timed { on_ms: u32, off_ms: u32 },
    Hardware { on_ms: u32, off_ms: u32 },
}

/// One logical light source's requested state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    /// Packed color: optional user brightness in the top byte, 8-bit red,
    /// green, blue below it.
    pub color: u32,
    pub flash: Flash,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            color: 0,
            flash: Flash::None,
        }
    }
}

impl LightState {
    /// Build a state from the raw integer triple a C HAL shim receives.
    /// Negative durations are clamped to zero; unknown mode codes are
    /// rejected without touching hardware.
    pub fn from_raw(color: u32, mode: i32, on_ms: i32, off_ms: i32) -> Result<Self, LightsError> {
        let code =
            FlashModeCode::try_from(mode).map_err(|_| LightsError::InvalidFlashMode(mode))?;
        let on_ms = on_ms.max(0) as u32;
        let off_ms = off_ms.max(0) as u32;
        let flash = match code {
            FlashModeCode::None => Flash::None,
            FlashModeCode::Timed => Flash::Timed { on_ms, off_ms },
            FlashModeCode::Hardware => Flash::Hardware { on_ms, off_ms },
        };
        Ok(Self { color, flash })
    }

    pub fn is_lit(&self) -> bool {
        is_lit(self.color)
    }

    /// Blink timing for hardware encoding. Anything but `Timed` is steady.
    pub(crate) fn timing(&self) -> (u32, u32) {
        match self.flash {
            Flash::Timed { on_ms, off_ms } => (on_ms, off_ms),
            _ => (0, 0),
        }
    }
}
