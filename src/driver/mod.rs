//! The two kernel LED driver models and the probe that picks between them.

mod legacy;
mod ramp;

use nix::unistd::{AccessFlags, access};

use crate::state::LightState;
use crate::sysfs::{ControlWriter, LedPaths};

/// Which blink interface the kernel exposes for the tri-color LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedDriver {
    /// PMIC register driver: grpfreq/grppwm plus a group blink enable.
    Legacy,
    /// Device-tree driver: per-channel ramp_step_ms/duty_pcts/pause_lo.
    RampDuty,
}

impl LedDriver {
    /// Probe which driver model is present.
    ///
    /// Traditional drivers control blinking via grpfreq/grppwm; device-tree
    /// drivers via ramp_step_ms/duty_pcts. Thus, if the red channel's
    /// duty_pcts is readable, the driver is device-tree based.
    pub fn detect(paths: &LedPaths) -> Self {
        if access(paths.rgb[0].duty_pcts.as_path(), AccessFlags::R_OK).is_ok() {
            LedDriver::RampDuty
        } else {
            LedDriver::Legacy
        }
    }

    /// Encode a state (or `None` for all-off) into control-file writes.
    ///
    /// Each write is attempted regardless of earlier failures; the writer
    /// handles failure logging and the results are otherwise dropped here.
    pub(crate) fn apply(
        self,
        writer: &dyn ControlWriter,
        paths: &LedPaths,
        state: Option<&LightState>,
    ) {
        match self {
            LedDriver::Legacy => legacy::apply(writer, paths, state),
            LedDriver::RampDuty => ramp::apply(writer, paths, state),
        }
    }
}
