//! Legacy PMIC blink encoder.
//!
//! Blinking is controlled by three group registers under the red channel's
//! device: a frequency divisor, a PWM on/off ratio, and a blink enable.
//! Channel colors are written before the blink enable, and freq/pwm before
//! the blink enable, so the hardware never samples an enabled blink with
//! stale color or timing.

use crate::state::{LightState, rgb_channels};
use crate::sysfs::{ControlWriter, LedPaths};

// The driver ignores the low 4 bits of grppwm, so ratios below 16 would
// read back as 0.
const PWM_MIN: u32 = 16;

pub(super) fn apply(writer: &dyn ControlWriter, paths: &LedPaths, state: Option<&LightState>) {
    let Some(state) = state else {
        for channel in &paths.rgb {
            let _ = writer.write_int(&channel.brightness, 0);
        }
        let _ = writer.write_int(&paths.legacy_blink, 0);
        return;
    };

    let (on_ms, off_ms) = state.timing();
    let channels = rgb_channels(state.color);
    for (channel, intensity) in paths.rgb.iter().zip(channels) {
        let _ = writer.write_int(&channel.brightness, u32::from(intensity));
    }

    if on_ms > 0 && off_ms > 0 {
        let total = on_ms + off_ms;
        // the LED blinks about once per second when freq is 20: 1000ms / 20 = 50
        let freq = total / 50;
        // pwm is the on/off ratio: 0 always off, 255 always on
        let mut pwm = on_ms * 255 / total;
        if pwm > 0 && pwm < PWM_MIN {
            pwm = PWM_MIN;
        }
        let _ = writer.write_int(&paths.grpfreq, freq);
        let _ = writer.write_int(&paths.grppwm, pwm);
        let _ = writer.write_int(&paths.legacy_blink, 1);
    } else {
        // never leave a stale blink enable behind
        let _ = writer.write_int(&paths.legacy_blink, 0);
    }
}
