//! Device-tree blink encoder.
//!
//! Each channel blinks independently via ramp_step_ms, a duty-cycle
//! waveform, and a low-pause duration. The waveform ramps brightness up
//! and back down, so timed blinking renders as a smooth fade instead of a
//! hard on/off. Blink enables are written last, after every parameter is
//! staged, so the hardware starts blinking only once fully configured.

use crate::state::{LightState, rgb_channels};
use crate::sysfs::{ControlWriter, LedPaths};

/// Number of points in the duty waveform.
const DUTY_STEPS: u32 = 21;

pub(super) fn apply(writer: &dyn ControlWriter, paths: &LedPaths, state: Option<&LightState>) {
    let Some(state) = state else {
        for channel in &paths.rgb {
            let _ = writer.write_int(&channel.blink, 0);
        }
        for channel in &paths.rgb {
            let _ = writer.write_int(&channel.brightness, 0);
        }
        return;
    };

    let (on_ms, off_ms) = state.timing();
    let channels = rgb_channels(state.color);

    if on_ms > 0 && off_ms > 0 {
        let step_ms = on_ms / DUTY_STEPS;

        for channel in &paths.rgb {
            let _ = writer.write_int(&channel.blink, 0);
        }
        for channel in &paths.rgb {
            let _ = writer.write_int(&channel.pause_lo, off_ms);
        }
        for channel in &paths.rgb {
            let _ = writer.write_int(&channel.ramp_step_ms, step_ms);
        }
        for (channel, intensity) in paths.rgb.iter().zip(channels) {
            let _ = writer.write_str(&channel.duty_pcts, &duty_waveform(intensity));
        }
        for channel in &paths.rgb {
            let _ = writer.write_int(&channel.blink, 1);
        }
    } else {
        for (channel, intensity) in paths.rgb.iter().zip(channels) {
            let _ = writer.write_int(&channel.brightness, u32::from(intensity));
        }
    }
}

/// Build the fixed 21-point duty waveform for one channel intensity:
/// a literal leading 0, ten points ramping up toward the channel's
/// percentage, and ten ramping back down. Comma-joined, newline-terminated.
fn duty_waveform(intensity: u8) -> String {
    let scale = f32::from(intensity) / 255.0;
    let half = DUTY_STEPS / 2;
    let step = 100 / half;

    let mut points = Vec::with_capacity(DUTY_STEPS as usize);
    points.push(0u32);
    for i in 0..half {
        points.push(((i * step) as f32 * scale) as u32);
    }
    for i in 0..half {
        points.push(((100 - i * step) as f32 * scale) as u32);
    }

    let mut out = points
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');
    out
}
