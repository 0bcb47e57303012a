//! Arbitration between the three logical LED sources, plus the LCD and
//! button backlights.
//!
//! Battery, notification and attention requests all land on the same
//! physical tri-color LED. Every update stores its request in a slot and
//! re-derives the winning output under one mutex, so callers on different
//! host threads are serialized and the LED never shows a half-applied
//! update. Backlight writes share the same mutex: at most one control-file
//! write sequence is in flight at any time.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::LightsError;
use crate::driver::LedDriver;
use crate::state::{Flash, LightState, luma, scale_user_brightness};
use crate::sysfs::{ControlWriter, LedPaths, SysfsWriter};

/// The three competing sources for the tri-color LED.
#[derive(Default)]
struct Slots {
    battery: LightState,
    notifications: LightState,
    attention: LightState,
}

impl Slots {
    /// Priority: attention over notifications over battery. Battery is
    /// applied even when unlit; its color 0 just leaves the LED off.
    fn winner(&self) -> &LightState {
        if self.attention.is_lit() {
            &self.attention
        } else if self.notifications.is_lit() {
            &self.notifications
        } else {
            &self.battery
        }
    }
}

/// Normalize an attention request before storing it.
///
/// A hardware-blink request with an on time but no off time is malformed
/// and degrades to no flash; a request without flash is the host's
/// "clear attention" signal and drops its color. The two rules compose, so
/// applying this twice yields the same state as applying it once.
fn normalize_attention(state: LightState) -> LightState {
    let mut state = state;
    if let Flash::Hardware { on_ms, off_ms } = state.flash {
        if on_ms > 0 && off_ms == 0 {
            state.flash = Flash::None;
        }
    }
    if matches!(state.flash, Flash::None) {
        state.color = 0;
    }
    state
}

/// The lights device. Constructed once at startup and shared between the
/// host's threads.
pub struct Lights<W = SysfsWriter> {
    slots: Mutex<Slots>,
    driver: OnceLock<LedDriver>,
    writer: W,
    paths: LedPaths,
}

impl Lights<SysfsWriter> {
    /// A device over the real sysfs control files.
    pub fn new() -> Self {
        Self::with_writer(SysfsWriter::new(), LedPaths::new())
    }
}

impl Default for Lights<SysfsWriter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: ControlWriter> Lights<W> {
    /// A device over an explicit writer and path table.
    pub fn with_writer(writer: W, paths: LedPaths) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            driver: OnceLock::new(),
            writer,
            paths,
        }
    }

    /// The driver model, probed on first use and cached for the device's
    /// lifetime. Never re-probed, even if the probed file later appears or
    /// disappears.
    pub fn driver(&self) -> LedDriver {
        *self.driver.get_or_init(|| LedDriver::detect(&self.paths))
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the LED, then re-apply whichever source currently wins. The
    /// explicit clear is what stops a stale color or blink from surviving
    /// a priority change.
    fn refresh(&self, slots: &Slots) {
        let driver = self.driver();
        driver.apply(&self.writer, &self.paths, None);
        driver.apply(&self.writer, &self.paths, Some(slots.winner()));
    }

    pub fn set_battery(&self, state: LightState) {
        let mut slots = self.lock();
        slots.battery = state;
        self.refresh(&slots);
    }

    /// Store a notification request, first applying any user brightness
    /// carried in the color's top byte.
    pub fn set_notifications(&self, state: LightState) {
        let mut slots = self.lock();
        slots.notifications = LightState {
            color: scale_user_brightness(state.color),
            ..state
        };
        self.refresh(&slots);
    }

    pub fn set_attention(&self, state: LightState) {
        let mut slots = self.lock();
        slots.attention = normalize_attention(state);
        self.refresh(&slots);
    }

    /// Drive the LCD backlight from the request's perceptual brightness.
    pub fn set_backlight(&self, state: &LightState) -> Result<(), LightsError> {
        self.write_luma(&self.paths.lcd_backlight, state)
    }

    /// Drive the button backlight from the request's perceptual brightness.
    pub fn set_buttons(&self, state: &LightState) -> Result<(), LightsError> {
        self.write_luma(&self.paths.button_backlight, state)
    }

    fn write_luma(&self, path: &Path, state: &LightState) -> Result<(), LightsError> {
        let brightness = luma(state.color);
        let _slots = self.lock();
        self.writer
            .write_int(path, brightness)
            .map_err(|source| LightsError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &W {
        &self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::RecordingWriter;

    fn steady(color: u32) -> LightState {
        LightState {
            color,
            flash: Flash::None,
        }
    }

    fn blinking(color: u32, on_ms: u32, off_ms: u32) -> LightState {
        LightState {
            color,
            flash: Flash::Timed { on_ms, off_ms },
        }
    }

    /// A device with a recording writer over a root that has no duty_pcts,
    /// so the legacy driver is detected.
    fn legacy_lights() -> Lights<RecordingWriter> {
        let root = std::path::Path::new("/nonexistent/leds");
        Lights::with_writer(RecordingWriter::new(), LedPaths::with_root(root))
    }

    fn last_write(writes: &[(std::path::PathBuf, String)], suffix: &str) -> Option<String> {
        writes
            .iter()
            .rev()
            .find(|(path, _)| path.to_string_lossy().ends_with(suffix))
            .map(|(_, payload)| payload.clone())
    }

    #[test]
    fn test_battery_alone_drives_led() {
        let lights = legacy_lights();
        lights.set_battery(steady(0x00ff0000));
        let writes = lights.writer().take();
        assert_eq!(last_write(&writes, "red/brightness").unwrap(), "255\n");
        assert_eq!(last_write(&writes, "green/brightness").unwrap(), "0\n");
    }

    #[test]
    fn test_notification_outranks_battery() {
        let lights = legacy_lights();
        lights.set_battery(steady(0x00ff0000));
        lights.set_notifications(steady(0x0000ff00));
        let writes = lights.writer().take();
        assert_eq!(last_write(&writes, "red/brightness").unwrap(), "0\n");
        assert_eq!(last_write(&writes, "green/brightness").unwrap(), "255\n");
    }

    #[test]
    fn test_attention_outranks_all() {
        let lights = legacy_lights();
        lights.set_battery(steady(0x00ff0000));
        lights.set_notifications(steady(0x0000ff00));
        lights.set_attention(steady(0x000000ff));
        let writes = lights.writer().take();
        assert_eq!(last_write(&writes, "red/brightness").unwrap(), "0\n");
        assert_eq!(last_write(&writes, "green/brightness").unwrap(), "0\n");
        assert_eq!(last_write(&writes, "blue/brightness").unwrap(), "255\n");
    }

    #[test]
    fn test_unlit_notification_falls_back_to_battery() {
        let lights = legacy_lights();
        lights.set_battery(steady(0x00ff0000));
        lights.set_notifications(steady(0));
        let writes = lights.writer().take();
        assert_eq!(last_write(&writes, "red/brightness").unwrap(), "255\n");
    }

    #[test]
    fn test_notification_brightness_prescaled() {
        let lights = legacy_lights();
        lights.set_notifications(steady(0x80ff8040));
        let writes = lights.writer().take();
        assert_eq!(last_write(&writes, "red/brightness").unwrap(), "128\n");
        assert_eq!(last_write(&writes, "green/brightness").unwrap(), "64\n");
        assert_eq!(last_write(&writes, "blue/brightness").unwrap(), "32\n");
    }

    #[test]
    fn test_clear_then_set_restores_battery_without_blink() {
        let lights = legacy_lights();
        lights.set_battery(steady(0x00ff0000));
        lights.set_attention(blinking(0x0000ff00, 500, 500));
        let writes = lights.writer().take();
        assert_eq!(last_write(&writes, "device/blink").unwrap(), "1\n");

        lights.set_attention(steady(0));
        let writes = lights.writer().take();
        // the clear pass zeroes everything before battery is re-applied
        let first_red = writes
            .iter()
            .position(|(path, _)| path.to_string_lossy().ends_with("red/brightness"))
            .unwrap();
        assert_eq!(writes[first_red].1, "0\n");
        assert_eq!(last_write(&writes, "red/brightness").unwrap(), "255\n");
        assert_eq!(last_write(&writes, "device/blink").unwrap(), "0\n");
    }

    #[test]
    fn test_attention_clear_signal_drops_color() {
        let lights = legacy_lights();
        lights.set_attention(LightState {
            color: 0x00ffffff,
            flash: Flash::None,
        });
        let writes = lights.writer().take();
        assert_eq!(last_write(&writes, "red/brightness").unwrap(), "0\n");
        assert_eq!(last_write(&writes, "blue/brightness").unwrap(), "0\n");
    }

    #[test]
    fn test_normalize_malformed_hardware_blink() {
        let malformed = LightState {
            color: 0x00ff0000,
            flash: Flash::Hardware {
                on_ms: 100,
                off_ms: 0,
            },
        };
        let normalized = normalize_attention(malformed);
        assert_eq!(normalized.flash, Flash::None);
        assert_eq!(normalized.color, 0);
    }

    #[test]
    fn test_normalize_keeps_valid_requests() {
        let valid = blinking(0x00ff0000, 500, 500);
        assert_eq!(normalize_attention(valid), valid);

        let hardware = LightState {
            color: 0x00ff0000,
            flash: Flash::Hardware {
                on_ms: 500,
                off_ms: 500,
            },
        };
        assert_eq!(normalize_attention(hardware), hardware);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let states = [
            steady(0x00ff0000),
            steady(0),
            blinking(0x0000ff00, 250, 250),
            LightState {
                color: 0x00ff0000,
                flash: Flash::Hardware {
                    on_ms: 100,
                    off_ms: 0,
                },
            },
            LightState {
                color: 0x00ff0000,
                flash: Flash::Hardware {
                    on_ms: 0,
                    off_ms: 0,
                },
            },
        ];
        for state in states {
            let once = normalize_attention(state);
            assert_eq!(normalize_attention(once), once, "not idempotent: {state:?}");
        }
    }

    #[test]
    fn test_backlight_writes_luma() {
        let lights = legacy_lights();
        lights.set_backlight(&steady(0x00ffffff)).unwrap();
        lights.set_buttons(&steady(0x00ff0000)).unwrap();
        let writes = lights.writer().take();
        assert_eq!(
            last_write(&writes, "lcd-backlight/brightness").unwrap(),
            "255\n"
        );
        assert_eq!(
            last_write(&writes, "button-backlight/brightness").unwrap(),
            "76\n"
        );
    }

    #[test]
    fn test_backlight_does_not_touch_led_slots() {
        let lights = legacy_lights();
        lights.set_battery(steady(0x00ff0000));
        lights.writer().take();
        lights.set_backlight(&steady(0)).unwrap();
        let writes = lights.writer().take();
        assert_eq!(writes.len(), 1);
        assert!(
            writes[0]
                .0
                .to_string_lossy()
                .ends_with("lcd-backlight/brightness")
        );
    }

    #[test]
    fn test_driver_detection_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LedPaths::with_root(dir.path());
        std::fs::create_dir_all(dir.path().join("red")).unwrap();
        std::fs::write(&paths.rgb[0].duty_pcts, "").unwrap();

        let lights = Lights::with_writer(RecordingWriter::new(), paths.clone());
        assert_eq!(lights.driver(), LedDriver::RampDuty);

        // the probe result must stay stable even if the file disappears
        std::fs::remove_file(&paths.rgb[0].duty_pcts).unwrap();
        assert_eq!(lights.driver(), LedDriver::RampDuty);

        lights.set_battery(steady(0x00ff0000));
        let writes = lights.writer().take();
        assert_eq!(last_write(&writes, "red/brightness").unwrap(), "255\n");
        // ramp-duty clear path was used, not the legacy group blink
        assert!(last_write(&writes, "red/blink").is_some());
        assert!(last_write(&writes, "device/blink").is_none());
    }
}
