//! Control-file path tables and the sysfs write primitive.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::warn;

/// Root of the kernel's LED class devices.
pub const SYS_LEDS_ROOT: &str = "/sys/class/leds";

/// The write primitive the encoders and arbiter talk to. Implemented by
/// [`SysfsWriter`] for real hardware; tests substitute a recording writer.
pub trait ControlWriter {
    /// Write a payload to a control file as one short write.
    fn write_str(&self, path: &Path, payload: &str) -> io::Result<()>;

    /// Write an integer as ASCII decimal followed by a newline.
    fn write_int(&self, path: &Path, value: u32) -> io::Result<()> {
        self.write_str(path, &format!("{value}\n"))
    }
}

/// Control files for one LED channel.
#[derive(Debug, Clone)]
pub struct ChannelPaths {
    pub brightness: PathBuf,
    pub ramp_step_ms: PathBuf,
    pub duty_pcts: PathBuf,
    pub blink: PathBuf,
    pub pause_lo: PathBuf,
}

impl ChannelPaths {
    fn new(root: &Path, name: &str) -> Self {
        let dir = root.join(name);
        Self {
            brightness: dir.join("brightness"),
            ramp_step_ms: dir.join("ramp_step_ms"),
            duty_pcts: dir.join("duty_pcts"),
            blink: dir.join("blink"),
            pause_lo: dir.join("pause_lo"),
        }
    }
}

/// The full, fixed table of control files this HAL writes.
#[derive(Debug, Clone)]
pub struct LedPaths {
    pub lcd_backlight: PathBuf,
    pub button_backlight: PathBuf,
    /// Tri-color channels, in red, green, blue order.
    pub rgb: [ChannelPaths; 3],
    /// Legacy group blink registers, exposed under the red channel's device.
    pub grpfreq: PathBuf,
    pub grppwm: PathBuf,
    pub legacy_blink: PathBuf,
}

impl LedPaths {
    pub fn new() -> Self {
        Self::with_root(Path::new(SYS_LEDS_ROOT))
    }

    /// Build the table under a different root. For bring-up rigs and tests;
    /// production hardware uses the fixed [`SYS_LEDS_ROOT`] table.
    pub fn with_root(root: &Path) -> Self {
        let device = root.join("red").join("device");
        Self {
            lcd_backlight: root.join("lcd-backlight").join("brightness"),
            button_backlight: root.join("button-backlight").join("brightness"),
            rgb: [
                ChannelPaths::new(root, "red"),
                ChannelPaths::new(root, "green"),
                ChannelPaths::new(root, "blue"),
            ],
            grpfreq: device.join("grpfreq"),
            grppwm: device.join("grppwm"),
            legacy_blink: device.join("blink"),
        }
    }
}

impl Default for LedPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes control files the way the kernel expects: open read-write, one
/// short write, close.
///
/// The first failure to open any given path logs a warning; later failures
/// on that path stay silent, so hardware lacking a control file doesn't
/// flood the log. The error is still returned to the caller on every call.
pub struct SysfsWriter {
    warned: Mutex<HashSet<PathBuf>>,
}

impl SysfsWriter {
    pub fn new() -> Self {
        Self {
            warned: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for SysfsWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlWriter for SysfsWriter {
    fn write_str(&self, path: &Path, payload: &str) -> io::Result<()> {
        let mut file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(err) => {
                let mut warned = self.warned.lock().unwrap_or_else(PoisonError::into_inner);
                if warned.insert(path.to_path_buf()) {
                    warn!("failed to open {}: {err}", path.display());
                }
                return Err(err);
            }
        };
        file.write_all(payload.as_bytes())
    }
}

/// Captures every write instead of touching the filesystem, so tests can
/// assert on exact write sequences.
#[cfg(test)]
pub(crate) struct RecordingWriter {
    writes: Mutex<Vec<(PathBuf, String)>>,
}

#[cfg(test)]
impl RecordingWriter {
    pub(crate) fn new() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Drain the recorded (path, payload) sequence.
    pub(crate) fn take(&self) -> Vec<(PathBuf, String)> {
        std::mem::take(&mut self.writes.lock().unwrap())
    }
}

#[cfg(test)]
impl ControlWriter for RecordingWriter {
    fn write_str(&self, path: &Path, payload: &str) -> io::Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), payload.to_string()));
        Ok(())
    }
}
