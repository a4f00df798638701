//! Rig configuration.
//!
//! Handles loading, validating, and merging the rig's TOML config file. The
//! stock defaults describe the reference rig (Jetson camera, servo controller
//! on `/dev/ttyUSB0`, capture drive mounted at `/media/vt360/VT360_DRIVE`);
//! a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! base_dir = "/media/vt360/VT360_DRIVE"  # Where session folders are created
//! prefix = "Image_set"                   # Session folders are <prefix>_<id>
//!
//! [serial]
//! device = "/dev/ttyUSB0"
//! baud_rate = 9600
//! timeout_ms = 1000
//!
//! [home]
//! horizontal = 15           # Rest position, sent at scan start and end
//! vertical = 90
//!
//! [timing]
//! move_settle_ms = 2000     # Wait after every position command
//! exposure_settle_ms = 700  # Wait after warm-up grabs, before the kept grab
//! warmup_frames = 5         # Grabs discarded after every move
//!
//! [camera]
//! program = "gst-launch-1.0"
//! args = [...]              # Pipeline streaming JPEGs to stdout
//! jpeg_quality = 95
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::ScanPosition;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Rig configuration loaded from a TOML file.
///
/// All fields have defaults matching the reference rig. Unknown keys are
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RigConfig {
    /// Where and how session folders are created.
    pub storage: StorageConfig,
    /// Serial link to the pan/tilt controller.
    pub serial: SerialConfig,
    /// Rest position of the rig.
    pub home: HomeConfig,
    /// Open-loop settle timings.
    pub timing: TimingConfig,
    /// Frame source and encoding.
    pub camera: CameraConfig,
}

impl RigConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.prefix.is_empty() {
            return Err(ConfigError::Validation(
                "storage.prefix must not be empty".into(),
            ));
        }
        if self.storage.prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "storage.prefix must not contain path separators".into(),
            ));
        }
        if self.serial.device.is_empty() {
            return Err(ConfigError::Validation(
                "serial.device must not be empty".into(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation(
                "serial.baud_rate must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Validation(
                "camera.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.camera.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "camera.program must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Session folder placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding all session folders. Must already exist.
    pub base_dir: PathBuf,
    /// Session folder prefix; folders are named `<prefix>_<id>`.
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/media/vt360/VT360_DRIVE"),
            prefix: "Image_set".to_string(),
        }
    }
}

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
    /// Write timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            timeout_ms: 1000,
        }
    }
}

/// Rest position the rig returns to before and after every scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HomeConfig {
    pub horizontal: i64,
    pub vertical: i64,
}

impl HomeConfig {
    pub fn position(&self) -> ScanPosition {
        ScanPosition::new(self.horizontal, self.vertical)
    }
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            horizontal: 15,
            vertical: 90,
        }
    }
}

/// Open-loop timing contract between the rig, the camera and the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Wait after every position command, home moves included.
    pub move_settle_ms: u64,
    /// Wait between the warm-up grabs and the grab that is kept.
    pub exposure_settle_ms: u64,
    /// Grabs discarded after each move so auto-exposure can converge.
    pub warmup_frames: u32,
}

impl TimingConfig {
    pub fn move_settle(&self) -> Duration {
        Duration::from_millis(self.move_settle_ms)
    }

    pub fn exposure_settle(&self) -> Duration {
        Duration::from_millis(self.exposure_settle_ms)
    }

    /// All waits zeroed, for driving mocks in tests.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            move_settle_ms: 0,
            exposure_settle_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            move_settle_ms: 2000,
            exposure_settle_ms: 700,
            warmup_frames: 5,
        }
    }
}

/// Frame source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Capture program, looked up on `PATH` unless it contains a `/`.
    pub program: String,
    /// Arguments; the program must stream JPEG images back to back on stdout
    /// until it is killed.
    pub args: Vec<String>,
    /// JPEG quality for persisted frames (1-100).
    pub jpeg_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            program: "gst-launch-1.0".to_string(),
            args: default_capture_args(),
            jpeg_quality: 95,
        }
    }
}

/// Streaming pipeline for the Jetson CSI camera: 1280x720 sensor mode,
/// flipped and scaled to 640x480, JPEG-encoded to stdout. The leaky queue
/// drops frames while nobody reads, so a grab never sees a stale backlog.
fn default_capture_args() -> Vec<String> {
    [
        "-q",
        "nvarguscamerasrc",
        "!",
        "video/x-raw(memory:NVMM),width=1280,height=720,format=NV12,framerate=60/1",
        "!",
        "nvvidconv",
        "flip-method=2",
        "!",
        "video/x-raw,width=640,height=480,format=BGRx",
        "!",
        "videoconvert",
        "!",
        "queue",
        "max-size-buffers=1",
        "leaky=downstream",
        "!",
        "jpegenc",
        "!",
        "fdsink",
        "fd=1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(RigConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RigConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RigConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, falling back to stock defaults when it
/// does not exist.
pub fn load_config(path: &Path) -> Result<RigConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rigscan configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Session storage
# ---------------------------------------------------------------------------
[storage]
# Directory that holds the session folders. It must already exist; a missing
# directory usually means the capture drive is not mounted.
base_dir = "/media/vt360/VT360_DRIVE"

# Session folders are named <prefix>_<id>, with ids counting up from 0.
prefix = "Image_set"

# ---------------------------------------------------------------------------
# Serial link to the pan/tilt controller
# ---------------------------------------------------------------------------
[serial]
device = "/dev/ttyUSB0"
baud_rate = 9600
# Write timeout in milliseconds.
timeout_ms = 1000

# ---------------------------------------------------------------------------
# Rest position, sent before the first and after the last grid node
# ---------------------------------------------------------------------------
[home]
horizontal = 15
vertical = 90

# ---------------------------------------------------------------------------
# Open-loop timing. The controller never acknowledges a move, so these
# waits are the only synchronization between rig and camera.
# ---------------------------------------------------------------------------
[timing]
# Wait after every position command, home moves included.
move_settle_ms = 2000

# Wait after the warm-up grabs, before the grab that is written to disk.
exposure_settle_ms = 700

# Grabs discarded after every move so auto-exposure and white balance settle.
warmup_frames = 5

# ---------------------------------------------------------------------------
# Camera
# ---------------------------------------------------------------------------
[camera]
# Capture command. It is started once per scan and must keep writing JPEG
# images back to back on stdout until it is killed.
program = "gst-launch-1.0"
args = [
    "-q",
    "nvarguscamerasrc", "!",
    "video/x-raw(memory:NVMM),width=1280,height=720,format=NV12,framerate=60/1", "!",
    "nvvidconv", "flip-method=2", "!",
    "video/x-raw,width=640,height=480,format=BGRx", "!",
    "videoconvert", "!",
    "queue", "max-size-buffers=1", "leaky=downstream", "!",
    "jpegenc", "!",
    "fdsink", "fd=1",
]

# JPEG quality of the written frames (1 = worst, 100 = best).
jpeg_quality = 95
"##
}
