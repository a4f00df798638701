//! Shared test utilities for the rigscan test suite.
//!
//! Provides fixture setup, a mock rig, and lookup helpers that work with
//! scan results (`ScanOutcome`, `CapturedFrame`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let devices = MockDevices::new();
//! let outcome = scanner_for(tmp.path()).run(&request, &devices).unwrap();
//!
//! let frame = find_frame(&outcome, 2, FrameRole::Stereo);
//! assert!(homed_at_both_ends(&devices.actuator));
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, RgbImage};
use std::cell::Cell;
use std::fs;
use std::path::Path;

use crate::actuator::tests::MockActuator;
use crate::actuator::{ActuatorError, ActuatorLink};
use crate::camera::CameraError;
use crate::camera::source::tests::MockCamera;
use crate::config::{RigConfig, StorageConfig, TimingConfig};
use crate::naming::session_folder_name;
use crate::scan::{Devices, Scanner};
use crate::types::{CapturedFrame, FrameRole, ScanOutcome};

/// Grabs per capture with the default warm-up count: five discarded, one kept.
pub const GRABS_PER_CAPTURE: usize = 6;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create empty session folders for the given ids under `base`.
pub fn seed_sessions(base: &Path, prefix: &str, ids: &[u32]) {
    for &id in ids {
        fs::create_dir(base.join(session_folder_name(prefix, id))).unwrap();
    }
}

/// Config writing sessions under `base` with every wait zeroed.
pub fn test_config(base: &Path) -> RigConfig {
    RigConfig {
        storage: StorageConfig {
            base_dir: base.to_path_buf(),
            ..StorageConfig::default()
        },
        timing: TimingConfig::instant(),
        ..RigConfig::default()
    }
}

pub fn scanner_for(base: &Path) -> Scanner {
    Scanner::from_config(&test_config(base))
}

/// A small valid JPEG, gradient-filled, as it would arrive on a capture
/// stream.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Zero-based grab index of the kept frame of the `capture`-th capture
/// (1-based), for scheduling camera failures.
pub fn kept_grab_index(capture: usize) -> usize {
    (capture - 1) * GRABS_PER_CAPTURE + GRABS_PER_CAPTURE - 1
}

// =========================================================================
// Mock rig
// =========================================================================

/// Devices that hand out clones of a mock actuator and camera.
///
/// Clones share their call logs and grab counters, so tests inspect
/// `devices.actuator` and `devices.camera` after the scan.
pub struct MockDevices {
    pub actuator: MockActuator,
    pub camera: MockCamera,
    pub actuator_unavailable: bool,
    pub camera_unavailable: bool,
    /// Number of successful device opens.
    pub opened: Cell<usize>,
}

impl MockDevices {
    pub fn new() -> Self {
        Self {
            actuator: MockActuator::new(),
            camera: MockCamera::new(),
            actuator_unavailable: false,
            camera_unavailable: false,
            opened: Cell::new(0),
        }
    }

    pub fn with_camera(camera: MockCamera) -> Self {
        Self {
            camera,
            ..Self::new()
        }
    }

    pub fn with_actuator(actuator: MockActuator) -> Self {
        Self {
            actuator,
            ..Self::new()
        }
    }
}

impl Devices for MockDevices {
    type Actuator = MockActuator;
    type Camera = MockCamera;

    fn open_actuator(&self) -> Result<MockActuator, ActuatorError> {
        if self.actuator_unavailable {
            return Err(ActuatorError::Unavailable {
                device: "/dev/ttyMOCK".to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "unplugged"),
            });
        }
        self.opened.set(self.opened.get() + 1);
        Ok(self.actuator.clone())
    }

    fn open_camera(&self) -> Result<MockCamera, CameraError> {
        if self.camera_unavailable {
            return Err(CameraError::ProgramNotFound("mock-capture".into()));
        }
        self.opened.set(self.opened.get() + 1);
        Ok(self.camera.clone())
    }
}

/// Whether the first and the last commanded positions are home.
///
/// Only the two ends are checked, so grid nodes that happen to sit at the
/// home position do not count as homing.
pub fn homed_at_both_ends(actuator: &MockActuator) -> bool {
    let home = actuator.home();
    let sent = actuator.sent_positions();
    sent.len() >= 2 && sent.first() == Some(&home) && sent.last() == Some(&home)
}

// =========================================================================
// Outcome lookups (panic with a clear message on miss)
// =========================================================================

/// Find a written frame by pair number and role. Panics if not found.
pub fn find_frame(outcome: &ScanOutcome, pair_number: u32, role: FrameRole) -> &CapturedFrame {
    outcome
        .frames
        .iter()
        .find(|f| f.pair_number == pair_number && f.role == role)
        .unwrap_or_else(|| {
            let have: Vec<(u32, FrameRole)> =
                outcome.frames.iter().map(|f| (f.pair_number, f.role)).collect();
            panic!("frame {pair_number} ({role}) not found. Available: {have:?}")
        })
}

/// Pair numbers of written frames, in capture order.
pub fn pair_numbers(outcome: &ScanOutcome) -> Vec<u32> {
    outcome.frames.iter().map(|f| f.pair_number).collect()
}

/// Sorted entry names of a directory.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
