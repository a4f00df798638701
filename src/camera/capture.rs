//! Capture sink: warm-up, settle, grab, write.
//!
//! After a move the sensor's auto-exposure and white balance need a few
//! frames to converge, so every capture discards `warmup_frames` grabs,
//! waits `exposure_settle`, and only then keeps a grab. The kept frame is
//! encoded next to its final name and renamed into place, so a session
//! folder never contains a half-written image.
//!
//! A failed grab or write is reported as a [`CaptureFailure`] and never
//! stops the scan.

use super::params::Quality;
use super::source::{Frame, FrameSource};
use crate::config::{CameraConfig, TimingConfig};
use crate::naming::frame_filename;
use crate::types::{CaptureFailure, CapturedFrame, FrameRole, ScanPosition, Session};
use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timing and encoding settings for a [`CaptureSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub warmup_frames: u32,
    pub exposure_settle: Duration,
    pub quality: Quality,
}

impl CaptureSettings {
    pub fn from_config(timing: &TimingConfig, camera: &CameraConfig) -> Self {
        Self {
            warmup_frames: timing.warmup_frames,
            exposure_settle: timing.exposure_settle(),
            quality: Quality::new(camera.jpeg_quality),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from_config(&TimingConfig::default(), &CameraConfig::default())
    }
}

/// Wraps a frame source with the capture contract.
pub struct CaptureSink<S> {
    source: S,
    settings: CaptureSettings,
}

impl<S: FrameSource> CaptureSink<S> {
    pub fn new(source: S, settings: CaptureSettings) -> Self {
        Self { source, settings }
    }

    /// Capture one frame for a grid node and write it into the session folder.
    pub fn capture_frame(
        &mut self,
        session: &Session,
        pair_number: u32,
        role: FrameRole,
        position: ScanPosition,
    ) -> Result<CapturedFrame, CaptureFailure> {
        let failure = |reason: String| CaptureFailure {
            pair_number,
            role,
            position,
            reason,
        };

        for i in 0..self.settings.warmup_frames {
            if let Err(e) = self.source.grab() {
                debug!(warmup = i, error = %e, "warm-up grab failed");
            }
        }
        std::thread::sleep(self.settings.exposure_settle);

        let frame = self.source.grab().map_err(|e| {
            warn!(pair = pair_number, %role, %position, error = %e, "capture failed");
            failure(e.to_string())
        })?;

        let name = frame_filename(session.id, pair_number, role, position);
        let path = session.directory.join(&name);
        write_frame(&frame, &path, self.settings.quality).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to write frame");
            failure(format!("failed to write {name}: {e}"))
        })?;

        info!(pair = pair_number, %role, %position, file = %name, "frame saved");
        Ok(CapturedFrame {
            session_id: session.id,
            pair_number,
            role,
            position,
            path,
        })
    }
}

/// Encode `frame` as JPEG into a sibling temp file, then rename it over `path`.
fn write_frame(frame: &Frame, path: &Path, quality: Quality) -> image::ImageResult<()> {
    let partial = path.with_extension("jpg.part");
    let result = encode_jpeg(frame, &partial, quality).and_then(|()| {
        fs::rename(&partial, path)?;
        Ok(())
    });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn encode_jpeg(frame: &Frame, path: &Path, quality: Quality) -> image::ImageResult<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality.value()).write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
