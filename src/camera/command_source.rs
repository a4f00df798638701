//! Frame source backed by a long-running capture process.
//!
//! Opening the camera starts the configured program once. It must keep
//! writing JPEG images back to back on stdout for as long as it runs; every
//! grab reads the next complete image from that stream, so the sensor stays
//! open for the whole scan and warm-up grabs see a live, converging stream.
//! On the reference rig the program is a GStreamer pipeline from
//! `nvarguscamerasrc` through `jpegenc` into `fdsink`; any tool with the same
//! contract works (`ffmpeg -f mjpeg -`, `libcamera-vid --codec mjpeg -o -`).
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Run capture | `std::process::Command`, piped stdout |
//! | Split stream | [`read_jpeg`](super::mjpeg::read_jpeg) |
//! | Decode (JPEG) | `image::load_from_memory_with_format` |
//! | Normalize to RGB8 | `DynamicImage::into_rgb8` |
//!
//! The sensor delivers BGR; the capture pipeline's encoder handles the channel
//! order, so frames arrive here as plain RGB.
//!
//! Dropping the camera kills and reaps the capture process.

use super::mjpeg::read_jpeg;
use super::source::{CameraError, Frame, FrameSource};
use crate::config::CameraConfig;
use image::ImageFormat;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

/// Camera driven by a streaming capture process.
#[derive(Debug)]
pub struct CommandCamera {
    child: Child,
    stream: BufReader<ChildStdout>,
}

impl CommandCamera {
    /// Resolve the configured capture program and start it.
    ///
    /// Fails with [`CameraError::ProgramNotFound`] when the program cannot be
    /// located, so a scan aborts before the rig moves.
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let program = resolve_program(&config.program)
            .ok_or_else(|| CameraError::ProgramNotFound(PathBuf::from(&config.program)))?;

        let mut child = Command::new(&program)
            .args(&config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(CameraError::Spawn)?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CameraError::Spawn(io::Error::other(
                "capture program has no stdout",
            )));
        };

        info!(program = %program.display(), pid = child.id(), "camera stream started");
        Ok(Self {
            child,
            stream: BufReader::new(stdout),
        })
    }

    fn exit_status(&mut self) -> String {
        match self.child.try_wait() {
            Ok(Some(status)) => status.to_string(),
            Ok(None) => "process still running".to_string(),
            Err(e) => format!("status unknown: {e}"),
        }
    }
}

impl FrameSource for CommandCamera {
    fn grab(&mut self) -> Result<Frame, CameraError> {
        let bytes = match read_jpeg(&mut self.stream) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Err(CameraError::StreamClosed {
                    status: self.exit_status(),
                });
            }
            Err(e) => return Err(CameraError::Stream(e)),
        };

        let frame = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?.into_rgb8();
        debug!(
            width = frame.width(),
            height = frame.height(),
            bytes = bytes.len(),
            "grabbed frame"
        );
        Ok(frame)
    }
}

impl Drop for CommandCamera {
    fn drop(&mut self) {
        let pid = self.child.id();
        if let Err(e) = self.child.kill() {
            // Already exited is fine; it still needs reaping below.
            debug!(pid, error = %e, "capture process not killed");
        }
        match self.child.wait() {
            Ok(status) => debug!(pid, %status, "camera stream stopped"),
            Err(e) => warn!(pid, error = %e, "failed to reap capture process"),
        }
    }
}

/// Locate `program` the way a shell would: as a path when it contains a
/// separator, otherwise by searching `PATH`.
fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return path.is_file().then(|| path.to_path_buf());
    }
    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
