//! Frame source trait and shared types.
//!
//! The [`FrameSource`] trait is the only thing the capture sink knows about a
//! camera. The production implementation is
//! [`CommandCamera`](super::command_source::CommandCamera); tests use the
//! scripted [`MockCamera`](tests::MockCamera).

use image::RgbImage;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A grabbed frame, 8-bit RGB.
pub type Frame = RgbImage;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera unavailable: capture program {0} not found")]
    ProgramNotFound(PathBuf),
    #[error("failed to run capture program: {0}")]
    Spawn(#[source] io::Error),
    /// The capture process closed its output; `status` is its exit status
    /// when it has already exited.
    #[error("capture stream closed ({status})")]
    StreamClosed { status: String },
    #[error("failed to read capture stream: {0}")]
    Stream(#[source] io::Error),
    /// The camera produced nothing for this grab.
    #[error("camera returned no frame")]
    NoFrame,
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
}

/// Anything that can hand over one frame on demand.
///
/// Implementations own the device handle; dropping the source releases it.
pub trait FrameSource {
    /// Grab the next frame.
    fn grab(&mut self) -> Result<Frame, CameraError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Camera that serves a solid test frame, failing on chosen grabs.
    ///
    /// The grab counter is shared so a test can inspect it after the scanner
    /// has taken ownership of the camera.
    #[derive(Clone, Default)]
    pub struct MockCamera {
        /// Zero-based indices of grabs that return [`CameraError::NoFrame`].
        pub failing_grabs: HashSet<usize>,
        pub grabs: Arc<AtomicUsize>,
    }

    impl MockCamera {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(grabs: impl IntoIterator<Item = usize>) -> Self {
            Self {
                failing_grabs: grabs.into_iter().collect(),
                ..Self::default()
            }
        }

        pub fn grab_count(&self) -> usize {
            self.grabs.load(Ordering::SeqCst)
        }
    }

    impl FrameSource for MockCamera {
        fn grab(&mut self) -> Result<Frame, CameraError> {
            let index = self.grabs.fetch_add(1, Ordering::SeqCst);
            if self.failing_grabs.contains(&index) {
                return Err(CameraError::NoFrame);
            }
            Ok(RgbImage::from_pixel(8, 6, image::Rgb([40, 120, 200])))
        }
    }

    #[test]
    fn mock_serves_frames_and_counts() {
        let mut camera = MockCamera::new();
        let frame = camera.grab().unwrap();
        assert_eq!(frame.dimensions(), (8, 6));
        camera.grab().unwrap();
        assert_eq!(camera.grab_count(), 2);
    }

    #[test]
    fn mock_fails_on_chosen_grab() {
        let mut camera = MockCamera::failing_on([1]);
        assert!(camera.grab().is_ok());
        assert!(matches!(camera.grab(), Err(CameraError::NoFrame)));
        assert!(camera.grab().is_ok());
    }
}
