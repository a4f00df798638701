//! Frame acquisition and persistence.
//!
//! | Concern | Where |
//! |---|---|
//! | **Grab a frame** | [`FrameSource`] trait |
//! | **Production source** | [`CommandCamera`]: streaming capture process, decoded with `image` |
//! | **Warm-up, settle, write** | [`CaptureSink`] |
//! | **JPEG quality** | [`Quality`] |
//!
//! The module is split into:
//! - **Source**: [`FrameSource`] trait + [`CameraError`]
//! - **Command source**: [`CommandCamera`]
//! - **MJPEG**: splitting the capture stream into single JPEG images
//! - **Parameters**: encoding settings
//! - **Capture**: [`CaptureSink`], combining a source with the settle
//!   contract and atomic file writes

pub mod capture;
pub mod command_source;
mod mjpeg;
mod params;
pub mod source;

pub use capture::{CaptureSettings, CaptureSink};
pub use command_source::CommandCamera;
pub use params::Quality;
pub use source::{CameraError, Frame, FrameSource};
