//! # Rigscan
//!
//! Drives a two-axis pan/tilt camera rig through a rectangular grid of
//! positions and writes one JPEG per node (two in stereo mode) into a freshly
//! numbered session folder.
//!
//! # Architecture: One Scan, Four Phases
//!
//! ```text
//! request ─▶ plan ─▶ home ─▶ traverse grid ─▶ home ─▶ outcome
//!            (pure)          move → settle → warm-up → grab → write
//! ```
//!
//! Planning is a pure function of the request, so a bad request is rejected
//! before the serial port or camera is opened. Everything after that runs on
//! one thread because the rig can only be in one place at a time.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | JSON scan requests, field validation, axis planning |
//! | [`path`] | Per-axis coordinate sequences and row-major grid order |
//! | [`mirror`] | Stereo partner position: horizontal `(h + 180) mod 360`, vertical reflected `(360 − v) mod 360` |
//! | [`session`] | Allocates the next numbered session folder |
//! | [`naming`] | Session folder and frame filename conventions |
//! | [`actuator`] | Serial position commands with a fixed settle window |
//! | [`camera`] | Frame sources and the warm-up/settle/grab/write capture sink |
//! | [`scan`] | Orchestrator state machine, device seam, cancellation |
//! | [`config`] | `rigscan.toml` loading, stock defaults, validation |
//! | [`types`] | Positions, frames, failures, and the scan outcome |
//! | [`output`] | CLI output formatting for plans, progress, and summaries |
//!
//! # Design Decisions
//!
//! ## Open-Loop Motion
//!
//! The controller never acknowledges a command. Every move is followed by a
//! fixed settle wait (2 s by default) before the camera is touched. The
//! [`actuator::ActuatorLink`] trait keeps "send" and "wait" separate so an
//! acknowledging controller can slot in later.
//!
//! ## Capture Failures Are Data
//!
//! A frame that cannot be grabbed or written is recorded in
//! [`types::ScanOutcome::failures`] and the scan moves on. Only problems that
//! make the rest of the grid meaningless (bad request, missing device, no
//! session folder, a dead serial line) stop a scan.
//!
//! ## Filesystem-Numbered Sessions
//!
//! Session ids come from the folders already on the drive: the next id is one
//! past the highest `Image_set_<n>`. Folders are created with a non-recursive
//! `create_dir`, so an unmounted drive fails loudly instead of silently
//! filling the mount point, and two concurrent scans cannot share a folder.
//!
//! ## External Capture Command
//!
//! The camera is whatever program streams JPEG images to stdout. It is
//! started once when the scan opens its devices and killed when they are
//! dropped, so warm-up grabs read the same live sensor stream as the kept
//! frame. On the reference rig that is a GStreamer pipeline; tests substitute
//! a scripted mock behind [`camera::FrameSource`].

pub mod actuator;
pub mod camera;
pub mod config;
pub mod mirror;
pub mod naming;
pub mod output;
pub mod path;
pub mod request;
pub mod scan;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
