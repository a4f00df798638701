//! Shared types used across the scan pipeline.
//!
//! These flow from the orchestrator into the CLI output and the `--json`
//! report, so they all serialize with serde.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One grid node in actuator-native units (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanPosition {
    pub horizontal: i64,
    pub vertical: i64,
}

impl ScanPosition {
    pub fn new(horizontal: i64, vertical: i64) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

impl fmt::Display for ScanPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.horizontal, self.vertical)
    }
}

/// Which half of a node's capture a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameRole {
    Primary,
    /// Taken at the mirrored position; filenames carry an `S` marker.
    Stereo,
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRole::Primary => f.write_str("primary"),
            FrameRole::Stereo => f.write_str("stereo"),
        }
    }
}

/// A capture session: one numbered folder per scan invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: u32,
    pub directory: PathBuf,
}

/// A frame that was grabbed and written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFrame {
    pub session_id: u32,
    /// 1-based, shared by the primary and stereo frames of one node.
    pub pair_number: u32,
    pub role: FrameRole,
    pub position: ScanPosition,
    pub path: PathBuf,
}

/// A frame that could not be grabbed or persisted. Never fatal to a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFailure {
    pub pair_number: u32,
    pub role: FrameRole,
    pub position: ScanPosition,
    pub reason: String,
}

/// Aggregate result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Session the frames were written to, once allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    /// Grid nodes visited (a node counts once even in stereo mode).
    pub nodes_attempted: u32,
    pub frames: Vec<CapturedFrame>,
    pub failures: Vec<CaptureFailure>,
    /// Set when a cancellation request stopped traversal early.
    #[serde(default)]
    pub cancelled: bool,
}

impl ScanOutcome {
    pub fn frames_written(&self) -> usize {
        self.frames.len()
    }

    pub fn frames_failed(&self) -> usize {
        self.failures.len()
    }

    /// Record the result of one capture attempt.
    pub fn record(&mut self, result: Result<CapturedFrame, CaptureFailure>) {
        match result {
            Ok(frame) => self.frames.push(frame),
            Err(failure) => self.failures.push(failure),
        }
    }
}
