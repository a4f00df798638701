//! CLI output formatting for plans, scan progress, and results.
//!
//! # Position-First Display
//!
//! Every frame is identified by its pair label and grid position, with the
//! file it landed in shown as secondary context on an indented `File:` line.
//! That reads as a capture log of the rig's path while still letting users
//! find each image on disk.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! Scan plan
//!     Horizontal: 0, 30, 60
//!     Vertical: 0, 45
//!     Mode: stereo
//!     Session: /media/vt360/VT360_DRIVE/Image_set_5
//! 001 0,0
//!     File: Image_5_1_r_0_c_0.jpg
//! 001S 180,0
//!     File: Image_5_1S_r_180_c_0.jpg
//! ...
//! 6 nodes, 12 frames
//! ```
//!
//! ## Scan
//!
//! ```text
//! Session 5
//!     Folder: /media/vt360/VT360_DRIVE/Image_set_5
//! Homing
//! 001 0,0
//!     File: Image_5_1_r_0_c_0.jpg
//! 001S 180,0
//!     File: Image_5_1S_r_180_c_0.jpg
//! 002 0,45
//!     FAILED: camera returned no frame
//! ...
//! Returning home
//! ```
//!
//! ## Summary
//!
//! ```text
//! Session 5: 11 frames written, 1 failed
//! All images have been taken!
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::mirror::mirror;
use crate::naming::frame_filename;
use crate::path::grid_positions;
use crate::request::ScanPlan;
use crate::scan::{ScanEvent, ScanState};
use crate::types::{FrameRole, ScanOutcome, ScanPosition, Session};
use std::path::Path;

/// Printed when every planned frame was written.
pub const ALL_TAKEN: &str = "All images have been taken!";

// ============================================================================
// Shared display helpers
// ============================================================================

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Pair label: zero-padded pair number, `S` suffix for stereo frames.
fn frame_label(pair_number: u32, role: FrameRole) -> String {
    let index = format_index(pair_number as usize);
    match role {
        FrameRole::Primary => index,
        FrameRole::Stereo => format!("{index}S"),
    }
}

fn join_coords(coords: &[i64]) -> String {
    coords
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn mode_name(stereo: bool) -> &'static str {
    if stereo { "stereo" } else { "mono" }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Format a dry-run plan: axis paths, the session the next scan would use,
/// and every frame it would write in capture order.
pub fn format_plan(plan: &ScanPlan, next_session: &Session) -> Vec<String> {
    let mut lines = vec![
        "Scan plan".to_string(),
        format!("{}Horizontal: {}", indent(1), join_coords(plan.horizontal.coords())),
        format!("{}Vertical: {}", indent(1), join_coords(plan.vertical.coords())),
        format!("{}Mode: {}", indent(1), mode_name(plan.stereo)),
        format!("{}Session: {}", indent(1), next_session.directory.display()),
    ];

    let mut push_frame = |pair_number: u32, role: FrameRole, position: ScanPosition| {
        lines.push(position_line(pair_number, role, position));
        lines.push(format!(
            "{}File: {}",
            indent(1),
            frame_filename(next_session.id, pair_number, role, position)
        ));
    };
    for (pair_number, position) in (1..).zip(grid_positions(&plan.horizontal, &plan.vertical)) {
        push_frame(pair_number, FrameRole::Primary, position);
        if plan.stereo {
            push_frame(pair_number, FrameRole::Stereo, mirror(position));
        }
    }

    lines.push(format!(
        "{}, {}",
        plural(plan.node_count(), "node"),
        plural(plan.frame_count(), "frame")
    ));
    lines
}

pub fn print_plan(plan: &ScanPlan, next_session: &Session) {
    for line in format_plan(plan, next_session) {
        println!("{line}");
    }
}

// ============================================================================
// Scan progress
// ============================================================================

/// Format one progress event. Events with nothing to show yield no lines.
pub fn format_scan_event(event: &ScanEvent) -> Vec<String> {
    match event {
        ScanEvent::Planned {
            horizontal,
            vertical,
            stereo,
        } => vec![format!(
            "Grid {}x{} ({})",
            horizontal.len(),
            vertical.len(),
            mode_name(*stereo)
        )],
        ScanEvent::SessionCreated(session) => vec![
            format!("Session {}", session.id),
            format!("{}Folder: {}", indent(1), session.directory.display()),
        ],
        ScanEvent::StateChanged(ScanState::HomingStart) => vec!["Homing".to_string()],
        ScanEvent::StateChanged(ScanState::HomingEnd) => vec!["Returning home".to_string()],
        ScanEvent::StateChanged(_) => Vec::new(),
        ScanEvent::Moving {
            pair_number,
            role,
            position,
        } => vec![position_line(*pair_number, *role, *position)],
        ScanEvent::FrameSaved(frame) => {
            vec![format!("{}File: {}", indent(1), file_name(&frame.path))]
        }
        ScanEvent::FrameFailed(failure) => {
            vec![format!("{}FAILED: {}", indent(1), failure.reason)]
        }
        ScanEvent::Cancelled { remaining_nodes } => vec![format!(
            "Cancelled, {} skipped",
            plural(*remaining_nodes, "node")
        )],
    }
}

fn position_line(pair_number: u32, role: FrameRole, position: ScanPosition) -> String {
    format!("{} {}", frame_label(pair_number, role), position)
}

// ============================================================================
// Summary
// ============================================================================

/// One-line verdict for a finished scan.
pub fn completion_message(outcome: &ScanOutcome) -> String {
    if outcome.cancelled {
        format!(
            "Scan cancelled after {}",
            plural(outcome.nodes_attempted as usize, "node")
        )
    } else if outcome.failures.is_empty() {
        ALL_TAKEN.to_string()
    } else {
        format!(
            "Scan finished, {} could not be captured",
            plural(outcome.frames_failed(), "frame")
        )
    }
}

/// Format the end-of-scan summary: counts, failed frames, verdict.
pub fn format_outcome(outcome: &ScanOutcome) -> Vec<String> {
    let counts = format!(
        "{} written, {} failed",
        plural(outcome.frames_written(), "frame"),
        outcome.frames_failed()
    );
    let mut lines = vec![match &outcome.session {
        Some(session) => format!("Session {}: {counts}", session.id),
        None => counts,
    }];

    if !outcome.failures.is_empty() {
        lines.push("Failed".to_string());
        for failure in &outcome.failures {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                position_line(failure.pair_number, failure.role, failure.position),
                failure.reason
            ));
        }
    }

    lines.push(completion_message(outcome));
    lines
}

pub fn print_outcome(outcome: &ScanOutcome) {
    for line in format_outcome(outcome) {
        println!("{line}");
    }
}
