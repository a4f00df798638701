//! Centralized naming for session folders and captured frames.
//!
//! Session folders follow `<prefix>_<id>`; frames follow
//! `Image_<session>_<pair>[S]_r_<h>_c_<v>.jpg`, where `r` carries the
//! horizontal coordinate and `c` the vertical one:
//!
//! - `Image_set_7/` → session 7
//! - `Image_7_3_r_60_c_45.jpg` → pair 3, primary frame at (60, 45)
//! - `Image_7_3S_r_240_c_315.jpg` → pair 3, stereo frame at the mirrored (240, 315)
//!
//! Downstream tooling matches on these names, so both formats are fixed.

use crate::types::{FrameRole, ScanPosition};

/// Folder name for a session id.
pub fn session_folder_name(prefix: &str, id: u32) -> String {
    format!("{prefix}_{id}")
}

/// Extract the session id from a folder name that starts with `prefix`.
///
/// The id is the text after the final `_`. Returns `None` when the name
/// does not start with the prefix or the suffix is not a non-negative integer:
/// - `("Image_set_12", "Image_set")` → `Some(12)`
/// - `("Image_set_old", "Image_set")` → `None`
/// - `("Other_3", "Image_set")` → `None`
pub fn parse_session_id(name: &str, prefix: &str) -> Option<u32> {
    if !name.starts_with(prefix) {
        return None;
    }
    let (_, suffix) = name.rsplit_once('_')?;
    suffix.parse::<u32>().ok()
}

/// Deterministic filename for one captured frame.
///
/// For a fixed session, `(pair_number, role)` alone determines the name.
pub fn frame_filename(
    session_id: u32,
    pair_number: u32,
    role: FrameRole,
    position: ScanPosition,
) -> String {
    let marker = match role {
        FrameRole::Primary => "",
        FrameRole::Stereo => "S",
    };
    format!(
        "Image_{session_id}_{pair_number}{marker}_r_{}_c_{}.jpg",
        position.horizontal, position.vertical
    )
}
