//! Stereo partner positions.
//!
//! The pan axis wraps at 360°, so the partner of a frame sits half a turn
//! away horizontally and is reflected about 0° vertically.

use crate::types::ScanPosition;

/// Full turn of the rig, in actuator units.
const FULL_TURN: i64 = 360;

/// Mirrored position for the stereo frame of a node.
///
/// Results always lie in `[0, 360)`, whatever the input range.
pub fn mirror(position: ScanPosition) -> ScanPosition {
    ScanPosition {
        horizontal: (position.horizontal.rem_euclid(FULL_TURN) + FULL_TURN / 2) % FULL_TURN,
        vertical: (FULL_TURN - position.vertical.rem_euclid(FULL_TURN)) % FULL_TURN,
    }
}
