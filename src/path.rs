//! Scan path generation.
//!
//! Turns a `(start, end, step_count)` range into the ordered coordinates the
//! actuator visits on one axis, and combines two axes into the row-major grid
//! traversal. Everything here is pure.
//!
//! ## Truncation
//!
//! The step size is real-valued; each coordinate is computed as
//! `start ± i * step` and then truncated toward zero. Small ranges with many
//! steps therefore produce repeated or uneven coordinates:
//!
//! ```text
//! generate_axis_path(0, 2, 4)  →  [0, 0, 1, 1]
//! generate_axis_path(0, 10, 3) →  [0, 3, 6]
//! ```
//!
//! Rig firmware and existing image sets depend on these exact values, so the
//! duplicates are kept rather than rounded away.

use crate::types::ScanPosition;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("step count must be at least 1, got {0}")]
    InvalidRange(i64),
}

/// Ordered coordinates for one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisPath(Vec<i64>);

impl AxisPath {
    pub fn coords(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Generate the coordinates for one axis.
///
/// - `generate_axis_path(0, 90, 3)` → `[0, 30, 60]`
/// - `generate_axis_path(90, 0, 3)` → `[90, 60, 30]`
/// - `generate_axis_path(5, 5, 2)` → `[5, 5]`
///
/// Note that `end` itself is never reached: the range is split into
/// `step_count` equal slices and only the slice starts are visited.
pub fn generate_axis_path(start: i64, end: i64, step_count: i64) -> Result<AxisPath, PathError> {
    if step_count <= 0 {
        return Err(PathError::InvalidRange(step_count));
    }
    let span = (i128::from(end) - i128::from(start)).unsigned_abs();
    let step = span as f64 / step_count as f64;
    let ascending = start <= end;

    let coords = (0..step_count)
        .map(|i| {
            let offset = i as f64 * step;
            let value = if ascending {
                start as f64 + offset
            } else {
                start as f64 - offset
            };
            // Saturates at the i64 bounds.
            value.trunc() as i64
        })
        .collect();
    Ok(AxisPath(coords))
}

/// Grid nodes in traversal order: horizontal outer, vertical varying fastest.
pub fn grid_positions<'a>(
    horizontal: &'a AxisPath,
    vertical: &'a AxisPath,
) -> impl Iterator<Item = ScanPosition> + 'a {
    horizontal.coords().iter().flat_map(move |&h| {
        vertical
            .coords()
            .iter()
            .map(move |&v| ScanPosition::new(h, v))
    })
}
