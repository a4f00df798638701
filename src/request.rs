//! Scan requests: the wire format and its validation.
//!
//! Requests arrive as a flat JSON object, the same shape the rig's web form
//! posts:
//!
//! ```json
//! {
//!   "horizontalStart": 0, "horizontalEnd": 90, "horizontalStep": 3,
//!   "verticalStart": 0,   "verticalEnd": 90,   "verticalStep": 2,
//!   "stereoMode": false
//! }
//! ```
//!
//! Integer fields accept JSON integers or strings holding a decimal integer
//! (form fields are often posted as text). `stereoMode` must be a JSON
//! boolean. Anything else is rejected before the rig is touched.

use crate::path::{AxisPath, PathError, generate_axis_path};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request must be a JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be an integer, got {value}")]
    NotAnInteger { field: &'static str, value: String },
    #[error("field `{0}` must be a boolean")]
    NotABool(&'static str),
    #[error("{axis} axis: {count} steps exceeds the limit of {max}", max = MAX_STEP_COUNT)]
    TooManySteps { axis: &'static str, count: i64 },
    #[error("{axis} axis: {source}")]
    InvalidAxis {
        axis: &'static str,
        #[source]
        source: PathError,
    },
}

/// Most positions a single axis may be split into.
pub const MAX_STEP_COUNT: i64 = 10_000;

/// One axis of a request, in actuator units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisRange {
    pub start: i64,
    pub end: i64,
    pub step_count: i64,
}

impl AxisRange {
    pub fn path(&self) -> Result<AxisPath, PathError> {
        generate_axis_path(self.start, self.end, self.step_count)
    }
}

/// A validated scan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    pub horizontal: AxisRange,
    pub vertical: AxisRange,
    pub stereo: bool,
}

/// Axis paths computed from a valid request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    pub horizontal: AxisPath,
    pub vertical: AxisPath,
    pub stereo: bool,
}

impl ScanPlan {
    /// Number of grid nodes (pairs) in the scan.
    pub fn node_count(&self) -> usize {
        self.horizontal.len() * self.vertical.len()
    }

    /// Number of frames a fully successful scan writes.
    pub fn frame_count(&self) -> usize {
        self.node_count() * if self.stereo { 2 } else { 1 }
    }
}

impl ScanRequest {
    pub fn new(horizontal: AxisRange, vertical: AxisRange, stereo: bool) -> Self {
        Self {
            horizontal,
            vertical,
            stereo,
        }
    }

    /// Parse a request from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Parse a request from an already-decoded JSON value.
    pub fn from_json(value: &Value) -> Result<Self, RequestError> {
        let object = value.as_object().ok_or(RequestError::NotAnObject)?;
        let int = |field: &'static str| -> Result<i64, RequestError> {
            let raw = object.get(field).ok_or(RequestError::MissingField(field))?;
            integer_field(field, raw)
        };

        let request = Self {
            horizontal: AxisRange {
                start: int("horizontalStart")?,
                end: int("horizontalEnd")?,
                step_count: int("horizontalStep")?,
            },
            vertical: AxisRange {
                start: int("verticalStart")?,
                end: int("verticalEnd")?,
                step_count: int("verticalStep")?,
            },
            stereo: object
                .get("stereoMode")
                .ok_or(RequestError::MissingField("stereoMode"))?
                .as_bool()
                .ok_or(RequestError::NotABool("stereoMode"))?,
        };
        Ok(request)
    }

    /// Check the request and compute its axis paths.
    ///
    /// This is the only validation a scan needs: a request that plans
    /// successfully can be traversed.
    pub fn plan(&self) -> Result<ScanPlan, RequestError> {
        Ok(ScanPlan {
            horizontal: plan_axis("horizontal", &self.horizontal)?,
            vertical: plan_axis("vertical", &self.vertical)?,
            stereo: self.stereo,
        })
    }
}

/// Check the step count against [`MAX_STEP_COUNT`] before any coordinate is
/// generated, then compute the path.
fn plan_axis(axis: &'static str, range: &AxisRange) -> Result<AxisPath, RequestError> {
    if range.step_count > MAX_STEP_COUNT {
        return Err(RequestError::TooManySteps {
            axis,
            count: range.step_count,
        });
    }
    range
        .path()
        .map_err(|source| RequestError::InvalidAxis { axis, source })
}

fn integer_field(field: &'static str, raw: &Value) -> Result<i64, RequestError> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| RequestError::NotAnInteger {
        field,
        value: raw.to_string(),
    })
}
