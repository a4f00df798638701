//! Encoding parameters for persisted frames.

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    /// Keeps file sizes comparable with earlier image sets.
    fn default() -> Self {
        Self(95)
    }
}
