//! Physical dimensions of the emulated panel.

use serde::{Deserialize, Serialize};

/// Physical size of the display in millimeters.
///
/// The host uses this to derive the DPI it reports to applications. Zero is
/// allowed (the host falls back to a default density); negative or
/// non-finite sizes are rejected at descriptor validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeMillimeters {
    pub width: f64,
    pub height: f64,
}

impl SizeMillimeters {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if both dimensions are finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }
}
