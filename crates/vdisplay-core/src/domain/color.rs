//! Chromaticity coordinates for the display's color gamut.
//!
//! A display's gamut is described by four CIE 1931 (x, y) coordinate pairs:
//! the red, green, and blue primaries plus the white point. This crate only
//! carries the coordinates to the display server; it performs no color math.

use serde::{Deserialize, Serialize};

/// A CIE 1931 chromaticity coordinate pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

impl Chromaticity {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` if both coordinates are finite numbers.
    ///
    /// Descriptor validation accepts any finite pair but must reject
    /// NaN/Infinity before they reach the wire.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// sRGB red primary.
pub const SRGB_RED: Chromaticity = Chromaticity { x: 0.640, y: 0.330 };
/// sRGB green primary.
pub const SRGB_GREEN: Chromaticity = Chromaticity { x: 0.300, y: 0.600 };
/// sRGB blue primary.
pub const SRGB_BLUE: Chromaticity = Chromaticity { x: 0.150, y: 0.060 };
/// D65 white point, the sRGB reference white.
pub const D65_WHITE: Chromaticity = Chromaticity {
    x: 0.3127,
    y: 0.3290,
};
