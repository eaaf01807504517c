//! Display mode value type.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing a [`DisplayMode`].
#[derive(Debug, Error, PartialEq)]
pub enum ModeError {
    /// Width or height is zero.
    #[error("mode dimensions must be non-zero: got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    /// Refresh rate is zero, negative, or not a finite number.
    #[error("refresh rate must be positive and finite: got {0}")]
    InvalidRefreshRate(f64),
}

/// A single display mode: pixel dimensions plus refresh rate in hertz.
///
/// Modes are immutable once constructed. A display exposes an ordered list
/// of modes in preference order — the first entry is the mode the host
/// compositor should pick by default.
///
/// Equality is structural: two modes are equal iff width, height, and
/// refresh rate are all equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayMode {
    width: u32,
    height: u32,
    refresh_rate: f64,
}

impl DisplayMode {
    /// Creates a new mode.
    ///
    /// # Errors
    ///
    /// Returns [`ModeError::ZeroDimension`] if either dimension is zero, or
    /// [`ModeError::InvalidRefreshRate`] if the refresh rate is not a
    /// positive finite number. Whether a refresh rate is *sensible* (24 vs
    /// 240 Hz) is a caller concern and not checked here.
    pub fn new(width: u32, height: u32, refresh_rate: f64) -> Result<Self, ModeError> {
        if width == 0 || height == 0 {
            return Err(ModeError::ZeroDimension { width, height });
        }
        if !refresh_rate.is_finite() || refresh_rate <= 0.0 {
            return Err(ModeError::InvalidRefreshRate(refresh_rate));
        }
        Ok(Self {
            width,
            height,
            refresh_rate,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Refresh rate in hertz.
    pub fn refresh_rate(&self) -> f64 {
        self.refresh_rate
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}Hz", self.width, self.height, self.refresh_rate)
    }
}
