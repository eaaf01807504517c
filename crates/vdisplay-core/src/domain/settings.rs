//! Display settings: the configuration pushed to a live display.

use serde::{Deserialize, Serialize};

use crate::domain::mode::DisplayMode;

/// The mode list and HiDPI flag applied to a live display.
///
/// Settings are a plain mutable value owned by whoever is about to apply
/// them. The mode list must be non-empty at apply time — that is checked by
/// the display, not here, so a settings value can be built up incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Modes to expose to the host compositor, in preference order.
    pub modes: Vec<DisplayMode>,
    /// Whether the display advertises a HiDPI (2x backing scale) surface.
    pub hi_dpi: bool,
}

impl DisplaySettings {
    /// Creates empty settings: no modes, HiDPI off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates settings with the given mode list and HiDPI off.
    pub fn with_modes(modes: Vec<DisplayMode>) -> Self {
        Self {
            modes,
            hi_dpi: false,
        }
    }
}
