//! DisplayDescriptor: the configuration a virtual display is created from.

use thiserror::Error;
use vdisplay_core::{Chromaticity, RegistrationRequest, SizeMillimeters};

use crate::infrastructure::dispatch::TaskQueue;

/// Zero-argument callback invoked exactly once when the display's life
/// ends, whether the server or the provider initiated it.
pub type TerminationHandler = Box<dyn FnOnce() + Send + 'static>;

/// Errors detected when a descriptor is validated at display creation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Vendor and product id are both zero — indistinguishable from the
    /// null device.
    #[error("degenerate identity: vendor and product id are both zero")]
    DegenerateIdentity,

    /// One of the pixel bounds is zero; no mode could ever be applied.
    #[error("pixel bounds must be non-zero: got {width}x{height}")]
    ZeroPixelBounds { width: u32, height: u32 },

    /// Physical size is negative or not a finite number.
    #[error("physical size must be finite and non-negative")]
    MalformedPhysicalSize,

    /// A gamut coordinate is NaN or infinite.
    #[error("{field} chromaticity coordinates must be finite")]
    NonFiniteChromaticity { field: &'static str },

    /// A termination handler was configured without a dispatch queue, so
    /// its delivery guarantee could not be honored.
    #[error("a termination handler requires a dispatch queue for delivery")]
    HandlerWithoutQueue,
}

/// Collects identity, geometry, color, and callback configuration for a
/// virtual display before any remote registration occurs.
///
/// A descriptor is purely local state: nothing talks to the display server
/// until the descriptor is consumed by
/// [`VirtualDisplay::create`](crate::VirtualDisplay::create). Validation is
/// deferred to that point, so properties can be set in any order — a
/// default-constructed descriptor has a zeroed identity and empty name and
/// will fail validation until it is filled in.
///
/// The plain data fields are public; the dispatch queue and termination
/// handler are set through their setters because the handler can only be
/// meaningfully set once (last write wins) and is consumed on creation.
#[derive(Default)]
pub struct DisplayDescriptor {
    /// Device-identity triple presented to the host.
    pub vendor_id: u32,
    pub product_id: u32,
    pub serial_num: u32,
    /// Human-readable label shown in display preferences.
    pub name: String,
    /// Physical panel size the host derives reported DPI from.
    pub size_in_millimeters: SizeMillimeters,
    /// Upper bound on the width of any mode later applied to the display.
    pub max_pixels_wide: u32,
    /// Upper bound on the height of any mode later applied to the display.
    pub max_pixels_high: u32,
    pub red_primary: Chromaticity,
    pub green_primary: Chromaticity,
    pub blue_primary: Chromaticity,
    pub white_point: Chromaticity,
    queue: Option<TaskQueue>,
    termination_handler: Option<TerminationHandler>,
}

impl DisplayDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the serialized queue the termination handler will be delivered
    /// on. The queue is shared with the provider's environment; the display
    /// only ever submits work to it.
    pub fn set_dispatch_queue(&mut self, queue: TaskQueue) {
        self.queue = Some(queue);
    }

    /// Sets the callback invoked exactly once when the display's life ends.
    ///
    /// Last write wins: a previously set handler is dropped without being
    /// called. Requires a dispatch queue to be set before the descriptor is
    /// consumed — checked at validation, not here.
    pub fn set_termination_handler(&mut self, handler: impl FnOnce() + Send + 'static) {
        self.termination_handler = Some(Box::new(handler));
    }

    pub fn dispatch_queue(&self) -> Option<&TaskQueue> {
        self.queue.as_ref()
    }

    pub fn has_termination_handler(&self) -> bool {
        self.termination_handler.is_some()
    }

    /// Checks that the descriptor describes a registrable display.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: degenerate identity,
    /// zero pixel bounds, malformed physical size, non-finite gamut
    /// coordinates, or a handler configured without a delivery queue.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.vendor_id == 0 && self.product_id == 0 {
            return Err(ValidationError::DegenerateIdentity);
        }
        if self.max_pixels_wide == 0 || self.max_pixels_high == 0 {
            return Err(ValidationError::ZeroPixelBounds {
                width: self.max_pixels_wide,
                height: self.max_pixels_high,
            });
        }
        if !self.size_in_millimeters.is_well_formed() {
            return Err(ValidationError::MalformedPhysicalSize);
        }
        let coordinates = [
            ("red primary", self.red_primary),
            ("green primary", self.green_primary),
            ("blue primary", self.blue_primary),
            ("white point", self.white_point),
        ];
        for (field, value) in coordinates {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteChromaticity { field });
            }
        }
        if self.termination_handler.is_some() && self.queue.is_none() {
            return Err(ValidationError::HandlerWithoutQueue);
        }
        Ok(())
    }

    /// Builds the payload serialized to the display server at registration.
    ///
    /// The dispatch queue and termination handler are purely local and are
    /// never transmitted.
    pub fn registration_request(&self) -> RegistrationRequest {
        RegistrationRequest {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            serial_num: self.serial_num,
            name: self.name.clone(),
            size_in_millimeters: self.size_in_millimeters,
            max_pixels_wide: self.max_pixels_wide,
            max_pixels_high: self.max_pixels_high,
            red_primary: self.red_primary,
            green_primary: self.green_primary,
            blue_primary: self.blue_primary,
            white_point: self.white_point,
        }
    }

    /// Consumes the descriptor into its wire payload and local callback
    /// configuration. Called by display creation; the move makes reuse of a
    /// consumed descriptor impossible.
    pub(crate) fn into_parts(
        self,
    ) -> (
        RegistrationRequest,
        Option<TaskQueue>,
        Option<TerminationHandler>,
    ) {
        let request = self.registration_request();
        (request, self.queue, self.termination_handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdisplay_core::domain::color;

    fn valid_descriptor() -> DisplayDescriptor {
        let mut descriptor = DisplayDescriptor::new();
        descriptor.vendor_id = 0x4D56; // "VM"
        descriptor.product_id = 1;
        descriptor.serial_num = 1001;
        descriptor.name = "Virtual Panel".to_string();
        descriptor.size_in_millimeters = SizeMillimeters::new(527.0, 296.0);
        descriptor.max_pixels_wide = 3840;
        descriptor.max_pixels_high = 2160;
        descriptor.red_primary = color::SRGB_RED;
        descriptor.green_primary = color::SRGB_GREEN;
        descriptor.blue_primary = color::SRGB_BLUE;
        descriptor.white_point = color::D65_WHITE;
        descriptor
    }

    #[test]
    fn test_valid_descriptor_passes_validation() {
        assert_eq!(valid_descriptor().validate(), Ok(()));
    }

    #[test]
    fn test_default_descriptor_fails_validation() {
        assert_eq!(
            DisplayDescriptor::new().validate(),
            Err(ValidationError::DegenerateIdentity)
        );
    }

    #[test]
    fn test_vendor_only_identity_is_accepted() {
        let mut descriptor = valid_descriptor();
        descriptor.product_id = 0;
        descriptor.serial_num = 0;
        assert_eq!(descriptor.validate(), Ok(()));
    }

    #[test]
    fn test_zero_pixel_bounds_are_rejected() {
        let mut descriptor = valid_descriptor();
        descriptor.max_pixels_high = 0;
        assert_eq!(
            descriptor.validate(),
            Err(ValidationError::ZeroPixelBounds {
                width: 3840,
                height: 0
            })
        );
    }

    #[test]
    fn test_negative_physical_size_is_rejected() {
        let mut descriptor = valid_descriptor();
        descriptor.size_in_millimeters = SizeMillimeters::new(-10.0, 296.0);
        assert_eq!(
            descriptor.validate(),
            Err(ValidationError::MalformedPhysicalSize)
        );
    }

    #[test]
    fn test_zero_physical_size_is_accepted() {
        let mut descriptor = valid_descriptor();
        descriptor.size_in_millimeters = SizeMillimeters::default();
        assert_eq!(descriptor.validate(), Ok(()));
    }

    #[test]
    fn test_non_finite_chromaticity_is_rejected() {
        let mut descriptor = valid_descriptor();
        descriptor.white_point = Chromaticity::new(f64::NAN, 0.329);
        assert_eq!(
            descriptor.validate(),
            Err(ValidationError::NonFiniteChromaticity {
                field: "white point"
            })
        );
    }

    #[test]
    fn test_handler_without_queue_is_rejected() {
        let mut descriptor = valid_descriptor();
        descriptor.set_termination_handler(|| {});
        assert_eq!(
            descriptor.validate(),
            Err(ValidationError::HandlerWithoutQueue)
        );
    }

    #[tokio::test]
    async fn test_handler_with_queue_is_accepted() {
        let mut descriptor = valid_descriptor();
        descriptor.set_dispatch_queue(TaskQueue::new("descriptor-test"));
        descriptor.set_termination_handler(|| {});
        assert_eq!(descriptor.validate(), Ok(()));
    }

    #[test]
    fn test_last_handler_write_wins() {
        let mut descriptor = valid_descriptor();
        descriptor.set_termination_handler(|| panic!("replaced handler must never run"));
        descriptor.set_termination_handler(|| {});
        let (_, _, handler) = descriptor.into_parts();
        // Running the surviving handler must not hit the replaced one.
        handler.expect("handler was set")();
    }

    #[test]
    fn test_registration_request_carries_all_wire_fields() {
        let descriptor = valid_descriptor();
        let request = descriptor.registration_request();
        assert_eq!(request.vendor_id, 0x4D56);
        assert_eq!(request.product_id, 1);
        assert_eq!(request.serial_num, 1001);
        assert_eq!(request.name, "Virtual Panel");
        assert_eq!(request.max_pixels_wide, 3840);
        assert_eq!(request.max_pixels_high, 2160);
        assert_eq!(request.white_point, color::D65_WHITE);
    }
}
