//! All provider ↔ display-server session message types.
//!
//! The session is a narrow request/reply protocol with one asynchronous
//! server-to-provider notification:
//!
//! ```text
//! Provider                              Display server
//! ────────                              ──────────────
//! Register(request)          ──►
//!                            ◄──        Registered(grant) | Rejected
//! PushSettings{id, modes}    ──►
//!                            ◄──        SettingsAck | Rejected
//! Deregister{id}             ──►
//!                            ◄──        DeregisterAck
//!                            ◄──        Terminated{id, reason}   (any time)
//! ```
//!
//! `Terminated` is delivered at most once per display and may arrive while
//! a request is in flight; the transport layer routes it out of band.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::color::Chromaticity;
use crate::domain::geometry::SizeMillimeters;
use crate::domain::mode::DisplayMode;

/// Unique identifier for one provider session, generated by the provider.
/// Used only for logging and diagnostics; it never crosses the wire.
pub type SessionId = Uuid;

/// Server-assigned runtime identifier of a live display.
///
/// Valid from registration acknowledgment until termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display-{}", self.0)
    }
}

/// Opaque identifier of one communication endpoint within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(pub u32);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint-{}", self.0)
    }
}

/// The three endpoint identifiers the server assigns at registration.
///
/// The triple identifies one session as a whole. The individual roles are
/// server-internal; providers treat the triple as opaque and owned
/// exclusively by the display they were granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoints {
    pub server: EndpointId,
    pub proxy: EndpointId,
    pub client_handler: EndpointId,
}

/// Registration payload: every descriptor field that crosses the wire.
///
/// The execution context and termination handler are purely provider-local
/// and are never transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Device-identity triple presented to the host.
    pub vendor_id: u32,
    pub product_id: u32,
    pub serial_num: u32,
    /// Human-readable label shown in display preferences.
    pub name: String,
    /// Physical panel size; the host derives reported DPI from it.
    pub size_in_millimeters: SizeMillimeters,
    /// Upper bound on the width of any mode later applied to the display.
    pub max_pixels_wide: u32,
    /// Upper bound on the height of any mode later applied to the display.
    pub max_pixels_high: u32,
    pub red_primary: Chromaticity,
    pub green_primary: Chromaticity,
    pub blue_primary: Chromaticity,
    pub white_point: Chromaticity,
}

/// Server acknowledgment of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationGrant {
    pub display_id: DisplayId,
    pub endpoints: SessionEndpoints,
}

/// Why a live display was terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The server closed the display (e.g. operator action or shutdown).
    ServerClosed,
    /// The server reclaimed the display's resources.
    ResourceReclaimed,
    /// The session failed fatally; the carried text is diagnostic only.
    SessionFailure(String),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::ServerClosed => write!(f, "server closed the display"),
            TerminationReason::ResourceReclaimed => write!(f, "server reclaimed resources"),
            TerminationReason::SessionFailure(detail) => write!(f, "session failure: {detail}"),
        }
    }
}

/// Requests sent from the provider to the display server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProviderMessage {
    /// Register a new virtual display described by the payload.
    Register(RegistrationRequest),
    /// Replace the mode list and HiDPI flag of a live display.
    PushSettings {
        display_id: DisplayId,
        modes: Vec<DisplayMode>,
        hi_dpi: bool,
    },
    /// Tear down a live display.
    Deregister { display_id: DisplayId },
}

/// Replies and notifications sent from the display server to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Reply to `Register`: the display is live.
    Registered(RegistrationGrant),
    /// Reply to any request the server refuses.
    Rejected { reason: String },
    /// Reply to `PushSettings`: the new settings are in effect.
    SettingsAck { display_id: DisplayId },
    /// Reply to `Deregister`: the display is gone.
    DeregisterAck { display_id: DisplayId },
    /// Asynchronous notification: the server ended the display's life.
    /// Sent at most once per display, possibly while a request is in flight.
    Terminated {
        display_id: DisplayId,
        reason: TerminationReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_id_formats_for_logging() {
        assert_eq!(DisplayId(7).to_string(), "display-7");
        assert_eq!(EndpointId(3).to_string(), "endpoint-3");
    }

    #[test]
    fn test_termination_reason_formats_detail() {
        let reason = TerminationReason::SessionFailure("transport reset".into());
        assert_eq!(reason.to_string(), "session failure: transport reset");
    }
}
