//! # vdisplay-core
//!
//! Shared library for the virtual display provider containing the domain
//! value types and the display-server session protocol.
//!
//! This crate is used by the provider library and by display-server
//! implementations. It has zero dependencies on OS APIs, async runtimes, or
//! network sockets.
//!
//! # Architecture overview
//!
//! A *virtual display* is a software-defined monitor: the host compositor
//! treats it as a real output device, but it is backed by a remote display
//! server process instead of hardware. The provider builds a descriptor
//! (identity, geometry, color gamut), registers it with the server over a
//! session, and thereafter pushes mode/HiDPI changes and handles the
//! server's asynchronous termination notice.
//!
//! This crate defines the two halves both sides must agree on:
//!
//! - **`domain`** – Pure value types with no infrastructure dependencies:
//!   display modes, settings, chromaticity coordinates, physical size.
//!
//! - **`protocol`** – How the provider and the display server talk: typed
//!   request/reply/notification messages and the binary frame codec that
//!   carries them.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `vdisplay_core::DisplayMode` instead of `vdisplay_core::domain::mode::DisplayMode`.
pub use domain::color::Chromaticity;
pub use domain::geometry::SizeMillimeters;
pub use domain::mode::{DisplayMode, ModeError};
pub use domain::settings::DisplaySettings;
pub use protocol::codec::{decode_frame, encode_frame, ProtocolError};
pub use protocol::messages::{
    DisplayId, EndpointId, ProviderMessage, RegistrationGrant, RegistrationRequest, ServerMessage,
    SessionEndpoints, SessionId, TerminationReason,
};
