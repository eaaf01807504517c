//! Session abstraction over the provider ↔ display-server channel.
//!
//! The display never talks to a socket directly; it is handed a
//! [`DisplaySession`] at creation. One session backs exactly one display —
//! the endpoint triple the server grants is owned by that display alone.
//! Implementations:
//!
//! - [`tcp::TcpDisplaySession`] – the real transport over a TCP connection.
//! - [`mock::RecordingSession`] – an in-memory fake for tests.

pub mod mock;
pub mod tcp;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use vdisplay_core::{
    DisplayId, DisplayMode, ProtocolError, RegistrationGrant, RegistrationRequest,
    TerminationReason,
};

/// Errors surfaced by a display-server session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The TCP connection to the display server could not be established.
    #[error("failed to connect to display server at {addr}: {source}")]
    ConnectFailed {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on the established session.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server refused the request.
    #[error("request rejected by display server: {0}")]
    Rejected(String),

    /// The session ended before the request could complete.
    #[error("session closed by display server")]
    Closed,

    /// The session's termination stream was already claimed — the session
    /// is bound to another display.
    #[error("session termination stream already claimed")]
    AlreadyBound,

    /// The server answered with a reply that does not match the request.
    #[error("unexpected reply from display server")]
    UnexpectedReply,
}

/// Stream of server-initiated termination notices for the session's display.
pub type TerminationStream = mpsc::UnboundedReceiver<TerminationReason>;

/// The channel a virtual display uses to talk to its display server.
///
/// Injected into display creation as a dependency so tests can substitute
/// a fake. Implementations must answer requests in submission order; the
/// display serializes its own calls, so a session never sees two requests
/// from one display in flight at once.
#[async_trait]
pub trait DisplaySession: Send + Sync {
    /// Registers a display and returns the server's grant.
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationGrant, SessionError>;

    /// Replaces the display's mode list and HiDPI flag. Returns once the
    /// server has acknowledged the new settings.
    async fn push_settings(
        &self,
        display_id: DisplayId,
        modes: Vec<DisplayMode>,
        hi_dpi: bool,
    ) -> Result<(), SessionError>;

    /// Tears the display down on the server.
    async fn deregister(&self, display_id: DisplayId) -> Result<(), SessionError>;

    /// Claims the termination notice stream.
    ///
    /// The stream has a single consumer: the first call wins and every
    /// later call returns `None`, which display creation treats as the
    /// session being bound to another display.
    fn take_terminations(&self) -> Option<TerminationStream>;
}
