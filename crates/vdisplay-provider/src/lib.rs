//! vdisplay-provider library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and downstream consumers share the same module tree.
//!
//! # What does the provider do?
//!
//! The provider is the process that asks a remote display server to present
//! a *virtual display*: a software-defined monitor the host compositor
//! treats as real hardware. The provider:
//!
//! 1. Builds a [`DisplayDescriptor`] describing identity, physical size,
//!    pixel limits, and color gamut, plus the local callback configuration.
//! 2. Creates a [`VirtualDisplay`], which registers the descriptor with the
//!    display server over a [`DisplaySession`] and becomes live.
//! 3. Pushes mode-list/HiDPI changes with
//!    [`VirtualDisplay::apply_settings`]; the local view only ever reflects
//!    what the server has acknowledged.
//! 4. Handles end-of-life: whether the server terminates the display or the
//!    provider closes it, the descriptor's termination handler runs exactly
//!    once on the dispatch queue it was bound to.

/// Application layer: descriptor building and the live display lifecycle.
pub mod application;

/// Infrastructure layer: dispatch queue and display-server transports.
pub mod infrastructure;

pub use application::descriptor::{DisplayDescriptor, TerminationHandler, ValidationError};
pub use application::display::{ApplyError, CreateError, VirtualDisplay};
pub use infrastructure::dispatch::TaskQueue;
pub use infrastructure::session::mock::{RecordingSession, SessionCall};
pub use infrastructure::session::tcp::TcpDisplaySession;
pub use infrastructure::session::{DisplaySession, SessionError, TerminationStream};
