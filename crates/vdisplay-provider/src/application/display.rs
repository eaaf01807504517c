//! VirtualDisplay: the live display object and its lifecycle.
//!
//! # Lifecycle
//!
//! ```text
//! DisplayDescriptor ──create──► Live ──────► Terminated
//!                      │                         ▲
//!                      └─ validation or          │ server notice, close(),
//!                         registration error     │ or drop — whichever
//!                         (no object, no         │ comes first wins;
//!                         server-side state)     │ the rest are no-ops
//! ```
//!
//! Creation is atomic from the caller's point of view: it either returns a
//! live display whose identity fields mirror the descriptor, or an error
//! with no registration left behind on the server.
//!
//! # Concurrency
//!
//! Two locks with distinct jobs:
//!
//! - `op_lock` (async) serializes the check-and-act regions of
//!   `apply_settings` and the termination transition, including their RPC
//!   round-trips. The server therefore sees settings pushes from one
//!   display in a single total order, and a push can never succeed against
//!   a session that is concurrently being torn down.
//! - `state` (sync) guards the mirrored `modes`/`hi_dpi`/`terminated`
//!   values so accessors stay synchronous. The mirror is written only after
//!   the server acknowledged, so readers never observe torn state.
//!
//! The termination handler is never invoked on the thread that received the
//! server's notice; it is submitted to the descriptor's dispatch queue.

use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use vdisplay_core::{
    Chromaticity, DisplayId, DisplayMode, DisplaySettings, RegistrationRequest, SessionEndpoints,
    SizeMillimeters, TerminationReason,
};

use crate::application::descriptor::{DisplayDescriptor, TerminationHandler, ValidationError};
use crate::infrastructure::dispatch::TaskQueue;
use crate::infrastructure::session::{DisplaySession, SessionError};

/// Errors that can occur when creating a virtual display.
#[derive(Debug, Error)]
pub enum CreateError {
    /// The descriptor is malformed; nothing was sent to the server.
    #[error("invalid descriptor: {0}")]
    Validation(#[from] ValidationError),

    /// The session failed or the server refused the registration.
    #[error("registration failed: {0}")]
    Session(#[from] SessionError),
}

/// Errors that can occur when applying settings to a live display.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The display's life has ended; no RPC was attempted.
    #[error("display has terminated")]
    DisplayTerminated,

    /// Applied settings must expose at least one mode.
    #[error("settings must contain at least one mode")]
    EmptyModeList,

    /// A mode exceeds the pixel bounds declared in the descriptor.
    #[error("mode {mode} exceeds display limits of {max_pixels_wide}x{max_pixels_high}")]
    ModeExceedsLimits {
        mode: DisplayMode,
        max_pixels_wide: u32,
        max_pixels_high: u32,
    },

    /// The session failed or the server refused the settings push.
    #[error("settings push failed: {0}")]
    Session(#[from] SessionError),
}

/// Mirror of the last server-acknowledged state plus the terminated flag.
struct DisplayState {
    terminated: bool,
    modes: Vec<DisplayMode>,
    hi_dpi: bool,
    termination_handler: Option<TerminationHandler>,
}

struct Inner {
    /// Read-only copy of the descriptor's wire fields.
    attrs: RegistrationRequest,
    display_id: DisplayId,
    endpoints: SessionEndpoints,
    session: Arc<dyn DisplaySession>,
    queue: Option<TaskQueue>,
    /// Serializes apply/terminate regions, including their RPC round-trips.
    op_lock: Mutex<()>,
    state: StdMutex<DisplayState>,
}

impl Inner {
    /// Runs the one terminal transition. Idempotent: the first caller wins,
    /// every later signal is suppressed without re-delivering the handler.
    ///
    /// `reason` is `Some` for server-initiated termination and `None` for
    /// provider-initiated teardown; only the latter deregisters, since a
    /// server-terminated display is already gone on the server.
    async fn terminate(&self, reason: Option<TerminationReason>) -> Result<(), SessionError> {
        let _guard = self.op_lock.lock().await;

        let handler = {
            let mut state = self.state.lock().expect("display state lock poisoned");
            if state.terminated {
                debug!(
                    display = %self.display_id,
                    "termination signal for an already-terminated display; suppressed"
                );
                return Ok(());
            }
            state.terminated = true;
            state.termination_handler.take()
        };

        match &reason {
            Some(reason) => {
                info!(display = %self.display_id, %reason, "display terminated by server");
            }
            None => info!(display = %self.display_id, "display closed by provider"),
        }

        // Deliver on the descriptor's queue, never on the thread that
        // received the server's notice.
        if let (Some(handler), Some(queue)) = (handler, &self.queue) {
            queue.submit(handler);
        }

        if reason.is_none() {
            self.session.deregister(self.display_id).await
        } else {
            Ok(())
        }
    }
}

/// A live virtual display registered with a remote display server.
///
/// Created from a [`DisplayDescriptor`] via [`VirtualDisplay::create`].
/// Identity and physical attributes are read-only for the object's
/// lifetime; `modes` and `hi_dpi` mirror the last settings the server
/// acknowledged. Dropping the display (or calling [`close`](Self::close))
/// runs the same termination handshake a server-initiated notice does.
pub struct VirtualDisplay {
    inner: Arc<Inner>,
    close_tx: mpsc::UnboundedSender<()>,
}

impl std::fmt::Debug for VirtualDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDisplay")
            .field("display_id", &self.inner.display_id)
            .finish_non_exhaustive()
    }
}

impl VirtualDisplay {
    /// Validates the descriptor, registers it with the display server, and
    /// returns the live display.
    ///
    /// The descriptor is consumed: a failed creation returns an error and
    /// the caller rebuilds a descriptor for another attempt; a successful
    /// one transfers the callback configuration into the display.
    ///
    /// # Errors
    ///
    /// [`CreateError::Validation`] if the descriptor is malformed (nothing
    /// was sent), or [`CreateError::Session`] if the session failed or the
    /// server refused. On every error path there is no residual
    /// registration on the server.
    pub async fn create(
        descriptor: DisplayDescriptor,
        session: Arc<dyn DisplaySession>,
    ) -> Result<Self, CreateError> {
        descriptor.validate()?;
        let (request, queue, termination_handler) = descriptor.into_parts();
        let attrs = request.clone();

        let grant = session.register(request).await?;

        let Some(terminations) = session.take_terminations() else {
            // A session whose termination stream is already claimed backed
            // another display; roll the registration back so nothing leaks.
            if let Err(e) = session.deregister(grant.display_id).await {
                warn!(display = %grant.display_id, error = %e, "rollback deregister failed");
            }
            return Err(CreateError::Session(SessionError::AlreadyBound));
        };

        let inner = Arc::new(Inner {
            attrs,
            display_id: grant.display_id,
            endpoints: grant.endpoints,
            session,
            queue,
            op_lock: Mutex::new(()),
            state: StdMutex::new(DisplayState {
                terminated: false,
                modes: Vec::new(),
                hi_dpi: false,
                termination_handler,
            }),
        });

        let (close_tx, close_rx) = mpsc::unbounded_channel();
        tokio::spawn(monitor_lifecycle(Arc::clone(&inner), terminations, close_rx));

        info!(display = %grant.display_id, "virtual display registered");
        Ok(Self { inner, close_tx })
    }

    /// Replaces the display's mode list and HiDPI flag.
    ///
    /// The local mirror is updated only after the server acknowledges, so a
    /// failed call leaves the mirrored state exactly as it was. Concurrent
    /// calls on the same display are fully serialized.
    ///
    /// # Errors
    ///
    /// [`ApplyError::DisplayTerminated`] after the display's life ended,
    /// [`ApplyError::EmptyModeList`] / [`ApplyError::ModeExceedsLimits`]
    /// for locally rejected settings (no RPC attempted), or
    /// [`ApplyError::Session`] when the round-trip fails.
    pub async fn apply_settings(&self, settings: &DisplaySettings) -> Result<(), ApplyError> {
        let inner = &self.inner;
        let _guard = inner.op_lock.lock().await;

        {
            let state = inner.state.lock().expect("display state lock poisoned");
            if state.terminated {
                return Err(ApplyError::DisplayTerminated);
            }
        }
        if settings.modes.is_empty() {
            return Err(ApplyError::EmptyModeList);
        }
        for mode in &settings.modes {
            if mode.width() > inner.attrs.max_pixels_wide
                || mode.height() > inner.attrs.max_pixels_high
            {
                return Err(ApplyError::ModeExceedsLimits {
                    mode: *mode,
                    max_pixels_wide: inner.attrs.max_pixels_wide,
                    max_pixels_high: inner.attrs.max_pixels_high,
                });
            }
        }

        inner
            .session
            .push_settings(inner.display_id, settings.modes.clone(), settings.hi_dpi)
            .await?;

        let mut state = inner.state.lock().expect("display state lock poisoned");
        state.modes = settings.modes.clone();
        state.hi_dpi = settings.hi_dpi;
        debug!(
            display = %inner.display_id,
            modes = state.modes.len(),
            hi_dpi = state.hi_dpi,
            "settings applied"
        );
        Ok(())
    }

    /// Provider-initiated teardown.
    ///
    /// Marks the display terminated, schedules the termination handler on
    /// its dispatch queue (exactly once across all end-of-life paths), and
    /// deregisters from the server. Calling it on an already-terminated
    /// display is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the deregister failure, if any. Local teardown has completed
    /// by then and the display is inert either way.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.inner.terminate(None).await
    }

    // ── Read-only attributes ──────────────────────────────────────────────

    pub fn vendor_id(&self) -> u32 {
        self.inner.attrs.vendor_id
    }

    pub fn product_id(&self) -> u32 {
        self.inner.attrs.product_id
    }

    pub fn serial_num(&self) -> u32 {
        self.inner.attrs.serial_num
    }

    pub fn name(&self) -> &str {
        &self.inner.attrs.name
    }

    pub fn size_in_millimeters(&self) -> SizeMillimeters {
        self.inner.attrs.size_in_millimeters
    }

    pub fn max_pixels_wide(&self) -> u32 {
        self.inner.attrs.max_pixels_wide
    }

    pub fn max_pixels_high(&self) -> u32 {
        self.inner.attrs.max_pixels_high
    }

    pub fn red_primary(&self) -> Chromaticity {
        self.inner.attrs.red_primary
    }

    pub fn green_primary(&self) -> Chromaticity {
        self.inner.attrs.green_primary
    }

    pub fn blue_primary(&self) -> Chromaticity {
        self.inner.attrs.blue_primary
    }

    pub fn white_point(&self) -> Chromaticity {
        self.inner.attrs.white_point
    }

    /// Server-assigned runtime identifier, valid while the display lives.
    pub fn display_id(&self) -> DisplayId {
        self.inner.display_id
    }

    /// The session's endpoint triple, owned exclusively by this display.
    pub fn endpoints(&self) -> SessionEndpoints {
        self.inner.endpoints
    }

    /// Snapshot of the last server-acknowledged mode list. Empty until the
    /// first successful [`apply_settings`](Self::apply_settings).
    pub fn modes(&self) -> Vec<DisplayMode> {
        self.inner
            .state
            .lock()
            .expect("display state lock poisoned")
            .modes
            .clone()
    }

    /// Last server-acknowledged HiDPI flag.
    pub fn hi_dpi(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("display state lock poisoned")
            .hi_dpi
    }

    pub fn is_terminated(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("display state lock poisoned")
            .terminated
    }
}

impl Drop for VirtualDisplay {
    fn drop(&mut self) {
        // Route dealloc through the same path as close(): the lifecycle
        // monitor performs the deregister and handler delivery. If the
        // display already terminated this resolves to a suppressed no-op.
        let _ = self.close_tx.send(());
    }
}

/// Waits for whichever end-of-life signal arrives first — a server notice
/// or the provider's close/drop signal — and runs the matching teardown.
/// Exits after the first transition; `Inner::terminate` suppresses any
/// signal that races in behind it.
async fn monitor_lifecycle(
    inner: Arc<Inner>,
    mut terminations: mpsc::UnboundedReceiver<TerminationReason>,
    mut close: mpsc::UnboundedReceiver<()>,
) {
    tokio::select! {
        notice = terminations.recv() => {
            let reason = notice.unwrap_or_else(|| {
                // The session dropped its sender without a notice: the
                // transport is gone, which ends the display all the same.
                TerminationReason::SessionFailure("session channel closed".to_string())
            });
            if let Err(e) = inner.terminate(Some(reason)).await {
                warn!(display = %inner.display_id, error = %e, "termination cleanup failed");
            }
        }
        signal = close.recv() => {
            if signal.is_some() {
                if let Err(e) = inner.terminate(None).await {
                    warn!(display = %inner.display_id, error = %e, "deregister during teardown failed");
                }
            }
        }
    }
}
