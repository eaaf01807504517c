//! Recording fake of the display-server session for unit testing.
//!
//! Allows tests to observe the exact ordered call sequence a display sends,
//! script registration grants and failures, and inject termination notices
//! without a running display server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use vdisplay_core::{
    DisplayId, DisplayMode, EndpointId, RegistrationGrant, RegistrationRequest, SessionEndpoints,
    TerminationReason,
};

use super::{DisplaySession, SessionError, TerminationStream};

/// One recorded call against the fake session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Register(RegistrationRequest),
    PushSettings {
        display_id: DisplayId,
        modes: Vec<DisplayMode>,
        hi_dpi: bool,
    },
    Deregister {
        display_id: DisplayId,
    },
}

/// A fake display-server session that records every call.
///
/// `push_settings` contains an await point and tracks how many pushes were
/// ever in flight at once, so a display that failed to serialize its
/// callers shows up as `max_concurrent_pushes() > 1`.
pub struct RecordingSession {
    grant: RegistrationGrant,
    calls: Mutex<Vec<SessionCall>>,
    reject_register: Mutex<Option<String>>,
    reject_push: Mutex<Option<String>>,
    in_flight_pushes: AtomicU32,
    max_concurrent_pushes: AtomicU32,
    termination_tx: mpsc::UnboundedSender<TerminationReason>,
    termination_rx: Mutex<Option<TerminationStream>>,
}

impl RecordingSession {
    /// Creates a fake session with a default grant.
    pub fn new() -> Self {
        Self::with_grant(RegistrationGrant {
            display_id: DisplayId(1),
            endpoints: SessionEndpoints {
                server: EndpointId(10),
                proxy: EndpointId(11),
                client_handler: EndpointId(12),
            },
        })
    }

    /// Creates a fake session that answers registration with `grant`.
    pub fn with_grant(grant: RegistrationGrant) -> Self {
        let (termination_tx, termination_rx) = mpsc::unbounded_channel();
        Self {
            grant,
            calls: Mutex::new(Vec::new()),
            reject_register: Mutex::new(None),
            reject_push: Mutex::new(None),
            in_flight_pushes: AtomicU32::new(0),
            max_concurrent_pushes: AtomicU32::new(0),
            termination_tx,
            termination_rx: Mutex::new(Some(termination_rx)),
        }
    }

    /// Returns a snapshot of every call recorded so far, in order.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Makes the next `register` call fail with [`SessionError::Rejected`].
    pub fn reject_next_register(&self, reason: &str) {
        *self.reject_register.lock().expect("lock poisoned") = Some(reason.to_string());
    }

    /// Makes the next `push_settings` call fail with [`SessionError::Rejected`].
    pub fn reject_next_push(&self, reason: &str) {
        *self.reject_push.lock().expect("lock poisoned") = Some(reason.to_string());
    }

    /// Delivers a server-initiated termination notice, as if the display
    /// server ended the display's life.
    pub fn inject_termination(&self, reason: TerminationReason) {
        let _ = self.termination_tx.send(reason);
    }

    /// Highest number of `push_settings` calls ever in flight at once.
    /// A correctly serialized display never exceeds 1.
    pub fn max_concurrent_pushes(&self) -> u32 {
        self.max_concurrent_pushes.load(Ordering::SeqCst)
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DisplaySession for RecordingSession {
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationGrant, SessionError> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .push(SessionCall::Register(request));
        if let Some(reason) = self.reject_register.lock().expect("lock poisoned").take() {
            return Err(SessionError::Rejected(reason));
        }
        Ok(self.grant)
    }

    async fn push_settings(
        &self,
        display_id: DisplayId,
        modes: Vec<DisplayMode>,
        hi_dpi: bool,
    ) -> Result<(), SessionError> {
        let in_flight = self.in_flight_pushes.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_pushes
            .fetch_max(in_flight, Ordering::SeqCst);

        self.calls
            .lock()
            .expect("lock poisoned")
            .push(SessionCall::PushSettings {
                display_id,
                modes,
                hi_dpi,
            });

        // Yield so an unserialized second caller would overlap here and be
        // caught by max_concurrent_pushes.
        tokio::task::yield_now().await;

        let result = match self.reject_push.lock().expect("lock poisoned").take() {
            Some(reason) => Err(SessionError::Rejected(reason)),
            None => Ok(()),
        };
        self.in_flight_pushes.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn deregister(&self, display_id: DisplayId) -> Result<(), SessionError> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .push(SessionCall::Deregister { display_id });
        Ok(())
    }

    fn take_terminations(&self) -> Option<TerminationStream> {
        self.termination_rx.lock().expect("lock poisoned").take()
    }
}
