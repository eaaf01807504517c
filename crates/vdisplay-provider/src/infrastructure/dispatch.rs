//! Serialized task queue for callback delivery.
//!
//! # Why a serial queue?
//!
//! The termination handler must run on a known execution context, one task
//! at a time, in submission order — never on whatever thread happened to
//! receive the server's notice (that may be the transport's I/O task, which
//! must not be blocked or reentered). A single drain task pulling from a
//! FIFO channel gives exactly those semantics on top of a multi-threaded
//! runtime.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A serialized FIFO task queue.
///
/// `TaskQueue` is a clonable submit handle; the queue itself is a drain
/// loop spawned on the current runtime. Tasks run one at a time, in
/// submission order, even though the runtime is multi-threaded. The loop
/// ends when every handle has been dropped.
///
/// The queue is owned by the provider's environment. A display bound to a
/// queue only ever submits work to it.
#[derive(Clone)]
pub struct TaskQueue {
    label: Arc<str>,
    tx: mpsc::UnboundedSender<Task>,
}

impl TaskQueue {
    /// Creates a queue and spawns its drain loop on the current runtime.
    ///
    /// The label appears in log lines only.
    pub fn new(label: impl Into<String>) -> Self {
        let label: Arc<str> = label.into().into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();

        let drain_label = Arc::clone(&label);
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                task();
            }
            debug!(queue = %drain_label, "task queue closed");
        });

        Self { label, tx }
    }

    /// Submits a task to run after everything submitted before it.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(task)).is_err() {
            warn!(queue = %self.label, "task queue is gone; dropping task");
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
