//! Cancellable lifetime of one in-flight streamed response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::error::{Result, TurnstileError};

/// Handle over one in-flight stream.
///
/// `cancel` is cooperative and best-effort: it asks the transport to stop
/// delivering further events. Downstream consumers must treat "no more
/// events arrive" as a valid outcome.
pub trait StreamingHandle: Send + Sync {
    /// Request termination of the stream. Idempotent.
    fn cancel(&self) -> Result<()>;

    /// Whether cancellation has been requested. Safe from any thread.
    fn is_cancelled(&self) -> bool;
}

/// Default handle for transports that cannot cancel mid-stream.
#[derive(Debug, Default)]
pub struct UnsupportedStreamingHandle;

impl StreamingHandle for UnsupportedStreamingHandle {
    fn cancel(&self) -> Result<()> {
        Err(TurnstileError::UnsupportedOperation(
            "this stream cannot be cancelled; the adapter must use the \
             context-carrying partial-response callbacks to support cancellation"
                .to_string(),
        ))
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Cancellation-capable handle backed by an atomic flag and a one-shot
/// signal into the stream's select loop.
#[derive(Debug)]
pub struct CancellationHandle {
    cancelled: AtomicBool,
    signal: Mutex<Option<oneshot::Sender<()>>>,
}

impl CancellationHandle {
    /// Create a handle and the receiver its owner selects on.
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                cancelled: AtomicBool::new(false),
                signal: Mutex::new(Some(tx)),
            },
            rx,
        )
    }
}

impl StreamingHandle for CancellationHandle {
    fn cancel(&self) -> Result<()> {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let sender = self.signal.lock().expect("cancellation signal lock").take();
            if let Some(tx) = sender {
                // The receiver may already be gone if the stream finished.
                let _ = tx.send(());
            }
        }
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
