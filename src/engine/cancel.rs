use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Broadcast cancellation shared by every worker of a run.
///
/// The flag makes cancellation sticky, so receivers subscribed after the
/// signal was sent still observe it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: broadcast::Sender<()>,
    cancelled: Arc<AtomicBool>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Returns false when no receiver was listening to be woken.
    pub fn cancel(&self) -> bool {
        self.cancelled.store(true, Ordering::Relaxed);
        self.sender.send(()).is_ok()
    }

    /// Cancel the run once `timeout` elapses. Requires a tokio runtime.
    pub fn cancel_after(&self, timeout: Duration) -> tokio::task::JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!(timeout_secs = timeout.as_secs_f64(), "run deadline reached, cancelling");
            handle.cancel();
        })
    }
}

pub(crate) fn cancel_requested(cancel_rx: &mut broadcast::Receiver<()>) -> bool {
    match cancel_rx.try_recv() {
        Ok(_) => true,
        Err(TryRecvError::Lagged(_)) => true,
        Err(TryRecvError::Closed) => true,
        Err(TryRecvError::Empty) => false,
    }
}
