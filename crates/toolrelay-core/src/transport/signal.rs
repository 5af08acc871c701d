//! Shared close flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A one-way latch shared by both ends of a channel.
///
/// Cloning shares the same underlying state.
#[derive(Clone)]
pub struct CloseSignal {
    inner: Arc<CloseSignalInner>,
}

struct CloseSignalInner {
    closed: AtomicBool,
    notify: Notify,
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CloseSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CloseSignalInner {
                closed: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Trip the latch. Returns `true` for the call that actually closed it.
    pub fn close(&self) -> bool {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
            true
        } else {
            false
        }
    }

    /// Wait until the latch is tripped
    pub async fn closed(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent close is not missed
        notified.as_mut().enable();

        if self.is_closed() {
            return;
        }

        notified.await;
    }
}

impl std::fmt::Debug for CloseSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseSignal")
            .field("closed", &self.is_closed())
            .finish()
    }
}
