//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag checked at block boundaries.
///
/// Clones share the underlying flag, so a host can hand one clone to a
/// signal handler and another to the running session. The session never
/// stops mid-block; it finishes the block in flight and then returns with
/// [`Outcome::Cancelled`](crate::Outcome::Cancelled), keeping whatever was
/// already written.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop at the next block boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
