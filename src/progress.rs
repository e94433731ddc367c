//! Progress reporting and cancellation for long-running training.
//!
//! Trainers take an injected [`ProgressListener`] instead of writing to a
//! process-wide singleton; drivers that do not care pass [`NullProgress`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Capability for observing training progress.
///
/// Implementations must be cheap: `progress` is called from the hot
/// training loop every `interrupt_every` iterations.
pub trait ProgressListener: Send + Sync {
    /// A new training phase has started (e.g. an epoch or a growth step).
    fn phase(&self, _name: &str) {}

    /// `iteration` of `total` iterations of the current phase completed.
    fn progress(&self, _iteration: usize, _total: usize) {}
}

/// A listener that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressListener for NullProgress {}

/// Cooperative cancellation flag checked at the head of the outer
/// training loop.
///
/// Cloning shares the flag; any clone can cancel. The worker barrier of
/// the parallel update phase remains a hard synchronization point:
/// cancellation is only observed between iterations, never mid-update.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once `cancel` has been called on any clone.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
