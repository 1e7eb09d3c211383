//! Cooperative cancellation shared between a driver and its steps

use crate::error::{MigrationError, Result};
use std::sync::Arc;
use tokio::sync::watch;

/// A cancellation signal checked between discrete file operations.
///
/// Cloning yields a handle to the same signal. Steps call [`check`](Self::check)
/// between items and bail out with [`MigrationError::Cancelled`].
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<CancellationState>,
}

#[derive(Debug)]
struct CancellationState {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            state: Arc::new(CancellationState { tx, rx }),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        let _ = self.state.tx.send(true);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.state.rx.borrow()
    }

    /// Return `Err(Cancelled)` once cancellation has been requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MigrationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.state.rx.clone();
        // The sender lives as long as `self`, so this only ends once cancelled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
