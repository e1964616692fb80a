//! Delay: the cancelable suspend primitive.
//!
//! Every pause in the player goes through `Delay::sleep`. A single
//! `CancelHandle` aborts all pending and future sleeps, which is how the quit
//! key interrupts an animation mid-flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{Result, StoryError};

/// Trips every `Delay` created alongside it. Safe to move to the input thread.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

#[derive(Debug, Clone)]
pub struct Delay {
    /// Multiplier applied to every duration; 0 makes playback instant.
    scale: f64,
    cancel: watch::Receiver<bool>,
}

impl Delay {
    pub fn new(scale: f64) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let delay = Delay {
            scale: scale.max(0.0),
            cancel: rx,
        };
        (delay, CancelHandle(Arc::new(tx)))
    }

    pub fn scaled(&self, ms: u64) -> Duration {
        Duration::from_secs_f64(ms as f64 / 1000.0 * self.scale)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Suspend for `ms` milliseconds (scaled), or fail with `Cancelled`.
    pub async fn sleep(&mut self, ms: u64) -> Result<()> {
        if self.is_cancelled() {
            return Err(StoryError::Cancelled);
        }
        let duration = self.scaled(ms);
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            Ok(_) = self.cancel.wait_for(|cancelled| *cancelled) => Err(StoryError::Cancelled),
        }
    }

    /// Run `fut` with an upper bound of `ms`. `Ok(None)` means the bound elapsed.
    pub async fn race<F: Future>(&mut self, ms: u64, fut: F) -> Result<Option<F::Output>> {
        if self.is_cancelled() {
            return Err(StoryError::Cancelled);
        }
        let bound = self.scaled(ms);
        tokio::select! {
            out = fut => Ok(Some(out)),
            () = tokio::time::sleep(bound) => Ok(None),
            Ok(_) = self.cancel.wait_for(|cancelled| *cancelled) => Err(StoryError::Cancelled),
        }
    }

    /// Wait until the handle is tripped. Used alongside input reads.
    pub async fn cancelled(&mut self) {
        if self.cancel.wait_for(|cancelled| *cancelled).await.is_err() {
            // Handle dropped: cancellation can no longer happen.
            std::future::pending::<()>().await;
        }
    }
}
