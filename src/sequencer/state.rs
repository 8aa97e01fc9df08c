//! Sequencer state
//!
//! Lock-free atomic state shared between the sequencer, its timer tasks
//! and the drivers: step pointer, `animating` guard, `complete` flag and
//! the page-load epoch that invalidates stale timer tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Atomic state of one sequencer.
pub struct SequencerState {
    /// Current step (0-based), advanced via CAS
    step: AtomicUsize,
    /// Drop-request guard held while a transition is in flight
    animating: AtomicBool,
    /// One-way flag set by the completion action
    complete: AtomicBool,
    /// Bumped by every reset
    epoch: AtomicU64,
    /// Woken whenever the guard is released
    idle: Notify,
}

impl SequencerState {
    /// Creates a state at step 0, idle and incomplete.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: AtomicUsize::new(0),
            animating: AtomicBool::new(false),
            complete: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            idle: Notify::new(),
        }
    }

    /// Returns the current step.
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.step.load(Ordering::SeqCst)
    }

    /// Returns whether a transition is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animating.load(Ordering::SeqCst)
    }

    /// Returns whether the completion action has run.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }

    /// Returns the current page-load epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Attempts to take the guard (`false → true`).
    ///
    /// Returns `true` if this call took it.
    pub fn try_begin(&self) -> bool {
        self.animating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Attempts to move the step pointer from `from` to `to`.
    pub fn try_advance(&self, from: usize, to: usize) -> bool {
        self.step
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Releases the guard if `epoch` is still current.
    ///
    /// Returns `false` for a release scheduled before the last reset.
    pub fn release(&self, epoch: u64) -> bool {
        if self.epoch() != epoch {
            return false;
        }
        self.animating.store(false, Ordering::SeqCst);
        self.idle.notify_waiters();
        true
    }

    /// Sets the completion flag.
    pub fn mark_complete(&self) {
        self.complete.store(true, Ordering::SeqCst);
    }

    /// Starts a new page-load lifetime and returns its epoch.
    pub fn reset(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.step.store(0, Ordering::SeqCst);
        self.complete.store(false, Ordering::SeqCst);
        self.animating.store(false, Ordering::SeqCst);
        self.idle.notify_waiters();
        epoch
    }

    /// Waits until the guard is free.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_animating() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for SequencerState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SequencerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencerState")
            .field("step", &self.current_step())
            .field("animating", &self.is_animating())
            .field("complete", &self.is_complete())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}
