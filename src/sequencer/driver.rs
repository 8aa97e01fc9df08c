//! Drivers
//!
//! A driver decides *when* the sequencer advances. Exactly one driver
//! runs per sequencer:
//!
//! - [`AutoplayDriver`] walks the delay table on timers.
//! - [`InteractiveDriver`] advances once per debounced burst of downward
//!   input received from the [`InputRouter`](super::input::InputRouter).
//!
//! Both stop once the intro completes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::schema::DriveMode;
use crate::observability::Event;

use super::engine::Sequencer;
use super::script::STEP_COUNT;

/// Why a driver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The terminal step ran.
    Completed,
    /// The input source closed before completion.
    InputClosed,
    /// The step pointer moved underneath the driver (e.g. a reset).
    Superseded,
    /// The sequencer was shut down.
    Cancelled,
}

impl StopReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InputClosed => "input_closed",
            Self::Superseded => "superseded",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Summary of one driver run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveReport {
    pub mode: DriveMode,
    pub steps_fired: usize,
    pub dropped: usize,
    pub reason: StopReason,
    /// Time from driver start to stop.
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Strategy that advances a sequencer.
#[async_trait]
pub trait Driver: Send {
    /// Mode this driver implements.
    fn mode(&self) -> DriveMode;

    /// Drives `sequencer` until completion, cancellation or end of input.
    async fn run(&mut self, sequencer: Arc<Sequencer>) -> DriveReport;
}

impl std::fmt::Debug for dyn Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

/// Counters shared by both drivers.
struct RunTally {
    mode: DriveMode,
    started: Instant,
    steps_fired: usize,
    dropped: usize,
}

impl RunTally {
    fn start(mode: DriveMode, sequencer: &Sequencer) -> Self {
        info!(%mode, "driver started");
        sequencer.emitter().emit(Event::SequenceStarted {
            timestamp: Utc::now(),
            mode: mode.as_str().to_string(),
            steps: sequencer.script().len(),
        });
        Self {
            mode,
            started: Instant::now(),
            steps_fired: 0,
            dropped: 0,
        }
    }

    fn record(&mut self, fired: bool) {
        if fired {
            self.steps_fired += 1;
        } else {
            self.dropped += 1;
        }
    }

    fn finish(self, sequencer: &Sequencer, reason: StopReason) -> DriveReport {
        info!(
            mode = %self.mode,
            reason = reason.as_str(),
            steps_fired = self.steps_fired,
            dropped = self.dropped,
            "driver stopped"
        );
        sequencer.emitter().emit(Event::SequenceStopped {
            timestamp: Utc::now(),
            reason: reason.as_str().to_string(),
            steps_fired: self.steps_fired,
            dropped: self.dropped,
        });
        DriveReport {
            mode: self.mode,
            steps_fired: self.steps_fired,
            dropped: self.dropped,
            reason,
            elapsed: self.started.elapsed(),
        }
    }
}

// ============================================================================
// Autoplay
// ============================================================================

/// Fires the whole script once on timers.
///
/// Delay `n` (for `n < 12`) is waited before step `n`, counted from the
/// previous firing. If a lock is still held when a delay expires, the
/// driver waits for the release. The last delay is a settle wait after
/// completion.
#[derive(Debug, Clone)]
pub struct AutoplayDriver {
    delays: Vec<Duration>,
}

impl AutoplayDriver {
    #[must_use]
    pub const fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }
}

#[async_trait]
impl Driver for AutoplayDriver {
    fn mode(&self) -> DriveMode {
        DriveMode::Autoplay
    }

    async fn run(&mut self, sequencer: Arc<Sequencer>) -> DriveReport {
        let cancel = sequencer.cancellation_token().clone();
        let mut tally = RunTally::start(DriveMode::Autoplay, &sequencer);
        let mut last_fire = Instant::now();

        for (step, delay) in self.delays.iter().copied().enumerate().take(STEP_COUNT) {
            tokio::select! {
                () = cancel.cancelled() => return tally.finish(&sequencer, StopReason::Cancelled),
                () = tokio::time::sleep_until(last_fire + delay) => {}
            }
            tokio::select! {
                () = cancel.cancelled() => return tally.finish(&sequencer, StopReason::Cancelled),
                () = sequencer.wait_idle() => {}
            }

            if sequencer.is_complete() {
                break;
            }
            if sequencer.current_step() != step {
                debug!(
                    expected = step,
                    actual = sequencer.current_step(),
                    "step pointer moved; autoplay stops"
                );
                return tally.finish(&sequencer, StopReason::Superseded);
            }

            let outcome = sequencer.advance();
            tally.record(outcome.fired());
            last_fire = Instant::now();
        }

        if !sequencer.is_complete() {
            return tally.finish(&sequencer, StopReason::Superseded);
        }

        if let Some(settle) = self.delays.get(STEP_COUNT).copied() {
            tokio::select! {
                () = cancel.cancelled() => return tally.finish(&sequencer, StopReason::Cancelled),
                () = tokio::time::sleep(settle) => {}
            }
        }
        tally.finish(&sequencer, StopReason::Completed)
    }
}

// ============================================================================
// Interactive
// ============================================================================

/// A qualifying downward input, sent by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nudge;

/// Advances one step per burst of downward input.
///
/// Nudges arriving within `debounce` of each other collapse into one
/// advance request, issued `debounce` after the last nudge of the burst.
/// Requests made while a lock is held are dropped, not queued.
#[derive(Debug)]
pub struct InteractiveDriver {
    nudges: mpsc::Receiver<Nudge>,
    debounce: Duration,
}

impl InteractiveDriver {
    #[must_use]
    pub const fn new(nudges: mpsc::Receiver<Nudge>, debounce: Duration) -> Self {
        Self { nudges, debounce }
    }

    /// Creates a driver and the sender the router feeds it through.
    #[must_use]
    pub fn channel(debounce: Duration) -> (mpsc::Sender<Nudge>, Self) {
        let (tx, rx) = mpsc::channel(64);
        (tx, Self::new(rx, debounce))
    }
}

#[async_trait]
impl Driver for InteractiveDriver {
    fn mode(&self) -> DriveMode {
        DriveMode::Interactive
    }

    async fn run(&mut self, sequencer: Arc<Sequencer>) -> DriveReport {
        let cancel = sequencer.cancellation_token().clone();
        let mut tally = RunTally::start(DriveMode::Interactive, &sequencer);

        loop {
            if sequencer.is_complete() {
                return tally.finish(&sequencer, StopReason::Completed);
            }

            tokio::select! {
                () = cancel.cancelled() => return tally.finish(&sequencer, StopReason::Cancelled),
                nudge = self.nudges.recv() => {
                    if nudge.is_none() {
                        return tally.finish(&sequencer, StopReason::InputClosed);
                    }
                }
            }

            // Trailing debounce: wait for a quiet period
            let mut closed = false;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => return tally.finish(&sequencer, StopReason::Cancelled),
                    () = tokio::time::sleep(self.debounce) => break,
                    nudge = self.nudges.recv(), if !closed => {
                        closed = nudge.is_none();
                    }
                }
            }

            let outcome = sequencer.advance();
            debug!(?outcome, "interactive advance");
            tally.record(outcome.fired());
        }
    }
}
