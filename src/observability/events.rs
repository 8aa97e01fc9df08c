//! Structured event stream
//!
//! Discrete, typed events emitted while an intro plays. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted by the sequencer or its drivers.
///
/// Each variant is tagged with `"type"` when serialized so consumers can
/// dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A driver started playing the intro.
    SequenceStarted {
        /// When the driver started.
        timestamp: DateTime<Utc>,
        /// Driver mode (`"autoplay"` or `"interactive"`).
        mode: String,
        /// Number of steps in the script.
        steps: usize,
    },

    /// A step passed the guard and was executed.
    StepFired {
        /// When the step fired.
        timestamp: DateTime<Utc>,
        /// Step that fired.
        step: usize,
        /// Action name (e.g. `"strike_word"`).
        action: String,
        /// Step pointer after firing.
        next: usize,
        /// Lock held before the next step may fire.
        lock_ms: u64,
    },

    /// An advance request was dropped by the guard.
    TransitionDropped {
        /// When the request was dropped.
        timestamp: DateTime<Utc>,
        /// Step the pointer was at.
        step: usize,
        /// Why it was dropped (`"animating"` or `"complete"`).
        reason: String,
    },

    /// The terminal step ran; the page now scrolls normally.
    AnimationCompleted {
        /// When the intro completed.
        timestamp: DateTime<Utc>,
    },

    /// Scroll-spy moved the active menu link.
    SectionActivated {
        /// When the link changed.
        timestamp: DateTime<Utc>,
        /// Id of the newly active section, if any.
        section: Option<String>,
        /// Scroll position that caused the change.
        scroll_y: f64,
    },

    /// The sequencer returned to step 0.
    SequenceReset {
        /// When the reset happened.
        timestamp: DateTime<Utc>,
        /// New page-load epoch.
        epoch: u64,
    },

    /// A driver stopped.
    SequenceStopped {
        /// When the driver stopped.
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason.
        reason: String,
        /// Steps fired during the run.
        steps_fired: usize,
        /// Requests dropped by the guard during the run.
        dropped: usize,
    },
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// One JSONL record: the event's fields plus its position in the stream.
#[derive(Debug, Serialize)]
struct Record {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

/// Writes events as JSON lines, numbering them from 0.
///
/// Shared by the sequencer, its timer tasks and the driver, so writes are
/// serialized behind a mutex and flushed per line. A failed write is
/// dropped and never reaches the intro.
pub struct EventEmitter {
    sink: Mutex<BufWriter<Box<dyn Write + Send>>>,
    next: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("emitted", &self.event_count())
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    #[must_use]
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(BufWriter::new(sink)),
            next: AtomicU64::new(0),
        }
    }

    /// Interleaves events with log output on stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Counts events without writing them anywhere.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Truncates or creates the event log at `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from creating the file.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        std::fs::File::create(path).map(|file| Self::new(Box::new(file)))
    }

    /// Numbers and writes one event. The number is taken under the sink
    /// lock so lines always appear in sequence order.
    pub fn emit(&self, event: Event) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let record = Record {
            sequence: self.next.fetch_add(1, Ordering::SeqCst),
            event,
        };
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        let _ = writeln!(sink, "{line}").and_then(|()| sink.flush());
    }

    /// Events emitted so far, written or not.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
