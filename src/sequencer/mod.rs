//! Step sequencer
//!
//! A linear state machine over the intro's step script. One
//! [`Sequencer`] owns the step pointer and its guard; a [`Driver`]
//! (autoplay or interactive) decides when to advance; the
//! [`TransitionExecutor`] mutates the page; [`ScrollSpy`] takes over once
//! the intro completes.

pub mod driver;
pub mod engine;
pub mod executor;
pub mod input;
pub mod script;
pub mod session;
pub mod spy;
pub mod state;

pub use driver::{AutoplayDriver, DriveReport, Driver, InteractiveDriver, Nudge, StopReason};
pub use engine::{AdvanceOutcome, DropReason, Sequencer};
pub use executor::{Deferred, DeferredEffect, Transition, TransitionExecutor};
pub use input::{InputDisposition, InputEvent, InputRouter};
pub use script::{Action, LockKind, STEP_COUNT, ScriptStep, StepScript, TERMINAL_STEP};
pub use session::IntroSession;
pub use spy::{ScrollSpy, SpyReading, resolve};
pub use state::SequencerState;
