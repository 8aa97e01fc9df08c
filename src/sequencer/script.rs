//! Step script
//!
//! The fixed, ordered table the sequencer walks: step `n` runs one action
//! and holds one kind of lock. Only labels and durations are configurable;
//! the shape of the table is not.

use std::time::Duration;

use serde::Serialize;

use crate::config::schema::TimingConfig;

/// Number of firing steps (0..=11).
pub const STEP_COUNT: usize = 12;

/// Step pointer value once the completion action has run.
pub const TERMINAL_STEP: usize = STEP_COUNT;

/// Visual effect performed by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "word", rename_all = "snake_case")]
pub enum Action {
    /// Show word *i*, hiding every other exclusive entity.
    RevealWord(usize),
    /// Strike word *i*; it collapses when the strike lock ends.
    StrikeWord(usize),
    /// Show the final phrase, hiding every word.
    RevealFinalPhrase,
    /// Fade the final phrase out.
    HideFinalPhrase,
    /// Show the logo.
    RevealLogo,
    /// Hide the logo, expose the navigation chrome and finish the intro.
    Complete,
}

impl Action {
    /// Stable `snake_case` name used in events and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RevealWord(_) => "reveal_word",
            Self::StrikeWord(_) => "strike_word",
            Self::RevealFinalPhrase => "reveal_final_phrase",
            Self::HideFinalPhrase => "hide_final_phrase",
            Self::RevealLogo => "reveal_logo",
            Self::Complete => "complete",
        }
    }

    /// Which lock the action holds.
    #[must_use]
    pub const fn lock_kind(self) -> LockKind {
        match self {
            Self::StrikeWord(_) => LockKind::Strike,
            Self::Complete => LockKind::Complete,
            _ => LockKind::Reveal,
        }
    }

    /// Word index targeted by the action, if any.
    #[must_use]
    pub const fn word(self) -> Option<usize> {
        match self {
            Self::RevealWord(i) | Self::StrikeWord(i) => Some(i),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RevealWord(i) => write!(f, "reveal word {}", i + 1),
            Self::StrikeWord(i) => write!(f, "strike word {}", i + 1),
            Self::RevealFinalPhrase => f.write_str("reveal final phrase"),
            Self::HideFinalPhrase => f.write_str("hide final phrase"),
            Self::RevealLogo => f.write_str("reveal logo"),
            Self::Complete => f.write_str("hide logo + reveal nav chrome"),
        }
    }
}

/// Lock classes of the timing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Reveal,
    Strike,
    Complete,
}

impl LockKind {
    /// Resolves the lock against a timing table.
    #[must_use]
    pub const fn duration(self, timing: &TimingConfig) -> Duration {
        match self {
            Self::Reveal => timing.reveal_lock,
            Self::Strike => timing.strike_lock,
            Self::Complete => timing.complete_lock,
        }
    }
}

/// One row of the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptStep {
    pub step: usize,
    #[serde(flatten)]
    pub action: Action,
    pub next: usize,
}

/// The ordered step table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepScript {
    actions: [Action; STEP_COUNT],
}

impl StepScript {
    /// The landing page's script: four reveal/strike pairs, the final
    /// phrase in and out, the logo, then completion.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            actions: [
                Action::RevealWord(0),
                Action::StrikeWord(0),
                Action::RevealWord(1),
                Action::StrikeWord(1),
                Action::RevealWord(2),
                Action::StrikeWord(2),
                Action::RevealWord(3),
                Action::StrikeWord(3),
                Action::RevealFinalPhrase,
                Action::HideFinalPhrase,
                Action::RevealLogo,
                Action::Complete,
            ],
        }
    }

    /// Returns the row for `step`, or `None` at or past the terminal step.
    #[must_use]
    pub fn get(&self, step: usize) -> Option<ScriptStep> {
        self.actions.get(step).map(|&action| ScriptStep {
            step,
            action,
            next: step + 1,
        })
    }

    /// Number of firing steps.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always `false`; present for the `len` convention.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Rows in step order.
    pub fn iter(&self) -> impl Iterator<Item = ScriptStep> + '_ {
        (0..self.len()).filter_map(|step| self.get(step))
    }
}

impl Default for StepScript {
    fn default() -> Self {
        Self::standard()
    }
}
