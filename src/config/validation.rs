//! Configuration validation
//!
//! Validation runs on the fully deserialized `IntroConfig` and collects
//! every issue instead of stopping at the first one.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::schema::{AUTOPLAY_DELAY_COUNT, IntroConfig, TimingConfig, WORD_COUNT};
use crate::error::{Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Issues found in one configuration, split by severity.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Any entry here stops the load.
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }
}

/// Checks an [`IntroConfig`] for values the sequencer cannot run with.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration, consuming the accumulated issues.
    pub fn validate(&mut self, config: &IntroConfig) -> ValidationResult {
        self.validate_words(config);
        self.validate_timing(config);
        self.validate_scroll_spy(config);
        self.validate_page(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_words(&mut self, config: &IntroConfig) {
        if config.words.len() != WORD_COUNT {
            self.error(
                "words",
                format!(
                    "expected exactly {WORD_COUNT} words, got {}",
                    config.words.len()
                ),
            );
        }
        for (i, word) in config.words.iter().enumerate() {
            if word.trim().is_empty() {
                self.warning(&format!("words[{i}]"), "word label is empty");
            }
        }
        if config.final_phrase.trim().is_empty() {
            self.warning("final_phrase", "final phrase is empty");
        }
    }

    fn validate_timing(&mut self, config: &IntroConfig) {
        let timing = &config.timing;
        for (field, value) in [
            ("timing.reveal_lock", timing.reveal_lock),
            ("timing.strike_lock", timing.strike_lock),
            ("timing.complete_lock", timing.complete_lock),
        ] {
            if value.is_zero() {
                self.error(field, "lock duration must be non-zero".to_string());
            }
        }

        if timing.autoplay_delays.len() != AUTOPLAY_DELAY_COUNT {
            self.error(
                "timing.autoplay_delays",
                format!(
                    "expected {AUTOPLAY_DELAY_COUNT} entries (one per step plus settle), got {}",
                    timing.autoplay_delays.len()
                ),
            );
            return;
        }

        // A delay shorter than the lock of the preceding step makes the
        // autoplay driver wait for the lock instead of the table.
        for (i, delay) in timing.autoplay_delays.iter().enumerate().skip(1) {
            if *delay < lock_before(i, timing) {
                self.warning(
                    &format!("timing.autoplay_delays[{i}]"),
                    "delay is shorter than the preceding lock; playback will stretch",
                );
            }
        }
    }

    fn validate_scroll_spy(&mut self, config: &IntroConfig) {
        let spy = &config.scroll_spy;
        if !(spy.quote_fraction > 0.0 && spy.quote_fraction <= 1.0) {
            self.error(
                "scroll_spy.quote_fraction",
                format!("must be in (0, 1], got {}", spy.quote_fraction),
            );
        }
        if !spy.scroll_offset.is_finite() || !spy.pre_trigger_margin.is_finite() {
            self.error("scroll_spy", "offsets must be finite numbers".to_string());
        }
    }

    fn validate_page(&mut self, config: &IntroConfig) {
        let page = &config.page;
        if !(page.viewport_height.is_finite() && page.viewport_height > 0.0) {
            self.error(
                "page.viewport_height",
                format!("must be positive, got {}", page.viewport_height),
            );
        }
        if page.sections.is_empty() {
            self.warning("page.sections", "no sections; scroll-spy will never activate a link");
        }

        let mut seen = HashSet::new();
        let mut previous_top = f64::NEG_INFINITY;
        for (i, section) in page.sections.iter().enumerate() {
            let path = format!("page.sections[{i}]");
            if section.id.trim().is_empty() {
                self.error(&path, "section id is empty".to_string());
            } else if !seen.insert(section.id.as_str()) {
                self.error(&path, format!("duplicate section id '{}'", section.id));
            }
            if section.height < 0.0 {
                self.error(&path, format!("negative height {}", section.height));
            }
            if section.top < previous_top {
                self.error(
                    &path,
                    "sections must be listed in document order (ascending top)".to_string(),
                );
            }
            previous_top = section.top;
        }
    }

    fn error(&mut self, path: &str, message: String) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message,
            severity: Severity::Error,
        });
    }

    fn warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

/// Lock held by the step fired just before autoplay delay `index`.
const fn lock_before(index: usize, timing: &TimingConfig) -> Duration {
    match index {
        // strikes are steps 1, 3, 5 and 7
        2 | 4 | 6 | 8 => timing.strike_lock,
        12 => timing.complete_lock,
        _ => timing.reveal_lock,
    }
}
