//! Configuration schema types
//!
//! Every field has a default equal to the stock landing page, so an empty
//! mapping (or no file at all) yields the canonical intro. The shape of the
//! step script is fixed in code; only labels, timings, scroll-spy offsets
//! and the headless page layout are configurable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of word entities the step script reveals and strikes.
pub const WORD_COUNT: usize = 4;

/// Number of entries in the autoplay delay table (one per step 0..=12).
pub const AUTOPLAY_DELAY_COUNT: usize = 13;

/// Default autoplay delays, in milliseconds.
pub const DEFAULT_AUTOPLAY_DELAYS_MS: [u64; AUTOPLAY_DELAY_COUNT] = [
    1000, 2000, 1500, 2000, 1500, 2000, 1500, 2000, 1500, 3000, 2500, 2000, 2000,
];

// ============================================================================
// Root
// ============================================================================

/// Root configuration for one intro run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntroConfig {
    /// Labels of the four words, in reveal order.
    pub words: Vec<String>,

    /// Text of the final phrase shown after the last strike.
    pub final_phrase: String,

    /// Which driver advances the sequence.
    pub mode: DriveMode,

    /// Lock durations, deferred-effect delays and the autoplay table.
    pub timing: TimingConfig,

    /// Scroll-spy offsets.
    pub scroll_spy: ScrollSpyConfig,

    /// Geometry of the headless page.
    pub page: PageLayout,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            words: ["Noise", "Hype", "Guesswork", "Shortcuts"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            final_phrase: "Just research.".to_string(),
            mode: DriveMode::default(),
            timing: TimingConfig::default(),
            scroll_spy: ScrollSpyConfig::default(),
            page: PageLayout::default(),
        }
    }
}

/// Driver strategy selected at construction.
///
/// The two drivers are never active together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Timer-driven: the whole script plays once on page load.
    #[default]
    Autoplay,
    /// Input-driven: one step per qualifying downward scroll/wheel/key.
    Interactive,
}

impl DriveMode {
    /// Returns the `snake_case` name used in configuration and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Autoplay => "autoplay",
            Self::Interactive => "interactive",
        }
    }
}

impl std::fmt::Display for DriveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DriveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autoplay" => Ok(Self::Autoplay),
            "interactive" => Ok(Self::Interactive),
            other => Err(format!("unknown drive mode '{other}'")),
        }
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Timing table for the sequencer and its drivers.
///
/// Durations accept either integer milliseconds or humantime strings
/// (`"800ms"`, `"1s"`, `"2s 500ms"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Lock held after reveal and hide actions.
    #[serde(with = "duration")]
    pub reveal_lock: Duration,

    /// Lock held after strike actions; the struck word collapses when it ends.
    #[serde(with = "duration")]
    pub strike_lock: Duration,

    /// Lock held after the completion action.
    #[serde(with = "duration")]
    pub complete_lock: Duration,

    /// Delay before main content is revealed after completion.
    #[serde(with = "duration")]
    pub content_reveal_delay: Duration,

    /// Trailing debounce applied to interactive input.
    #[serde(with = "duration")]
    pub input_debounce: Duration,

    /// Quiet period after the last resize before `resizing` is cleared.
    #[serde(with = "duration")]
    pub resize_debounce: Duration,

    /// Autoplay delays: entry `n < 12` precedes step `n`, entry 12 is the
    /// settle wait after completion.
    #[serde(with = "duration_list")]
    pub autoplay_delays: Vec<Duration>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reveal_lock: Duration::from_millis(800),
            strike_lock: Duration::from_millis(1000),
            complete_lock: Duration::from_millis(500),
            content_reveal_delay: Duration::from_millis(300),
            input_debounce: Duration::from_millis(10),
            resize_debounce: Duration::from_millis(250),
            autoplay_delays: DEFAULT_AUTOPLAY_DELAYS_MS
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect(),
        }
    }
}

/// Slowest playback factor `play --speed` accepts.
pub const MIN_SPEED: f64 = 0.01;

/// Fastest playback factor `play --speed` accepts.
pub const MAX_SPEED: f64 = 1000.0;

impl TimingConfig {
    /// Returns a copy with every duration divided by `speed`.
    ///
    /// Non-finite or non-positive factors leave the table unchanged. A
    /// duration too long to represent after scaling saturates at
    /// [`Duration::MAX`].
    #[must_use]
    pub fn scaled(&self, speed: f64) -> Self {
        if !speed.is_finite() || speed <= 0.0 {
            return self.clone();
        }
        let scale = |d: Duration| {
            Duration::try_from_secs_f64(d.as_secs_f64() / speed).unwrap_or(Duration::MAX)
        };
        Self {
            reveal_lock: scale(self.reveal_lock),
            strike_lock: scale(self.strike_lock),
            complete_lock: scale(self.complete_lock),
            content_reveal_delay: scale(self.content_reveal_delay),
            input_debounce: scale(self.input_debounce),
            resize_debounce: scale(self.resize_debounce),
            autoplay_delays: self.autoplay_delays.iter().copied().map(scale).collect(),
        }
    }

    /// Sum of the delays preceding the terminal step.
    #[must_use]
    pub fn autoplay_run_time(&self) -> Duration {
        self.autoplay_delays
            .iter()
            .take(AUTOPLAY_DELAY_COUNT - 1)
            .sum()
    }
}

// ============================================================================
// Scroll-spy
// ============================================================================

/// Offsets used by scroll-spy once the intro has completed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollSpyConfig {
    /// Added to the scroll position before comparing against sections.
    pub scroll_offset: f64,

    /// Subtracted from each section top so a section activates early.
    pub pre_trigger_margin: f64,

    /// The quote stays visible while `scroll_y < viewport * quote_fraction`.
    pub quote_fraction: f64,
}

impl Default for ScrollSpyConfig {
    fn default() -> Self {
        Self {
            scroll_offset: 100.0,
            pre_trigger_margin: 200.0,
            quote_fraction: 0.5,
        }
    }
}

// ============================================================================
// Page layout
// ============================================================================

/// Geometry of the headless page the CLI and tests run against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageLayout {
    /// Height of the viewport in pixels.
    pub viewport_height: f64,

    /// Height of the floating menu bar; `None` means the bar is absent.
    pub menu_height: Option<f64>,

    /// Content sections in document order.
    pub sections: Vec<SectionLayout>,
}

impl Default for PageLayout {
    fn default() -> Self {
        let section = |id: &str, top: f64, height: f64| SectionLayout {
            id: id.to_string(),
            top,
            height,
        };
        Self {
            viewport_height: 900.0,
            menu_height: Some(80.0),
            sections: vec![
                section("about", 0.0, 900.0),
                section("research", 900.0, 1200.0),
                section("team", 2100.0, 800.0),
                section("contact", 2900.0, 600.0),
            ],
        }
    }
}

/// One `section[id]` of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionLayout {
    /// Element id; menu links target `#<id>`.
    pub id: String,
    /// Offset of the section from the top of the document.
    pub top: f64,
    /// Height of the section.
    pub height: f64,
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Millis(u64),
    Text(String),
}

impl RawDuration {
    fn into_duration<E: serde::de::Error>(self) -> Result<Duration, E> {
        match self {
            Self::Millis(ms) => Ok(Duration::from_millis(ms)),
            Self::Text(text) => humantime::parse_duration(text.trim())
                .map_err(|e| E::custom(format!("invalid duration '{text}': {e}"))),
        }
    }
}

mod duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::RawDuration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        RawDuration::deserialize(deserializer)?.into_duration()
    }
}

mod duration_list {
    use std::time::Duration;

    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::RawDuration;

    pub fn serialize<S: Serializer>(values: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&humantime::format_duration(*value).to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Duration>, D::Error> {
        Vec::<RawDuration>::deserialize(deserializer)?
            .into_iter()
            .map(RawDuration::into_duration)
            .collect()
    }
}
