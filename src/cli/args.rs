//! CLI argument definitions
//!
//! All Clap derive structs for `meridian-intro` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::{DriveMode, MAX_SPEED, MIN_SPEED};

// ============================================================================
// Root CLI
// ============================================================================

/// Headless intro-animation sequencer for the Meridian Research landing page.
#[derive(Parser, Debug)]
#[command(name = "meridian-intro", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub command: Commands,

    /// Log more: -v for transitions, -vv for module paths, -vvv for everything.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log nothing; command output and errors still print.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "MERIDIAN_COLOR")]
    pub color: ColorChoice,

    /// Log output format on stderr.
    #[arg(long, default_value = "human", global = true, env = "MERIDIAN_LOG_FORMAT")]
    pub log_format: OutputFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the intro against the headless page.
    Play(PlayArgs),

    /// Print the step script with its locks and autoplay delays.
    Script(ScriptArgs),

    /// Resolve scroll-spy for one scroll position.
    Spy(SpyArgs),

    /// Validate configuration files.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Play / Script / Spy
// ============================================================================

/// Arguments for `play`.
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Path to YAML configuration file (built-in defaults if omitted).
    #[arg(short, long, env = "MERIDIAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Driver override; defaults to the configuration's `mode`.
    #[arg(short, long)]
    pub mode: Option<DriveMode>,

    /// Playback speed factor applied to every timing.
    #[arg(long, default_value_t = 1.0, value_parser = parse_speed)]
    pub speed: f64,

    /// Write JSONL sequencer events to this file (`-` for stderr).
    #[arg(long, env = "MERIDIAN_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `script`.
#[derive(Args, Debug)]
pub struct ScriptArgs {
    /// Path to YAML configuration file (built-in defaults if omitted).
    #[arg(short, long, env = "MERIDIAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `spy`.
#[derive(Args, Debug)]
pub struct SpyArgs {
    /// Scroll position to resolve, in pixels.
    #[arg(long, allow_negative_numbers = true)]
    pub scroll_y: f64,

    /// Path to YAML configuration file (built-in defaults if omitted).
    #[arg(short, long, env = "MERIDIAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Validate / Version
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// YAML files to check.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Fail on warnings as well as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// When to color log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    Always,
    Never,
}

/// Shape of command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

fn parse_speed(raw: &str) -> Result<f64, String> {
    let speed: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(speed)
    } else {
        Err(format!(
            "speed must be between {MIN_SPEED} and {MAX_SPEED}, got {raw}"
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
