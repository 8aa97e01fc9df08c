//! Logging initialization
//!
//! `tracing` output goes to stderr so stdout stays free for command
//! output. `MERIDIAN_LOG_LEVEL` (an `EnvFilter` directive) overrides the
//! `-v` count.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::{ColorChoice, OutputFormat};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_LEVEL_ENV: &str = "MERIDIAN_LOG_LEVEL";

/// Shape of log lines on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

impl From<OutputFormat> for LogFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => Self::Human,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// Level for a `-v` count: none is `warn`, then `info`, `debug`, `trace`.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn use_ansi(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        }
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));

    // Module paths only help once step-level detail is on
    let with_target = verbosity >= 2;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(with_target)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder.with_ansi(use_ansi(color)).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_follows_output_format() {
        assert_eq!(LogFormat::default(), LogFormat::Human);
        assert_eq!(LogFormat::from(OutputFormat::Json), LogFormat::Json);
        assert_eq!(LogFormat::from(OutputFormat::Human), LogFormat::Human);
    }

    #[test]
    fn test_verbosity_levels() {
        let levels: Vec<_> = (0..=4).map(verbosity_to_directive).collect();
        assert_eq!(levels, ["warn", "info", "debug", "trace", "trace"]);
        assert_eq!(verbosity_to_directive(u8::MAX), "trace");
    }

    #[test]
    fn test_explicit_color_choices() {
        assert!(use_ansi(ColorChoice::Always));
        assert!(!use_ansi(ColorChoice::Never));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(LogFormat::Json, 3, ColorChoice::Never);
        init_logging(LogFormat::Human, 0, ColorChoice::Auto);
    }
}
