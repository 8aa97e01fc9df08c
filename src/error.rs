//! Errors and process exit codes
//!
//! The sequencer never fails: every runtime operation either mutates the
//! page or is a guarded no-op. Errors come from the layers around it,
//! which load configuration, read input and talk to the terminal.

use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Process exit statuses of the `meridian-intro` binary.
pub struct ExitCode;

impl ExitCode {
    pub const SUCCESS: i32 = 0;

    /// Anything not covered below (e.g. a report that fails to serialize).
    pub const ERROR: i32 = 1;

    /// The configuration could not be read, parsed or validated.
    pub const CONFIG_ERROR: i32 = 2;

    /// Reading stdin or writing the event log failed.
    pub const IO_ERROR: i32 = 3;

    /// A malformed interactive input line (`EX_USAGE`).
    pub const USAGE_ERROR: i32 = 64;

    /// Stopped by Ctrl+C.
    pub const INTERRUPTED: i32 = 130;

    /// Stopped by SIGTERM.
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Everything a CLI command can fail with.
#[derive(Debug, Error)]
pub enum IntroError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bad command-line usage or an unparseable input line.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl IntroError {
    /// Exit status the binary reports for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Failures of the configuration loader.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML is malformed, has an unknown field or a bad duration.
    #[error("cannot parse {path}: {message}")]
    ParseError {
        path: PathBuf,
        /// 1-based line, when the parser reports one.
        line: Option<usize>,
        message: String,
    },

    /// The document parsed but describes an unusable intro.
    #[error("{path} is not a valid intro: {}", summarize(errors))]
    ValidationError {
        path: String,
        errors: Vec<ValidationIssue>,
    },

    #[error("configuration file not found: {path}")]
    MissingFile { path: PathBuf },

    /// A value outside the configuration document (file size, env override).
    #[error("'{field}' is '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    /// A `${VAR:?message}` reference whose variable is unset.
    #[error("${{{var}}} is not set: {location}")]
    EnvVarNotSet { var: String, location: String },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .filter(|issue| issue.severity == Severity::Error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Issues
// ============================================================================

/// One finding of the configuration validator.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Dotted field path, e.g. `timing.autoplay_delays[3]`.
    pub path: String,
    pub message: String,
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.path, self.message, self.severity)
    }
}

/// Whether an issue blocks loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    /// Reported, but the configuration still loads.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}
