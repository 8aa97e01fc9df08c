//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check
//! 2. Environment variable expansion (pre-parse, on raw text)
//! 3. YAML parsing and typed deserialization
//! 4. Environment overrides (`MERIDIAN_MODE`)
//! 5. Validation
//! 6. Freeze with `Arc`

use std::path::Path;
use std::sync::Arc;

use crate::config::schema::{DriveMode, IntroConfig};
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Knobs for [`ConfigLoader`].
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Files larger than this many bytes are refused unread.
    pub max_config_size: usize,

    /// Whether `MERIDIAN_*` environment overrides are applied.
    pub apply_env_overrides: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: env_or("MERIDIAN_MAX_CONFIG_SIZE", 1024 * 1024),
            apply_env_overrides: true,
        }
    }
}

/// A validated, frozen configuration and whatever the loader noticed on
/// the way.
#[derive(Debug)]
pub struct LoadResult {
    pub config: Arc<IntroConfig>,
    pub warnings: Vec<LoadWarning>,
}

/// Non-fatal finding: an unset `${VAR}` or a validator warning.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    pub message: String,
    /// Field path (`timing.autoplay_delays[1]`) or the file for env lookups.
    pub location: Option<String>,
}

/// Reads intro configurations from YAML.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Loads, validates and freezes a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingFile` if the file cannot be read,
    /// `ConfigError::InvalidValue` if it exceeds the size limit,
    /// `ConfigError::ParseError` on malformed YAML and
    /// `ConfigError::ValidationError` if validation reports errors.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let missing = |_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        };
        let limit = self.options.max_config_size;
        let size = std::fs::metadata(path).map_err(missing)?.len();
        if !usize::try_from(size).is_ok_and(|size| size <= limit) {
            return Err(ConfigError::InvalidValue {
                field: "config size".to_string(),
                value: format!("{size} bytes"),
                expected: format!("at most {limit} bytes"),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(missing)?;

        self.load_str(&raw, path)
    }

    /// Loads a configuration from YAML text; `origin` is only used for
    /// error messages.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`], minus the file-system failures.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let (expanded, mut warnings) = expand_env(raw, origin)?;

        // An empty document means "all defaults"
        let mut config: IntroConfig = if expanded.trim().is_empty() {
            IntroConfig::default()
        } else {
            serde_yaml::from_str(&expanded).map_err(|err| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: err.location().map(|at| at.line()),
                message: err.to_string(),
            })?
        };

        if self.options.apply_env_overrides {
            apply_env_overrides(&mut config)?;
        }

        let report = Validator::new().validate(&config);
        if report.has_errors() {
            let path = origin.display().to_string();
            return Err(ConfigError::ValidationError {
                path,
                errors: report.errors,
            });
        }
        warnings.extend(report.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }

    /// Returns the built-in configuration with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if an override is malformed.
    pub fn defaults(&self) -> Result<LoadResult, ConfigError> {
        self.load_str("", Path::new("<defaults>"))
    }
}

fn apply_env_overrides(config: &mut IntroConfig) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var("MERIDIAN_MODE") {
        config.mode = raw
            .parse::<DriveMode>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "MERIDIAN_MODE".to_string(),
                value: raw.clone(),
                expected: "one of: autoplay, interactive".to_string(),
            })?;
    }
    Ok(())
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name).map(|raw| raw.parse()) {
        Ok(Ok(value)) => value,
        _ => default,
    }
}

// ============================================================================
// ${VAR} expansion
// ============================================================================

/// Expands `${VAR}`, `${VAR:-default}`, `${VAR:?message}` and `$$` in the
/// raw text, before YAML sees it. A bare `${VAR}` that is unset becomes
/// the empty string and a note. `$$` inside a default is a literal `$` too.
fn expand_env(raw: &str, origin: &Path) -> Result<(String, Vec<LoadWarning>), ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut notes = Vec::new();
    let mut rest = raw;

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(body) = after.strip_prefix('{') {
            let Some(close) = body.find('}') else {
                return Err(malformed(origin, body));
            };
            let reference = parse_reference(&body[..close]).ok_or_else(|| malformed(origin, body))?;
            match (std::env::var(reference.name), reference.fallback) {
                (Ok(value), _) => out.push_str(&value),
                (Err(_), Fallback::Default(default)) => {
                    out.push_str(&default.replace("$$", "$"));
                }
                (Err(_), Fallback::Required(message)) => {
                    return Err(ConfigError::EnvVarNotSet {
                        var: reference.name.to_string(),
                        location: message.to_string(),
                    });
                }
                (Err(_), Fallback::Empty) => notes.push(LoadWarning {
                    message: format!("${{{}}} is not set; expanded to nothing", reference.name),
                    location: Some(origin.display().to_string()),
                }),
            }
            rest = &body[close + 1..];
        } else {
            out.push('$');
            rest = after;
        }
    }
    out.push_str(rest);

    Ok((out, notes))
}

struct Reference<'a> {
    name: &'a str,
    fallback: Fallback<'a>,
}

enum Fallback<'a> {
    Empty,
    Default(&'a str),
    Required(&'a str),
}

fn parse_reference(inner: &str) -> Option<Reference<'_>> {
    let Some((name, modifier)) = inner.split_once(':') else {
        return Some(Reference {
            name: inner,
            fallback: Fallback::Empty,
        });
    };
    let fallback = if let Some(default) = modifier.strip_prefix('-') {
        Fallback::Default(default)
    } else {
        Fallback::Required(modifier.strip_prefix('?')?)
    };
    Some(Reference { name, fallback })
}

fn malformed(origin: &Path, body: &str) -> ConfigError {
    let snippet: String = body.chars().take(24).collect();
    ConfigError::ParseError {
        path: origin.to_path_buf(),
        line: None,
        message: format!("malformed variable reference '${{{snippet}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn loader() -> ConfigLoader {
        ConfigLoader::new(LoaderOptions {
            max_config_size: 64 * 1024,
            apply_env_overrides: false,
        })
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "mode: interactive\ntiming:\n  reveal_lock: 600ms\n"
        )
        .unwrap();

        let result = loader().load(file.path()).unwrap();
        assert_eq!(result.config.mode, DriveMode::Interactive);
        assert_eq!(result.config.timing.reveal_lock, Duration::from_millis(600));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = loader().load(Path::new("/nonexistent/intro.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_size_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "final_phrase: \"{}\"", "x".repeat(512)).unwrap();
        let tiny = ConfigLoader::new(LoaderOptions {
            max_config_size: 128,
            apply_env_overrides: false,
        });
        let err = tiny.load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_empty_document_is_defaults() {
        let result = loader().load_str("", Path::new("inline")).unwrap();
        assert_eq!(*result.config, IntroConfig::default());
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = loader()
            .load_str("words: [a, b\nmode: autoplay", Path::new("inline"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_validation_error() {
        let err = loader()
            .load_str("words: [only, three, words]", Path::new("inline"))
            .unwrap_err();
        match err {
            ConfigError::ValidationError { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].path, "words");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_warnings_surface() {
        let result = loader()
            .load_str("page:\n  sections: []\n", Path::new("inline"))
            .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].location.as_deref(), Some("page.sections"));
    }

    #[test]
    fn test_env_default_and_escape() {
        let result = loader()
            .load_str(
                "final_phrase: \"${MERIDIAN_TEST_UNSET_PHRASE:-Costs $$0}\"",
                Path::new("inline"),
            )
            .unwrap();
        assert_eq!(result.config.final_phrase, "Costs $0");

        let result = loader()
            .load_str(
                "final_phrase: \"${MERIDIAN_TEST_UNSET_PHRASE:-Costs $5}\"",
                Path::new("inline"),
            )
            .unwrap();
        assert_eq!(result.config.final_phrase, "Costs $5");
    }

    #[test]
    fn test_env_required_missing() {
        let err = loader()
            .load_str(
                "final_phrase: \"${MERIDIAN_TEST_UNSET_REQUIRED:?final_phrase}\"",
                Path::new("inline"),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotSet { .. }));
    }

    #[test]
    fn test_env_missing_without_default_warns() {
        let result = loader()
            .load_str(
                "final_phrase: \"x${MERIDIAN_TEST_UNSET_PLAIN}\"",
                Path::new("inline"),
            )
            .unwrap();
        assert_eq!(result.config.final_phrase, "x");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_unterminated_reference() {
        let err = loader()
            .load_str("final_phrase: \"${OPEN", Path::new("inline"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_lone_dollar_and_bad_modifier() {
        let result = loader()
            .load_str("final_phrase: \"Costs $5\"", Path::new("inline"))
            .unwrap();
        assert_eq!(result.config.final_phrase, "Costs $5");

        let err = loader()
            .load_str("final_phrase: \"${PHRASE:+x}\"", Path::new("inline"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
