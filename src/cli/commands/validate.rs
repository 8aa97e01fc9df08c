//! `validate` command

use serde_json::json;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::error::{ConfigError, IntroError, Severity, ValidationIssue};

/// Validate configuration files without playing them.
///
/// # Errors
///
/// Returns an I/O error if any file does not exist, or a config error if
/// validation fails. With `--strict`, loader warnings are errors too.
pub fn run(args: &ValidateArgs) -> Result<(), IntroError> {
    // Environment overrides would mask what the file itself says
    let loader = ConfigLoader::new(LoaderOptions {
        apply_env_overrides: false,
        ..LoaderOptions::default()
    });

    for path in &args.files {
        if !path.exists() {
            return Err(IntroError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        tracing::info!(file = %path.display(), "validating configuration");

        let result = loader.load(path)?;
        for warning in &result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }

        if args.strict && !result.warnings.is_empty() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result
                    .warnings
                    .iter()
                    .map(|w| ValidationIssue {
                        path: w.location.clone().unwrap_or_default(),
                        message: w.message.clone(),
                        severity: Severity::Error,
                    })
                    .collect(),
            }
            .into());
        }

        match args.format {
            OutputFormat::Human => {
                println!("{}: ok ({} warnings)", path.display(), result.warnings.len());
            }
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "file": path.display().to_string(),
                    "valid": true,
                    "mode": result.config.mode.as_str(),
                    "warnings": result
                        .warnings
                        .iter()
                        .map(|w| json!({ "location": w.location, "message": w.message }))
                        .collect::<Vec<_>>(),
                })
            ),
        }
        tracing::info!(file = %path.display(), "configuration valid");
    }

    Ok(())
}
