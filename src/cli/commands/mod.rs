//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod play;
pub mod script;
pub mod spy;
pub mod validate;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::config::loader::{ConfigLoader, LoadResult, LoaderOptions};
use crate::config::schema::IntroConfig;
use crate::error::IntroError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// `shutdown` is cancelled on the first Ctrl+C / SIGTERM.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, shutdown: CancellationToken) -> Result<(), IntroError> {
    match cli.command {
        Commands::Play(args) => play::run(&args, shutdown).await,
        Commands::Script(args) => script::run(&args),
        Commands::Spy(args) => spy::run(&args),
        Commands::Validate(args) => validate::run(&args),
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loads `path`, or the built-in defaults when no file is given, and logs
/// loader warnings.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Arc<IntroConfig>, IntroError> {
    let loader = ConfigLoader::new(LoaderOptions::default());
    let LoadResult { config, warnings } = match path {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            loader.load(path)?
        }
        None => loader.defaults()?,
    };

    for warning in &warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    Ok(config)
}
