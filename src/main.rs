//! `meridian-intro` - headless intro sequencer for the Meridian Research
//! landing page

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use meridian_intro::cli::args::Cli;
use meridian_intro::cli::commands;
use meridian_intro::error::ExitCode;
use meridian_intro::observability::{LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(LogFormat::from(cli.log_format), cli.verbose, cli.color);
    }

    let shutdown = CancellationToken::new();
    let signal_code = Arc::new(AtomicI32::new(ExitCode::SUCCESS));

    // First signal cancels the run, the second one forces exit
    {
        let shutdown = shutdown.clone();
        let signal_code = Arc::clone(&signal_code);
        tokio::spawn(async move {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to register SIGTERM handler");
                        return;
                    }
                };

            let code = tokio::select! {
                _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
                _ = sigterm.recv() => ExitCode::TERMINATED,
            };
            signal_code.store(code, Ordering::SeqCst);
            shutdown.cancel();

            eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");

            tokio::select! {
                _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
                _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
            }
        });
    }

    let result = commands::dispatch(cli, shutdown).await;

    match result {
        Ok(()) => std::process::exit(signal_code.load(Ordering::SeqCst)),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
