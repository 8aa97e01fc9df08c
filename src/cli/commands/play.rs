//! `play` command
//!
//! Runs one intro against the headless page. Autoplay plays the script on
//! timers; interactive mode reads one input per line from stdin:
//!
//! ```text
//! down | up              ArrowDown / ArrowUp key
//! key <name>             any DOM key value
//! wheel <delta_y>        mouse wheel
//! scroll <y>             the viewport moved to y
//! touch <y0> <y1>        swipe from y0 to y1
//! click <href>|logo|hamburger
//! resize
//! wait <duration>        e.g. "wait 900ms"
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::args::{OutputFormat, PlayArgs};
use crate::config::schema::DriveMode;
use crate::error::IntroError;
use crate::observability::EventEmitter;
use crate::page::document::{ElementRef, SharedDocument};
use crate::page::memory::Page;
use crate::sequencer::driver::DriveReport;
use crate::sequencer::input::{InputDisposition, InputEvent};
use crate::sequencer::session::IntroSession;

use super::load_config;

// ============================================================================
// Input lines
// ============================================================================

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq)]
enum LineCommand {
    Input(Vec<InputEvent>),
    Wait(Duration),
}

fn parse_number(raw: Option<&str>, what: &str) -> Result<f64, String> {
    let raw = raw.ok_or_else(|| format!("missing {what}"))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {what} '{raw}'"))
}

fn parse_line(line: &str) -> Result<Option<LineCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let events = match verb {
        "down" => vec![InputEvent::KeyDown {
            key: "ArrowDown".to_string(),
        }],
        "up" => vec![InputEvent::KeyDown {
            key: "ArrowUp".to_string(),
        }],
        "key" => {
            let key = line["key".len()..].trim();
            if key.is_empty() {
                return Err("missing key name".to_string());
            }
            vec![InputEvent::KeyDown {
                key: key.to_string(),
            }]
        }
        "wheel" => vec![InputEvent::Wheel {
            delta_y: parse_number(parts.next(), "wheel delta")?,
        }],
        "scroll" => vec![InputEvent::Scroll {
            y: parse_number(parts.next(), "scroll position")?,
        }],
        "touch" => {
            let start = parse_number(parts.next(), "touch start")?;
            let end = parse_number(parts.next(), "touch end")?;
            vec![
                InputEvent::TouchStart { y: start },
                InputEvent::TouchEnd { y: end },
            ]
        }
        "click" => {
            let target = match parts.next() {
                Some("logo") => ElementRef::LogoSection,
                Some("hamburger") => ElementRef::Hamburger,
                Some(href) if href.starts_with('#') => ElementRef::MenuLink(href.to_string()),
                Some(other) => return Err(format!("unknown click target '{other}'")),
                None => return Err("missing click target".to_string()),
            };
            vec![InputEvent::Click { target }]
        }
        "resize" => vec![InputEvent::Resize],
        "wait" => {
            let raw = line["wait".len()..].trim();
            let delay = humantime::parse_duration(raw)
                .map_err(|e| format!("invalid duration '{raw}': {e}"))?;
            return Ok(Some(LineCommand::Wait(delay)));
        }
        other => return Err(format!("unknown input '{other}'")),
    };

    if let Some(extra) = parts.next().filter(|_| verb != "key") {
        return Err(format!("unexpected argument '{extra}'"));
    }
    Ok(Some(LineCommand::Input(events)))
}

// ============================================================================
// Output
// ============================================================================

fn render_disposition(line: &str, disposition: &InputDisposition) -> String {
    let mut notes = Vec::new();
    if disposition.prevent_default {
        notes.push("prevented".to_string());
    }
    if disposition.nudged {
        notes.push("nudged".to_string());
    }
    if let Some(spy) = &disposition.spy {
        notes.push(format!(
            "active={} quote={}",
            spy.active_section.as_deref().unwrap_or("none"),
            if spy.quote_visible { "visible" } else { "hidden" }
        ));
    }
    if let Some(target) = disposition.scroll_target {
        notes.push(format!("scroll_to={target}"));
    }
    if notes.is_empty() {
        notes.push("passed".to_string());
    }
    format!("{line} -> {}", notes.join(" "))
}

fn print_report(report: &DriveReport, format: OutputFormat) -> Result<(), IntroError> {
    match format {
        OutputFormat::Human => println!(
            "{}: {} steps fired, {} dropped in {} ({})",
            report.reason.as_str(),
            report.steps_fired,
            report.dropped,
            humantime::format_duration(Duration::from_millis(
                u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX)
            )),
            report.mode,
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
    }
    Ok(())
}

async fn join(handle: JoinHandle<DriveReport>) -> Result<DriveReport, IntroError> {
    handle
        .await
        .map_err(|e| IntroError::Io(std::io::Error::other(e)))
}

// ============================================================================
// Command
// ============================================================================

/// Play the intro.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded, an I/O
/// error if the events file or stdin fail, and a usage error on a
/// malformed input line.
pub async fn run(args: &PlayArgs, shutdown: CancellationToken) -> Result<(), IntroError> {
    let loaded = load_config(args.config.as_deref())?;
    let mut config = (*loaded).clone();
    config.timing = config.timing.scaled(args.speed);
    let mode = args.mode.unwrap_or(config.mode);

    let emitter = match &args.events_file {
        Some(path) if path.as_os_str() == "-" => EventEmitter::stderr(),
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };

    let page = Arc::new(Mutex::new(Page::from_config(&config)));
    let document: SharedDocument = page.clone();
    let mut session = IntroSession::new(document, &config, mode, Arc::new(emitter));
    tracing::info!(%mode, speed = args.speed, "starting intro");

    session.router().route(&InputEvent::PageReady);
    let handle = session
        .start()
        .ok_or_else(|| IntroError::Usage("intro session already started".to_string()))?;

    let watcher = {
        let sequencer = Arc::clone(session.sequencer());
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            sequencer.shutdown();
        })
    };

    let result = match mode {
        DriveMode::Autoplay => Ok(()),
        DriveMode::Interactive => feed_stdin(&mut session, &page, args.format, &shutdown).await,
    };

    // Closing the router ends an interactive run that has not completed
    drop(session);
    let report = join(handle).await;
    watcher.abort();

    result?;
    print_report(&report?, args.format)
}

async fn feed_stdin(
    session: &mut IntroSession,
    page: &Mutex<Page>,
    format: OutputFormat,
    shutdown: &CancellationToken,
) -> Result<(), IntroError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        line_no += 1;

        let command =
            parse_line(&line).map_err(|e| IntroError::Usage(format!("line {line_no}: {e}")))?;
        match command {
            None => {}
            Some(LineCommand::Wait(delay)) => {
                tokio::select! {
                    () = shutdown.cancelled() => return Ok(()),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Some(LineCommand::Input(events)) => {
                for event in events {
                    if let InputEvent::Scroll { y } = event {
                        page.lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .set_scroll_y(y);
                    }
                    let disposition = session.router().route(&event);
                    match format {
                        OutputFormat::Human => {
                            println!("{}", render_disposition(line.trim(), &disposition));
                        }
                        OutputFormat::Json => println!(
                            "{}",
                            json!({ "input": event, "disposition": disposition })
                        ),
                    }
                }
            }
        }
    }
}
