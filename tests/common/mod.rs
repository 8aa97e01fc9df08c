//! Shared integration-test harness: a headless page with an event log for
//! library-level scenarios, and helpers for running the `meridian-intro`
//! binary.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use meridian_intro::config::schema::{DriveMode, IntroConfig};
use meridian_intro::observability::EventEmitter;
use meridian_intro::page::{Document, ElementRef, Page, SharedDocument, Visibility};
use meridian_intro::sequencer::IntroSession;

/// A session over an in-memory page, with events written to a temp file.
pub struct Harness {
    pub page: Arc<Mutex<Page>>,
    pub session: IntroSession,
    events: tempfile::NamedTempFile,
}

impl Harness {
    /// Builds a session in `mode` over the page described by `config`.
    #[allow(clippy::missing_panics_doc)]
    pub fn new(config: &IntroConfig, mode: DriveMode) -> Self {
        let events = tempfile::NamedTempFile::new().expect("failed to create event log");
        let emitter = EventEmitter::from_file(events.path()).expect("failed to open event log");
        let page = Arc::new(Mutex::new(Page::from_config(config)));
        let document: SharedDocument = page.clone();
        let session = IntroSession::new(document, config, mode, Arc::new(emitter));
        Self {
            page,
            session,
            events,
        }
    }

    /// Runs `f` against the page.
    #[allow(clippy::missing_panics_doc)]
    pub fn with_page<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
        f(&mut self.page.lock().expect("page lock poisoned"))
    }

    /// Visibility of one element.
    pub fn visibility(&self, element: &ElementRef) -> Visibility {
        self.with_page(|p| p.visibility(element))
    }

    /// Whether the body carries `class`.
    pub fn body_has(&self, class: &str) -> bool {
        self.with_page(|p| p.has_class(&ElementRef::Body, class))
    }

    /// Number of exclusive entities currently shown.
    pub fn shown_count(&self) -> usize {
        self.with_page(|p| p.shown_count())
    }

    /// Every event written so far.
    #[allow(clippy::missing_panics_doc)]
    pub fn events(&self) -> Vec<Value> {
        std::fs::read_to_string(self.events.path())
            .expect("failed to read event log")
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).expect("invalid event JSON"))
            .collect()
    }

    /// Events of one `type`.
    pub fn events_of(&self, kind: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e["type"] == kind)
            .collect()
    }
}

/// Path of the compiled binary.
#[must_use]
pub fn binary() -> &'static str {
    env!("CARGO_BIN_EXE_meridian-intro")
}

/// Runs the binary to completion with `args` and an empty stdin.
#[allow(clippy::missing_panics_doc)]
pub fn run_command(args: &[&str]) -> Output {
    run_with_stdin(args, "")
}

/// Runs the binary with `input` piped to stdin.
#[allow(clippy::missing_panics_doc)]
pub fn run_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(binary())
        .args(args)
        .env_remove("MERIDIAN_CONFIG")
        .env_remove("MERIDIAN_MODE")
        .env_remove("MERIDIAN_LOG_LEVEL")
        .env_remove("MERIDIAN_EVENTS_FILE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn meridian-intro");

    let mut stdin = child.stdin.take().expect("stdin not captured");
    stdin
        .write_all(input.as_bytes())
        .expect("failed to write stdin");
    drop(stdin);

    child.wait_with_output().expect("failed to wait for child")
}

/// Parses every non-empty stdout line as JSON.
#[allow(clippy::missing_panics_doc)]
pub fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str(l).unwrap_or_else(|e| panic!("invalid JSON line {l:?}: {e}"))
        })
        .collect()
}

/// Returns the path to a test fixture.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Renders a path for use as a CLI argument.
#[must_use]
pub fn arg(path: &Path) -> &str {
    path.to_str().expect("non-UTF-8 path")
}
