//! Input routing
//!
//! Translates page input into sequencer nudges, scroll-spy refreshes and
//! chrome actions, and tells the caller whether the browser default must
//! be suppressed.
//!
//! Before the intro completes, input that would scroll the page (wheel,
//! touch end, scroll keys) has its default prevented and scroll events pin
//! the viewport to the top. Other keys and clicks keep their defaults.
//! Afterwards scroll events drive scroll-spy and everything else behaves
//! normally.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::page::chrome::{ResizeDebouncer, navigate_to, scroll_to_top, toggle_mobile_menu};
use crate::page::document::{ElementRef, ScrollBehavior, with_document};

use super::driver::Nudge;
use super::engine::Sequencer;
use super::spy::SpyReading;

/// Minimum finger travel, in pixels, for a touch to count as a swipe.
pub const SWIPE_THRESHOLD: f64 = 30.0;

/// Input delivered by the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    /// The document finished loading.
    PageReady,
    /// The window was resized.
    Resize,
    /// The viewport scrolled to `y`.
    Scroll { y: f64 },
    /// Mouse wheel; positive `delta_y` scrolls down.
    Wheel { delta_y: f64 },
    /// A finger touched the screen at `y`.
    TouchStart { y: f64 },
    /// The finger left the screen at `y`.
    TouchEnd { y: f64 },
    /// A key was pressed (DOM `key` value, e.g. `"ArrowDown"`).
    KeyDown { key: String },
    /// An element was clicked.
    Click { target: ElementRef },
}

impl InputEvent {
    /// Whether the browser lets a handler cancel this event.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(
            self,
            Self::Wheel { .. } | Self::TouchEnd { .. } | Self::KeyDown { .. } | Self::Click { .. }
        )
    }

    /// Whether the browser default of this event scrolls the page.
    #[must_use]
    pub fn scrolls_page(&self) -> bool {
        match self {
            Self::Wheel { .. } | Self::TouchEnd { .. } => true,
            Self::KeyDown { key } => is_scroll_key(key),
            _ => false,
        }
    }
}

fn is_scroll_key(key: &str) -> bool {
    is_downward_key(key) || matches!(key, "ArrowUp" | "PageUp" | "Home" | "End")
}

/// Keys that scroll the page down.
fn is_downward_key(key: &str) -> bool {
    matches!(key, "ArrowDown" | "PageDown" | " " | "Space" | "Spacebar")
}

/// What the router did with one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputDisposition {
    /// The handler called `preventDefault()`.
    pub prevent_default: bool,
    /// A nudge was sent to the interactive driver.
    pub nudged: bool,
    /// Scroll-spy reading, for scroll events after completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spy: Option<SpyReading>,
    /// Target of a navigation scroll triggered by a click.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_target: Option<f64>,
}

/// Dispatches page input for one sequencer.
#[derive(Debug)]
pub struct InputRouter {
    sequencer: Arc<Sequencer>,
    nudges: Option<mpsc::Sender<Nudge>>,
    resize: ResizeDebouncer,
    last_scroll_y: f64,
    touch_start_y: Option<f64>,
}

impl InputRouter {
    /// Creates a router. `nudges` is `None` when no interactive driver
    /// listens (autoplay), in which case downward input only has its
    /// default suppressed.
    #[must_use]
    pub fn new(sequencer: Arc<Sequencer>, nudges: Option<mpsc::Sender<Nudge>>) -> Self {
        let resize = ResizeDebouncer::new(
            sequencer.document().clone(),
            sequencer.timing().resize_debounce,
        );
        Self {
            sequencer,
            nudges,
            resize,
            last_scroll_y: 0.0,
            touch_start_y: None,
        }
    }

    /// Routes one event. Must be called from within a Tokio runtime.
    pub fn route(&mut self, event: &InputEvent) -> InputDisposition {
        let complete = self.sequencer.is_complete();
        let mut disposition = InputDisposition {
            prevent_default: !complete && event.is_cancelable() && event.scrolls_page(),
            ..InputDisposition::default()
        };

        match event {
            InputEvent::PageReady => self.sequencer.prepare(),
            InputEvent::Resize => self.resize.on_resize(),
            InputEvent::Scroll { y } => {
                let downward = *y > self.last_scroll_y;
                self.last_scroll_y = *y;
                if complete {
                    disposition.spy = self.sequencer.on_scroll();
                } else {
                    self.pin_viewport();
                    disposition.nudged = downward && self.nudge();
                }
            }
            InputEvent::Wheel { delta_y } => {
                if !complete && *delta_y > 0.0 {
                    disposition.nudged = self.nudge();
                }
            }
            InputEvent::TouchStart { y } => self.touch_start_y = Some(*y),
            InputEvent::TouchEnd { y } => {
                // Finger moving up scrolls the page down
                let swipe_down = self
                    .touch_start_y
                    .take()
                    .is_some_and(|start| start - y >= SWIPE_THRESHOLD);
                if !complete && swipe_down {
                    disposition.nudged = self.nudge();
                }
            }
            InputEvent::KeyDown { key } => {
                if !complete && is_downward_key(key) {
                    disposition.nudged = self.nudge();
                }
            }
            InputEvent::Click { target } => {
                disposition.scroll_target = self.click(target);
                if matches!(target, ElementRef::MenuLink(_)) {
                    disposition.prevent_default = true;
                }
            }
        }

        trace!(?event, ?disposition, "input routed");
        disposition
    }

    fn click(&self, target: &ElementRef) -> Option<f64> {
        with_document(self.sequencer.document(), |doc| match target {
            ElementRef::MenuLink(href) => navigate_to(doc, href),
            ElementRef::LogoSection => {
                scroll_to_top(doc);
                Some(0.0)
            }
            ElementRef::Hamburger => {
                toggle_mobile_menu(doc);
                None
            }
            other => {
                debug!(target = %other, "click ignored");
                None
            }
        })
    }

    /// Holds the viewport at the top while the intro owns it.
    fn pin_viewport(&mut self) {
        with_document(self.sequencer.document(), |doc| {
            if doc.scroll_y() > 0.0 {
                doc.scroll_to(0.0, ScrollBehavior::Instant);
            }
        });
        self.last_scroll_y = 0.0;
    }

    fn nudge(&self) -> bool {
        let Some(tx) = &self.nudges else {
            return false;
        };
        match tx.try_send(Nudge) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "nudge not delivered");
                false
            }
        }
    }
}
