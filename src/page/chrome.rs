//! Page chrome handlers
//!
//! Navigation-link smooth scrolling, the mobile hamburger menu, the
//! resize marker and the decorative section fade-in. None of these touch
//! sequencer state; they only read the completion flag where the page
//! script gates on it.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::document::{
    ACTIVE, Document, ElementRef, ScrollBehavior, SharedDocument, StyleProperty, VISIBLE,
    with_document,
};

/// Menu height assumed when the floating menu is missing.
pub const FALLBACK_MENU_HEIGHT: f64 = 80.0;

/// Gap kept between the menu bar and a section scrolled into view.
pub const NAV_SCROLL_GAP: f64 = 40.0;

/// Minimum intersection ratio for a section to fade in.
pub const REVEAL_THRESHOLD: f64 = 0.1;

/// Bottom root margin of the fade-in observer (shrinks the viewport).
pub const REVEAL_BOTTOM_MARGIN: f64 = 50.0;

/// Class added to the body while a resize is in progress.
pub const RESIZING: &str = "resizing";

// ============================================================================
// Navigation
// ============================================================================

/// Handles a click on a menu link: smooth-scrolls so the target section
/// sits below the menu bar and closes the mobile menu.
///
/// Returns the scroll target, or `None` when the href does not name an
/// existing section.
pub fn navigate_to(document: &mut dyn Document, href: &str) -> Option<f64> {
    let id = href.strip_prefix('#')?;
    let section = document.sections().into_iter().find(|s| s.id == id)?;

    let menu_height = document
        .offset_height(&ElementRef::FloatingMenu)
        .unwrap_or(FALLBACK_MENU_HEIGHT);
    let target = section.top - menu_height - NAV_SCROLL_GAP;
    document.scroll_to(target, ScrollBehavior::Smooth);
    debug!(href, target, "navigating to section");

    if document.has_class(&ElementRef::NavMenu, ACTIVE) {
        close_mobile_menu(document);
    }

    Some(target)
}

/// Handles a click on the logo: smooth-scrolls back to the top.
pub fn scroll_to_top(document: &mut dyn Document) {
    document.scroll_to(0.0, ScrollBehavior::Smooth);
}

// ============================================================================
// Mobile menu
// ============================================================================

/// Toggles the hamburger menu. Body scrolling is frozen while it is open.
///
/// Returns the new open state, or `None` if the hamburger or the menu is
/// missing.
pub fn toggle_mobile_menu(document: &mut dyn Document) -> Option<bool> {
    if !document.exists(&ElementRef::Hamburger) || !document.exists(&ElementRef::NavMenu) {
        return None;
    }
    document.toggle_class(&ElementRef::Hamburger, ACTIVE);
    let open = document.toggle_class(&ElementRef::NavMenu, ACTIVE)?;
    let overflow = if open { "hidden" } else { "auto" };
    document.set_style(&ElementRef::Body, StyleProperty::Overflow, overflow);
    Some(open)
}

fn close_mobile_menu(document: &mut dyn Document) {
    document.remove_class(&ElementRef::NavMenu, ACTIVE);
    document.remove_class(&ElementRef::Hamburger, ACTIVE);
    document.set_style(&ElementRef::Body, StyleProperty::Overflow, "auto");
}

// ============================================================================
// Resize marker
// ============================================================================

/// Adds `resizing` to the body and clears it once resizes stop for
/// `delay`.
#[derive(Debug)]
pub struct ResizeDebouncer {
    document: SharedDocument,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ResizeDebouncer {
    /// Creates a debouncer for the given document.
    #[must_use]
    pub fn new(document: SharedDocument, delay: Duration) -> Self {
        Self {
            document,
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Records a resize event. Must be called from within a Tokio runtime.
    pub fn on_resize(&self) {
        with_document(&self.document, |doc| {
            doc.add_class(&ElementRef::Body, RESIZING);
        });

        let document = self.document.clone();
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            with_document(&document, |doc| {
                doc.remove_class(&ElementRef::Body, RESIZING);
            });
        });

        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }
}

impl Drop for ResizeDebouncer {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(task) = pending.take() {
            task.abort();
        }
    }
}

// ============================================================================
// Section fade-in
// ============================================================================

/// Fraction of a section's height inside the observer viewport
/// (`[scroll_y, scroll_y + viewport - 50]`).
#[must_use]
pub fn intersection_ratio(scroll_y: f64, viewport_height: f64, top: f64, height: f64) -> f64 {
    if height <= 0.0 {
        return 0.0;
    }
    let view_top = scroll_y;
    let view_bottom = scroll_y + viewport_height - REVEAL_BOTTOM_MARGIN;
    let overlap = (view_bottom.min(top + height) - view_top.max(top)).max(0.0);
    (overlap / height).min(1.0)
}

/// Fades in every section that intersects the viewport enough. Sections
/// stay visible once revealed; nothing happens before the intro completes.
///
/// Returns the ids revealed by this call.
pub fn reveal_sections(document: &mut dyn Document, animation_complete: bool) -> Vec<String> {
    if !animation_complete {
        return Vec::new();
    }
    let scroll_y = document.scroll_y();
    let viewport = document.viewport_height();

    let mut revealed = Vec::new();
    for section in document.sections() {
        let element = ElementRef::Section(section.id.clone());
        if document.has_class(&element, VISIBLE) {
            continue;
        }
        if intersection_ratio(scroll_y, viewport, section.top, section.height) >= REVEAL_THRESHOLD {
            document.add_class(&element, VISIBLE);
            revealed.push(section.id);
        }
    }
    revealed
}

// ============================================================================
// Easing
// ============================================================================

/// Quadratic ease-in-out: value at time `t` of a move from `b` by `c`
/// over duration `d`.
#[must_use]
pub fn ease_in_out_quad(t: f64, b: f64, c: f64, d: f64) -> f64 {
    if d <= 0.0 {
        return b + c;
    }
    let mut t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t + b;
    }
    t -= 1.0;
    -c / 2.0 * t.mul_add(t - 2.0, -1.0) + b
}

/// Scroll positions of a smooth scroll sampled every `frame`.
///
/// The final sample is always exactly `to`.
#[must_use]
pub fn smooth_scroll_frames(from: f64, to: f64, duration: Duration, frame: Duration) -> Vec<f64> {
    let total = duration.as_secs_f64();
    let step = frame.as_secs_f64();
    if total <= 0.0 || step <= 0.0 {
        return vec![to];
    }
    let mut frames = Vec::new();
    let mut t = step;
    while t < total {
        frames.push(ease_in_out_quad(t, from, to - from, total));
        t += step;
    }
    frames.push(to);
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::IntroConfig;
    use crate::page::memory::Page;
    use std::sync::Arc;

    fn page() -> Page {
        Page::from_config(&IntroConfig::default())
    }

    #[test]
    fn test_navigate_accounts_for_menu_height() {
        let mut page = page();
        let target = navigate_to(&mut page, "#research").unwrap();
        // research.top (900) - menu (80) - gap (40)
        assert!((target - 780.0).abs() < f64::EPSILON);
        assert_eq!(
            page.scroll_history().last().map(|r| r.behavior),
            Some(ScrollBehavior::Smooth)
        );
    }

    #[test]
    fn test_navigate_without_menu_uses_fallback() {
        let mut page = page();
        page.remove(&ElementRef::FloatingMenu);
        let target = navigate_to(&mut page, "#team").unwrap();
        assert!((target - (2100.0 - 80.0 - 40.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_navigate_unknown_target() {
        let mut page = page();
        assert_eq!(navigate_to(&mut page, "#pricing"), None);
        assert_eq!(navigate_to(&mut page, "research"), None);
        assert!(page.scroll_history().is_empty());
    }

    #[test]
    fn test_navigate_closes_open_menu() {
        let mut page = page();
        assert_eq!(toggle_mobile_menu(&mut page), Some(true));
        assert_eq!(
            page.style(&ElementRef::Body, StyleProperty::Overflow).as_deref(),
            Some("hidden")
        );

        navigate_to(&mut page, "#contact");
        assert!(!page.has_class(&ElementRef::NavMenu, ACTIVE));
        assert!(!page.has_class(&ElementRef::Hamburger, ACTIVE));
        assert_eq!(
            page.style(&ElementRef::Body, StyleProperty::Overflow).as_deref(),
            Some("auto")
        );
    }

    #[test]
    fn test_toggle_menu_requires_both_elements() {
        let mut page = page();
        page.remove(&ElementRef::Hamburger);
        assert_eq!(toggle_mobile_menu(&mut page), None);
        assert!(!page.has_class(&ElementRef::NavMenu, ACTIVE));
    }

    #[test]
    fn test_logo_click_scrolls_to_top() {
        let mut page = page();
        page.set_scroll_y(1500.0);
        scroll_to_top(&mut page);
        assert!(page.scroll_y().abs() < f64::EPSILON);
    }

    #[test]
    fn test_intersection_ratio() {
        // viewport 900 with -50 margin shows [0, 850]
        assert!((intersection_ratio(0.0, 900.0, 0.0, 850.0) - 1.0).abs() < 1e-9);
        assert!((intersection_ratio(0.0, 900.0, 800.0, 500.0) - 0.1).abs() < 1e-9);
        assert!(intersection_ratio(0.0, 900.0, 2000.0, 500.0).abs() < 1e-9);
        assert!(intersection_ratio(0.0, 900.0, 0.0, 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_reveal_sections_gated_on_completion() {
        let mut page = page();
        assert!(reveal_sections(&mut page, false).is_empty());

        let revealed = reveal_sections(&mut page, true);
        assert_eq!(revealed, vec!["about".to_string()]);

        page.set_scroll_y(1000.0);
        let revealed = reveal_sections(&mut page, true);
        assert_eq!(revealed, vec!["research".to_string()]);
        // already-visible sections are not reported twice
        assert!(reveal_sections(&mut page, true).is_empty());
    }

    #[test]
    fn test_easing_endpoints() {
        assert!((ease_in_out_quad(0.0, 100.0, 400.0, 1.0) - 100.0).abs() < 1e-9);
        assert!((ease_in_out_quad(0.5, 100.0, 400.0, 1.0) - 300.0).abs() < 1e-9);
        assert!((ease_in_out_quad(1.0, 100.0, 400.0, 1.0) - 500.0).abs() < 1e-9);
        assert!((ease_in_out_quad(0.3, 0.0, 10.0, 0.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_smooth_scroll_frames_monotonic() {
        let frames = smooth_scroll_frames(
            0.0,
            780.0,
            Duration::from_millis(400),
            Duration::from_millis(16),
        );
        assert!(frames.len() > 10);
        assert!(frames.windows(2).all(|w| w[0] <= w[1]));
        assert!((frames.last().copied().unwrap() - 780.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_marker_debounced() {
        let page = Arc::new(Mutex::new(page()));
        let shared: SharedDocument = page.clone();
        let debouncer = ResizeDebouncer::new(shared, Duration::from_millis(250));

        debouncer.on_resize();
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.on_resize();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(page.lock().unwrap().has_class(&ElementRef::Body, RESIZING));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!page.lock().unwrap().has_class(&ElementRef::Body, RESIZING));
    }
}
