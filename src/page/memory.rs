//! In-memory landing page
//!
//! A headless [`Document`] holding the elements of the Meridian Research
//! page. The CLI plays the intro against it and the tests inspect it.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::Serialize;

use crate::config::schema::IntroConfig;

use super::chrome::smooth_scroll_frames;
use super::document::{
    Document, ElementRef, HIDDEN, ScrollBehavior, SectionBounds, StyleProperty, Visibility,
};

/// One element: its classes, inline styles and geometry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Element {
    pub classes: BTreeSet<String>,
    pub styles: BTreeMap<StyleProperty, String>,
    pub text: String,
    pub height: f64,
}

impl Element {
    fn with_classes(classes: &[&str]) -> Self {
        Self {
            classes: classes.iter().map(|c| (*c).to_string()).collect(),
            ..Self::default()
        }
    }

    fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    const fn height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }
}

/// Duration of a simulated smooth scroll.
pub const SMOOTH_SCROLL_DURATION: Duration = Duration::from_millis(400);

/// Frame interval used to sample a smooth scroll.
pub const SCROLL_FRAME: Duration = Duration::from_millis(16);

/// Number of `scroll_to` calls a page remembers.
pub const SCROLL_HISTORY_LIMIT: usize = 64;

/// A recorded `scroll_to` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollRecord {
    pub top: f64,
    pub behavior: ScrollBehavior,
    /// Intermediate positions of a smooth scroll, ending at `top`.
    pub path: Vec<f64>,
}

/// Headless landing page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    elements: BTreeMap<ElementRef, Element>,
    sections: Vec<SectionBounds>,
    menu_links: Vec<String>,
    viewport_height: f64,
    scroll_y: f64,
    scroll_history: Vec<ScrollRecord>,
}

impl Page {
    /// Builds the page described by the configuration: body, four words,
    /// final phrase, logo, overlay, menu, content, quote and one menu link
    /// per section.
    #[must_use]
    pub fn from_config(config: &IntroConfig) -> Self {
        let mut page = Self {
            viewport_height: config.page.viewport_height,
            ..Self::default()
        };

        page.insert(ElementRef::Body, Element::with_classes(&["preload"]));
        for (i, label) in config.words.iter().enumerate() {
            page.insert(
                ElementRef::Word(i),
                Element::with_classes(&["word", HIDDEN]).text(label),
            );
        }
        page.insert(
            ElementRef::FinalPhrase,
            Element::default().text(&config.final_phrase),
        );
        page.insert(ElementRef::LogoReveal, Element::with_classes(&[HIDDEN]));
        page.insert(ElementRef::AnimationOverlay, Element::default());
        page.insert(ElementRef::MainContent, Element::default());
        page.insert(ElementRef::QuoteSection, Element::default());
        page.insert(ElementRef::Hamburger, Element::default());
        page.insert(ElementRef::NavMenu, Element::default());
        page.insert(ElementRef::LogoSection, Element::default());
        if let Some(height) = config.page.menu_height {
            page.insert(
                ElementRef::FloatingMenu,
                Element::with_classes(&[HIDDEN]).height(height),
            );
        }

        for section in &config.page.sections {
            page.add_section(&section.id, section.top, section.height);
        }

        page
    }

    /// Builds an empty page with only a body and the given viewport.
    #[must_use]
    pub fn blank(viewport_height: f64) -> Self {
        let mut page = Self {
            viewport_height,
            ..Self::default()
        };
        page.insert(ElementRef::Body, Element::default());
        page
    }

    /// Inserts (or replaces) an element.
    pub fn insert(&mut self, element: ElementRef, value: Element) {
        self.elements.insert(element, value);
    }

    /// Removes an element, simulating a missing node in the markup.
    pub fn remove(&mut self, element: &ElementRef) -> bool {
        if let ElementRef::Word(i) = element {
            // Later words shift down so `.word` indices stay dense
            if self.elements.remove(element).is_none() {
                return false;
            }
            let count = self.word_count();
            for j in (i + 1)..=count {
                if let Some(moved) = self.elements.remove(&ElementRef::Word(j)) {
                    self.elements.insert(ElementRef::Word(j - 1), moved);
                }
            }
            return true;
        }
        if let ElementRef::Section(id) = element {
            self.sections.retain(|s| &s.id != id);
        }
        if let ElementRef::MenuLink(href) = element {
            self.menu_links.retain(|h| h != href);
        }
        self.elements.remove(element).is_some()
    }

    /// Appends a `section[id]` and its menu link.
    pub fn add_section(&mut self, id: &str, top: f64, height: f64) {
        self.sections.push(SectionBounds {
            id: id.to_string(),
            top,
            height,
        });
        self.insert(
            ElementRef::Section(id.to_string()),
            Element::with_classes(&["section"]).height(height),
        );
        let href = format!("#{id}");
        self.insert(ElementRef::MenuLink(href.clone()), Element::default());
        self.menu_links.push(href);
    }

    /// Returns an element for inspection.
    #[must_use]
    pub fn element(&self, element: &ElementRef) -> Option<&Element> {
        self.elements.get(element)
    }

    /// Moves the viewport as a user scroll would (no `scroll_to` record).
    pub fn set_scroll_y(&mut self, y: f64) {
        self.scroll_y = y.max(0.0);
    }

    /// The most recent `scroll_to` calls, oldest first, at most
    /// [`SCROLL_HISTORY_LIMIT`].
    #[must_use]
    pub fn scroll_history(&self) -> &[ScrollRecord] {
        &self.scroll_history
    }

    /// Hrefs of the menu links currently marked active.
    #[must_use]
    pub fn active_links(&self) -> Vec<String> {
        self.menu_links
            .iter()
            .filter(|href| self.has_class(&ElementRef::MenuLink((*href).clone()), "active"))
            .cloned()
            .collect()
    }

    /// Display states of the mutually-exclusive entities: every word, the
    /// final phrase and the logo.
    #[must_use]
    pub fn exclusive_states(&self) -> Vec<(ElementRef, Visibility)> {
        (0..self.word_count())
            .map(ElementRef::Word)
            .chain([ElementRef::FinalPhrase, ElementRef::LogoReveal])
            .map(|el| {
                let visibility = self.visibility(&el);
                (el, visibility)
            })
            .collect()
    }

    /// Number of exclusive entities that are visible or struck.
    #[must_use]
    pub fn shown_count(&self) -> usize {
        self.exclusive_states()
            .iter()
            .filter(|(_, v)| *v != Visibility::Hidden)
            .count()
    }
}

impl Document for Page {
    fn exists(&self, element: &ElementRef) -> bool {
        self.elements.contains_key(element)
    }

    fn add_class(&mut self, element: &ElementRef, class: &str) -> bool {
        self.elements
            .get_mut(element)
            .map(|e| e.classes.insert(class.to_string()))
            .is_some()
    }

    fn remove_class(&mut self, element: &ElementRef, class: &str) -> bool {
        self.elements
            .get_mut(element)
            .map(|e| e.classes.remove(class))
            .is_some()
    }

    fn has_class(&self, element: &ElementRef, class: &str) -> bool {
        self.elements
            .get(element)
            .is_some_and(|e| e.classes.contains(class))
    }

    fn set_style(&mut self, element: &ElementRef, property: StyleProperty, value: &str) -> bool {
        self.elements
            .get_mut(element)
            .map(|e| e.styles.insert(property, value.to_string()))
            .is_some()
    }

    fn style(&self, element: &ElementRef, property: StyleProperty) -> Option<String> {
        self.elements
            .get(element)
            .and_then(|e| e.styles.get(&property).cloned())
    }

    fn word_count(&self) -> usize {
        self.elements
            .keys()
            .filter(|k| matches!(k, ElementRef::Word(_)))
            .count()
    }

    fn sections(&self) -> Vec<SectionBounds> {
        self.sections.clone()
    }

    fn menu_links(&self) -> Vec<String> {
        self.menu_links.clone()
    }

    fn offset_height(&self, element: &ElementRef) -> Option<f64> {
        self.elements.get(element).map(|e| e.height)
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior) {
        let top = top.max(0.0);
        let path = match behavior {
            ScrollBehavior::Instant => vec![top],
            ScrollBehavior::Smooth => {
                smooth_scroll_frames(self.scroll_y, top, SMOOTH_SCROLL_DURATION, SCROLL_FRAME)
            }
        };
        if self.scroll_history.len() == SCROLL_HISTORY_LIMIT {
            self.scroll_history.remove(0);
        }
        self.scroll_history.push(ScrollRecord {
            top,
            behavior,
            path,
        });
        self.scroll_y = top;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::document::{STRIKE, VISIBLE};

    fn page() -> Page {
        Page::from_config(&IntroConfig::default())
    }

    #[test]
    fn test_from_config_builds_landing_page() {
        let page = page();
        assert_eq!(page.word_count(), 4);
        assert!(page.has_class(&ElementRef::Body, "preload"));
        assert!(page.exists(&ElementRef::FloatingMenu));
        assert_eq!(page.offset_height(&ElementRef::FloatingMenu), Some(80.0));
        assert_eq!(page.sections().len(), 4);
        assert_eq!(page.menu_links()[0], "#about");
        assert_eq!(page.shown_count(), 0);
        assert_eq!(
            page.element(&ElementRef::Word(2)).map(|e| e.text.as_str()),
            Some("Guesswork")
        );
    }

    #[test]
    fn test_missing_menu_bar() {
        let mut config = IntroConfig::default();
        config.page.menu_height = None;
        let page = Page::from_config(&config);
        assert!(!page.exists(&ElementRef::FloatingMenu));
    }

    #[test]
    fn test_class_ops_on_missing_element_are_noops() {
        let mut page = Page::blank(800.0);
        assert!(!page.add_class(&ElementRef::LogoReveal, VISIBLE));
        assert!(!page.remove_class(&ElementRef::LogoReveal, VISIBLE));
        assert!(!page.set_style(&ElementRef::LogoReveal, StyleProperty::Display, "flex"));
        assert_eq!(page.toggle_class(&ElementRef::LogoReveal, "active"), None);
        assert!(!page.has_class(&ElementRef::LogoReveal, VISIBLE));
    }

    #[test]
    fn test_toggle_class() {
        let mut page = page();
        assert_eq!(page.toggle_class(&ElementRef::Hamburger, "active"), Some(true));
        assert!(page.has_class(&ElementRef::Hamburger, "active"));
        assert_eq!(page.toggle_class(&ElementRef::Hamburger, "active"), Some(false));
        assert!(!page.has_class(&ElementRef::Hamburger, "active"));
    }

    #[test]
    fn test_visibility_derivation() {
        let mut page = page();
        let word = ElementRef::Word(0);
        assert_eq!(page.visibility(&word), Visibility::Hidden);
        page.add_class(&word, VISIBLE);
        assert_eq!(page.visibility(&word), Visibility::Visible);
        page.add_class(&word, STRIKE);
        assert_eq!(page.visibility(&word), Visibility::Struck);
        assert_eq!(page.shown_count(), 1);
    }

    #[test]
    fn test_remove_word_keeps_indices_dense() {
        let mut page = page();
        assert!(page.remove(&ElementRef::Word(1)));
        assert_eq!(page.word_count(), 3);
        assert_eq!(
            page.element(&ElementRef::Word(1)).map(|e| e.text.as_str()),
            Some("Guesswork")
        );
        assert!(!page.exists(&ElementRef::Word(3)));
    }

    #[test]
    fn test_scroll_to_clamps_and_records() {
        let mut page = page();
        page.scroll_to(-40.0, ScrollBehavior::Instant);
        assert!(page.scroll_y().abs() < f64::EPSILON);
        page.scroll_to(1200.0, ScrollBehavior::Smooth);
        assert!((page.scroll_y() - 1200.0).abs() < f64::EPSILON);
        assert_eq!(page.scroll_history().len(), 2);
        assert_eq!(page.scroll_history()[1].behavior, ScrollBehavior::Smooth);
        assert_eq!(page.scroll_history()[0].path, vec![0.0]);
        let path = &page.scroll_history()[1].path;
        assert!(path.len() > 1);
        assert!(path.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_scroll_history_keeps_only_recent_calls() {
        let mut page = page();
        for i in 0..SCROLL_HISTORY_LIMIT + 10 {
            page.scroll_to(i as f64 * 10.0, ScrollBehavior::Smooth);
        }
        let history = page.scroll_history();
        assert_eq!(history.len(), SCROLL_HISTORY_LIMIT);
        assert!((history[0].top - 100.0).abs() < f64::EPSILON);
        let last = (SCROLL_HISTORY_LIMIT + 9) as f64 * 10.0;
        assert!((history[SCROLL_HISTORY_LIMIT - 1].top - last).abs() < f64::EPSILON);
    }
}
