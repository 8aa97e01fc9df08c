//! Presentation-layer contract
//!
//! The sequencer never touches a real DOM. It talks to a [`Document`]:
//! element lookup, class toggling, inline style mutation, geometry and
//! viewport scrolling. Every mutating call on a missing element is a
//! harmless no-op that reports `false`.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Class marking an element as shown.
pub const VISIBLE: &str = "visible";
/// Class marking an element as hidden.
pub const HIDDEN: &str = "hidden";
/// Class marking a word as struck through.
pub const STRIKE: &str = "strike";
/// Class marking an element as fading out.
pub const FADE_OUT: &str = "fade-out";
/// Class marking an active overlay, menu or link.
pub const ACTIVE: &str = "active";

/// Addressable elements of the landing page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum ElementRef {
    /// `document.body`
    Body,
    /// `.word` number *i* (0-based, document order)
    Word(usize),
    /// `#final-phrase`
    FinalPhrase,
    /// `#logo-reveal`
    LogoReveal,
    /// `#floating-menu`
    FloatingMenu,
    /// `#main-content`
    MainContent,
    /// `#animation-overlay`
    AnimationOverlay,
    /// `#quote-section`
    QuoteSection,
    /// `.hamburger`
    Hamburger,
    /// `.nav-menu`
    NavMenu,
    /// `.logo-section`
    LogoSection,
    /// `section[id]` with the given id
    Section(String),
    /// `.menu-links a` with the given `href`
    MenuLink(String),
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Body => f.write_str("body"),
            Self::Word(i) => write!(f, ".word[{i}]"),
            Self::FinalPhrase => f.write_str("#final-phrase"),
            Self::LogoReveal => f.write_str("#logo-reveal"),
            Self::FloatingMenu => f.write_str("#floating-menu"),
            Self::MainContent => f.write_str("#main-content"),
            Self::AnimationOverlay => f.write_str("#animation-overlay"),
            Self::QuoteSection => f.write_str("#quote-section"),
            Self::Hamburger => f.write_str(".hamburger"),
            Self::NavMenu => f.write_str(".nav-menu"),
            Self::LogoSection => f.write_str(".logo-section"),
            Self::Section(id) => write!(f, "section#{id}"),
            Self::MenuLink(href) => write!(f, ".menu-links a[href='{href}']"),
        }
    }
}

/// Inline style properties the page script mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleProperty {
    Display,
    Opacity,
    Visibility,
    Overflow,
}

/// How `scroll_to` moves the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    /// Jump immediately.
    Instant,
    /// Interpolate with the page's easing curve.
    Smooth,
}

/// Display state of a mutually-exclusive entity, derived from its classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Hidden,
    Visible,
    Struck,
}

/// Geometry of one `section[id]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionBounds {
    pub id: String,
    pub top: f64,
    pub height: f64,
}

/// DOM-like tree consumed by the sequencer, the scroll-spy and the chrome
/// handlers.
pub trait Document: Send {
    /// Returns whether the element is present.
    fn exists(&self, element: &ElementRef) -> bool;

    /// Adds a class; returns `false` if the element is missing.
    fn add_class(&mut self, element: &ElementRef, class: &str) -> bool;

    /// Removes a class; returns `false` if the element is missing.
    fn remove_class(&mut self, element: &ElementRef, class: &str) -> bool;

    /// Returns whether the element exists and carries the class.
    fn has_class(&self, element: &ElementRef, class: &str) -> bool;

    /// Sets an inline style; returns `false` if the element is missing.
    fn set_style(&mut self, element: &ElementRef, property: StyleProperty, value: &str) -> bool;

    /// Reads an inline style.
    fn style(&self, element: &ElementRef, property: StyleProperty) -> Option<String>;

    /// Number of `.word` elements.
    fn word_count(&self) -> usize;

    /// All `section[id]` elements in document order.
    fn sections(&self) -> Vec<SectionBounds>;

    /// `href` of every `.menu-links a`, in document order.
    fn menu_links(&self) -> Vec<String>;

    /// `offsetHeight` of an element.
    fn offset_height(&self, element: &ElementRef) -> Option<f64>;

    /// `window.innerHeight`.
    fn viewport_height(&self) -> f64;

    /// `window.scrollY`.
    fn scroll_y(&self) -> f64;

    /// `window.scrollTo`.
    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior);

    /// Toggles a class. Returns the new membership, or `None` if the
    /// element is missing.
    fn toggle_class(&mut self, element: &ElementRef, class: &str) -> Option<bool> {
        if !self.exists(element) {
            return None;
        }
        if self.has_class(element, class) {
            self.remove_class(element, class);
            Some(false)
        } else {
            self.add_class(element, class);
            Some(true)
        }
    }

    /// Removes several classes at once.
    fn remove_classes(&mut self, element: &ElementRef, classes: &[&str]) -> bool {
        classes
            .iter()
            .fold(self.exists(element), |present, class| {
                self.remove_class(element, class) && present
            })
    }

    /// Derives the display state from `strike` / `visible` classes.
    fn visibility(&self, element: &ElementRef) -> Visibility {
        if self.has_class(element, STRIKE) {
            Visibility::Struck
        } else if self.has_class(element, VISIBLE) {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }
}

impl std::fmt::Debug for dyn Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("word_count", &self.word_count())
            .field("scroll_y", &self.scroll_y())
            .finish_non_exhaustive()
    }
}

/// A document shared between the sequencer, its timer tasks and the
/// input router.
pub type SharedDocument = Arc<Mutex<dyn Document>>;

/// Runs `f` with exclusive access to the document.
///
/// A poisoned lock is recovered, not propagated.
pub fn with_document<R>(document: &SharedDocument, f: impl FnOnce(&mut dyn Document) -> R) -> R {
    let mut guard = document.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut *guard)
}
