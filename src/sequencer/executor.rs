//! Transition executor
//!
//! Performs the visual effect of one action against the [`Document`] and
//! reports how long the guard must be held plus the effects that have to
//! run later. The executor never sleeps; the sequencer schedules the
//! returned [`Deferred`] list on its timer task.
//!
//! After every call to [`TransitionExecutor::execute`] at most one of the
//! exclusive entities (the words, the final phrase, the logo) is visible
//! or struck.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::schema::TimingConfig;
use crate::page::document::{
    ACTIVE, Document, ElementRef, FADE_OUT, HIDDEN, STRIKE, ScrollBehavior, SharedDocument,
    StyleProperty, VISIBLE, with_document,
};

use super::script::Action;

/// Body class present while the intro owns the viewport.
pub const ANIMATION_ACTIVE: &str = "animation-active";
/// Body class present once the intro is over.
pub const ANIMATION_COMPLETE: &str = "animation-complete";
/// Body class present once the floating menu is shown.
pub const MENU_VISIBLE: &str = "menu-visible";
/// Body class removed when the page becomes ready.
pub const PRELOAD: &str = "preload";

/// An effect the sequencer runs `after` the action fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deferred {
    pub after: Duration,
    pub effect: DeferredEffect,
}

/// Continuations produced by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferredEffect {
    /// A struck word collapses to hidden.
    SettleStrike(usize),
    /// The faded final phrase leaves the layout.
    CollapseFinalPhrase,
    /// Main content becomes visible and the viewport jumps to the top.
    RevealMainContent,
}

/// Outcome of executing one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// How long the guard stays held; zero means release immediately.
    pub lock: Duration,
    /// Effects to run later, in any order.
    pub deferred: Vec<Deferred>,
}

impl Transition {
    /// A transition that releases the guard at once and defers nothing.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            lock: Duration::ZERO,
            deferred: Vec::new(),
        }
    }

    const fn locked(lock: Duration) -> Self {
        Self {
            lock,
            deferred: Vec::new(),
        }
    }

    fn then(mut self, after: Duration, effect: DeferredEffect) -> Self {
        self.deferred.push(Deferred { after, effect });
        self
    }
}

/// Applies actions and deferred effects to a shared document.
#[derive(Debug, Clone)]
pub struct TransitionExecutor {
    document: SharedDocument,
    timing: TimingConfig,
}

impl TransitionExecutor {
    /// Creates an executor over `document` using the given lock table.
    #[must_use]
    pub const fn new(document: SharedDocument, timing: TimingConfig) -> Self {
        Self { document, timing }
    }

    /// Returns the lock table in use.
    #[must_use]
    pub const fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Puts the page in its pre-intro stage: nothing exclusive is shown,
    /// the overlay is active, main content and the menu are hidden.
    pub fn prepare_stage(&self) {
        with_document(&self.document, |doc| {
            doc.remove_class(&ElementRef::Body, PRELOAD);
            doc.remove_classes(&ElementRef::Body, &[ANIMATION_COMPLETE, MENU_VISIBLE]);
            doc.add_class(&ElementRef::Body, ANIMATION_ACTIVE);

            hide_words(doc, None);
            collapse(doc, &ElementRef::FinalPhrase);
            doc.remove_class(&ElementRef::FinalPhrase, FADE_OUT);
            collapse(doc, &ElementRef::LogoReveal);
            doc.remove_class(&ElementRef::LogoReveal, FADE_OUT);
            doc.add_class(&ElementRef::LogoReveal, HIDDEN);

            if doc.exists(&ElementRef::FloatingMenu) {
                doc.remove_class(&ElementRef::FloatingMenu, VISIBLE);
                doc.add_class(&ElementRef::FloatingMenu, HIDDEN);
                doc.set_style(&ElementRef::FloatingMenu, StyleProperty::Display, "none");
            }

            let main = ElementRef::MainContent;
            doc.set_style(&main, StyleProperty::Opacity, "0");
            doc.set_style(&main, StyleProperty::Visibility, "hidden");
            doc.remove_class(&main, VISIBLE);

            doc.remove_class(&ElementRef::AnimationOverlay, HIDDEN);
            doc.add_class(&ElementRef::AnimationOverlay, ACTIVE);

            doc.remove_class(&ElementRef::QuoteSection, VISIBLE);
            for href in doc.menu_links() {
                doc.remove_class(&ElementRef::MenuLink(href), ACTIVE);
            }
            for section in doc.sections() {
                doc.remove_class(&ElementRef::Section(section.id), VISIBLE);
            }
        });
        debug!("initial stage prepared");
    }

    /// Executes one action.
    pub fn execute(&self, action: Action) -> Transition {
        with_document(&self.document, |doc| match action {
            Action::RevealWord(i) => self.reveal_word(doc, i),
            Action::StrikeWord(i) => self.strike_word(doc, i),
            Action::RevealFinalPhrase => self.reveal_final_phrase(doc),
            Action::HideFinalPhrase => self.hide_final_phrase(doc),
            Action::RevealLogo => self.reveal_logo(doc),
            Action::Complete => self.complete(doc),
        })
    }

    /// Runs a deferred effect.
    pub fn apply_deferred(&self, effect: DeferredEffect) {
        debug!(?effect, "applying deferred effect");
        with_document(&self.document, |doc| match effect {
            DeferredEffect::SettleStrike(i) => {
                let word = ElementRef::Word(i);
                // Only a word still struck collapses; a reveal may have replaced it
                if doc.has_class(&word, STRIKE) {
                    collapse(doc, &word);
                }
            }
            DeferredEffect::CollapseFinalPhrase => {
                if !doc.has_class(&ElementRef::FinalPhrase, VISIBLE) {
                    doc.set_style(&ElementRef::FinalPhrase, StyleProperty::Display, "none");
                }
            }
            DeferredEffect::RevealMainContent => {
                let main = ElementRef::MainContent;
                doc.set_style(&main, StyleProperty::Visibility, "visible");
                doc.set_style(&main, StyleProperty::Opacity, "1");
                doc.add_class(&main, VISIBLE);
                doc.scroll_to(0.0, ScrollBehavior::Instant);
            }
        });
    }

    fn reveal_word(&self, doc: &mut dyn Document, index: usize) -> Transition {
        if index >= doc.word_count() {
            warn!(index, words = doc.word_count(), "word index out of range");
            return Transition::immediate();
        }
        hide_words(doc, Some(index));
        collapse(doc, &ElementRef::FinalPhrase);
        collapse(doc, &ElementRef::LogoReveal);

        let word = ElementRef::Word(index);
        doc.set_style(&word, StyleProperty::Display, "flex");
        doc.remove_classes(&word, &[HIDDEN, STRIKE]);
        doc.add_class(&word, VISIBLE);

        Transition::locked(self.timing.reveal_lock)
    }

    fn strike_word(&self, doc: &mut dyn Document, index: usize) -> Transition {
        if index >= doc.word_count() {
            warn!(index, words = doc.word_count(), "word index out of range");
            return Transition::immediate();
        }
        let word = ElementRef::Word(index);
        if !doc.has_class(&word, VISIBLE) {
            debug!(index, "word not visible; nothing to strike");
            return Transition::immediate();
        }
        doc.add_class(&word, STRIKE);

        let lock = self.timing.strike_lock;
        Transition::locked(lock).then(lock, DeferredEffect::SettleStrike(index))
    }

    fn reveal_final_phrase(&self, doc: &mut dyn Document) -> Transition {
        hide_words(doc, None);
        collapse(doc, &ElementRef::LogoReveal);

        let phrase = ElementRef::FinalPhrase;
        if doc.exists(&phrase) {
            doc.set_style(&phrase, StyleProperty::Display, "flex");
            doc.remove_class(&phrase, FADE_OUT);
            doc.add_class(&phrase, VISIBLE);
        } else {
            warn!(element = %phrase, "element missing; skipping reveal");
        }

        Transition::locked(self.timing.reveal_lock)
    }

    fn hide_final_phrase(&self, doc: &mut dyn Document) -> Transition {
        let lock = self.timing.reveal_lock;
        let phrase = ElementRef::FinalPhrase;
        if !doc.exists(&phrase) {
            warn!(element = %phrase, "element missing; skipping fade-out");
            return Transition::locked(lock);
        }
        doc.add_class(&phrase, FADE_OUT);
        doc.remove_class(&phrase, VISIBLE);

        Transition::locked(lock).then(lock, DeferredEffect::CollapseFinalPhrase)
    }

    fn reveal_logo(&self, doc: &mut dyn Document) -> Transition {
        hide_words(doc, None);
        collapse(doc, &ElementRef::FinalPhrase);

        let logo = ElementRef::LogoReveal;
        if doc.exists(&logo) {
            doc.set_style(&logo, StyleProperty::Display, "flex");
            doc.remove_classes(&logo, &[HIDDEN, FADE_OUT]);
            doc.add_class(&logo, VISIBLE);
        } else {
            warn!(element = %logo, "element missing; skipping reveal");
        }

        Transition::locked(self.timing.reveal_lock)
    }

    fn complete(&self, doc: &mut dyn Document) -> Transition {
        let logo = ElementRef::LogoReveal;
        if doc.exists(&logo) {
            doc.add_class(&logo, FADE_OUT);
            doc.remove_class(&logo, VISIBLE);
            doc.set_style(&logo, StyleProperty::Display, "none");
        }

        let menu = ElementRef::FloatingMenu;
        if doc.exists(&menu) {
            doc.remove_class(&menu, HIDDEN);
            doc.add_class(&menu, VISIBLE);
            doc.set_style(&menu, StyleProperty::Display, "block");
            doc.add_class(&ElementRef::Body, MENU_VISIBLE);
        } else {
            warn!(element = %menu, "element missing; navigation chrome stays hidden");
        }

        doc.remove_class(&ElementRef::AnimationOverlay, ACTIVE);
        doc.add_class(&ElementRef::AnimationOverlay, HIDDEN);

        doc.remove_class(&ElementRef::Body, ANIMATION_ACTIVE);
        doc.add_class(&ElementRef::Body, ANIMATION_COMPLETE);

        let transition = Transition::locked(self.timing.complete_lock);
        if doc.exists(&ElementRef::MainContent) {
            transition.then(
                self.timing.content_reveal_delay,
                DeferredEffect::RevealMainContent,
            )
        } else {
            transition
        }
    }
}

/// Hides every word except `keep`.
fn hide_words(doc: &mut dyn Document, keep: Option<usize>) {
    for i in 0..doc.word_count() {
        if Some(i) != keep {
            collapse(doc, &ElementRef::Word(i));
        }
    }
}

/// Removes an element from view and from the layout.
fn collapse(doc: &mut dyn Document, element: &ElementRef) {
    if doc.remove_classes(element, &[VISIBLE, STRIKE]) {
        if matches!(element, ElementRef::Word(_)) {
            doc.add_class(element, HIDDEN);
        }
        doc.set_style(element, StyleProperty::Display, "none");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::IntroConfig;
    use crate::page::document::Visibility;
    use crate::page::memory::Page;
    use std::sync::{Arc, Mutex};

    fn setup() -> (Arc<Mutex<Page>>, TransitionExecutor) {
        let page = Arc::new(Mutex::new(Page::from_config(&IntroConfig::default())));
        let shared: SharedDocument = page.clone();
        let executor = TransitionExecutor::new(shared, TimingConfig::default());
        executor.prepare_stage();
        (page, executor)
    }

    fn visibility(page: &Arc<Mutex<Page>>, element: &ElementRef) -> Visibility {
        page.lock().unwrap().visibility(element)
    }

    #[test]
    fn test_prepare_stage() {
        let (page, _) = setup();
        let page = page.lock().unwrap();
        assert!(!page.has_class(&ElementRef::Body, PRELOAD));
        assert!(page.has_class(&ElementRef::Body, ANIMATION_ACTIVE));
        assert!(page.has_class(&ElementRef::AnimationOverlay, ACTIVE));
        assert_eq!(
            page.style(&ElementRef::MainContent, StyleProperty::Opacity).as_deref(),
            Some("0")
        );
        assert_eq!(page.shown_count(), 0);
    }

    #[test]
    fn test_reveal_word_hides_others() {
        let (page, executor) = setup();
        let t = executor.execute(Action::RevealWord(0));
        assert_eq!(t.lock, Duration::from_millis(800));
        assert!(t.deferred.is_empty());
        assert_eq!(visibility(&page, &ElementRef::Word(0)), Visibility::Visible);

        executor.execute(Action::RevealWord(2));
        assert_eq!(visibility(&page, &ElementRef::Word(0)), Visibility::Hidden);
        assert_eq!(visibility(&page, &ElementRef::Word(2)), Visibility::Visible);
        assert_eq!(page.lock().unwrap().shown_count(), 1);
    }

    #[test]
    fn test_strike_defers_collapse() {
        let (page, executor) = setup();
        executor.execute(Action::RevealWord(1));
        let t = executor.execute(Action::StrikeWord(1));
        assert_eq!(t.lock, Duration::from_millis(1000));
        assert_eq!(
            t.deferred,
            vec![Deferred {
                after: Duration::from_millis(1000),
                effect: DeferredEffect::SettleStrike(1),
            }]
        );
        assert_eq!(visibility(&page, &ElementRef::Word(1)), Visibility::Struck);

        executor.apply_deferred(DeferredEffect::SettleStrike(1));
        assert_eq!(visibility(&page, &ElementRef::Word(1)), Visibility::Hidden);
        assert_eq!(
            page.lock()
                .unwrap()
                .style(&ElementRef::Word(1), StyleProperty::Display)
                .as_deref(),
            Some("none")
        );
    }

    #[test]
    fn test_strike_hidden_word_releases_immediately() {
        let (page, executor) = setup();
        let t = executor.execute(Action::StrikeWord(0));
        assert_eq!(t, Transition::immediate());
        assert_eq!(visibility(&page, &ElementRef::Word(0)), Visibility::Hidden);
    }

    #[test]
    fn test_out_of_range_word_is_noop() {
        let (page, executor) = setup();
        assert_eq!(executor.execute(Action::RevealWord(9)), Transition::immediate());
        assert_eq!(executor.execute(Action::StrikeWord(4)), Transition::immediate());
        assert_eq!(page.lock().unwrap().shown_count(), 0);
    }

    #[test]
    fn test_final_phrase_in_and_out() {
        let (page, executor) = setup();
        executor.execute(Action::RevealWord(3));
        executor.execute(Action::StrikeWord(3));
        executor.execute(Action::RevealFinalPhrase);
        assert_eq!(visibility(&page, &ElementRef::Word(3)), Visibility::Hidden);
        assert_eq!(
            visibility(&page, &ElementRef::FinalPhrase),
            Visibility::Visible
        );

        let t = executor.execute(Action::HideFinalPhrase);
        assert_eq!(t.deferred[0].effect, DeferredEffect::CollapseFinalPhrase);
        {
            let page = page.lock().unwrap();
            assert!(page.has_class(&ElementRef::FinalPhrase, FADE_OUT));
            assert_eq!(page.visibility(&ElementRef::FinalPhrase), Visibility::Hidden);
            assert_eq!(
                page.style(&ElementRef::FinalPhrase, StyleProperty::Display).as_deref(),
                Some("flex")
            );
        }
        executor.apply_deferred(DeferredEffect::CollapseFinalPhrase);
        assert_eq!(
            page.lock()
                .unwrap()
                .style(&ElementRef::FinalPhrase, StyleProperty::Display)
                .as_deref(),
            Some("none")
        );
    }

    #[test]
    fn test_complete_exposes_chrome() {
        let (page, executor) = setup();
        executor.execute(Action::RevealLogo);
        assert_eq!(visibility(&page, &ElementRef::LogoReveal), Visibility::Visible);

        let t = executor.execute(Action::Complete);
        assert_eq!(t.lock, Duration::from_millis(500));
        assert_eq!(
            t.deferred,
            vec![Deferred {
                after: Duration::from_millis(300),
                effect: DeferredEffect::RevealMainContent,
            }]
        );

        {
            let page = page.lock().unwrap();
            assert_eq!(page.visibility(&ElementRef::LogoReveal), Visibility::Hidden);
            assert_eq!(
                page.style(&ElementRef::LogoReveal, StyleProperty::Display).as_deref(),
                Some("none")
            );
            assert!(page.has_class(&ElementRef::FloatingMenu, VISIBLE));
            assert!(page.has_class(&ElementRef::Body, MENU_VISIBLE));
            assert!(page.has_class(&ElementRef::Body, ANIMATION_COMPLETE));
            assert!(!page.has_class(&ElementRef::Body, ANIMATION_ACTIVE));
            assert!(page.has_class(&ElementRef::AnimationOverlay, HIDDEN));
            assert!(!page.has_class(&ElementRef::MainContent, VISIBLE));
            assert_eq!(page.shown_count(), 0);
        }

        page.lock().unwrap().set_scroll_y(400.0);
        executor.apply_deferred(DeferredEffect::RevealMainContent);
        let page = page.lock().unwrap();
        assert!(page.has_class(&ElementRef::MainContent, VISIBLE));
        assert_eq!(
            page.style(&ElementRef::MainContent, StyleProperty::Opacity).as_deref(),
            Some("1")
        );
        assert!(page.scroll_y().abs() < f64::EPSILON);
    }

    #[test]
    fn test_complete_with_missing_elements() {
        let mut bare = Page::blank(900.0);
        bare.insert(ElementRef::LogoReveal, crate::page::memory::Element::default());
        let page = Arc::new(Mutex::new(bare));
        let shared: SharedDocument = page.clone();
        let executor = TransitionExecutor::new(shared, TimingConfig::default());

        let t = executor.execute(Action::Complete);
        assert!(t.deferred.is_empty());
        let page = page.lock().unwrap();
        assert!(!page.has_class(&ElementRef::Body, MENU_VISIBLE));
        assert!(page.has_class(&ElementRef::Body, ANIMATION_COMPLETE));
    }

    #[test]
    fn test_settle_skips_rerevealed_word() {
        let (page, executor) = setup();
        executor.execute(Action::RevealWord(0));
        executor.execute(Action::StrikeWord(0));
        executor.execute(Action::RevealWord(0));
        executor.apply_deferred(DeferredEffect::SettleStrike(0));
        assert_eq!(visibility(&page, &ElementRef::Word(0)), Visibility::Visible);
    }
}
