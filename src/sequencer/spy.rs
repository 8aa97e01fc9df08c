//! Scroll-spy
//!
//! Post-intro highlighting of the menu link for the section under the
//! viewport, plus the quote fade. [`resolve`] is a pure function of the
//! scroll position; [`ScrollSpy::apply`] writes its reading to the page
//! and is idempotent.

use serde::Serialize;

use crate::config::schema::ScrollSpyConfig;
use crate::page::document::{ACTIVE, Document, ElementRef, SectionBounds, VISIBLE};

/// What scroll-spy decided for one scroll position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpyReading {
    /// Section whose menu link is active.
    pub active_section: Option<String>,
    /// Whether the quote is shown.
    pub quote_visible: bool,
}

impl SpyReading {
    /// `href` of the link that should be active.
    #[must_use]
    pub fn active_href(&self) -> Option<String> {
        self.active_section.as_ref().map(|id| format!("#{id}"))
    }
}

/// Resolves the active section and quote visibility.
///
/// The **last** section in document order whose `top - pre_trigger_margin`
/// lies at or above `scroll_y + scroll_offset` wins.
#[must_use]
pub fn resolve(
    sections: &[SectionBounds],
    scroll_y: f64,
    viewport_height: f64,
    config: &ScrollSpyConfig,
) -> SpyReading {
    let position = scroll_y + config.scroll_offset;
    let active_section = sections
        .iter()
        .rev()
        .find(|s| position >= s.top - config.pre_trigger_margin)
        .map(|s| s.id.clone());

    SpyReading {
        active_section,
        quote_visible: scroll_y < viewport_height * config.quote_fraction,
    }
}

/// Applies [`resolve`] to a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollSpy {
    config: ScrollSpyConfig,
}

impl ScrollSpy {
    #[must_use]
    pub const fn new(config: ScrollSpyConfig) -> Self {
        Self { config }
    }

    /// Marks exactly the matching menu link active and shows or hides the
    /// quote.
    pub fn apply(&self, doc: &mut dyn Document) -> SpyReading {
        let reading = resolve(
            &doc.sections(),
            doc.scroll_y(),
            doc.viewport_height(),
            &self.config,
        );

        let active = reading.active_href();
        for href in doc.menu_links() {
            let is_active = active.as_deref() == Some(href.as_str());
            let link = ElementRef::MenuLink(href);
            doc.remove_class(&link, ACTIVE);
            if is_active {
                doc.add_class(&link, ACTIVE);
            }
        }

        if reading.quote_visible {
            doc.add_class(&ElementRef::QuoteSection, VISIBLE);
        } else {
            doc.remove_class(&ElementRef::QuoteSection, VISIBLE);
        }

        reading
    }
}
