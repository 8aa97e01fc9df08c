//! Headless page
//!
//! The presentation layer the sequencer drives: the [`Document`] contract,
//! an in-memory [`Page`] implementing it, and the page chrome handlers
//! (navigation scrolling, mobile menu, resize marker, section fade-in).

pub mod chrome;
pub mod document;
pub mod memory;

pub use document::{
    Document, ElementRef, ScrollBehavior, SectionBounds, SharedDocument, StyleProperty,
    Visibility, with_document,
};
pub use memory::{Element, Page, ScrollRecord};
