//! Configuration
//!
//! YAML configuration for an intro run: word labels, timing table,
//! scroll-spy offsets and the layout of the headless page. Every field
//! defaults to the stock landing page.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::{
    DriveMode, IntroConfig, PageLayout, ScrollSpyConfig, SectionLayout, TimingConfig, WORD_COUNT,
};
pub use validation::{ValidationResult, Validator};
