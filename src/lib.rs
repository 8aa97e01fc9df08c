//! `meridian-intro` - scripted intro sequencer for the Meridian Research
//! landing page
//!
//! The library models the page's intro as a linear step script driven by
//! a guarded state machine. It runs against any [`page::Document`]; the
//! in-memory [`page::Page`] backs the CLI and the tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod page;
pub mod sequencer;
