//! Observability
//!
//! Logging and the structured JSONL event stream of an intro run.

pub mod events;
pub mod logging;

pub use events::{Event, EventEmitter};
pub use logging::{LogFormat, init_logging};
