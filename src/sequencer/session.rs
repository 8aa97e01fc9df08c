//! Intro session
//!
//! Wires a sequencer, the driver selected by [`DriveMode`] and an input
//! router over one document.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::schema::{DriveMode, IntroConfig};
use crate::observability::EventEmitter;
use crate::page::document::SharedDocument;

use super::driver::{AutoplayDriver, DriveReport, Driver, InteractiveDriver};
use super::engine::Sequencer;
use super::input::InputRouter;

/// One page view: sequencer, driver and router.
#[derive(Debug)]
pub struct IntroSession {
    sequencer: Arc<Sequencer>,
    router: InputRouter,
    mode: DriveMode,
    driver: Option<Box<dyn Driver>>,
}

impl IntroSession {
    /// Builds a session in `mode` (the configuration's `mode` is ignored,
    /// so callers can override it).
    #[must_use]
    pub fn new(
        document: SharedDocument,
        config: &IntroConfig,
        mode: DriveMode,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        let sequencer = Arc::new(Sequencer::new(document, config).with_emitter(emitter));

        let (nudges, driver) = match mode {
            DriveMode::Autoplay => {
                let driver = AutoplayDriver::new(config.timing.autoplay_delays.clone());
                (None, Box::new(driver) as Box<dyn Driver>)
            }
            DriveMode::Interactive => {
                let (tx, driver) = InteractiveDriver::channel(config.timing.input_debounce);
                (Some(tx), Box::new(driver) as Box<dyn Driver>)
            }
        };

        let router = InputRouter::new(Arc::clone(&sequencer), nudges);
        Self {
            sequencer,
            router,
            mode,
            driver: Some(driver),
        }
    }

    /// Returns the shared sequencer.
    #[must_use]
    pub const fn sequencer(&self) -> &Arc<Sequencer> {
        &self.sequencer
    }

    /// Returns the input router.
    pub const fn router(&mut self) -> &mut InputRouter {
        &mut self.router
    }

    /// Returns the driver mode.
    #[must_use]
    pub const fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Spawns the driver. Returns `None` if it was already started.
    pub fn start(&mut self) -> Option<JoinHandle<DriveReport>> {
        let mut driver = self.driver.take()?;
        let sequencer = Arc::clone(&self.sequencer);
        Some(tokio::spawn(async move { driver.run(sequencer).await }))
    }
}
