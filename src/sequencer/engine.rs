//! Step sequencer
//!
//! The `Sequencer` owns the step pointer, the `animating` guard and the
//! completion flag. Each [`Sequencer::advance`] either fires the current
//! step through the [`TransitionExecutor`] or reports why the request was
//! dropped. Lock releases and deferred effects run on one timer task per
//! fired step; every task is tagged with the page-load epoch so a
//! [`Sequencer::reset`] turns pending work into no-ops.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::schema::{IntroConfig, TimingConfig};
use crate::observability::{Event, EventEmitter};
use crate::page::chrome::reveal_sections;
use crate::page::document::{SharedDocument, with_document};

use super::executor::{DeferredEffect, Transition, TransitionExecutor};
use super::script::{Action, StepScript};
use super::spy::{ScrollSpy, SpyReading};
use super::state::SequencerState;

/// Why an advance request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// A transition is still holding the guard.
    Animating,
    /// The intro already completed.
    Complete,
}

impl DropReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Animating => "animating",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one [`Sequencer::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// The step ran; the pointer moved to `next`.
    Fired {
        step: usize,
        action: Action,
        next: usize,
    },
    /// The request was dropped and will not be retried.
    Dropped { reason: DropReason },
}

impl AdvanceOutcome {
    /// Returns `true` if the step ran.
    #[must_use]
    pub const fn fired(&self) -> bool {
        matches!(self, Self::Fired { .. })
    }
}

/// Linear state machine over the step script.
pub struct Sequencer {
    script: StepScript,
    state: Arc<SequencerState>,
    executor: TransitionExecutor,
    spy: ScrollSpy,
    document: SharedDocument,
    emitter: Arc<EventEmitter>,
    cancel: CancellationToken,
    last_section: Mutex<Option<String>>,
}

impl Sequencer {
    /// Creates a sequencer at step 0 over `document`.
    #[must_use]
    pub fn new(document: SharedDocument, config: &IntroConfig) -> Self {
        Self {
            script: StepScript::standard(),
            state: Arc::new(SequencerState::new()),
            executor: TransitionExecutor::new(document.clone(), config.timing.clone()),
            spy: ScrollSpy::new(config.scroll_spy),
            document,
            emitter: Arc::new(EventEmitter::noop()),
            cancel: CancellationToken::new(),
            last_section: Mutex::new(None),
        }
    }

    /// Routes events to `emitter` instead of discarding them.
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<EventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Puts the page in its initial stage.
    pub fn prepare(&self) {
        self.executor.prepare_stage();
    }

    /// Fires the current step if the guard allows it.
    ///
    /// Must be called from within a Tokio runtime: the lock release and
    /// deferred effects are scheduled on a spawned timer task.
    pub fn advance(&self) -> AdvanceOutcome {
        if self.state.is_complete() {
            return self.dropped(DropReason::Complete);
        }
        if !self.state.try_begin() {
            return self.dropped(DropReason::Animating);
        }

        let epoch = self.state.epoch();
        let step = self.state.current_step();
        let row = match self.script.get(step) {
            Some(row) if !self.state.is_complete() => row,
            _ => {
                self.state.release(epoch);
                return self.dropped(DropReason::Complete);
            }
        };

        let transition = self.executor.execute(row.action);
        if !self.state.try_advance(step, row.next) {
            debug!(step, "step pointer moved during transition");
        }

        let lock_ms = u64::try_from(transition.lock.as_millis()).unwrap_or(u64::MAX);
        info!(step, next = row.next, action = %row.action, lock_ms, "step fired");
        self.emitter.emit(Event::StepFired {
            timestamp: Utc::now(),
            step,
            action: row.action.name().to_string(),
            next: row.next,
            lock_ms,
        });

        if row.action == Action::Complete {
            self.state.mark_complete();
            info!("intro complete; scroll-spy active");
            self.emitter.emit(Event::AnimationCompleted {
                timestamp: Utc::now(),
            });
            self.refresh_spy();
        }

        self.schedule(epoch, transition);

        AdvanceOutcome::Fired {
            step,
            action: row.action,
            next: row.next,
        }
    }

    /// Returns whether the completion action has run.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Returns whether a transition currently holds the guard.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.state.is_animating()
    }

    /// Returns the step that the next successful advance fires.
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.state.current_step()
    }

    /// Returns to step 0 with both flags cleared and the initial stage
    /// restored. Pending lock releases and deferred effects are discarded.
    pub fn reset(&self) {
        let epoch = self.state.reset();
        *self
            .last_section
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.executor.prepare_stage();
        info!(epoch, "sequencer reset");
        self.emitter.emit(Event::SequenceReset {
            timestamp: Utc::now(),
            epoch,
        });
    }

    /// Waits until no transition holds the guard.
    pub async fn wait_idle(&self) {
        self.state.wait_idle().await;
    }

    /// Runs scroll-spy and the section fade-in after a scroll.
    ///
    /// Returns `None` while the intro is still playing.
    pub fn on_scroll(&self) -> Option<SpyReading> {
        if !self.state.is_complete() {
            return None;
        }
        Some(self.refresh_spy())
    }

    /// Cancels every pending timer task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled by [`Sequencer::shutdown`].
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the document the sequencer mutates.
    #[must_use]
    pub const fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Returns the timing table in use.
    #[must_use]
    pub const fn timing(&self) -> &TimingConfig {
        self.executor.timing()
    }

    /// Returns the step script.
    #[must_use]
    pub const fn script(&self) -> &StepScript {
        &self.script
    }

    /// Returns the event emitter.
    #[must_use]
    pub const fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    fn dropped(&self, reason: DropReason) -> AdvanceOutcome {
        let step = self.state.current_step();
        debug!(step, %reason, "advance dropped");
        self.emitter.emit(Event::TransitionDropped {
            timestamp: Utc::now(),
            step,
            reason: reason.as_str().to_string(),
        });
        AdvanceOutcome::Dropped { reason }
    }

    fn refresh_spy(&self) -> SpyReading {
        let (reading, scroll_y) = with_document(&self.document, |doc| {
            let reading = self.spy.apply(doc);
            let revealed = reveal_sections(doc, true);
            if !revealed.is_empty() {
                debug!(?revealed, "sections faded in");
            }
            (reading, doc.scroll_y())
        });

        let mut last = self
            .last_section
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last != reading.active_section {
            last.clone_from(&reading.active_section);
            drop(last);
            debug!(section = ?reading.active_section, scroll_y, "active section changed");
            self.emitter.emit(Event::SectionActivated {
                timestamp: Utc::now(),
                section: reading.active_section.clone(),
                scroll_y,
            });
        }
        reading
    }

    /// Spawns the timer task for one fired step.
    ///
    /// Entries due at the same instant run effects first, then the release,
    /// so a struck word has collapsed before the next step may fire.
    fn schedule(&self, epoch: u64, transition: Transition) {
        let mut timeline: Vec<(Duration, Option<DeferredEffect>)> = transition
            .deferred
            .iter()
            .map(|d| (d.after, Some(d.effect)))
            .collect();
        if transition.lock.is_zero() {
            self.state.release(epoch);
        } else {
            timeline.push((transition.lock, None));
        }
        if timeline.is_empty() {
            return;
        }
        timeline.sort_by_key(|(at, entry)| (*at, entry.is_none()));

        let start = Instant::now();
        let state = Arc::clone(&self.state);
        let executor = self.executor.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            for (at, entry) in timeline {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("timer task cancelled");
                        return;
                    }
                    () = tokio::time::sleep_until(start + at) => {}
                }
                if state.epoch() != epoch {
                    debug!(epoch, "discarding timer task from previous page load");
                    return;
                }
                match entry {
                    Some(effect) => executor.apply_deferred(effect),
                    None => {
                        state.release(epoch);
                    }
                }
            }
        });
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("state", &self.state)
            .field("steps", &self.script.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::events::tests::TestWriter;
    use crate::page::document::{Document, ElementRef, Visibility};
    use crate::page::memory::Page;
    use crate::sequencer::script::{STEP_COUNT, TERMINAL_STEP};
    use proptest::prelude::*;

    fn setup() -> (Arc<Mutex<Page>>, Sequencer) {
        let config = IntroConfig::default();
        let page = Arc::new(Mutex::new(Page::from_config(&config)));
        let shared: SharedDocument = page.clone();
        let sequencer = Sequencer::new(shared, &config);
        sequencer.prepare();
        (page, sequencer)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_advance_reveals_word() {
        let (page, seq) = setup();
        let outcome = seq.advance();
        assert_eq!(
            outcome,
            AdvanceOutcome::Fired {
                step: 0,
                action: Action::RevealWord(0),
                next: 1,
            }
        );
        assert_eq!(seq.current_step(), 1);
        assert!(seq.is_animating());
        assert_eq!(
            page.lock().unwrap().visibility(&ElementRef::Word(0)),
            Visibility::Visible
        );

        sleep_ms(799).await;
        assert!(seq.is_animating());
        // The release task runs after this one at the same instant
        sleep_ms(2).await;
        assert!(!seq.is_animating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_dropped_while_animating() {
        let (_page, seq) = setup();
        assert!(seq.advance().fired());
        sleep_ms(400).await;
        assert_eq!(
            seq.advance(),
            AdvanceOutcome::Dropped {
                reason: DropReason::Animating
            }
        );
        assert_eq!(seq.current_step(), 1);

        sleep_ms(401).await;
        assert!(seq.advance().fired());
        assert_eq!(seq.current_step(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strike_collapses_when_lock_ends() {
        let (page, seq) = setup();
        seq.advance();
        sleep_ms(801).await;
        assert!(seq.advance().fired());
        assert_eq!(
            page.lock().unwrap().visibility(&ElementRef::Word(0)),
            Visibility::Struck
        );
        sleep_ms(999).await;
        assert_eq!(
            page.lock().unwrap().visibility(&ElementRef::Word(0)),
            Visibility::Struck
        );
        sleep_ms(2).await;
        assert_eq!(
            page.lock().unwrap().visibility(&ElementRef::Word(0)),
            Visibility::Hidden
        );
        assert!(!seq.is_animating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_walk_completes() {
        let (page, seq) = setup();
        let timing = TimingConfig::default();
        for expected in 0..STEP_COUNT {
            seq.wait_idle().await;
            let outcome = seq.advance();
            assert!(outcome.fired(), "step {expected}: {outcome:?}");
            let lock = seq
                .script()
                .get(expected)
                .unwrap()
                .action
                .lock_kind()
                .duration(&timing);
            assert!(seq.is_animating() || lock.is_zero());
        }
        assert!(seq.is_complete());
        assert_eq!(seq.current_step(), TERMINAL_STEP);

        seq.wait_idle().await;
        assert_eq!(
            seq.advance(),
            AdvanceOutcome::Dropped {
                reason: DropReason::Complete
            }
        );

        let page = page.lock().unwrap();
        assert_eq!(page.shown_count(), 0);
        assert!(page.has_class(&ElementRef::MainContent, "visible"));
        assert_eq!(page.active_links(), vec!["#about".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_pending_effects() {
        let (page, seq) = setup();
        seq.advance();
        sleep_ms(801).await;
        assert!(seq.advance().fired());
        sleep_ms(100).await;

        seq.reset();
        assert_eq!(seq.current_step(), 0);
        assert!(!seq.is_animating());
        assert!(!seq.is_complete());
        assert_eq!(page.lock().unwrap().shown_count(), 0);

        // New lifetime: reveal word 1 again before the stale strike timer ends
        assert!(seq.advance().fired());
        sleep_ms(900).await;
        assert_eq!(
            page.lock().unwrap().visibility(&ElementRef::Word(0)),
            Visibility::Visible
        );
        assert!(!seq.is_animating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_word_releases_immediately() {
        let config = IntroConfig::default();
        let mut raw = Page::from_config(&config);
        raw.remove(&ElementRef::Word(3));
        let page = Arc::new(Mutex::new(raw));
        let shared: SharedDocument = page.clone();
        let seq = Sequencer::new(shared, &config);
        seq.prepare();

        for _ in 0..6 {
            seq.wait_idle().await;
            seq.advance();
        }
        seq.wait_idle().await;
        // step 6 reveals word 4, which no longer exists
        assert!(seq.advance().fired());
        assert!(!seq.is_animating());
        assert_eq!(seq.current_step(), 7);
        assert!(seq.advance().fired());
        assert!(!seq.is_animating());
        assert_eq!(seq.current_step(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_emitted() {
        let writer = TestWriter::new();
        let config = IntroConfig::default();
        let page = Arc::new(Mutex::new(Page::from_config(&config)));
        let shared: SharedDocument = page.clone();
        let seq = Sequencer::new(shared, &config)
            .with_emitter(Arc::new(EventEmitter::new(Box::new(writer.clone()))));

        seq.advance();
        seq.advance();
        let events = writer.events();
        assert_eq!(events[0]["type"], "StepFired");
        assert_eq!(events[0]["action"], "reveal_word");
        assert_eq!(events[0]["lock_ms"], 800);
        assert_eq!(events[1]["type"], "TransitionDropped");
        assert_eq!(events[1]["reason"], "animating");
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_scroll_inert_until_complete() {
        let (page, seq) = setup();
        page.lock().unwrap().set_scroll_y(1000.0);
        assert_eq!(seq.on_scroll(), None);
        assert!(page.lock().unwrap().active_links().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_release() {
        let (_page, seq) = setup();
        seq.advance();
        seq.shutdown();
        sleep_ms(2000).await;
        assert!(seq.is_animating());
        assert!(seq.cancellation_token().is_cancelled());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // Arbitrary gaps between requests never show two exclusive
        // entities at once, at any instant.
        #[test]
        fn prop_at_most_one_exclusive_entity(gaps in prop::collection::vec(0u64..1500, 1..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            runtime.block_on(async {
                let (page, seq) = setup();
                for gap in gaps {
                    seq.advance();
                    prop_assert!(page.lock().unwrap().shown_count() <= 1);
                    for _ in 0..gap / 50 {
                        sleep_ms(50).await;
                        prop_assert!(page.lock().unwrap().shown_count() <= 1);
                    }
                    sleep_ms(gap % 50).await;
                }
                Ok(())
            })?;
        }
    }
}
