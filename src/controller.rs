use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::metrics::Mode;
use crate::passages::{Difficulty, PassageBook, PassageError};
use crate::session::{Effect, Session, SessionEvent};
use crate::store::ScoreStore;
use crate::timer::{Tick, TickSource, TimerError};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Passage(#[from] PassageError),
    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// Drives a [`Session`] and carries out the effects it asks for: drawing
/// passages, starting and stopping the tick timer, persisting a new best.
pub struct Controller<S: ScoreStore, T: TickSource> {
    session: Session,
    book: PassageBook,
    store: S,
    timer: T,
    rng: StdRng,
}

impl<S: ScoreStore, T: TickSource> Controller<S, T> {
    pub fn new(book: PassageBook, store: S, timer: T, mode: Mode, difficulty: Difficulty) -> Self {
        Self::with_rng(book, store, timer, mode, difficulty, StdRng::from_entropy())
    }

    pub fn with_rng(
        book: PassageBook,
        store: S,
        timer: T,
        mode: Mode,
        difficulty: Difficulty,
        rng: StdRng,
    ) -> Self {
        let best = store.load();
        log::info!("personal best on record: {best} wpm");
        Self {
            session: Session::new(mode, difficulty, best),
            book,
            store,
            timer,
            rng,
        }
    }

    /// Draw a passage for the selected difficulty and arm the session.
    pub fn prepare_test(&mut self) -> Result<(), ControllerError> {
        self.run(vec![Effect::DrawPassage])
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Result<(), ControllerError> {
        let effects = self.session.apply(event);
        self.run(effects)
    }

    /// Feed a timer tick. Ticks from a timer that is no longer active are dropped.
    pub fn on_tick(&mut self, tick: Tick) -> Result<(), ControllerError> {
        if !self.timer.accepts(tick) {
            log::trace!("dropping stale tick from timer {}", tick.generation);
            return Ok(());
        }
        self.dispatch(SessionEvent::TickElapsed)
    }

    pub fn end_test(&mut self) -> Result<(), ControllerError> {
        let effects = self.session.end_test();
        self.run(effects)
    }

    pub fn set_ghost(&mut self, enabled: bool) {
        self.session.set_ghost(enabled);
    }

    pub fn toggle_ghost(&mut self) -> bool {
        let enabled = !self.session.ghost();
        self.session.set_ghost(enabled);
        enabled
    }

    pub fn cycle_mode(&mut self) -> Result<(), ControllerError> {
        let next = self.session.selected_mode().next();
        self.dispatch(SessionEvent::ModeChanged(next))
    }

    /// Select the neighbouring difficulty, wrapping at either end.
    pub fn cycle_difficulty(&mut self, forward: bool) -> Result<(), ControllerError> {
        let keys = self.book.difficulties();
        if keys.is_empty() {
            return Ok(());
        }
        let current = keys
            .iter()
            .position(|d| d == self.session.selected_difficulty());
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % keys.len(),
            (Some(i), false) => (i + keys.len() - 1) % keys.len(),
        };
        self.dispatch(SessionEvent::DifficultyChanged(keys[next].clone()))
    }

    fn run(&mut self, effects: Vec<Effect>) -> Result<(), ControllerError> {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::StartTimer => {
                    self.timer.stop();
                    if let Err(e) = self.timer.start() {
                        log::error!("cannot start the tick timer: {e}");
                        self.session.rearm();
                        return Err(e.into());
                    }
                }
                Effect::StopTimer => self.timer.stop(),
                Effect::DrawPassage => {
                    let difficulty = self.session.selected_difficulty().clone();
                    let passage = match self.book.pick_passage(&difficulty, &mut self.rng) {
                        Ok(passage) => passage,
                        Err(e) => {
                            log::error!("cannot prepare a test: {e}");
                            self.session.disarm();
                            return Err(e.into());
                        }
                    };
                    log::debug!("drew a {}-char {difficulty} passage", passage.chars().count());
                    queue.extend(self.session.prepare(passage));
                }
                Effect::PersistBest(best) => {
                    if let Err(e) = self.store.save(best) {
                        log::warn!("could not save personal best {best}: {e}");
                    }
                }
            }
        }
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
