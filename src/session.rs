use itertools::{EitherOrBoth, Itertools};

use crate::metrics::{compute_metrics, ghost_index, seconds_elapsed, Metrics, Mode};
use crate::passages::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// no passage prepared yet
    Idle,
    /// passage prepared, waiting for the first keystroke
    Armed,
    Running,
    /// results frozen
    Finished,
}

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The full typed value after an edit.
    KeystrokeChanged(String),
    TickElapsed,
    ModeChanged(Mode),
    DifficultyChanged(Difficulty),
    /// Start, or restart, the current passage.
    ActivateRequested,
    /// Go again with a fresh passage.
    RestartRequested,
}

/// Side effects requested by a transition; interpreted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartTimer,
    StopTimer,
    /// Pick a new passage for the selected difficulty and call [`Session::prepare`].
    DrawPassage,
    PersistBest(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Untyped,
    Correct,
    Incorrect,
    Cursor,
}

/// Frozen outcome of a finished test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReport {
    pub metrics: Metrics,
    pub correct: usize,
    pub incorrect: usize,
    pub new_best: bool,
    pub mode: Mode,
    pub seconds: u32,
}

/// Positions of `typed` that don't match `passage`. Characters typed past the
/// end of the passage have nothing to match and always count.
pub fn count_mistakes(passage: &[char], typed: &[char]) -> usize {
    typed
        .iter()
        .zip_longest(passage)
        .filter(|pair| match pair {
            EitherOrBoth::Both(t, p) => t != p,
            EitherOrBoth::Left(_) => true,
            EitherOrBoth::Right(_) => false,
        })
        .count()
}

#[derive(Debug, Clone)]
pub struct Session {
    selected_mode: Mode,
    selected_difficulty: Difficulty,
    // Snapshot of the selection taken when the passage was prepared.
    mode: Mode,
    difficulty: Difficulty,
    passage: Vec<char>,
    typed: Vec<char>,
    mistakes: usize,
    elapsed: u32,
    phase: Phase,
    metrics: Metrics,
    personal_best: u32,
    wpm_history: Vec<u32>,
    ghost: bool,
    report: Option<FinalReport>,
}

impl Session {
    pub fn new(mode: Mode, difficulty: Difficulty, personal_best: u32) -> Self {
        Self {
            selected_mode: mode,
            selected_difficulty: difficulty.clone(),
            mode,
            difficulty,
            passage: Vec::new(),
            typed: Vec::new(),
            mistakes: 0,
            elapsed: mode.initial_elapsed(),
            phase: Phase::Idle,
            metrics: Metrics::default(),
            personal_best,
            wpm_history: Vec::new(),
            ghost: false,
            report: None,
        }
    }

    /// Install a freshly drawn passage and arm the test with the current selection.
    pub fn prepare(&mut self, passage: String) -> Vec<Effect> {
        let effects = self.leave_running();
        self.mode = self.selected_mode;
        self.difficulty = self.selected_difficulty.clone();
        self.passage = passage.chars().collect();
        self.reset();
        self.phase = Phase::Armed;
        effects
    }

    pub fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::KeystrokeChanged(value) => self.on_keystroke(&value),
            SessionEvent::TickElapsed => self.on_tick(),
            SessionEvent::ModeChanged(mode) => {
                self.selected_mode = mode;
                self.redraw_if_selectable()
            }
            SessionEvent::DifficultyChanged(difficulty) => {
                self.selected_difficulty = difficulty;
                self.redraw_if_selectable()
            }
            SessionEvent::ActivateRequested => self.activate(),
            SessionEvent::RestartRequested => {
                let mut effects = self.leave_running();
                self.disarm();
                effects.push(Effect::DrawPassage);
                effects
            }
        }
    }

    /// Freeze the session and compute the final result.
    pub fn end_test(&mut self) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Running | Phase::Armed) {
            return vec![];
        }
        let mut effects = vec![Effect::StopTimer];

        self.recompute();
        let new_best = self.metrics.wpm > self.personal_best;
        if new_best {
            log::info!(
                "new personal best: {} wpm (was {})",
                self.metrics.wpm,
                self.personal_best
            );
            self.personal_best = self.metrics.wpm;
            effects.push(Effect::PersistBest(self.metrics.wpm));
        }

        let report = FinalReport {
            metrics: self.metrics,
            correct: self.typed.len() - self.mistakes,
            incorrect: self.mistakes,
            new_best,
            mode: self.mode,
            seconds: seconds_elapsed(self.elapsed, self.mode),
        };
        log::info!(
            "test finished: {} wpm, {}% accuracy, {} correct, {} incorrect",
            report.metrics.wpm,
            report.metrics.accuracy,
            report.correct,
            report.incorrect
        );
        self.report = Some(report);
        self.phase = Phase::Finished;
        effects
    }

    fn activate(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Idle {
            return vec![Effect::DrawPassage];
        }
        let mut effects = self.leave_running();
        if self.selection_pending() {
            // armed again only once the new passage is installed
            self.disarm();
            effects.push(Effect::DrawPassage);
        } else {
            self.reset();
            self.phase = Phase::Armed;
        }
        effects
    }

    /// Drop the prepared passage and wait in Idle for a new one.
    pub fn disarm(&mut self) {
        self.passage.clear();
        self.reset();
        self.phase = Phase::Idle;
    }

    /// Back a running test out to Armed on the same passage, counters cleared.
    pub fn rearm(&mut self) {
        if self.phase == Phase::Running {
            self.reset();
            self.phase = Phase::Armed;
        }
    }

    fn on_keystroke(&mut self, value: &str) -> Vec<Effect> {
        if matches!(self.phase, Phase::Idle | Phase::Finished) {
            return vec![];
        }
        let mut effects = vec![];

        let mut typed: Vec<char> = value.chars().collect();
        if self.mode == Mode::PassageLength {
            typed.truncate(self.passage.len());
        }

        if self.phase == Phase::Armed && !typed.is_empty() {
            log::info!(
                "test started: {} / {} ({} chars)",
                self.mode,
                self.difficulty,
                self.passage.len()
            );
            self.phase = Phase::Running;
            effects.push(Effect::StartTimer);
        }

        self.typed = typed;
        self.recompute();

        if self.phase == Phase::Running
            && self.mode == Mode::PassageLength
            && self.typed.len() >= self.passage.len()
        {
            effects.extend(self.end_test());
        }
        effects
    }

    fn on_tick(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Running {
            return vec![];
        }
        match self.mode {
            Mode::Timed => self.elapsed = self.elapsed.saturating_sub(1),
            Mode::PassageLength => self.elapsed += 1,
        }
        self.recompute();
        self.wpm_history.push(self.metrics.wpm);

        if self.mode == Mode::Timed && self.elapsed == 0 {
            return self.end_test();
        }
        vec![]
    }

    fn redraw_if_selectable(&self) -> Vec<Effect> {
        match self.phase {
            Phase::Idle | Phase::Armed => vec![Effect::DrawPassage],
            Phase::Running | Phase::Finished => vec![],
        }
    }

    fn leave_running(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Running {
            self.phase = Phase::Armed;
            vec![Effect::StopTimer]
        } else {
            vec![]
        }
    }

    fn reset(&mut self) {
        self.typed.clear();
        self.mistakes = 0;
        self.elapsed = self.mode.initial_elapsed();
        self.metrics = Metrics::default();
        self.wpm_history.clear();
        self.report = None;
    }

    fn recompute(&mut self) {
        self.mistakes = count_mistakes(&self.passage, &self.typed);
        self.metrics = compute_metrics(self.typed.len(), self.mistakes, self.elapsed, self.mode);
    }

    fn selection_pending(&self) -> bool {
        self.selected_mode != self.mode || self.selected_difficulty != self.difficulty
    }

    /// Per-character classification of the passage for rendering.
    pub fn classify(&self) -> Vec<CharClass> {
        self.passage
            .iter()
            .enumerate()
            .map(|(idx, expected)| match self.typed.get(idx) {
                Some(c) if c == expected => CharClass::Correct,
                Some(_) => CharClass::Incorrect,
                None if idx == self.typed.len() => CharClass::Cursor,
                None => CharClass::Untyped,
            })
            .collect()
    }

    /// Where the personal-best pacer currently is, when enabled and running.
    pub fn ghost_position(&self) -> Option<usize> {
        if !self.ghost || self.phase != Phase::Running {
            return None;
        }
        ghost_index(
            self.personal_best,
            seconds_elapsed(self.elapsed, self.mode),
            self.passage.len(),
        )
    }

    pub fn set_ghost(&mut self, enabled: bool) {
        self.ghost = enabled;
    }

    pub fn ghost(&self) -> bool {
        self.ghost
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn selected_mode(&self) -> Mode {
        self.selected_mode
    }

    pub fn selected_difficulty(&self) -> &Difficulty {
        &self.selected_difficulty
    }

    pub fn passage(&self) -> &[char] {
        &self.passage
    }

    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    pub fn typed_len(&self) -> usize {
        self.typed.len()
    }

    pub fn mistakes(&self) -> usize {
        self.mistakes
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn personal_best(&self) -> u32 {
        self.personal_best
    }

    pub fn wpm_history(&self) -> &[u32] {
        &self.wpm_history
    }

    pub fn report(&self) -> Option<&FinalReport> {
        self.report.as_ref()
    }
}
