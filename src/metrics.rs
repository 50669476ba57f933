use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Length of a timed test in seconds.
pub const TIMED_SECS: u32 = 60;

/// Characters per "word".
const CHARS_PER_WORD: f64 = 5.0;

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// fixed 60 second test
    #[default]
    Timed,
    /// test ends when the whole passage is typed
    PassageLength,
}

impl Mode {
    pub fn next(self) -> Self {
        match self {
            Mode::Timed => Mode::PassageLength,
            Mode::PassageLength => Mode::Timed,
        }
    }

    /// Clock value a fresh session starts from.
    pub fn initial_elapsed(self) -> u32 {
        match self {
            Mode::Timed => TIMED_SECS,
            Mode::PassageLength => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub wpm: u32,
    pub accuracy: u32,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
        }
    }
}

/// Seconds actually spent typing. The timed clock counts down, the other counts up.
pub fn seconds_elapsed(elapsed_time: u32, mode: Mode) -> u32 {
    match mode {
        Mode::Timed => TIMED_SECS.saturating_sub(elapsed_time),
        Mode::PassageLength => elapsed_time,
    }
}

pub fn compute_metrics(
    typed_length: usize,
    mistake_count: usize,
    elapsed_time: u32,
    mode: Mode,
) -> Metrics {
    let net = typed_length.saturating_sub(mistake_count) as f64;
    let minutes = seconds_elapsed(elapsed_time, mode) as f64 / 60.0;

    let wpm = if minutes > 0.0 {
        (net / CHARS_PER_WORD / minutes).max(0.0).round() as u32
    } else {
        0
    };

    let accuracy = if typed_length > 0 {
        (net / typed_length as f64 * 100.0).max(0.0).round() as u32
    } else {
        100
    };

    Metrics {
        wpm,
        accuracy: accuracy.min(100),
    }
}

/// `M:SS` rendering of the session clock.
pub fn format_clock(elapsed_time: u32) -> String {
    format!("{}:{:02}", elapsed_time / 60, elapsed_time % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyBand {
    Low,
    Neutral,
    High,
}

impl AccuracyBand {
    pub fn of(accuracy: u32) -> Self {
        match accuracy {
            a if a < 90 => AccuracyBand::Low,
            a if a >= 95 => AccuracyBand::High,
            _ => AccuracyBand::Neutral,
        }
    }
}

/// Position a typist at `best_wpm` would have reached after `seconds`.
pub fn ghost_index(best_wpm: u32, seconds: u32, passage_len: usize) -> Option<usize> {
    if best_wpm == 0 || passage_len == 0 {
        return None;
    }
    let chars_per_sec = best_wpm as f64 * CHARS_PER_WORD / 60.0;
    let reached = (seconds as f64 * chars_per_sec).floor() as usize;
    Some(reached.min(passage_len - 1))
}
