//! One-second tick source for running tests.
//!
//! Ticks are delivered through the same channel as terminal events, tagged
//! with the generation of the timer that produced them so that ticks queued
//! by a cancelled timer can be told apart from live ones.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::runtime::AppEvent;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tick {
    pub generation: u64,
}

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("a tick timer is already running")]
    AlreadyRunning,
    #[error("failed to spawn tick thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A cancellable repeating tick.
pub trait TickSource {
    /// Start ticking. Fails if a timer is already active.
    fn start(&mut self) -> Result<Tick, TimerError>;

    /// Cancel the active timer, if any. Idempotent.
    fn stop(&mut self);

    /// The tick identity of the active timer.
    fn current(&self) -> Option<Tick>;

    fn is_active(&self) -> bool {
        self.current().is_some()
    }

    /// Whether `tick` was produced by the timer that is active right now.
    fn accepts(&self, tick: Tick) -> bool {
        self.current() == Some(tick)
    }
}

/// Owns the tick thread; cancels and joins it when dropped.
struct TickGuard {
    tick: Tick,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        // Disconnecting the cancel channel wakes the thread immediately.
        drop(self.cancel.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Thread-backed timer sending [`AppEvent::Tick`] every `interval`.
pub struct IntervalTimer {
    events: Sender<AppEvent>,
    interval: Duration,
    generation: u64,
    active: Option<TickGuard>,
}

impl IntervalTimer {
    pub fn new(events: Sender<AppEvent>, interval: Duration) -> Self {
        Self {
            events,
            interval,
            generation: 0,
            active: None,
        }
    }

    pub fn every_second(events: Sender<AppEvent>) -> Self {
        Self::new(events, TICK_INTERVAL)
    }
}

impl TickSource for IntervalTimer {
    fn start(&mut self) -> Result<Tick, TimerError> {
        if self.active.is_some() {
            return Err(TimerError::AlreadyRunning);
        }

        self.generation += 1;
        let tick = Tick {
            generation: self.generation,
        };
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let events = self.events.clone();
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("keypace-tick".to_string())
            .spawn(move || loop {
                match cancel_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if events.send(AppEvent::Tick(tick)).is_err() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        log::debug!("tick timer {} started", tick.generation);
        self.active = Some(TickGuard {
            tick,
            cancel: Some(cancel_tx),
            handle: Some(handle),
        });
        Ok(tick)
    }

    fn stop(&mut self) {
        if let Some(guard) = self.active.take() {
            log::debug!("tick timer {} stopped", guard.tick.generation);
        }
    }

    fn current(&self) -> Option<Tick> {
        self.active.as_ref().map(|guard| guard.tick)
    }
}

/// Timer double for headless tests: ticks are injected by hand.
#[derive(Debug, Default)]
pub struct ManualTicker {
    generation: u64,
    active: Option<Tick>,
    pub starts: usize,
    pub stops: usize,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickSource for ManualTicker {
    fn start(&mut self) -> Result<Tick, TimerError> {
        if self.active.is_some() {
            return Err(TimerError::AlreadyRunning);
        }
        self.generation += 1;
        self.starts += 1;
        let tick = Tick {
            generation: self.generation,
        };
        self.active = Some(tick);
        Ok(tick)
    }

    fn stop(&mut self) {
        if self.active.take().is_some() {
            self.stops += 1;
        }
    }

    fn current(&self) -> Option<Tick> {
        self.active
    }
}
