use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

use crate::timer::Tick;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick(Tick),
}

/// Source of application events (keyboard, resize, timer ticks)
pub trait AppEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;

    /// Handle for producers that feed the same queue, such as the tick timer.
    fn sender(&self) -> Sender<AppEvent>;
}

/// Map a terminal event to an application event. Pasted text is dropped:
/// only keystrokes typed one at a time count.
pub fn translate(event: CtEvent) -> Option<AppEvent> {
    match event {
        CtEvent::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        CtEvent::Resize(_, _) => Some(AppEvent::Resize),
        CtEvent::Paste(text) => {
            log::debug!("discarding pasted text ({} chars)", text.chars().count());
            None
        }
        _ => None,
    }
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let reader_tx = tx.clone();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(ev) => {
                    if let Some(app_event) = translate(ev) {
                        if reader_tx.send(app_event).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    log::error!("terminal event reader stopped: {e}");
                    break;
                }
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<AppEvent> {
        self.tx.clone()
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<AppEvent> {
        self.tx.clone()
    }
}

/// Runner that hands the application one event at a time
pub struct Runner<E: AppEventSource> {
    event_source: E,
    poll_interval: Duration,
}

impl<E: AppEventSource> Runner<E> {
    pub fn new(event_source: E, poll_interval: Duration) -> Self {
        Self {
            event_source,
            poll_interval,
        }
    }

    pub fn sender(&self) -> Sender<AppEvent> {
        self.event_source.sender()
    }

    /// Blocks up to the poll interval; None means nothing arrived and the
    /// caller may simply redraw.
    pub fn step(&self) -> Option<AppEvent> {
        match self.event_source.recv_timeout(self.poll_interval) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    #[test]
    fn step_returns_none_on_timeout() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(1));
        assert!(runner.step().is_none());
    }

    #[test]
    fn step_passes_through_events() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(10));
        runner.sender().send(AppEvent::Resize).unwrap();

        match runner.step() {
            Some(AppEvent::Resize) => {}
            other => panic!("expected Resize event, got {other:?}"),
        }
    }

    #[test]
    fn step_preserves_order() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(10));
        let tx = runner.sender();
        tx.send(AppEvent::Tick(Tick { generation: 1 })).unwrap();
        tx.send(AppEvent::Resize).unwrap();

        assert!(matches!(
            runner.step(),
            Some(AppEvent::Tick(Tick { generation: 1 }))
        ));
        assert!(matches!(runner.step(), Some(AppEvent::Resize)));
    }

    #[test]
    fn translate_drops_paste() {
        assert!(translate(CtEvent::Paste("hello world".to_string())).is_none());
    }

    #[test]
    fn translate_keeps_key_presses_only() {
        let press = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert!(matches!(
            translate(CtEvent::Key(press)),
            Some(AppEvent::Key(k)) if k.code == KeyCode::Char('a')
        ));

        let release = KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert!(translate(CtEvent::Key(release)).is_none());
    }

    #[test]
    fn translate_resize() {
        assert!(matches!(
            translate(CtEvent::Resize(80, 24)),
            Some(AppEvent::Resize)
        ));
    }
}
