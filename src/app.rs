use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::Config;
use crate::controller::{Controller, ControllerError};
use crate::runtime::AppEvent;
use crate::session::{Phase, SessionEvent};
use crate::store::ScoreStore;
use crate::timer::{Tick, TickSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// dimmed passage plus mode/difficulty selectors
    Start,
    Typing,
    Results,
    /// passage data could not be loaded; only quitting is possible
    LoadFailed(String),
}

/// Input and selection collaborator: turns keys into session events and
/// tracks which screen is shown.
pub struct App<S: ScoreStore, T: TickSource> {
    controller: Option<Controller<S, T>>,
    screen: Screen,
    status: Option<String>,
    should_quit: bool,
}

impl<S: ScoreStore, T: TickSource> App<S, T> {
    pub fn new(controller: Controller<S, T>) -> Self {
        let mut app = Self {
            controller: Some(controller),
            screen: Screen::Start,
            status: None,
            should_quit: false,
        };
        let result = app.with_controller(|c| c.prepare_test());
        app.report(result);
        app
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        Self {
            controller: None,
            screen: Screen::LoadFailed(message.into()),
            status: None,
            should_quit: false,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick(tick) => self.on_tick(tick),
            AppEvent::Resize => {}
        }
    }

    pub fn on_tick(&mut self, tick: Tick) {
        let result = self.with_controller(|c| c.on_tick(tick));
        self.report(result);
        self.follow_session();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::LoadFailed(_) => {
                if key.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
            Screen::Start => self.start_key(key, ctrl),
            Screen::Typing => self.typing_key(key, ctrl),
            Screen::Results => self.results_key(key, ctrl),
        }
    }

    fn start_key(&mut self, key: KeyEvent, ctrl: bool) {
        match key.code {
            KeyCode::Char('g') if ctrl => self.toggle_ghost(),
            KeyCode::Enter => self.activate(),
            KeyCode::Char(c) if !ctrl => {
                self.activate();
                if self.screen == Screen::Typing {
                    self.type_char(c);
                }
            }
            KeyCode::Tab => {
                let result = self.with_controller(|c| c.cycle_mode());
                self.report(result);
            }
            KeyCode::Up | KeyCode::Down => {
                let forward = key.code == KeyCode::Down;
                let result = self.with_controller(|c| c.cycle_difficulty(forward));
                self.report(result);
            }
            _ => {}
        }
    }

    fn typing_key(&mut self, key: KeyEvent, ctrl: bool) {
        match key.code {
            KeyCode::Char(c) if !ctrl => self.type_char(c),
            KeyCode::Backspace => {
                if let Some(mut value) = self.typed_value() {
                    value.pop();
                    self.send_keystroke(value);
                }
            }
            // restart the same passage
            KeyCode::Tab => self.activate(),
            _ => {}
        }
    }

    fn results_key(&mut self, key: KeyEvent, ctrl: bool) {
        match key.code {
            KeyCode::Char('g') if ctrl => self.toggle_ghost(),
            KeyCode::Enter | KeyCode::Char('n') => {
                let result = self.with_controller(|c| c.dispatch(SessionEvent::RestartRequested));
                self.report(result);
                self.screen = Screen::Start;
            }
            KeyCode::Char('r') | KeyCode::Tab => self.activate(),
            _ => {}
        }
    }

    fn activate(&mut self) {
        let result = self.with_controller(|c| c.dispatch(SessionEvent::ActivateRequested));
        self.report(result);
        if self.phase() == Some(Phase::Armed) {
            self.screen = Screen::Typing;
        }
    }

    fn type_char(&mut self, c: char) {
        if let Some(mut value) = self.typed_value() {
            value.push(c);
            self.send_keystroke(value);
        }
    }

    fn send_keystroke(&mut self, value: String) {
        let result = self.with_controller(|c| c.dispatch(SessionEvent::KeystrokeChanged(value)));
        self.report(result);
        self.follow_session();
    }

    fn toggle_ghost(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            let enabled = controller.toggle_ghost();
            self.status = Some(format!("ghost pacer {}", if enabled { "on" } else { "off" }));
        }
    }

    fn typed_value(&self) -> Option<String> {
        self.controller
            .as_ref()
            .map(|c| c.session().typed().iter().collect())
    }

    fn phase(&self) -> Option<Phase> {
        self.controller.as_ref().map(|c| c.session().phase())
    }

    /// Move to the results screen once the session has finished.
    fn follow_session(&mut self) {
        if self.screen == Screen::Typing && self.phase() == Some(Phase::Finished) {
            self.screen = Screen::Results;
        }
    }

    fn with_controller<F>(&mut self, f: F) -> Result<(), ControllerError>
    where
        F: FnOnce(&mut Controller<S, T>) -> Result<(), ControllerError>,
    {
        match self.controller.as_mut() {
            Some(controller) => f(controller),
            None => Ok(()),
        }
    }

    fn report(&mut self, result: Result<(), ControllerError>) {
        match result {
            Ok(()) => self.status = None,
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// The current selection as preferences to remember.
    pub fn preferences(&self, base: &Config) -> Config {
        let mut config = base.clone();
        if let Some(controller) = self.controller.as_ref() {
            let session = controller.session();
            config.mode = session.selected_mode();
            config.difficulty = session.selected_difficulty().clone();
            config.ghost = session.ghost();
        }
        config
    }

    pub fn controller(&self) -> Option<&Controller<S, T>> {
        self.controller.as_ref()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Mode;
    use crate::passages::{Difficulty, PassageBook};
    use crate::store::MemoryScoreStore;
    use crate::timer::ManualTicker;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_app(json: &str, mode: Mode) -> App<MemoryScoreStore, ManualTicker> {
        App::new(Controller::with_rng(
            PassageBook::from_json(json).unwrap(),
            MemoryScoreStore::new(),
            ManualTicker::new(),
            mode,
            Difficulty::default(),
            StdRng::seed_from_u64(9),
        ))
    }

    fn press(app: &mut App<MemoryScoreStore, ManualTicker>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App<MemoryScoreStore, ManualTicker>, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn typed(app: &App<MemoryScoreStore, ManualTicker>) -> String {
        app.controller().unwrap().session().typed().iter().collect()
    }

    const BOOK: &str = r#"{ "easy": [{ "text": "hi" }], "hard": [{ "text": "xyz" }] }"#;

    #[test]
    fn starts_on_start_screen_armed() {
        let app = new_app(BOOK, Mode::Timed);
        assert_eq!(app.screen(), &Screen::Start);
        assert_eq!(
            app.controller().unwrap().session().phase(),
            Phase::Armed
        );
        assert!(app.status().is_none());
    }

    #[test]
    fn printable_key_starts_and_types() {
        let mut app = new_app(BOOK, Mode::Timed);
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.screen(), &Screen::Typing);
        assert_eq!(typed(&app), "h");
        assert!(app.controller().unwrap().session().is_running());
    }

    #[test]
    fn backspace_edits_typed_value() {
        let mut app = new_app(BOOK, Mode::Timed);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(typed(&app), "h");
        assert_eq!(app.controller().unwrap().session().mistakes(), 0);
    }

    #[test]
    fn finishing_shows_results_then_go_again() {
        let mut app = new_app(BOOK, Mode::PassageLength);
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.screen(), &Screen::Results);

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.screen(), &Screen::Start);
        assert_eq!(
            app.controller().unwrap().session().phase(),
            Phase::Armed
        );
        assert_eq!(typed(&app), "");
    }

    #[test]
    fn tab_restarts_during_test() {
        let mut app = new_app(BOOK, Mode::Timed);
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.screen(), &Screen::Typing);
        assert_eq!(typed(&app), "");
        assert!(!app.controller().unwrap().timer().is_active());
    }

    #[test]
    fn selectors_on_start_screen() {
        let mut app = new_app(BOOK, Mode::Timed);
        press(&mut app, KeyCode::Tab);
        assert_eq!(
            app.controller().unwrap().session().mode(),
            Mode::PassageLength
        );
        press(&mut app, KeyCode::Down);
        assert_eq!(
            app.controller().unwrap().session().difficulty().as_str(),
            "hard"
        );
    }

    #[test]
    fn empty_pool_sets_status() {
        let mut app = new_app(r#"{ "easy": [{ "text": "hi" }], "medium": [] }"#, Mode::Timed);
        press(&mut app, KeyCode::Down);
        assert!(app.status().unwrap().contains("medium"));
        assert_eq!(app.screen(), &Screen::Start);
    }

    #[test]
    fn ticks_drive_timed_test_to_results() {
        let mut app = new_app(BOOK, Mode::Timed);
        press(&mut app, KeyCode::Char('h'));
        for _ in 0..60 {
            let tick = app.controller().unwrap().timer().current().unwrap();
            app.handle_event(AppEvent::Tick(tick));
        }
        assert_eq!(app.screen(), &Screen::Results);
    }

    #[test]
    fn ghost_toggle_and_preferences() {
        let mut app = new_app(BOOK, Mode::Timed);
        ctrl(&mut app, 'g');
        assert_eq!(app.status(), Some("ghost pacer on"));
        press(&mut app, KeyCode::Tab);
        let prefs = app.preferences(&Config::default());
        assert!(prefs.ghost);
        assert_eq!(prefs.mode, Mode::PassageLength);
    }

    #[test]
    fn quit_keys() {
        let mut app = new_app(BOOK, Mode::Timed);
        ctrl(&mut app, 'c');
        assert!(app.should_quit());

        let mut app = new_app(BOOK, Mode::Timed);
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit());
    }

    #[test]
    fn load_failed_only_quits() {
        let mut app: App<MemoryScoreStore, ManualTicker> = App::load_failed("bad data");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen(), &Screen::LoadFailed("bad data".to_string()));
        assert!(!app.should_quit());
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
