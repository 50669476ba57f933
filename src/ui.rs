pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Screen};
use crate::metrics::{format_clock, AccuracyBand, Mode};
use crate::session::{CharClass, Session};
use crate::store::ScoreStore;
use crate::timer::TickSource;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold_style() -> Style {
    bold_style().add_modifier(Modifier::DIM)
}

fn italic_style() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Timed => "timed",
        Mode::PassageLength => "passage length",
    }
}

impl<S: ScoreStore, T: TickSource> Widget for &App<S, T> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match (self.screen(), self.controller()) {
            (Screen::LoadFailed(message), _) => render_load_failed(message, area, buf),
            (_, None) => {}
            (Screen::Start, Some(c)) => render_test(c.session(), true, self.status(), area, buf),
            (Screen::Typing, Some(c)) => render_test(c.session(), false, self.status(), area, buf),
            (Screen::Results, Some(c)) => render_results(c.session(), self.status(), area, buf),
        }
    }
}

fn render_load_failed(message: &str, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::from(Span::styled(
            "could not load passages",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::raw(message.to_string())),
        Line::from(""),
        Line::from(Span::styled("(q)uit / (esc)ape", italic_style())),
    ];
    let height = (lines.len() as u16).min(area.height);
    let top = area.y + area.height.saturating_sub(height) / 2;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(Rect::new(area.x, top, area.width, height), buf);
}

/// Passage with per-character colouring. On the start screen everything is dimmed.
fn passage_spans(session: &Session, dimmed: bool) -> Vec<Span<'static>> {
    let green_bold_style = bold_style().fg(Color::Green);
    let red_bold_style = bold_style().fg(Color::Red);
    let cursor_style = dim_bold_style().add_modifier(Modifier::UNDERLINED);
    let ghost_head_style = Style::default().bg(Color::Blue);
    let ghost_trail_style = Style::default().bg(Color::DarkGray);

    let ghost = session.ghost_position();
    let typed = session.typed();

    let mut spans: Vec<Span> = session
        .passage()
        .iter()
        .zip(session.classify())
        .enumerate()
        .map(|(idx, (expected, class))| {
            let (text, style) = if dimmed {
                (expected.to_string(), dim_bold_style())
            } else {
                match class {
                    CharClass::Correct => (expected.to_string(), green_bold_style),
                    CharClass::Incorrect => {
                        let shown = match typed.get(idx) {
                            Some(' ') | None => '·',
                            Some(c) => *c,
                        };
                        (shown.to_string(), red_bold_style)
                    }
                    CharClass::Cursor => (expected.to_string(), cursor_style),
                    CharClass::Untyped => (expected.to_string(), dim_bold_style()),
                }
            };
            match ghost {
                Some(head) if idx == head => Span::styled(text, style.patch(ghost_head_style)),
                Some(head) if idx < head => Span::styled(text, style.patch(ghost_trail_style)),
                _ => Span::styled(text, style),
            }
        })
        .collect();

    // timed tests allow typing past the end of the passage
    if !dimmed && typed.len() > session.passage().len() {
        let overflow: String = typed[session.passage().len()..]
            .iter()
            .map(|c| if *c == ' ' { '·' } else { *c })
            .collect();
        spans.push(Span::styled(overflow, red_bold_style));
    }
    spans
}

fn render_test(session: &Session, start: bool, status: Option<&str>, area: Rect, buf: &mut Buffer) {
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let passage: String = session.passage().iter().collect();
    let passage_width = passage.width().max(session.typed_len());

    let passage_lines = if passage_width <= max_chars_per_line as usize {
        1
    } else {
        ((passage_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };
    let padding = area.height.saturating_sub(passage_lines + 6) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(2), // stats
            Constraint::Length(passage_lines),
            Constraint::Length(1), // spacing
            Constraint::Length(2), // selectors / legend
            Constraint::Min(0),
            Constraint::Length(1), // status
        ])
        .split(area);

    let metrics = session.metrics();
    let stats = Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {}",
            metrics.wpm,
            metrics.accuracy,
            format_clock(session.elapsed())
        ),
        dim_bold_style(),
    ))
    .alignment(Alignment::Center);
    stats.render(chunks[1], buf);

    let widget = Paragraph::new(Line::from(passage_spans(session, start)))
        .alignment(if passage_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true });
    widget.render(chunks[2], buf);

    let info = if start {
        vec![
            Line::from(Span::styled(
                format!(
                    "mode: {}   difficulty: {}   ghost: {}",
                    mode_label(session.selected_mode()),
                    session.selected_difficulty(),
                    if session.ghost() { "on" } else { "off" }
                ),
                bold_style(),
            )),
            Line::from(Span::styled(
                "type or (enter) to start / (tab) mode / (↑↓) difficulty / (ctrl+g) ghost / (esc)ape",
                italic_style(),
            )),
        ]
    } else {
        vec![Line::from(Span::styled("(tab) restart / (esc)ape", italic_style()))]
    };
    Paragraph::new(info)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[4], buf);

    render_status(status, chunks[6], buf);
}

fn render_results(session: &Session, status: Option<&str>, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // wpm / accuracy
            Constraint::Length(1), // correct / incorrect
            Constraint::Length(1), // personal best
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
            Constraint::Length(1), // status
        ])
        .split(area);

    let personal_best = session.personal_best();
    let history = session.wpm_history();
    if let Some((duration, highest_wpm)) = charting::compute_chart_params(history, personal_best) {
        let points = charting::history_points(history);
        let best_line = [(1.0, personal_best as f64), (duration, personal_best as f64)];

        let mut datasets = vec![Dataset::default()
            .name("wpm")
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&points)];
        if personal_best > 0 {
            datasets.push(
                Dataset::default()
                    .name("best")
                    .marker(Marker::Dot)
                    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::DIM))
                    .graph_type(GraphType::Line)
                    .data(&best_line),
            );
        }

        let chart = Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("seconds")
                    .bounds([1.0, duration])
                    .labels(vec![
                        Span::styled("1", bold_style()),
                        Span::styled(charting::format_label(duration), bold_style()),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("wpm")
                    .bounds([0.0, highest_wpm])
                    .labels(vec![
                        Span::styled("0", bold_style()),
                        Span::styled(charting::format_label(highest_wpm), bold_style()),
                    ]),
            );
        chart.render(chunks[0], buf);
    }

    let (metrics, correct, incorrect, new_best) = match session.report() {
        Some(report) => (report.metrics, report.correct, report.incorrect, report.new_best),
        None => (
            session.metrics(),
            session.typed_len() - session.mistakes(),
            session.mistakes(),
            false,
        ),
    };

    let accuracy_color = match AccuracyBand::of(metrics.accuracy) {
        AccuracyBand::Low => Color::Red,
        AccuracyBand::Neutral => Color::Yellow,
        AccuracyBand::High => Color::Green,
    };
    Paragraph::new(Line::from(vec![
        Span::styled(format!("{} wpm   ", metrics.wpm), bold_style()),
        Span::styled(
            format!("{}% acc", metrics.accuracy),
            bold_style().fg(accuracy_color),
        ),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!("{correct} correct   {incorrect} incorrect"),
        dim_bold_style(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let badge = if new_best {
        Span::styled(
            "new personal best!",
            bold_style().fg(Color::Green),
        )
    } else {
        Span::styled(
            format!("personal best: {personal_best} wpm"),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        )
    };
    Paragraph::new(badge)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(n)ew passage / (r)etry / (ctrl+g) ghost / (esc)ape",
        italic_style(),
    ))
    .render(chunks[5], buf);

    render_status(status, chunks[6], buf);
}

fn render_status(status: Option<&str>, area: Rect, buf: &mut Buffer) {
    if let Some(message) = status {
        Paragraph::new(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::passages::{Difficulty, PassageBook};
    use crate::store::MemoryScoreStore;
    use crate::timer::ManualTicker;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ratatui::{backend::TestBackend, Terminal};

    type TestApp = App<MemoryScoreStore, ManualTicker>;

    fn new_app(mode: Mode, best: u32) -> TestApp {
        App::new(Controller::with_rng(
            PassageBook::from_json(r#"{ "easy": [{ "text": "hello world" }] }"#).unwrap(),
            MemoryScoreStore::with_best(best),
            ManualTicker::new(),
            mode,
            Difficulty::default(),
            StdRng::seed_from_u64(1),
        ))
    }

    fn type_keys(app: &mut TestApp, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    fn tick(app: &mut TestApp) {
        let tick = app.controller().unwrap().timer().current().unwrap();
        app.on_tick(tick);
    }

    fn draw(app: &TestApp) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| f.render_widget(app, f.area()))
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_start_screen_shows_selectors() {
        let app = new_app(Mode::Timed, 0);
        let content = draw(&app);
        assert!(content.contains("hello world"));
        assert!(content.contains("mode: timed"));
        assert!(content.contains("difficulty: easy"));
        assert!(content.contains("1:00"));
    }

    #[test]
    fn test_typing_screen_shows_progress() {
        let mut app = new_app(Mode::PassageLength, 0);
        type_keys(&mut app, "hellp");
        tick(&mut app);
        let content = draw(&app);
        assert!(content.contains("0:01"));
        assert!(content.contains("80% acc"));
        assert!(content.contains("(tab) restart"));
    }

    #[test]
    fn test_results_screen() {
        let mut app = new_app(Mode::PassageLength, 10);
        type_keys(&mut app, "hello ");
        tick(&mut app);
        tick(&mut app);
        type_keys(&mut app, "world");
        assert_eq!(app.screen(), &Screen::Results);

        let content = draw(&app);
        assert!(content.contains("100% acc"));
        assert!(content.contains("11 correct"));
        assert!(content.contains("new personal best!"));
        assert!(content.contains("seconds"));
    }

    #[test]
    fn test_results_without_history_skips_chart() {
        let mut app = new_app(Mode::PassageLength, 0);
        type_keys(&mut app, "hello world");
        let content = draw(&app);
        assert!(!content.contains("seconds"));
        assert!(content.contains("personal best: 0 wpm"));
    }

    #[test]
    fn test_load_failed_screen() {
        let app: TestApp = App::load_failed("passage data is malformed");
        let content = draw(&app);
        assert!(content.contains("could not load passages"));
        assert!(content.contains("malformed"));
    }

    #[test]
    fn test_ghost_head_and_trail() {
        let mut app = new_app(Mode::Timed, 60);
        app.handle_key(KeyEvent::new(KeyCode::Char('g'), KeyModifiers::CONTROL));
        type_keys(&mut app, "h");
        tick(&mut app);

        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| f.render_widget(&app, f.area()))
            .unwrap();
        let buffer = terminal.backend().buffer();

        // 60 wpm for one second puts the pacer on the sixth character
        let head: Vec<&str> = buffer
            .content
            .iter()
            .filter(|cell| cell.bg == Color::Blue)
            .map(|cell| cell.symbol())
            .collect();
        assert_eq!(head, vec![" "]);
        let trail: String = buffer
            .content
            .iter()
            .filter(|cell| cell.bg == Color::DarkGray)
            .map(|cell| cell.symbol())
            .collect();
        assert_eq!(trail, "hello");
    }

    #[test]
    fn test_timed_overflow_renders() {
        let mut app = new_app(Mode::Timed, 0);
        type_keys(&mut app, "hello worldxx");
        let content = draw(&app);
        assert!(content.contains("xx"));
    }
}
