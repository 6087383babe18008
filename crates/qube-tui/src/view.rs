//! Minimal ratatui rendering
//!
//! Scrollback retains ANSI from the PTY; this renderer strips it and
//! applies its own styling instead of interpreting the escapes.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use regex::Regex;
use std::sync::OnceLock;

use crate::app::App;
use qube_executor::Status;

fn ansi() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("invalid regex"))
}

fn strip_ansi(text: &str) -> String {
    ansi().replace_all(text, "").into_owned()
}

pub fn render(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),    // scrollback
            Constraint::Length(1), // progress
            Constraint::Length(3), // prompt
            Constraint::Length(1), // status bar
        ])
        .split(frame.area());

    render_header(frame, app, rows[0]);
    render_output(frame, app, rows[1]);
    render_progress(frame, app, rows[2]);
    render_prompt(frame, app, rows[3]);
    render_status_bar(frame, app, rows[4]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let connection = if app.connected {
        Span::styled("● Connected", Style::default().fg(Color::Green))
    } else {
        Span::styled("○ Connecting", Style::default().fg(Color::Yellow))
    };
    let header = Line::from(vec![
        Span::styled(
            " Qube ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("v{} ", app.version), Style::default().fg(Color::DarkGray)),
        connection,
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_output(frame: &mut Frame, app: &App, area: Rect) {
    let visible = area.height as usize;
    let start = app.lines.len().saturating_sub(visible);
    let lines: Vec<Line> = app.lines[start..]
        .iter()
        .map(|line| {
            let plain = strip_ansi(line);
            if plain.starts_with("> ") {
                Line::from(Span::styled(plain, Style::default().fg(Color::Cyan)))
            } else if plain.starts_with("Error: ") || plain.starts_with("Session Error: ") {
                Line::from(Span::styled(plain, Style::default().fg(Color::Red)))
            } else {
                Line::from(plain)
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(progress) = &app.progress {
        let line = Line::from(Span::styled(
            format!(" {}", strip_ansi(progress)),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
        ));
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn render_prompt(frame: &mut Frame, app: &App, area: Rect) {
    let (placeholder, style) = if app.input_enabled {
        ("Enter Q command...", Style::default().fg(Color::DarkGray))
    } else {
        ("Initializing...", Style::default().fg(Color::DarkGray))
    };

    let content = if app.input.is_empty() {
        Span::styled(placeholder, style)
    } else {
        Span::raw(app.input.as_str())
    };

    let border = if app.input_enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let prompt = Paragraph::new(Line::from(vec![Span::raw("> "), content]))
        .block(Block::default().borders(Borders::ALL).border_style(border));
    frame.render_widget(prompt, area);

    if app.input_enabled {
        // Cursor sits after "> " plus the typed text, inside the border.
        let x = area.x + 3 + app.input.chars().count() as u16;
        let y = area.y + 1;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), y));
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_color = match app.status {
        Status::Ready => Color::Green,
        Status::Running => Color::Yellow,
        Status::Error => Color::Red,
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", app.mode.display_name()),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{} ", app.status.display_name()),
            Style::default().fg(status_color),
        ),
    ];

    if let Some(command) = &app.current_command {
        spans.push(Span::styled(
            format!("· {command} "),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if app.error_count > 0 {
        spans.push(Span::styled(
            format!("✗ {} ", app.error_count),
            Style::default().fg(Color::Red),
        ));
    }
    spans.push(Span::styled(
        "^C quit · ^L clear · ↑↓ history",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
