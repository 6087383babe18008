//! UI application state
//!
//! `App` is plain state plus two pure-ish entry points: `apply` folds a
//! core event in, `handle_key` folds a key press in and may hand back an
//! action for the assembly to run (submit, clear, quit). No I/O happens
//! here.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use qube_executor::{Mode, Status};

use crate::event::AppEvent;
use crate::history::CommandHistory;

/// Side effects the assembly performs on behalf of the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run this submission through the executor, off the UI loop.
    Submit(String),
    /// Reset the stream processor alongside the local clear.
    Clear,
    /// Stop the session and leave.
    Quit,
}

pub struct App {
    pub lines: Vec<String>,
    pub progress: Option<String>,
    pub input: String,
    pub history: CommandHistory,
    pub mode: Mode,
    pub status: Status,
    pub connected: bool,
    pub input_enabled: bool,
    pub error_count: u32,
    pub current_command: Option<String>,
    pub should_quit: bool,
    pub version: &'static str,
}

impl App {
    /// `input_enabled` starts false when a chat session is being
    /// auto-started; initialization turns the prompt on.
    pub fn new(version: &'static str, input_enabled: bool) -> Self {
        Self {
            lines: Vec::new(),
            progress: None,
            input: String::new(),
            history: CommandHistory::new(),
            mode: Mode::Command,
            status: Status::Ready,
            connected: false,
            input_enabled,
            error_count: 0,
            current_command: None,
            should_quit: false,
            version,
        }
    }

    /// Fold one core event into the UI state.
    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::AppendOutput(line) => self.lines.push(line),
            AppEvent::SetProgress(line) => self.progress = Some(line),
            AppEvent::ClearProgress => self.progress = None,
            AppEvent::SetStatus(status) => {
                self.status = status;
                if status == Status::Ready {
                    self.current_command = None;
                }
            }
            AppEvent::SetMode(mode) => self.mode = mode,
            AppEvent::SetInputEnabled(enabled) => self.input_enabled = enabled,
            AppEvent::SetConnected(connected) => self.connected = connected,
            AppEvent::IncrementError => self.error_count += 1,
            AppEvent::ClearScreen => {
                self.lines.clear();
                self.progress = None;
            }
        }
    }

    /// Fold one key press into the UI state.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => {
                    self.should_quit = true;
                    Some(Action::Quit)
                }
                KeyCode::Char('l') => {
                    self.lines.clear();
                    self.progress = None;
                    self.error_count = 0;
                    Some(Action::Clear)
                }
                _ => None,
            };
        }

        match key.code {
            KeyCode::Enter => self.submit(),
            KeyCode::Up => {
                if let Some(previous) = self.history.previous() {
                    self.input = previous.to_string();
                }
                None
            }
            KeyCode::Down => {
                if let Some(next) = self.history.next() {
                    self.input = next.to_string();
                }
                None
            }
            KeyCode::Char(c) if self.input_enabled => {
                self.input.push(c);
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            _ => None,
        }
    }

    fn submit(&mut self) -> Option<Action> {
        if !self.input_enabled || self.input.trim().is_empty() {
            return None;
        }

        let command = std::mem::take(&mut self.input);
        self.history.add(&command);
        // Echo the submission into scrollback with a prompt marker.
        self.lines.push(format!("> {command}"));
        self.current_command = Some(command.clone());
        Some(Action::Submit(command))
    }
}
