//! Full-screen terminal front-end built on ratatui.

mod state;
mod terminal;
mod view;

use std::sync::mpsc::Sender;
use std::thread;

use crossterm::event::{self, Event};
use log::debug;

pub use state::TuiState;
use terminal::{init_terminal, restore_terminal, Term};

use crate::cloudflare_api::Zone;
use crate::controller::AppEvent;
use crate::frontend::{Frontend, MessageKind, RecordsView, Tone, UserAction};

pub struct TuiFrontend {
    terminal: Term,
    state: TuiState,
}

impl TuiFrontend {
    /// Switches the terminal to raw mode and the alternate screen.
    pub fn new() -> anyhow::Result<Self> {
        Ok(TuiFrontend {
            terminal: init_terminal()?,
            state: TuiState::default(),
        })
    }

    /// Gives the terminal back to the shell.
    pub fn restore(&mut self) -> anyhow::Result<()> {
        restore_terminal(&mut self.terminal)
    }
}

/// Forwards terminal events into the presentation queue until it closes.
pub fn spawn_input_thread(tx: Sender<AppEvent<Event>>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        let event = match event::read() {
            Ok(event) => event,
            Err(e) => {
                debug!("Terminal input closed: {}", e);
                break;
            }
        };
        if tx.send(AppEvent::Input(event)).is_err() {
            break;
        }
    })
}

impl Frontend for TuiFrontend {
    type Input = Event;

    fn interpret(&mut self, input: Event) -> Option<UserAction> {
        self.state.handle_event(input)
    }

    fn draw(&mut self) -> anyhow::Result<()> {
        let state = &self.state;
        self.terminal.draw(|frame| view::render(state, frame))?;
        Ok(())
    }

    fn clear(&mut self) {
        self.state.clear();
    }

    fn set_status(&mut self, message: &str) {
        self.state.status = message.to_string();
    }

    fn show_domains(&mut self, zones: &[Zone], error: Option<&str>) {
        self.state.show_domains(zones, error);
    }

    fn show_records(&mut self, view: RecordsView<'_>) {
        self.state.show_records(view);
    }

    fn set_record_controls(&mut self, enabled: bool) {
        self.state.set_record_controls(enabled);
    }

    fn open_credentials_editor(&mut self) {
        self.state.open_credentials_editor();
    }

    fn credentials_editor_active(&self) -> bool {
        self.state.credentials_editor_active()
    }

    fn credentials_editor_status(&mut self, message: &str, tone: Tone) {
        self.state.credentials_editor_status(message, tone);
    }

    fn close_credentials_editor(&mut self) {
        self.state.close_credentials_editor();
    }

    fn open_record_editor(&mut self) {
        self.state.open_record_editor();
    }

    fn record_editor_active(&self) -> bool {
        self.state.record_editor_active()
    }

    fn record_editor_status(&mut self, message: &str, tone: Tone) {
        self.state.record_editor_status(message, tone);
    }

    fn close_record_editor(&mut self) {
        self.state.close_record_editor();
    }

    fn show_message(&mut self, kind: MessageKind, title: &str, body: &str) {
        self.state.show_message(kind, title, body);
    }
}
