use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::AppConfig;
use crate::films::{DraftField, FilmsTransport};
use crate::ui;

pub mod controller;
pub mod intent;
pub mod state;

pub use controller::{Controller, FetchOutcome};
pub use intent::Intent;
pub use state::{FetchPhase, FetchTicket, FormFocus, ViewState};

pub struct App {
    config: Arc<AppConfig>,
    controller: Controller,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, transport: Arc<dyn FilmsTransport>) -> Self {
        let controller = Controller::new(transport, config.fetch.endpoint.clone());
        let tick_rate = config.ui.tick_rate();
        Self {
            config,
            controller,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        if self.config.fetch.fetch_on_start {
            self.controller.fetch_all();
        }
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    ui::draw_app(
                        frame,
                        self.controller.state(),
                        &mut self.list_state,
                        &self.config.ui,
                    );
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {
                        // next draw picks up the new size
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.controller.poll();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match map_key(self.controller.state(), key) {
            Some(Intent::Quit) => self.should_quit = true,
            Some(intent) => {
                tracing::trace!(?intent, "dispatching");
                self.controller.dispatch(intent);
            }
            None => {}
        }
    }
}

fn plain(key: &KeyEvent) -> bool {
    !key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

/// Translates a key press into an intent given what is on screen.
pub fn map_key(state: &ViewState, key: KeyEvent) -> Option<Intent> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Intent::Quit);
    }
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Intent::FetchMovies);
    }

    if state.form_visible {
        return match key.code {
            KeyCode::Esc => Some(Intent::HideForm),
            KeyCode::Tab => Some(Intent::FocusNextField),
            KeyCode::BackTab => Some(Intent::FocusPreviousField),
            KeyCode::Enter => match state.form_focus {
                FormFocus::Submit => Some(Intent::SubmitDraft),
                FormFocus::Close => Some(Intent::HideForm),
                FormFocus::OpeningText => {
                    let mut value = state.draft.opening_text.clone();
                    value.push('\n');
                    Some(Intent::UpdateDraftField(DraftField::OpeningText, value))
                }
                FormFocus::Title | FormFocus::ReleaseDate => Some(Intent::FocusNextField),
            },
            KeyCode::Backspace => state
                .draft_without_last()
                .map(|(field, value)| Intent::UpdateDraftField(field, value)),
            KeyCode::Char(ch) if plain(&key) => state
                .draft_with_char(ch)
                .map(|(field, value)| Intent::UpdateDraftField(field, value)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') if plain(&key) => Some(Intent::Quit),
        KeyCode::Char('a') if plain(&key) => Some(Intent::ShowForm),
        KeyCode::Char('f') if plain(&key) => Some(Intent::FetchMovies),
        KeyCode::Char('j') | KeyCode::Down => Some(Intent::SelectNext),
        KeyCode::Char('k') | KeyCode::Up => Some(Intent::SelectPrevious),
        // rows are only deletable while the list itself is on screen
        KeyCode::Char('d') | KeyCode::Delete if plain(&key) => {
            match ui::content_view(state) {
                ui::ContentView::List(_) => {
                    state.selected().map(|movie| Intent::DeleteMovie(movie.id))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}
