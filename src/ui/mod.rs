use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{FormFocus, ViewState};
use crate::config::UiOptions;
use crate::films::{DraftField, MovieRecord};

pub mod movie;

pub const LOADING_TEXT: &str = "Loading...";
pub const EMPTY_TEXT: &str = "Found no movies.";

const FORM_HEIGHT: u16 = 15;
const OPENING_TEXT_HEIGHT: u16 = 5;

/// What the content area shows. Exactly one applies, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentView<'a> {
    Loading,
    Error(&'a str),
    Empty,
    List(&'a [MovieRecord]),
}

pub fn content_view(state: &ViewState) -> ContentView<'_> {
    if state.is_loading {
        ContentView::Loading
    } else if let Some(error) = state.error.as_deref() {
        ContentView::Error(error)
    } else if state.movies.is_empty() {
        ContentView::Empty
    } else {
        ContentView::List(&state.movies)
    }
}

pub fn draw_app(
    frame: &mut Frame,
    state: &ViewState,
    list_state: &mut ListState,
    options: &UiOptions,
) {
    let form_height = if state.form_visible { FORM_HEIGHT } else { 0 };
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(form_height),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.size());

    render_actions(frame, state, vertical[0]);
    if state.form_visible {
        render_form(frame, state, vertical[1]);
    }
    render_content(frame, state, list_state, options, vertical[2]);
    frame.render_widget(
        Paragraph::new(build_status_line(state)).style(Style::default().fg(Color::Gray)),
        vertical[3],
    );
}

fn render_actions(frame: &mut Frame, state: &ViewState, area: Rect) {
    let fetch_style = if state.is_loading {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    };
    let add_style = if state.form_visible {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    };
    // plain 'f' is text while the form has focus
    let fetch_key = if state.form_visible { " Ctrl-R" } else { " f" };
    let line = Line::from(vec![
        Span::styled("[ Add Movies ]", add_style),
        Span::styled(" a", Style::default().fg(Color::Gray)),
        Span::raw("    "),
        Span::styled("[ Fetch Movies ]", fetch_style),
        Span::styled(fetch_key, Style::default().fg(Color::Gray)),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Films")),
        area,
    );
}

fn render_form(frame: &mut Frame, state: &ViewState, area: Rect) {
    let block = Block::default()
        .title("Add Movie")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(OPENING_TEXT_HEIGHT),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    for (field, area) in [
        (DraftField::Title, rows[0]),
        (DraftField::OpeningText, rows[1]),
        (DraftField::ReleaseDate, rows[2]),
    ] {
        render_input(frame, state, field, area);
    }

    let button = |label: &'static str, focused: bool| {
        if focused {
            Span::styled(
                label,
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(label, Style::default().add_modifier(Modifier::BOLD))
        }
    };
    let buttons = Line::from(vec![
        button("[ Add Movie ]", state.form_focus == FormFocus::Submit),
        Span::raw("  "),
        button("[ Close ]", state.form_focus == FormFocus::Close),
        Span::styled(
            "   Tab next • Shift-Tab back • Enter confirm • Ctrl-R fetch • Esc close",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(buttons), rows[3]);
}

fn render_input(frame: &mut Frame, state: &ViewState, field: DraftField, area: Rect) {
    let focused = state.form_focus.field() == Some(field);
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };
    let value = state.draft.field(field);
    let mut paragraph = Paragraph::new(Text::from(value.to_string())).block(
        Block::default()
            .title(field.label())
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    if field.is_multiline() {
        paragraph = paragraph.wrap(Wrap { trim: false });
    }
    frame.render_widget(paragraph, area);

    if focused {
        if let Some((x, y)) = input_cursor_position(value, area) {
            frame.set_cursor(x, y);
        }
    }
}

/// Screen position just past the end of `value` inside a bordered input.
fn input_cursor_position(value: &str, area: Rect) -> Option<(u16, u16)> {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    if inner_width == 0 || inner_height == 0 {
        return None;
    }
    let row = value.matches('\n').count() as u16;
    let last_line = value.rsplit('\n').next().unwrap_or("");
    let col = (UnicodeWidthStr::width(last_line) as u16).min(inner_width - 1);
    let row = row.min(inner_height - 1);
    Some((area.x + 1 + col, area.y + 1 + row))
}

fn render_content(
    frame: &mut Frame,
    state: &ViewState,
    list_state: &mut ListState,
    options: &UiOptions,
    area: Rect,
) {
    let block = |title: String| Block::default().title(title).borders(Borders::ALL);
    match content_view(state) {
        ContentView::Loading => {
            let notice = Paragraph::new(Span::styled(
                LOADING_TEXT,
                Style::default().fg(Color::Yellow),
            ))
            .block(block("Movies".into()));
            frame.render_widget(notice, area);
        }
        ContentView::Error(message) => {
            let notice = Paragraph::new(Span::styled(
                message.to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .block(block("Movies".into()))
            .wrap(Wrap { trim: false });
            frame.render_widget(notice, area);
        }
        ContentView::Empty => {
            frame.render_widget(Paragraph::new(EMPTY_TEXT).block(block("Movies".into())), area);
        }
        ContentView::List(movies) => {
            let items: Vec<ListItem> = movies
                .iter()
                .enumerate()
                .map(|(idx, record)| {
                    movie::movie_item(record, idx == state.selected, options.show_opening_text)
                })
                .collect();
            list_state.select(Some(state.selected.min(movies.len() - 1)));
            let list = List::new(items)
                .block(block(format!("Movies ({})", movies.len())))
                .highlight_style(Style::default().bg(Color::Blue).fg(Color::Black))
                .highlight_symbol("▸ ");
            frame.render_stateful_widget(list, area, list_state);
        }
    }
}

fn build_status_line(state: &ViewState) -> Text<'static> {
    let mut spans = vec![
        Span::raw(format!("Total: {}", state.len())),
        Span::raw(" | "),
    ];
    if let Some(message) = &state.status_message {
        spans.push(Span::styled(
            message.clone(),
            Style::default().fg(Color::Cyan),
        ));
    }

    let keys = if state.form_visible {
        "Keys: type to edit • Tab/Shift-Tab move • Enter confirm • Ctrl-R fetch • Esc close form"
    } else {
        "Keys: a add • f fetch • j/k move • d delete • q quit"
    };
    Text::from(vec![
        Line::from(spans),
        Line::from(Span::styled(keys, Style::default().fg(Color::DarkGray))),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::films::FETCH_FAILED_MESSAGE;
    use assert_matches::assert_matches;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn movie(id: i64, title: &str) -> MovieRecord {
        MovieRecord {
            id,
            title: title.into(),
            opening_text: "It is a period of civil war.".into(),
            release_date: "1977-05-25".into(),
        }
    }

    fn render(state: &ViewState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).expect("terminal");
        let mut list_state = ListState::default();
        terminal
            .draw(|frame| draw_app(frame, state, &mut list_state, &UiOptions::default()))
            .expect("draw");
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn content_priority_is_loading_error_empty_list() {
        let mut state = ViewState::new();
        assert_matches!(content_view(&state), ContentView::Empty);

        state.movies = vec![movie(1, "A New Hope")];
        assert_matches!(content_view(&state), ContentView::List(movies) if movies.len() == 1);

        state.error = Some(FETCH_FAILED_MESSAGE.into());
        assert_matches!(content_view(&state), ContentView::Error(msg) if msg == FETCH_FAILED_MESSAGE);

        state.is_loading = true;
        assert_matches!(content_view(&state), ContentView::Loading);
    }

    #[test]
    fn loading_state_renders_indicator_only() {
        let mut state = ViewState::new();
        state.movies = vec![movie(1, "A New Hope")];
        state.begin_fetch();
        let screen = render(&state);
        assert!(screen.contains(LOADING_TEXT));
        assert!(!screen.contains("A New Hope"));
    }

    #[test]
    fn error_replaces_the_list() {
        let mut state = ViewState::new();
        let ticket = state.begin_fetch();
        state.complete_fetch(ticket, Err::<Vec<MovieRecord>, _>(()));
        let screen = render(&state);
        assert!(screen.contains(FETCH_FAILED_MESSAGE));
        assert!(!screen.contains(movie::DELETE_LABEL));
        assert!(screen.contains("Fetch Movies"));
    }

    #[test]
    fn empty_collection_renders_notice() {
        let screen = render(&ViewState::new());
        assert!(screen.contains(EMPTY_TEXT));
        assert!(screen.contains("Add Movies"));
        assert!(!screen.contains("Release Date"));
    }

    #[test]
    fn populated_list_shows_one_row_per_movie() {
        let mut state = ViewState::new();
        state.movies = vec![movie(4, "A New Hope"), movie(5, "The Empire Strikes Back")];
        let screen = render(&state);
        assert!(screen.contains("A New Hope"));
        assert!(screen.contains("The Empire Strikes Back"));
        assert!(screen.contains("Released 1977-05-25"));
        assert!(screen.contains("It is a period of civil war."));
        assert_eq!(screen.matches(movie::DELETE_LABEL).count(), 2);
    }

    #[test]
    fn visible_form_shows_labelled_inputs_and_draft() {
        let mut state = ViewState::new();
        state.show_form();
        state.update_draft_field("title", "Rogue One");
        let screen = render(&state);
        for label in ["Add Movie", "Title", "Opening Text", "Release Date", "[ Close ]"] {
            assert!(screen.contains(label), "missing {label}");
        }
        assert!(screen.contains("Rogue One"));
        assert!(screen.contains("[ Fetch Movies ] Ctrl-R"));
    }

    #[test]
    fn cursor_tracks_last_line_of_input() {
        let area = Rect::new(0, 0, 20, 5);
        assert_eq!(input_cursor_position("", area), Some((1, 1)));
        assert_eq!(input_cursor_position("ab\ncd", area), Some((3, 2)));
        assert_eq!(input_cursor_position("x", Rect::new(0, 0, 2, 2)), None);
    }
}
