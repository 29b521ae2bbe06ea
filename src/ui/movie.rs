use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::ListItem;

use crate::films::MovieRecord;

pub const DELETE_LABEL: &str = "[Delete]";

/// One list row: title with its delete affordance, release date, then the
/// opening text.
pub fn movie_item(
    movie: &MovieRecord,
    selected: bool,
    show_opening_text: bool,
) -> ListItem<'static> {
    let delete_style = if selected {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut lines = Vec::new();
    lines.push(Line::from(vec![
        Span::styled(
            movie.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(DELETE_LABEL, delete_style),
    ]));
    lines.push(Line::from(Span::styled(
        release_label(&movie.release_date),
        Style::default().fg(Color::Gray),
    )));
    if show_opening_text {
        for line in movie.opening_text.lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::Yellow),
            )));
        }
    }
    lines.push(Line::from(""));
    ListItem::new(lines)
}

fn release_label(release_date: &str) -> String {
    if release_date.is_empty() {
        "Release date unknown".to_string()
    } else {
        format!("Released {release_date}")
    }
}
