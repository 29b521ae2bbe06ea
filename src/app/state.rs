use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;

use crate::films::{DraftField, DraftRecord, MovieRecord, FETCH_FAILED_MESSAGE};

/// Where the fetch lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Loading,
    Error,
    Empty,
    Populated,
}

/// Which form element receives typed characters and Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormFocus {
    #[default]
    Title,
    OpeningText,
    ReleaseDate,
    Submit,
    Close,
}

impl FormFocus {
    const ORDER: [FormFocus; 5] = [
        FormFocus::Title,
        FormFocus::OpeningText,
        FormFocus::ReleaseDate,
        FormFocus::Submit,
        FormFocus::Close,
    ];

    pub fn field(self) -> Option<DraftField> {
        match self {
            FormFocus::Title => Some(DraftField::Title),
            FormFocus::OpeningText => Some(DraftField::OpeningText),
            FormFocus::ReleaseDate => Some(DraftField::ReleaseDate),
            FormFocus::Submit | FormFocus::Close => None,
        }
    }

    fn step(self, delta: isize) -> Self {
        let len = Self::ORDER.len() as isize;
        let idx = Self::ORDER
            .iter()
            .position(|f| *f == self)
            .unwrap_or(0) as isize;
        Self::ORDER[(idx + delta).rem_euclid(len) as usize]
    }
}

/// Ticket handed out by [`ViewState::begin_fetch`]; only the newest one may
/// land its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn token(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub movies: Vec<MovieRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub form_visible: bool,
    pub draft: DraftRecord,
    pub form_focus: FormFocus,
    pub selected: usize,
    pub status_message: Option<String>,
    request_token: u64,
    next_local_id: i64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            movies: Vec::new(),
            is_loading: false,
            error: None,
            form_visible: false,
            draft: DraftRecord::default(),
            form_focus: FormFocus::default(),
            selected: 0,
            status_message: None,
            request_token: 0,
            next_local_id: -1,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn phase(&self) -> FetchPhase {
        if self.is_loading {
            FetchPhase::Loading
        } else if self.error.is_some() {
            FetchPhase::Error
        } else if self.request_token == 0 && self.movies.is_empty() {
            FetchPhase::Idle
        } else if self.movies.is_empty() {
            FetchPhase::Empty
        } else {
            FetchPhase::Populated
        }
    }

    pub fn selected(&self) -> Option<&MovieRecord> {
        self.movies.get(self.selected)
    }

    /// Enters `Loading`, clearing any previous error first.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.error = None;
        self.is_loading = true;
        self.request_token += 1;
        FetchTicket(self.request_token)
    }

    /// Applies the outcome of the fetch identified by `ticket`. Returns
    /// `false` when the ticket is stale and the outcome was dropped.
    pub fn complete_fetch<E>(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<MovieRecord>, E>,
    ) -> bool {
        if ticket.0 != self.request_token {
            return false;
        }
        match result {
            Ok(movies) => {
                self.movies = movies;
                self.error = None;
                self.normalize_selection();
            }
            Err(_) => {
                self.error = Some(FETCH_FAILED_MESSAGE.to_string());
            }
        }
        self.is_loading = false;
        true
    }

    /// Appends the draft as a new record and closes the form.
    pub fn add_local(&mut self) -> &MovieRecord {
        let id = self.next_local_id;
        self.next_local_id -= 1;
        let draft = std::mem::take(&mut self.draft);
        self.movies.push(MovieRecord::from_draft(id, &draft));
        self.form_visible = false;
        self.form_focus = FormFocus::default();
        self.selected = self.movies.len() - 1;
        &self.movies[self.selected]
    }

    pub fn delete_movie(&mut self, id: i64) -> Option<MovieRecord> {
        let idx = self.movies.iter().position(|movie| movie.id == id)?;
        let removed = self.movies.remove(idx);
        self.normalize_selection();
        Some(removed)
    }

    pub fn show_form(&mut self) {
        self.form_visible = true;
        self.form_focus = FormFocus::Title;
    }

    pub fn hide_form(&mut self) {
        self.form_visible = false;
    }

    /// Sets a draft field by its form name. Unknown names are ignored.
    pub fn update_draft_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        match DraftField::from_str(name) {
            Ok(field) => {
                self.set_draft_field(field, value);
                true
            }
            Err(_) => {
                tracing::debug!(name, "ignoring unknown draft field");
                false
            }
        }
    }

    pub fn set_draft_field(&mut self, field: DraftField, value: impl Into<String>) {
        self.draft.set(field, value.into());
    }

    /// The value the focused field would hold after typing `ch`, if it takes it.
    pub fn draft_with_char(&self, ch: char) -> Option<(DraftField, String)> {
        let field = self.form_focus.field()?;
        let current = self.draft.field(field);
        if !field.accepts(current, ch) {
            return None;
        }
        let mut value = current.to_string();
        value.push(ch);
        Some((field, value))
    }

    /// The value the focused field would hold after a backspace.
    pub fn draft_without_last(&self) -> Option<(DraftField, String)> {
        let field = self.form_focus.field()?;
        let current = self.draft.field(field);
        let (cut, _) = current.grapheme_indices(true).next_back()?;
        Some((field, current[..cut].to_string()))
    }

    pub fn focus_next_field(&mut self) {
        self.form_focus = self.form_focus.step(1);
    }

    pub fn focus_previous_field(&mut self) {
        self.form_focus = self.form_focus.step(-1);
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.movies.is_empty() {
            self.selected = 0;
            return;
        }
        let max = self.movies.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, max) as usize;
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    fn normalize_selection(&mut self) {
        if self.movies.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.movies.len() {
            self.selected = self.movies.len() - 1;
        }
    }
}
