use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

mod client;

pub use client::{fetch_films, FetchError, FilmsTransport, HttpTransport};

/// User-facing text for every kind of fetch failure.
pub const FETCH_FAILED_MESSAGE: &str = "Something went wrong ....Retrying";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub opening_text: String,
    pub release_date: String,
}

impl MovieRecord {
    pub fn from_draft(id: i64, draft: &DraftRecord) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            opening_text: draft.opening_text.clone(),
            release_date: draft.release_date.clone(),
        }
    }
}

/// A record being composed in the add form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftRecord {
    pub title: String,
    pub opening_text: String,
    pub release_date: String,
}

impl DraftRecord {
    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::Title => &self.title,
            DraftField::OpeningText => &self.opening_text,
            DraftField::ReleaseDate => &self.release_date,
        }
    }

    pub fn set(&mut self, field: DraftField, value: String) {
        match field {
            DraftField::Title => self.title = value,
            DraftField::OpeningText => self.opening_text = value,
            DraftField::ReleaseDate => self.release_date = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.opening_text.is_empty() && self.release_date.is_empty()
    }
}

/// Form field names, spelled the way the add form names its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum DraftField {
    #[strum(serialize = "title")]
    Title,
    #[strum(serialize = "openingText")]
    OpeningText,
    #[strum(serialize = "releaseDate")]
    ReleaseDate,
}

impl DraftField {
    pub fn label(self) -> &'static str {
        match self {
            DraftField::Title => "Title",
            DraftField::OpeningText => "Opening Text",
            DraftField::ReleaseDate => "Release Date",
        }
    }

    pub fn is_multiline(self) -> bool {
        matches!(self, DraftField::OpeningText)
    }

    /// Whether `ch` may be typed into this field. Release dates take the
    /// `YYYY-MM-DD` shape of a date input.
    pub fn accepts(self, current: &str, ch: char) -> bool {
        match self {
            DraftField::ReleaseDate => {
                current.chars().count() < 10 && (ch.is_ascii_digit() || ch == '-')
            }
            DraftField::Title | DraftField::OpeningText => !ch.is_control(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FilmsResponse {
    results: Vec<FilmItem>,
}

#[derive(Debug, Deserialize)]
struct FilmItem {
    episode_id: i64,
    title: String,
    opening_crawl: String,
    release_date: String,
}

impl From<FilmItem> for MovieRecord {
    fn from(item: FilmItem) -> Self {
        Self {
            id: item.episode_id,
            title: item.title,
            opening_text: item.opening_crawl,
            release_date: item.release_date,
        }
    }
}

/// Parses a films listing body into records, preserving the order of `results`.
pub fn parse_films(body: &[u8]) -> Result<Vec<MovieRecord>, serde_json::Error> {
    let response: FilmsResponse = serde_json::from_slice(body)?;
    Ok(response.results.into_iter().map(MovieRecord::from).collect())
}
