use crate::films::DraftField;

/// Everything a view can ask the controller to do. Views never touch
/// [`super::ViewState`] directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    FetchMovies,
    ShowForm,
    HideForm,
    SubmitDraft,
    UpdateDraftField(DraftField, String),
    DeleteMovie(i64),
    FocusNextField,
    FocusPreviousField,
    SelectNext,
    SelectPrevious,
    Quit,
}
