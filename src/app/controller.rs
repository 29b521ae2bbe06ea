use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use once_cell::sync::OnceCell;
use time::{macros::format_description, OffsetDateTime, UtcOffset};

use crate::films::{fetch_films, FetchError, FilmsTransport, MovieRecord};

use super::intent::Intent;
use super::state::{FetchTicket, ViewState};

#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub result: Result<Vec<MovieRecord>, FetchError>,
}

/// Sole owner of [`ViewState`]. Every transition goes through here.
pub struct Controller {
    state: ViewState,
    transport: Arc<dyn FilmsTransport>,
    endpoint: String,
    outcomes_tx: Sender<FetchOutcome>,
    outcomes_rx: Receiver<FetchOutcome>,
}

impl Controller {
    pub fn new(transport: Arc<dyn FilmsTransport>, endpoint: impl Into<String>) -> Self {
        let (outcomes_tx, outcomes_rx) = crossbeam_channel::unbounded();
        Self {
            state: ViewState::new(),
            transport,
            endpoint: endpoint.into(),
            outcomes_tx,
            outcomes_rx,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn dispatch(&mut self, intent: Intent) {
        match intent {
            Intent::FetchMovies => {
                self.fetch_all();
            }
            Intent::ShowForm => self.show_form(),
            Intent::HideForm => self.hide_form(),
            Intent::SubmitDraft => self.add_local(),
            Intent::UpdateDraftField(field, value) => self.state.set_draft_field(field, value),
            Intent::DeleteMovie(id) => self.delete_movie(id),
            Intent::FocusNextField => self.state.focus_next_field(),
            Intent::FocusPreviousField => self.state.focus_previous_field(),
            Intent::SelectNext => self.state.move_selection(1),
            Intent::SelectPrevious => self.state.move_selection(-1),
            Intent::Quit => {}
        }
    }

    /// Starts a GET on a worker thread. The result lands on the next
    /// [`Controller::poll`].
    pub fn fetch_all(&mut self) -> FetchTicket {
        let ticket = self.state.begin_fetch();
        self.state.set_status_message(Some("Fetching movies..."));
        tracing::info!(token = ticket.token(), endpoint = %self.endpoint, "fetching movies");

        let transport = Arc::clone(&self.transport);
        let endpoint = self.endpoint.clone();
        let tx = self.outcomes_tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("films-fetch-{}", ticket.token()))
            .spawn(move || {
                let result = fetch_films(transport.as_ref(), &endpoint);
                if tx.send(FetchOutcome { ticket, result }).is_err() {
                    tracing::debug!(
                        token = ticket.token(),
                        "controller gone, dropping fetch outcome"
                    );
                }
            });
        if let Err(err) = spawned {
            tracing::error!(?err, "failed to spawn fetch worker");
            self.apply_outcome(FetchOutcome {
                ticket,
                result: Err(FetchError::Transport(err.to_string())),
            });
        }
        ticket
    }

    /// Applies every outcome that has already arrived. Returns how many were
    /// applied (stale ones are not counted).
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            if self.apply_outcome(outcome) {
                applied += 1;
            }
        }
        applied
    }

    pub fn add_local(&mut self) {
        let added = self.state.add_local();
        tracing::info!(
            id = added.id,
            title = %added.title,
            release_date = %added.release_date,
            "added local movie"
        );
        let message = format!("Added '{}'", added.title);
        self.state.set_status_message(Some(message));
    }

    pub fn delete_movie(&mut self, id: i64) {
        match self.state.delete_movie(id) {
            Some(removed) => {
                tracing::info!(id, title = %removed.title, "deleted movie");
                self.state
                    .set_status_message(Some(format!("Deleted '{}'", removed.title)));
            }
            None => tracing::debug!(id, "delete requested for unknown movie"),
        }
    }

    pub fn show_form(&mut self) {
        self.state.show_form();
    }

    pub fn hide_form(&mut self) {
        self.state.hide_form();
    }

    pub fn update_draft_field(&mut self, name: &str, value: impl Into<String>) {
        self.state.update_draft_field(name, value);
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) -> bool {
        let FetchOutcome { ticket, result } = outcome;
        let summary = match &result {
            Ok(movies) => {
                tracing::info!(token = ticket.token(), count = movies.len(), "fetch finished");
                Some(movies.len())
            }
            Err(err) => {
                tracing::warn!(token = ticket.token(), %err, "fetch failed");
                None
            }
        };
        if !self.state.complete_fetch(ticket, result) {
            tracing::debug!(token = ticket.token(), "discarding stale fetch outcome");
            return false;
        }
        let message = match summary {
            Some(count) => {
                let at = clock_label(OffsetDateTime::now_utc(), LOCAL_OFFSET.get().copied());
                format!("Fetched {count} movies at {at}")
            }
            None => "Fetch failed; press f to retry".to_string(),
        };
        self.state.set_status_message(Some(message));
        true
    }
}

static LOCAL_OFFSET: OnceCell<UtcOffset> = OnceCell::new();

/// Records the local UTC offset for status timestamps. `time` refuses to
/// read it once other threads exist, so call this before the first fetch.
pub fn capture_local_offset() {
    match UtcOffset::current_local_offset() {
        Ok(offset) => {
            let _ = LOCAL_OFFSET.set(offset);
        }
        Err(err) => tracing::debug!(%err, "local offset unavailable, timestamps in UTC"),
    }
}

/// `HH:MM:SS` in `offset`, or suffixed with `UTC` when the offset is unknown.
fn clock_label(now_utc: OffsetDateTime, offset: Option<UtcOffset>) -> String {
    let (dt, suffix) = match offset {
        Some(offset) => (now_utc.to_offset(offset), ""),
        None => (now_utc, " UTC"),
    };
    match dt.format(&format_description!("[hour]:[minute]:[second]")) {
        Ok(clock) => format!("{clock}{suffix}"),
        Err(_) => dt.unix_timestamp().to_string(),
    }
}

#[cfg(test)]
impl Controller {
    /// Blocks for the next outcome. `Some(applied)` when one arrived in time.
    fn recv_outcome(&mut self, timeout: std::time::Duration) -> Option<bool> {
        let outcome = self.outcomes_rx.recv_timeout(timeout).ok()?;
        Some(self.apply_outcome(outcome))
    }

    /// Blocks until no fetch is outstanding or `timeout` elapses. Returns
    /// whether loading finished.
    pub(crate) fn wait_for_fetch(&mut self, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.state.is_loading {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() || self.recv_outcome(remaining).is_none() {
                break;
            }
        }
        !self.state.is_loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::films::{DraftField, FETCH_FAILED_MESSAGE};
    use crate::app::state::FetchPhase;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use time::macros::{datetime, offset};

    const WAIT: Duration = Duration::from_secs(5);
    const NEW_HOPE: &str = r#"{"results":[{"episode_id":1,"title":"A New Hope","opening_crawl":"...","release_date":"1977-05-25"}]}"#;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<Vec<u8>, FetchError>>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<Vec<u8>, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    impl FilmsTransport for ScriptedTransport {
        fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            self.responses
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Transport("script exhausted".into())))
        }
    }

    /// Each call parks on its own gate and announces itself first, so a test
    /// can decide the order in which calls finish.
    struct GatedTransport {
        gates: Mutex<VecDeque<Receiver<Vec<u8>>>>,
        called: Sender<()>,
    }

    impl FilmsTransport for GatedTransport {
        fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            let gate = self.gates.lock().expect("lock").pop_front().expect("gate");
            self.called.send(()).expect("announce");
            gate.recv()
                .map_err(|err| FetchError::Transport(err.to_string()))
        }
    }

    fn controller(transport: Arc<dyn FilmsTransport>) -> Controller {
        Controller::new(transport, "http://films.test/api/films/")
    }

    #[test]
    fn initial_fetch_populates_movies() {
        let mut ctl = controller(ScriptedTransport::new(vec![Ok(NEW_HOPE.as_bytes().to_vec())]));
        ctl.fetch_all();
        assert!(ctl.state().is_loading);
        assert!(ctl.wait_for_fetch(WAIT));

        let state = ctl.state();
        assert_eq!(
            state.movies,
            vec![MovieRecord {
                id: 1,
                title: "A New Hope".into(),
                opening_text: "...".into(),
                release_date: "1977-05-25".into(),
            }]
        );
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert_eq!(state.phase(), FetchPhase::Populated);
    }

    #[test]
    fn server_error_sets_fixed_message() {
        let mut ctl = controller(ScriptedTransport::new(vec![Err(FetchError::Status(500))]));
        ctl.fetch_all();
        assert!(ctl.wait_for_fetch(WAIT));
        let state = ctl.state();
        assert!(state.movies.is_empty());
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(!state.is_loading);
    }

    #[test]
    fn malformed_body_counts_as_failure_and_keeps_movies() {
        let mut ctl = controller(ScriptedTransport::new(vec![
            Ok(NEW_HOPE.as_bytes().to_vec()),
            Ok(b"{\"results\": 7}".to_vec()),
        ]));
        ctl.fetch_all();
        assert!(ctl.wait_for_fetch(WAIT));
        ctl.fetch_all();
        assert!(ctl.wait_for_fetch(WAIT));
        assert_eq!(ctl.state().movies.len(), 1);
        assert_eq!(ctl.state().error.as_deref(), Some(FETCH_FAILED_MESSAGE));
    }

    #[test]
    fn retry_after_failure_recovers() {
        let mut ctl = controller(ScriptedTransport::new(vec![
            Err(FetchError::Transport("connection refused".into())),
            Ok(NEW_HOPE.as_bytes().to_vec()),
        ]));
        ctl.dispatch(Intent::FetchMovies);
        assert!(ctl.wait_for_fetch(WAIT));
        assert_eq!(ctl.state().phase(), FetchPhase::Error);

        ctl.dispatch(Intent::FetchMovies);
        assert!(ctl.state().error.is_none());
        assert!(ctl.wait_for_fetch(WAIT));
        assert_eq!(ctl.state().phase(), FetchPhase::Populated);
    }

    #[test]
    fn late_response_from_older_fetch_is_ignored() {
        let (gate_old_tx, gate_old_rx) = crossbeam_channel::bounded(1);
        let (gate_new_tx, gate_new_rx) = crossbeam_channel::bounded(1);
        let (called_tx, called_rx) = crossbeam_channel::unbounded();
        let transport = Arc::new(GatedTransport {
            gates: Mutex::new(VecDeque::from(vec![gate_old_rx, gate_new_rx])),
            called: called_tx,
        });
        let mut ctl = controller(transport);

        ctl.fetch_all();
        called_rx.recv_timeout(WAIT).expect("first call started");
        ctl.fetch_all();
        called_rx.recv_timeout(WAIT).expect("second call started");

        gate_new_tx
            .send(br#"{"results":[{"episode_id":2,"title":"new","opening_crawl":"","release_date":""}]}"#.to_vec())
            .expect("release new");
        assert!(ctl.wait_for_fetch(WAIT));
        assert_eq!(ctl.state().movies[0].title, "new");

        gate_old_tx
            .send(br#"{"results":[{"episode_id":1,"title":"old","opening_crawl":"","release_date":""}]}"#.to_vec())
            .expect("release old");
        assert_eq!(ctl.recv_outcome(WAIT), Some(false));
        assert_eq!(ctl.state().movies.len(), 1);
        assert_eq!(ctl.state().movies[0].title, "new");
        assert!(!ctl.state().is_loading);
    }

    #[test]
    fn intents_drive_the_add_form() {
        let mut ctl = controller(ScriptedTransport::new(Vec::new()));
        ctl.dispatch(Intent::ShowForm);
        assert!(ctl.state().form_visible);
        ctl.dispatch(Intent::UpdateDraftField(DraftField::Title, "T".into()));
        ctl.update_draft_field("openingText", "O");
        ctl.update_draft_field("releaseDate", "2020-01-01");
        ctl.dispatch(Intent::SubmitDraft);

        let state = ctl.state();
        assert_eq!(state.movies.len(), 1);
        let added = &state.movies[0];
        assert_eq!(
            (added.title.as_str(), added.opening_text.as_str(), added.release_date.as_str()),
            ("T", "O", "2020-01-01")
        );
        assert!(state.draft.is_empty());
        assert!(!state.form_visible);
        assert_eq!(state.status_message.as_deref(), Some("Added 'T'"));
    }

    #[test]
    fn delete_intent_removes_record() {
        let mut ctl = controller(ScriptedTransport::new(vec![Ok(NEW_HOPE.as_bytes().to_vec())]));
        ctl.fetch_all();
        assert!(ctl.wait_for_fetch(WAIT));
        ctl.dispatch(Intent::DeleteMovie(1));
        assert!(ctl.state().movies.is_empty());
        assert_eq!(ctl.state().phase(), FetchPhase::Empty);
    }

    #[test]
    fn clock_label_uses_local_offset_when_known() {
        let now = datetime!(2024-03-09 22:15:07 UTC);
        assert_eq!(clock_label(now, Some(offset!(+2))), "00:15:07");
        assert_eq!(clock_label(now, None), "22:15:07 UTC");
    }

    #[test]
    fn successful_fetch_reports_time_in_status() {
        let mut ctl = controller(ScriptedTransport::new(vec![Ok(NEW_HOPE.as_bytes().to_vec())]));
        ctl.fetch_all();
        assert!(ctl.wait_for_fetch(WAIT));
        let status = ctl.state().status_message.as_deref().expect("status");
        assert!(status.starts_with("Fetched 1 movies at "), "{status}");
    }

    #[test]
    fn poll_without_outcomes_is_a_no_op() {
        let mut ctl = controller(ScriptedTransport::new(Vec::new()));
        assert_eq!(ctl.poll(), 0);
        assert_eq!(ctl.state().phase(), FetchPhase::Idle);
    }
}
