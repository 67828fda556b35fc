//! The local copy of the current user's notes.
//!
//! Three sources mutate it independently: [`NoteStore::load`], local actions
//! such as [`NoteStore::remove`], and push events delivered through
//! [`NoteStore::subscribe`]. Every fold is idempotent, so events may arrive
//! late, twice, or after an arbitrary gap without corrupting the collection.
//!
//! Ordering is newest first. The store never holds two notes with the same id.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::mapper;
use crate::models::*;
use crate::remote::{NoteFilter, RemoteDataService};
use crate::ui::{Route, Ui};

/// Progress of the most recent [`NoteStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing requested yet.
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// What a consumer should render. `Loading` and `Empty` are never conflated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Empty,
    Populated(usize),
    Failed(String),
}

#[derive(Debug)]
struct StoreState {
    notes: Vec<Note>,
    load: LoadState,
    /// Bumped by every `load()`; a response for an older generation is stale.
    generation: u64,
    /// Events that arrived while a load was in flight, in arrival order.
    pending: Vec<NoteEvent>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            notes: Vec::new(),
            load: LoadState::Idle,
            generation: 0,
            pending: Vec::new(),
        }
    }

    fn apply(&mut self, event: NoteEvent) -> bool {
        if self.load == LoadState::Loading {
            tracing::debug!(note_id = event.note_id(), "Queueing note event until load completes");
            self.pending.push(event);
            return false;
        }
        fold(&mut self.notes, event)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }
}

/// Fold one event into an ordered, id-unique collection. Returns whether the
/// collection changed.
fn fold(notes: &mut Vec<Note>, event: NoteEvent) -> bool {
    match event {
        NoteEvent::Insert(note) => {
            if notes.iter().any(|n| n.id == note.id) {
                tracing::debug!(note_id = %note.id, "Insert for a note already present, ignoring");
                return false;
            }
            notes.insert(0, note);
            true
        }
        NoteEvent::Update(note) => match notes.iter_mut().find(|n| n.id == note.id) {
            Some(slot) => {
                *slot = note;
                true
            }
            None => {
                tracing::debug!(note_id = %note.id, "Update for a note not loaded, ignoring");
                false
            }
        },
        NoteEvent::Delete(id) => {
            let before = notes.len();
            notes.retain(|n| n.id != id);
            notes.len() != before
        }
    }
}

/// Fold an event queued during a load on top of the fresh snapshot. An update
/// older than the snapshot's copy is already reflected there.
fn replay(notes: &mut Vec<Note>, event: NoteEvent) -> bool {
    if let NoteEvent::Update(note) = &event {
        if let Some(current) = notes.iter().find(|n| n.id == note.id) {
            if current.updated_at > note.updated_at {
                tracing::debug!(note_id = %note.id, "Queued update predates the snapshot, skipping");
                return false;
            }
        }
    }
    fold(notes, event)
}

/// Handle to the note collection for one session. Clones share state.
#[derive(Clone)]
pub struct NoteStore {
    remote: Arc<dyn RemoteDataService>,
    ui: Ui,
    state: Arc<Mutex<StoreState>>,
}

impl NoteStore {
    pub fn new(remote: Arc<dyn RemoteDataService>, ui: Ui) -> Self {
        Self {
            remote,
            ui,
            state: Arc::new(Mutex::new(StoreState::new())),
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.state.lock().load.clone()
    }

    pub fn view_state(&self) -> ViewState {
        let state = self.state.lock();
        match &state.load {
            LoadState::Idle | LoadState::Loading => ViewState::Loading,
            LoadState::Failed(msg) => ViewState::Failed(msg.clone()),
            LoadState::Loaded if state.notes.is_empty() => ViewState::Empty,
            LoadState::Loaded => ViewState::Populated(state.notes.len()),
        }
    }

    /// Snapshot of the collection, newest first.
    pub fn notes(&self) -> Vec<Note> {
        self.state.lock().notes.clone()
    }

    pub fn get(&self, id: &str) -> Option<Note> {
        let state = self.state.lock();
        state.position(id).map(|i| state.notes[i].clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the collection with the current user's notes from the remote
    /// service.
    ///
    /// Events received meanwhile are replayed on top of the fresh snapshot. If
    /// another `load()` starts before this one finishes, this one's result is
    /// discarded.
    pub async fn load(&self) -> Result<(), AppError> {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.load = LoadState::Loading;
            state.pending.clear();
            state.generation
        };
        tracing::debug!(generation, "Loading notes");

        let result = self.fetch_all().await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!(generation, "Discarding superseded load");
            return Ok(());
        }

        match result {
            Ok(notes) => {
                state.notes = notes;
                state.load = LoadState::Loaded;
                let pending = std::mem::take(&mut state.pending);
                let replayed = pending.len();
                for event in pending {
                    replay(&mut state.notes, event);
                }
                tracing::info!(count = state.notes.len(), replayed, "Notes loaded");
                Ok(())
            }
            Err(e) => {
                state.load = LoadState::Failed(e.to_string());
                let pending = std::mem::take(&mut state.pending);
                for event in pending {
                    fold(&mut state.notes, event);
                }
                drop(state);

                tracing::warn!("Failed to load notes: {}", e);
                self.ui.error("Error loading notes", &e.to_string());
                if e == AppError::Unauthenticated {
                    self.ui.navigate(Route::SignIn);
                }
                Err(e)
            }
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Note>, AppError> {
        let user = self
            .remote
            .current_user()
            .await?
            .ok_or(AppError::Unauthenticated)?;
        let records = self.remote.query(&NoteFilter::owned_by(user.id)).await?;

        let mut notes: Vec<Note> = Vec::with_capacity(records.len());
        for note in records.into_iter().map(mapper::to_canonical) {
            if notes.iter().any(|n| n.id == note.id) {
                tracing::warn!(note_id = %note.id, "Duplicate note in query result, keeping first");
                continue;
            }
            notes.push(note);
        }
        // Stable: ties keep the order the service returned.
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    /// Fold one push event into the collection without re-fetching.
    ///
    /// Insert of a present id, update of an absent id, and delete of an absent
    /// id are all no-ops. Returns whether the visible collection changed.
    pub fn apply_remote_event(&self, event: NoteEvent) -> bool {
        self.state.lock().apply(event)
    }

    /// A lazy view of notes whose title or content contains `query`,
    /// ignoring case. An empty query matches everything.
    pub fn search(&self, query: &str) -> NoteSearch {
        NoteSearch {
            notes: self.notes(),
            needle: query.to_lowercase(),
        }
    }

    /// Delete a note remotely. On success the note is dropped locally right
    /// away; the push event for the same delete is then a no-op.
    pub async fn remove(&self, id: &str) -> Result<(), AppError> {
        match self.remote.delete(id).await {
            Ok(()) => {
                self.state.lock().apply(NoteEvent::Delete(id.to_string()));
                tracing::info!(note_id = %id, "Note removed");
                self.ui
                    .success("Note deleted", "Your note has been deleted successfully.");
                Ok(())
            }
            Err(e) => {
                let e = AppError::from(e);
                tracing::warn!(note_id = %id, "Failed to delete note: {}", e);
                self.ui.error("Error deleting note", &e.to_string());
                Err(e)
            }
        }
    }

    /// Start applying push events to this store.
    ///
    /// Events flow until the returned handle is dropped or the store itself is
    /// gone, whichever comes first.
    pub async fn subscribe(&self) -> Result<LiveUpdates, AppError> {
        self.subscribe_with(|_, _| {}).await
    }

    /// Like [`subscribe`](Self::subscribe), calling `on_event` after each
    /// event with whether it changed the collection.
    pub async fn subscribe_with<F>(&self, on_event: F) -> Result<LiveUpdates, AppError>
    where
        F: Fn(&NoteEvent, bool) + Send + 'static,
    {
        let mut subscription = match self.remote.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                let e = AppError::from(e);
                tracing::warn!("Failed to subscribe to note changes: {}", e);
                self.ui.error("Live updates unavailable", &e.to_string());
                return Err(e);
            }
        };

        let state: Weak<Mutex<StoreState>> = Arc::downgrade(&self.state);
        let task = tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                let Some(state) = state.upgrade() else {
                    tracing::debug!("Store dropped, ending live updates");
                    break;
                };
                let event = mapper::to_event(change);
                let changed = state.lock().apply(event.clone());
                on_event(&event, changed);
            }
        });

        tracing::debug!("Live note updates started");
        Ok(LiveUpdates { task })
    }
}

/// Keeps push events flowing into a [`NoteStore`]. Dropping it stops them and
/// releases the remote subscription.
#[derive(Debug)]
pub struct LiveUpdates {
    task: JoinHandle<()>,
}

impl LiveUpdates {
    /// Wait until the remote feed ends on its own.
    pub async fn closed(mut self) {
        let _ = (&mut self.task).await;
    }
}

impl Drop for LiveUpdates {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Result of [`NoteStore::search`]. Filtering happens while iterating, and
/// the view can be iterated any number of times.
#[derive(Debug, Clone)]
pub struct NoteSearch {
    notes: Vec<Note>,
    needle: String,
}

impl NoteSearch {
    pub fn iter(&self) -> impl Iterator<Item = &Note> + '_ {
        self.notes
            .iter()
            .filter(move |n| n.matches_lowercase(&self.needle))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// True when the query was non-empty, i.e. results may be filtered.
    pub fn is_filtered(&self) -> bool {
        !self.needle.is_empty()
    }
}

impl<'a> IntoIterator for &'a NoteSearch {
    type Item = &'a Note;
    type IntoIter = Box<dyn Iterator<Item = &'a Note> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn note(id: &str, title: &str, content: &str) -> Note {
        let at = Utc.with_ymd_and_hms(2023, 4, 10, 0, 0, 0).unwrap();
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            summary: String::new(),
            created_at: at,
            updated_at: at + Duration::hours(1),
        }
    }

    fn ids(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn insert_prepends() {
        let mut notes = vec![note("1", "a", "")];
        assert!(fold(&mut notes, NoteEvent::Insert(note("2", "b", ""))));
        assert_eq!(ids(&notes), vec!["2", "1"]);
    }

    #[test]
    fn insert_twice_is_idempotent() {
        let mut once = vec![note("1", "a", "")];
        fold(&mut once, NoteEvent::Insert(note("2", "b", "")));

        let mut twice = once.clone();
        assert!(!fold(&mut twice, NoteEvent::Insert(note("2", "b", ""))));
        assert_eq!(once, twice);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut notes = vec![note("1", "a", ""), note("2", "b", ""), note("3", "c", "")];
        fold(&mut notes, NoteEvent::Update(note("2", "B", "")));
        assert_eq!(ids(&notes), vec!["1", "2", "3"]);
        assert_eq!(notes[1].title, "B");
    }

    #[test]
    fn update_of_unknown_note_is_ignored() {
        let mut notes = vec![note("1", "a", "")];
        assert!(!fold(&mut notes, NoteEvent::Update(note("9", "z", ""))));
        assert_eq!(ids(&notes), vec!["1"]);
    }

    #[test]
    fn updates_apply_in_arrival_order() {
        let mut notes = vec![note("1", "", "")];
        fold(&mut notes, NoteEvent::Update(note("1", "A", "")));
        fold(&mut notes, NoteEvent::Update(note("1", "B", "")));
        assert_eq!(notes[0].title, "B");
    }

    #[test]
    fn delete_of_absent_note_is_a_no_op() {
        let mut notes = vec![note("1", "a", "")];
        assert!(!fold(&mut notes, NoteEvent::Delete("9".to_string())));
        assert_eq!(ids(&notes), vec!["1"]);
    }

    #[test]
    fn replay_skips_updates_older_than_the_snapshot() {
        let mut notes = vec![note("1", "Fresh", "")];
        let mut stale = note("1", "Stale", "");
        stale.updated_at -= Duration::minutes(5);

        assert!(!replay(&mut notes, NoteEvent::Update(stale)));
        assert_eq!(notes[0].title, "Fresh");

        let mut newer = note("1", "Newer", "");
        newer.updated_at += Duration::minutes(5);
        assert!(replay(&mut notes, NoteEvent::Update(newer)));
        assert_eq!(notes[0].title, "Newer");
    }

    #[test]
    fn events_are_queued_while_loading() {
        let mut state = StoreState::new();
        state.load = LoadState::Loading;
        assert!(!state.apply(NoteEvent::Insert(note("1", "a", ""))));
        assert!(state.notes.is_empty());
        assert_eq!(state.pending.len(), 1);
    }

    #[test]
    fn search_matches_title_or_content_ignoring_case() {
        let search = NoteSearch {
            notes: vec![
                note("1", "Meeting Notes", "timeline"),
                note("2", "Groceries", "Buy MEETING snacks"),
                note("3", "Ideas", "dark mode"),
            ],
            needle: "meeting".to_string(),
        };
        let found: Vec<&str> = search.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(found, vec!["1", "2"]);
        // Restartable
        assert_eq!(search.count(), 2);
    }
}
