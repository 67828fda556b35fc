//! Lifecycle of creating or editing a single note.
//!
//! ```text
//! CheckingAuth ──no identity──────────────────────────▶ Redirected(Unauthenticated)
//!      │
//!      ├─new──▶ NewDraft ──▶ Ready
//!      └─edit─▶ LoadingExisting ──found──▶ Ready
//!                      └──missing/error──▶ Redirected(NotFound | LoadFailed)
//!
//! Ready ──generate_summary──▶ SummaryPending ──▶ Ready
//! Ready ──save──▶ Saving ──ok──▶ Saved
//!                    └──error──▶ Ready
//! ```
//!
//! A [`NoteForm`] is a cheap handle; clones share one form instance so a
//! summary request can run while the fields are still being edited. Once
//! [`NoteForm::unmount`] is called, late responses are dropped instead of
//! being written into the detached form.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::error::AppError;
use crate::mapper;
use crate::models::*;
use crate::remote::RemoteDataService;
use crate::ui::{Route, Ui};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    New,
    Edit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    Unauthenticated,
    NotFound,
    LoadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    CheckingAuth,
    NewDraft,
    LoadingExisting,
    Ready,
    SummaryPending,
    Saving,
    Saved,
    Redirected(RedirectReason),
}

impl FormState {
    /// Whether the user may still change title and content.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Ready | Self::SummaryPending)
    }
}

#[derive(Debug)]
struct FormInner {
    state: FormState,
    draft: NoteDraft,
    mounted: bool,
}

#[derive(Clone)]
pub struct NoteForm {
    mode: FormMode,
    remote: Arc<dyn RemoteDataService>,
    ui: Ui,
    inner: Arc<Mutex<FormInner>>,
}

impl NoteForm {
    pub fn new(remote: Arc<dyn RemoteDataService>, ui: Ui, mode: FormMode) -> Self {
        Self {
            mode,
            remote,
            ui,
            inner: Arc::new(Mutex::new(FormInner {
                state: FormState::CheckingAuth,
                draft: NoteDraft::default(),
                mounted: true,
            })),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_new(&self) -> bool {
        self.mode == FormMode::New
    }

    pub fn state(&self) -> FormState {
        self.inner.lock().state
    }

    pub fn draft(&self) -> NoteDraft {
        self.inner.lock().draft.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lock().mounted
    }

    /// Detach the form. Responses that arrive afterwards are discarded.
    pub fn unmount(&self) {
        self.inner.lock().mounted = false;
        tracing::debug!("Note form unmounted");
    }

    /// Resolve the session identity, then prepare the draft.
    ///
    /// The identity check always comes first; without one, nothing is fetched.
    pub async fn mount(&self) -> FormState {
        let identity = self.remote.current_user().await;
        if !self.is_mounted() {
            return self.state();
        }

        match identity {
            Ok(Some(user)) => {
                tracing::debug!(user = %user.id, "Identity resolved");
            }
            Ok(None) => {
                tracing::info!("No signed-in user, redirecting to sign in");
                return self.redirect(RedirectReason::Unauthenticated, Route::SignIn);
            }
            Err(e) => {
                tracing::warn!("Identity check failed: {}", e);
                self.ui.error("Authentication check failed", &e.to_string());
                return self.redirect(RedirectReason::Unauthenticated, Route::SignIn);
            }
        }

        let id = match &self.mode {
            FormMode::New => {
                self.set_state(FormState::NewDraft);
                self.set_state(FormState::Ready);
                return FormState::Ready;
            }
            FormMode::Edit(id) => id.clone(),
        };

        self.set_state(FormState::LoadingExisting);
        let fetched = self.remote.get_by_id(&id).await;

        let mut inner = self.inner.lock();
        if !inner.mounted {
            tracing::debug!(note_id = %id, "Discarding note fetched after unmount");
            return inner.state;
        }
        match fetched {
            Ok(Some(record)) => {
                inner.draft = NoteDraft::from(mapper::to_canonical(record));
                inner.state = FormState::Ready;
                tracing::debug!(note_id = %id, "Loaded note for editing");
                FormState::Ready
            }
            Ok(None) => {
                drop(inner);
                tracing::info!(note_id = %id, "Note to edit not found");
                self.ui
                    .error("Note not found", "The requested note could not be found.");
                self.redirect(RedirectReason::NotFound, Route::Collection)
            }
            Err(e) => {
                drop(inner);
                tracing::warn!(note_id = %id, "Failed to load note: {}", e);
                self.ui
                    .error("Error loading note", "There was a problem loading the note.");
                self.redirect(RedirectReason::LoadFailed, Route::Collection)
            }
        }
    }

    pub fn set_title(&self, title: impl Into<String>) -> bool {
        self.edit(|draft| draft.title = title.into())
    }

    pub fn set_content(&self, content: impl Into<String>) -> bool {
        self.edit(|draft| draft.content = content.into())
    }

    fn edit(&self, apply: impl FnOnce(&mut NoteDraft)) -> bool {
        let mut inner = self.inner.lock();
        if !inner.state.is_editable() {
            tracing::debug!(state = ?inner.state, "Ignoring edit outside an editable state");
            return false;
        }
        apply(&mut inner.draft);
        true
    }

    /// Mirrors the enabled state of the "generate summary" trigger.
    pub fn can_generate_summary(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == FormState::Ready && !inner.draft.content_is_blank()
    }

    /// Mirrors the enabled state of the "save" trigger.
    pub fn can_save(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == FormState::Ready
            && !inner.draft.title_is_blank()
            && !inner.draft.content_is_blank()
    }

    /// Replace the summary with one generated from the current content.
    ///
    /// Blank content is refused locally. At most one request is in flight;
    /// a second call while one is pending is rejected.
    pub async fn generate_summary(&self) -> Result<(), AppError> {
        let content = {
            let mut inner = self.inner.lock();
            match inner.state {
                FormState::Ready => {}
                FormState::SummaryPending => {
                    tracing::debug!("Summary already pending, rejecting");
                    return Err(AppError::Validation(
                        "A summary is already being generated".to_string(),
                    ));
                }
                other => {
                    return Err(AppError::Validation(format!(
                        "Cannot generate a summary while {:?}",
                        other
                    )));
                }
            }
            if inner.draft.content_is_blank() {
                drop(inner);
                tracing::warn!("Refusing to summarize blank content");
                self.ui.error(
                    "Can't generate summary",
                    "Please add some content to your note first.",
                );
                return Err(AppError::Validation("Content is empty".to_string()));
            }
            inner.state = FormState::SummaryPending;
            inner.draft.content.clone()
        };

        let result = self.remote.summarize(&content).await;

        let mut inner = self.inner.lock();
        if !inner.mounted {
            tracing::debug!("Discarding summary received after unmount");
            return Ok(());
        }
        inner.state = FormState::Ready;
        match result {
            Ok(summary) => {
                inner.draft.summary = summary;
                drop(inner);
                tracing::info!("Summary generated");
                self.ui.success(
                    "Summary generated",
                    "AI summary has been created for your note.",
                );
                Ok(())
            }
            Err(e) => {
                drop(inner);
                tracing::warn!("Summary generation failed: {}", e);
                self.ui.error(
                    "Summary generation failed",
                    "There was an error generating the summary. Please try again.",
                );
                Err(AppError::from(e))
            }
        }
    }

    /// Persist the draft: insert when new, update keyed by id otherwise.
    ///
    /// The identity is resolved again here rather than reused from `mount`.
    /// On failure every field keeps its value so the user can retry.
    pub async fn save(&self) -> Result<(), AppError> {
        let draft = {
            let mut inner = self.inner.lock();
            if inner.state != FormState::Ready {
                return Err(AppError::Validation(format!(
                    "Cannot save while {:?}",
                    inner.state
                )));
            }
            if inner.draft.title_is_blank() || inner.draft.content_is_blank() {
                drop(inner);
                tracing::warn!("Refusing to save a note with blank fields");
                self.ui.error(
                    "Missing fields",
                    "Please provide both a title and content for your note.",
                );
                return Err(AppError::Validation(
                    "Title and content are required".to_string(),
                ));
            }
            inner.state = FormState::Saving;
            inner.draft.clone()
        };

        let now = next_updated_at(draft.updated_at);
        let result = self.persist(&draft, now).await;

        let mut inner = self.inner.lock();
        if !inner.mounted {
            tracing::debug!("Discarding save result received after unmount");
            return result.map(|_| ());
        }

        match result {
            Ok(saved) => {
                inner.state = FormState::Saved;
                match saved {
                    Some(note) => inner.draft = NoteDraft::from(note),
                    None => inner.draft.updated_at = Some(now),
                }
                drop(inner);

                if draft.is_new() {
                    tracing::info!("Note created");
                    self.ui
                        .success("Note created", "Your new note has been created successfully.");
                } else {
                    tracing::info!("Note updated");
                    self.ui
                        .success("Note updated", "Your note has been updated successfully.");
                }
                self.ui.navigate(Route::Collection);
                Ok(())
            }
            Err(e) => {
                inner.state = FormState::Ready;
                drop(inner);
                tracing::warn!("Failed to save note: {}", e);
                let description = match e {
                    AppError::Unauthenticated => "You need to sign in again before saving.",
                    _ => "There was a problem saving your note. Please try again.",
                };
                self.ui.error("Error saving note", description);
                Err(e)
            }
        }
    }

    /// Returns the inserted note for inserts, `None` for updates.
    async fn persist(&self, draft: &NoteDraft, now: DateTime<Utc>) -> Result<Option<Note>, AppError> {
        let owner = self
            .remote
            .current_user()
            .await?
            .ok_or(AppError::Unauthenticated)?;

        match mapper::to_remote(draft, &owner, now) {
            RemoteNoteInput::Insert(record) => {
                let created = self.remote.insert(record).await?;
                Ok(Some(mapper::to_canonical(created)))
            }
            RemoteNoteInput::Update { id, patch } => {
                self.remote.update(&id, patch).await?;
                Ok(None)
            }
        }
    }

    fn set_state(&self, state: FormState) {
        let mut inner = self.inner.lock();
        tracing::debug!(from = ?inner.state, to = ?state, "Form transition");
        inner.state = state;
    }

    fn redirect(&self, reason: RedirectReason, route: Route) -> FormState {
        let state = FormState::Redirected(reason);
        self.set_state(state);
        self.ui.navigate(route);
        state
    }
}

/// A fresh `updatedAt` that is strictly later than the previous one, even if
/// the clock has not visibly advanced.
fn next_updated_at(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now - prev < Duration::milliseconds(1) => prev + Duration::milliseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_updated_at_moves_forward_from_a_future_timestamp() {
        let future = Utc::now() + Duration::hours(1);
        assert!(next_updated_at(Some(future)) > future);
    }

    #[test]
    fn next_updated_at_uses_the_clock_normally() {
        let past = Utc::now() - Duration::days(1);
        let next = next_updated_at(Some(past));
        assert!(next > past + Duration::hours(23));
    }

    #[test]
    fn only_ready_and_pending_are_editable() {
        assert!(FormState::Ready.is_editable());
        assert!(FormState::SummaryPending.is_editable());
        assert!(!FormState::Saving.is_editable());
        assert!(!FormState::CheckingAuth.is_editable());
        assert!(!FormState::Redirected(RedirectReason::NotFound).is_editable());
    }
}
