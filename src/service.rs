//! Ownership-aware note operations shared by the HTTP API and [`LocalRemote`].
//!
//! Every mutation that succeeds is published on the [`EventBus`].
//!
//! [`LocalRemote`]: crate::remote::LocalRemote

use std::sync::Arc;

use thiserror::Error;

use crate::bus::EventBus;
use crate::db::Database;
use crate::models::*;
use crate::remote::{NoteFilter, Subscription};
use crate::summarize::{SummarizeError, Summarizer};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Note not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Clone)]
pub struct NoteService {
    db: Database,
    bus: EventBus,
    summarizer: Arc<dyn Summarizer>,
}

impl NoteService {
    pub fn new(db: Database, bus: EventBus, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            db,
            bus,
            summarizer,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Resolve a bearer token to the user it belongs to.
    pub fn authenticate(&self, token: &str) -> Result<Option<CurrentUser>> {
        Ok(self.db.get_user_by_token(token)?.map(|u| u.identity()))
    }

    /// Notes of `user`. The filter's owner is ignored in favour of `user`.
    pub fn list(&self, user: &CurrentUser, filter: &NoteFilter) -> Result<Vec<RemoteNoteRecord>> {
        if filter.user_id != user.id {
            tracing::warn!(
                requested = %filter.user_id,
                user = %user.id,
                "Query for another user's notes narrowed to the caller"
            );
        }
        Ok(self.db.get_notes_by_user(&user.id, filter.order)?)
    }

    /// A note owned by `user`; another user's note reads as not found.
    pub fn get(&self, user: &CurrentUser, id: &str) -> Result<RemoteNoteRecord> {
        self.db
            .get_note(id)?
            .filter(|n| n.user_id == user.id)
            .ok_or(ServiceError::NotFound)
    }

    pub fn create(&self, user: &CurrentUser, mut input: RemoteNoteInsert) -> Result<RemoteNoteRecord> {
        validate_title(&input.title)?;
        input.user_id = user.id.clone();

        let record = self.db.create_note(input)?;
        tracing::info!(note_id = %record.id, user = %user.id, "Note created");
        self.bus.publish(
            &user.id,
            NoteChange::Insert {
                record: record.clone(),
            },
        );
        Ok(record)
    }

    pub fn update(
        &self,
        user: &CurrentUser,
        id: &str,
        mut patch: RemoteNotePatch,
    ) -> Result<RemoteNoteRecord> {
        validate_title(&patch.title)?;
        self.get(user, id)?;
        patch.user_id = user.id.clone();

        let record = self
            .db
            .update_note(id, patch)?
            .ok_or(ServiceError::NotFound)?;
        tracing::info!(note_id = %id, user = %user.id, "Note updated");
        self.bus.publish(
            &user.id,
            NoteChange::Update {
                record: record.clone(),
            },
        );
        Ok(record)
    }

    pub fn delete(&self, user: &CurrentUser, id: &str) -> Result<()> {
        self.get(user, id)?;
        if !self.db.delete_note(id)? {
            return Err(ServiceError::NotFound);
        }
        tracing::info!(note_id = %id, user = %user.id, "Note deleted");
        self.bus
            .publish(&user.id, NoteChange::Delete { id: id.to_string() });
        Ok(())
    }

    pub fn subscribe(&self, user: &CurrentUser) -> Subscription {
        self.bus.subscribe_user(&user.id)
    }

    pub async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Text to summarize must not be empty".to_string(),
            ));
        }
        Ok(self.summarizer.summarize(text).await?)
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Note title must not be empty".to_string(),
        ));
    }
    Ok(())
}
