use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown wherever a note has no generated summary yet.
pub const NO_SUMMARY: &str = "No summary yet";

/// A persisted note in its canonical form.
///
/// `summary` is empty until a summary has been generated; that is a normal
/// state, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn has_summary(&self) -> bool {
        !self.summary.is_empty()
    }

    /// The summary, or [`NO_SUMMARY`] when none has been generated.
    pub fn summary_or_placeholder(&self) -> &str {
        if self.has_summary() {
            &self.summary
        } else {
            NO_SUMMARY
        }
    }

    /// Case-insensitive match of an already lowercased needle against title and content.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
    }
}

/// A note as stored and returned by the remote data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNoteRecord {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ownership tag. Only the remote service acts on it.
    pub user_id: String,
}

/// Payload for inserting a note. The service assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNoteInsert {
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub user_id: String,
}

/// Payload for updating a note. The id travels separately as the lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNotePatch {
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub user_id: String,
    pub updated_at: DateTime<Utc>,
}

/// A write request produced by the mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteNoteInput {
    Insert(RemoteNoteInsert),
    Update { id: String, patch: RemoteNotePatch },
}

/// A note under construction in the form.
///
/// A draft for a new note has no `id` and no timestamps; they are filled in
/// from the service's response after the first successful insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NoteDraft {
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn title_is_blank(&self) -> bool {
        self.title.trim().is_empty()
    }

    pub fn content_is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

impl From<Note> for NoteDraft {
    fn from(note: Note) -> Self {
        Self {
            id: Some(note.id),
            title: note.title,
            content: note.content,
            summary: note.summary,
            created_at: Some(note.created_at),
            updated_at: Some(note.updated_at),
        }
    }
}
