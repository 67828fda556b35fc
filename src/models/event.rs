use serde::{Deserialize, Serialize};

use super::{Note, RemoteNoteRecord};

/// A change notification for the `notes` collection, as emitted by the
/// remote data service.
///
/// Delete notifications only carry the id of the removed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteChange {
    Insert { record: RemoteNoteRecord },
    Update { record: RemoteNoteRecord },
    Delete { id: String },
}

impl NoteChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert { .. } => ChangeKind::Insert,
            Self::Update { .. } => ChangeKind::Update,
            Self::Delete { .. } => ChangeKind::Delete,
        }
    }

    pub fn note_id(&self) -> &str {
        match self {
            Self::Insert { record } | Self::Update { record } => &record.id,
            Self::Delete { id } => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A push event in canonical form, ready to be folded into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEvent {
    Insert(Note),
    Update(Note),
    Delete(String),
}

impl NoteEvent {
    pub fn note_id(&self) -> &str {
        match self {
            Self::Insert(note) | Self::Update(note) => &note.id,
            Self::Delete(id) => id,
        }
    }
}
