//! Conversions between the remote wire shape and the canonical note.
//!
//! Everything here is pure. The caller supplies the owner (resolved from the
//! current session) and the timestamp to stamp on updates.

use chrono::{DateTime, Utc};

use crate::models::*;

/// Convert a wire record into a canonical note.
///
/// Null `content`/`summary` become empty strings; `id` and timestamps pass through.
pub fn to_canonical(record: RemoteNoteRecord) -> Note {
    Note {
        id: record.id,
        title: record.title,
        content: record.content.unwrap_or_default(),
        summary: record.summary.unwrap_or_default(),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

/// Convert a push notification into a canonical event.
pub fn to_event(change: NoteChange) -> NoteEvent {
    match change {
        NoteChange::Insert { record } => NoteEvent::Insert(to_canonical(record)),
        NoteChange::Update { record } => NoteEvent::Update(to_canonical(record)),
        NoteChange::Delete { id } => NoteEvent::Delete(id),
    }
}

/// Build the write request for a draft.
///
/// A draft without an id becomes an insert that carries neither id nor
/// timestamps. A draft with an id becomes an update keyed by that id and
/// stamped with `now`.
pub fn to_remote(draft: &NoteDraft, owner: &CurrentUser, now: DateTime<Utc>) -> RemoteNoteInput {
    let summary = non_empty(&draft.summary);
    let content = Some(draft.content.clone());

    match &draft.id {
        None => RemoteNoteInput::Insert(RemoteNoteInsert {
            title: draft.title.clone(),
            content,
            summary,
            user_id: owner.id.clone(),
        }),
        Some(id) => RemoteNoteInput::Update {
            id: id.clone(),
            patch: RemoteNotePatch {
                title: draft.title.clone(),
                content,
                summary,
                user_id: owner.id.clone(),
                updated_at: now,
            },
        },
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
