//! Domain models for notewell.
//!
//! # Two shapes of a note
//!
//! - [`Note`]: the canonical in-memory shape used by the store and the form.
//!   Serialized camelCase, no nullable text fields.
//! - [`RemoteNoteRecord`]: the wire shape spoken by the remote data service.
//!   Serialized snake_case, nullable `content`/`summary`, carries the owning
//!   `user_id`.
//!
//! [`crate::mapper`] is the only place that converts between the two.
//!
//! # Push events
//!
//! - [`NoteChange`]: a change notification as the remote service emits it.
//! - [`NoteEvent`]: the same notification after mapping, folded into the store.

mod event;
mod note;
mod user;

pub use event::*;
pub use note::*;
pub use user::*;
