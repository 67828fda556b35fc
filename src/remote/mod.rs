//! The remote data service boundary.
//!
//! The store and the form only ever talk to a [`RemoteDataService`]. Two
//! implementations ship with the crate:
//!
//! - [`LocalRemote`]: in-process, backed by the SQLite [`Database`](crate::db::Database).
//! - [`HttpRemote`]: talks to a `notewell serve` instance over HTTP.

pub mod http;
pub mod local;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::*;

pub use http::HttpRemote;
pub use local::LocalRemote;

/// Name of the only collection this crate reads and writes.
pub const NOTES_COLLECTION: &str = "notes";

/// Remote data service errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service error: {0}")]
    Failure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewestFirst => "created_at.desc",
            Self::OldestFirst => "created_at.asc",
        }
    }

}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at.desc" => Ok(Self::NewestFirst),
            "created_at.asc" => Ok(Self::OldestFirst),
            _ => Err(format!("Unknown order: {}", s)),
        }
    }
}

/// Which notes a query returns, and in what order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFilter {
    pub user_id: String,
    pub order: SortOrder,
}

impl NoteFilter {
    /// All notes of one user, newest first.
    pub fn owned_by(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            order: SortOrder::NewestFirst,
        }
    }
}

/// A live push-event subscription.
///
/// Dropping the handle releases the subscription, on every exit path.
pub struct Subscription {
    rx: mpsc::Receiver<NoteChange>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(rx: mpsc::Receiver<NoteChange>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            rx,
            release: Some(Box::new(release)),
        }
    }

    /// Next change, in the order the service emitted it. `None` once the
    /// feed has ended.
    pub async fn next(&mut self) -> Option<NoteChange> {
        self.rx.recv().await
    }

    pub fn unsubscribe(self) {
        drop(self)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!("Released note subscription");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// CRUD over the `notes` collection, identity lookup, push events and
/// summarization.
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    /// The identity of the current session, if any.
    async fn current_user(&self) -> Result<Option<CurrentUser>, RemoteError>;

    async fn query(&self, filter: &NoteFilter) -> Result<Vec<RemoteNoteRecord>, RemoteError>;

    /// `Ok(None)` when the note does not exist for this session.
    async fn get_by_id(&self, id: &str) -> Result<Option<RemoteNoteRecord>, RemoteError>;

    async fn insert(&self, record: RemoteNoteInsert) -> Result<RemoteNoteRecord, RemoteError>;

    async fn update(&self, id: &str, patch: RemoteNotePatch) -> Result<(), RemoteError>;

    async fn delete(&self, id: &str) -> Result<(), RemoteError>;

    /// Subscribe to changes of the current user's notes.
    async fn subscribe(&self) -> Result<Subscription, RemoteError>;

    async fn summarize(&self, text: &str) -> Result<String, RemoteError>;
}
