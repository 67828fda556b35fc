//! In-process remote data service over [`NoteService`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{NoteFilter, RemoteDataService, RemoteError, Subscription};
use crate::models::*;
use crate::service::{NoteService, ServiceError};

/// A [`RemoteDataService`] that calls the backend directly, without HTTP.
///
/// The session identity can be changed at any time with [`sign_in`] and
/// [`sign_out`]; operations always read it fresh.
///
/// [`sign_in`]: LocalRemote::sign_in
/// [`sign_out`]: LocalRemote::sign_out
#[derive(Clone)]
pub struct LocalRemote {
    service: NoteService,
    session: Arc<RwLock<Option<CurrentUser>>>,
}

impl LocalRemote {
    pub fn new(service: NoteService) -> Self {
        Self {
            service,
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn signed_in(service: NoteService, user: CurrentUser) -> Self {
        let remote = Self::new(service);
        remote.sign_in(user);
        remote
    }

    pub fn sign_in(&self, user: CurrentUser) {
        *self.session.write() = Some(user);
    }

    pub fn sign_out(&self) {
        *self.session.write() = None;
    }

    pub fn service(&self) -> &NoteService {
        &self.service
    }

    fn session_user(&self) -> Result<CurrentUser, RemoteError> {
        self.session.read().clone().ok_or(RemoteError::Unauthenticated)
    }
}

impl From<ServiceError> for RemoteError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound => RemoteError::NotFound("Note not found".to_string()),
            ServiceError::Validation(msg) => RemoteError::BadRequest(msg),
            other => RemoteError::Failure(other.to_string()),
        }
    }
}

#[async_trait]
impl RemoteDataService for LocalRemote {
    async fn current_user(&self) -> Result<Option<CurrentUser>, RemoteError> {
        Ok(self.session.read().clone())
    }

    async fn query(&self, filter: &NoteFilter) -> Result<Vec<RemoteNoteRecord>, RemoteError> {
        let user = self.session_user()?;
        Ok(self.service.list(&user, filter)?)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<RemoteNoteRecord>, RemoteError> {
        let user = self.session_user()?;
        match self.service.get(&user, id) {
            Ok(record) => Ok(Some(record)),
            Err(ServiceError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, record: RemoteNoteInsert) -> Result<RemoteNoteRecord, RemoteError> {
        let user = self.session_user()?;
        Ok(self.service.create(&user, record)?)
    }

    async fn update(&self, id: &str, patch: RemoteNotePatch) -> Result<(), RemoteError> {
        let user = self.session_user()?;
        self.service.update(&user, id, patch)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let user = self.session_user()?;
        Ok(self.service.delete(&user, id)?)
    }

    async fn subscribe(&self) -> Result<Subscription, RemoteError> {
        let user = self.session_user()?;
        Ok(self.service.subscribe(&user))
    }

    async fn summarize(&self, text: &str) -> Result<String, RemoteError> {
        self.session_user()?;
        Ok(self.service.summarize(text).await?)
    }
}
