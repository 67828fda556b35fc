//! A scripted remote data service for driving the store and the form.
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use notewell::models::*;
use notewell::remote::{NoteFilter, RemoteDataService, RemoteError, Subscription};
use notewell::ui::{Notification, Route, UiEvent};

pub const USER_ID: &str = "user-1";

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 4, 10, 9, minute, 0).unwrap()
}

pub fn record(id: &str, title: &str, content: Option<&str>, minute: u32) -> RemoteNoteRecord {
    RemoteNoteRecord {
        id: id.to_string(),
        title: title.to_string(),
        content: content.map(str::to_string),
        summary: None,
        created_at: at(minute),
        updated_at: at(minute),
        user_id: USER_ID.to_string(),
    }
}

#[derive(Default)]
pub struct FakeRemote {
    user: Mutex<Option<CurrentUser>>,
    notes: Mutex<Vec<RemoteNoteRecord>>,
    failing: Mutex<HashSet<&'static str>>,
    summary: Mutex<String>,
    calls: Mutex<Vec<&'static str>>,
    inserts: Mutex<Vec<RemoteNoteInsert>>,
    updates: Mutex<Vec<(String, RemoteNotePatch)>>,
    /// One gate per upcoming call of an operation; the call waits on it.
    gates: Mutex<Vec<(&'static str, VecDeque<Arc<Notify>>)>>,
    subscribers: Mutex<Vec<mpsc::Sender<NoteChange>>>,
    released: Arc<AtomicBool>,
}

impl FakeRemote {
    pub fn signed_in() -> Arc<Self> {
        let fake = Self::default();
        *fake.user.lock() = Some(CurrentUser {
            id: USER_ID.to_string(),
        });
        *fake.summary.lock() = "A generated summary".to_string();
        Arc::new(fake)
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sign_out(&self) {
        *self.user.lock() = None;
    }

    pub fn with_notes(self: Arc<Self>, notes: Vec<RemoteNoteRecord>) -> Arc<Self> {
        *self.notes.lock() = notes;
        self
    }

    pub fn set_notes(&self, notes: Vec<RemoteNoteRecord>) {
        *self.notes.lock() = notes;
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().insert(op);
    }

    pub fn set_summary(&self, summary: &str) {
        *self.summary.lock() = summary.to_string();
    }

    /// Hold the next call of `op` until the returned gate is opened.
    pub fn gate(&self, op: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let mut gates = self.gates.lock();
        match gates.iter_mut().find(|(name, _)| *name == op) {
            Some((_, queue)) => queue.push_back(gate.clone()),
            None => gates.push((op, VecDeque::from([gate.clone()]))),
        }
        gate
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    pub fn inserts(&self) -> Vec<RemoteNoteInsert> {
        self.inserts.lock().clone()
    }

    pub fn updates(&self) -> Vec<(String, RemoteNotePatch)> {
        self.updates.lock().clone()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Deliver a change to every open subscription.
    pub async fn push(&self, change: NoteChange) {
        let subscribers = self.subscribers.lock().clone();
        for tx in subscribers {
            let _ = tx.send(change.clone()).await;
        }
    }

    async fn enter(&self, op: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().push(op);
        let gate = self
            .gates
            .lock()
            .iter_mut()
            .find(|(name, _)| *name == op)
            .and_then(|(_, queue)| queue.pop_front());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().contains(op) {
            return Err(RemoteError::Failure(format!("{} failed", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteDataService for FakeRemote {
    async fn current_user(&self) -> Result<Option<CurrentUser>, RemoteError> {
        self.enter("current_user").await?;
        Ok(self.user.lock().clone())
    }

    async fn query(&self, _filter: &NoteFilter) -> Result<Vec<RemoteNoteRecord>, RemoteError> {
        // Snapshot before any gate, like a response already in flight.
        let snapshot = self.notes.lock().clone();
        self.enter("query").await?;
        Ok(snapshot)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<RemoteNoteRecord>, RemoteError> {
        self.enter("get_by_id").await?;
        Ok(self.notes.lock().iter().find(|n| n.id == id).cloned())
    }

    async fn insert(&self, record: RemoteNoteInsert) -> Result<RemoteNoteRecord, RemoteError> {
        self.enter("insert").await?;
        self.inserts.lock().push(record.clone());
        let created = RemoteNoteRecord {
            id: format!("new-{}", self.inserts.lock().len()),
            title: record.title,
            content: record.content,
            summary: record.summary,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user_id: record.user_id,
        };
        self.notes.lock().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: RemoteNotePatch) -> Result<(), RemoteError> {
        self.enter("update").await?;
        self.updates.lock().push((id.to_string(), patch));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.enter("delete").await?;
        self.notes.lock().retain(|n| n.id != id);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription, RemoteError> {
        self.enter("subscribe").await?;
        let (tx, rx) = mpsc::channel(16);
        self.subscribers.lock().push(tx);
        let released = self.released.clone();
        Ok(Subscription::new(rx, move || {
            released.store(true, Ordering::SeqCst)
        }))
    }

    async fn summarize(&self, _text: &str) -> Result<String, RemoteError> {
        self.enter("summarize").await?;
        Ok(self.summary.lock().clone())
    }
}

pub fn notifications(events: &[UiEvent]) -> Vec<Notification> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Notify(n) => Some(n.clone()),
            _ => None,
        })
        .collect()
}

pub fn titles(events: &[UiEvent]) -> Vec<String> {
    notifications(events).into_iter().map(|n| n.title).collect()
}

pub fn routes(events: &[UiEvent]) -> Vec<Route> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Navigate(r) => Some(r.clone()),
            _ => None,
        })
        .collect()
}

/// Poll `condition` until it holds, failing the test after a second.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached in time");
}

