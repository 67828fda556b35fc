//! In-process fan-out of note changes to every subscriber.

use tokio::sync::{broadcast, mpsc};

use crate::models::NoteChange;
use crate::remote::Subscription;

const DEFAULT_CAPACITY: usize = 256;

/// A change together with the user that owns the affected note.
#[derive(Debug, Clone)]
pub struct OwnedChange {
    pub user_id: String,
    pub change: NoteChange,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OwnedChange>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, user_id: &str, change: NoteChange) {
        tracing::debug!(
            user_id,
            kind = change.kind().as_str(),
            note_id = change.note_id(),
            "Publishing note change"
        );
        // No receivers is fine: nobody is watching right now.
        let _ = self.tx.send(OwnedChange {
            user_id: user_id.to_string(),
            change,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OwnedChange> {
        self.tx.subscribe()
    }

    /// A [`Subscription`] that yields only `user_id`'s changes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_user(&self, user_id: &str) -> Subscription {
        let mut rx = self.subscribe();
        let (tx, out) = mpsc::channel(64);
        let user_id = user_id.to_string();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(owned) if owned.user_id == user_id => {
                        if tx.send(owned.change).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(missed = n, "Note subscription lagged, missed changes");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(out, move || task.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteChange;

    #[tokio::test]
    async fn user_subscription_filters_other_users() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe_user("u1");

        bus.publish(
            "u2",
            NoteChange::Delete {
                id: "theirs".to_string(),
            },
        );
        bus.publish(
            "u1",
            NoteChange::Delete {
                id: "mine".to_string(),
            },
        );

        let change = sub.next().await.expect("subscription ended");
        assert_eq!(change.note_id(), "mine");
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.publish(
            "u1",
            NoteChange::Delete {
                id: "n1".to_string(),
            },
        );
    }
}
