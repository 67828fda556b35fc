//! Notifications and navigation requests headed for whatever renders the app.
//!
//! The store and the form never render anything themselves. They push
//! [`UiEvent`]s into a channel; the CLI prints them, tests inspect them.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    /// Failures and blocked actions ("destructive" toasts).
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub tone: Tone,
    pub title: String,
    pub description: String,
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.tone {
            Tone::Success => "ok",
            Tone::Error => "error",
        };
        write!(f, "[{}] {}: {}", tag, self.title, self.description)
    }
}

/// Screens the app can be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SignIn,
    Collection,
    NewNote,
    ViewNote(String),
    EditNote(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::SignIn => "/login".to_string(),
            Self::Collection => "/dashboard".to_string(),
            Self::NewNote => "/notes/new".to_string(),
            Self::ViewNote(id) => format!("/notes/{}", id),
            Self::EditNote(id) => format!("/notes/{}/edit", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Notify(Notification),
    Navigate(Route),
}

/// Sending half of the UI channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Ui {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl Ui {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn success(&self, title: &str, description: &str) {
        self.notify(Tone::Success, title, description);
    }

    pub fn error(&self, title: &str, description: &str) {
        self.notify(Tone::Error, title, description);
    }

    pub fn navigate(&self, route: Route) {
        tracing::debug!(path = %route.path(), "Navigating");
        self.send(UiEvent::Navigate(route));
    }

    fn notify(&self, tone: Tone, title: &str, description: &str) {
        self.send(UiEvent::Notify(Notification {
            tone,
            title: title.to_string(),
            description: description.to_string(),
        }));
    }

    fn send(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("UI receiver gone, dropping event");
        }
    }
}

/// Drain everything currently queued on a UI receiver.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
