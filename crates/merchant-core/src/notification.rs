use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default time a notification stays visible.
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(3_000);

/// Broadcast stream type used by notification renderers.
pub type NotificationStream = broadcast::Receiver<NotificationEvent>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    /// Accent colour for renderers.
    pub fn color(self) -> &'static str {
        match self {
            Self::Success => "#10b981",
            Self::Error => "#ef4444",
            Self::Warning => "#f59e0b",
            Self::Info => "#3b82f6",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub title: Option<String>,
    pub message: String,
    pub kind: NotificationKind,
    /// `None` until a center resolves it to its default.
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: None,
            message: message.into(),
            kind,
            duration: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationEvent {
    Shown(Notification),
    Dismissed { id: Uuid },
}

/// Anything that can display a notification.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str, title: Option<&str>) {
        self.notify(titled(NotificationKind::Success, message, title));
    }

    fn error(&self, message: &str, title: Option<&str>) {
        self.notify(titled(NotificationKind::Error, message, title));
    }

    fn warning(&self, message: &str, title: Option<&str>) {
        self.notify(titled(NotificationKind::Warning, message, title));
    }

    fn info(&self, message: &str, title: Option<&str>) {
        self.notify(titled(NotificationKind::Info, message, title));
    }
}

fn titled(kind: NotificationKind, message: &str, title: Option<&str>) -> Notification {
    let notification = Notification::new(kind, message);
    match title {
        Some(title) => notification.with_title(title),
        None => notification,
    }
}

/// Notification surface: fans notifications out to subscribers and
/// dismisses each one after its duration.
#[derive(Clone, Debug)]
pub struct NotificationCenter {
    event_tx: broadcast::Sender<NotificationEvent>,
    default_duration: Duration,
}

impl NotificationCenter {
    pub fn new(buffer: usize, default_duration: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(buffer.max(1));
        Self {
            event_tx,
            default_duration,
        }
    }

    pub fn subscribe(&self) -> NotificationStream {
        self.event_tx.subscribe()
    }

    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    /// Emit an event to all subscribers.
    ///
    /// Emission is best-effort; lagged subscribers are handled by `broadcast`.
    fn emit(&self, event: NotificationEvent) {
        let _ = self.event_tx.send(event);
    }

    fn schedule_dismiss(&self, id: Uuid, after: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(%id, "no runtime; notification will not auto-dismiss");
            return;
        };
        let event_tx = self.event_tx.clone();
        runtime.spawn(async move {
            tokio::time::sleep(after).await;
            let _ = event_tx.send(NotificationEvent::Dismissed { id });
        });
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(64, DEFAULT_NOTIFICATION_DURATION)
    }
}

impl NotificationSink for NotificationCenter {
    fn notify(&self, mut notification: Notification) {
        let duration = *notification.duration.get_or_insert(self.default_duration);
        let id = notification.id;
        self.emit(NotificationEvent::Shown(notification));
        self.schedule_dismiss(id, duration);
    }
}
