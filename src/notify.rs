use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    /// `None` when the notification never auto-expires.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct BusState {
    entries: Vec<Notification>,
    timers: HashMap<u64, JoinHandle<()>>,
}

/// Short-lived user-facing messages. Ids are seeded from the construction
/// time in epoch milliseconds and incremented per message, so they are
/// monotonic and never reused within a session. Auto-expiry timers run on
/// the tokio runtime; a manual `remove` aborts the timer so an already-gone
/// id is never removed twice.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<Mutex<BusState>>,
    next_id: Arc<AtomicU64>,
    default_duration_ms: u64,
}

impl NotificationBus {
    pub fn new(default_duration_ms: u64) -> Self {
        NotificationBus {
            inner: Arc::new(Mutex::new(BusState::default())),
            next_id: Arc::new(AtomicU64::new(Utc::now().timestamp_millis() as u64)),
            default_duration_ms,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post a message. `duration_ms = 0` disables auto-expiry.
    pub fn add(&self, message: impl Into<String>, kind: NotificationKind, duration_ms: u64) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created_at = Utc::now();
        let expires_at = (duration_ms > 0)
            .then(|| created_at + Duration::milliseconds(duration_ms as i64));

        let notification = Notification {
            id,
            message: message.into(),
            kind,
            created_at,
            expires_at,
        };

        let mut state = self.lock();
        state.entries.push(notification);

        if duration_ms > 0 {
            let inner = Arc::clone(&self.inner);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(duration_ms)).await;
                let mut state = inner.lock().unwrap_or_else(PoisonError::into_inner);
                state.entries.retain(|n| n.id != id);
                state.timers.remove(&id);
            });
            state.timers.insert(id, handle);
        }

        id
    }

    /// Dismiss a notification. Returns false when the id is already gone.
    pub fn remove(&self, id: u64) -> bool {
        let mut state = self.lock();
        if let Some(handle) = state.timers.remove(&id) {
            handle.abort();
        }
        let before = state.entries.len();
        state.entries.retain(|n| n.id != id);
        state.entries.len() != before
    }

    pub fn list(&self) -> Vec<Notification> {
        self.lock().entries.clone()
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.add(message, NotificationKind::Success, self.default_duration_ms)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.add(message, NotificationKind::Error, self.default_duration_ms)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.add(message, NotificationKind::Warning, self.default_duration_ms)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.add(message, NotificationKind::Info, self.default_duration_ms)
    }
}
