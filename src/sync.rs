use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiError, StudentApi};
use crate::models::{StudentFilters, Summary};
use crate::notify::NotificationBus;
use crate::routes::RouteGate;
use crate::session::SessionGuard;
use crate::store::{Action, RecordStore};

/// Decides when the record cache may be (re)loaded: requires a live session
/// and an allow-listed screen, coalesces rapid manual refreshes, and tears
/// the cache down on sign-out.
pub struct SyncController {
    api: Arc<dyn StudentApi>,
    session: Arc<SessionGuard>,
    routes: Arc<RouteGate>,
    store: Arc<RecordStore>,
    notifications: NotificationBus,
    debounce: Duration,
    pending_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl SyncController {
    pub fn new(
        api: Arc<dyn StudentApi>,
        session: Arc<SessionGuard>,
        routes: Arc<RouteGate>,
        store: Arc<RecordStore>,
        notifications: NotificationBus,
        debounce: Duration,
    ) -> Arc<Self> {
        Arc::new(SyncController {
            api,
            session,
            routes,
            store,
            notifications,
            debounce,
            pending_refresh: Mutex::new(None),
        })
    }

    /// Token for a sync call, or `None` when fetching is not permitted right
    /// now (signed out, or not on a sync screen).
    fn sync_token(&self) -> Option<String> {
        if !self.routes.is_sync_allowed() {
            debug!(path = %self.routes.current_path(), "sync suppressed off-screen");
            return None;
        }
        self.session.token()
    }

    pub async fn fetch_students(&self, filters: &StudentFilters) {
        let Some(token) = self.sync_token() else {
            return;
        };

        match self.api.fetch_students(&token, filters).await {
            Ok(students) => {
                // A response that lands after sign-out must not resurrect data.
                if !self.session.is_authenticated() {
                    debug!("discarding student payload from a dead session");
                    return;
                }
                debug!(count = students.len(), "student list replaced");
                self.store.dispatch(Action::SetStudents(students));
            }
            Err(ApiError::Unauthorized) => {
                warn!("student fetch rejected, flagging re-authentication");
                self.store.dispatch(Action::MarkUnauthorized);
            }
            Err(err) => {
                warn!(%err, "student fetch failed");
                self.notifications
                    .error(format!("Could not load students: {err}"));
            }
        }
    }

    pub async fn fetch_summary(&self) {
        let Some(token) = self.sync_token() else {
            return;
        };

        match self.api.fetch_summary(&token).await {
            Ok(summary) => {
                if !self.session.is_authenticated() {
                    debug!("discarding summary payload from a dead session");
                    return;
                }
                self.store.dispatch(Action::SetSummary(summary));
            }
            Err(ApiError::Unauthorized) => {
                // Stale aggregate counts are worse than none.
                self.store.dispatch(Action::SetSummary(Summary::default()));
            }
            Err(err) => {
                warn!(%err, "summary fetch failed");
                self.store.dispatch(Action::SetSummary(Summary::default()));
                self.notifications
                    .error(format!("Could not load summary: {err}"));
            }
        }
    }

    /// Coalesce rapid refresh triggers into one students + summary pair. A
    /// pending scheduled refresh is replaced, never stacked.
    pub fn refresh_data(self: &Arc<Self>, filters: StudentFilters) {
        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(controller.debounce).await;
            tokio::join!(controller.fetch_students(&filters), controller.fetch_summary());
        });

        let mut pending = self
            .pending_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Ask the server to re-run the risk rules for one student and cache the
    /// returned record.
    pub async fn recalculate(&self, student_id: &str) {
        let Some(token) = self.session.token() else {
            return;
        };

        match self.api.recalculate(&token, student_id).await {
            Ok(student) => {
                if !self.session.is_authenticated() {
                    return;
                }
                self.store.dispatch(Action::UpsertStudent(student));
            }
            Err(ApiError::Unauthorized) => {
                self.store.dispatch(Action::MarkUnauthorized);
            }
            Err(err) => {
                self.notifications
                    .error(format!("Could not recalculate risk: {err}"));
            }
        }
    }

    /// Trigger the server-side guardian notification run and report its
    /// receipt.
    pub async fn dispatch_guardian_notifications(&self) {
        let Some(token) = self.session.token() else {
            return;
        };

        match self.api.dispatch_notifications(&token).await {
            Ok(receipt) if receipt.failed == 0 => {
                self.notifications.success(format!(
                    "Notified {} guardians in {:.1}s",
                    receipt.successful, receipt.duration
                ));
            }
            Ok(receipt) => {
                self.notifications.warning(format!(
                    "Notified {} guardians, {} failed",
                    receipt.successful, receipt.failed
                ));
            }
            Err(err) => {
                self.notifications
                    .error(format!("Could not send notifications: {err}"));
            }
        }
    }

    /// End the session and tear the cache down. Any scheduled refresh dies
    /// with it.
    pub fn sign_out(&self) {
        let mut pending = self
            .pending_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = pending.take() {
            task.abort();
        }
        drop(pending);

        self.session.sign_out();
        self.store.dispatch(Action::Clear);
    }
}
