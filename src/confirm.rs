use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::api::StudentApi;
use crate::models::StudentFilters;
use crate::notify::NotificationBus;
use crate::session::SessionGuard;
use crate::store::{Action, RecordStore};
use crate::sync::SyncController;

/// Exact, case-sensitive phrase required before every record in the system
/// can be deleted.
pub const DELETE_ALL_PHRASE: &str = "DELETE ALL STUDENTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    One(String),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    AwaitingConfirmation(DeleteTarget),
    AwaitingTypedConfirmation,
    Executing(DeleteTarget),
}

/// What a confirmation call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmStep {
    /// Delete-all armed; the typed phrase is required next.
    PhraseRequired,
    Deleted,
    /// Typed phrase did not match; the request was dropped without any
    /// network call. Rendered inline, not via the notification bus.
    Mismatch,
    Failed,
    /// No deletion was awaiting this call.
    NotPending,
}

/// Two-stage confirmation for irreversible deletions. A single record takes
/// one confirm step; deleting every record additionally requires an exact
/// typed phrase. The store only changes after the server reports success.
pub struct DeletionGuard {
    api: Arc<dyn StudentApi>,
    session: Arc<SessionGuard>,
    store: Arc<RecordStore>,
    sync: Arc<SyncController>,
    notifications: NotificationBus,
    state: Mutex<GuardState>,
}

impl DeletionGuard {
    pub fn new(
        api: Arc<dyn StudentApi>,
        session: Arc<SessionGuard>,
        store: Arc<RecordStore>,
        sync: Arc<SyncController>,
        notifications: NotificationBus,
    ) -> Self {
        DeletionGuard {
            api,
            session,
            store,
            sync,
            notifications,
            state: Mutex::new(GuardState::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> GuardState {
        self.lock().clone()
    }

    /// Arm the guard. Refused while another deletion is pending or running.
    pub fn begin(&self, target: DeleteTarget) -> bool {
        let mut state = self.lock();
        if *state != GuardState::Idle {
            return false;
        }
        *state = GuardState::AwaitingConfirmation(target);
        true
    }

    pub fn cancel(&self) {
        let mut state = self.lock();
        match *state {
            GuardState::AwaitingConfirmation(_) | GuardState::AwaitingTypedConfirmation => {
                *state = GuardState::Idle;
            }
            _ => {}
        }
    }

    /// First confirmation step. Executes a single-record deletion; advances a
    /// delete-all to the typed stage.
    pub async fn confirm(&self) -> ConfirmStep {
        let student_id = {
            let mut state = self.lock();
            match state.clone() {
                GuardState::AwaitingConfirmation(DeleteTarget::One(id)) => {
                    *state = GuardState::Executing(DeleteTarget::One(id.clone()));
                    id
                }
                GuardState::AwaitingConfirmation(DeleteTarget::All) => {
                    *state = GuardState::AwaitingTypedConfirmation;
                    return ConfirmStep::PhraseRequired;
                }
                _ => return ConfirmStep::NotPending,
            }
        };

        self.execute_single(&student_id).await
    }

    /// Second confirmation step for delete-all. Anything but the exact
    /// phrase returns the guard to idle without touching the network.
    pub async fn confirm_phrase(&self, phrase: &str) -> ConfirmStep {
        {
            let mut state = self.lock();
            if *state != GuardState::AwaitingTypedConfirmation {
                return ConfirmStep::NotPending;
            }
            if phrase != DELETE_ALL_PHRASE {
                *state = GuardState::Idle;
                return ConfirmStep::Mismatch;
            }
            *state = GuardState::Executing(DeleteTarget::All);
        }

        self.execute_all().await
    }

    async fn execute_single(&self, student_id: &str) -> ConfirmStep {
        let Some(token) = self.session.token() else {
            *self.lock() = GuardState::Idle;
            self.notifications.error("Sign in before deleting records");
            return ConfirmStep::Failed;
        };

        let outcome = match self.api.delete_student(&token, student_id).await {
            Ok(receipt) if receipt.success => {
                info!(student = %student_id, "record deleted");
                // The cache must reflect the deletion before the guard goes
                // idle; no caller may observe the stale list after a success.
                self.sync.fetch_students(&StudentFilters::default()).await;
                self.sync.fetch_summary().await;
                self.notifications
                    .success(format!("Deleted student {student_id}"));
                ConfirmStep::Deleted
            }
            Ok(_) => {
                self.notifications
                    .error(format!("Could not delete student {student_id}"));
                ConfirmStep::Failed
            }
            Err(err) => {
                warn!(student = %student_id, %err, "delete failed");
                self.notifications
                    .error(format!("Could not delete student {student_id}: {err}"));
                ConfirmStep::Failed
            }
        };

        *self.lock() = GuardState::Idle;
        outcome
    }

    async fn execute_all(&self) -> ConfirmStep {
        let Some(token) = self.session.token() else {
            *self.lock() = GuardState::Idle;
            self.notifications.error("Sign in before deleting records");
            return ConfirmStep::Failed;
        };

        let outcome = match self.api.delete_all_students(&token).await {
            Ok(receipt) if receipt.success => {
                info!(deleted = receipt.deleted_count, "all records deleted");
                self.store.dispatch(Action::Clear);
                self.notifications.success(format!(
                    "Deleted all student records ({})",
                    receipt.deleted_count
                ));
                ConfirmStep::Deleted
            }
            Ok(_) => {
                self.notifications.error("Could not delete student records");
                ConfirmStep::Failed
            }
            Err(err) => {
                warn!(%err, "delete-all failed");
                self.notifications
                    .error(format!("Could not delete student records: {err}"));
                ConfirmStep::Failed
            }
        };

        *self.lock() = GuardState::Idle;
        outcome
    }
}
