//! Synchronization core for an at-risk student tracker.
//!
//! Three unrelated contributors (exam office, faculty, guardian) upload
//! partial data that the server merges into one record per student and runs
//! risk rules over. This crate is the controller layer a UI embeds: it owns
//! the in-memory record cache, decides when fetched data is valid to
//! display, reports bulk-file ingestion per file, guards irreversible
//! deletions behind staged confirmation, and carries short-lived user-facing
//! notifications.
//!
//! # Example
//!
//! ```rust,no_run
//! use student_risk_sync::{Role, StudentFilters, SyncConfig, SyncCore, UserIdentity};
//!
//! # async fn example() -> Result<(), student_risk_sync::ApiError> {
//! let core = SyncCore::new(SyncConfig::from_env())?;
//! core.session.sign_in(
//!     "bearer-token",
//!     UserIdentity {
//!         user_id: "u-1".into(),
//!         name: "Priya Nair".into(),
//!         role: Role::Admin,
//!     },
//! );
//! core.routes.navigate("/dashboard");
//! core.sync.fetch_students(&StudentFilters::default()).await;
//! let students = core.store.students();
//! # let _ = students;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod confirm;
pub mod ingest;
pub mod models;
pub mod notify;
pub mod routes;
pub mod session;
pub mod store;
pub mod sync;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

pub use api::{ApiError, ApiResult, HttpStudentApi, StudentApi, UploadKind};
pub use config::SyncConfig;
pub use confirm::{ConfirmStep, DeleteTarget, DeletionGuard, GuardState, DELETE_ALL_PHRASE};
pub use ingest::{
    BatchReport, BatchStatus, FileUpload, IngestionPipeline, UploadOutcome, UploadStatus,
};
pub use models::{
    Contribution, Contributor, RiskLevel, StudentFilters, StudentRecord, Summary,
};
pub use notify::{Notification, NotificationBus, NotificationKind};
pub use routes::RouteGate;
pub use session::{Role, SessionGuard, UserIdentity};
pub use store::{Action, RecordStore, StoreState};
pub use sync::SyncController;

/// The controller components wired together the way the UI consumes them.
pub struct SyncCore {
    pub session: Arc<SessionGuard>,
    pub routes: Arc<RouteGate>,
    pub store: Arc<RecordStore>,
    pub notifications: NotificationBus,
    pub sync: Arc<SyncController>,
    pub ingest: IngestionPipeline,
    pub deletions: DeletionGuard,
}

impl SyncCore {
    /// Wire everything over the HTTP API described by `config`.
    pub fn new(config: SyncConfig) -> ApiResult<Self> {
        let api = Arc::new(HttpStudentApi::new(&config)?);
        Ok(Self::with_api(api, config))
    }

    /// Wire everything over any transport, scripted ones included.
    pub fn with_api(api: Arc<dyn StudentApi>, config: SyncConfig) -> Self {
        let session = Arc::new(SessionGuard::new());
        let routes = Arc::new(RouteGate::new(config.allowed_routes.clone()));
        let store = Arc::new(RecordStore::new());
        let notifications = NotificationBus::new(config.notification_duration_ms);
        let sync = SyncController::new(
            api.clone(),
            session.clone(),
            routes.clone(),
            store.clone(),
            notifications.clone(),
            Duration::from_millis(config.refresh_debounce_ms),
        );
        let ingest = IngestionPipeline::new(
            api.clone(),
            session.clone(),
            sync.clone(),
            notifications.clone(),
        );
        let deletions = DeletionGuard::new(
            api,
            session.clone(),
            store.clone(),
            sync.clone(),
            notifications.clone(),
        );

        SyncCore {
            session,
            routes,
            store,
            notifications,
            sync,
            ingest,
            deletions,
        }
    }
}
