use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{StudentApi, UploadKind, UploadReceipt};
use crate::models::StudentFilters;
use crate::notify::NotificationBus;
use crate::session::SessionGuard;
use crate::sync::SyncController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Spreadsheet,
    DelimitedText,
}

impl FileCategory {
    pub fn from_name(filename: &str) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "xls" | "xlsx" | "ods" => Some(FileCategory::Spreadsheet),
            "csv" | "tsv" | "txt" => Some(FileCategory::DelimitedText),
            _ => None,
        }
    }
}

fn delimiter_for(filename: &str) -> u8 {
    if filename.to_ascii_lowercase().ends_with(".tsv") {
        b'\t'
    } else {
        b','
    }
}

/// One file picked for upload, already in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        FileUpload {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .context("file has no usable name")?
            .to_string();
        let bytes = std::fs::read(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        Ok(FileUpload { filename, bytes })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Error,
}

/// Per-file result, recorded in submission order and immutable once pushed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    pub status: UploadStatus,
    pub affected_count: Option<u32>,
    pub error_message: Option<String>,
}

impl UploadOutcome {
    fn success(filename: &str, affected: u32) -> Self {
        UploadOutcome {
            filename: filename.to_string(),
            status: UploadStatus::Success,
            affected_count: Some(affected),
            error_message: None,
        }
    }

    fn error(filename: &str, message: impl Into<String>) -> Self {
        UploadOutcome {
            filename: filename.to_string(),
            status: UploadStatus::Error,
            affected_count: None,
            error_message: Some(message.into()),
        }
    }
}

/// Some files failing is a terminal state of its own, not a failure: the
/// batch succeeded for the files that landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    AllSucceeded,
    Partial,
    AllFailed,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<UploadOutcome>,
    /// Receipt of the last file that succeeded, if any.
    pub last_receipt: Option<UploadReceipt>,
}

impl BatchReport {
    fn new() -> Self {
        BatchReport {
            batch_id: Uuid::new_v4(),
            outcomes: Vec::new(),
            last_receipt: None,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == UploadStatus::Success)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn status(&self) -> BatchStatus {
        if self.outcomes.is_empty() {
            BatchStatus::Empty
        } else if self.failed() == 0 {
            BatchStatus::AllSucceeded
        } else if self.succeeded() > 0 {
            BatchStatus::Partial
        } else {
            BatchStatus::AllFailed
        }
    }
}

/// Checks run before a file is allowed anywhere near the network: the
/// extension must belong to a known category, the payload must be non-empty,
/// and delimited text must carry an identifying column in its header row.
fn validate_upload(file: &FileUpload) -> anyhow::Result<FileCategory> {
    let Some(category) = FileCategory::from_name(&file.filename) else {
        bail!("unsupported file type (expected a spreadsheet or delimited text file)");
    };
    if file.bytes.is_empty() {
        bail!("file is empty");
    }
    if category == FileCategory::DelimitedText {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter_for(&file.filename))
            .from_reader(file.bytes.as_slice());
        let headers = reader.headers().context("could not read the header row")?;
        if !headers.iter().any(is_identifying_column) {
            bail!("no identifying column (id or name) in the header row");
        }
    }
    Ok(category)
}

fn is_identifying_column(header: &str) -> bool {
    matches!(
        header.trim().to_ascii_lowercase().as_str(),
        "id" | "student_id"
            | "studentid"
            | "roll_no"
            | "rollno"
            | "name"
            | "student_name"
            | "studentname"
    )
}

/// Submits a batch of files one at a time, accumulating a per-file outcome.
/// A failed file never aborts the rest; one batch-complete signal fires at
/// the end, and a refresh pulls the merged server truth into the cache.
pub struct IngestionPipeline {
    api: Arc<dyn StudentApi>,
    session: Arc<SessionGuard>,
    sync: Arc<SyncController>,
    notifications: NotificationBus,
}

impl IngestionPipeline {
    pub fn new(
        api: Arc<dyn StudentApi>,
        session: Arc<SessionGuard>,
        sync: Arc<SyncController>,
        notifications: NotificationBus,
    ) -> Self {
        IngestionPipeline {
            api,
            session,
            sync,
            notifications,
        }
    }

    pub async fn submit_batch(&self, kind: UploadKind, files: Vec<FileUpload>) -> BatchReport {
        let mut report = BatchReport::new();

        if files.is_empty() {
            self.notifications.warning("No files selected for upload");
            return report;
        }
        let Some(token) = self.session.token() else {
            self.notifications.error("Sign in before uploading files");
            return report;
        };

        info!(batch = %report.batch_id, files = files.len(), kind = ?kind, "upload batch started");
        for file in files {
            match validate_upload(&file) {
                Err(reason) => {
                    warn!(file = %file.filename, "rejected before upload: {:#}", reason);
                    report
                        .outcomes
                        .push(UploadOutcome::error(&file.filename, format!("{reason:#}")));
                }
                Ok(_) => {
                    let filename = file.filename;
                    match self.api.upload(&token, kind, &filename, file.bytes).await {
                        Ok(receipt) if receipt.success => {
                            report
                                .outcomes
                                .push(UploadOutcome::success(&filename, receipt.affected()));
                            report.last_receipt = Some(receipt);
                        }
                        Ok(_) => {
                            report
                                .outcomes
                                .push(UploadOutcome::error(&filename, "upload rejected by the server"));
                        }
                        Err(err) => {
                            warn!(file = %filename, %err, "upload failed");
                            report
                                .outcomes
                                .push(UploadOutcome::error(&filename, err.to_string()));
                        }
                    }
                }
            }
        }

        self.announce(&report);
        if report.last_receipt.is_some() {
            self.sync.refresh_data(StudentFilters::default());
        }
        report
    }

    fn announce(&self, report: &BatchReport) {
        match report.status() {
            BatchStatus::AllSucceeded => {
                let affected = report
                    .last_receipt
                    .as_ref()
                    .map(|r| r.affected())
                    .unwrap_or(0);
                self.notifications.success(format!(
                    "Processed {} file(s), {affected} records affected",
                    report.succeeded()
                ));
            }
            BatchStatus::Partial => {
                self.notifications.warning(format!(
                    "Processed {} of {} files, {} failed",
                    report.succeeded(),
                    report.outcomes.len(),
                    report.failed()
                ));
            }
            BatchStatus::AllFailed => {
                self.notifications.error("All files in the batch failed");
            }
            BatchStatus::Empty => {}
        }
    }
}
