use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::SyncConfig;
use crate::models::{StudentFilters, StudentRecord, Summary};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Token missing, expired or rejected (401/403).
    #[error("not authorized")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Which upload endpoint a file goes to. Exam, attendance and fees uploads
/// land in one contributor's partition; general uploads carry identity
/// fields and are partition-neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Exam,
    Attendance,
    Fees,
    General,
}

impl UploadKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            UploadKind::Exam => "upload/exam",
            UploadKind::Attendance => "upload/attendance",
            UploadKind::Fees => "upload/fees",
            UploadKind::General => "upload/general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub success: bool,
    #[serde(default)]
    pub created_count: u32,
    #[serde(default)]
    pub updated_count: u32,
    #[serde(default)]
    pub summary: Option<Summary>,
}

impl UploadReceipt {
    pub fn affected(&self) -> u32 {
        self.created_count + self.updated_count
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReceipt {
    pub success: bool,
    #[serde(default)]
    pub deleted_count: u32,
}

/// Receipt for a server-side guardian notification run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchReceipt {
    pub sent: u32,
    pub successful: u32,
    pub failed: u32,
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct StudentsEnvelope {
    success: bool,
    #[serde(default)]
    students: Vec<StudentRecord>,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    success: bool,
    summary: Option<Summary>,
}

#[derive(Debug, Deserialize)]
struct RecalculateEnvelope {
    success: bool,
    student: Option<StudentRecord>,
}

/// The read/write API this controller consumes. Kept behind a trait so the
/// transport can be swapped out; tests script it in memory.
#[async_trait]
pub trait StudentApi: Send + Sync {
    async fn fetch_students(
        &self,
        token: &str,
        filters: &StudentFilters,
    ) -> ApiResult<Vec<StudentRecord>>;

    async fn fetch_summary(&self, token: &str) -> ApiResult<Summary>;

    async fn upload(
        &self,
        token: &str,
        kind: UploadKind,
        filename: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<UploadReceipt>;

    async fn recalculate(&self, token: &str, student_id: &str) -> ApiResult<StudentRecord>;

    async fn delete_student(&self, token: &str, student_id: &str) -> ApiResult<DeleteReceipt>;

    async fn delete_all_students(&self, token: &str) -> ApiResult<DeleteReceipt>;

    async fn dispatch_notifications(&self, token: &str) -> ApiResult<DispatchReceipt>;
}

/// reqwest-backed implementation of the student API.
pub struct HttpStudentApi {
    base_url: String,
    client: Client,
}

impl HttpStudentApi {
    pub fn new(config: &SyncConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(HttpStudentApi {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl StudentApi for HttpStudentApi {
    async fn fetch_students(
        &self,
        token: &str,
        filters: &StudentFilters,
    ) -> ApiResult<Vec<StudentRecord>> {
        let mut request = self.client.get(self.url("students")).bearer_auth(token);
        if let Some(level) = filters.risk_level {
            request = request.query(&[("riskLevel", level.as_str())]);
        }
        if let Some(search) = filters.search.as_deref() {
            request = request.query(&[("search", search)]);
        }

        let envelope: StudentsEnvelope = self.decode(request.send().await?).await?;
        if !envelope.success {
            return Err(ApiError::InvalidResponse(
                "students payload flagged unsuccessful".to_string(),
            ));
        }
        Ok(envelope.students)
    }

    async fn fetch_summary(&self, token: &str) -> ApiResult<Summary> {
        let request = self
            .client
            .get(self.url("students/dashboard/summary"))
            .bearer_auth(token);

        let envelope: SummaryEnvelope = self.decode(request.send().await?).await?;
        match envelope.summary {
            Some(summary) if envelope.success => Ok(summary),
            _ => Err(ApiError::InvalidResponse(
                "summary payload missing or flagged unsuccessful".to_string(),
            )),
        }
    }

    async fn upload(
        &self,
        token: &str,
        kind: UploadKind,
        filename: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<UploadReceipt> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url(kind.endpoint()))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        self.decode(response).await
    }

    async fn recalculate(&self, token: &str, student_id: &str) -> ApiResult<StudentRecord> {
        let response = self
            .client
            .post(self.url(&format!("students/{student_id}/recalculate")))
            .bearer_auth(token)
            .send()
            .await?;

        let envelope: RecalculateEnvelope = self.decode(response).await?;
        match envelope.student {
            Some(student) if envelope.success => Ok(student),
            _ => Err(ApiError::InvalidResponse(
                "recalculate payload missing student".to_string(),
            )),
        }
    }

    async fn delete_student(&self, token: &str, student_id: &str) -> ApiResult<DeleteReceipt> {
        let response = self
            .client
            .delete(self.url(&format!("students/{student_id}")))
            .bearer_auth(token)
            .send()
            .await?;
        self.decode(response).await
    }

    async fn delete_all_students(&self, token: &str) -> ApiResult<DeleteReceipt> {
        let response = self
            .client
            .delete(self.url("students"))
            .bearer_auth(token)
            .send()
            .await?;
        self.decode(response).await
    }

    async fn dispatch_notifications(&self, token: &str) -> ApiResult<DispatchReceipt> {
        let response = self
            .client
            .post(self.url("notifications"))
            .bearer_auth(token)
            .send()
            .await?;
        self.decode(response).await
    }
}
