//! 잡 API - 목록, 생성, 취소, 하드 삭제, 일괄 삭제, 청크 목록

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ApiClient;
use crate::error::{ConsoleError, Result};

// ============================================================================
// Job Status
// ============================================================================

/// 잡 상태
///
/// 백엔드가 새 상태를 추가해도 깨지지 않도록 `Other`로 받습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Created,
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Other(s) => s,
        }
    }

    /// 아직 끝나지 않은 상태 (created, pending, queued, processing)
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::Created | JobStatus::Pending | JobStatus::Queued | JobStatus::Processing
        )
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "created" => JobStatus::Created,
            "pending" => JobStatus::Pending,
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "cancelled" | "canceled" => JobStatus::Cancelled,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request Enums
// ============================================================================

/// 잡 소스 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Upload,
    Url,
    S3,
    AzureBlob,
    Sharepoint,
}

/// 잡 우선순위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

/// 처리 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    Sync,
    Async,
}

// ============================================================================
// Job
// ============================================================================

/// 백엔드 잡
///
/// 알 수 없는 필드는 `extra`에 보존합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub source_type: String,
    pub source_uri: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    /// 요청 시에는 문자열, 응답에서는 숫자로 오기도 합니다
    pub priority: Option<Value>,
    pub mode: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
    pub error: Option<Value>,
    pub config: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// 실패 사유 (error_message → error)
    pub fn error_text(&self) -> Option<String> {
        if let Some(msg) = self.error_message.as_deref().filter(|m| !m.is_empty()) {
            return Some(msg.to_string());
        }
        match &self.error {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => crate::error::extract_error_message(other).or_else(|| Some(other.to_string())),
        }
    }

    /// 표시 이름 (file_name → source_uri → id)
    pub fn display_name(&self) -> &str {
        self.file_name
            .as_deref()
            .or(self.source_uri.as_deref())
            .unwrap_or(&self.id)
    }
}

/// 잡 목록 페이지
#[derive(Debug, Clone, Default)]
pub struct JobPage {
    pub items: Vec<Job>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl JobPage {
    /// 응답 JSON에서 파싱
    ///
    /// `{ data: { items, total, page, page_size }, meta, links }` 봉투와
    /// 봉투 없는 `{ items, total, ... }` 모두 허용합니다.
    pub fn from_value(value: Value) -> Result<Self> {
        let inner = match value.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => value,
        };

        let items = match inner.get("items") {
            Some(items) if !items.is_null() => serde_json::from_value(items.clone())?,
            _ => Vec::new(),
        };

        let number = |key: &str| inner.get(key).and_then(Value::as_u64);

        Ok(Self {
            items,
            total: number("total").unwrap_or(0),
            page: number("page").unwrap_or(1),
            limit: number("page_size").or_else(|| number("limit")).unwrap_or(20),
        })
    }
}

/// 잡 목록 쿼리
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

/// 잡 생성 시 함께 전달되는 대상 (그래프 백엔드)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: Value,
    pub enabled: bool,
}

/// 잡 생성 요청
#[derive(Debug, Clone, Serialize)]
pub struct CreateJobRequest {
    pub source_type: SourceType,
    pub source_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<JobMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Vec<Destination>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl CreateJobRequest {
    pub fn new(source_type: SourceType, source_uri: impl Into<String>) -> Self {
        Self {
            source_type,
            source_uri: source_uri.into(),
            file_name: None,
            file_size: None,
            mime_type: None,
            priority: None,
            mode: None,
            external_id: None,
            pipeline_id: None,
            destination_ids: None,
            destinations: None,
            metadata: None,
        }
    }
}

/// 단일 잡 응답 봉투
#[derive(Debug, Clone, Deserialize)]
pub struct JobEnvelope {
    pub data: Job,
    #[serde(default)]
    pub meta: Option<Value>,
}

// ============================================================================
// Bulk Delete
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteRequest {
    pub job_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteResult {
    pub data: BulkDeleteData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteData {
    pub summary: BulkDeleteSummary,
    #[serde(default)]
    pub details: BulkDeleteDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BulkDeleteSummary {
    pub total_requested: u64,
    pub jobs_deleted: u64,
    pub jobs_not_found: u64,
    pub jobs_failed: u64,
    pub total_chunks_deleted: u64,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BulkDeleteDetails {
    pub deleted: Vec<DeletedJob>,
    pub not_found: Vec<String>,
    pub failed: Vec<FailedDelete>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedJob {
    pub job_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub chunks: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FailedDelete {
    pub job_id: String,
    #[serde(default)]
    pub error: String,
}

// ============================================================================
// Chunks
// ============================================================================

/// 청크 목록 쿼리
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_embedding: Option<bool>,
}

/// 저장된 청크
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: Option<String>,
    pub id: Option<String>,
    pub job_id: Option<String>,
    pub chunk_index: Option<u64>,
    pub text: Option<String>,
    pub content: Option<String>,
    pub token_count: Option<u64>,
    pub tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_embedding")]
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 숫자 배열이 아닌 임베딩(pgvector 문자열 등)은 `None`으로 받음
fn lenient_embedding<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<f32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>(),
        _ => None,
    })
}

/// 청크 목록 페이지
#[derive(Debug, Clone, Default)]
pub struct ChunkPage {
    pub chunks: Vec<Chunk>,
    pub total: u64,
}

impl ChunkPage {
    /// 응답 JSON에서 파싱
    ///
    /// 목록은 `chunks`, `items`, `data` 키 아래 또는 배열 그 자체로 올 수 있습니다.
    /// 목록이 없으면 빈 페이지입니다.
    pub fn from_value(value: Value) -> Result<Self> {
        let list = match &value {
            Value::Array(_) => Some(value.clone()),
            Value::Object(map) => ["chunks", "items", "data"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|v| v.is_array())
                .cloned(),
            _ => None,
        };

        let chunks: Vec<Chunk> = match list {
            Some(list) => serde_json::from_value(list)?,
            None => Vec::new(),
        };

        let total = value
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(chunks.len() as u64);

        Ok(Self { chunks, total })
    }
}

// ============================================================================
// ApiClient: Jobs
// ============================================================================

impl ApiClient {
    /// 잡 목록 조회
    pub async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage> {
        let value: Value = self
            .get_json("Fetch jobs", &["api", "v1", "jobs"], query)
            .await?;
        JobPage::from_value(value)
    }

    /// 잡 생성
    pub async fn create_job(&self, request: &CreateJobRequest) -> Result<JobEnvelope> {
        self.post_json("Create job", &["api", "v1", "jobs"], request)
            .await
    }

    /// 잡 취소 (소프트 삭제)
    pub async fn cancel_job(&self, job_id: &str) -> Result<()> {
        self.delete("Cancel", &["api", "v1", "jobs", job_id]).await
    }

    /// 잡과 청크 하드 삭제
    pub async fn delete_job_hard(&self, job_id: &str) -> Result<()> {
        self.delete("Delete", &["api", "v1", "jobs", job_id, "hard"])
            .await
    }

    /// 일괄 삭제
    pub async fn bulk_delete(&self, request: &BulkDeleteRequest) -> Result<BulkDeleteResult> {
        if request.job_ids.is_empty() {
            return Err(ConsoleError::InvalidInput(
                "No jobs selected for bulk delete".to_string(),
            ));
        }
        self.post_json("Bulk delete", &["api", "v1", "jobs", "bulk-delete"], request)
            .await
    }

    /// 잡의 청크 목록
    pub async fn job_chunks(&self, job_id: &str, query: &ChunkQuery) -> Result<ChunkPage> {
        if job_id.trim().is_empty() {
            return Err(ConsoleError::InvalidInput("No job ID".to_string()));
        }
        let value: Value = self
            .get_json(
                "Retrieve job chunks",
                &["api", "v1", "jobs", job_id.trim(), "chunks"],
                query,
            )
            .await?;
        ChunkPage::from_value(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
