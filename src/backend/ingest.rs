//! 수집 API - 멀티파트 파일 업로드, URL 수집
//!
//! 두 경로 모두 네트워크/타임아웃 에러에 한해 `RetryPolicy`로 재시도합니다.

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::jobs::{Destination, Job, JobEnvelope, JobMode, Priority};
use super::ApiClient;
use crate::error::{ConsoleError, Result};
use crate::settings::{ChunkStrategy, Settings};

/// 목적지 데이터셋 기본값
const DEFAULT_DATASET: &str = "default";

// ============================================================================
// Destinations
// ============================================================================

/// 그래프 백엔드 목적지 옵션
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationOptions {
    pub cognee: bool,
    pub cognee_dataset: Option<String>,
    pub cognee_graph: Option<String>,
    pub auto_cognify: bool,
    pub extract_entities: bool,
    pub extract_relationships: bool,
    pub hipporag: bool,
    pub hipporag_dataset: Option<String>,
}

impl Default for DestinationOptions {
    fn default() -> Self {
        Self {
            cognee: false,
            cognee_dataset: None,
            cognee_graph: None,
            auto_cognify: true,
            extract_entities: true,
            extract_relationships: true,
            hipporag: false,
            hipporag_dataset: None,
        }
    }
}

/// 공백이면 기본값
fn name_or_default(name: &Option<String>) -> String {
    name.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_DATASET)
        .to_string()
}

impl DestinationOptions {
    /// 목적지 목록 생성 (아무것도 켜지 않았으면 None)
    pub fn build(&self) -> Option<Vec<Destination>> {
        let mut destinations = Vec::new();

        if self.cognee {
            destinations.push(Destination {
                kind: "cognee_local".to_string(),
                config: json!({
                    "dataset_id": name_or_default(&self.cognee_dataset),
                    "graph_name": name_or_default(&self.cognee_graph),
                    "auto_cognify": self.auto_cognify,
                    "extract_entities": self.extract_entities,
                    "extract_relationships": self.extract_relationships,
                }),
                enabled: true,
            });
        }

        if self.hipporag {
            destinations.push(Destination {
                kind: "hipporag".to_string(),
                config: json!({ "dataset_id": name_or_default(&self.hipporag_dataset) }),
                enabled: true,
            });
        }

        tracing::debug!("Generated {} destination(s)", destinations.len());

        if destinations.is_empty() {
            None
        } else {
            Some(destinations)
        }
    }
}

// ============================================================================
// Chunking Metadata
// ============================================================================

/// 잡 메타데이터에 들어갈 청킹 파라미터 (명령 플래그 우선, 없으면 설정값)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkingOverrides {
    pub strategy: Option<ChunkStrategy>,
    pub chunk_size: Option<u32>,
    pub chunk_overlap: Option<u32>,
}

impl ChunkingOverrides {
    /// `base` 메타데이터 위에 `chunk_strategy`, `chunk_size`, `chunk_overlap`을 덮어씁니다
    pub fn merge_into(&self, base: Option<Value>, settings: &Settings) -> Result<Value> {
        let mut map = match base {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(ConsoleError::InvalidInput(
                    "Metadata must be a JSON object".to_string(),
                ))
            }
        };

        let strategy = self.strategy.unwrap_or(settings.chunk_strategy);
        map.insert("chunk_strategy".to_string(), json!(strategy.as_str()));
        map.insert(
            "chunk_size".to_string(),
            json!(self.chunk_size.unwrap_or(settings.chunk_size)),
        );
        map.insert(
            "chunk_overlap".to_string(),
            json!(self.chunk_overlap.unwrap_or(settings.chunk_overlap)),
        );

        Ok(Value::Object(map))
    }
}

// ============================================================================
// Upload
// ============================================================================

/// 업로드할 파일 (메모리에 적재됨)
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    /// 디스크에서 읽기
    pub async fn read(path: &Path, mime_type: &str) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.bin".to_string());

        Ok(Self {
            file_name,
            mime_type: mime_type.to_string(),
            data,
        })
    }

    fn part(&self) -> Result<Part> {
        Part::bytes(self.data.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type)
            .map_err(|e| {
                ConsoleError::InvalidInput(format!(
                    "Invalid MIME type '{}' for {}: {}",
                    self.mime_type, self.file_name, e
                ))
            })
    }
}

/// 멀티파트 업로드 요청
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub files: Vec<UploadFile>,
    pub priority: Option<Priority>,
    pub pipeline_id: Option<String>,
    pub destination_ids: Option<Vec<String>>,
    pub destinations: Option<Vec<Destination>>,
    pub metadata: Option<Value>,
}

impl UploadRequest {
    /// 멀티파트 폼 생성
    ///
    /// 파일마다 `files` 파트 하나, 목록/객체 필드는 JSON 텍스트입니다.
    /// 폼은 전송 시 소비되므로 시도마다 새로 만듭니다.
    pub fn form(&self) -> Result<Form> {
        let mut form = Form::new();

        for file in &self.files {
            form = form.part("files", file.part()?);
        }

        if let Some(priority) = self.priority {
            form = form.text("priority", priority.as_str());
        }
        if let Some(pipeline_id) = self.pipeline_id.as_deref().filter(|s| !s.is_empty()) {
            form = form.text("pipeline_id", pipeline_id.to_string());
        }
        if let Some(ids) = self.destination_ids.as_ref().filter(|ids| !ids.is_empty()) {
            form = form.text("destination_ids", serde_json::to_string(ids)?);
        }
        if let Some(destinations) = self.destinations.as_ref().filter(|d| !d.is_empty()) {
            form = form.text("destinations", serde_json::to_string(destinations)?);
        }
        if let Some(metadata) = &self.metadata {
            form = form.text("metadata", serde_json::to_string(metadata)?);
        }

        Ok(form)
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.data.len() as u64).sum()
    }
}

/// 업로드로 생성된 잡 목록
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedJobs {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub total: u64,
}

/// 업로드 응답
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub data: UploadedJobs,
    #[serde(default)]
    pub meta: Option<Value>,
}

// ============================================================================
// URL Ingestion
// ============================================================================

/// URL 수집 요청
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestUrlRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<JobMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Vec<Destination>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

// ============================================================================
// ApiClient: Ingestion
// ============================================================================

impl ApiClient {
    /// 파일 업로드 (파일마다 잡 하나 생성)
    pub async fn upload_files(&self, request: &UploadRequest) -> Result<UploadResponse> {
        if request.files.is_empty() {
            return Err(ConsoleError::InvalidInput("No files to upload".to_string()));
        }

        tracing::info!(
            "Uploading {} file(s), {} bytes",
            request.files.len(),
            request.total_bytes()
        );

        let client = self;
        self.retry_policy()
            .run("Upload", move || async move {
                let form = request.form()?;
                let url = client.endpoint(&["api", "v1", "upload"])?;
                let builder = client.request(Method::POST, url).multipart(form);
                client.send_json("Upload", builder).await
            })
            .await
    }

    /// URL에서 문서 수집
    pub async fn ingest_url(&self, request: &IngestUrlRequest) -> Result<JobEnvelope> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(ConsoleError::InvalidInput("URL is required".to_string()));
        }
        url::Url::parse(url)
            .map_err(|e| ConsoleError::InvalidInput(format!("Invalid URL '{}': {}", url, e)))?;

        tracing::info!("Ingesting URL {}", url);

        let client = self;
        self.retry_policy()
            .run("URL ingestion", move || async move {
                client
                    .post_json("URL ingestion", &["api", "v1", "upload", "url"], request)
                    .await
            })
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_destinations_by_default() {
        assert!(DestinationOptions::default().build().is_none());
    }

    #[test]
    fn test_cognee_destination_defaults() {
        let options = DestinationOptions {
            cognee: true,
            cognee_dataset: Some("   ".to_string()),
            ..Default::default()
        };

        let destinations = options.build().unwrap();
        assert_eq!(destinations.len(), 1);
        let value = serde_json::to_value(&destinations[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "cognee_local",
                "config": {
                    "dataset_id": "default",
                    "graph_name": "default",
                    "auto_cognify": true,
                    "extract_entities": true,
                    "extract_relationships": true
                },
                "enabled": true
            })
        );
    }

    #[test]
    fn test_both_destinations() {
        let options = DestinationOptions {
            cognee: true,
            hipporag: true,
            hipporag_dataset: Some(" papers ".to_string()),
            auto_cognify: false,
            ..Default::default()
        };

        let destinations = options.build().unwrap();
        assert_eq!(destinations.len(), 2);
        assert_eq!(destinations[0].config["auto_cognify"], json!(false));
        assert_eq!(destinations[1].kind, "hipporag");
        assert_eq!(destinations[1].config, json!({"dataset_id": "papers"}));
    }

    #[test]
    fn test_chunking_metadata_falls_back_to_settings() {
        let settings = Settings::default();
        let overrides = ChunkingOverrides {
            chunk_size: Some(1024),
            ..Default::default()
        };

        let merged = overrides
            .merge_into(Some(json!({"team": "ops", "chunk_size": 1})), &settings)
            .unwrap();
        assert_eq!(
            merged,
            json!({
                "team": "ops",
                "chunk_strategy": "recursive",
                "chunk_size": 1024,
                "chunk_overlap": 64
            })
        );
    }

    #[test]
    fn test_chunking_metadata_rejects_non_object() {
        let settings = Settings::default();
        let err = ChunkingOverrides::default()
            .merge_into(Some(json!([1, 2])), &settings)
            .unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_ingest_url_request_skips_unset_fields() {
        let request = IngestUrlRequest {
            url: "https://example.com/a.pdf".to_string(),
            priority: Some(Priority::Low),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"url": "https://example.com/a.pdf", "priority": "low"})
        );
    }

    #[test]
    fn test_upload_form_rejects_bad_mime() {
        let request = UploadRequest {
            files: vec![UploadFile {
                file_name: "a.txt".to_string(),
                mime_type: "not a mime\n".to_string(),
                data: b"hi".to_vec(),
            }],
            ..Default::default()
        };
        assert!(request.form().is_err());
    }

    #[tokio::test]
    async fn test_upload_file_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# notes").unwrap();

        let file = UploadFile::read(&path, "text/markdown").await.unwrap();
        assert_eq!(file.file_name, "notes.md");
        assert_eq!(file.data, b"# notes");
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected_before_sending() {
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let err = client.upload_files(&UploadRequest::default()).await.unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidInput(_)));
    }
}
