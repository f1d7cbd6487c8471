//! Backend 모듈 - 수집/RAG 백엔드 REST 클라이언트
//!
//! 모든 비즈니스 로직(청킹, 임베딩, 인덱싱, 랭킹, 답변 생성)은 백엔드에 있고,
//! 이 모듈은 REST 엔드포인트를 타입이 있는 메서드로 감쌀 뿐입니다.
//!
//! - jobs: 잡 목록/생성/취소/삭제, 청크 목록
//! - ingest: 파일 업로드, URL 수집 (네트워크 에러 재시도)
//! - health: 서비스/벡터 스토어 상태
//! - search: 텍스트/하이브리드/시맨틱 검색
//! - graph: Cognee, HippoRAG 검색
//! - rag: 답변 생성
//!
//! ## 사용법
//! ```rust,ignore
//! let client = ApiClient::new("https://pipeline-api.example.com", Some("key".into()))?;
//! let page = client.list_jobs(&JobQuery::default()).await?;
//! ```

mod graph;
mod health;
mod ingest;
mod jobs;
mod rag;
mod retry;
mod search;

pub use graph::{
    CogneeHit, CogneeSearchRequest, CogneeSearchResponse, CogneeSearchType, HippoQaRequest,
    HippoQaResponse, HippoQaResult, HippoRetrievalResult, HippoRetrieveRequest,
    HippoRetrieveResponse,
};
pub use health::{ComponentHealth, HealthReport};
pub use ingest::{
    ChunkingOverrides, DestinationOptions, IngestUrlRequest, UploadFile, UploadRequest,
    UploadResponse, UploadedJobs,
};
pub use jobs::{
    BulkDeleteDetails, BulkDeleteRequest, BulkDeleteResult, BulkDeleteSummary, Chunk, ChunkPage,
    ChunkQuery, CreateJobRequest, DeletedJob, Destination, FailedDelete, Job, JobEnvelope,
    JobMode, JobPage, JobQuery, JobStatus, Priority, SourceType,
};
pub use rag::{RagMetrics, RagQueryRequest, RagQueryResponse, RagSource, RagStrategy};
pub use retry::RetryPolicy;
pub use search::{
    FusionMethod, HybridSearchRequest, SearchFilters, SearchHit, SearchResponse,
    SemanticSearchRequest, SemanticTextSearchRequest, SimilarQuery, TextSearchRequest,
};

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{ConsoleError, Result};
use crate::settings::Settings;

/// 요청 타임아웃 (대용량 업로드 고려 180초)
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// API 키 헤더 이름
pub const API_KEY_HEADER: &str = "X-API-Key";

// ============================================================================
// ApiClient
// ============================================================================

/// 백엔드 REST 클라이언트
///
/// `reqwest::Client`는 내부적으로 Arc이므로 복제 비용이 낮습니다.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `base_url` - 백엔드 URL 또는 프록시 URL (예: `http://127.0.0.1:3000/proxy`)
    /// * `api_key` - `X-API-Key` 헤더 값 (빈 문자열이면 전송하지 않음)
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, api_key, REQUEST_TIMEOUT)
    }

    /// 타임아웃을 지정하여 생성
    pub fn with_timeout(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim()).map_err(|e| {
            ConsoleError::InvalidInput(format!("Invalid backend URL '{}': {}", base_url, e))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(ConsoleError::InvalidInput(format!(
                "Backend URL cannot be used as a base: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("pipeline-console/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ConsoleError::from)?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            retry: RetryPolicy::default(),
        })
    }

    /// 설정에서 생성
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.upstream_url, Some(settings.api_key.clone()))
    }

    /// 업로드/URL 수집 재시도 정책 교체
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 베이스 URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// API 키 설정 여부
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    // ------------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------------

    /// 경로 세그먼트로 엔드포인트 URL 생성 (세그먼트는 퍼센트 인코딩됨)
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ConsoleError::InvalidInput(format!("Backend URL cannot be a base: {}", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// API 키 헤더가 붙은 요청 빌더
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// GET + JSON 응답
    pub(crate) async fn get_json<Q, T>(&self, operation: &str, segments: &[&str], query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {}", url);
        let builder = self.request(Method::GET, url).query(query);
        self.send_json(operation, builder).await
    }

    /// POST JSON + JSON 응답
    pub(crate) async fn post_json<B, T>(&self, operation: &str, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        tracing::debug!("POST {}", url);
        let builder = self.request(Method::POST, url).json(body);
        self.send_json(operation, builder).await
    }

    /// DELETE (본문 무시, 204 포함 2xx는 성공)
    pub(crate) async fn delete(&self, operation: &str, segments: &[&str]) -> Result<()> {
        let url = self.endpoint(segments)?;
        tracing::debug!("DELETE {}", url);
        let response = self.request(Method::DELETE, url).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ConsoleError::from_response(operation, status, &body))
    }

    /// 요청 전송 후 상태 코드 확인 및 JSON 파싱
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ConsoleError::from_response(operation, status, &body);
            tracing::debug!("{} failed with {}: {}", operation, status, err);
            return Err(err);
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ConsoleError::Decode(format!("{}: {}", operation, e)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::new("http://127.0.0.1:3000/proxy", None).unwrap();
        let url = client.endpoint(&["api", "v1", "jobs"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/proxy/api/v1/jobs");

        let client = ApiClient::new("http://127.0.0.1:3000/proxy/", None).unwrap();
        let url = client.endpoint(&["health"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/proxy/health");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = ApiClient::new("https://api.example.com", None).unwrap();
        let url = client
            .endpoint(&["api", "v1", "jobs", "a b/c", "chunks"])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/jobs/a%20b%2Fc/chunks");
    }

    #[test]
    fn test_blank_api_key_is_dropped() {
        let client = ApiClient::new("https://api.example.com", Some("  ".to_string())).unwrap();
        assert!(!client.has_api_key());

        let client = ApiClient::new("https://api.example.com", Some("k".to_string())).unwrap();
        assert!(client.has_api_key());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url", None).is_err());
        assert!(ApiClient::new("mailto:ops@example.com", None).is_err());
    }
}
