//! 검색 API - 텍스트(BM25), 하이브리드, 시맨틱, 유사 청크

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ApiClient;
use crate::error::Result;

/// 소스 이름으로 쓰일 메타데이터 키 (우선순위 순)
const SOURCE_METADATA_KEYS: [&str; 5] = [
    "file_name",
    "filename",
    "source",
    "source_file",
    "document_name",
];

// ============================================================================
// Request Types
// ============================================================================

/// 하이브리드 점수 결합 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    #[default]
    WeightedSum,
    Rrf,
}

impl FusionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMethod::WeightedSum => "weighted_sum",
            FusionMethod::Rrf => "rrf",
        }
    }
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 검색 필터
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl SearchFilters {
    /// 잡 ID 필터 (공백이면 None)
    pub fn for_job(job_id: Option<&str>) -> Option<Self> {
        job_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Self {
                job_id: Some(id.to_string()),
            })
    }
}

/// BM25 텍스트 검색 요청
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSearchRequest {
    pub query: String,
    pub top_k: u32,
    pub language: String,
    pub use_fuzzy: bool,
    pub highlight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
}

/// 하이브리드 검색 요청
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridSearchRequest {
    pub query: String,
    pub top_k: u32,
    pub vector_weight: f64,
    pub text_weight: f64,
    pub fusion_method: FusionMethod,
    pub min_similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
}

/// 시맨틱 검색 요청 (`/search/semantic`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticSearchRequest {
    pub query: String,
    pub top_k: u32,
    pub min_similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_context: Option<bool>,
}

/// 텍스트 기반 시맨틱 검색 요청 (`/search/semantic/text`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticTextSearchRequest {
    pub query: String,
    pub top_k: u32,
    pub min_similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
}

/// 유사 청크 쿼리
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimilarQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_self: Option<bool>,
}

// ============================================================================
// Response Types
// ============================================================================

/// 검색 결과 항목 (전략마다 채워지는 필드가 다름)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub chunk_id: Option<String>,
    pub id: Option<String>,
    pub chunk_index: Option<u64>,
    pub job_id: Option<String>,
    pub rank: Option<u32>,
    pub content: Option<String>,
    pub text: Option<String>,
    pub highlighted_content: Option<String>,
    pub similarity_score: Option<f64>,
    pub text_score: Option<f64>,
    pub vector_score: Option<f64>,
    pub hybrid_score: Option<f64>,
    pub fusion_method: Option<String>,
    pub matched_terms: Option<Vec<String>>,
    pub score: Option<f64>,
    pub content_source_name: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl SearchHit {
    /// 청크 ID (chunk_id → id)
    pub fn chunk_id(&self) -> Option<&str> {
        self.chunk_id.as_deref().or(self.id.as_deref())
    }

    /// 본문 (content → text)
    pub fn body(&self) -> &str {
        self.content
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }

    /// 소스 문서 이름 (content_source_name → 메타데이터 키)
    pub fn source_name(&self) -> Option<String> {
        if let Some(name) = self.content_source_name.as_deref().filter(|s| !s.is_empty()) {
            return Some(name.to_string());
        }

        let metadata = self.metadata.as_ref()?;
        SOURCE_METADATA_KEYS
            .iter()
            .filter_map(|key| metadata.get(*key))
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// 검색 응답
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total: Option<u64>,
    pub search_time_ms: Option<f64>,
    pub query_time_ms: Option<f64>,
}

impl SearchResponse {
    /// 지연 시간 (search_time_ms → query_time_ms)
    pub fn latency_ms(&self) -> Option<f64> {
        self.search_time_ms.or(self.query_time_ms)
    }
}

// ============================================================================
// ApiClient: Search
// ============================================================================

impl ApiClient {
    /// BM25 텍스트 검색
    pub async fn text_search(&self, request: &TextSearchRequest) -> Result<SearchResponse> {
        self.post_json("Text search", &["api", "v1", "search", "text"], request)
            .await
    }

    /// 하이브리드 검색
    pub async fn hybrid_search(&self, request: &HybridSearchRequest) -> Result<SearchResponse> {
        self.post_json("Hybrid search", &["api", "v1", "search", "hybrid"], request)
            .await
    }

    /// 시맨틱 검색
    pub async fn semantic_search(&self, request: &SemanticSearchRequest) -> Result<SearchResponse> {
        self.post_json("Semantic search", &["api", "v1", "search", "semantic"], request)
            .await
    }

    /// 텍스트 기반 시맨틱 검색
    pub async fn semantic_text_search(
        &self,
        request: &SemanticTextSearchRequest,
    ) -> Result<SearchResponse> {
        self.post_json(
            "Semantic text search",
            &["api", "v1", "search", "semantic", "text"],
            request,
        )
        .await
    }

    /// 특정 청크와 유사한 청크
    pub async fn similar_chunks(&self, chunk_id: &str, query: &SimilarQuery) -> Result<SearchResponse> {
        self.get_json(
            "Find similar chunks",
            &["api", "v1", "search", "similar", chunk_id],
            query,
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================
