//! RAG API - 검색 + 답변 생성

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::search::SearchFilters;
use super::ApiClient;
use crate::error::{ConsoleError, Result};

/// RAG 전략 (백엔드가 해석)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RagStrategy {
    Auto,
    Fast,
    #[default]
    Balanced,
    Thorough,
}

impl fmt::Display for RagStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RagStrategy::Auto => "auto",
            RagStrategy::Fast => "fast",
            RagStrategy::Balanced => "balanced",
            RagStrategy::Thorough => "thorough",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagQueryRequest {
    pub query: String,
    pub strategy: RagStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

/// 답변 근거 청크
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagSource {
    pub chunk_id: Option<String>,
    pub job_id: Option<String>,
    pub content: String,
    pub similarity_score: Option<f64>,
    pub rank: Option<u32>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagMetrics {
    pub latency_ms: Option<f64>,
    pub tokens_used: Option<u64>,
    pub retrieval_score: Option<f64>,
    pub classification_confidence: Option<f64>,
    pub chunks_retrieved: Option<u64>,
    pub chunks_used: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagQueryResponse {
    pub answer: String,
    pub sources: Vec<RagSource>,
    pub query_id: Option<String>,
    pub strategy_used: Option<String>,
    pub query_type: Option<String>,
    pub metrics: Option<RagMetrics>,
}

impl ApiClient {
    /// RAG 질의
    pub async fn rag_query(&self, request: &RagQueryRequest) -> Result<RagQueryResponse> {
        if request.query.trim().is_empty() {
            return Err(ConsoleError::InvalidInput("Query is required".to_string()));
        }
        self.post_json("RAG query", &["api", "v1", "rag", "query"], request)
            .await
    }
}
