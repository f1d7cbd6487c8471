//! 그래프 백엔드 API - Cognee 검색, HippoRAG 멀티홉 검색/QA

use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::{ConsoleError, Result};

// ============================================================================
// Cognee
// ============================================================================

/// Cognee 검색 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CogneeSearchType {
    Vector,
    Graph,
    #[default]
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CogneeSearchRequest {
    pub query: String,
    pub search_type: CogneeSearchType,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CogneeHit {
    pub chunk_id: String,
    pub content: String,
    pub score: Option<f64>,
    pub source_document: Option<String>,
    pub entities: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CogneeSearchResponse {
    pub results: Vec<CogneeHit>,
    pub search_type: Option<String>,
    pub dataset_id: Option<String>,
    pub query_time_ms: Option<f64>,
}

// ============================================================================
// HippoRAG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HippoRetrieveRequest {
    pub queries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_to_retrieve: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_metadata: Option<bool>,
}

/// 쿼리 하나의 검색 결과 (passages/scores/source_documents는 같은 인덱스끼리 대응)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HippoRetrievalResult {
    pub query: String,
    pub passages: Vec<String>,
    pub scores: Vec<f64>,
    pub source_documents: Vec<String>,
    pub entities: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HippoRetrieveResponse {
    pub results: Vec<HippoRetrievalResult>,
    pub query_time_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HippoQaRequest {
    pub queries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_to_retrieve: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_answer: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HippoQaResult {
    pub query: String,
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: Option<f64>,
    pub retrieval_results: HippoRetrievalResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HippoQaResponse {
    pub results: Vec<HippoQaResult>,
    pub total_tokens: Option<u64>,
    pub query_time_ms: Option<f64>,
}

fn require_queries(queries: &[String]) -> Result<()> {
    if queries.iter().all(|q| q.trim().is_empty()) {
        return Err(ConsoleError::InvalidInput(
            "At least one query is required".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// ApiClient: Graph backends
// ============================================================================

impl ApiClient {
    /// Cognee 지식 그래프 검색
    pub async fn cognee_search(&self, request: &CogneeSearchRequest) -> Result<CogneeSearchResponse> {
        self.post_json("Cognee search", &["api", "v1", "cognee", "search"], request)
            .await
    }

    /// HippoRAG 멀티홉 검색
    pub async fn hipporag_retrieve(
        &self,
        request: &HippoRetrieveRequest,
    ) -> Result<HippoRetrieveResponse> {
        require_queries(&request.queries)?;
        self.post_json(
            "HippoRAG retrieve",
            &["api", "v1", "hipporag", "retrieve"],
            request,
        )
        .await
    }

    /// HippoRAG 질의응답
    pub async fn hipporag_qa(&self, request: &HippoQaRequest) -> Result<HippoQaResponse> {
        require_queries(&request.queries)?;
        self.post_json("HippoRAG QA", &["api", "v1", "hipporag", "qa"], request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cognee_request_wire_format() {
        let request = CogneeSearchRequest {
            query: "who founded it".to_string(),
            search_type: CogneeSearchType::Graph,
            top_k: 10,
            dataset_id: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"query": "who founded it", "search_type": "graph", "top_k": 10})
        );
    }

    #[test]
    fn test_hippo_qa_response_parse() {
        let response: HippoQaResponse = serde_json::from_value(json!({
            "results": [{
                "query": "q",
                "answer": "42",
                "sources": ["doc-a"],
                "confidence": 0.8,
                "retrieval_results": {
                    "query": "q",
                    "passages": ["p1", "p2"],
                    "scores": [0.9, 0.4],
                    "source_documents": ["doc-a", "doc-b"],
                    "entities": []
                }
            }],
            "total_tokens": 300,
            "query_time_ms": 812.0
        }))
        .unwrap();

        assert_eq!(response.results[0].answer, "42");
        assert_eq!(response.results[0].retrieval_results.passages.len(), 2);
        assert_eq!(response.total_tokens, Some(300));
    }

    #[test]
    fn test_require_queries() {
        assert!(require_queries(&[]).is_err());
        assert!(require_queries(&[" ".to_string()]).is_err());
        assert!(require_queries(&["q".to_string()]).is_ok());
    }
}
