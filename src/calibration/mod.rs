//! Calibration 모듈 - 검색 파라미터 매핑과 전략 비교
//!
//! 랭킹은 전부 백엔드가 하고, 여기서는 다음만 담당합니다:
//! - 벡터/텍스트 가중치 정규화, RRF 유효 가중치
//! - 프리셋 적용
//! - 전략별 요청 생성과 응답 정규화
//! - 여러 전략 동시 실행 (열 단위 독립 결과)
//!
//! ## 사용법
//! ```rust,ignore
//! let mut params = CalibrationParams::default();
//! Preset::Balanced.apply(&mut params);
//! let retrievers = retrievers_for(&client, &Strategy::DEFAULT_COLUMNS);
//! let report = compare(&retrievers, &params, "what is hybrid search").await;
//! ```

mod classify;
mod retriever;
mod strategy;
mod weights;

pub use classify::{classify, QueryClass, QueryType};
pub use retriever::{
    compare, retriever_for, retrievers_for, CogneeRetriever, ColumnResult, CompareReport,
    HippoRetriever, HybridRetriever, RankedHit, Retriever, SemanticRetriever, StrategyOutcome,
    TextRetriever,
};
pub use strategy::{Preset, Strategy};
pub use weights::{round2, HybridWeights, DEFAULT_VECTOR_WEIGHT, RRF_WEIGHT};

pub use crate::backend::FusionMethod;

use crate::backend::{
    CogneeSearchRequest, CogneeSearchType, HippoRetrieveRequest, HybridSearchRequest,
    RagQueryRequest, RagStrategy, SearchFilters, SemanticSearchRequest,
    SemanticTextSearchRequest, TextSearchRequest,
};

/// top_k 범위
pub const TOP_K_MIN: u32 = 1;
pub const TOP_K_MAX: u32 = 100;
/// 기본 top_k
pub const DEFAULT_TOP_K: u32 = 25;
/// 기본 최소 유사도
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.5;
/// RAG 요청 top_k
pub const RAG_TOP_K: u32 = 5;
/// BM25 분석기 언어
const TEXT_LANGUAGE: &str = "english";

// ============================================================================
// CalibrationParams
// ============================================================================

/// 검색 파라미터 묶음
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationParams {
    pub top_k: u32,
    /// 잡 ID 필터 (공백이면 전송하지 않음)
    pub job_filter: Option<String>,
    pub weights: HybridWeights,
    pub min_similarity: f64,
    pub fusion: FusionMethod,
    pub rerank: bool,
    pub deduplicate: bool,
    pub include_context: bool,
    /// 시맨틱 열이 `/search/semantic/text`를 쓰는지 (false면 `/search/semantic`)
    pub semantic_via_text: bool,
    pub cognee_search_type: CogneeSearchType,
    /// Cognee/HippoRAG 데이터셋
    pub graph_dataset: Option<String>,
    pub rag_strategy: RagStrategy,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            job_filter: None,
            weights: HybridWeights::default(),
            min_similarity: DEFAULT_MIN_SIMILARITY,
            fusion: FusionMethod::WeightedSum,
            rerank: true,
            deduplicate: false,
            include_context: false,
            semantic_via_text: true,
            cognee_search_type: CogneeSearchType::Hybrid,
            graph_dataset: None,
            rag_strategy: RagStrategy::Balanced,
        }
    }
}

impl CalibrationParams {
    /// top_k 설정 (1..=100으로 제한)
    pub fn set_top_k(&mut self, top_k: u32) {
        self.top_k = top_k.clamp(TOP_K_MIN, TOP_K_MAX);
    }

    /// 최소 유사도 설정 ([0, 1]로 제한)
    pub fn set_min_similarity(&mut self, value: f64) {
        self.min_similarity = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    }

    fn filters(&self) -> Option<SearchFilters> {
        SearchFilters::for_job(self.job_filter.as_deref())
    }

    fn dataset(&self) -> Option<String> {
        self.graph_dataset
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    // ------------------------------------------------------------------------
    // Request builders
    // ------------------------------------------------------------------------

    pub fn text_request(&self, query: &str) -> TextSearchRequest {
        TextSearchRequest {
            query: query.to_string(),
            top_k: self.top_k,
            language: TEXT_LANGUAGE.to_string(),
            use_fuzzy: true,
            highlight: true,
            filters: self.filters(),
        }
    }

    pub fn hybrid_request(&self, query: &str) -> HybridSearchRequest {
        let (vector_weight, text_weight) = self.weights.effective(self.fusion);
        HybridSearchRequest {
            query: query.to_string(),
            top_k: self.top_k,
            vector_weight: round2(vector_weight),
            text_weight: round2(text_weight),
            fusion_method: self.fusion,
            min_similarity: self.min_similarity,
            filters: self.filters(),
        }
    }

    pub fn semantic_request(&self, query: &str) -> SemanticSearchRequest {
        SemanticSearchRequest {
            query: query.to_string(),
            top_k: self.top_k,
            min_similarity: self.min_similarity,
            filters: self.filters(),
            rerank: Some(self.rerank),
            deduplicate: Some(self.deduplicate),
            include_context: Some(self.include_context),
        }
    }

    pub fn semantic_text_request(&self, query: &str) -> SemanticTextSearchRequest {
        SemanticTextSearchRequest {
            query: query.to_string(),
            top_k: self.top_k,
            min_similarity: self.min_similarity,
            filters: self.filters(),
        }
    }

    pub fn cognee_request(&self, query: &str) -> CogneeSearchRequest {
        CogneeSearchRequest {
            query: query.to_string(),
            search_type: self.cognee_search_type,
            top_k: self.top_k,
            dataset_id: self.dataset(),
        }
    }

    pub fn hippo_request(&self, query: &str) -> HippoRetrieveRequest {
        HippoRetrieveRequest {
            queries: vec![query.to_string()],
            dataset_id: self.dataset(),
            num_to_retrieve: Some(self.top_k),
            include_metadata: None,
        }
    }

    pub fn rag_request(&self, query: &str) -> RagQueryRequest {
        RagQueryRequest {
            query: query.to_string(),
            strategy: self.rag_strategy,
            context: None,
            filters: self.filters(),
            top_k: Some(RAG_TOP_K),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let params = CalibrationParams::default();
        assert_eq!(params.top_k, 25);
        assert_eq!(params.min_similarity, 0.5);
        assert_eq!(params.weights.vector(), 0.7);
        assert!(params.rerank);
        assert!(!params.deduplicate);
    }

    #[test]
    fn test_top_k_and_similarity_clamped() {
        let mut params = CalibrationParams::default();
        params.set_top_k(0);
        assert_eq!(params.top_k, 1);
        params.set_top_k(500);
        assert_eq!(params.top_k, 100);
        params.set_min_similarity(1.7);
        assert_eq!(params.min_similarity, 1.0);
    }

    #[test]
    fn test_hybrid_request_weights() {
        let mut params = CalibrationParams::default();
        params.weights.set_vector(0.62);

        let request = params.hybrid_request("q");
        assert_eq!(request.vector_weight, 0.62);
        assert_eq!(request.text_weight, 0.38);
        assert_eq!(request.fusion_method, FusionMethod::WeightedSum);

        params.fusion = FusionMethod::Rrf;
        let value = serde_json::to_value(params.hybrid_request("q")).unwrap();
        assert_eq!(value["vector_weight"], json!(0.5));
        assert_eq!(value["text_weight"], json!(0.5));
        assert_eq!(value["fusion_method"], json!("rrf"));
    }

    #[test]
    fn test_job_filter_trimmed_or_omitted() {
        let mut params = CalibrationParams::default();
        params.job_filter = Some("   ".to_string());
        let value = serde_json::to_value(params.text_request("q")).unwrap();
        assert!(value.get("filters").is_none());

        params.job_filter = Some(" job-9 ".to_string());
        let value = serde_json::to_value(params.semantic_text_request("q")).unwrap();
        assert_eq!(value["filters"], json!({"job_id": "job-9"}));
    }

    #[test]
    fn test_text_request_fixed_fields() {
        let value = serde_json::to_value(CalibrationParams::default().text_request("refunds")).unwrap();
        assert_eq!(
            value,
            json!({"query": "refunds", "top_k": 25, "language": "english", "use_fuzzy": true, "highlight": true})
        );
    }

    #[test]
    fn test_graph_requests() {
        let mut params = CalibrationParams::default();
        params.set_top_k(12);
        params.graph_dataset = Some("papers".to_string());

        let hippo = params.hippo_request("who wrote it");
        assert_eq!(hippo.queries, vec!["who wrote it".to_string()]);
        assert_eq!(hippo.num_to_retrieve, Some(12));
        assert_eq!(hippo.dataset_id.as_deref(), Some("papers"));

        params.graph_dataset = Some(String::new());
        assert_eq!(params.cognee_request("q").dataset_id, None);
    }

    #[test]
    fn test_rag_request_uses_five_sources() {
        let params = CalibrationParams::default();
        let request = params.rag_request("why");
        assert_eq!(request.top_k, Some(5));
        assert_eq!(request.strategy, RagStrategy::Balanced);
    }
}
