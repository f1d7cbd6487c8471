//! 전략별 검색기와 나란히 비교
//!
//! 각 검색기는 백엔드 응답을 `RankedHit` 목록으로 정규화합니다.
//! 비교 실행은 열마다 요청 하나씩 동시에 보내고, 열별 결과를 따로 보관합니다.

use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;

use crate::backend::{
    ApiClient, CogneeSearchResponse, HippoRetrieveResponse, SearchHit, SearchResponse,
};
use crate::error::Result;

use super::classify::{classify, QueryClass};
use super::{CalibrationParams, Strategy};

// ============================================================================
// Types
// ============================================================================

/// 정규화된 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit {
    /// 청크 ID (Hippo는 `hippo-<i>`)
    pub chunk_id: String,
    pub job_id: Option<String>,
    /// 1부터 시작
    pub rank: u32,
    pub content: String,
    /// 하이라이트 태그가 포함된 본문 (BM25)
    pub highlighted: Option<String>,
    /// 표시 점수 (하이브리드는 hybrid_score, 그 외는 similarity_score)
    pub score: Option<f64>,
    /// 소스 문서 이름
    pub source: Option<String>,
    pub matched_terms: Vec<String>,
}

impl RankedHit {
    /// 검색 API 결과에서 변환
    pub fn from_search_hit(hit: &SearchHit, index: usize, strategy: Strategy) -> Self {
        let score = if strategy.uses_hybrid_score() {
            hit.hybrid_score.or(hit.score)
        } else {
            hit.similarity_score.or(hit.score)
        };

        Self {
            chunk_id: hit
                .chunk_id()
                .map(str::to_string)
                .unwrap_or_else(|| format!("result-{}", index)),
            job_id: hit.job_id.clone(),
            rank: hit.rank.unwrap_or(index as u32 + 1),
            content: hit.body().to_string(),
            highlighted: hit.highlighted_content.clone(),
            score,
            source: hit.source_name(),
            matched_terms: hit.matched_terms.clone().unwrap_or_default(),
        }
    }
}

/// 전략 하나의 실행 결과
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    pub hits: Vec<RankedHit>,
    /// 백엔드 보고 지연 시간
    pub latency_ms: Option<f64>,
}

impl StrategyOutcome {
    /// 검색 API 응답에서 변환
    pub fn from_search(strategy: Strategy, response: &SearchResponse) -> Self {
        let hits = response
            .results
            .iter()
            .enumerate()
            .map(|(i, hit)| RankedHit::from_search_hit(hit, i, strategy))
            .collect();

        Self {
            strategy,
            hits,
            latency_ms: response.latency_ms(),
        }
    }

    /// Cognee 응답에서 변환 (`score`를 유사도로 사용)
    pub fn from_cognee(response: &CogneeSearchResponse) -> Self {
        let hits = response
            .results
            .iter()
            .enumerate()
            .map(|(i, hit)| RankedHit {
                chunk_id: hit.chunk_id.clone(),
                job_id: None,
                rank: i as u32 + 1,
                content: hit.content.clone(),
                highlighted: None,
                score: hit.score,
                source: hit.source_document.clone().filter(|s| !s.is_empty()),
                matched_terms: hit.entities.clone(),
            })
            .collect();

        Self {
            strategy: Strategy::Cognee,
            hits,
            latency_ms: response.query_time_ms,
        }
    }

    /// HippoRAG 응답에서 변환 (첫 번째 쿼리 결과만 사용)
    pub fn from_hippo(response: &HippoRetrieveResponse) -> Self {
        let hits = match response.results.first() {
            Some(first) => first
                .passages
                .iter()
                .enumerate()
                .map(|(i, passage)| RankedHit {
                    chunk_id: format!("hippo-{}", i),
                    job_id: None,
                    rank: i as u32 + 1,
                    content: passage.clone(),
                    highlighted: None,
                    score: first.scores.get(i).copied(),
                    source: first.source_documents.get(i).cloned(),
                    matched_terms: Vec::new(),
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            strategy: Strategy::Hippo,
            hits,
            latency_ms: response.query_time_ms,
        }
    }
}

// ============================================================================
// Retriever trait
// ============================================================================

/// 검색 전략 하나를 실행하는 검색기
#[async_trait]
pub trait Retriever: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn retrieve(&self, params: &CalibrationParams, query: &str) -> Result<StrategyOutcome>;
}

/// BM25 텍스트 검색기
pub struct TextRetriever {
    client: ApiClient,
}

impl TextRetriever {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Retriever for TextRetriever {
    fn strategy(&self) -> Strategy {
        Strategy::Text
    }

    async fn retrieve(&self, params: &CalibrationParams, query: &str) -> Result<StrategyOutcome> {
        let response = self.client.text_search(&params.text_request(query)).await?;
        Ok(StrategyOutcome::from_search(Strategy::Text, &response))
    }
}

/// 하이브리드 검색기
pub struct HybridRetriever {
    client: ApiClient,
}

impl HybridRetriever {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    fn strategy(&self) -> Strategy {
        Strategy::Hybrid
    }

    async fn retrieve(&self, params: &CalibrationParams, query: &str) -> Result<StrategyOutcome> {
        let response = self
            .client
            .hybrid_search(&params.hybrid_request(query))
            .await?;
        Ok(StrategyOutcome::from_search(Strategy::Hybrid, &response))
    }
}

/// 시맨틱 검색기
pub struct SemanticRetriever {
    client: ApiClient,
}

impl SemanticRetriever {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Retriever for SemanticRetriever {
    fn strategy(&self) -> Strategy {
        Strategy::Semantic
    }

    async fn retrieve(&self, params: &CalibrationParams, query: &str) -> Result<StrategyOutcome> {
        let response = if params.semantic_via_text {
            self.client
                .semantic_text_search(&params.semantic_text_request(query))
                .await?
        } else {
            self.client
                .semantic_search(&params.semantic_request(query))
                .await?
        };
        Ok(StrategyOutcome::from_search(Strategy::Semantic, &response))
    }
}

/// Cognee 그래프 검색기
pub struct CogneeRetriever {
    client: ApiClient,
}

impl CogneeRetriever {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Retriever for CogneeRetriever {
    fn strategy(&self) -> Strategy {
        Strategy::Cognee
    }

    async fn retrieve(&self, params: &CalibrationParams, query: &str) -> Result<StrategyOutcome> {
        let response = self
            .client
            .cognee_search(&params.cognee_request(query))
            .await?;
        Ok(StrategyOutcome::from_cognee(&response))
    }
}

/// HippoRAG 멀티홉 검색기
pub struct HippoRetriever {
    client: ApiClient,
}

impl HippoRetriever {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Retriever for HippoRetriever {
    fn strategy(&self) -> Strategy {
        Strategy::Hippo
    }

    async fn retrieve(&self, params: &CalibrationParams, query: &str) -> Result<StrategyOutcome> {
        let response = self
            .client
            .hipporag_retrieve(&params.hippo_request(query))
            .await?;
        Ok(StrategyOutcome::from_hippo(&response))
    }
}

/// 전략에 맞는 검색기 생성
pub fn retriever_for(client: &ApiClient, strategy: Strategy) -> Box<dyn Retriever> {
    let client = client.clone();
    match strategy {
        Strategy::Text => Box::new(TextRetriever::new(client)),
        Strategy::Hybrid => Box::new(HybridRetriever::new(client)),
        Strategy::Semantic => Box::new(SemanticRetriever::new(client)),
        Strategy::Cognee => Box::new(CogneeRetriever::new(client)),
        Strategy::Hippo => Box::new(HippoRetriever::new(client)),
    }
}

/// 여러 전략의 검색기 생성 (순서 유지)
pub fn retrievers_for(client: &ApiClient, strategies: &[Strategy]) -> Vec<Box<dyn Retriever>> {
    strategies
        .iter()
        .map(|s| retriever_for(client, *s))
        .collect()
}

// ============================================================================
// Compare
// ============================================================================

/// 비교 열 하나
#[derive(Debug)]
pub struct ColumnResult {
    pub strategy: Strategy,
    pub subtitle: String,
    /// 클라이언트에서 잰 왕복 시간
    pub elapsed_ms: u128,
    pub outcome: Result<StrategyOutcome>,
}

impl ColumnResult {
    /// 표시할 지연 시간 (백엔드 보고값 우선, 없으면 왕복 시간)
    pub fn latency_ms(&self) -> Option<f64> {
        let outcome = self.outcome.as_ref().ok()?;
        Some(outcome.latency_ms.unwrap_or(self.elapsed_ms as f64))
    }
}

/// 비교 실행 결과
#[derive(Debug)]
pub struct CompareReport {
    pub query: String,
    pub classification: QueryClass,
    pub columns: Vec<ColumnResult>,
}

impl CompareReport {
    pub fn succeeded(&self) -> usize {
        self.columns.iter().filter(|c| c.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.columns.len() - self.succeeded()
    }
}

/// 모든 검색기를 동시에 실행
///
/// 빈 쿼리는 요청을 보내지 않습니다. 한 열의 실패는 다른 열에 영향을 주지 않고,
/// 열 순서는 `retrievers` 순서를 따릅니다.
pub async fn compare(
    retrievers: &[Box<dyn Retriever>],
    params: &CalibrationParams,
    query: &str,
) -> CompareReport {
    let classification = classify(query);

    if query.trim().is_empty() {
        return CompareReport {
            query: query.to_string(),
            classification,
            columns: Vec::new(),
        };
    }

    let runs = retrievers.iter().map(|retriever| async move {
        let strategy = retriever.strategy();
        let started = Instant::now();
        let outcome = retriever.retrieve(params, query).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &outcome {
            Ok(o) => tracing::debug!("{} returned {} hits in {}ms", strategy, o.hits.len(), elapsed_ms),
            Err(e) => tracing::warn!("{} search failed: {}", strategy, e),
        }

        ColumnResult {
            strategy,
            subtitle: strategy.subtitle(params),
            elapsed_ms,
            outcome,
        }
    });

    let columns = join_all(runs).await;

    CompareReport {
        query: query.to_string(),
        classification,
        columns,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CogneeHit, HippoRetrievalResult};
    use crate::error::ConsoleError;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FakeRetriever {
        strategy: Strategy,
        fail: bool,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Retriever for FakeRetriever {
        fn strategy(&self) -> Strategy {
            self.strategy
        }

        async fn retrieve(&self, _params: &CalibrationParams, query: &str) -> Result<StrategyOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ConsoleError::Http {
                    status: 500,
                    message: "index offline".to_string(),
                });
            }
            Ok(StrategyOutcome {
                strategy: self.strategy,
                hits: vec![RankedHit {
                    chunk_id: query.to_string(),
                    job_id: None,
                    rank: 1,
                    content: String::new(),
                    highlighted: None,
                    score: Some(0.5),
                    source: None,
                    matched_terms: Vec::new(),
                }],
                latency_ms: Some(4.0),
            })
        }
    }

    fn fake(strategy: Strategy, fail: bool, calls: &Arc<AtomicU32>) -> Box<dyn Retriever> {
        Box::new(FakeRetriever {
            strategy,
            fail,
            calls: Arc::clone(calls),
        })
    }

    #[test]
    fn test_score_selection() {
        let hit: SearchHit = serde_json::from_value(json!({
            "chunk_id": "c1", "score": 0.1, "hybrid_score": 0.8, "similarity_score": 0.6
        }))
        .unwrap();

        assert_eq!(RankedHit::from_search_hit(&hit, 0, Strategy::Hybrid).score, Some(0.8));
        assert_eq!(RankedHit::from_search_hit(&hit, 0, Strategy::Semantic).score, Some(0.6));

        let hit: SearchHit = serde_json::from_value(json!({"id": "c2", "score": 0.3})).unwrap();
        let ranked = RankedHit::from_search_hit(&hit, 4, Strategy::Hybrid);
        assert_eq!(ranked.score, Some(0.3));
        assert_eq!(ranked.chunk_id, "c2");
        assert_eq!(ranked.rank, 5);
    }

    #[test]
    fn test_cognee_score_is_similarity() {
        let response = CogneeSearchResponse {
            results: vec![CogneeHit {
                chunk_id: "n1".to_string(),
                content: "entity text".to_string(),
                score: Some(0.77),
                source_document: Some("wiki.md".to_string()),
                entities: vec!["Acme".to_string()],
            }],
            query_time_ms: Some(20.0),
            ..Default::default()
        };

        let outcome = StrategyOutcome::from_cognee(&response);
        assert_eq!(outcome.hits[0].score, Some(0.77));
        assert_eq!(outcome.hits[0].source.as_deref(), Some("wiki.md"));
        assert_eq!(outcome.latency_ms, Some(20.0));
    }

    #[test]
    fn test_hippo_passages_become_hits() {
        let response = HippoRetrieveResponse {
            results: vec![HippoRetrievalResult {
                query: "q".to_string(),
                passages: vec!["p0".to_string(), "p1".to_string()],
                scores: vec![0.9],
                source_documents: vec!["a.pdf".to_string(), "b.pdf".to_string()],
                entities: Vec::new(),
            }],
            query_time_ms: None,
        };

        let outcome = StrategyOutcome::from_hippo(&response);
        assert_eq!(outcome.hits.len(), 2);
        assert_eq!(outcome.hits[1].chunk_id, "hippo-1");
        assert_eq!(outcome.hits[1].score, None);
        assert_eq!(outcome.hits[1].source.as_deref(), Some("b.pdf"));

        assert!(StrategyOutcome::from_hippo(&HippoRetrieveResponse::default()).hits.is_empty());
    }

    #[test]
    fn test_column_latency_falls_back_to_elapsed() {
        let column = |latency_ms: Option<f64>| ColumnResult {
            strategy: Strategy::Text,
            subtitle: String::new(),
            elapsed_ms: 87,
            outcome: Ok(StrategyOutcome {
                strategy: Strategy::Text,
                hits: Vec::new(),
                latency_ms,
            }),
        };
        assert_eq!(column(Some(12.5)).latency_ms(), Some(12.5));
        assert_eq!(column(None).latency_ms(), Some(87.0));

        let failed = ColumnResult {
            strategy: Strategy::Text,
            subtitle: String::new(),
            elapsed_ms: 87,
            outcome: Err(ConsoleError::InvalidInput("boom".to_string())),
        };
        assert_eq!(failed.latency_ms(), None);
    }

    #[tokio::test]
    async fn test_compare_blank_query_sends_nothing() {
        let calls = Arc::new(AtomicU32::new(0));
        let retrievers = vec![fake(Strategy::Text, false, &calls)];

        let report = compare(&retrievers, &CalibrationParams::default(), "   ").await;
        assert!(report.columns.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compare_isolates_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let retrievers = vec![
            fake(Strategy::Text, false, &calls),
            fake(Strategy::Hybrid, true, &calls),
            fake(Strategy::Semantic, false, &calls),
        ];

        let report = compare(&retrievers, &CalibrationParams::default(), "who").await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.columns.len(), 3);
        assert_eq!(report.columns[0].strategy, Strategy::Text);
        assert_eq!(report.columns[1].strategy, Strategy::Hybrid);
        assert!(report.columns[1].outcome.is_err());
        assert_eq!(report.columns[2].latency_ms(), Some(4.0));
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.columns[1].subtitle, "V0.7/T0.3");
    }
}
