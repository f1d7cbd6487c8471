//! 검색 전략과 프리셋

use std::fmt;

use crate::backend::{FusionMethod, RagStrategy};

use super::CalibrationParams;

/// 검색 전략 (비교 화면의 열 하나)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Strategy {
    Text,
    Hybrid,
    Semantic,
    Cognee,
    Hippo,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Text,
        Strategy::Hybrid,
        Strategy::Semantic,
        Strategy::Cognee,
        Strategy::Hippo,
    ];

    /// 비교 기본 열
    pub const DEFAULT_COLUMNS: [Strategy; 3] =
        [Strategy::Text, Strategy::Hybrid, Strategy::Semantic];

    pub fn key(&self) -> &'static str {
        match self {
            Strategy::Text => "text",
            Strategy::Hybrid => "hybrid",
            Strategy::Semantic => "semantic",
            Strategy::Cognee => "cognee",
            Strategy::Hippo => "hippo",
        }
    }

    /// 열 제목
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Text => "BM25 Text",
            Strategy::Hybrid => "Hybrid",
            Strategy::Semantic => "Semantic",
            Strategy::Cognee => "Cognee",
            Strategy::Hippo => "HippoRAG",
        }
    }

    /// 열 부제 (현재 파라미터 반영)
    pub fn subtitle(&self, params: &CalibrationParams) -> String {
        match self {
            Strategy::Text => "BM25".to_string(),
            Strategy::Hybrid => match params.fusion {
                FusionMethod::Rrf => "RRF".to_string(),
                FusionMethod::WeightedSum => {
                    let (v, t) = params.weights.effective(params.fusion);
                    format!("V{}/T{}", v, t)
                }
            },
            Strategy::Semantic if params.rerank => "RERANK".to_string(),
            Strategy::Semantic => String::new(),
            Strategy::Cognee => format!("{:?}", params.cognee_search_type).to_uppercase(),
            Strategy::Hippo => "PPR M-HOP".to_string(),
        }
    }

    /// 하이브리드 점수를 쓰는 전략인지
    pub fn uses_hybrid_score(&self) -> bool {
        matches!(self, Strategy::Hybrid)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Presets
// ============================================================================

/// 빠른 프리셋
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    Fast,
    Balanced,
    Thorough,
    #[value(name = "graphrag")]
    GraphRag,
}

impl Preset {
    /// 파라미터에 프리셋 적용 후 포커스할 전략 반환
    ///
    /// 프리셋이 언급하지 않는 파라미터는 그대로 둡니다.
    pub fn apply(&self, params: &mut CalibrationParams) -> Strategy {
        match self {
            Preset::Fast => {
                params.set_top_k(10);
                Strategy::Text
            }
            Preset::Balanced => {
                params.weights.set_vector(0.7);
                params.fusion = FusionMethod::WeightedSum;
                params.set_top_k(25);
                Strategy::Hybrid
            }
            Preset::Thorough => {
                params.rerank = true;
                params.deduplicate = true;
                params.include_context = true;
                params.set_top_k(50);
                Strategy::Semantic
            }
            Preset::GraphRag => {
                params.set_top_k(10);
                Strategy::Hippo
            }
        }
    }

    /// 프리셋에 대응하는 RAG 전략
    pub fn rag_strategy(&self) -> RagStrategy {
        match self {
            Preset::Fast => RagStrategy::Fast,
            Preset::Balanced | Preset::GraphRag => RagStrategy::Balanced,
            Preset::Thorough => RagStrategy::Thorough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let mut params = CalibrationParams::default();
        params.weights.set_vector(0.2);
        params.fusion = FusionMethod::Rrf;

        assert_eq!(Preset::Fast.apply(&mut params), Strategy::Text);
        assert_eq!(params.top_k, 10);
        assert_eq!(params.fusion, FusionMethod::Rrf);

        assert_eq!(Preset::Balanced.apply(&mut params), Strategy::Hybrid);
        assert_eq!(params.top_k, 25);
        assert_eq!(params.weights.vector(), 0.7);
        assert_eq!(params.fusion, FusionMethod::WeightedSum);

        assert_eq!(Preset::Thorough.apply(&mut params), Strategy::Semantic);
        assert_eq!(params.top_k, 50);
        assert!(params.rerank && params.deduplicate && params.include_context);
        assert!(params.semantic_via_text);

        assert_eq!(Preset::GraphRag.apply(&mut params), Strategy::Hippo);
        assert_eq!(params.top_k, 10);
        assert!(params.deduplicate);
    }

    #[test]
    fn test_hybrid_subtitle() {
        let mut params = CalibrationParams::default();
        assert_eq!(Strategy::Hybrid.subtitle(&params), "V0.7/T0.3");

        params.fusion = FusionMethod::Rrf;
        assert_eq!(Strategy::Hybrid.subtitle(&params), "RRF");

        params.weights.set_vector(1.0);
        params.fusion = FusionMethod::WeightedSum;
        assert_eq!(Strategy::Hybrid.subtitle(&params), "V1/T0");
    }

    #[test]
    fn test_other_subtitles() {
        let mut params = CalibrationParams::default();
        assert_eq!(Strategy::Semantic.subtitle(&params), "RERANK");
        params.rerank = false;
        assert_eq!(Strategy::Semantic.subtitle(&params), "");
        assert_eq!(Strategy::Cognee.subtitle(&params), "HYBRID");
        assert_eq!(Strategy::Text.label(), "BM25 Text");
    }
}
