//! 쿼리 분류 휴리스틱
//!
//! 백엔드 분류기를 호출하지 않는 로컬 추정치입니다.
//! 대소문자 무시, 부분 문자열 일치.

use std::fmt;

/// 쿼리 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Factual,
    Analytical,
    Vague,
    Unknown,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryType::Factual => "factual",
            QueryType::Analytical => "analytical",
            QueryType::Vague => "vague",
            QueryType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// 분류 결과
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryClass {
    pub kind: QueryType,
    pub confidence: f64,
}

impl QueryClass {
    const UNKNOWN: QueryClass = QueryClass {
        kind: QueryType::Unknown,
        confidence: 0.0,
    };

    /// 배지 표시 여부 (unknown은 숨김)
    pub fn is_known(&self) -> bool {
        self.kind != QueryType::Unknown
    }

    /// `FACTUAL 92%` 형식
    pub fn badge(&self) -> String {
        format!(
            "{} {}%",
            self.kind.to_string().to_uppercase(),
            (self.confidence * 100.0).round()
        )
    }
}

const FACTUAL_TERMS: [&str; 3] = ["what", "who", "when"];
const ANALYTICAL_TERMS: [&str; 3] = ["why", "how", "compare"];
/// 이보다 짧으면 vague
const VAGUE_MAX_CHARS: usize = 15;

/// 쿼리 분류
pub fn classify(query: &str) -> QueryClass {
    let lower = query.to_lowercase();
    if lower.is_empty() {
        return QueryClass::UNKNOWN;
    }

    if FACTUAL_TERMS.iter().any(|t| lower.contains(t)) {
        return QueryClass {
            kind: QueryType::Factual,
            confidence: 0.92,
        };
    }
    if ANALYTICAL_TERMS.iter().any(|t| lower.contains(t)) {
        return QueryClass {
            kind: QueryType::Analytical,
            confidence: 0.84,
        };
    }
    if lower.chars().count() < VAGUE_MAX_CHARS {
        return QueryClass {
            kind: QueryType::Vague,
            confidence: 0.76,
        };
    }

    QueryClass::UNKNOWN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("").kind, QueryType::Unknown);
        assert_eq!(classify("").confidence, 0.0);

        let c = classify("What is the refund policy?");
        assert_eq!(c.kind, QueryType::Factual);
        assert_eq!(c.confidence, 0.92);

        assert_eq!(classify("HOW does ingestion scale").kind, QueryType::Analytical);
        assert_eq!(classify("somehow").kind, QueryType::Analytical);
        assert_eq!(classify("invoices").kind, QueryType::Vague);
        assert_eq!(
            classify("quarterly revenue figures for emea").kind,
            QueryType::Unknown
        );
    }

    #[test]
    fn test_factual_wins_over_analytical() {
        assert_eq!(classify("why and when").kind, QueryType::Factual);
    }

    #[test]
    fn test_badge() {
        assert_eq!(classify("who").badge(), "FACTUAL 92%");
        assert!(!classify("a long enough unmatched query").is_known());
    }
}
