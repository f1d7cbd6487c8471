//! 상태 API - 종합 헬스체크, 벡터 스토어 헬스체크

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ApiClient;
use crate::error::Result;

/// 구성 요소 상태
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentHealth {
    #[serde(default)]
    pub status: String,
    pub latency_ms: Option<f64>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 종합 헬스 리포트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    pub version: Option<String>,
    pub overall_healthy: Option<bool>,
    /// 이름순 정렬
    #[serde(default)]
    pub components: BTreeMap<String, ComponentHealth>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApiClient {
    /// 종합 헬스체크 (`/health`)
    pub async fn health(&self) -> Result<HealthReport> {
        self.get_json("Fetch health", &["health"], &()).await
    }

    /// 벡터 스토어 헬스체크 (`/health/vector`), 형식은 백엔드 그대로
    pub async fn vector_health(&self) -> Result<Value> {
        self.get_json("Fetch vector health", &["health", "vector"], &())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_health_report_parse() {
        let report: HealthReport = serde_json::from_value(json!({
            "status": "degraded",
            "version": "1.4.2",
            "overall_healthy": false,
            "components": {
                "postgres": {"status": "healthy", "latency_ms": 3.2},
                "redis": {"status": "down", "message": "connection refused"}
            },
            "uptime_seconds": 12
        }))
        .unwrap();

        assert_eq!(report.components.len(), 2);
        assert_eq!(report.components["redis"].message.as_deref(), Some("connection refused"));
        assert_eq!(report.extra.get("uptime_seconds"), Some(&json!(12)));
    }

    #[test]
    fn test_health_report_missing_components() {
        let report: HealthReport = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert!(report.components.is_empty());
        assert!(report.version.is_none());
    }
}
