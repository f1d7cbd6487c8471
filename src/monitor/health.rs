//! 헬스 리포트 요약 (토폴로지 화면)

use std::fmt;

use crate::backend::HealthReport;

/// 구성 요소 상태 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthClass {
    Healthy,
    Degraded,
    Down,
}

impl HealthClass {
    pub fn from_status(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "healthy" => HealthClass::Healthy,
            "degraded" => HealthClass::Degraded,
            _ => HealthClass::Down,
        }
    }

    /// CLI 출력 접두사
    pub fn marker(&self) -> &'static str {
        match self {
            HealthClass::Healthy => "[OK]",
            HealthClass::Degraded => "[~]",
            HealthClass::Down => "[!]",
        }
    }
}

impl fmt::Display for HealthClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthClass::Healthy => "healthy",
            HealthClass::Degraded => "degraded",
            HealthClass::Down => "down",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSummary {
    pub name: String,
    pub status: String,
    pub class: HealthClass,
    pub latency_ms: Option<f64>,
    pub message: Option<String>,
}

/// 헬스 요약
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSummary {
    pub status: String,
    pub version: Option<String>,
    pub components: Vec<ComponentSummary>,
}

impl HealthSummary {
    pub fn from_report(report: &HealthReport) -> Self {
        let components = report
            .components
            .iter()
            .map(|(name, c)| ComponentSummary {
                name: name.clone(),
                status: c.status.clone(),
                class: HealthClass::from_status(&c.status),
                latency_ms: c.latency_ms,
                message: c.message.clone(),
            })
            .collect();

        Self {
            status: if report.status.is_empty() {
                "—".to_string()
            } else {
                report.status.clone()
            },
            version: report.version.clone(),
            components,
        }
    }

    pub fn healthy_count(&self) -> usize {
        self.components
            .iter()
            .filter(|c| c.class == HealthClass::Healthy)
            .count()
    }

    /// `3/4` 형식
    pub fn healthy_ratio(&self) -> String {
        format!("{}/{}", self.healthy_count(), self.components.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary() {
        let report: HealthReport = serde_json::from_value(json!({
            "status": "degraded",
            "components": {
                "api": {"status": "healthy", "latency_ms": 1.0},
                "queue": {"status": "degraded"},
                "vector": {"status": "unhealthy", "message": "timeout"}
            }
        }))
        .unwrap();

        let summary = HealthSummary::from_report(&report);
        assert_eq!(summary.components.len(), 3);
        assert_eq!(summary.healthy_ratio(), "1/3");
        assert_eq!(summary.components[1].class, HealthClass::Degraded);
        assert_eq!(summary.components[2].class, HealthClass::Down);
    }

    #[test]
    fn test_empty_report() {
        let summary = HealthSummary::from_report(&HealthReport::default());
        assert_eq!(summary.status, "—");
        assert_eq!(summary.healthy_ratio(), "0/0");
    }
}
