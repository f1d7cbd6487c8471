//! Monitor 모듈 - 잡 큐 요약, 적응형 폴링, 삭제 대상
//!
//! - 진행 중인 잡이 있으면 3초, 없으면 30초 간격으로 폴링
//! - 상태별 집계
//! - 취소/하드 삭제, 일괄 삭제 선택

mod health;

pub use health::{ComponentSummary, HealthClass, HealthSummary};

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::backend::{ApiClient, BulkDeleteRequest, Job, JobPage, JobQuery};
use crate::error::Result;

/// 진행 중인 잡이 있을 때 폴링 간격
pub const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// 유휴 상태 폴링 간격
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// 다음 폴링까지 대기 시간
pub fn poll_interval(jobs: &[Job]) -> Duration {
    if jobs.iter().any(|job| job.status.is_active()) {
        ACTIVE_POLL_INTERVAL
    } else {
        IDLE_POLL_INTERVAL
    }
}

// ============================================================================
// JobBoard
// ============================================================================

/// 잡 목록 한 페이지의 요약
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobBoard {
    /// 백엔드 전체 잡 수
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    /// 이 페이지의 상태별 개수
    pub counts: BTreeMap<String, usize>,
    pub active: usize,
    pub failed: usize,
}

impl JobBoard {
    pub fn from_page(page: &JobPage) -> Self {
        let mut counts = BTreeMap::new();
        for job in &page.items {
            *counts.entry(job.status.to_string()).or_insert(0) += 1;
        }

        Self {
            total: page.total,
            page: page.page,
            limit: page.limit,
            active: page.items.iter().filter(|j| j.status.is_active()).count(),
            failed: counts.get("failed").copied().unwrap_or(0),
            counts,
        }
    }

    /// 전체 페이지 수
    pub fn page_count(&self) -> u64 {
        if self.limit == 0 {
            return 1;
        }
        self.total.div_ceil(self.limit).max(1)
    }
}

/// 생성 시각으로부터 경과 시간 (`45s`, `12m`, `3h`, `2d`)
pub fn job_age(created_at: &str, now: DateTime<Utc>) -> Option<String> {
    let created = DateTime::parse_from_rfc3339(created_at)
        .ok()?
        .with_timezone(&Utc);
    let secs = (now - created).num_seconds().max(0);

    let age = match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3_600),
        s => format!("{}d", s / 86_400),
    };
    Some(age)
}

// ============================================================================
// Delete
// ============================================================================

/// 삭제 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// 잡 취소 (소프트)
    Cancel,
    /// 잡과 청크까지 영구 삭제
    Hard,
}

/// 삭제 대상 잡
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTarget {
    pub id: String,
    pub mode: DeleteMode,
}

impl DeleteTarget {
    pub fn cancel(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode: DeleteMode::Cancel,
        }
    }

    pub fn hard(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode: DeleteMode::Hard,
        }
    }

    /// 확인 문구
    pub fn describe(&self) -> String {
        match self.mode {
            DeleteMode::Cancel => format!("Cancel job {}", self.id),
            DeleteMode::Hard => format!("Permanently delete job {} and all of its chunks", self.id),
        }
    }

    pub async fn execute(&self, client: &ApiClient) -> Result<()> {
        match self.mode {
            DeleteMode::Cancel => client.cancel_job(&self.id).await,
            DeleteMode::Hard => client.delete_job_hard(&self.id).await,
        }?;
        tracing::info!("{:?} completed for job {}", self.mode, self.id);
        Ok(())
    }
}

/// 일괄 삭제용 잡 선택
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 하나 선택/해제
    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    /// 보이는 잡이 모두 선택되어 있으면 전부 해제, 아니면 전부 선택
    pub fn toggle_all<S: AsRef<str>>(&mut self, visible: &[S]) {
        let all_selected =
            !visible.is_empty() && visible.iter().all(|id| self.ids.contains(id.as_ref()));

        if all_selected {
            self.ids.clear();
        } else {
            self.ids = visible.iter().map(|id| id.as_ref().to_string()).collect();
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn to_request(&self, dry_run: bool) -> BulkDeleteRequest {
        BulkDeleteRequest {
            job_ids: self.ids.iter().cloned().collect(),
            dry_run: dry_run.then_some(true),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Watch
// ============================================================================

/// 잡 목록을 반복 조회
///
/// 매 회차마다 `render`를 호출하고 `poll_interval`만큼 대기합니다.
/// `iterations`가 주어지면 그 횟수 후, 아니면 Ctrl-C에서 멈춥니다.
/// 조회 실패는 경고만 남기고 유휴 간격 후 다시 시도합니다.
pub async fn watch<F>(
    client: &ApiClient,
    query: &JobQuery,
    iterations: Option<u32>,
    mut render: F,
) -> Result<u32>
where
    F: FnMut(&JobPage, &JobBoard),
{
    let mut completed = 0u32;

    loop {
        let wait = match client.list_jobs(query).await {
            Ok(page) => {
                let board = JobBoard::from_page(&page);
                render(&page, &board);
                poll_interval(&page.items)
            }
            Err(e) => {
                tracing::warn!("Job list refresh failed: {}", e);
                IDLE_POLL_INTERVAL
            }
        };

        completed += 1;
        if iterations.is_some_and(|max| completed >= max) {
            return Ok(completed);
        }

        tracing::debug!("Next refresh in {:?}", wait);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Watch interrupted");
                return Ok(completed);
            }
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

    fn job(id: &str, status: &str) -> Job {
        serde_json::from_value(json!({"id": id, "status": status})).unwrap()
    }

    #[test]
    fn test_poll_interval() {
        assert_eq!(poll_interval(&[]), IDLE_POLL_INTERVAL);
        assert_eq!(
            poll_interval(&[job("a", "completed"), job("b", "failed")]),
            Duration::from_secs(30)
        );
        for status in ["created", "pending", "queued", "processing"] {
            assert_eq!(
                poll_interval(&[job("a", "completed"), job("b", status)]),
                Duration::from_secs(3)
            );
        }
    }

    #[test]
    fn test_job_board_counts() {
        let page = JobPage {
            items: vec![
                job("a", "completed"),
                job("b", "failed"),
                job("c", "queued"),
                job("d", "processing"),
                job("e", "failed"),
            ],
            total: 45,
            page: 1,
            limit: 20,
        };

        let board = JobBoard::from_page(&page);
        assert_eq!(board.active, 2);
        assert_eq!(board.failed, 2);
        assert_eq!(board.counts["completed"], 1);
        assert_eq!(board.page_count(), 3);
    }

    #[test]
    fn test_job_age() {
        let now = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(job_age("2025-03-01T11:59:30Z", now).as_deref(), Some("30s"));
        assert_eq!(job_age("2025-03-01T11:00:00Z", now).as_deref(), Some("1h"));
        assert_eq!(job_age("2025-02-27T12:00:00+00:00", now).as_deref(), Some("2d"));
        assert_eq!(job_age("not a date", now), None);
    }

    #[test]
    fn test_selection_toggle_all() {
        let visible = ["a", "b", "c"];
        let mut selection = Selection::new();

        selection.toggle("b");
        selection.toggle_all(&visible);
        assert_eq!(selection.len(), 3);

        selection.toggle_all(&visible);
        assert!(selection.is_empty());

        selection.toggle("a");
        selection.toggle("a");
        assert!(!selection.contains("a"));
    }

    #[test]
    fn test_selection_to_request() {
        let selection: Selection = ["j2", "j1"].into_iter().collect();
        let request = selection.to_request(false);
        assert_eq!(request.job_ids, vec!["j1".to_string(), "j2".to_string()]);
        assert_eq!(request.dry_run, None);
        assert_eq!(selection.to_request(true).dry_run, Some(true));
    }

    #[test]
    fn test_delete_target_describe() {
        assert_eq!(DeleteTarget::cancel("j1").describe(), "Cancel job j1");
        assert!(DeleteTarget::hard("j1").describe().contains("chunks"));
    }
}
