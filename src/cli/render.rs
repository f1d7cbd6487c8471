//! 터미널 출력 헬퍼

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::backend::{Job, JobPage};
use crate::calibration::{ColumnResult, RankedHit};
use crate::monitor::{job_age, JobBoard};

/// 값이 없을 때 표시
pub const MISSING: &str = "—";

// ============================================================================
// Text
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// 점수 (소수점 셋째 자리)
pub fn format_score(score: Option<f64>) -> String {
    score
        .map(|s| format!("{:.3}", s))
        .unwrap_or_else(|| MISSING.to_string())
}

/// 지연 시간 (정수 ms)
pub fn format_latency(latency_ms: Option<f64>) -> String {
    latency_ms
        .map(|ms| format!("{}ms", ms.round()))
        .unwrap_or_else(|| MISSING.to_string())
}

fn mark_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<mark[^>]*>(.*?)</mark>").ok())
        .as_ref()
}

fn tag_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]+>").ok()).as_ref()
}

/// 백엔드 하이라이트 HTML을 터미널 텍스트로 변환
///
/// `<mark>term</mark>`은 `[term]`으로, 나머지 태그는 제거하고 기본 엔티티를 복원합니다.
pub fn render_highlight(html: &str) -> String {
    let marked = match mark_regex() {
        Some(re) => re.replace_all(html, "[$1]").into_owned(),
        None => html.to_string(),
    };
    let stripped = match tag_regex() {
        Some(re) => re.replace_all(&marked, "").into_owned(),
        None => marked,
    };

    stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// ============================================================================
// Jobs
// ============================================================================

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// 잡 한 줄
pub fn job_line(job: &Job, now: DateTime<Utc>) -> String {
    let age = job
        .created_at
        .as_deref()
        .and_then(|created| job_age(created, now))
        .unwrap_or_else(|| MISSING.to_string());

    format!(
        "  {:<8}  {:<10}  {:<6}  {:>5}  {}",
        short_id(&job.id),
        job.status.as_str(),
        job.source_type,
        age,
        truncate_text(job.display_name(), 60)
    )
}

/// 잡 목록 출력
pub fn print_jobs(page: &JobPage, board: &JobBoard) {
    let now = Utc::now();

    println!(
        "[OK] 잡 {} 건 (페이지 {}/{}, 진행 중 {}, 실패 {})",
        page.total,
        page.page,
        board.page_count(),
        board.active,
        board.failed
    );

    if page.items.is_empty() {
        println!("[!] 표시할 잡이 없습니다.");
        return;
    }

    println!();
    println!("  {:<8}  {:<10}  {:<6}  {:>5}  {}", "ID", "STATUS", "SOURCE", "AGE", "NAME");
    for job in &page.items {
        println!("{}", job_line(job, now));
        if let Some(err) = job.error_text() {
            println!("            └ {}", truncate_text(&err, 100));
        }
    }
    println!();
}

// ============================================================================
// Search
// ============================================================================

/// 검색 결과 한 건
pub fn print_hit(hit: &RankedHit) {
    let source = hit.source.as_deref().unwrap_or(MISSING);
    println!(
        "  {:>2}. [{}] {}  ({})",
        hit.rank,
        format_score(hit.score),
        hit.chunk_id,
        source
    );

    let body = match &hit.highlighted {
        Some(html) if !html.is_empty() => render_highlight(html),
        _ => hit.content.clone(),
    };
    println!("      {}", truncate_text(&body, 200));

    if !hit.matched_terms.is_empty() {
        println!("      terms: {}", hit.matched_terms.join(", "));
    }
}

/// 비교 열 하나
pub fn print_column(column: &ColumnResult) {
    let title = if column.subtitle.is_empty() {
        column.strategy.label().to_string()
    } else {
        format!("{} · {}", column.strategy.label(), column.subtitle)
    };

    match &column.outcome {
        Ok(outcome) => {
            println!(
                "=== {} ({} hits, {}, 왕복 {}ms)",
                title,
                outcome.hits.len(),
                format_latency(column.latency_ms()),
                column.elapsed_ms
            );
            if outcome.hits.is_empty() {
                println!("  [!] 결과 없음");
            }
            for hit in &outcome.hits {
                print_hit(hit);
            }
        }
        Err(e) => {
            println!("=== {}", title);
            println!("  [!] {}", e);
        }
    }
    println!();
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_truncate_unicode() {
        let korean = "안녕하세요 세계";
        assert_eq!(truncate_text(korean, 5), "안녕하세요...");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(30 * 1024 * 1024), "30.0 MB");
    }

    #[test]
    fn test_format_score_and_latency() {
        assert_eq!(format_score(Some(0.81234)), "0.812");
        assert_eq!(format_score(None), "—");
        assert_eq!(format_latency(Some(41.6)), "42ms");
        assert_eq!(format_latency(None), "—");
    }

    #[test]
    fn test_render_highlight() {
        assert_eq!(
            render_highlight("the <mark>refund</mark> policy &amp; <b>terms</b>"),
            "the [refund] policy & terms"
        );
        assert_eq!(render_highlight("a &lt;tag&gt;"), "a <tag>");
        assert_eq!(render_highlight("<MARK class=\"x\">Big</MARK>"), "[Big]");
    }

    #[test]
    fn test_job_line() {
        let job: Job = serde_json::from_value(json!({
            "id": "0123456789abcdef",
            "status": "processing",
            "source_type": "url",
            "source_uri": "https://example.com/a.pdf",
            "created_at": "2025-03-01T11:58:00Z"
        }))
        .unwrap();
        let now = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let line = job_line(&job, now);
        assert!(line.contains("01234567"));
        assert!(!line.contains("89abcdef"));
        assert!(line.contains("processing"));
        assert!(line.contains("2m"));
        assert!(line.contains("https://example.com/a.pdf"));
    }
}
