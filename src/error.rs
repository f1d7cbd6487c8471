//! 에러 모듈 - 콘솔 전역 에러 분류
//!
//! 백엔드 호출 실패는 두 가지로만 분류됩니다:
//! - 네트워크/타임아웃 에러 (업로드, URL 수집 경로에서만 재시도)
//! - HTTP 에러 응답 (`detail` / `message` 필드를 파싱해 그대로 노출)

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// ConsoleError
// ============================================================================

/// 콘솔 에러 타입
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// 연결 실패, 전송 실패, 타임아웃
    #[error("{message}")]
    Network { message: String, timeout: bool },

    /// 백엔드가 2xx 이외의 상태 코드를 반환
    #[error("{message}")]
    Http { status: u16, message: String },

    /// 성공 응답 본문 파싱 실패
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// 설정 파일 로드/저장/검증 실패
    #[error("Settings error: {0}")]
    Settings(String),

    /// 잘못된 사용자 입력
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 콘솔 Result 별칭
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl ConsoleError {
    /// 재시도 가능한 에러인지 (네트워크/타임아웃만)
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsoleError::Network { .. })
    }

    /// HTTP 상태 코드 (HTTP 에러일 때만)
    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 에러 응답 본문에서 HTTP 에러 생성
    ///
    /// `operation`은 본문에서 메시지를 찾지 못했을 때의 폴백 문구에 쓰입니다.
    pub fn from_response(operation: &str, status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| extract_error_message(&v))
            .unwrap_or_else(|| format!("{} failed ({})", operation, status.as_u16()));

        ConsoleError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ConsoleError::Decode(err.to_string());
        }

        if err.is_builder() {
            return ConsoleError::InvalidInput(format!("Invalid request: {}", err));
        }

        let timeout = err.is_timeout();
        let message = if timeout {
            format!("Request timeout: {}", err.without_url())
        } else {
            format!("Network error: {}", err.without_url())
        };

        ConsoleError::Network { message, timeout }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Decode(err.to_string())
    }
}

// ============================================================================
// Error Body Parsing
// ============================================================================

/// 에러 응답 본문에서 사람이 읽을 메시지 추출
///
/// 우선순위:
/// 1. `error.message`
/// 2. `detail` (배열이면 첫 항목의 `msg`, 문자열이면 그대로,
///    객체면 `error.message` → `message` → JSON 텍스트)
/// 3. `message`
pub fn extract_error_message(body: &Value) -> Option<String> {
    if let Some(msg) = body.pointer("/error/message").and_then(Value::as_str) {
        return Some(msg.to_string());
    }

    if let Some(detail) = body.get("detail") {
        let from_detail = match detail {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Array(items) => items
                .first()
                .and_then(|item| item.get("msg"))
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::Object(_) => detail
                .pointer("/error/message")
                .or_else(|| detail.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(detail.to_string())),
            _ => None,
        };
        if from_detail.is_some() {
            return from_detail;
        }
    }

    body.get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Tests
// ============================================================================
