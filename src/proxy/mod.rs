//! Proxy 모듈 - `/proxy/*` 동일 출처 포워딩 서버
//!
//! 브라우저나 다른 도구가 백엔드 URL과 API 키를 몰라도 되도록
//! `/proxy/api/*`, `/proxy/health*`, `/proxy/metrics`를 업스트림으로 전달합니다.
//!
//! - 요청에 `X-API-Key`가 없으면 설정된 키를 주입
//! - hop-by-hop 헤더와 `host`는 전달하지 않음
//! - 요청 본문 최대 30MB
//! - 업스트림 연결 실패는 502, 타임아웃은 504 (`{"detail": ...}`)

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::backend::API_KEY_HEADER;
use crate::error::{ConsoleError, Result};

/// 요청 본문 한도 (30MB)
pub const MAX_BODY_BYTES: usize = 30 * 1024 * 1024;

/// 업스트림 요청 타임아웃
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(180);

/// 라우트 접두사
const PROXY_PREFIX: &str = "/proxy";

/// 전달하지 않는 헤더 (hop-by-hop + host, content-length는 다시 계산됨)
const SKIPPED_HEADERS: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

// ============================================================================
// State
// ============================================================================

/// 프록시 공유 상태 (`reqwest::Client` 하나를 모든 요청이 공유)
#[derive(Debug, Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    upstream: Url,
    api_key: Option<HeaderValue>,
}

impl ProxyState {
    pub fn new(upstream: &str, api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(upstream, api_key, UPSTREAM_TIMEOUT)
    }

    pub fn with_timeout(upstream: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let upstream = Url::parse(upstream.trim()).map_err(|e| {
            ConsoleError::InvalidInput(format!("Invalid upstream URL '{}': {}", upstream, e))
        })?;
        if upstream.cannot_be_a_base() {
            return Err(ConsoleError::InvalidInput(format!(
                "Upstream URL cannot be used as a base: {}",
                upstream
            )));
        }

        let api_key = match api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            Some(key) => Some(HeaderValue::from_str(&key).map_err(|_| {
                ConsoleError::InvalidInput("API key contains invalid header characters".to_string())
            })?),
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            upstream,
            api_key,
        })
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// `/proxy` 뒤의 경로와 쿼리를 업스트림 URL로 변환 (인코딩 유지)
    pub fn target_url(&self, rest: &str, query: Option<&str>) -> String {
        let base = self.upstream.as_str().trim_end_matches('/');
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", base, rest, q),
            _ => format!("{}{}", base, rest),
        }
    }

    /// 전달할 요청 헤더
    fn forward_headers(&self, incoming: &HeaderMap) -> HeaderMap {
        let mut headers = copy_headers(incoming);

        let has_key = headers
            .get(API_KEY_HEADER)
            .map(|v| !v.as_bytes().iter().all(u8::is_ascii_whitespace))
            .unwrap_or(false);

        if !has_key {
            if let Some(key) = &self.api_key {
                headers.insert(HeaderName::from_static("x-api-key"), key.clone());
            }
        }

        headers
    }
}

fn copy_headers(source: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if SKIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

// ============================================================================
// Router
// ============================================================================

/// 프록시 라우터
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/proxy/api/{*path}", any(forward))
        .route("/proxy/health", any(forward))
        .route("/proxy/health/{*path}", any(forward))
        .route("/proxy/metrics", any(forward))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .on_request(|request: &Request<Body>, _span: &tracing::Span| {
                    tracing::info!("Proxy request: {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, _span: &tracing::Span| {
                        tracing::info!(
                            "Proxy response: {} (took {} ms)",
                            response.status(),
                            latency.as_millis()
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                        tracing::error!("Proxy request failed: {:?} (took {} ms)", error, latency.as_millis());
                    },
                ),
        )
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

fn detail(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// 요청 하나를 업스트림으로 전달
async fn forward(State(state): State<ProxyState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let path = parts.uri.path();
    let rest = path.strip_prefix(PROXY_PREFIX).unwrap_or(path);
    let target = state.target_url(rest, parts.uri.query());

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Rejected request body for {}: {}", target, e);
            return detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string());
        }
    };

    tracing::debug!("Forwarding {} {}", parts.method, target);

    let upstream = state
        .client
        .request(parts.method.clone(), &target)
        .headers(state.forward_headers(&parts.headers))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            tracing::error!("Upstream timeout: {} {}", parts.method, target);
            return detail(StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out".to_string());
        }
        Err(e) => {
            tracing::error!("Upstream unreachable: {} {}: {}", parts.method, target, e);
            return detail(
                StatusCode::BAD_GATEWAY,
                format!("Upstream unreachable: {}", e.without_url()),
            );
        }
    };

    let status = upstream.status();
    let headers = copy_headers(upstream.headers());

    match upstream.bytes().await {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            tracing::error!("Failed to read upstream body from {}: {}", target, e);
            detail(
                StatusCode::BAD_GATEWAY,
                format!("Failed to read upstream response: {}", e.without_url()),
            )
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// 프록시 서버 실행 (Ctrl-C로 종료)
pub async fn serve(state: ProxyState, bind: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    let local = listener.local_addr()?;
    tracing::info!("Proxy listening on http://{} -> {}", local, state.upstream());

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Proxy shutting down");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use tower::ServiceExt;

    fn content_type(headers: &HeaderMap) -> Option<&str> {
        headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    fn state(upstream: &str, key: Option<&str>) -> ProxyState {
        ProxyState::new(upstream, key.map(str::to_string)).unwrap()
    }

    #[test]
    fn test_target_url() {
        let s = state("https://api.example.com/", None);
        assert_eq!(
            s.target_url("/api/v1/jobs", Some("page=2&limit=20")),
            "https://api.example.com/api/v1/jobs?page=2&limit=20"
        );
        assert_eq!(s.target_url("/health", None), "https://api.example.com/health");

        let s = state("http://10.0.0.5:8000/base", None);
        assert_eq!(
            s.target_url("/api/v1/jobs/a%2Fb/chunks", Some("")),
            "http://10.0.0.5:8000/base/api/v1/jobs/a%2Fb/chunks"
        );
    }

    #[test]
    fn test_forward_headers_injects_key_only_when_absent() {
        let s = state("https://api.example.com", Some("server-key"));

        let mut incoming = HeaderMap::new();
        incoming.insert(header::HOST, HeaderValue::from_static("localhost:3000"));
        incoming.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        incoming.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let headers = s.forward_headers(&incoming);
        assert_eq!(headers.get("x-api-key").unwrap(), "server-key");
        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "application/json");

        incoming.insert("x-api-key", HeaderValue::from_static("client-key"));
        let headers = s.forward_headers(&incoming);
        assert_eq!(headers.get("x-api-key").unwrap(), "client-key");
    }

    #[test]
    fn test_no_key_configured() {
        let s = state("https://api.example.com", Some("   "));
        let headers = s.forward_headers(&HeaderMap::new());
        assert!(headers.get("x-api-key").is_none());
    }

    #[test]
    fn test_invalid_upstream() {
        assert!(ProxyState::new("nope", None).is_err());
    }

    #[tokio::test]
    async fn test_healthz_is_local() {
        let app = router(state("http://127.0.0.1:9", None));
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_forwarded() {
        let app = router(state("http://127.0.0.1:9", None));
        let response = app
            .oneshot(Request::builder().uri("/proxy/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_502() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let app = router(state(&format!("http://127.0.0.1:{}", port), None));
        let response = app
            .oneshot(Request::builder().uri("/proxy/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(content_type(response.headers()), Some("application/json"));
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["detail"].as_str().unwrap().starts_with("Upstream unreachable"));
    }
}
