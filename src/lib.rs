//! pipeline-console - 문서 수집/RAG 파이프라인 컨트롤 플레인 콘솔
//!
//! 원격 수집 백엔드의 REST API 위에서 동작하는 운영 도구입니다.
//! 잡 큐 모니터링, 파일/URL 수집, 청크 인스펙터, 검색 전략 비교,
//! 그리고 API 키를 주입하는 `/proxy/*` 포워딩 서버를 제공합니다.

pub mod backend;
pub mod calibration;
pub mod cli;
pub mod collector;
pub mod error;
pub mod inspector;
pub mod monitor;
pub mod proxy;
pub mod settings;

// Re-exports
pub use backend::{ApiClient, RetryPolicy};
pub use calibration::{compare, CalibrationParams, CompareReport, Preset, Strategy};
pub use error::{ConsoleError, Result};
pub use monitor::{JobBoard, Selection};
pub use proxy::ProxyState;
pub use settings::{get_data_dir, Settings};
