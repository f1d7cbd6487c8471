//! 설정 모듈 - 로컬 운영자 설정 저장소
//!
//! API 키, 업스트림 URL, 청킹 파라미터를 JSON 파일로 보관합니다.
//! 저장 위치: ~/.pipeline-console/settings.json
//!
//! 환경변수 오버라이드:
//! - `PIPELINE_API_URL` - 업스트림 백엔드 URL
//! - `PIPELINE_API_KEY` - `X-API-Key` 헤더 값

mod geometry;

pub use geometry::ChunkGeometry;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

/// 기본 업스트림 백엔드 URL
pub const DEFAULT_UPSTREAM_URL: &str = "https://pipeline-api.felixtek.cloud";

/// 업스트림 URL 환경변수
pub const UPSTREAM_ENV: &str = "PIPELINE_API_URL";

/// API 키 환경변수
pub const API_KEY_ENV: &str = "PIPELINE_API_KEY";

const SETTINGS_FILE: &str = "settings.json";

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.pipeline-console/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pipeline-console")
}

/// 기본 설정 파일 경로
pub fn default_settings_path() -> PathBuf {
    get_data_dir().join(SETTINGS_FILE)
}

// ============================================================================
// Chunking Strategy
// ============================================================================

/// 청킹 전략 (백엔드가 해석)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    Fixed,
    #[default]
    Recursive,
    Semantic,
}

impl ChunkStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::Fixed => "fixed",
            ChunkStrategy::Recursive => "recursive",
            ChunkStrategy::Semantic => "semantic",
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkStrategy {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(ChunkStrategy::Fixed),
            "recursive" => Ok(ChunkStrategy::Recursive),
            "semantic" => Ok(ChunkStrategy::Semantic),
            other => Err(ConsoleError::InvalidInput(format!(
                "Unknown chunk strategy: {} (fixed, recursive, semantic)",
                other
            ))),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// 운영자 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `X-API-Key` 헤더 값 (빈 문자열이면 전송하지 않음)
    pub api_key: String,
    /// 업스트림 백엔드 URL
    pub upstream_url: String,
    /// 새 잡에 붙일 청킹 전략
    pub chunk_strategy: ChunkStrategy,
    /// 청크 크기 (토큰)
    pub chunk_size: u32,
    /// 청크 오버랩 (토큰)
    pub chunk_overlap: u32,
    /// 마지막 저장 시각
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            chunk_strategy: ChunkStrategy::Recursive,
            chunk_size: 512,
            chunk_overlap: 64,
            last_saved_at: None,
        }
    }
}

impl Settings {
    /// 파일에서 설정 로드
    ///
    /// 파일이 없으면 기본값을 반환하고, 형식이 잘못되었으면 에러를 반환합니다.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Settings file not found, using defaults: {:?}", path);
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| ConsoleError::Settings(format!("{}: {}", path.display(), e)))
    }

    /// 파일에서 로드 후 환경변수 오버라이드 적용
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut settings = Self::load(path)?;
        settings.apply_env();
        Ok(settings)
    }

    /// 환경변수 오버라이드 적용 (빈 값은 무시)
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(UPSTREAM_ENV) {
            if !url.trim().is_empty() {
                tracing::debug!("Using upstream from {}", UPSTREAM_ENV);
                self.upstream_url = url.trim().to_string();
            }
        }

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                tracing::debug!("Using API key from {}", API_KEY_ENV);
                self.api_key = key.trim().to_string();
            }
        }
    }

    /// 설정 저장 (저장 시각 갱신)
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let saved_at = Utc::now();
        let stamped = Settings {
            last_saved_at: Some(saved_at),
            ..self.clone()
        };
        let raw = serde_json::to_string_pretty(&stamped)?;
        std::fs::write(path, raw)?;
        self.last_saved_at = Some(saved_at);

        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ConsoleError::Settings(
                "chunk_size must be at least 1".to_string(),
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConsoleError::Settings(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        url::Url::parse(&self.upstream_url).map_err(|e| {
            ConsoleError::Settings(format!("Invalid upstream URL '{}': {}", self.upstream_url, e))
        })?;

        Ok(())
    }

    /// 키 이름으로 값 설정
    ///
    /// 지원 키: `api-key`, `upstream`, `strategy`, `chunk-size`, `overlap`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api-key" | "api_key" => self.api_key = value.trim().to_string(),
            "upstream" | "upstream_url" => {
                url::Url::parse(value.trim()).map_err(|e| {
                    ConsoleError::InvalidInput(format!("Invalid upstream URL '{}': {}", value, e))
                })?;
                self.upstream_url = value.trim().trim_end_matches('/').to_string();
            }
            "strategy" | "chunk_strategy" => self.chunk_strategy = value.parse()?,
            "chunk-size" | "chunk_size" => self.chunk_size = parse_u32(key, value)?,
            "overlap" | "chunk_overlap" => self.chunk_overlap = parse_u32(key, value)?,
            other => {
                return Err(ConsoleError::InvalidInput(format!(
                    "Unknown setting: {} (api-key, upstream, strategy, chunk-size, overlap)",
                    other
                )))
            }
        }
        Ok(())
    }

    /// API 키 설정 여부
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// 화면 표시용 마스킹된 API 키
    pub fn masked_api_key(&self) -> String {
        if self.api_key.is_empty() {
            return "(unset)".to_string();
        }
        let prefix: String = self.api_key.chars().take(4).collect();
        format!("{}…", prefix)
    }

    /// 청크 시각화 계산
    pub fn geometry(&self) -> ChunkGeometry {
        ChunkGeometry::new(self.chunk_size, self.chunk_overlap)
    }

    /// 마지막 저장 시각 표시 문자열
    pub fn last_saved_display(&self) -> String {
        self.last_saved_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ConsoleError::InvalidInput(format!("{} must be a non-negative integer", key)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_strategy, ChunkStrategy::Recursive);
        assert_eq!(settings.chunk_size, 512);
        assert_eq!(settings.chunk_overlap, 64);
        assert!(!settings.has_api_key());
        assert_eq!(settings.masked_api_key(), "(unset)");
        assert_eq!(settings.last_saved_display(), "never");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.set("api-key", "sk-test-123").unwrap();
        settings.set("strategy", "semantic").unwrap();
        settings.set("chunk-size", "1024").unwrap();
        settings.set("overlap", "128").unwrap();
        settings.save(&path).unwrap();
        assert!(settings.last_saved_at.is_some());

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.api_key, "sk-test-123");
        assert_eq!(loaded.chunk_strategy, ChunkStrategy::Semantic);
        assert_eq!(loaded.chunk_size, 1024);
        assert_eq!(loaded.chunk_overlap, 128);
        assert_eq!(loaded.masked_api_key(), "sk-t…");
    }

    #[test]
    fn test_failed_save_keeps_timestamp_unset() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let mut settings = Settings::default();
        assert!(settings.save(&blocker.join("settings.json")).is_err());
        assert!(settings.last_saved_at.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"api_key": "abc"}"#).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.api_key, "abc");
        assert_eq!(loaded.chunk_size, 512);
        assert_eq!(loaded.upstream_url, DEFAULT_UPSTREAM_URL);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(ConsoleError::Settings(_))));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.set("overlap", "512").unwrap();
        assert!(settings.validate().is_err());
        assert!(settings.save(&dir.path().join("s.json")).is_err());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(settings.set("strategy", "sliding").is_err());
        assert!(settings.set("chunk-size", "-3").is_err());
        assert!(settings.set("upstream", "not a url").is_err());
        assert!(settings.set("colour", "red").is_err());

        settings.set("upstream", "http://localhost:8000/").unwrap();
        assert_eq!(settings.upstream_url, "http://localhost:8000");
    }

    #[test]
    fn test_chunk_strategy_parse() {
        assert_eq!("Fixed".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Fixed);
        assert_eq!(ChunkStrategy::Semantic.to_string(), "semantic");
    }
}
