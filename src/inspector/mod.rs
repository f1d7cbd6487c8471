//! Inspector 모듈 - 잡 청크 페이지 탐색과 상세 보기
//!
//! 백엔드마다 청크 필드 이름이 조금씩 달라서 표시용 뷰로 정규화합니다.

use serde_json::{Map, Value};

use crate::backend::{ApiClient, Chunk, ChunkPage, ChunkQuery};
use crate::error::Result;

/// 페이지당 청크 수
pub const PAGE_SIZE: u32 = 20;

/// 임베딩 미리보기 값 개수
pub const EMBEDDING_PREVIEW_LEN: usize = 50;

/// 메타데이터 표시에서 제외하는 키
const HIDDEN_METADATA_KEYS: [&str; 1] = ["embedding"];

/// 값이 없을 때 표시
const MISSING: &str = "—";

/// 0부터 시작하는 페이지의 offset
pub fn page_offset(page: u32, limit: u32) -> u32 {
    page.saturating_mul(limit)
}

/// 전체 페이지 수 (최소 1)
pub fn page_count(total: u64, limit: u32) -> u64 {
    if total == 0 || limit == 0 {
        return 1;
    }
    total.div_ceil(limit as u64)
}

/// 다음 페이지 존재 여부
pub fn has_next_page(page: u32, limit: u32, total: u64) -> bool {
    ((page as u64) + 1) * (limit as u64) < total
}

/// 청크 페이지 조회
pub async fn fetch_page(
    client: &ApiClient,
    job_id: &str,
    page: u32,
    limit: u32,
    include_embedding: bool,
) -> Result<ChunkPage> {
    let query = ChunkQuery {
        limit: Some(limit),
        offset: Some(page_offset(page, limit)),
        include_embedding: include_embedding.then_some(true),
    };
    client.job_chunks(job_id, &query).await
}

// ============================================================================
// ChunkView
// ============================================================================

/// 임베딩 미리보기
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingPreview {
    pub dimensions: usize,
    pub values: Vec<f32>,
    pub truncated: bool,
}

impl EmbeddingPreview {
    pub fn new(embedding: &[f32]) -> Self {
        Self {
            dimensions: embedding.len(),
            values: embedding.iter().take(EMBEDDING_PREVIEW_LEN).copied().collect(),
            truncated: embedding.len() > EMBEDDING_PREVIEW_LEN,
        }
    }

    /// `[0.0123, -0.0456, ...]` 형식 (소수점 넷째 자리)
    pub fn render(&self) -> String {
        let mut body = self
            .values
            .iter()
            .map(|v| format!("{:.4}", v))
            .collect::<Vec<_>>()
            .join(", ");
        if self.truncated {
            body.push_str(", ...");
        }
        format!("[{}]", body)
    }
}

/// 표시용 청크
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkView {
    pub id: String,
    pub index: Option<u64>,
    pub text: String,
    pub tokens: Option<u64>,
    /// `embedding` 키를 뺀 메타데이터
    pub metadata: Vec<(String, Value)>,
    pub embedding: Option<EmbeddingPreview>,
}

impl ChunkView {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let id = chunk
            .chunk_id
            .as_deref()
            .or(chunk.id.as_deref())
            .unwrap_or(MISSING)
            .to_string();
        let text = chunk
            .text
            .as_deref()
            .or(chunk.content.as_deref())
            .unwrap_or(MISSING)
            .to_string();

        Self {
            id,
            index: chunk.chunk_index,
            text,
            tokens: chunk.token_count.or(chunk.tokens),
            metadata: visible_metadata(chunk.metadata.as_ref()),
            embedding: chunk.embedding.as_deref().map(EmbeddingPreview::new),
        }
    }

    /// 토큰 수 표시
    pub fn tokens_display(&self) -> String {
        self.tokens
            .map(|t| t.to_string())
            .unwrap_or_else(|| MISSING.to_string())
    }
}

fn visible_metadata(metadata: Option<&Map<String, Value>>) -> Vec<(String, Value)> {
    metadata
        .map(|m| {
            m.iter()
                .filter(|(key, _)| !HIDDEN_METADATA_KEYS.contains(&key.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paging() {
        assert_eq!(page_offset(0, PAGE_SIZE), 0);
        assert_eq!(page_offset(3, PAGE_SIZE), 60);
        assert_eq!(page_count(0, 20), 1);
        assert_eq!(page_count(41, 20), 3);
        assert!(has_next_page(1, 20, 41));
        assert!(!has_next_page(2, 20, 41));
    }

    #[test]
    fn test_chunk_view_fallbacks() {
        let chunk: Chunk = serde_json::from_value(json!({
            "id": "c-9",
            "content": "body",
            "tokens": 77,
            "metadata": {"page": 2, "embedding": [0.1]}
        }))
        .unwrap();

        let view = ChunkView::from_chunk(&chunk);
        assert_eq!(view.id, "c-9");
        assert_eq!(view.text, "body");
        assert_eq!(view.tokens_display(), "77");
        assert_eq!(view.metadata, vec![("page".to_string(), json!(2))]);
        assert!(view.embedding.is_none());

        let view = ChunkView::from_chunk(&Chunk::default());
        assert_eq!(view.id, "—");
        assert_eq!(view.text, "—");
        assert_eq!(view.tokens_display(), "—");
    }

    #[test]
    fn test_embedding_preview() {
        let embedding: Vec<f32> = (0..768).map(|i| i as f32 / 1000.0).collect();
        let preview = EmbeddingPreview::new(&embedding);
        assert_eq!(preview.dimensions, 768);
        assert_eq!(preview.values.len(), 50);
        assert!(preview.truncated);
        assert!(preview.render().starts_with("[0.0000, 0.0010"));
        assert!(preview.render().ends_with(", ...]"));

        let short = EmbeddingPreview::new(&[0.5, -0.25]);
        assert!(!short.truncated);
        assert_eq!(short.render(), "[0.5000, -0.2500]");
    }
}
