//! 청크 시각화 계산
//!
//! 청크 크기와 오버랩을 막대 비율로 환산합니다.
//! 전체 폭은 청크 2.5개 분량입니다.

/// 청크/오버랩 비율
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkGeometry {
    pub chunk_size: u32,
    pub overlap: u32,
    /// 전체 시각화 폭 (토큰)
    pub visual_total: f64,
    /// 청크 하나의 폭 (%)
    pub chunk_width_pct: f64,
    /// 청크 대비 오버랩 비율 (%, 최대 100)
    pub overlap_rel_pct: f64,
    /// 다음 청크 시작까지의 전진 폭 (%)
    pub advance_pct: f64,
}

impl ChunkGeometry {
    pub fn new(chunk_size: u32, overlap: u32) -> Self {
        let size = chunk_size as f64;
        let ov = overlap as f64;

        let visual_total = (size * 2.5).max(1.0);
        let chunk_width_pct = size / visual_total * 100.0;
        let overlap_rel_pct = if overlap > 0 && chunk_size > 0 {
            (ov / size * 100.0).min(100.0)
        } else {
            0.0
        };
        let advance_pct = (size - ov) / visual_total * 100.0;

        Self {
            chunk_size,
            overlap,
            visual_total,
            chunk_width_pct,
            overlap_rel_pct,
            advance_pct,
        }
    }

    /// 청크 사이 전진 폭 (토큰)
    pub fn stride(&self) -> i64 {
        self.chunk_size as i64 - self.overlap as i64
    }

    /// 텍스트 막대 렌더링 (`width` 문자 폭)
    ///
    /// `#`는 첫 청크, `=`는 오버랩, `-`는 다음 청크의 나머지입니다.
    pub fn render_bar(&self, width: usize) -> String {
        let cells = |pct: f64| ((pct / 100.0) * width as f64).round().max(0.0) as usize;

        let chunk = cells(self.chunk_width_pct).min(width);
        let advance = cells(self.advance_pct).min(chunk);
        let overlap = chunk - advance;
        let tail = advance.min(width.saturating_sub(chunk));

        let mut bar = String::with_capacity(width + 2);
        bar.push('[');
        bar.push_str(&"#".repeat(advance));
        bar.push_str(&"=".repeat(overlap));
        bar.push_str(&"-".repeat(tail));
        bar.push_str(&" ".repeat(width.saturating_sub(chunk + tail)));
        bar.push(']');
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let g = ChunkGeometry::new(512, 64);
        assert_eq!(g.visual_total, 1280.0);
        assert!((g.chunk_width_pct - 40.0).abs() < 1e-9);
        assert!((g.overlap_rel_pct - 12.5).abs() < 1e-9);
        assert!((g.advance_pct - 35.0).abs() < 1e-9);
        assert_eq!(g.stride(), 448);
    }

    #[test]
    fn test_no_overlap() {
        let g = ChunkGeometry::new(256, 0);
        assert_eq!(g.overlap_rel_pct, 0.0);
        assert!((g.advance_pct - g.chunk_width_pct).abs() < 1e-9);
    }

    #[test]
    fn test_zero_chunk_size_does_not_divide_by_zero() {
        let g = ChunkGeometry::new(0, 0);
        assert_eq!(g.visual_total, 1.0);
        assert_eq!(g.chunk_width_pct, 0.0);
        assert_eq!(g.overlap_rel_pct, 0.0);
    }

    #[test]
    fn test_render_bar_width() {
        let g = ChunkGeometry::new(512, 64);
        let bar = g.render_bar(40);
        assert_eq!(bar.chars().count(), 42);
        assert!(bar.contains('='));
    }
}
