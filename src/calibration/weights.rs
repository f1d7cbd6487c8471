//! 하이브리드 가중치 정규화
//!
//! 벡터 가중치 하나만 저장하고 텍스트 가중치는 `1 - vector`로 파생합니다.
//! 두 값 모두 소수점 둘째 자리로 반올림합니다.

use crate::backend::FusionMethod;

/// 기본 벡터 가중치
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.7;

/// RRF 사용 시 고정 가중치
pub const RRF_WEIGHT: f64 = 0.5;

/// 소수점 둘째 자리 반올림
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// 벡터/텍스트 가중치 쌍
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    vector: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            vector: DEFAULT_VECTOR_WEIGHT,
        }
    }
}

impl HybridWeights {
    pub fn new(vector: f64) -> Self {
        Self {
            vector: round2(clamp_unit(vector)),
        }
    }

    pub fn vector(&self) -> f64 {
        self.vector
    }

    pub fn text(&self) -> f64 {
        round2(1.0 - self.vector)
    }

    /// 벡터 슬라이더 이동
    pub fn set_vector(&mut self, vector: f64) {
        self.vector = round2(clamp_unit(vector));
    }

    /// 텍스트 슬라이더 이동 (벡터 가중치를 역산)
    pub fn set_text(&mut self, text: f64) {
        self.vector = round2(1.0 - clamp_unit(text));
    }

    /// 실제로 전송되는 가중치 (vector, text)
    ///
    /// RRF는 순위만 사용하므로 슬라이더와 무관하게 0.5/0.5입니다.
    pub fn effective(&self, fusion: FusionMethod) -> (f64, f64) {
        match fusion {
            FusionMethod::Rrf => (RRF_WEIGHT, RRF_WEIGHT),
            FusionMethod::WeightedSum => (self.vector(), self.text()),
        }
    }

    /// Σ 표시값
    pub fn sum(&self, fusion: FusionMethod) -> f64 {
        let (v, t) = self.effective(fusion);
        round2(v + t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_always_sum_to_one() {
        for step in 0..=100 {
            let weights = HybridWeights::new(step as f64 / 100.0);
            assert!((weights.sum(FusionMethod::WeightedSum) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rounding_and_clamp() {
        let weights = HybridWeights::new(0.666);
        assert_eq!(weights.vector(), 0.67);
        assert_eq!(weights.text(), 0.33);

        assert_eq!(HybridWeights::new(1.4).vector(), 1.0);
        assert_eq!(HybridWeights::new(-0.2).text(), 1.0);
        assert_eq!(HybridWeights::new(f64::NAN).vector(), 0.0);
    }

    #[test]
    fn test_set_text_moves_vector() {
        let mut weights = HybridWeights::default();
        weights.set_text(0.45);
        assert_eq!(weights.vector(), 0.55);
        assert_eq!(weights.text(), 0.45);

        weights.set_vector(0.9);
        assert_eq!(weights.text(), 0.1);
    }

    #[test]
    fn test_rrf_ignores_slider() {
        let weights = HybridWeights::new(0.9);
        assert_eq!(weights.effective(FusionMethod::Rrf), (0.5, 0.5));
        assert_eq!(weights.effective(FusionMethod::WeightedSum), (0.9, 0.1));
        assert_eq!(weights.sum(FusionMethod::Rrf), 1.0);
    }
}
