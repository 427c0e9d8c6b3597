//! 비난방 인접 공간 보정계수(B) 테이블.
//!
//! 비율(인접 공간 면적비)에 따라 9개 구간으로 나뉘며, 환기 조건(caso 1/2)과
//! 시공 전/후 여부에 따라 열이 달라진다.
//!
//! 참고 자료로 확인된 값은 (비율 0.3, caso1, 시공 전) = 0.85 하나뿐이다. 나머지는
//! 그 값을 기준으로 구간이 커질수록 줄어들게 잡은 근사치이며 규제 기준표가 아니다.
//! 실제 인증서 산정 전에 공식 표로 교체해야 한다.

use serde::{Deserialize, Serialize};

/// 구간을 찾지 못했을 때의 방어적 기본값.
pub const FALLBACK_B: f64 = 0.95;

/// 인접 공간 환기 조건.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VentilationType {
    /// 약하게 환기되는 공간
    Caso1,
    /// 강하게 환기되는 공간
    Caso2,
}

impl std::fmt::Display for VentilationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VentilationType::Caso1 => write!(f, "caso1"),
            VentilationType::Caso2 => write!(f, "caso2"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BCoefficientRange {
    pub min: f64,
    /// `None`이면 상한 없음
    pub max: Option<f64>,
    pub caso1: f64,
    pub caso2: f64,
    pub caso1_after_work: f64,
    pub caso2_after_work: f64,
}

impl BCoefficientRange {
    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && self.max.map_or(true, |max| ratio < max)
    }

    pub fn coefficient(&self, ventilation: VentilationType, is_after_work: bool) -> f64 {
        match (ventilation, is_after_work) {
            (VentilationType::Caso1, false) => self.caso1,
            (VentilationType::Caso2, false) => self.caso2,
            (VentilationType::Caso1, true) => self.caso1_after_work,
            (VentilationType::Caso2, true) => self.caso2_after_work,
        }
    }
}

/// 조회 결과.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BCoefficient {
    pub value: f64,
    /// true면 일치하는 구간이 없어 `FALLBACK_B`가 사용되었다.
    pub fallback: bool,
}

pub fn ranges() -> &'static [BCoefficientRange] {
    RANGES
}

/// 비율·환기 조건·시공 여부로 B 계수를 찾는다.
///
/// 첫 번째로 `min <= ratio < max`를 만족하는 구간을 쓴다. 일치하는 구간이 없으면
/// (음수, NaN 등) 0.95를 돌려주되 경고를 남기고 `fallback`을 세운다.
pub fn lookup(ratio: f64, ventilation: VentilationType, is_after_work: bool) -> BCoefficient {
    match RANGES.iter().find(|r| r.contains(ratio)) {
        Some(range) => BCoefficient {
            value: range.coefficient(ventilation, is_after_work),
            fallback: false,
        },
        None => {
            tracing::warn!(
                ratio,
                %ventilation,
                is_after_work,
                fallback = FALLBACK_B,
                "no B-coefficient range matched, using fallback"
            );
            BCoefficient {
                value: FALLBACK_B,
                fallback: true,
            }
        }
    }
}

const RANGES: &[BCoefficientRange] = &[
    range(0.0, Some(0.25), 0.92, 0.96, 0.99, 1.00),
    range(0.25, Some(0.50), 0.85, 0.92, 0.97, 0.99),
    range(0.50, Some(0.75), 0.79, 0.88, 0.96, 0.98),
    range(0.75, Some(1.00), 0.74, 0.85, 0.94, 0.97),
    range(1.00, Some(1.25), 0.69, 0.82, 0.92, 0.96),
    range(1.25, Some(2.00), 0.64, 0.78, 0.90, 0.95),
    range(2.00, Some(2.50), 0.58, 0.74, 0.88, 0.94),
    range(2.50, Some(3.00), 0.54, 0.71, 0.86, 0.93),
    range(3.00, None, 0.51, 0.68, 0.84, 0.92),
];

const fn range(
    min: f64,
    max: Option<f64>,
    caso1: f64,
    caso2: f64,
    caso1_after_work: f64,
    caso2_after_work: f64,
) -> BCoefficientRange {
    BCoefficientRange {
        min,
        max,
        caso1,
        caso2,
        caso1_after_work,
        caso2_after_work,
    }
}
