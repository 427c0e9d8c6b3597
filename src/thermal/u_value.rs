use super::b_coefficient::{self, VentilationType};
use super::layer::LayerStack;
use super::resistance::{total_resistance, BoundaryResistances};

/// 열관류율 계산 입력. 시공 전(Ui)과 후(Uf)에 각각 한 번씩 쓴다.
#[derive(Debug, Clone, Copy)]
pub struct UValueInput<'a> {
    pub layers: &'a LayerStack,
    pub boundary: BoundaryResistances,
    /// 인접 공간 면적비
    pub ratio: f64,
    pub ventilation: VentilationType,
    pub is_after_work: bool,
}

/// 열관류율 계산 결과.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UValueResult {
    /// 열관류율 [W/m²·K]
    pub u_value: f64,
    /// 전체 열저항 [m²·K/W]
    pub total_resistance: f64,
    pub b_coefficient: f64,
    /// B 계수가 방어적 기본값이었는지 여부
    pub b_fallback: bool,
}

/// `U = B × (1 / R_total)`
pub fn u_value(input: UValueInput<'_>) -> UValueResult {
    let total = total_resistance(input.layers, input.boundary);
    let b = b_coefficient::lookup(input.ratio, input.ventilation, input.is_after_work);
    UValueResult {
        u_value: u_from_resistance(b.value, total),
        total_resistance: total,
        b_coefficient: b.value,
        b_fallback: b.fallback,
    }
}

pub fn u_from_resistance(b: f64, total_resistance: f64) -> f64 {
    b * (1.0 / total_resistance)
}
