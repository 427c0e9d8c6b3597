use serde::{Deserialize, Serialize};

use super::layer::LayerStack;

/// 실내측 표면 열저항 기본값 [m²·K/W]
pub const DEFAULT_RSI: f64 = 0.13;
/// 실외측 표면 열저항 기본값 [m²·K/W]
pub const DEFAULT_RSE: f64 = 0.04;

/// 표면 열저항 쌍(Rsi, Rse). 합계 기본값은 0.17이다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryResistances {
    pub rsi: f64,
    pub rse: f64,
}

impl Default for BoundaryResistances {
    fn default() -> Self {
        Self {
            rsi: DEFAULT_RSI,
            rse: DEFAULT_RSE,
        }
    }
}

impl BoundaryResistances {
    pub fn new(rsi: f64, rse: f64) -> Self {
        Self { rsi, rse }
    }

    /// 음수나 NaN은 0으로 취급한다. 합이 0 이하이면 기본값으로 되돌린다.
    pub fn sanitized(self) -> Self {
        let rsi = if self.rsi.is_finite() { self.rsi.max(0.0) } else { 0.0 };
        let rse = if self.rse.is_finite() { self.rse.max(0.0) } else { 0.0 };
        if rsi + rse > 0.0 {
            Self { rsi, rse }
        } else {
            Self::default()
        }
    }

    pub fn total(self) -> f64 {
        self.rsi + self.rse
    }
}

/// 전체 열저항 `Σr + Rsi + Rse` [m²·K/W]. 항상 양수이다.
///
/// 캐시 없이 매번 합산하므로 층을 편집한 뒤 그대로 다시 호출하면 된다.
pub fn total_resistance(stack: &LayerStack, boundary: BoundaryResistances) -> f64 {
    let layers: f64 = stack.layers().iter().map(|l| l.r()).sum();
    layers + boundary.sanitized().total()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_stack_is_boundary_only() {
        let r = total_resistance(&LayerStack::new(), BoundaryResistances::default());
        assert!((r - 0.17).abs() < 1e-12);
    }

    #[test]
    fn sums_layers_and_boundaries() {
        let mut stack = LayerStack::new();
        stack.push("mineral wool", 100.0, 0.04).unwrap();
        stack.push("plaster", 13.0, 0.25).unwrap();
        let r = total_resistance(&stack, BoundaryResistances::new(0.10, 0.04));
        assert!((r - (2.5 + 0.052 + 0.14)).abs() < 1e-12);
    }

    #[test]
    fn degenerate_boundaries_fall_back_to_default() {
        let r = total_resistance(&LayerStack::new(), BoundaryResistances::new(-1.0, 0.0));
        assert!((r - 0.17).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn order_does_not_change_total(
            layers in prop::collection::vec((1.0f64..400.0, 0.01f64..0.5), 0..8),
        ) {
            let mut forward = LayerStack::new();
            let mut reverse = LayerStack::new();
            for (t, l) in &layers {
                forward.push("f", *t, *l).unwrap();
            }
            for (t, l) in layers.iter().rev() {
                reverse.push("r", *t, *l).unwrap();
            }
            let a = total_resistance(&forward, BoundaryResistances::default());
            let b = total_resistance(&reverse, BoundaryResistances::default());
            prop_assert!((a - b).abs() < 1e-9);
            prop_assert!(a > 0.0);
        }
    }
}
