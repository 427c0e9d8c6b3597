//! CAE/열관류율을 금액으로 환산하는 두 가지 정산 방식.
//!
//! 규제 방식(인증서 가치 기반)과 상업 방식(위임 사업자 단가 기반)은 서로 다른
//! 공식이며, 어느 쪽을 쓸지는 호출 측이 `BillingStrategy`로 고른다.

use serde::{Deserialize, Serialize};

use super::cae::{cae, validate_surface, SavingsError, SavingsInput};
use crate::climate::zones;

/// 규제 방식 단가. 기본값은 인증서 0.10 €/kWh, 자재 7 €/m², 부가세 10%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingRates {
    /// 인증서 단가 [€/kWh]
    pub cae_price_per_kwh: f64,
    /// 자재비 [€/m²]
    pub material_cost_per_m2: f64,
    /// 부가세율 (0.10 = 10%)
    pub vat_rate: f64,
    /// 상업 방식 수수료율 (0.10 = 10%)
    pub cherry_rate: f64,
}

impl Default for BillingRates {
    fn default() -> Self {
        Self {
            cae_price_per_kwh: 0.10,
            material_cost_per_m2: 7.0,
            vat_rate: 0.10,
            cherry_rate: 0.10,
        }
    }
}

/// 인증서를 매입하는 위임 사업자.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    Eiffage,
    GreenFlex,
}

impl Delegate {
    pub const ALL: [Delegate; 2] = [Delegate::Eiffage, Delegate::GreenFlex];

    /// 사업자 단가 [€/kWh]
    pub fn multiplier(self) -> f64 {
        match self {
            Delegate::Eiffage => 0.130,
            Delegate::GreenFlex => 0.115,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Delegate::Eiffage => "Eiffage",
            Delegate::GreenFlex => "GreenFlex",
        }
    }
}

impl std::str::FromStr for Delegate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Delegate::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("알 수 없는 위임 사업자: {s}"))
    }
}

/// 정산 방식 선택.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum BillingStrategy {
    Regulatory,
    Commercial { delegate: Delegate },
}

/// 규제 방식 정산 결과 [€]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegulatoryBilling {
    pub cae: f64,
    pub cae_value: f64,
    pub material_cost: f64,
    /// 음수일 수 있다 (인증서 가치가 자재비보다 작은 경우).
    pub labor_cost: f64,
    pub subtotal_ht: f64,
    pub vat: f64,
    pub total_ttc: f64,
    pub climate_coefficient: u32,
}

/// 상업 방식 정산 결과 [€]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommercialBilling {
    pub annual_savings: f64,
    pub project_price: f64,
    pub price_per_sqm: f64,
    pub cherry_price_per_sqm: f64,
    pub cherry_project_price: f64,
    pub total_price_per_sqm: f64,
    pub total_project_price: f64,
    pub g_coefficient: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum BillingResult {
    Regulatory(RegulatoryBilling),
    Commercial(CommercialBilling),
}

impl BillingResult {
    /// 사용된 기후 계수
    pub fn climate_coefficient(&self) -> u32 {
        match self {
            BillingResult::Regulatory(r) => r.climate_coefficient,
            BillingResult::Commercial(c) => c.g_coefficient,
        }
    }
}

/// 선택한 방식으로 정산한다.
pub fn bill(
    strategy: BillingStrategy,
    input: SavingsInput<'_>,
    rates: &BillingRates,
) -> Result<BillingResult, SavingsError> {
    match strategy {
        BillingStrategy::Regulatory => regulatory(input, rates).map(BillingResult::Regulatory),
        BillingStrategy::Commercial { delegate } => {
            commercial(input, delegate, rates).map(BillingResult::Commercial)
        }
    }
}

/// 인증서 가치에서 세전 금액, 부가세, 인건비를 역산한다.
pub fn regulatory(
    input: SavingsInput<'_>,
    rates: &BillingRates,
) -> Result<RegulatoryBilling, SavingsError> {
    let cae = cae(input)?;
    let cae_value = cae.cae_kwh_per_year * rates.cae_price_per_kwh;
    let material_cost = input.surface_m2 * rates.material_cost_per_m2;
    let subtotal_ht = cae_value / (1.0 + rates.vat_rate);
    let labor_cost = subtotal_ht - material_cost;
    let vat = subtotal_ht * rates.vat_rate;
    if labor_cost < 0.0 {
        tracing::warn!(
            labor_cost,
            material_cost,
            subtotal_ht,
            "certificate value does not cover material cost"
        );
    }
    Ok(RegulatoryBilling {
        cae: cae.cae_kwh_per_year,
        cae_value,
        material_cost,
        labor_cost,
        subtotal_ht,
        vat,
        total_ttc: subtotal_ht + vat,
        climate_coefficient: cae.coefficient_g,
    })
}

/// 연간 절감량에 위임 사업자 단가를 곱하고 수수료 줄을 덧붙인다.
pub fn commercial(
    input: SavingsInput<'_>,
    delegate: Delegate,
    rates: &BillingRates,
) -> Result<CommercialBilling, SavingsError> {
    let surface = validate_surface(input.surface_m2)?;
    let resolved = zones::resolve_zone(input.zone_code, input.zone_fallback)?;
    let g = resolved.zone.coefficient_g;
    let annual_savings = surface * (input.ui - input.uf) * f64::from(g);
    let project_price = annual_savings * delegate.multiplier();
    let price_per_sqm = project_price / surface;
    let cherry_price_per_sqm = price_per_sqm * rates.cherry_rate;
    let cherry_project_price = project_price * rates.cherry_rate;
    Ok(CommercialBilling {
        annual_savings,
        project_price,
        price_per_sqm,
        cherry_price_per_sqm,
        cherry_project_price,
        total_price_per_sqm: price_per_sqm + cherry_price_per_sqm,
        total_project_price: project_price + cherry_project_price,
        g_coefficient: g,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::zones::ZoneFallback;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-2
    }

    fn reference() -> SavingsInput<'static> {
        SavingsInput {
            ui: 2.0,
            uf: 0.5,
            surface_m2: 100.0,
            zone_code: "C3",
            zone_fallback: ZoneFallback::Reject,
        }
    }

    #[test]
    fn regulatory_reference_breakdown() {
        let r = regulatory(reference(), &BillingRates::default()).unwrap();
        assert_eq!(r.cae, 6900.0);
        assert!(close(r.cae_value, 690.0));
        assert!(close(r.material_cost, 700.0));
        assert!(close(r.subtotal_ht, 627.27));
        assert!(close(r.labor_cost, -72.73));
        assert!(close(r.vat, 62.73));
        assert!(close(r.total_ttc, 690.0));
        assert_eq!(r.climate_coefficient, 46);
    }

    #[test]
    fn commercial_eiffage_breakdown() {
        let c = commercial(reference(), Delegate::Eiffage, &BillingRates::default()).unwrap();
        assert!(close(c.annual_savings, 6900.0));
        assert!(close(c.project_price, 897.0));
        assert!(close(c.price_per_sqm, 8.97));
        assert!(close(c.cherry_price_per_sqm, 0.897));
        assert!(close(c.cherry_project_price, 89.7));
        assert!(close(c.total_price_per_sqm, 9.867));
        assert!(close(c.total_project_price, 986.7));
        assert_eq!(c.g_coefficient, 46);
    }

    #[test]
    fn greenflex_uses_its_multiplier() {
        let c = commercial(reference(), Delegate::GreenFlex, &BillingRates::default()).unwrap();
        assert!(close(c.project_price, 793.5));
    }

    #[test]
    fn both_strategies_reject_unknown_zone_by_default() {
        let input = SavingsInput {
            zone_code: "Z9",
            ..reference()
        };
        let rates = BillingRates::default();
        assert!(bill(BillingStrategy::Regulatory, input, &rates).is_err());
        assert!(bill(
            BillingStrategy::Commercial {
                delegate: Delegate::Eiffage
            },
            input,
            &rates
        )
        .is_err());
    }

    #[test]
    fn explicit_fallback_applies_to_both_strategies() {
        let input = SavingsInput {
            zone_code: "Z9",
            zone_fallback: ZoneFallback::DefaultC3,
            ..reference()
        };
        let rates = BillingRates::default();
        let reg = bill(BillingStrategy::Regulatory, input, &rates).unwrap();
        let com = bill(
            BillingStrategy::Commercial {
                delegate: Delegate::GreenFlex,
            },
            input,
            &rates,
        )
        .unwrap();
        assert_eq!(reg.climate_coefficient(), 46);
        assert_eq!(com.climate_coefficient(), 46);
    }

    #[test]
    fn commercial_rejects_non_positive_surface() {
        let input = SavingsInput {
            surface_m2: 0.0,
            ..reference()
        };
        assert_eq!(
            commercial(input, Delegate::Eiffage, &BillingRates::default()),
            Err(SavingsError::InvalidSurface(0.0))
        );
    }

    #[test]
    fn delegate_parsing() {
        assert_eq!("eiffage".parse::<Delegate>(), Ok(Delegate::Eiffage));
        assert_eq!("GREENFLEX".parse::<Delegate>(), Ok(Delegate::GreenFlex));
        assert!("acme".parse::<Delegate>().is_err());
    }
}
