use crate::climate::zones::{self, ZoneError, ZoneFallback};

/// 에너지 절감 인증서(CAE) 공식의 FP 계수. 항상 1이다.
pub const FP: f64 = 1.0;

/// 절감량/정산 계산 오류를 표현한다.
#[derive(Debug, Clone, PartialEq)]
pub enum SavingsError {
    /// 면적이 0 이하이거나 유한하지 않음
    InvalidSurface(f64),
    /// 등록되지 않은 기후대
    Zone(ZoneError),
}

impl std::fmt::Display for SavingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SavingsError::InvalidSurface(s) => write!(f, "면적은 0보다 커야 합니다 (입력: {s} m²)"),
            SavingsError::Zone(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SavingsError {}

impl From<ZoneError> for SavingsError {
    fn from(value: ZoneError) -> Self {
        SavingsError::Zone(value)
    }
}

/// CAE와 정산 계산의 공통 입력.
#[derive(Debug, Clone, Copy)]
pub struct SavingsInput<'a> {
    /// 시공 전 열관류율 [W/m²·K]
    pub ui: f64,
    /// 시공 후 열관류율 [W/m²·K]
    pub uf: f64,
    /// 시공 면적 [m²]
    pub surface_m2: f64,
    pub zone_code: &'a str,
    pub zone_fallback: ZoneFallback,
}

/// CAE 계산 결과.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaeResult {
    /// 연간 절감량 [kWh/년]. 음수도 그대로 둔다.
    pub cae_kwh_per_year: f64,
    /// 사용한 G 계수
    pub coefficient_g: u32,
    /// 실제 사용한 기후대 코드
    pub zone_code: &'static str,
    /// 기후대가 기본값으로 대체되었는지 여부
    pub zone_substituted: bool,
}

impl CaeResult {
    /// 시공 후 열관류율이 더 나빠진 경우
    pub fn is_negative(&self) -> bool {
        self.cae_kwh_per_year < 0.0
    }
}

pub(crate) fn validate_surface(surface_m2: f64) -> Result<f64, SavingsError> {
    if surface_m2.is_finite() && surface_m2 > 0.0 {
        Ok(surface_m2)
    } else {
        Err(SavingsError::InvalidSurface(surface_m2))
    }
}

/// `CAE = FP × (Ui − Uf) × 면적 × G`
///
/// 부작용이 없는 순수 함수이다. Uf > Ui 이면 음수가 나오며 경고만 남긴다.
pub fn cae(input: SavingsInput<'_>) -> Result<CaeResult, SavingsError> {
    let surface = validate_surface(input.surface_m2)?;
    let resolved = zones::resolve_zone(input.zone_code, input.zone_fallback)?;
    let g = resolved.zone.coefficient_g;
    let value = FP * (input.ui - input.uf) * surface * f64::from(g);
    if value < 0.0 {
        tracing::warn!(
            ui = input.ui,
            uf = input.uf,
            cae = value,
            "negative CAE: retrofit U-value is worse than the initial one"
        );
    }
    Ok(CaeResult {
        cae_kwh_per_year: value,
        coefficient_g: g,
        zone_code: resolved.zone.code,
        zone_substituted: resolved.substituted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(ui: f64, uf: f64, surface_m2: f64, zone_code: &str) -> SavingsInput<'_> {
        SavingsInput {
            ui,
            uf,
            surface_m2,
            zone_code,
            zone_fallback: ZoneFallback::Reject,
        }
    }

    #[test]
    fn reference_cae() {
        let res = cae(input(2.0, 0.5, 100.0, "C3")).unwrap();
        assert_eq!(res.cae_kwh_per_year, 6900.0);
        assert_eq!(res.coefficient_g, 46);
        assert!(!res.zone_substituted);
    }

    #[test]
    fn identical_inputs_give_identical_bits() {
        let a = cae(input(1.234, 0.321, 87.5, "D1")).unwrap();
        let b = cae(input(1.234, 0.321, 87.5, "D1")).unwrap();
        assert_eq!(a.cae_kwh_per_year.to_bits(), b.cae_kwh_per_year.to_bits());
    }

    #[test]
    fn negative_cae_is_not_clamped() {
        let res = cae(input(0.5, 0.8, 10.0, "A3")).unwrap();
        assert!(res.is_negative());
        assert!((res.cae_kwh_per_year - (-75.0)).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_surface() {
        assert_eq!(
            cae(input(2.0, 0.5, 0.0, "C3")),
            Err(SavingsError::InvalidSurface(0.0))
        );
        assert!(cae(input(2.0, 0.5, -3.0, "C3")).is_err());
    }

    #[test]
    fn unknown_zone_follows_policy() {
        assert!(matches!(
            cae(input(2.0, 0.5, 100.0, "Z9")),
            Err(SavingsError::Zone(_))
        ));
        let res = cae(SavingsInput {
            zone_fallback: ZoneFallback::DefaultC3,
            ..input(2.0, 0.5, 100.0, "Z9")
        })
        .unwrap();
        assert!(res.zone_substituted);
        assert_eq!(res.zone_code, "C3");
        assert_eq!(res.cae_kwh_per_year, 6900.0);
    }

    proptest! {
        #[test]
        fn swapping_u_values_flips_sign(
            ui in 0.05f64..5.0,
            uf in 0.05f64..5.0,
            surface in 0.1f64..5_000.0,
        ) {
            let a = cae(input(ui, uf, surface, "E1")).unwrap().cae_kwh_per_year;
            let b = cae(input(uf, ui, surface, "E1")).unwrap().cae_kwh_per_year;
            prop_assert!((a + b).abs() <= 1e-9 * a.abs().max(1.0));
        }
    }
}
