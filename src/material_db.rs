/// 자주 쓰는 단열재의 대표 열전도율 테이블.
/// 값은 참고용이며 실제 정산에는 제품 인증서(DoP)의 λ를 입력해야 한다.

#[derive(Debug)]
pub struct MaterialData {
    pub code: &'static str,
    pub name: &'static str,
    pub notes: &'static str,
    /// 열전도율 [W/m·K]
    pub lambda: f64,
    /// 흔히 쓰는 두께 [mm]
    pub typical_thickness_mm: f64,
}

impl MaterialData {
    /// 대표 두께에서의 열저항 [m²·K/W]
    pub fn typical_resistance(&self) -> f64 {
        crate::thermal::layer::layer_resistance(self.typical_thickness_mm, self.lambda)
    }
}

pub fn materials() -> &'static [MaterialData] {
    MATERIALS
}

pub fn find_material(code: &str) -> Option<&'static MaterialData> {
    MATERIALS
        .iter()
        .find(|m| m.code.eq_ignore_ascii_case(code) || m.name.eq_ignore_ascii_case(code))
}

const MATERIALS: &[MaterialData] = &[
    MaterialData {
        code: "MW",
        name: "Mineral wool",
        notes: "유리면/암면 매트, 다락 바닥 시공용",
        lambda: 0.040,
        typical_thickness_mm: 200.0,
    },
    MaterialData {
        code: "MW-BLOWN",
        name: "Blown mineral wool",
        notes: "취입 시공, 침하 보정 두께 기준",
        lambda: 0.046,
        typical_thickness_mm: 250.0,
    },
    MaterialData {
        code: "CELL",
        name: "Blown cellulose",
        notes: "셀룰로오스 취입",
        lambda: 0.039,
        typical_thickness_mm: 250.0,
    },
    MaterialData {
        code: "EPS",
        name: "Expanded polystyrene",
        notes: "EPS 보드",
        lambda: 0.037,
        typical_thickness_mm: 80.0,
    },
    MaterialData {
        code: "EPS-G",
        name: "Graphite EPS",
        notes: "흑연 첨가 EPS",
        lambda: 0.031,
        typical_thickness_mm: 80.0,
    },
    MaterialData {
        code: "XPS",
        name: "Extruded polystyrene",
        notes: "XPS 보드, 습윤 부위",
        lambda: 0.034,
        typical_thickness_mm: 60.0,
    },
    MaterialData {
        code: "PIR",
        name: "Polyisocyanurate board",
        notes: "알루미늄 면재 PIR",
        lambda: 0.022,
        typical_thickness_mm: 60.0,
    },
    MaterialData {
        code: "PUR-SPRAY",
        name: "Sprayed polyurethane",
        notes: "현장 발포 PUR",
        lambda: 0.028,
        typical_thickness_mm: 50.0,
    },
    MaterialData {
        code: "WOOD-FIBRE",
        name: "Wood fibre board",
        notes: "목섬유 보드",
        lambda: 0.042,
        typical_thickness_mm: 100.0,
    },
    MaterialData {
        code: "CORK",
        name: "Expanded cork",
        notes: "팽창 코르크 보드",
        lambda: 0.040,
        typical_thickness_mm: 60.0,
    },
    MaterialData {
        code: "PLASTER",
        name: "Gypsum plasterboard",
        notes: "석고보드, 단열재 아님 (마감층)",
        lambda: 0.250,
        typical_thickness_mm: 13.0,
    },
];

// NOTE:
// - λ values are typical declared values for products on the market; always use the product's declared value.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermal::layer::{LAMBDA_MAX, LAMBDA_MIN};

    #[test]
    fn catalog_lambdas_are_accepted_by_layers() {
        for m in materials() {
            assert!(
                (LAMBDA_MIN..=LAMBDA_MAX).contains(&m.lambda),
                "{} lambda {}",
                m.code,
                m.lambda
            );
            assert!(m.typical_resistance() > 0.0);
        }
    }

    #[test]
    fn lookup_by_code_or_name() {
        assert_eq!(find_material("eps").map(|m| m.code), Some("EPS"));
        assert_eq!(
            find_material("blown cellulose").map(|m| m.code),
            Some("CELL")
        );
        assert!(find_material("asbestos").is_none());
    }
}
