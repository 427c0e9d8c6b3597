use serde::{Deserialize, Serialize};

/// 아무 신호도 없을 때 쓰는 기본 기후대.
pub const DEFAULT_ZONE: &str = "C3";

/// 기후대와 G 계수(천 도·시간/년).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimateZone {
    pub code: &'static str,
    pub coefficient_g: u32,
}

/// 알 수 없는 기후대 코드.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneError {
    pub code: String,
}

impl std::fmt::Display for ZoneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "알 수 없는 기후대 '{}' (허용: {})",
            self.code,
            zone_codes().collect::<Vec<_>>().join(", ")
        )
    }
}

impl std::error::Error for ZoneError {}

/// 잘못된 기후대 코드를 만났을 때의 처리 방침.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneFallback {
    /// 오류로 거부한다.
    #[default]
    Reject,
    /// C3(46)로 대체한다.
    DefaultC3,
}

/// 방침을 적용한 뒤의 기후대.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedZone {
    pub zone: ClimateZone,
    /// true면 입력 코드가 잘못되어 기본 기후대로 대체되었다.
    pub substituted: bool,
}

pub fn zones() -> &'static [ClimateZone] {
    ZONES
}

/// 등록된 12개 코드를 고정된 순서로 돌려준다.
pub fn zone_codes() -> impl Iterator<Item = &'static str> {
    ZONES.iter().map(|z| z.code)
}

pub fn is_valid_zone(code: &str) -> bool {
    find_zone(code).is_some()
}

pub fn find_zone(code: &str) -> Option<ClimateZone> {
    ZONES.iter().copied().find(|z| z.code == code.trim())
}

pub fn coefficient_for(code: &str) -> Result<u32, ZoneError> {
    find_zone(code).map(|z| z.coefficient_g).ok_or_else(|| ZoneError {
        code: code.to_string(),
    })
}

/// 방침에 따라 기후대를 확정한다. 대체가 일어나면 경고를 남긴다.
pub fn resolve_zone(code: &str, fallback: ZoneFallback) -> Result<ResolvedZone, ZoneError> {
    if let Some(zone) = find_zone(code) {
        return Ok(ResolvedZone {
            zone,
            substituted: false,
        });
    }
    match fallback {
        ZoneFallback::Reject => Err(ZoneError {
            code: code.to_string(),
        }),
        ZoneFallback::DefaultC3 => {
            tracing::warn!(code, fallback = DEFAULT_ZONE, "unknown climate zone substituted");
            Ok(ResolvedZone {
                zone: default_zone(),
                substituted: true,
            })
        }
    }
}

pub fn default_zone() -> ClimateZone {
    ClimateZone {
        code: DEFAULT_ZONE,
        coefficient_g: 46,
    }
}

const ZONES: &[ClimateZone] = &[
    zone("A3", 25),
    zone("A4", 26),
    zone("B3", 32),
    zone("B4", 33),
    zone("C1", 44),
    zone("C2", 45),
    zone("C3", 46),
    zone("C4", 46),
    zone("D1", 60),
    zone("D2", 60),
    zone("D3", 61),
    zone("E1", 74),
];

const fn zone(code: &'static str, coefficient_g: u32) -> ClimateZone {
    ClimateZone {
        code,
        coefficient_g,
    }
}
