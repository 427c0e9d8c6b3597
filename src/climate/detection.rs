//! 외부 기후대 탐지 결과의 계약과, 좌표 기반 기준 도시 탐지기.

use serde::{Deserialize, Serialize};

use super::zones;

/// 탐지 신뢰도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// 탐지기가 돌려주는 기후대와 부가 정보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDetection {
    pub zone_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ZoneDetection {
    /// 부가 정보 없이 코드만 가진 결과.
    pub fn bare(zone_code: impl Into<String>) -> Self {
        Self {
            zone_code: zone_code.into(),
            confidence: None,
            method: None,
            reference_city: None,
            distance_km: None,
            description: None,
        }
    }
}

/// 위경도 [deg]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// 기후대 탐지 협력자. 결과가 없으면 수동 입력만 가능하다.
///
/// 호출 측에서 별도 스레드로 돌리고, 결과는 동기화기에 세대 토큰과 함께 넘긴다.
pub trait ZoneDetector: Send + Sync {
    fn detect(&self, at: Coordinates) -> Option<ZoneDetection>;
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceCity {
    pub name: &'static str,
    pub zone_code: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// 가장 가까운 기준 도시의 기후대를 고른다.
#[derive(Debug, Clone)]
pub struct ReferenceCityDetector {
    cities: &'static [ReferenceCity],
    /// 이 거리[km]를 넘으면 결과를 내지 않는다.
    pub max_distance_km: f64,
}

impl Default for ReferenceCityDetector {
    fn default() -> Self {
        Self {
            cities: REFERENCE_CITIES,
            max_distance_km: 250.0,
        }
    }
}

const EARTH_RADIUS_KM: f64 = 6371.0;

/// 대원 거리 [km]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

fn confidence_for(distance_km: f64) -> Confidence {
    if distance_km <= 25.0 {
        Confidence::High
    } else if distance_km <= 75.0 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

impl ReferenceCityDetector {
    pub fn cities(&self) -> &'static [ReferenceCity] {
        self.cities
    }
}

impl ZoneDetector for ReferenceCityDetector {
    fn detect(&self, at: Coordinates) -> Option<ZoneDetection> {
        if !at.lat.is_finite() || !at.lon.is_finite() {
            return None;
        }
        let (city, distance_km) = self
            .cities
            .iter()
            .map(|c| (c, haversine_km(at, Coordinates { lat: c.lat, lon: c.lon })))
            .min_by(|a, b| a.1.total_cmp(&b.1))?;
        if distance_km > self.max_distance_km {
            tracing::debug!(distance_km, city = city.name, "nearest reference city too far");
            return None;
        }
        debug_assert!(zones::is_valid_zone(city.zone_code));
        Some(ZoneDetection {
            zone_code: city.zone_code.to_string(),
            confidence: Some(confidence_for(distance_km)),
            method: Some("nearest_reference_city".to_string()),
            reference_city: Some(city.name.to_string()),
            distance_km: Some(distance_km),
            description: Some(format!(
                "{} 기준 ({distance_km:.1} km)",
                city.name
            )),
        })
    }
}

const REFERENCE_CITIES: &[ReferenceCity] = &[
    city("A Coruña", "C1", 43.362, -8.411),
    city("Albacete", "D3", 38.994, -1.858),
    city("Alicante", "B4", 38.345, -0.481),
    city("Almería", "A4", 36.834, -2.464),
    city("Badajoz", "C4", 38.879, -6.970),
    city("Barcelona", "C2", 41.385, 2.173),
    city("Bilbao", "C1", 43.263, -2.935),
    city("Burgos", "E1", 42.344, -3.697),
    city("Cáceres", "C4", 39.475, -6.372),
    city("Cádiz", "A3", 36.527, -6.289),
    city("Castellón", "B3", 39.986, -0.051),
    city("Ciudad Real", "C4", 38.985, -3.927),
    city("Córdoba", "B4", 37.888, -4.779),
    city("Cuenca", "D2", 40.070, -2.137),
    city("Girona", "D2", 41.979, 2.821),
    city("Granada", "C3", 37.177, -3.599),
    city("Guadalajara", "D3", 40.633, -3.167),
    city("Huelva", "A4", 37.261, -6.945),
    city("Huesca", "D2", 42.140, -0.408),
    city("Jaén", "C4", 37.779, -3.785),
    city("León", "E1", 42.599, -5.567),
    city("Lleida", "D3", 41.617, 0.620),
    city("Logroño", "D2", 42.465, -2.450),
    city("Lugo", "D1", 43.012, -7.556),
    city("Madrid", "D3", 40.417, -3.704),
    city("Málaga", "A3", 36.721, -4.421),
    city("Murcia", "B3", 37.992, -1.131),
    city("Ourense", "D2", 42.336, -7.864),
    city("Oviedo", "D1", 43.362, -5.849),
    city("Palencia", "D1", 42.010, -4.532),
    city("Palma", "B3", 39.570, 2.650),
    city("Pamplona", "D1", 42.812, -1.646),
    city("Pontevedra", "C1", 42.431, -8.644),
    city("Salamanca", "D2", 40.970, -5.664),
    city("San Sebastián", "D1", 43.318, -1.981),
    city("Santander", "C1", 43.462, -3.810),
    city("Segovia", "D2", 40.943, -4.109),
    city("Sevilla", "B4", 37.389, -5.984),
    city("Soria", "E1", 41.764, -2.465),
    city("Tarragona", "B3", 41.119, 1.245),
    city("Teruel", "D2", 40.345, -1.106),
    city("Toledo", "C4", 39.863, -4.027),
    city("Valencia", "B3", 39.470, -0.376),
    city("Valladolid", "D2", 41.652, -4.724),
    city("Vitoria-Gasteiz", "D1", 42.847, -2.672),
    city("Zamora", "D2", 41.503, -5.744),
    city("Zaragoza", "D3", 41.649, -0.889),
];

const fn city(name: &'static str, zone_code: &'static str, lat: f64, lon: f64) -> ReferenceCity {
    ReferenceCity {
        name,
        zone_code,
        lat,
        lon,
    }
}
