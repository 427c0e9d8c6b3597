//! 기후대 등록부, 탐지, 동기화 모듈 모음.

pub mod detection;
pub mod sync;
pub mod zones;

pub use detection::{Confidence, Coordinates, ReferenceCityDetector, ZoneDetection, ZoneDetector};
pub use sync::{ClimateZoneSynchronizer, DetectionTicket, SyncOutcome, ZoneChange, ZoneSource};
pub use zones::{
    coefficient_for, is_valid_zone, resolve_zone, zone_codes, ClimateZone, ResolvedZone,
    ZoneError, ZoneFallback, DEFAULT_ZONE,
};
