//! 세션 전체가 공유하는 기후대 값을 하나로 유지한다.
//!
//! 입력은 두 가지다. 주소 조회 뒤 비동기로 도착하는 탐지 결과와 상담자의 수동 지정.
//! 상태는 `Unset -> Detected -> (Detected | ManuallyOverridden) -> ...` 로 흐르며
//! 종료 상태는 없다.
//!
//! 탐지 요청마다 세대 토큰을 발급하고, 가장 최근 토큰을 가진 응답만 반영한다.
//! 이미 현재 값과 같은 코드는 구독자에게 알리지 않는다.

use super::detection::ZoneDetection;
use super::zones::{self, ZoneError, DEFAULT_ZONE};

/// 현재 값이 어디서 왔는지.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSource {
    /// 아무 신호도 없어 기본값(C3)을 쓰는 중
    Unset,
    Detected,
    ManuallyOverridden,
}

/// 탐지 요청 하나에 붙는 세대 토큰.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DetectionTicket(u64);

impl DetectionTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// 구독자에게 전달되는 변경 내용.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneChange {
    pub previous: String,
    pub current: String,
    pub source: ZoneSource,
    /// 몇 번째 알림인지 (1부터)
    pub revision: u64,
}

/// 신호 하나를 처리한 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// 코드가 바뀌어 구독자에게 알렸다.
    Changed(ZoneChange),
    /// 코드는 그대로다. 메타데이터는 갱신되었을 수 있다.
    Unchanged,
    /// 최신이 아닌 토큰의 응답이라 버렸다.
    Stale { ticket: DetectionTicket, latest: DetectionTicket },
    /// 탐지기가 등록되지 않은 코드를 돌려주었다.
    Rejected(ZoneError),
    /// 탐지기가 아무 결과도 주지 않았다.
    NoResult,
}

impl SyncOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, SyncOutcome::Changed(_))
    }
}

pub type ZoneSubscriber = Box<dyn FnMut(&ZoneChange) + Send>;

pub struct ClimateZoneSynchronizer {
    code: String,
    source: ZoneSource,
    detection: Option<ZoneDetection>,
    generation: u64,
    revision: u64,
    subscribers: Vec<ZoneSubscriber>,
}

impl std::fmt::Debug for ClimateZoneSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClimateZoneSynchronizer")
            .field("code", &self.code)
            .field("source", &self.source)
            .field("detection", &self.detection)
            .field("generation", &self.generation)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for ClimateZoneSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClimateZoneSynchronizer {
    pub fn new() -> Self {
        Self {
            code: DEFAULT_ZONE.to_string(),
            source: ZoneSource::Unset,
            detection: None,
            generation: 0,
            revision: 0,
            subscribers: Vec::new(),
        }
    }

    /// 저장된 값으로 복원한다. 구독자 알림은 없다.
    ///
    /// 등록되지 않은 코드는 무시하고 기본값으로 시작한다.
    pub fn restored(code: &str, detection: Option<ZoneDetection>) -> Self {
        let mut sync = Self::new();
        if zones::is_valid_zone(code) {
            sync.code = code.trim().to_string();
            sync.source = if detection.is_some() {
                ZoneSource::Detected
            } else {
                ZoneSource::ManuallyOverridden
            };
            sync.detection = detection;
        } else {
            tracing::warn!(code, "restored climate zone is not registered, using default");
        }
        sync
    }

    pub fn current_code(&self) -> &str {
        &self.code
    }

    pub fn source(&self) -> ZoneSource {
        self.source
    }

    pub fn detection(&self) -> Option<&ZoneDetection> {
        self.detection.as_ref()
    }

    /// 지금까지 보낸 알림 수.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&ZoneChange) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// 새 탐지 요청용 토큰을 발급한다. 이전 토큰은 모두 무효가 된다.
    pub fn begin_detection(&mut self) -> DetectionTicket {
        self.generation += 1;
        tracing::debug!(generation = self.generation, "zone detection requested");
        DetectionTicket(self.generation)
    }

    /// 탐지 응답을 반영한다.
    ///
    /// 최신 토큰의 응답만 상태를 바꾼다. 유효한 결과는 항상 코드와 메타데이터를
    /// 덮어쓰지만, 코드가 같으면 알림은 보내지 않는다.
    pub fn apply_detection(
        &mut self,
        ticket: DetectionTicket,
        result: Option<ZoneDetection>,
    ) -> SyncOutcome {
        let latest = DetectionTicket(self.generation);
        if ticket != latest {
            tracing::debug!(
                ticket = ticket.0,
                latest = latest.0,
                "stale zone detection discarded"
            );
            return SyncOutcome::Stale { ticket, latest };
        }
        let Some(detection) = result else {
            tracing::debug!(generation = ticket.0, "zone detection returned no result");
            return SyncOutcome::NoResult;
        };
        let Some(zone) = zones::find_zone(&detection.zone_code) else {
            let err = ZoneError {
                code: detection.zone_code.clone(),
            };
            tracing::warn!(code = %detection.zone_code, "detector returned unknown zone");
            return SyncOutcome::Rejected(err);
        };
        tracing::info!(
            zone = zone.code,
            confidence = ?detection.confidence,
            reference_city = ?detection.reference_city,
            "zone detection applied"
        );
        self.detection = Some(detection);
        self.set_code(zone.code, ZoneSource::Detected)
    }

    /// 상담자가 직접 기후대를 지정한다. 탐지 메타데이터는 지워진다.
    ///
    /// 진행 중인 탐지 요청은 이후 도착해도 버려진다.
    pub fn set_manual(&mut self, code: &str) -> Result<SyncOutcome, ZoneError> {
        let zone = zones::find_zone(code).ok_or_else(|| ZoneError {
            code: code.to_string(),
        })?;
        self.generation += 1;
        self.detection = None;
        Ok(self.set_code(zone.code, ZoneSource::ManuallyOverridden))
    }

    fn set_code(&mut self, code: &str, source: ZoneSource) -> SyncOutcome {
        self.source = source;
        if self.code == code {
            tracing::debug!(zone = code, ?source, "zone unchanged, no notification");
            return SyncOutcome::Unchanged;
        }
        self.revision += 1;
        let change = ZoneChange {
            previous: std::mem::replace(&mut self.code, code.to_string()),
            current: code.to_string(),
            source,
            revision: self.revision,
        };
        tracing::debug!(
            previous = %change.previous,
            current = %change.current,
            ?source,
            revision = change.revision,
            "zone changed"
        );
        for subscriber in &mut self.subscribers {
            subscriber(&change);
        }
        SyncOutcome::Changed(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::detection::Confidence;
    use std::sync::{Arc, Mutex};

    fn counting(sync: &mut ClimateZoneSynchronizer) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sync.subscribe(move |change| sink.lock().unwrap().push(change.current.clone()));
        seen
    }

    fn detected(code: &str) -> ZoneDetection {
        ZoneDetection {
            confidence: Some(Confidence::High),
            reference_city: Some("Madrid".into()),
            ..ZoneDetection::bare(code)
        }
    }

    #[test]
    fn defaults_to_c3_when_unset() {
        let sync = ClimateZoneSynchronizer::new();
        assert_eq!(sync.current_code(), "C3");
        assert_eq!(sync.source(), ZoneSource::Unset);
    }

    #[test]
    fn detection_overwrites_and_notifies() {
        let mut sync = ClimateZoneSynchronizer::new();
        let seen = counting(&mut sync);
        let ticket = sync.begin_detection();
        let outcome = sync.apply_detection(ticket, Some(detected("D3")));
        assert!(outcome.is_changed());
        assert_eq!(sync.current_code(), "D3");
        assert_eq!(sync.source(), ZoneSource::Detected);
        assert_eq!(*seen.lock().unwrap(), vec!["D3".to_string()]);
        assert_eq!(sync.revision(), 1);
    }

    #[test]
    fn repeated_detection_does_not_notify_again() {
        let mut sync = ClimateZoneSynchronizer::new();
        let seen = counting(&mut sync);
        let t1 = sync.begin_detection();
        sync.apply_detection(t1, Some(detected("D3")));
        let t2 = sync.begin_detection();
        let outcome = sync.apply_detection(
            t2,
            Some(ZoneDetection {
                distance_km: Some(12.0),
                ..detected("D3")
            }),
        );
        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(sync.detection().and_then(|d| d.distance_km), Some(12.0));
    }

    #[test]
    fn detection_matching_default_is_silent() {
        let mut sync = ClimateZoneSynchronizer::new();
        let seen = counting(&mut sync);
        let t = sync.begin_detection();
        assert_eq!(sync.apply_detection(t, Some(detected("C3"))), SyncOutcome::Unchanged);
        assert_eq!(sync.source(), ZoneSource::Detected);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn stale_detection_is_discarded() {
        let mut sync = ClimateZoneSynchronizer::new();
        let old = sync.begin_detection();
        let new = sync.begin_detection();
        let outcome = sync.apply_detection(old, Some(detected("E1")));
        assert_eq!(outcome, SyncOutcome::Stale { ticket: old, latest: new });
        assert_eq!(sync.current_code(), "C3");
        assert!(sync.detection().is_none());

        assert!(sync.apply_detection(new, Some(detected("A3"))).is_changed());
        assert_eq!(sync.current_code(), "A3");
    }

    #[test]
    fn manual_override_clears_metadata_and_invalidates_pending_detection() {
        let mut sync = ClimateZoneSynchronizer::new();
        let seen = counting(&mut sync);
        let t1 = sync.begin_detection();
        sync.apply_detection(t1, Some(detected("D3")));
        let pending = sync.begin_detection();

        let outcome = sync.set_manual("B4").unwrap();
        assert!(outcome.is_changed());
        assert!(sync.detection().is_none());
        assert_eq!(sync.source(), ZoneSource::ManuallyOverridden);

        let late = sync.apply_detection(pending, Some(detected("E1")));
        assert!(matches!(late, SyncOutcome::Stale { .. }));
        assert_eq!(sync.current_code(), "B4");
        assert_eq!(*seen.lock().unwrap(), vec!["D3".to_string(), "B4".to_string()]);
    }

    #[test]
    fn manual_invalid_code_is_rejected_without_change() {
        let mut sync = ClimateZoneSynchronizer::new();
        assert!(sync.set_manual("Z9").is_err());
        assert_eq!(sync.current_code(), "C3");
        assert_eq!(sync.source(), ZoneSource::Unset);
    }

    #[test]
    fn unknown_detected_code_is_rejected() {
        let mut sync = ClimateZoneSynchronizer::new();
        let t = sync.begin_detection();
        let outcome = sync.apply_detection(t, Some(ZoneDetection::bare("Z9")));
        assert!(matches!(outcome, SyncOutcome::Rejected(_)));
        assert_eq!(sync.current_code(), "C3");
    }

    #[test]
    fn empty_detection_keeps_state() {
        let mut sync = ClimateZoneSynchronizer::new();
        sync.set_manual("A4").unwrap();
        let t = sync.begin_detection();
        assert_eq!(sync.apply_detection(t, None), SyncOutcome::NoResult);
        assert_eq!(sync.current_code(), "A4");
    }

    #[test]
    fn restore_keeps_valid_code_silently() {
        let sync = ClimateZoneSynchronizer::restored("E1", Some(detected("E1")));
        assert_eq!(sync.current_code(), "E1");
        assert_eq!(sync.source(), ZoneSource::Detected);
        assert_eq!(sync.revision(), 0);

        let bad = ClimateZoneSynchronizer::restored("Q1", None);
        assert_eq!(bad.current_code(), "C3");
        assert_eq!(bad.source(), ZoneSource::Unset);
    }
}
