use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use crate::climate::{
    Coordinates, DetectionTicket, ReferenceCityDetector, SyncOutcome, ZoneDetection, ZoneDetector,
    ZoneError,
};
use crate::config::{Config, ConfigError};
use crate::persistence::PersistError;
use crate::project::ProjectError;
use crate::savings::SavingsError;
use crate::session::CalculationSession;
use crate::thermal::{LayerStage, MaterialError};
use crate::ui_cli;
use crate::ui_cli::MenuChoice;

/// 애플리케이션 실행 중 발생 가능한 오류를 표현한다.
#[derive(Debug)]
pub enum AppError {
    /// 파일 입출력 오류
    Io(std::io::Error),
    /// 설정 저장/로드 오류
    Config(ConfigError),
    /// 스냅샷 저장/로드 오류
    Persist(PersistError),
    /// 프로젝트 파일 오류
    Project(ProjectError),
    /// 층 입력 오류
    Material(MaterialError),
    /// 기후대 오류
    Zone(ZoneError),
    /// CAE/정산 계산 오류
    Savings(SavingsError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Io(e) => write!(f, "입출력 오류: {e}"),
            AppError::Config(e) => write!(f, "설정 오류: {e}"),
            AppError::Persist(e) => write!(f, "저장 오류: {e}"),
            AppError::Project(e) => write!(f, "프로젝트 오류: {e}"),
            AppError::Material(e) => write!(f, "층 입력 오류: {e}"),
            AppError::Zone(e) => write!(f, "기후대 오류: {e}"),
            AppError::Savings(e) => write!(f, "계산 오류: {e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<PersistError> for AppError {
    fn from(value: PersistError) -> Self {
        AppError::Persist(value)
    }
}

impl From<ProjectError> for AppError {
    fn from(value: ProjectError) -> Self {
        AppError::Project(value)
    }
}

impl From<MaterialError> for AppError {
    fn from(value: MaterialError) -> Self {
        AppError::Material(value)
    }
}

impl From<ZoneError> for AppError {
    fn from(value: ZoneError) -> Self {
        AppError::Zone(value)
    }
}

impl From<SavingsError> for AppError {
    fn from(value: SavingsError) -> Self {
        AppError::Savings(value)
    }
}

type DetectionReply = (DetectionTicket, Option<ZoneDetection>);

/// 백그라운드 기후대 탐지 요청과 응답 채널.
pub struct DetectionChannel {
    detector: Arc<dyn ZoneDetector>,
    tx: Sender<DetectionReply>,
    rx: Receiver<DetectionReply>,
}

impl Default for DetectionChannel {
    fn default() -> Self {
        Self::new(Arc::new(ReferenceCityDetector::default()))
    }
}

impl DetectionChannel {
    pub fn new(detector: Arc<dyn ZoneDetector>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { detector, tx, rx }
    }

    /// 토큰을 받아 별도 스레드에서 탐지를 시작한다. 호출자는 기다리지 않는다.
    pub fn request(&self, session: &mut CalculationSession, at: Coordinates) {
        let ticket = session.begin_zone_detection();
        let detector = Arc::clone(&self.detector);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = detector.detect(at);
            // 세션이 먼저 끝났으면 수신자가 없다.
            let _ = tx.send((ticket, result));
        });
    }

    /// 도착한 응답을 모두 세션에 반영한다.
    pub fn drain(&self, session: &mut CalculationSession) -> Vec<SyncOutcome> {
        self.rx
            .try_iter()
            .map(|(ticket, result)| session.complete_zone_detection(ticket, result))
            .collect()
    }
}

/// CLI 애플리케이션의 메인 루프를 실행한다.
pub fn run(config: &Config, session: &mut CalculationSession) -> Result<(), AppError> {
    let detection = DetectionChannel::default();
    loop {
        for outcome in detection.drain(session) {
            ui_cli::print_sync_outcome(&outcome);
        }
        match ui_cli::main_menu(session)? {
            MenuChoice::BeforeLayers => ui_cli::handle_layers(session, LayerStage::Before)?,
            MenuChoice::AfterLayers => ui_cli::handle_layers(session, LayerStage::After)?,
            MenuChoice::Geometry => ui_cli::handle_geometry(session)?,
            MenuChoice::ClimateZone => ui_cli::handle_climate_zone(session, &detection)?,
            MenuChoice::Results => ui_cli::handle_results(session)?,
            MenuChoice::Reset => {
                session.reset();
                println!("세션을 초기화했습니다.");
            }
            MenuChoice::Exit => {
                session.flush();
                tracing::debug!(
                    key = session.key(),
                    dir = ?config.persistence.directory,
                    "session closed"
                );
                println!("종료합니다.");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionOptions;
    use std::time::{Duration, Instant};

    struct FixedDetector(&'static str);

    impl ZoneDetector for FixedDetector {
        fn detect(&self, _at: Coordinates) -> Option<ZoneDetection> {
            Some(ZoneDetection::bare(self.0))
        }
    }

    #[test]
    fn background_detection_is_applied_on_drain() {
        let channel = DetectionChannel::new(Arc::new(FixedDetector("E1")));
        let mut session = CalculationSession::new("k", SessionOptions::default());
        channel.request(&mut session, Coordinates { lat: 0.0, lon: 0.0 });

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut outcomes = Vec::new();
        while outcomes.is_empty() && Instant::now() < deadline {
            outcomes = channel.drain(&mut session);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(outcomes[0].is_changed());
        assert_eq!(session.zone().current_code(), "E1");
    }

    #[test]
    fn superseded_request_is_discarded() {
        let channel = DetectionChannel::new(Arc::new(FixedDetector("A3")));
        let mut session = CalculationSession::new("k", SessionOptions::default());
        channel.request(&mut session, Coordinates { lat: 0.0, lon: 0.0 });
        channel.request(&mut session, Coordinates { lat: 1.0, lon: 1.0 });

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut outcomes = Vec::new();
        while outcomes.len() < 2 && Instant::now() < deadline {
            outcomes.extend(channel.drain(&mut session));
            std::thread::sleep(Duration::from_millis(5));
        }
        let stale = outcomes
            .iter()
            .filter(|o| matches!(o, SyncOutcome::Stale { .. }))
            .count();
        assert_eq!(stale, 1);
        assert_eq!(session.zone().revision(), 1);
    }
}
