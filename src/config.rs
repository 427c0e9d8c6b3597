use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::climate::ZoneFallback;
use crate::persistence::DEFAULT_DEBOUNCE_MS;
use crate::savings::BillingRates;
use crate::session::SessionOptions;
use crate::thermal::resistance::{BoundaryResistances, DEFAULT_RSE, DEFAULT_RSI};

/// 기본 설정 파일 경로
pub const CONFIG_FILE: &str = "config.toml";

/// 표면 열저항 기본값.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub rsi: f64,
    pub rse: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            rsi: DEFAULT_RSI,
            rse: DEFAULT_RSE,
        }
    }
}

/// 스냅샷 저장 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// 디바운스 지연 [ms]
    pub debounce_ms: u64,
    /// JSON 스냅샷 디렉터리
    pub directory: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            directory: PathBuf::from("sessions"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub zone_fallback: ZoneFallback,
}

/// 애플리케이션 설정을 표현한다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub boundary: BoundaryConfig,
    pub billing: BillingRates,
    pub persistence: PersistenceConfig,
    pub climate: ClimateConfig,
}

impl Config {
    /// 세션 생성 옵션으로 변환한다.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            boundary: BoundaryResistances::new(self.boundary.rsi, self.boundary.rse).sanitized(),
            rates: self.billing,
            zone_fallback: self.climate.zone_fallback,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.persistence.debounce_ms)
    }
}

/// 설정 로드/저장 시 발생 가능한 오류를 표현한다.
#[derive(Debug)]
pub enum ConfigError {
    /// 파일 입출력 오류
    Io(std::io::Error),
    /// TOML 직렬화/역직렬화 오류
    Serde(toml::de::Error),
    /// TOML 직렬화 오류
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "파일 입출력 오류: {e}"),
            ConfigError::Serde(e) => write!(f, "설정 파싱 오류: {e}"),
            ConfigError::Serialize(e) => write!(f, "설정 직렬화 오류: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Serde(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        ConfigError::Serialize(value)
    }
}

/// 지정한 경로의 설정을 로드하거나 없으면 기본 설정을 만들어 저장한다.
pub fn load_or_create(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        let content = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&content)?;
        Ok(cfg)
    } else {
        let cfg = Config::default();
        save_config(&cfg, path)?;
        Ok(cfg)
    }
}

fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(cfg)?;
    fs::write(path, content)?;
    Ok(())
}

impl Config {
    /// 설정을 지정한 경로에 저장한다.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        save_config(self, path)
    }
}
