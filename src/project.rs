//! 비대화식 계산용 TOML 프로젝트 파일.
//!
//! ```toml
//! surface_area = 100.0
//! climate_zone = "C3"
//!
//! [before]
//! ratio = 0.3
//! ventilation = "caso1"
//! [[before.layers]]
//! name = "old wool"
//! thickness_mm = 40.0
//! lambda = 0.045
//!
//! [after]
//! ratio = 0.3
//! [[after.layers]]
//! material = "CELL"
//! thickness_mm = 250.0
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::climate::ZoneError;
use crate::session::{CalculationSession, SessionOptions};
use crate::thermal::{BoundaryResistances, LayerStage, MaterialError, VentilationType};

/// 프로젝트 파일 처리 오류를 표현한다.
#[derive(Debug)]
pub enum ProjectError {
    /// 파일 입출력 오류
    Io(std::io::Error),
    /// TOML 파싱 오류
    Toml(toml::de::Error),
    /// 층 입력 오류
    Material(MaterialError),
    /// 기후대 오류
    Zone(ZoneError),
    /// 재료 코드도 λ도 없는 층
    MissingLambda(String),
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::Io(e) => write!(f, "파일 입출력 오류: {e}"),
            ProjectError::Toml(e) => write!(f, "프로젝트 파싱 오류: {e}"),
            ProjectError::Material(e) => write!(f, "층 입력 오류: {e}"),
            ProjectError::Zone(e) => write!(f, "기후대 오류: {e}"),
            ProjectError::MissingLambda(name) => {
                write!(f, "층 '{name}'에 material 또는 lambda가 필요합니다")
            }
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(value: std::io::Error) -> Self {
        ProjectError::Io(value)
    }
}

impl From<toml::de::Error> for ProjectError {
    fn from(value: toml::de::Error) -> Self {
        ProjectError::Toml(value)
    }
}

impl From<MaterialError> for ProjectError {
    fn from(value: MaterialError) -> Self {
        ProjectError::Material(value)
    }
}

impl From<ZoneError> for ProjectError {
    fn from(value: ZoneError) -> Self {
        ProjectError::Zone(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerSpec {
    #[serde(default)]
    pub name: Option<String>,
    /// 재료 카탈로그 코드. `lambda`가 있으면 그 값이 우선한다.
    #[serde(default)]
    pub material: Option<String>,
    pub thickness_mm: f64,
    #[serde(default)]
    pub lambda: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StageSpec {
    pub ratio: f64,
    pub ventilation: Option<VentilationType>,
    pub rsi: Option<f64>,
    pub rse: Option<f64>,
    pub layers: Vec<LayerSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub surface_area: f64,
    pub roof_area: f64,
    /// 없으면 기본 기후대(C3)
    pub climate_zone: Option<String>,
    pub before: StageSpec,
    pub after: StageSpec,
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ProjectError> {
        Ok(toml::from_str(content)?)
    }

    /// 프로젝트 내용을 담은 세션을 만든다.
    pub fn into_session(
        self,
        key: &str,
        options: SessionOptions,
    ) -> Result<CalculationSession, ProjectError> {
        let mut session = CalculationSession::new(key, options);
        session.set_surface_area(self.surface_area);
        session.set_roof_area(self.roof_area);
        apply_stage(&mut session, LayerStage::Before, self.before, options.boundary)?;
        apply_stage(&mut session, LayerStage::After, self.after, options.boundary)?;
        if let Some(code) = self.climate_zone {
            session.set_zone_manual(&code)?;
        }
        Ok(session)
    }
}

fn apply_stage(
    session: &mut CalculationSession,
    stage: LayerStage,
    stage_input: StageSpec,
    default_boundary: BoundaryResistances,
) -> Result<(), ProjectError> {
    session.set_ratio(stage, stage_input.ratio);
    if let Some(v) = stage_input.ventilation {
        session.set_ventilation(stage, v);
    }
    session.set_boundary(
        stage,
        BoundaryResistances::new(
            stage_input.rsi.unwrap_or(default_boundary.rsi),
            stage_input.rse.unwrap_or(default_boundary.rse),
        ),
    );
    for LayerSpec {
        name,
        material,
        thickness_mm,
        lambda,
    } in stage_input.layers
    {
        match (material, lambda) {
            (material, Some(lambda)) => {
                let name = name.or(material).unwrap_or_else(|| "layer".to_string());
                session.add_layer(stage, &name, thickness_mm, lambda)?;
            }
            (Some(code), None) => {
                session.add_material(stage, &code, thickness_mm)?;
            }
            (None, None) => {
                return Err(ProjectError::MissingLambda(
                    name.unwrap_or_else(|| "?".to_string()),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::ZoneFallback;

    const SAMPLE: &str = r#"
surface_area = 100.0
climate_zone = "D3"

[before]
ratio = 0.3
[[before.layers]]
name = "old wool"
thickness_mm = 40.0
lambda = 0.045

[after]
ratio = 0.3
ventilation = "caso2"
[[after.layers]]
material = "CELL"
thickness_mm = 250.0
"#;

    #[test]
    fn builds_session_from_project() {
        let project = ProjectFile::parse(SAMPLE).unwrap();
        let mut session = project
            .into_session("p1", SessionOptions::default())
            .unwrap();
        let state = session.state();
        assert_eq!(state.before_layers.len(), 1);
        assert_eq!(state.after_layers.layers()[0].name(), "Blown cellulose");
        assert_eq!(state.ventilation_after, VentilationType::Caso2);
        let summary = session.summary().unwrap();
        assert_eq!(summary.climate_coefficient(), 61);
    }

    #[test]
    fn layer_without_lambda_or_material_is_rejected() {
        let project = ProjectFile::parse(
            "surface_area = 10.0\n[[before.layers]]\nname = \"mystery\"\nthickness_mm = 10.0\n",
        )
        .unwrap();
        assert!(matches!(
            project.into_session("p", SessionOptions::default()),
            Err(ProjectError::MissingLambda(name)) if name == "mystery"
        ));
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let project = ProjectFile::parse("surface_area = 10.0\nclimate_zone = \"Z9\"\n").unwrap();
        assert!(matches!(
            project.into_session("p", SessionOptions::default()),
            Err(ProjectError::Zone(_))
        ));
    }

    #[test]
    fn unknown_zone_is_substituted_under_default_c3_policy() {
        let options = SessionOptions {
            zone_fallback: ZoneFallback::DefaultC3,
            ..SessionOptions::default()
        };
        let project = ProjectFile::parse("surface_area = 10.0\nclimate_zone = \"Z9\"\n").unwrap();
        let mut session = project.into_session("p", options).unwrap();
        let summary = session.summary().unwrap();
        assert_eq!(summary.climate_coefficient(), 46);
        assert_eq!(summary.cae.zone_code, "C3");
        assert!(summary.cae.zone_substituted);
    }
}
