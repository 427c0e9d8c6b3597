use serde::{Deserialize, Serialize};

use crate::material_db;

/// 허용 열전도율 하한 [W/m·K]
pub const LAMBDA_MIN: f64 = 0.01;
/// 허용 열전도율 상한 [W/m·K]
pub const LAMBDA_MAX: f64 = 0.5;

/// 단열층 입력 오류를 표현한다.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialError {
    /// 두께가 0 이하이거나 유한하지 않음
    InvalidThickness(f64),
    /// 열전도율이 허용 범위를 벗어남
    InvalidLambda(f64),
    /// 해당 id의 층이 없음
    UnknownLayer(LayerId),
    /// 재료 카탈로그에 없는 코드
    UnknownMaterial(String),
}

impl std::fmt::Display for MaterialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialError::InvalidThickness(t) => {
                write!(f, "두께는 0보다 커야 합니다 (입력: {t} mm)")
            }
            MaterialError::InvalidLambda(l) => write!(
                f,
                "열전도율은 {LAMBDA_MIN}~{LAMBDA_MAX} W/m·K 범위여야 합니다 (입력: {l})"
            ),
            MaterialError::UnknownLayer(id) => write!(f, "존재하지 않는 층: #{}", id.0),
            MaterialError::UnknownMaterial(code) => write!(f, "알 수 없는 재료: {code}"),
        }
    }
}

impl std::error::Error for MaterialError {}

/// 층 식별자. 스택 안에서만 유일하다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

/// 시공 전/후 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerStage {
    Before,
    After,
}

impl LayerStage {
    /// 시공 후 상태인지 여부. B 계수 열 선택에 쓰인다.
    pub fn is_after_work(self) -> bool {
        matches!(self, LayerStage::After)
    }
}

/// 단열재 한 층. 생성 시 검증되며 열저항 `r`은 파생값이다.
///
/// 편집은 새 `Layer`로 통째로 교체한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayerRecord")]
pub struct Layer {
    id: LayerId,
    name: String,
    thickness_mm: f64,
    lambda: f64,
    r: f64,
}

/// 직렬화된 층을 다시 읽을 때 쓰는 원시 형태. `r`은 무시하고 재계산한다.
#[derive(Deserialize)]
struct LayerRecord {
    id: LayerId,
    name: String,
    thickness_mm: f64,
    lambda: f64,
}

impl TryFrom<LayerRecord> for Layer {
    type Error = MaterialError;

    fn try_from(raw: LayerRecord) -> Result<Self, Self::Error> {
        Layer::new(raw.id, raw.name, raw.thickness_mm, raw.lambda)
    }
}

impl Layer {
    /// 두께[mm]와 열전도율[W/m·K]을 검증하고 층을 만든다.
    pub fn new(
        id: LayerId,
        name: impl Into<String>,
        thickness_mm: f64,
        lambda: f64,
    ) -> Result<Self, MaterialError> {
        if !thickness_mm.is_finite() || thickness_mm <= 0.0 {
            return Err(MaterialError::InvalidThickness(thickness_mm));
        }
        if !(LAMBDA_MIN..=LAMBDA_MAX).contains(&lambda) {
            return Err(MaterialError::InvalidLambda(lambda));
        }
        Ok(Self {
            id,
            name: name.into(),
            thickness_mm,
            lambda,
            r: layer_resistance(thickness_mm, lambda),
        })
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thickness_mm(&self) -> f64 {
        self.thickness_mm
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// 열저항 [m²·K/W]
    pub fn r(&self) -> f64 {
        self.r
    }
}

/// `r = (두께/1000) / λ`
pub fn layer_resistance(thickness_mm: f64, lambda: f64) -> f64 {
    (thickness_mm / 1000.0) / lambda
}

/// 한 상태(시공 전 또는 후)의 층 목록. 순서는 표시용일 뿐이다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    layers: Vec<Layer>,
    #[serde(default)]
    next_id: u64,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 층을 추가하고 부여된 id를 돌려준다.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        thickness_mm: f64,
        lambda: f64,
    ) -> Result<LayerId, MaterialError> {
        let id = self.allocate_id();
        let layer = Layer::new(id, name, thickness_mm, lambda)?;
        self.layers.push(layer);
        Ok(id)
    }

    /// 재료 카탈로그의 λ로 층을 추가한다.
    pub fn push_material(&mut self, code: &str, thickness_mm: f64) -> Result<LayerId, MaterialError> {
        let material = material_db::find_material(code)
            .ok_or_else(|| MaterialError::UnknownMaterial(code.to_string()))?;
        self.push(material.name, thickness_mm, material.lambda)
    }

    /// 기존 층을 새 값으로 교체한다. 검증 실패 시 스택은 변하지 않는다.
    pub fn update(
        &mut self,
        id: LayerId,
        name: impl Into<String>,
        thickness_mm: f64,
        lambda: f64,
    ) -> Result<(), MaterialError> {
        let slot = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(MaterialError::UnknownLayer(id))?;
        *slot = Layer::new(id, name, thickness_mm, lambda)?;
        Ok(())
    }

    pub fn remove(&mut self, id: LayerId) -> Result<Layer, MaterialError> {
        let pos = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(MaterialError::UnknownLayer(id))?;
        Ok(self.layers.remove(pos))
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn allocate_id(&mut self) -> LayerId {
        // 역직렬화된 스택은 next_id가 뒤처져 있을 수 있다.
        let max_used = self.layers.iter().map(|l| l.id.0 + 1).max().unwrap_or(0);
        let id = self.next_id.max(max_used);
        self.next_id = id + 1;
        LayerId(id)
    }
}
