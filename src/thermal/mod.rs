//! 단열층 적층과 열관류율 계산 모듈 모음.

pub mod b_coefficient;
pub mod layer;
pub mod resistance;
pub mod u_value;

pub use b_coefficient::{lookup as b_lookup, BCoefficient, VentilationType};
pub use layer::{Layer, LayerId, LayerStack, LayerStage, MaterialError};
pub use resistance::{total_resistance, BoundaryResistances};
pub use u_value::{u_value, UValueInput, UValueResult};
