//! 단열 개보수의 열관류율 개선량과 에너지 절감 인증서(CAE) 금액을 계산한다.
//! 핵심 계산 로직을 라이브러리로 분리하여 CLI 뿐 아니라 다른 화면에서도 쓰도록 한다.

pub mod app;
pub mod climate;
pub mod config;
pub mod material_db;
pub mod persistence;
pub mod project;
pub mod savings;
pub mod session;
pub mod thermal;
pub mod ui_cli;
