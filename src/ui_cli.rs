use std::io::{self, Write};

use crate::app::{AppError, DetectionChannel};
use crate::climate::{self, Coordinates, SyncOutcome};
use crate::material_db;
use crate::savings::{BillingResult, BillingStrategy, Delegate};
use crate::session::{CalculationResults, CalculationSession};
use crate::thermal::{BoundaryResistances, LayerId, LayerStage, VentilationType};

/// 메인 메뉴 선택지를 표현한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    BeforeLayers,
    AfterLayers,
    Geometry,
    ClimateZone,
    Results,
    Reset,
    Exit,
}

/// 메인 메뉴를 표시하고 선택값을 반환한다.
pub fn main_menu(session: &CalculationSession) -> Result<MenuChoice, AppError> {
    let state = session.state();
    println!("\n=== Retrofit CAE Toolbox [{}] ===", session.key());
    println!(
        "면적 {:.1} m² | 기후대 {} | 시공 전 {}층 | 시공 후 {}층",
        state.surface_area,
        state.climate_zone_code,
        state.before_layers.len(),
        state.after_layers.len()
    );
    println!("1) 시공 전 층 편집");
    println!("2) 시공 후 층 편집");
    println!("3) 면적/비율/환기/표면 열저항");
    println!("4) 기후대");
    println!("5) 결과 보기");
    println!("6) 초기화");
    println!("0) 종료");
    loop {
        let sel = read_line("메뉴 선택: ")?;
        match sel.trim() {
            "1" => return Ok(MenuChoice::BeforeLayers),
            "2" => return Ok(MenuChoice::AfterLayers),
            "3" => return Ok(MenuChoice::Geometry),
            "4" => return Ok(MenuChoice::ClimateZone),
            "5" => return Ok(MenuChoice::Results),
            "6" => return Ok(MenuChoice::Reset),
            "0" => return Ok(MenuChoice::Exit),
            _ => println!("잘못된 입력입니다. 다시 선택하세요."),
        }
    }
}

fn stage_label(stage: LayerStage) -> &'static str {
    match stage {
        LayerStage::Before => "시공 전",
        LayerStage::After => "시공 후",
    }
}

fn print_layers(session: &CalculationSession, stage: LayerStage) {
    let stack = session.state().layers(stage);
    if stack.is_empty() {
        println!("(층 없음)");
    }
    for layer in stack.layers() {
        println!(
            "#{:<3} {:<28} {:>7.1} mm  λ={:.3}  R={:.3}",
            layer.id().0,
            layer.name(),
            layer.thickness_mm(),
            layer.lambda(),
            layer.r()
        );
    }
    let u = session.state().u_value(stage);
    println!(
        "R_total={:.3} m²K/W, B={:.2}, U={:.3} W/m²K",
        u.total_resistance, u.b_coefficient, u.u_value
    );
}

/// 층 편집 메뉴를 처리한다.
pub fn handle_layers(session: &mut CalculationSession, stage: LayerStage) -> Result<(), AppError> {
    println!("\n-- {} 층 --", stage_label(stage));
    print_layers(session, stage);
    println!("1) 직접 입력  2) 재료 목록에서  3) 수정  4) 삭제  5) 전체 삭제");
    let sel = read_line("선택: ")?;
    let outcome = match sel.trim() {
        "1" => {
            let name = read_line("이름: ")?;
            let t = read_f64("두께 [mm]: ")?;
            let lambda = read_f64("λ [W/m·K]: ")?;
            session.add_layer(stage, name.trim(), t, lambda).map(|_| ())
        }
        "2" => {
            for m in material_db::materials() {
                println!("{:<11} {:<28} λ={:.3}  ({})", m.code, m.name, m.lambda, m.notes);
            }
            let code = read_line("재료 코드: ")?;
            let t = read_f64("두께 [mm]: ")?;
            session.add_material(stage, code.trim(), t).map(|_| ())
        }
        "3" => {
            let id = LayerId(read_u64("층 번호: ")?);
            let name = read_line("새 이름: ")?;
            let t = read_f64("새 두께 [mm]: ")?;
            let lambda = read_f64("새 λ [W/m·K]: ")?;
            session.update_layer(stage, id, name.trim(), t, lambda)
        }
        "4" => {
            let id = LayerId(read_u64("층 번호: ")?);
            session.remove_layer(stage, id)
        }
        "5" => {
            session.reset_stage(stage);
            Ok(())
        }
        _ => {
            println!("잘못된 선택입니다.");
            Ok(())
        }
    };
    // 입력 오류는 메뉴를 끝내지 않고 안내만 한다.
    if let Err(err) = outcome {
        println!("입력 오류: {err}");
    } else {
        print_layers(session, stage);
    }
    Ok(())
}

/// 면적, 비율, 환기, 표면 열저항 메뉴를 처리한다.
pub fn handle_geometry(session: &mut CalculationSession) -> Result<(), AppError> {
    println!("\n-- 면적/비율/환기 --");
    println!("1) 시공 면적  2) 지붕 면적  3) 면적비  4) 환기 조건  5) 표면 열저항");
    let sel = read_line("선택: ")?;
    match sel.trim() {
        "1" => session.set_surface_area(read_f64("시공 면적 [m²]: ")?),
        "2" => session.set_roof_area(read_f64("지붕 면적 [m²]: ")?),
        "3" => {
            let stage = read_stage()?;
            session.set_ratio(stage, read_f64("면적비: ")?);
        }
        "4" => {
            let stage = read_stage()?;
            let v = match read_line("환기 조건 (1=caso1, 2=caso2): ")?.trim() {
                "2" => VentilationType::Caso2,
                _ => VentilationType::Caso1,
            };
            session.set_ventilation(stage, v);
        }
        "5" => {
            let stage = read_stage()?;
            let rsi = read_f64("Rsi [m²K/W]: ")?;
            let rse = read_f64("Rse [m²K/W]: ")?;
            session.set_boundary(stage, BoundaryResistances::new(rsi, rse));
        }
        _ => println!("잘못된 선택입니다."),
    }
    Ok(())
}

/// 기후대 메뉴를 처리한다.
pub fn handle_climate_zone(
    session: &mut CalculationSession,
    detection: &DetectionChannel,
) -> Result<(), AppError> {
    println!("\n-- 기후대 --");
    println!(
        "현재: {} ({:?})",
        session.zone().current_code(),
        session.zone().source()
    );
    if let Some(d) = session.zone().detection() {
        if let Some(desc) = &d.description {
            println!("탐지 정보: {desc}, 신뢰도 {:?}", d.confidence);
        }
    }
    println!("1) 직접 지정  2) 좌표로 탐지");
    let sel = read_line("선택: ")?;
    match sel.trim() {
        "1" => {
            let codes: Vec<_> = climate::zone_codes().collect();
            println!("가능한 기후대: {}", codes.join(", "));
            let code = read_line("기후대 코드: ")?;
            match session.set_zone_manual(code.trim()) {
                Ok(outcome) => print_sync_outcome(&outcome),
                Err(err) => println!("{err}"),
            }
        }
        "2" => {
            let lat = read_f64("위도: ")?;
            let lon = read_f64("경도: ")?;
            detection.request(session, Coordinates { lat, lon });
            println!("탐지를 요청했습니다. 결과는 다음 메뉴에서 반영됩니다.");
        }
        _ => println!("잘못된 선택입니다."),
    }
    Ok(())
}

pub fn print_sync_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Changed(change) => {
            println!("기후대 변경: {} -> {}", change.previous, change.current)
        }
        SyncOutcome::Unchanged => println!("기후대 변화 없음"),
        SyncOutcome::Stale { .. } => {}
        SyncOutcome::Rejected(err) => println!("탐지 결과 거부: {err}"),
        SyncOutcome::NoResult => println!("탐지 결과 없음. 직접 지정하세요."),
    }
}

/// 결과 메뉴를 처리한다.
pub fn handle_results(session: &mut CalculationSession) -> Result<(), AppError> {
    println!("\n-- 결과 --");
    println!("정산 방식: 1) 규제(인증서 가치)  2) 상업 Eiffage  3) 상업 GreenFlex");
    let strategy = match read_line("선택: ")?.trim() {
        "2" => BillingStrategy::Commercial {
            delegate: Delegate::Eiffage,
        },
        "3" => BillingStrategy::Commercial {
            delegate: Delegate::GreenFlex,
        },
        _ => BillingStrategy::Regulatory,
    };
    match session.results(strategy) {
        Ok(results) => print_results(&results),
        Err(err) => println!("계산할 수 없습니다: {err}"),
    }
    Ok(())
}

pub fn print_results(results: &CalculationResults) {
    let s = &results.summary;
    println!(
        "Ui = {:.3} W/m²K (R={:.3}, B={:.2})",
        s.ui.u_value, s.ui.total_resistance, s.ui.b_coefficient
    );
    println!(
        "Uf = {:.3} W/m²K (R={:.3}, B={:.2})",
        s.uf.u_value, s.uf.total_resistance, s.uf.b_coefficient
    );
    if s.used_b_fallback() {
        println!("주의: 면적비가 B 계수 표 범위를 벗어나 기본값 0.95를 사용했습니다.");
    }
    println!(
        "CAE = {:.0} kWh/년 (기후대 {}, G={})",
        s.cae.cae_kwh_per_year, s.cae.zone_code, s.cae.coefficient_g
    );
    if s.cae.zone_substituted {
        println!("주의: 기후대가 등록되지 않아 C3로 대체되었습니다.");
    }
    if s.cae.is_negative() {
        println!("주의: 시공 후 열관류율이 더 높습니다. 입력을 확인하세요.");
    }
    match &results.billing {
        BillingResult::Regulatory(r) => {
            println!("인증서 가치: {:.2} €", r.cae_value);
            println!("자재비: {:.2} €, 인건비: {:.2} €", r.material_cost, r.labor_cost);
            println!(
                "세전: {:.2} €, 부가세: {:.2} €, 합계: {:.2} €",
                r.subtotal_ht, r.vat, r.total_ttc
            );
        }
        BillingResult::Commercial(c) => {
            println!("연간 절감: {:.0}", c.annual_savings);
            println!(
                "사업 금액: {:.2} € ({:.2} €/m²)",
                c.project_price, c.price_per_sqm
            );
            println!(
                "수수료: {:.2} € ({:.2} €/m²)",
                c.cherry_project_price, c.cherry_price_per_sqm
            );
            println!(
                "합계: {:.2} € ({:.2} €/m²)",
                c.total_project_price, c.total_price_per_sqm
            );
        }
    }
}

fn read_line(prompt: &str) -> Result<String, AppError> {
    print!("{prompt}");
    io::stdout().flush().map_err(AppError::Io)?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).map_err(AppError::Io)?;
    Ok(buf)
}

fn read_f64(prompt: &str) -> Result<f64, AppError> {
    loop {
        let s = read_line(prompt)?;
        match s.trim().parse::<f64>() {
            Ok(v) => return Ok(v),
            Err(_) => println!("숫자를 입력하세요."),
        }
    }
}

fn read_u64(prompt: &str) -> Result<u64, AppError> {
    loop {
        let s = read_line(prompt)?;
        match s.trim().parse::<u64>() {
            Ok(v) => return Ok(v),
            Err(_) => println!("번호를 입력하세요."),
        }
    }
}

fn read_stage() -> Result<LayerStage, AppError> {
    let sel = read_line("대상 (1=시공 전, 2=시공 후): ")?;
    Ok(match sel.trim() {
        "2" => LayerStage::After,
        _ => LayerStage::Before,
    })
}
