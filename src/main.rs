use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use retrofit_cae_toolbox::app::{self, AppError};
use retrofit_cae_toolbox::climate::{self, ZoneFallback};
use retrofit_cae_toolbox::config;
use retrofit_cae_toolbox::material_db;
use retrofit_cae_toolbox::persistence::JsonFileStore;
use retrofit_cae_toolbox::project::ProjectFile;
use retrofit_cae_toolbox::savings::{BillingStrategy, Delegate};
use retrofit_cae_toolbox::session::CalculationSession;
use retrofit_cae_toolbox::ui_cli;

#[derive(Debug, Parser)]
#[command(name = "retrofit_cae_toolbox", version, about = "단열 개보수 CAE 계산기")]
struct Cli {
    /// 설정 파일 경로
    #[arg(long, default_value = config::CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 기후대와 G 계수 목록
    Zones,
    /// 단열재 카탈로그
    Materials,
    /// 프로젝트 파일로 한 번 계산한다
    Compute {
        project: PathBuf,
        #[arg(long, value_enum, default_value_t = StrategyArg::Regulatory)]
        strategy: StrategyArg,
        #[arg(long, value_enum, default_value_t = DelegateArg::Eiffage)]
        delegate: DelegateArg,
        /// 설정 파일의 방침을 덮어쓴다
        #[arg(long, value_enum)]
        zone_fallback: Option<FallbackArg>,
        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },
    /// 대화식 세션 (기본)
    Interactive {
        /// 세션(고객) 키
        #[arg(long, default_value = "default")]
        session: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Regulatory,
    Commercial,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DelegateArg {
    Eiffage,
    Greenflex,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FallbackArg {
    Reject,
    DefaultC3,
}

impl From<DelegateArg> for Delegate {
    fn from(value: DelegateArg) -> Self {
        match value {
            DelegateArg::Eiffage => Delegate::Eiffage,
            DelegateArg::Greenflex => Delegate::GreenFlex,
        }
    }
}

impl From<FallbackArg> for ZoneFallback {
    fn from(value: FallbackArg) -> Self {
        match value {
            FallbackArg::Reject => ZoneFallback::Reject,
            FallbackArg::DefaultC3 => ZoneFallback::DefaultC3,
        }
    }
}

/// 프로그램의 엔트리 포인트. 설정을 로드한 뒤 선택한 명령을 실행한다.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    if let Err(err) = try_run(Cli::parse()) {
        eprintln!("오류: {err}");
        std::process::exit(1);
    }
}

fn try_run(cli: Cli) -> Result<(), AppError> {
    let cfg = config::load_or_create(&cli.config)?;
    match cli.command.unwrap_or(Command::Interactive {
        session: "default".to_string(),
    }) {
        Command::Zones => {
            for zone in climate::zones::zones() {
                println!("{}  G={}", zone.code, zone.coefficient_g);
            }
        }
        Command::Materials => {
            for m in material_db::materials() {
                println!(
                    "{:<11} {:<28} λ={:.3} W/m·K  {:>5.0} mm → R={:.2}",
                    m.code,
                    m.name,
                    m.lambda,
                    m.typical_thickness_mm,
                    m.typical_resistance()
                );
            }
        }
        Command::Compute {
            project,
            strategy,
            delegate,
            zone_fallback,
            json,
        } => {
            let mut options = cfg.session_options();
            if let Some(fallback) = zone_fallback {
                options.zone_fallback = fallback.into();
            }
            let key = project.display().to_string();
            let mut session = ProjectFile::load(&project)?.into_session(&key, options)?;
            let strategy = match strategy {
                StrategyArg::Regulatory => BillingStrategy::Regulatory,
                StrategyArg::Commercial => BillingStrategy::Commercial {
                    delegate: delegate.into(),
                },
            };
            let results = session.results(strategy)?;
            if json {
                let summary = &results.summary;
                let out = json!({
                    "ui": summary.ui.u_value,
                    "uf": summary.uf.u_value,
                    "cae": summary.cae.cae_kwh_per_year,
                    "zone": summary.cae.zone_code,
                    "zone_substituted": summary.cae.zone_substituted,
                    "b_fallback": summary.used_b_fallback(),
                    "climate_coefficient_used": results.climate_coefficient_used(),
                    "billing": results.billing,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&out).map_err(|e| AppError::Io(e.into()))?
                );
            } else {
                ui_cli::print_results(&results);
            }
        }
        Command::Interactive { session } => {
            let store = Arc::new(JsonFileStore::new(&cfg.persistence.directory));
            let mut session =
                CalculationSession::restore(session, store.as_ref(), cfg.session_options())?
                    .with_store(store, cfg.debounce())?;
            app::run(&cfg, &mut session)?;
        }
    }
    Ok(())
}
