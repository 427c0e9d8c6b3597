//! 상담 세션 하나의 계산 상태와, 상태가 바뀔 때마다 파생값을 무효화하는 소유자.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::climate::{
    resolve_zone, ClimateZoneSynchronizer, DetectionTicket, SyncOutcome, ZoneChange,
    ZoneDetection, ZoneError, ZoneFallback, DEFAULT_ZONE,
};
use crate::persistence::{DebouncedWriter, PersistError, SnapshotStore};
use crate::savings::{
    self, BillingRates, BillingResult, BillingStrategy, CaeResult, SavingsError, SavingsInput,
};
use crate::thermal::{
    u_value, BoundaryResistances, LayerId, LayerStack, LayerStage, MaterialError, UValueInput,
    UValueResult, VentilationType,
};

/// 저장/복원되는 세션 상태 전체.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationState {
    /// 시공 면적 [m²]
    pub surface_area: f64,
    /// 지붕 면적 [m²] (표시/보고용)
    pub roof_area: f64,
    pub before_layers: LayerStack,
    pub after_layers: LayerStack,
    pub ventilation_before: VentilationType,
    pub ventilation_after: VentilationType,
    pub ratio_before: f64,
    pub ratio_after: f64,
    pub rsi_before: f64,
    pub rse_before: f64,
    pub rsi_after: f64,
    pub rse_after: f64,
    pub climate_zone_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_detection: Option<ZoneDetection>,
    /// 입력 기후대가 등록되지 않아 C3로 대체된 상태
    pub zone_substituted: bool,
}

impl Default for CalculationState {
    fn default() -> Self {
        Self::with_boundary(BoundaryResistances::default())
    }
}

impl CalculationState {
    /// 시공 전/후 모두 같은 표면 열저항으로 시작하는 빈 상태.
    pub fn with_boundary(boundary: BoundaryResistances) -> Self {
        Self {
            surface_area: 0.0,
            roof_area: 0.0,
            before_layers: LayerStack::new(),
            after_layers: LayerStack::new(),
            ventilation_before: VentilationType::Caso1,
            ventilation_after: VentilationType::Caso1,
            ratio_before: 0.0,
            ratio_after: 0.0,
            rsi_before: boundary.rsi,
            rse_before: boundary.rse,
            rsi_after: boundary.rsi,
            rse_after: boundary.rse,
            climate_zone_code: DEFAULT_ZONE.to_string(),
            zone_detection: None,
            zone_substituted: false,
        }
    }

    pub fn layers(&self, stage: LayerStage) -> &LayerStack {
        match stage {
            LayerStage::Before => &self.before_layers,
            LayerStage::After => &self.after_layers,
        }
    }

    fn layers_mut(&mut self, stage: LayerStage) -> &mut LayerStack {
        match stage {
            LayerStage::Before => &mut self.before_layers,
            LayerStage::After => &mut self.after_layers,
        }
    }

    pub fn boundary(&self, stage: LayerStage) -> BoundaryResistances {
        match stage {
            LayerStage::Before => BoundaryResistances::new(self.rsi_before, self.rse_before),
            LayerStage::After => BoundaryResistances::new(self.rsi_after, self.rse_after),
        }
    }

    pub fn ventilation(&self, stage: LayerStage) -> VentilationType {
        match stage {
            LayerStage::Before => self.ventilation_before,
            LayerStage::After => self.ventilation_after,
        }
    }

    pub fn ratio(&self, stage: LayerStage) -> f64 {
        match stage {
            LayerStage::Before => self.ratio_before,
            LayerStage::After => self.ratio_after,
        }
    }

    /// 한 상태의 열관류율. 시공 후 상태는 시공 후 B 계수 열을 쓴다.
    pub fn u_value(&self, stage: LayerStage) -> UValueResult {
        u_value(UValueInput {
            layers: self.layers(stage),
            boundary: self.boundary(stage),
            ratio: self.ratio(stage),
            ventilation: self.ventilation(stage),
            is_after_work: stage.is_after_work(),
        })
    }
}

/// 세션 생성 옵션. 보통 `Config`에서 만든다.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub boundary: BoundaryResistances,
    pub rates: BillingRates,
    pub zone_fallback: ZoneFallback,
}

/// 열관류율과 CAE 요약.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalSummary {
    pub ui: UValueResult,
    pub uf: UValueResult,
    pub cae: CaeResult,
}

impl ThermalSummary {
    pub fn climate_coefficient(&self) -> u32 {
        self.cae.coefficient_g
    }

    /// B 계수 방어적 기본값이 한 번이라도 쓰였는지
    pub fn used_b_fallback(&self) -> bool {
        self.ui.b_fallback || self.uf.b_fallback
    }
}

/// 소비자에게 노출되는 최종 결과.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationResults {
    pub summary: ThermalSummary,
    pub billing: BillingResult,
}

impl CalculationResults {
    pub fn ui(&self) -> f64 {
        self.summary.ui.u_value
    }

    pub fn uf(&self) -> f64 {
        self.summary.uf.u_value
    }

    pub fn cae(&self) -> f64 {
        self.summary.cae.cae_kwh_per_year
    }

    pub fn climate_coefficient_used(&self) -> u32 {
        self.summary.climate_coefficient()
    }
}

/// 세션 하나의 유일한 쓰기 주체.
///
/// 모든 변경은 캐시된 파생값을 지우고 (기록기가 있으면) 스냅샷을 대기열에 넣는다.
#[derive(Debug)]
pub struct CalculationSession {
    key: String,
    state: CalculationState,
    zone: ClimateZoneSynchronizer,
    options: SessionOptions,
    writer: Option<DebouncedWriter>,
    cached: Option<ThermalSummary>,
    revision: u64,
}

impl CalculationSession {
    pub fn new(key: impl Into<String>, options: SessionOptions) -> Self {
        Self {
            key: key.into(),
            state: CalculationState::with_boundary(options.boundary),
            zone: ClimateZoneSynchronizer::new(),
            options,
            writer: None,
            cached: None,
            revision: 0,
        }
    }

    /// 저장소에서 최신 스냅샷을 읽어 세션을 복원한다. 없으면 새 세션.
    pub fn restore(
        key: impl Into<String>,
        store: &dyn SnapshotStore,
        options: SessionOptions,
    ) -> Result<Self, PersistError> {
        let key = key.into();
        let Some(mut state) = store.load(&key)? else {
            tracing::debug!(%key, "no snapshot, starting fresh session");
            return Ok(Self::new(key, options));
        };
        let resolved = resolve_zone(&state.climate_zone_code, options.zone_fallback)?;
        let zone =
            ClimateZoneSynchronizer::restored(resolved.zone.code, state.zone_detection.clone());
        state.zone_substituted |= resolved.substituted;
        state.climate_zone_code = zone.current_code().to_string();
        state.zone_detection = zone.detection().cloned();
        tracing::debug!(%key, zone = zone.current_code(), "session restored");
        Ok(Self {
            key,
            state,
            zone,
            options,
            writer: None,
            cached: None,
            revision: 0,
        })
    }

    /// 디바운스 기록기를 붙인다.
    pub fn with_writer(mut self, writer: DebouncedWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// 저장소와 지연 시간으로 기록기를 만들어 붙인다.
    pub fn with_store(
        self,
        store: Arc<dyn SnapshotStore>,
        delay: std::time::Duration,
    ) -> Result<Self, PersistError> {
        Ok(self.with_writer(DebouncedWriter::spawn(store, delay)?))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> &CalculationState {
        &self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn zone(&self) -> &ClimateZoneSynchronizer {
        &self.zone
    }

    /// 상태 변경 횟수. 파생값 무효화가 일어날 때마다 증가한다.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn writer(&self) -> Option<&DebouncedWriter> {
        self.writer.as_ref()
    }

    /// 기후대 변경 알림을 구독한다.
    pub fn subscribe_zone(&mut self, subscriber: impl FnMut(&ZoneChange) + Send + 'static) {
        self.zone.subscribe(subscriber);
    }

    pub fn add_layer(
        &mut self,
        stage: LayerStage,
        name: &str,
        thickness_mm: f64,
        lambda: f64,
    ) -> Result<LayerId, MaterialError> {
        let id = self
            .state
            .layers_mut(stage)
            .push(name, thickness_mm, lambda)?;
        self.touch();
        Ok(id)
    }

    pub fn add_material(
        &mut self,
        stage: LayerStage,
        code: &str,
        thickness_mm: f64,
    ) -> Result<LayerId, MaterialError> {
        let id = self
            .state
            .layers_mut(stage)
            .push_material(code, thickness_mm)?;
        self.touch();
        Ok(id)
    }

    pub fn update_layer(
        &mut self,
        stage: LayerStage,
        id: LayerId,
        name: &str,
        thickness_mm: f64,
        lambda: f64,
    ) -> Result<(), MaterialError> {
        self.state
            .layers_mut(stage)
            .update(id, name, thickness_mm, lambda)?;
        self.touch();
        Ok(())
    }

    pub fn remove_layer(&mut self, stage: LayerStage, id: LayerId) -> Result<(), MaterialError> {
        self.state.layers_mut(stage).remove(id)?;
        self.touch();
        Ok(())
    }

    /// 한 상태의 층을 모두 지운다.
    pub fn reset_stage(&mut self, stage: LayerStage) {
        self.state.layers_mut(stage).clear();
        self.touch();
    }

    /// 층, 면적, 비율 등을 초기화한다. 기후대는 유지한다.
    pub fn reset(&mut self) {
        let zone_code = std::mem::take(&mut self.state.climate_zone_code);
        let detection = self.state.zone_detection.take();
        self.state = CalculationState {
            climate_zone_code: zone_code,
            zone_detection: detection,
            zone_substituted: self.state.zone_substituted,
            ..CalculationState::with_boundary(self.options.boundary)
        };
        self.touch();
    }

    pub fn set_surface_area(&mut self, surface_m2: f64) {
        self.state.surface_area = surface_m2;
        self.touch();
    }

    pub fn set_roof_area(&mut self, roof_m2: f64) {
        self.state.roof_area = roof_m2;
        self.touch();
    }

    pub fn set_ratio(&mut self, stage: LayerStage, ratio: f64) {
        match stage {
            LayerStage::Before => self.state.ratio_before = ratio,
            LayerStage::After => self.state.ratio_after = ratio,
        }
        self.touch();
    }

    pub fn set_ventilation(&mut self, stage: LayerStage, ventilation: VentilationType) {
        match stage {
            LayerStage::Before => self.state.ventilation_before = ventilation,
            LayerStage::After => self.state.ventilation_after = ventilation,
        }
        self.touch();
    }

    pub fn set_boundary(&mut self, stage: LayerStage, boundary: BoundaryResistances) {
        match stage {
            LayerStage::Before => {
                self.state.rsi_before = boundary.rsi;
                self.state.rse_before = boundary.rse;
            }
            LayerStage::After => {
                self.state.rsi_after = boundary.rsi;
                self.state.rse_after = boundary.rse;
            }
        }
        self.touch();
    }

    /// 상담자가 기후대를 직접 지정한다.
    ///
    /// 등록되지 않은 코드는 `zone_fallback` 방침을 따른다. `DefaultC3`이면 C3로
    /// 지정하고 대체 사실을 상태에 남긴다.
    pub fn set_zone_manual(&mut self, code: &str) -> Result<SyncOutcome, ZoneError> {
        let resolved = resolve_zone(code, self.options.zone_fallback)?;
        let outcome = self.zone.set_manual(resolved.zone.code)?;
        self.mark_substituted(resolved.substituted, &outcome);
        self.absorb_zone(&outcome);
        Ok(outcome)
    }

    /// 주소/좌표 조회 직전에 호출해 세대 토큰을 받는다.
    pub fn begin_zone_detection(&mut self) -> DetectionTicket {
        self.zone.begin_detection()
    }

    /// 탐지 응답을 반영한다. 오래된 토큰의 응답은 버려진다.
    pub fn complete_zone_detection(
        &mut self,
        ticket: DetectionTicket,
        result: Option<ZoneDetection>,
    ) -> SyncOutcome {
        let outcome = self.zone.apply_detection(ticket, result);
        if matches!(outcome, SyncOutcome::Changed(_) | SyncOutcome::Unchanged) {
            self.mark_substituted(false, &outcome);
        }
        self.absorb_zone(&outcome);
        outcome
    }

    /// 코드가 그대로여도 대체 여부가 바뀌면 요약은 다시 계산해야 한다.
    fn mark_substituted(&mut self, substituted: bool, outcome: &SyncOutcome) {
        if self.state.zone_substituted != substituted {
            self.state.zone_substituted = substituted;
            if !outcome.is_changed() {
                self.cached = None;
            }
        }
    }

    fn absorb_zone(&mut self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Changed(_) => {
                self.sync_zone_fields();
                self.touch();
            }
            SyncOutcome::Unchanged => {
                // 코드가 같으면 파생값은 그대로 두고 메타데이터만 저장한다.
                self.sync_zone_fields();
                self.persist();
            }
            SyncOutcome::Stale { .. } | SyncOutcome::Rejected(_) | SyncOutcome::NoResult => {}
        }
    }

    fn sync_zone_fields(&mut self) {
        self.state.climate_zone_code = self.zone.current_code().to_string();
        self.state.zone_detection = self.zone.detection().cloned();
    }

    /// Ui, Uf를 매번 새로 계산한다.
    pub fn u_values(&self) -> (UValueResult, UValueResult) {
        (
            self.state.u_value(LayerStage::Before),
            self.state.u_value(LayerStage::After),
        )
    }

    fn savings_input(&self, ui: f64, uf: f64) -> SavingsInput<'_> {
        SavingsInput {
            ui,
            uf,
            surface_m2: self.state.surface_area,
            zone_code: &self.state.climate_zone_code,
            zone_fallback: self.options.zone_fallback,
        }
    }

    /// 열관류율과 CAE 요약. 마지막 변경 이후 처음 호출될 때만 계산한다.
    pub fn summary(&mut self) -> Result<ThermalSummary, SavingsError> {
        if let Some(summary) = self.cached {
            return Ok(summary);
        }
        let (ui, uf) = self.u_values();
        let mut cae = savings::cae(self.savings_input(ui.u_value, uf.u_value))?;
        cae.zone_substituted |= self.state.zone_substituted;
        let summary = ThermalSummary { ui, uf, cae };
        self.cached = Some(summary);
        Ok(summary)
    }

    /// 선택한 정산 방식까지 포함한 최종 결과.
    pub fn results(&mut self, strategy: BillingStrategy) -> Result<CalculationResults, SavingsError> {
        let summary = self.summary()?;
        let billing = savings::bill(
            strategy,
            self.savings_input(summary.ui.u_value, summary.uf.u_value),
            &self.options.rates,
        )?;
        Ok(CalculationResults { summary, billing })
    }

    /// 대기 중인 스냅샷을 바로 기록한다.
    pub fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush();
        }
    }

    fn touch(&mut self) {
        self.cached = None;
        self.revision += 1;
        self.persist();
    }

    fn persist(&self) {
        if let Some(writer) = &self.writer {
            writer.submit(&self.key, self.state.clone());
        }
    }
}
