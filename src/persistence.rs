//! 계산 상태 스냅샷 저장소와 지연(디바운스) 기록기.
//!
//! `DebouncedWriter`는 대기 슬롯 하나와 타이머를 가진 백그라운드 작업자이다.
//! 새 스냅샷은 대기 중인 것을 덮어쓰며 타이머를 다시 건다. 기록 중에 들어온
//! 스냅샷은 가장 마지막 것만 남았다가 다음 차례에 기록된다.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::climate::ZoneError;
use crate::session::CalculationState;

/// 저장/로드 오류를 표현한다.
#[derive(Debug)]
pub enum PersistError {
    /// 파일 입출력 오류
    Io(std::io::Error),
    /// JSON 직렬화/역직렬화 오류
    Json(serde_json::Error),
    /// 스냅샷의 기후대가 등록되지 않음
    Zone(ZoneError),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "저장소 입출력 오류: {e}"),
            PersistError::Json(e) => write!(f, "스냅샷 형식 오류: {e}"),
            PersistError::Zone(e) => write!(f, "스냅샷 기후대 오류: {e}"),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<std::io::Error> for PersistError {
    fn from(value: std::io::Error) -> Self {
        PersistError::Io(value)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        PersistError::Json(value)
    }
}

impl From<ZoneError> for PersistError {
    fn from(value: ZoneError) -> Self {
        PersistError::Zone(value)
    }
}

/// 세션 키별로 최신 스냅샷을 보관하는 협력자.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, key: &str, state: &CalculationState) -> Result<(), PersistError>;
    fn load(&self, key: &str) -> Result<Option<CalculationState>, PersistError>;
}

/// 메모리 저장소. 테스트와 임시 세션용.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, CalculationState>>,
    saves: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 저장된 키 순서 (같은 키의 반복 포함)
    pub fn save_log(&self) -> Vec<String> {
        lock(&self.saves).clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, key: &str, state: &CalculationState) -> Result<(), PersistError> {
        lock(&self.snapshots).insert(key.to_string(), state.clone());
        lock(&self.saves).push(key.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<CalculationState>, PersistError> {
        Ok(lock(&self.snapshots).get(key).cloned())
    }
}

/// 세션마다 `<dir>/<key>.json` 파일 하나로 저장한다.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 키마다 서로 다른 파일 이름. 영숫자와 `-` 외의 바이트는 `_XX`(16진)로 쓴다.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&self, key: &str, state: &CalculationState) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<CalculationState>, PersistError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{byte:02X}"));
        }
    }
    out
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 기록기 누적 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub submitted: u64,
    pub written: u64,
    pub failed: u64,
}

struct Pending {
    key: String,
    state: CalculationState,
    due: Instant,
}

#[derive(Default)]
struct Slot {
    pending: Option<Pending>,
    in_flight: bool,
    flush_requested: bool,
    shutdown: bool,
    stats: WriterStats,
}

struct Shared {
    slot: Mutex<Slot>,
    signal: Condvar,
}

/// 대기 슬롯 하나를 가진 디바운스 기록기.
///
/// `submit`은 잠깐 락만 잡고 바로 돌아온다. 드롭 시 대기 중인 스냅샷을 기록하고
/// 작업자 스레드를 정리한다.
pub struct DebouncedWriter {
    shared: Arc<Shared>,
    delay: Duration,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for DebouncedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedWriter")
            .field("delay", &self.delay)
            .field("stats", &self.stats())
            .finish()
    }
}

/// 기본 지연 시간 [ms]
pub const DEFAULT_DEBOUNCE_MS: u64 = 2500;

impl DebouncedWriter {
    pub fn spawn(store: Arc<dyn SnapshotStore>, delay: Duration) -> Result<Self, PersistError> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::default()),
            signal: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("snapshot-writer".to_string())
            .spawn(move || run_worker(&worker_shared, store.as_ref()))?;
        Ok(Self {
            shared,
            delay,
            worker: Some(worker),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 스냅샷을 대기 슬롯에 넣는다. 이전 대기 스냅샷은 버려진다.
    pub fn submit(&self, key: &str, state: CalculationState) {
        let mut slot = lock(&self.shared.slot);
        if slot.pending.is_some() {
            tracing::trace!(key, "pending snapshot superseded");
        }
        slot.pending = Some(Pending {
            key: key.to_string(),
            state,
            due: Instant::now() + self.delay,
        });
        slot.stats.submitted += 1;
        self.shared.signal.notify_all();
    }

    /// 대기 중인 스냅샷을 즉시 기록하고 끝날 때까지 기다린다.
    pub fn flush(&self) {
        let mut slot = lock(&self.shared.slot);
        if slot.pending.is_some() {
            slot.flush_requested = true;
            self.shared.signal.notify_all();
        }
        while slot.pending.is_some() || slot.in_flight {
            slot = self
                .shared
                .signal
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn has_pending(&self) -> bool {
        let slot = lock(&self.shared.slot);
        slot.pending.is_some() || slot.in_flight
    }

    pub fn stats(&self) -> WriterStats {
        lock(&self.shared.slot).stats
    }

    /// 남은 스냅샷을 기록하고 작업자를 종료한다.
    pub fn shutdown(mut self) -> WriterStats {
        self.stop();
        self.stats()
    }

    fn stop(&mut self) {
        {
            let mut slot = lock(&self.shared.slot);
            slot.shutdown = true;
            self.shared.signal.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("snapshot writer thread panicked");
            }
        }
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(shared: &Shared, store: &dyn SnapshotStore) {
    let mut slot = lock(&shared.slot);
    loop {
        let Some(due) = slot.pending.as_ref().map(|p| p.due) else {
            if slot.shutdown {
                break;
            }
            slot = shared
                .signal
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
            continue;
        };
        let now = Instant::now();
        if now < due && !slot.shutdown && !slot.flush_requested {
            slot = shared
                .signal
                .wait_timeout(slot, due - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        }
        let Some(job) = slot.pending.take() else {
            continue;
        };
        slot.flush_requested = false;
        slot.in_flight = true;
        drop(slot);

        let result = store.save(&job.key, &job.state);

        slot = lock(&shared.slot);
        slot.in_flight = false;
        match result {
            Ok(()) => {
                slot.stats.written += 1;
                tracing::debug!(key = %job.key, "snapshot written");
            }
            Err(err) => {
                slot.stats.failed += 1;
                tracing::warn!(key = %job.key, error = %err, "snapshot write failed");
            }
        }
        shared.signal.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn state_with_surface(surface: f64) -> CalculationState {
        CalculationState {
            surface_area: surface,
            ..CalculationState::default()
        }
    }

    #[test]
    fn rapid_submissions_collapse_into_latest() {
        let store = Arc::new(MemoryStore::new());
        let writer = DebouncedWriter::spawn(store.clone(), Duration::from_secs(60)).unwrap();
        for i in 1..=200 {
            writer.submit("client-1", state_with_surface(f64::from(i)));
        }
        let stats = writer.shutdown();
        assert_eq!(stats.submitted, 200);
        assert_eq!(stats.written, 1);
        assert_eq!(store.save_log(), vec!["client-1".to_string()]);
        let saved = store.load("client-1").unwrap().unwrap();
        assert_eq!(saved.surface_area, 200.0);
    }

    #[test]
    fn flush_writes_immediately() {
        let store = Arc::new(MemoryStore::new());
        let writer = DebouncedWriter::spawn(store.clone(), Duration::from_secs(60)).unwrap();
        writer.submit("k", state_with_surface(12.0));
        assert!(writer.has_pending());
        writer.flush();
        assert!(!writer.has_pending());
        assert_eq!(store.load("k").unwrap().unwrap().surface_area, 12.0);
    }

    #[test]
    fn writes_after_delay_without_flush() {
        let store = Arc::new(MemoryStore::new());
        let writer = DebouncedWriter::spawn(store.clone(), Duration::from_millis(10)).unwrap();
        writer.submit("k", state_with_surface(3.0));
        let deadline = Instant::now() + Duration::from_secs(5);
        while writer.stats().written == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(writer.stats().written, 1);
    }

    /// 첫 기록을 붙잡아 두고, 그 사이 들어온 스냅샷 중 마지막 것만 다음에 기록되는지 본다.
    struct GatedStore {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
        inner: MemoryStore,
        seen: Mutex<Vec<f64>>,
    }

    impl SnapshotStore for GatedStore {
        fn save(&self, key: &str, state: &CalculationState) -> Result<(), PersistError> {
            let first = lock(&self.seen).is_empty();
            lock(&self.seen).push(state.surface_area);
            if first {
                let _ = lock(&self.started).send(());
                let _ = lock(&self.release).recv();
            }
            self.inner.save(key, state)
        }

        fn load(&self, key: &str) -> Result<Option<CalculationState>, PersistError> {
            self.inner.load(key)
        }
    }

    #[test]
    fn only_latest_is_kept_while_write_in_flight() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(GatedStore {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
            inner: MemoryStore::new(),
            seen: Mutex::new(Vec::new()),
        });
        let writer = DebouncedWriter::spawn(store.clone(), Duration::ZERO).unwrap();
        writer.submit("k", state_with_surface(1.0));
        started_rx.recv().unwrap();

        writer.submit("k", state_with_surface(2.0));
        writer.submit("k", state_with_surface(3.0));
        writer.submit("k", state_with_surface(4.0));
        release_tx.send(()).unwrap();
        writer.flush();

        assert_eq!(*lock(&store.seen), vec![1.0, 4.0]);
        assert_eq!(writer.shutdown().written, 2);
    }

    #[test]
    fn json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("client/7").unwrap().is_none());
        store.save("client/7", &state_with_surface(42.0)).unwrap();
        assert!(store.path_for("client/7").ends_with("client_2F7.json"));
        let loaded = store.load("client/7").unwrap().unwrap();
        assert_eq!(loaded.surface_area, 42.0);
    }

    #[test]
    fn json_store_keeps_similar_keys_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let keys = ["a/b", "a_b", "a b", "a_2Fb"];
        for (i, key) in keys.iter().enumerate() {
            store.save(key, &state_with_surface(i as f64 + 1.0)).unwrap();
        }
        for (i, key) in keys.iter().enumerate() {
            let loaded = store.load(key).unwrap().unwrap();
            assert_eq!(loaded.surface_area, i as f64 + 1.0, "key {key}");
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), keys.len());
    }

    #[test]
    fn json_store_reports_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        fs::write(store.path_for("bad"), "{ not json").unwrap();
        assert!(matches!(store.load("bad"), Err(PersistError::Json(_))));
    }
}
