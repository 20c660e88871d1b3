use chrono::NaiveDate;
use citizenship_intake::config::IntakeConfig;
use citizenship_intake::workflows::intake::{
    SessionHandle, SessionId, SessionStore, StoreError, ValidationConfig,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

struct StoredSession {
    handle: SessionHandle,
    last_touched: Instant,
}

type Sessions = HashMap<SessionId, StoredSession>;

/// Process-local session store. Sessions vanish on restart, and any session
/// left untouched for `idle_timeout` is dropped on the next insert or fetch.
#[derive(Clone)]
pub(crate) struct InMemorySessionStore {
    sessions: Arc<Mutex<Sessions>>,
    idle_timeout: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE)
    }
}

impl InMemorySessionStore {
    pub(crate) fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Lock the map with idle sessions already evicted.
    fn sessions(&self) -> Result<MutexGuard<'_, Sessions>, StoreError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("session store mutex poisoned".to_string()))?;

        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, stored| now.duration_since(stored.last_touched) < self.idle_timeout);
        let evicted = before - guard.len();
        if evicted > 0 {
            debug!(evicted, "dropped idle intake sessions");
        }
        Ok(guard)
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions().map(|guard| guard.len()).unwrap_or_default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, id: SessionId, session: SessionHandle) -> Result<(), StoreError> {
        let mut guard = self.sessions()?;
        if guard.contains_key(&id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(
            id,
            StoredSession {
                handle: session,
                last_touched: Instant::now(),
            },
        );
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionHandle>, StoreError> {
        let mut guard = self.sessions()?;
        Ok(guard.get_mut(id).map(|stored| {
            stored.last_touched = Instant::now();
            stored.handle.clone()
        }))
    }

    fn remove(&self, id: &SessionId) -> Result<Option<SessionHandle>, StoreError> {
        Ok(self.sessions()?.remove(id).map(|stored| stored.handle))
    }
}

pub(crate) fn validation_config(intake: &IntakeConfig) -> ValidationConfig {
    ValidationConfig {
        max_document_bytes: intake.max_document_bytes,
        ..ValidationConfig::default()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
