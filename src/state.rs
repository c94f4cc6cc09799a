//! Application state: installed quiz banks, live sessions, and the durable store.
//!
//! This module owns:
//!   - the bank set (None until the background loader installs it)
//!   - the session registry (session id -> SessionController + last activity)
//!   - the key-value store sessions are mirrored into
//!
//! Every session mutation happens under the registry write guard, and the
//! snapshot is handed to the store under that same guard, so a session closed
//! concurrently is never written after its removal. Making the store durable
//! (disk I/O for a file store) happens after the guard is released.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::QuizBank;
use crate::persistence::{Persistence, Snapshot};
use crate::session::{Action, SessionController, SessionError};
use crate::store::{FileStore, KvStore, MemoryStore};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("unknown session: {0}")]
    UnknownSession(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A registered session and when a client last opened or drove it.
pub struct LiveSession {
    pub ctrl: SessionController,
    pub touched: Instant,
}

impl LiveSession {
    fn new(ctrl: SessionController) -> Self {
        Self { ctrl, touched: Instant::now() }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub banks: Arc<RwLock<Option<Arc<Vec<QuizBank>>>>>,
    pub sessions: Arc<RwLock<HashMap<String, LiveSession>>>,
    pub store: Arc<dyn KvStore>,
    pub config: AppConfig,
}

impl AppState {
    /// Build state from config: pick the store backend, start with no banks.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: AppConfig) -> Self {
        let store: Arc<dyn KvStore> = match &config.store_path {
            Some(path) => {
                info!(target: "study_tool", %path, "Using file-backed key-value store");
                Arc::new(FileStore::open(path))
            }
            None => {
                info!(target: "study_tool", "Using in-memory key-value store (STORE_PATH not set)");
                Arc::new(MemoryStore::new())
            }
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            banks: Arc::new(RwLock::new(None)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            config,
        }
    }

    /// Currently installed banks, if loading has finished.
    pub async fn banks(&self) -> Option<Arc<Vec<QuizBank>>> {
        self.banks.read().await.clone()
    }

    /// Install loaded banks and bring every waiting session up to date.
    #[instrument(level = "info", skip_all, fields(banks = banks.len()))]
    pub async fn install_banks(&self, banks: Vec<QuizBank>) {
        let banks = Arc::new(banks);
        *self.banks.write().await = Some(banks.clone());

        let mut resumed = 0usize;
        {
            let mut sessions = self.sessions.write().await;
            for (id, live) in sessions.iter_mut() {
                if live.ctrl.is_loading() {
                    self.attach_and_restore(id, &mut live.ctrl, banks.clone());
                    resumed += 1;
                }
            }
        }
        self.flush_store().await;
        info!(target: "quiz", resumed, total_questions = banks.iter().map(|b| b.questions.len()).sum::<usize>(), "Quiz banks installed");
    }

    /// Open a session. A known id returns the live session; an unknown or
    /// missing id creates one, rehydrating stored progress for that id.
    #[instrument(level = "info", skip(self))]
    pub async fn open_session(&self, requested: Option<String>) -> (String, SessionController) {
        let id = requested.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| Uuid::new_v4().to_string());

        let ctrl = {
            // Banks are read under the registry guard: install_banks publishes
            // them before it takes this guard, so a Loading session inserted
            // here is always seen by its attach pass.
            let mut sessions = self.sessions.write().await;
            let banks = self.banks.read().await.clone();

            if let Some(live) = sessions.get_mut(&id) {
                live.touched = Instant::now();
                if live.ctrl.is_loading() {
                    if let Some(banks) = banks {
                        self.attach_and_restore(&id, &mut live.ctrl, banks);
                    }
                }
                debug!(target: "quiz", session = %id, "Resuming live session");
                live.ctrl.clone()
            } else {
                let mut ctrl = SessionController::new();
                if let Some(banks) = banks {
                    self.attach_and_restore(&id, &mut ctrl, banks);
                }
                sessions.insert(id.clone(), LiveSession::new(ctrl.clone()));
                info!(target: "quiz", session = %id, phase = ctrl.phase().name(), "Session opened");
                ctrl
            }
        };
        self.flush_store().await;
        (id, ctrl)
    }

    /// Snapshot of a live session.
    pub async fn session(&self, id: &str) -> Result<SessionController, StateError> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|live| live.ctrl.clone())
            .ok_or_else(|| StateError::UnknownSession(id.to_string()))
    }

    /// Apply one transition and persist the result. A failed transition leaves
    /// both the session and storage untouched.
    #[instrument(level = "info", skip(self), fields(session = %id))]
    pub async fn apply(&self, id: &str, action: Action) -> Result<SessionController, StateError> {
        let ctrl = {
            let mut sessions = self.sessions.write().await;
            let live = sessions
                .get_mut(id)
                .ok_or_else(|| StateError::UnknownSession(id.to_string()))?;
            live.touched = Instant::now();
            live.ctrl.apply(action)?;
            Persistence::new(self.store.as_ref(), id).save_snapshot(&live.ctrl.snapshot());
            live.ctrl.clone()
        };
        self.flush_store().await;
        Ok(ctrl)
    }

    /// Drop a live session. Stored progress is kept for a later resume.
    pub async fn close_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(target: "quiz", session = %id, "Session closed");
        }
        removed
    }

    /// Drop every session idle for at least `max_idle` as of `now`. Their
    /// stored progress stays, so reopening the same id resumes it.
    pub async fn evict_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, live| now.saturating_duration_since(live.touched) < max_idle);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(target: "quiz", evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Make buffered store writes durable without holding any state lock.
    async fn flush_store(&self) {
        if !self.store.pending() {
            return;
        }
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(target: "study_tool", error = %e, "Store flush failed; will retry on next write"),
            Err(e) => error!(target: "study_tool", error = %e, "Store flush task failed"),
        }
    }

    /// Attach banks to `ctrl` and rehydrate it from whatever was stored for `id`.
    /// Only a session that had stored progress is written back.
    fn attach_and_restore(&self, id: &str, ctrl: &mut SessionController, banks: Arc<Vec<QuizBank>>) {
        ctrl.attach_banks(banks);
        let persistence = Persistence::new(self.store.as_ref(), id);
        let snap = persistence.load_snapshot(Snapshot::default());
        if snap == Snapshot::default() {
            return;
        }
        if let Err(e) = ctrl.restore(&snap) {
            warn!(target: "quiz", session = %id, error = %e, "Could not restore stored session");
        }
        persistence.save_snapshot(&ctrl.snapshot());
    }
}

/// Periodically evict sessions nobody has opened or driven for `max_idle`.
pub async fn sweep_idle_sessions(state: Arc<AppState>, max_idle: Duration) {
    let mut tick = tokio::time::interval((max_idle / 2).max(Duration::from_secs(1)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        state.evict_idle(Instant::now(), max_idle).await;
    }
}
