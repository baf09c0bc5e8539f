//! Per-session holder for the latest run, so results survive between requests.
//!
//! A `SessionContext` starts `Idle` and is replaced wholesale by each new run.
//! `SessionStore` is the HTTP layer's map of session ids to contexts; the
//! pipeline itself never touches it. Sessions idle longer than the TTL are
//! swept, and the store never holds more than `max_sessions`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::analysis::parser::AnalysisResult;
use crate::analysis::pipeline::{AnalysisRun, RunState};

#[derive(Debug, Clone)]
pub struct SessionContext {
    latest: RunState,
    runs: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            latest: RunState::Idle,
            runs: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn latest(&self) -> &RunState {
        &self.latest
    }

    /// The result of the latest run, if it completed.
    pub fn latest_result(&self) -> Option<&AnalysisResult> {
        match &self.latest {
            RunState::Complete(result) => Some(result),
            _ => None,
        }
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces whatever the previous run left behind.
    pub fn record(&mut self, run: AnalysisRun) {
        self.latest = run.into_state();
        self.runs += 1;
        self.updated_at = Utc::now();
    }
}

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 1_000;

/// Shared map of live sessions. Cloning shares the same map.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Creates a session, first dropping expired ones and then, at capacity,
    /// the least recently updated.
    pub async fn create(&self) -> Uuid {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| !self.is_expired(session, now));

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.updated_at())
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    debug!("Session evicted at capacity: {id}");
                }
                None => break,
            }
        }

        let id = Uuid::new_v4();
        sessions.insert(id, SessionContext::new());
        id
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drops sessions idle for longer than the TTL as of `now`. Returns how
    /// many were removed.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));
        before - sessions.len()
    }

    fn is_expired(&self, session: &SessionContext, now: DateTime<Utc>) -> bool {
        (now - session.updated_at())
            .to_std()
            .map(|idle| idle > self.ttl)
            .unwrap_or(false)
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionContext> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Stores `run` as the session's latest. Returns false for unknown sessions.
    pub async fn record(&self, id: Uuid, run: AnalysisRun) -> bool {
        match self.sessions.write().await.get_mut(&id) {
            Some(session) => {
                session.record(run);
                true
            }
            None => false,
        }
    }
}
