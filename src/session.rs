use crate::error::{FormcoachError, Result};
use crate::exercise::ExerciseType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one completed coaching session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub exercise_type: ExerciseType,
    pub duration_seconds: u64,
    /// Last published posture score when the session ended
    pub final_score: u8,
    pub timestamp: DateTime<Utc>,
}

impl SessionSummary {
    pub fn new(exercise_type: ExerciseType, duration_seconds: u64, final_score: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise_type,
            duration_seconds,
            final_score,
            timestamp: Utc::now(),
        }
    }
}

/// Persistence boundary for session history.
///
/// Stores have an explicit lifecycle: `init` must be called exactly once
/// before any other operation, and owns whatever backing resource the
/// store needs for its whole lifetime.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn init(&self) -> Result<()>;

    async fn record(&self, summary: SessionSummary) -> Result<()>;

    /// Most recent sessions, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>>;
}

/// In-memory store backing the synthetic pipeline and tests.
pub struct InMemorySessionStore {
    // None until init
    sessions: Mutex<Option<Vec<SessionSummary>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(None),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn init(&self) -> Result<()> {
        let mut sessions = self.sessions.lock();
        if sessions.is_some() {
            return Err(FormcoachError::component(
                "session_store",
                "store already initialized",
            ));
        }
        *sessions = Some(Vec::new());
        Ok(())
    }

    async fn record(&self, summary: SessionSummary) -> Result<()> {
        let mut sessions = self.sessions.lock();
        let sessions = sessions.as_mut().ok_or_else(|| {
            FormcoachError::component("session_store", "store not initialized")
        })?;
        sessions.push(summary);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let sessions = self.sessions.lock();
        let sessions = sessions.as_ref().ok_or_else(|| {
            FormcoachError::component("session_store", "store not initialized")
        })?;
        Ok(sessions.iter().rev().take(limit).cloned().collect())
    }
}
