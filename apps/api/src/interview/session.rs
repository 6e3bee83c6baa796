//! Interview sessions: the per-candidate state machine and the table that owns them.
//!
//! `Created` (registered, not started) → `Active` (accepting turns) →
//! `Completed` (read-only). There is no transition back.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::transcript::Transcript;
use crate::llm_client::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Active,
    Completed,
}

/// What happened to the evaluation report of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    NotGenerated,
    Saved { passed: bool },
    /// Generated, but the write failed. The text is kept for a retry.
    Unsaved { text: String, error: String },
}

impl ReportOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, ReportOutcome::Saved { .. })
    }
}

#[derive(Debug)]
pub struct InterviewSession {
    started: bool,
    completed: bool,
    turn_count: u32,
    transcript: Transcript,
    report: ReportOutcome,
}

impl Default for InterviewSession {
    fn default() -> Self {
        Self {
            started: false,
            completed: false,
            turn_count: 0,
            transcript: Transcript::default(),
            report: ReportOutcome::NotGenerated,
        }
    }
}

impl InterviewSession {
    pub fn started(&self) -> bool {
        self.started
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn report(&self) -> &ReportOutcome {
        &self.report
    }

    pub fn state(&self) -> SessionState {
        match (self.started, self.completed) {
            (_, true) => SessionState::Completed,
            (true, false) => SessionState::Active,
            (false, false) => SessionState::Created,
        }
    }

    /// `Created → Active`. The transcript carries the single system brief.
    pub fn open(&mut self, transcript: Transcript) -> Result<(), AppError> {
        if self.state() != SessionState::Created {
            return Err(AppError::InvalidSession(
                "Invalid or already started session".to_string(),
            ));
        }
        self.transcript = transcript;
        self.started = true;
        Ok(())
    }

    /// Records one ordinary exchange. Must stay strictly below the limit;
    /// the exchange that reaches it goes through `conclude`.
    pub fn record_turn(
        &mut self,
        answer: ChatMessage,
        reply: ChatMessage,
        turn_limit: u32,
    ) -> Result<(), AppError> {
        self.ensure_active()?;
        if self.turn_count + 1 >= turn_limit {
            return Err(AppError::InvalidSession(
                "Turn budget reached; the interview must be concluded".to_string(),
            ));
        }
        self.transcript.append([answer, reply]);
        self.turn_count += 1;
        Ok(())
    }

    /// `Active → Completed`. `messages` holds the final answer, the conclude
    /// instruction, the closing reply and the evaluation request.
    pub fn conclude(
        &mut self,
        messages: Vec<ChatMessage>,
        turn_limit: u32,
        report: ReportOutcome,
    ) -> Result<(), AppError> {
        self.ensure_active()?;
        self.transcript.append(messages);
        self.turn_count = turn_limit;
        self.completed = true;
        self.report = report;
        Ok(())
    }

    /// Replaces the outcome after a persistence retry.
    pub fn set_report(&mut self, report: ReportOutcome) {
        self.report = report;
    }

    fn ensure_active(&self) -> Result<(), AppError> {
        match self.state() {
            SessionState::Active => Ok(()),
            SessionState::Created => Err(AppError::InvalidSession(
                "Invalid or not started session".to_string(),
            )),
            SessionState::Completed => Err(AppError::InvalidSession(
                "The interview has already concluded".to_string(),
            )),
        }
    }
}

/// A session plus the identifiers that never change after registration.
/// Identifiers live outside the mutex so cascades can match on them without
/// waiting for an in-flight turn.
#[derive(Debug)]
pub struct SessionEntry {
    pub token: Uuid,
    pub job_title: String,
    pub candidate_id: String,
    session: Mutex<InterviewSession>,
}

impl SessionEntry {
    /// Held for the whole of a turn; this is what serializes one token's requests.
    pub async fn lock(&self) -> MutexGuard<'_, InterviewSession> {
        self.session.lock().await
    }
}

/// Read-only view of a session for the candidate page.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub job_title: String,
    pub candidate_id: String,
    pub state: SessionState,
    pub turn_count: u32,
    pub turn_limit: u32,
    pub report_saved: bool,
}

/// All live sessions, keyed by token. No expiry: entries go away only
/// through the candidate/job cascades.
#[derive(Clone, Default)]
pub struct SessionTable {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionEntry>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, job_title: &str, candidate_id: &str) -> Uuid {
        let token = Uuid::new_v4();
        let entry = Arc::new(SessionEntry {
            token,
            job_title: job_title.to_string(),
            candidate_id: candidate_id.to_string(),
            session: Mutex::new(InterviewSession::default()),
        });
        self.sessions.write().await.insert(token, entry);
        token
    }

    pub async fn get(&self, token: Uuid) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(&token).cloned()
    }

    pub async fn contains(&self, token: Uuid) -> bool {
        self.sessions.read().await.contains_key(&token)
    }

    /// Returns how many sessions were dropped.
    pub async fn remove_for_candidate(&self, candidate_id: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.candidate_id != candidate_id);
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
