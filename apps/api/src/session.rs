//! Interview sessions: one explicit object per user interaction.
//!
//! Handlers snapshot what they need, release the lock, call the model, then
//! write results back. The `revision` counter detects a resume re-upload or
//! profile re-parse that happened while a model call was in flight.
//!
//! Sessions idle for longer than the store's TTL are discarded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::evaluation::{AnswerRecord, FeedbackEntry};
use crate::interview::profile::CandidateProfile;
use crate::interview::questions::Question;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    last_active: Instant,
    /// Bumped on every resume upload and profile parse.
    pub revision: u64,
    pub resume_text: Option<String>,
    pub profile: Option<CandidateProfile>,
    pub questions: Vec<Question>,
    /// One answer per question, same order.
    pub answers: Vec<String>,
    /// Immutable once produced; a new evaluation replaces it.
    pub feedback: Option<Arc<[FeedbackEntry]>>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            last_active: Instant::now(),
            revision: 0,
            resume_text: None,
            profile: None,
            questions: Vec::new(),
            answers: Vec::new(),
            feedback: None,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.last_active = Instant::now();
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_active) >= ttl
    }

    /// A new resume invalidates everything derived from the old one.
    pub fn set_resume(&mut self, text: String) {
        self.revision += 1;
        self.resume_text = Some(text);
        self.profile = None;
        self.questions.clear();
        self.answers.clear();
        self.feedback = None;
        self.touch();
    }

    /// Questions built from the previous profile are dropped, and writes still
    /// in flight for it fail their revision check.
    pub fn set_profile(&mut self, profile: CandidateProfile) {
        self.revision += 1;
        self.profile = Some(profile);
        self.questions.clear();
        self.answers.clear();
        self.feedback = None;
        self.touch();
    }

    pub fn set_questions(&mut self, questions: Vec<Question>) {
        self.answers = vec![String::new(); questions.len()];
        self.questions = questions;
        self.feedback = None;
        self.touch();
    }

    /// Replaces all answers. Existing feedback no longer matches and is dropped.
    pub fn set_answers(&mut self, answers: Vec<String>) -> Result<(), AppError> {
        if answers.len() != self.questions.len() {
            return Err(AppError::Validation(format!(
                "Expected {} answers (one per question), got {}",
                self.questions.len(),
                answers.len()
            )));
        }
        self.answers = answers;
        self.feedback = None;
        self.touch();
        Ok(())
    }

    pub fn answer_records(&self) -> Vec<AnswerRecord> {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(q, a)| AnswerRecord {
                question: q.question.clone(),
                answer: a.clone(),
            })
            .collect()
    }

    pub fn set_feedback(&mut self, feedback: Vec<FeedbackEntry>) {
        self.feedback = Some(feedback.into());
        self.touch();
    }

    /// Fails if the resume or profile changed since `revision` was observed.
    pub fn ensure_revision(&self, revision: u64) -> Result<(), AppError> {
        if self.revision != revision {
            return Err(AppError::Validation(
                "The resume or profile changed while this request was running. Please retry."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory session registry shared by all handlers.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(&self) -> Session {
        let session = Session::new();
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        info!("Session {} created", session.id);
        session
    }

    /// Returns a snapshot of the session.
    pub async fn get(&self, id: Uuid) -> Result<Session, AppError> {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|s| !s.is_expired(now, self.ttl))
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Applies `f` to the session under the write lock.
    pub async fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .filter(|s| !s.is_expired(now, self.ttl))
            .ok_or_else(|| not_found(id))?;
        f(session)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!("Session {} ended", id))
            .ok_or_else(|| not_found(id))
    }

    /// Drops every session idle for at least the TTL. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.ttl));
        let purged = before - sessions.len();
        if purged > 0 {
            info!("Expired {purged} idle sessions ({} active)", sessions.len());
        }
        purged
    }

    /// Runs `purge_expired` periodically until the runtime shuts down.
    pub fn spawn_expiry_sweeper(&self) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                store.purge_expired().await;
            }
        })
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
