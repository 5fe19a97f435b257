//! Session Orchestrator
//!
//! Owns every session's lifecycle. Operations on one session are serialized
//! by a per-session mutex held for the whole call; different sessions never
//! contend. Each state change is built on a copy, written through the store,
//! and only then swapped in, so an aborted or failed call leaves the session
//! exactly as it was.
//!
//! Only live sessions are held in memory. Ending a session evicts it; later
//! reads load the ended record back from the store.

use crate::{
    dialogue::{DialogueGateway, ReplyOutcome},
    error::{CoachError, Result},
    persona::PersonaCatalog,
    register::RegisterScorer,
    session::{Session, SessionSummary, Turn},
    store::SessionStore,
    topic::TopicClassifier,
};
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Longest accepted user message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Minimum confidence for a detected topic to become the session topic.
const AUTO_TOPIC_CONFIDENCE: f64 = 0.3;

pub struct SessionOrchestrator {
    catalog: Arc<PersonaCatalog>,
    scorer: RegisterScorer,
    topics: TopicClassifier,
    gateway: DialogueGateway,
    store: Arc<dyn SessionStore>,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionOrchestrator {
    pub fn new(
        catalog: Arc<PersonaCatalog>,
        gateway: DialogueGateway,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            catalog,
            scorer: RegisterScorer::new(),
            topics: TopicClassifier::new(),
            gateway,
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Binds `user_id` to a persona and opens an active session.
    ///
    /// A requested topic that is sensitive is dropped; an unknown one is an
    /// error. The greeting never fails: a static one stands in for it.
    #[instrument(skip_all, fields(user_id = %user_id, persona_id = %persona_id))]
    pub async fn start(
        &self,
        user_id: &str,
        persona_id: &str,
        topic: Option<&str>,
    ) -> Result<Session> {
        if user_id.trim().is_empty() {
            return Err(CoachError::Validation("user id must not be empty".to_string()));
        }
        let persona = self.catalog.get(persona_id)?;

        let topic = match topic {
            Some(id) => {
                let info = self.topics.get(id)?;
                if info.sensitive {
                    info!(topic = id, "Dropping sensitive topic");
                    None
                } else {
                    Some(info.id.to_string())
                }
            }
            None => None,
        };

        let greeting = self.gateway.greet(persona, topic.as_deref()).await;
        let session = Session::new(user_id, persona.id, topic, greeting);
        let session_id = session.session_id;

        if self.sessions.read().await.contains_key(&session_id) {
            error!(%session_id, "Generated a session id that is already in use");
            return Err(CoachError::Invariant(format!(
                "duplicate session id {}",
                session_id
            )));
        }
        self.store
            .save(&session)
            .await
            .map_err(CoachError::Storage)?;
        self.sessions
            .write()
            .await
            .insert(session_id, Arc::new(Mutex::new(session.clone())));

        info!(%session_id, "Session started");
        Ok(session)
    }

    /// Records one user message and the persona's reply as the next turn.
    ///
    /// A failed reply does not fail the call: the turn is committed with no
    /// reply and marked degraded.
    #[instrument(skip_all, fields(session_id = %session_id, include_feedback = include_feedback))]
    pub async fn send_message(
        &self,
        session_id: Uuid,
        user_text: &str,
        include_feedback: bool,
    ) -> Result<Turn> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(CoachError::Validation("message must not be empty".to_string()));
        }
        if user_text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(CoachError::Validation(format!(
                "message must be at most {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;
        if !session.is_active() {
            return Err(CoachError::SessionClosed(session_id));
        }
        let index = session.next_index().inspect_err(log_invariant)?;
        let persona = self.catalog.get(&session.persona_id)?;

        let register_feedback = include_feedback.then(|| {
            self.scorer
                .score_addressing(user_text, persona.required_register, persona.role)
        });

        let mut next = session.clone();
        if next.topic.is_none() {
            next.topic = self
                .topics
                .classify(user_text, 1)?
                .into_iter()
                .find(|t| t.confidence > AUTO_TOPIC_CONFIDENCE)
                .map(|t| t.label);
        }

        let (avatar_reply, degraded_reason) =
            match self.gateway.reply(persona, &next, user_text).await {
                ReplyOutcome::Generated(reply) => (Some(reply), None),
                ReplyOutcome::Failed(failure) => {
                    warn!(turn_index = index, error = %failure, "Committing degraded turn");
                    (None, Some(failure.to_string()))
                }
            };

        let turn = Turn {
            index,
            user_text: user_text.to_string(),
            register_feedback,
            degraded: avatar_reply.is_none(),
            avatar_reply,
            degraded_reason,
            timestamp: Utc::now(),
        };
        next.append(turn.clone()).inspect_err(log_invariant)?;
        self.store.save(&next).await.map_err(CoachError::Storage)?;
        *session = next;

        info!(turn_index = index, degraded = turn.degraded, "Turn committed");
        Ok(turn)
    }

    /// Closes the session and returns its summary. Ending twice is a conflict.
    ///
    /// The ended session is dropped from memory once it is stored.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn end_session(&self, session_id: Uuid) -> Result<SessionSummary> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;
        let persona = self.catalog.get(&session.persona_id)?;

        let mut next = session.clone();
        next.end(Utc::now()).inspect_err(log_invariant)?;
        let summary = next.summarize(persona.required_register);
        self.store.save(&next).await.map_err(CoachError::Storage)?;
        *session = next;
        drop(session);
        self.sessions.write().await.remove(&session_id);

        info!(
            turn_count = summary.turn_count,
            average_score = ?summary.average_score,
            "Session ended"
        );
        Ok(summary)
    }

    /// A snapshot of the session. Ended sessions stay readable.
    pub async fn get_session(&self, session_id: Uuid) -> Result<Session> {
        let handle = self.session_handle(session_id).await?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    /// Sessions started by `user_id`, newest first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        self.store
            .list_for_user(user_id)
            .await
            .map_err(CoachError::Storage)
    }

    /// The lock for `session_id`, loading the session from the store when it
    /// is not in memory.
    async fn session_handle(&self, session_id: Uuid) -> Result<Arc<Mutex<Session>>> {
        if let Some(handle) = self.sessions.read().await.get(&session_id) {
            return Ok(handle.clone());
        }

        let loaded = self
            .store
            .load(session_id)
            .await
            .map_err(CoachError::Storage)?
            .ok_or(CoachError::SessionNotFound(session_id))?;
        loaded.check_contiguous().inspect_err(log_invariant)?;

        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(loaded)))
            .clone();
        info!(%session_id, "Session rehydrated from store");
        Ok(handle)
    }
}

fn log_invariant(err: &CoachError) {
    if let CoachError::Invariant(detail) = err {
        error!(%detail, "Session bookkeeping is broken");
    }
}
