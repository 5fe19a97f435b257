//! Dialogue Gateway
//!
//! Turns a persona and the running conversation into a chat-completion call
//! and hands back either the reply or a tagged failure. Remote failures are
//! values here, never errors: the orchestrator matches on [`ReplyOutcome`].

use crate::{
    llm_client::{ChatMessage, LLMClient, LLMError},
    persona::Persona,
    session::Session,
    topic::TopicClassifier,
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Retries allowed after the first attempt, for transient failures only.
pub const MAX_RETRIES: u32 = 1;

/// Bounds applied to every remote generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyPolicy {
    /// Per-attempt deadline. A timed-out attempt counts as a failure.
    pub timeout: Duration,
    /// Wait before the retry.
    pub retry_backoff: Duration,
    /// How many recent turns are sent with each request.
    pub history_window: usize,
}

impl Default for ReplyPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(15_000),
            retry_backoff: Duration::from_millis(500),
            history_window: 5,
        }
    }
}

/// Why a reply could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyFailure {
    #[error("reply timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend error: {0}")]
    Api(String),
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl ReplyFailure {
    /// Only network-level failures are worth a second attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReplyFailure::Timeout | ReplyFailure::Transport(_))
    }
}

impl From<LLMError> for ReplyFailure {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Transport(e) => ReplyFailure::Transport(e),
            LLMError::Api(e) => ReplyFailure::Api(e),
            LLMError::Malformed(e) => ReplyFailure::Malformed(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Generated(String),
    Failed(ReplyFailure),
}

pub struct DialogueGateway {
    client: Arc<dyn LLMClient>,
    policy: ReplyPolicy,
}

impl DialogueGateway {
    pub fn new(client: Arc<dyn LLMClient>, policy: ReplyPolicy) -> Self {
        Self { client, policy }
    }

    /// Opening line for a fresh session. Falls back to the persona's static
    /// greeting, so starting a session never depends on the backend.
    pub async fn greet(&self, persona: &Persona, topic: Option<&str>) -> String {
        let system_prompt = format!(
            "{}\n\nStart the conversation: greet the learner in one or two short sentences.",
            Self::system_prompt(persona, topic)
        );
        let messages = vec![ChatMessage::user("(대화를 시작해 주세요)")];

        match self.generate(system_prompt, messages).await {
            ReplyOutcome::Generated(greeting) => greeting,
            ReplyOutcome::Failed(failure) => {
                warn!(persona_id = persona.id, error = %failure, "Greeting generation failed, using static greeting");
                persona.greeting.to_string()
            }
        }
    }

    /// Persona reply to `user_text`, given what has been said so far.
    pub async fn reply(&self, persona: &Persona, session: &Session, user_text: &str) -> ReplyOutcome {
        let system_prompt = Self::system_prompt(persona, session.topic.as_deref());
        let messages = self.window(session, user_text);
        debug!(
            persona_id = persona.id,
            messages = messages.len(),
            "Requesting persona reply"
        );
        self.generate(system_prompt, messages).await
    }

    /// The persona descriptor sent as the system message.
    pub fn system_prompt(persona: &Persona, topic: Option<&str>) -> String {
        let mut prompt = format!(
            "You are {name} ({name_en}), a {age}-year-old Korean {role} ({role_ko}). \
             Personality: {personality}.\n\
             You are chatting with a Korean learner who is practising speech levels.\n\
             {instruction}\n\
             Reply only in Korean, in one to three short sentences, and stay in character. \
             Do not correct the learner's grammar; just keep the conversation going.",
            name = persona.display_name,
            name_en = persona.display_name_en,
            age = persona.age,
            role = persona.role,
            role_ko = persona.role.name_ko(),
            personality = persona.personality,
            instruction = persona.required_register.prompt_instruction(),
        );
        if let Some(info) = topic.and_then(|id| TopicClassifier::new().get(id).ok()) {
            prompt.push_str(&format!(
                "\nCurrent topic: {} ({}). Keep the conversation around it.",
                info.name_ko, info.name_en
            ));
        }
        prompt
    }

    /// The capped conversation window: the last `history_window` turns plus
    /// the new utterance. The greeting leads only while the window still
    /// reaches the start of the session.
    pub fn window(&self, session: &Session, user_text: &str) -> Vec<ChatMessage> {
        let skip = session
            .history
            .len()
            .saturating_sub(self.policy.history_window);
        let mut messages = Vec::with_capacity(2 * self.policy.history_window + 2);

        if skip == 0 && !session.greeting.is_empty() {
            messages.push(ChatMessage::assistant(session.greeting.clone()));
        }
        for turn in &session.history[skip..] {
            messages.push(ChatMessage::user(turn.user_text.clone()));
            if let Some(reply) = &turn.avatar_reply {
                messages.push(ChatMessage::assistant(reply.clone()));
            }
        }
        messages.push(ChatMessage::user(user_text));
        messages
    }

    async fn generate(&self, system_prompt: String, messages: Vec<ChatMessage>) -> ReplyOutcome {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let call = self.client.chat(system_prompt.clone(), messages.clone());
            let failure = match timeout(self.policy.timeout, call).await {
                Ok(Ok(reply)) => {
                    let reply = reply.trim();
                    if reply.is_empty() {
                        ReplyFailure::Malformed("empty reply".to_string())
                    } else {
                        return ReplyOutcome::Generated(reply.to_string());
                    }
                }
                Ok(Err(e)) => ReplyFailure::from(e),
                Err(_) => ReplyFailure::Timeout,
            };

            if attempt > MAX_RETRIES || !failure.is_transient() {
                warn!(attempt, error = %failure, "Reply generation failed");
                return ReplyOutcome::Failed(failure);
            }
            warn!(attempt, error = %failure, "Reply attempt failed, retrying");
            sleep(self.policy.retry_backoff).await;
        }
    }
}
