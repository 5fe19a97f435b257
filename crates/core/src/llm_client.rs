use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use thiserror::Error;

/// Who said a line in the conversation sent to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Failure talking to the generative-language backend.
#[derive(Debug, Error)]
pub enum LLMError {
    /// The request never got a response (connection, DNS, TLS, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with an error.
    #[error("api error: {0}")]
    Api(String),
    /// The backend answered, but not with a usable reply.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<OpenAIError> for LLMError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => LLMError::Transport(e.to_string()),
            OpenAIError::ApiError(e) => LLMError::Api(e.message),
            e @ OpenAIError::JSONDeserialize(..) => LLMError::Malformed(e.to_string()),
            other => LLMError::Api(other.to_string()),
        }
    }
}

/// A generic client for a chat-completion LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Makes a single, non-streaming completion call and returns the reply text.
    async fn chat(
        &self,
        system_prompt: String,
        messages: Vec<ChatMessage>,
    ) -> Result<String, LLMError>;
}

/// Persona replies are one to three short sentences.
const MAX_REPLY_TOKENS: u32 = 150;
const REPLY_TEMPERATURE: f32 = 0.8;

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-4o").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    fn build_messages(
        system_prompt: String,
        messages: Vec<ChatMessage>,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()?
                .into(),
        ];
        for msg in messages {
            match msg.role {
                ChatRole::User => request_messages.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(msg.content)
                        .build()?
                        .into(),
                ),
                ChatRole::Assistant => request_messages.push(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(msg.content)
                        .build()?
                        .into(),
                ),
            };
        }
        Ok(request_messages)
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn chat(
        &self,
        system_prompt: String,
        messages: Vec<ChatMessage>,
    ) -> Result<String, LLMError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::build_messages(system_prompt, messages)?)
            .max_completion_tokens(MAX_REPLY_TOKENS)
            .temperature(REPLY_TEMPERATURE)
            .build()?;

        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .ok_or_else(|| LLMError::Malformed("no choices in response".to_string()))?
            .message
            .content
            .clone()
            .ok_or_else(|| LLMError::Malformed("no content in response".to_string()))?;

        if content.trim().is_empty() {
            return Err(LLMError::Malformed("empty reply".to_string()));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_orders_system_first() {
        let messages = OpenAICompatibleClient::build_messages(
            "system".to_string(),
            vec![ChatMessage::user("안녕"), ChatMessage::assistant("안녕!")],
        )
        .unwrap();
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_openai_error_mapping() {
        let err: LLMError = OpenAIError::InvalidArgument("bad".to_string()).into();
        assert!(matches!(err, LLMError::Api(_)));
    }
}
