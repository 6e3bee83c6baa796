/// LLM Client. The single point of entry for all OpenAI calls in the screener.
///
/// ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
/// Interview code talks to the `ChatModel` and `SpeechSynthesizer` traits;
/// `OpenAiClient` is the production implementation of both.
///
/// No retries: a failed call surfaces to the caller, which leaves the
/// session untouched.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Request to the model backend timed out")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Http(e)
        }
    }
}

/// Role tag of one transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message, serialized exactly as the chat API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Which configured model a completion should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPurpose {
    /// Greeting, questions and the closing line.
    Interview,
    /// The final evaluation report.
    Evaluation,
}

/// "Given a list of turns, produce the next turn text."
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        purpose: ModelPurpose,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError>;
}

/// "Given text, produce an audio byte blob." `None` means no audio for this reply.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Option<Bytes>, LlmError>;
}

/// Synthesizer used when speech is disabled in config.
pub struct NoSpeech;

#[async_trait]
impl SpeechSynthesizer for NoSpeech {
    async fn synthesize(&self, _text: &str) -> Result<Option<Bytes>, LlmError> {
        Ok(None)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatCompletionResponse {
    /// Trimmed text of the first choice.
    fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// Model identifiers used by `OpenAiClient`.
#[derive(Debug, Clone)]
pub struct OpenAiModels {
    pub chat: String,
    pub report: String,
    pub tts: String,
    pub voice: String,
}

/// Wraps the OpenAI chat-completions and speech endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    models: OpenAiModels,
}

impl OpenAiClient {
    pub fn new(api_key: String, models: OpenAiModels, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            models,
        })
    }

    pub fn models(&self) -> &OpenAiModels {
        &self.models
    }

    fn model_for(&self, purpose: ModelPurpose) -> &str {
        match purpose {
            ModelPurpose::Interview => &self.models.chat,
            ModelPurpose::Evaluation => &self.models.report,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(
        &self,
        purpose: ModelPurpose,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let model = self.model_for(purpose);
        let request = ChatCompletionRequest { model, messages };

        let body = self.post(OPENAI_CHAT_URL, &request).await?.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Chat completion succeeded: model={model}, prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        parsed
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    async fn synthesize(&self, text: &str) -> Result<Option<Bytes>, LlmError> {
        let request = SpeechRequest {
            model: &self.models.tts,
            voice: &self.models.voice,
            input: text,
        };

        let audio = self.post(OPENAI_SPEECH_URL, &request).await?.bytes().await?;
        debug!("Synthesized {} bytes of speech", audio.len());

        Ok(if audio.is_empty() { None } else { Some(audio) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_serialize_with_lowercase_roles() {
        let messages = vec![
            ChatMessage::system("brief"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let request = ChatCompletionRequest {
            model: "gpt-4o",
            messages: &messages,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][2]["role"], "assistant");
        assert_eq!(json["messages"][2]["content"], "hello");
    }

    #[test]
    fn test_response_text_is_trimmed() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello there \n"}}],
                      "usage":{"prompt_tokens":10,"completion_tokens":3}}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text(), Some("Hello there"));
    }

    #[test]
    fn test_response_without_content_has_no_text() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text(), None);

        let body = r#"{"choices":[]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text(), None);
    }

    #[tokio::test]
    async fn test_no_speech_returns_none() {
        assert!(NoSpeech.synthesize("hello").await.unwrap().is_none());
    }
}
