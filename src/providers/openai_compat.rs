use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::{debug, trace, warn};

use crate::config::{BackendConfig, GenerationConfig, Secret};
use crate::failover::AttemptFailure;

// Provider error bodies are only logged; keep them short
const MAX_DETAIL_CHARS: usize = 200;

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

impl ChatMessage
{   pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: "system".to_string()
          , content: content.into()
        }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: "user".to_string()
          , content: content.into()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat
{   #[serde(rename = "type")]
    pub kind: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: usize
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   #[serde(default)]
    pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChoiceMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage
{   #[serde(default)]
    pub content: Option<String>
}

// ===== Chat Completions Client =====

/// Outbound client for OpenAI-compatible chat-completions endpoints.
/// Holds no per-request state; share it across requests.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient
{   http_client: reqwest::Client
  , generation: GenerationConfig
}

impl ChatCompletionsClient
{   pub fn new(generation: GenerationConfig) -> Self
    {   debug!("Creating ChatCompletionsClient");
        ChatCompletionsClient
        {   http_client: reqwest::Client::new()
          , generation
        }
    }

    /// Request body for one backend
    pub fn build_request(
      &self
    , backend: &BackendConfig
    , system: &str
    , user: &str
    ) -> ChatCompletionRequest
    {   ChatCompletionRequest
        {   model: backend.id.clone()
          , messages: vec![
              ChatMessage::system(system)
            , ChatMessage::user(user)
            ]
          , temperature: self.generation.temperature
          , max_tokens: self.generation.max_tokens
          , response_format: self.generation.json_response_format
              .then(|| ResponseFormat { kind: "json_object".to_string() })
        }
    }

    /// One attempt against one backend, bounded by its timeout.
    /// Returns the raw assistant text.
    pub async fn complete(
      &self
    , backend: &BackendConfig
    , api_key: &Secret
    , system: &str
    , user: &str
    ) -> Result<String, AttemptFailure>
    {   let budget = Duration::from_millis(backend.timeout_ms);
        match tokio::time::timeout(
          budget,
          self.send(backend, api_key, system, user)
        ).await
        {   Ok(result) => result
          , Err(_) => {
              warn!("Backend {} timed out after {:?}", backend.id, budget);
              Err(AttemptFailure::Timeout)
            }
        }
    }

    async fn send(
      &self
    , backend: &BackendConfig
    , api_key: &Secret
    , system: &str
    , user: &str
    ) -> Result<String, AttemptFailure>
    {   let request = self.build_request(backend, system, user);
        trace!("Completion request to {}: {:?}", backend.endpoint, request);

        let mut builder = self.http_client
          .post(&backend.endpoint)
          .header("Authorization", format!("Bearer {}", api_key.expose()))
          .header("Content-Type", "application/json");
        if let Some(referer) = &self.generation.referer
        {   builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.generation.title
        {   builder = builder.header("X-Title", title);
        }

        let response = builder
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            if e.is_timeout()
            {   AttemptFailure::Timeout
            } else
            {   AttemptFailure::Transport(e.to_string())
            }
          })?;

        let status = response.status();
        trace!("Backend {} response status: {}", backend.id, status);

        if !status.is_success()
        {   let detail: String = response.text().await
              .unwrap_or_else(|_| "Unknown error".to_string())
              .chars()
              .take(MAX_DETAIL_CHARS)
              .collect();
            debug!("Backend {} error body: {}", backend.id, detail);
            return Err(AttemptFailure::from_status(status.as_u16(), detail));
        }

        let completion: ChatCompletionResponse = response.json().await
          .map_err(|e| AttemptFailure::MalformedBody(e.to_string()))?;

        completion.choices
          .into_iter()
          .next()
          .and_then(|c| c.message.content)
          .filter(|content| !content.trim().is_empty())
          .ok_or_else(|| {
            AttemptFailure::MalformedBody("no content in choices".to_string())
          })
    }
}
