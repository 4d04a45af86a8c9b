//! Configuration for backends, failover and parsing

use std::collections::HashMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use log::debug;

const OPENROUTER_COMPLETIONS: &str
  = "https://openrouter.ai/api/v1/chat/completions";

/// Free models tried by default, most reliable first
const DEFAULT_MODELS: [&str; 7] = [
  "meta-llama/llama-3-8b-instruct:free"
, "google/gemma-2-9b-it:free"
, "qwen/qwen-2.5-7b-instruct:free"
, "mistralai/mistral-7b-instruct:free"
, "huggingfaceh4/zephyr-7b-beta:free"
, "meta-llama/llama-3.2-3b-instruct:free"
, "microsoft/phi-3-mini-128k-instruct:free"
];

/// One hosted model reachable through one chat-completions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig
{   /// Model identifier sent as `model`
    pub id: String
  , /// Full URL of the chat-completions endpoint
    pub endpoint: String
  , /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64
  , /// Env var holding a backend-specific credential.
    /// When absent the shared credential is used.
    #[serde(default)]
    pub api_key_env: Option<String>
}

impl BackendConfig
{   pub fn new(
      id: impl Into<String>
    , endpoint: impl Into<String>
    ) -> Self
    {   BackendConfig
        {   id: id.into()
          , endpoint: endpoint.into()
          , timeout_ms: default_timeout_ms()
          , api_key_env: None
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self
    {   self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self
    {   self.api_key_env = Some(var.into());
        self
    }
}

fn default_timeout_ms() -> u64
{   20_000
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig
{   pub host: String
  , pub port: u16
  , /// Origins allowed by CORS; empty means any
    pub allowed_origins: Vec<String>
}

impl Default for ServerConfig
{   fn default() -> Self
    {   ServerConfig
        {   host: "0.0.0.0".to_string()
          , port: 3000
          , allowed_origins: vec![]
        }
    }
}

/// Failover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig
{   /// Budget for the whole fallback loop in milliseconds
    pub request_deadline_ms: u64
  , /// Backends attempted concurrently per window; 1 is sequential
    pub race_width: usize
  , /// Minimum trimmed prompt length in characters
    pub min_prompt_chars: usize
}

impl Default for FailoverConfig
{   fn default() -> Self
    {   FailoverConfig
        {   request_deadline_ms: 55_000
          , race_width: 1
          , min_prompt_chars: 2
        }
    }
}

/// Sampling and provider attribution sent with each completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig
{   pub temperature: f32
  , pub max_tokens: usize
  , /// Ask for `response_format: json_object`
    pub json_response_format: bool
  , /// Sent as `HTTP-Referer`
    pub referer: Option<String>
  , /// Sent as `X-Title`
    pub title: Option<String>
}

impl Default for GenerationConfig
{   fn default() -> Self
    {   GenerationConfig
        {   temperature: 0.8
          , max_tokens: 2000
          , json_response_format: true
          , referer: Some("https://m-star-ai.vercel.app".to_string())
          , title: Some("M-Star AI Studio".to_string())
        }
    }
}

/// Thresholds applied while normalizing model output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig
{   /// Minimum characters for an item taken from JSON
    pub min_item_chars: usize
  , /// Minimum characters for an item recovered by line splitting
    pub min_line_chars: usize
  , /// Cap on items recovered by line splitting
    pub max_fallback_items: usize
}

impl Default for ParserConfig
{   fn default() -> Self
    {   ParserConfig
        {   min_item_chars: 1
          , min_line_chars: 6
          , max_fallback_items: 10
        }
    }
}

/// Studio configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig
{   pub server: ServerConfig
  , /// Env var holding the shared credential
    pub api_key_env: String
  , /// Backends in priority order
    pub backends: Vec<BackendConfig>
  , pub failover: FailoverConfig
  , pub generation: GenerationConfig
  , pub parser: ParserConfig
  , /// Per-mode item-count overrides
    pub mode_counts: HashMap<crate::Mode, usize>
  , pub default_language: crate::Language
}

impl Default for StudioConfig
{   fn default() -> Self
    {   StudioConfig
        {   server: ServerConfig::default()
          , api_key_env: "OPENROUTER_API_KEY".to_string()
          , backends: DEFAULT_MODELS
              .iter()
              .map(|id| BackendConfig::new(*id, OPENROUTER_COMPLETIONS))
              .collect()
          , failover: FailoverConfig::default()
          , generation: GenerationConfig::default()
          , parser: ParserConfig::default()
          , mode_counts: HashMap::new()
          , default_language: crate::Language::default()
        }
    }
}

impl StudioConfig
{   /// Load configuration from a JSON file; missing fields take defaults
    pub fn from_file(path: impl AsRef<Path>)
      -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        let config: StudioConfig = serde_json::from_str(&text)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the fallback loop cannot run with
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.backends.is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "no backends configured".to_string()
            ));
        }
        if let Some(b) = self.backends.iter().find(|b| b.timeout_ms == 0)
        {   return Err(crate::error::Error::InvalidConfiguration(
              format!("backend {} has a zero timeout", b.id)
            ));
        }
        if self.failover.race_width == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "race_width must be at least 1".to_string()
            ));
        }
        Ok(())
    }

    /// Item count requested for `mode`
    pub fn count_for(&self, mode: crate::Mode) -> usize
    {   self.mode_counts
          .get(&mode)
          .copied()
          .unwrap_or_else(|| mode.default_count())
    }
}

/// Credential value that never shows up in logs
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret
{   pub fn new(value: impl Into<String>) -> Self
    {   Secret(value.into())
    }

    pub fn expose(&self) -> &str
    {   &self.0
    }
}

impl std::fmt::Debug for Secret
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.write_str("Secret(***)")
    }
}
