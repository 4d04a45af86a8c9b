//! Wire types for the inbound generate endpoint

use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateBody
{   /// The prompt text
    #[serde(default)]
    pub prompt: Option<String>
  , /// Mode display name or alias; absent means auto-detect
    #[serde(default)]
    pub mode: Option<String>
  , /// Output language; absent or unknown means the configured default
    #[serde(default)]
    pub language: Option<String>
}

impl GenerateBody
{   /// Resolve wire strings into a typed request.
    /// Length checks happen later in the client.
    pub fn into_request(
      self
    , default_language: crate::Language
    ) -> Result<crate::GenerationRequest, crate::error::Error>
    {   let mode = match self.mode.as_deref()
        {   Some(m) => m.parse::<crate::Mode>()?
          , None => crate::Mode::Auto
        };
        let language = self.language
          .as_deref()
          .map(|l| crate::Language::parse_or(l, default_language))
          .unwrap_or(default_language);
        Ok(crate::GenerationRequest::new(
          self.prompt.unwrap_or_default()
        , mode
        , language
        ))
    }
}

/// Successful generate response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse
{   pub results: Vec<String>
  , /// Backend id that produced the items
    pub model_used: String
  , pub item_count: usize
}

impl From<crate::GenerationResult> for GenerateResponse
{   fn from(result: crate::GenerationResult) -> Self
    {   GenerateResponse
        {   item_count: result.results.len()
          , results: result.results
          , model_used: result.backend
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody
{   /// Human-readable, safe to show to end users
    pub error: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>
}

impl ErrorBody
{   pub fn message(error: impl Into<String>) -> Self
    {   ErrorBody
        {   error: error.into()
          , kind: None
        }
    }
}

impl From<&crate::error::Error> for ErrorBody
{   fn from(e: &crate::error::Error) -> Self
    {   ErrorBody
        {   error: e.user_message()
          , kind: Some(e.kind().as_str().to_string())
        }
    }
}

/// One entry of `GET /api/modes`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeInfo
{   pub name: String
  , pub item_count: usize
}

/// Body of `GET /api/modes`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModesResponse
{   pub modes: Vec<ModeInfo>
  , pub languages: Vec<String>
  , pub default_language: String
}
