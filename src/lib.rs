pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod prompt;
pub mod parser;
pub mod failover;
pub mod client;
pub mod server;

use serde::{Deserialize, Serialize};

pub use client::StudioClient;
pub use config::StudioConfig;
pub use error::{Error, ErrorKind};

/*

mstar-studio turns a short prompt plus a content mode (roast,
caption, stylish name, script, ...) into a list of ready-to-use
text variants. Generation is delegated to hosted LLM backends that
are tried in priority order until one answers with something usable.

  request  --> prompt (system + user turn)
           --> client (fallback loop over config.backends)
                 --> providers (one chat-completions call per backend)
                 --> parser (normalize untrusted model text)
           --> GenerationResult | Error

*/

/// STUDIO STRUCTURES:

/// Content category requested by the user.
/// Each variant has its own instruction block and item count.
/// Serialized as its display name; parsed with the same aliases as requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode
{   /// Let the model pick the best-fitting category
    Auto
  , Roast
  , Compliment
  , Shayari
  , Quotes
  , Bio
  , Caption
  , Status
  , StylishName
  , Hashtag
  , Script
  , Description
  , Title
}

impl Mode
{   pub const ALL: [Mode; 13] = [
      Mode::Auto
    , Mode::Roast
    , Mode::Compliment
    , Mode::Shayari
    , Mode::Quotes
    , Mode::Bio
    , Mode::Caption
    , Mode::Status
    , Mode::StylishName
    , Mode::Hashtag
    , Mode::Script
    , Mode::Description
    , Mode::Title
    ];

    /// Display name used by the app's mode picker
    pub fn wire_name(&self) -> &'static str
    {   match self
        {   Mode::Auto => "Auto Detect"
          , Mode::Roast => "Roast"
          , Mode::Compliment => "Compliment"
          , Mode::Shayari => "Shayari"
          , Mode::Quotes => "Quotes"
          , Mode::Bio => "Bio"
          , Mode::Caption => "Caption"
          , Mode::Status => "Status"
          , Mode::StylishName => "Stylish Name"
          , Mode::Hashtag => "Hashtag"
          , Mode::Script => "Script Writing"
          , Mode::Description => "Description Writing"
          , Mode::Title => "Title Generator"
        }
    }

    /// Item count asked of the model unless overridden in config
    pub fn default_count(&self) -> usize
    {   match self
        {   Mode::Script => 2
          , Mode::Description => 3
          , Mode::Shayari => 6
          , Mode::StylishName | Mode::Title => 10
          , Mode::Hashtag => 12
          , _ => 8
        }
    }
}

impl std::fmt::Display for Mode
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.write_str(self.wire_name())
    }
}

impl std::str::FromStr for Mode
{   type Err = crate::error::Error;

    /// Accepts display names case-insensitively plus short/kebab aliases
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   let key: String = s.trim()
          .chars()
          .filter(|c| c.is_alphanumeric())
          .flat_map(char::to_lowercase)
          .collect();
        let mode = match key.as_str()
        {   "" | "auto" | "autodetect" => Mode::Auto
          , "roast" => Mode::Roast
          , "compliment" => Mode::Compliment
          , "shayari" => Mode::Shayari
          , "quotes" | "quote" => Mode::Quotes
          , "bio" => Mode::Bio
          , "caption" => Mode::Caption
          , "status" => Mode::Status
          , "stylishname" | "stylish" => Mode::StylishName
          , "hashtag" | "hashtags" => Mode::Hashtag
          , "script" | "scriptwriting" => Mode::Script
          , "description" | "descriptionwriting" => Mode::Description
          , "title" | "titles" | "titlegenerator" => Mode::Title
          , _ => {
              return Err(crate::error::Error::UnsupportedMode(
                s.to_string()
              ));
            }
        };
        Ok(mode)
    }
}

impl TryFrom<String> for Mode
{   type Error = crate::error::Error;

    fn try_from(s: String) -> Result<Self, Self::Error>
    {   s.parse()
    }
}

impl From<Mode> for String
{   fn from(mode: Mode) -> Self
    {   mode.wire_name().to_string()
    }
}

/// Output language of the generated items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Language
{   /// Hindi + English mix in Roman script
    #[default]
    Hinglish
  , /// Devanagari script only
    Hindi
  , English
}

impl Language
{   pub const ALL: [Language; 3] = [
      Language::Hinglish
    , Language::Hindi
    , Language::English
    ];

    pub fn wire_name(&self) -> &'static str
    {   match self
        {   Language::Hinglish => "Hinglish"
          , Language::Hindi => "Hindi"
          , Language::English => "English"
        }
    }

    /// Unrecognized names resolve to `fallback`
    pub fn parse_or(s: &str, fallback: Language) -> Language
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "hinglish" => Language::Hinglish
          , "hindi" => Language::Hindi
          , "english" => Language::English
          , _ => fallback
        }
    }
}

impl std::fmt::Display for Language
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.write_str(self.wire_name())
    }
}

/// One validated generation request; lives for a single call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest
{   pub prompt: String
  , pub mode: Mode
  , pub language: Language
}

impl GenerationRequest
{   pub fn new(
      prompt: impl Into<String>
    , mode: Mode
    , language: Language
    ) -> Self
    {   GenerationRequest
        {   prompt: prompt.into()
          , mode
          , language
        }
    }

    /// Trimmed prompt must hold at least `min_chars` characters
    pub fn validate(&self, min_chars: usize)
      -> Result<(), crate::error::Error>
    {   if self.prompt.trim().chars().count() < min_chars.max(1)
        {   return Err(crate::error::Error::PromptTooShort
            {   min_chars: min_chars.max(1)
            });
        }
        Ok(())
    }
}

/// Items produced by the first backend that yielded anything usable.
/// Order is model output order; duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult
{   pub results: Vec<String>
  , /// Backend id that produced the items
    pub backend: String
}
