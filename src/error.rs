use std::fmt;

/// Machine-distinguishable error category surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind
{   /// Missing or rejected server-side credential
    Configuration
  , /// Prompt empty/too short, or unsupported mode
    Input
  , /// Every backend failed without an HTTP success
    BackendExhaustion
  , /// At least one backend answered, but nothing usable was extracted
    ParseExhaustion
}

impl ErrorKind
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   ErrorKind::Configuration => "configuration"
          , ErrorKind::Input => "input"
          , ErrorKind::BackendExhaustion => "backend_exhaustion"
          , ErrorKind::ParseExhaustion => "parse_exhaustion"
        }
    }
}

/// Custom error type for studio operations
/// Implements Clone so tests and handlers can compare freely
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// No credential could be resolved for any backend
    MissingApiKey(String)
  , /// A backend rejected the shared credential
    Unauthorized(String)
  , /// Invalid configuration value
    InvalidConfiguration(String)
  , /// Prompt is empty or below the minimum length
    PromptTooShort
    {   min_chars: usize
    }
  , /// Mode string not in the supported set
    UnsupportedMode(String)
  , /// Every backend answered 429
    AllRateLimited
    {   attempts: usize
    }
  , /// Mixed backend failures; carries the last recorded reason
    BackendsExhausted
    {   attempts: usize
      , last_error: String
    }
  , /// Backends answered but no usable items were parsed
    NothingParsed
    {   attempts: usize
    }
  , /// Overall request deadline elapsed
    Timeout
}

impl Error
{   /// Category used by the HTTP layer and by callers branching on failure
    pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::MissingApiKey(_)
          | Error::Unauthorized(_)
          | Error::InvalidConfiguration(_) => ErrorKind::Configuration
          , Error::PromptTooShort { .. }
          | Error::UnsupportedMode(_) => ErrorKind::Input
          , Error::AllRateLimited { .. }
          | Error::BackendsExhausted { .. }
          | Error::Timeout => ErrorKind::BackendExhaustion
          , Error::NothingParsed { .. } => ErrorKind::ParseExhaustion
        }
    }

    /// HTTP status matching the kind
    pub fn status_code(&self) -> u16
    {   match self.kind()
        {   ErrorKind::Input => 400
          , ErrorKind::Configuration => 500
          , ErrorKind::BackendExhaustion
          | ErrorKind::ParseExhaustion => 503
        }
    }

    /// Actionable text for end users.
    ///
    /// Never includes model ids, credentials or provider bodies; those
    /// only go to the log through `Display`.
    pub fn user_message(&self) -> String
    {   match self
        {   Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_) => {
              "Server Config Error: the AI service is not configured. \
               Please contact support.".to_string()
            }
          , Error::Unauthorized(_) => {
              "Server Config Error: the AI service rejected our credentials. \
               Please contact support.".to_string()
            }
          , Error::PromptTooShort { min_chars } => {
              format!(
                "Prompt too short. Please enter at least {} characters.",
                min_chars
              )
            }
          , Error::UnsupportedMode(mode) => {
              format!("Unsupported mode: {}", mode)
            }
          , Error::AllRateLimited { .. } => {
              "All AI models are currently busy. \
               Please wait a moment and try again.".to_string()
            }
          , Error::BackendsExhausted { .. } => {
              "The AI service is temporarily unavailable. \
               Please try again shortly.".to_string()
            }
          , Error::NothingParsed { .. } => {
              "The AI could not produce usable content for this prompt. \
               Please rephrase it and try again.".to_string()
            }
          , Error::Timeout => {
              "The AI took too long to answer. Please try again.".to_string()
            }
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(what) => {
              write!(f, "Missing API key for: {}", what)
            }
          , Error::Unauthorized(backend) => {
              write!(f, "Credential rejected by backend: {}", backend)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::PromptTooShort { min_chars } => {
              write!(f,
                "Prompt shorter than {} characters",
                min_chars
              )
            }
          , Error::UnsupportedMode(mode) => {
              write!(f, "Unsupported mode: {}", mode)
            }
          , Error::AllRateLimited { attempts } => {
              write!(f,
                "All {} backends are rate limited",
                attempts
              )
            }
          , Error::BackendsExhausted { attempts, last_error } => {
              write!(f,
                "All {} backends failed, last error: {}",
                attempts, last_error
              )
            }
          , Error::NothingParsed { attempts } => {
              write!(f,
                "No usable items parsed after {} attempts",
                attempts
              )
            }
          , Error::Timeout => {
              write!(f, "Request deadline elapsed")
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
