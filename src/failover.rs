//! Failover sequencing and attempt-failure bookkeeping

use std::fmt;
use log::debug;

/// Why one backend attempt did not produce items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure
{   /// HTTP 429
    RateLimited
  , /// HTTP 400/404: model gone or request shape refused
    Unavailable(u16)
  , /// HTTP 401
    Unauthorized
  , /// Any other non-success status
    Status
    {   status: u16
      , detail: String
    }
  , /// Connection, TLS or DNS failure
    Transport(String)
  , /// Per-attempt timeout elapsed
    Timeout
  , /// Success status but the body was not a completion
    MalformedBody(String)
  , /// Completion received but no usable items in it
    Unparseable
}

impl AttemptFailure
{   /// Map a non-success HTTP status to its failure class
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self
    {   match status
        {   429 => AttemptFailure::RateLimited
          , 400 | 404 => AttemptFailure::Unavailable(status)
          , 401 => AttemptFailure::Unauthorized
          , _ => AttemptFailure::Status
            {   status
              , detail: detail.into()
            }
        }
    }

    /// The backend answered with a success status
    pub fn got_response(&self) -> bool
    {   matches!(
          self,
          AttemptFailure::MalformedBody(_) | AttemptFailure::Unparseable
        )
    }
}

impl fmt::Display for AttemptFailure
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   match self
        {   AttemptFailure::RateLimited => write!(f, "rate limited (429)")
          , AttemptFailure::Unavailable(status) => {
              write!(f, "model unavailable ({})", status)
            }
          , AttemptFailure::Unauthorized => write!(f, "unauthorized (401)")
          , AttemptFailure::Status { status, detail } => {
              write!(f, "HTTP {}: {}", status, detail)
            }
          , AttemptFailure::Transport(msg) => write!(f, "transport: {}", msg)
          , AttemptFailure::Timeout => write!(f, "attempt timed out")
          , AttemptFailure::MalformedBody(msg) => {
              write!(f, "malformed completion body: {}", msg)
            }
          , AttemptFailure::Unparseable => {
              write!(f, "no usable items in completion")
            }
        }
    }
}

/// Ordered backends split into attempt windows.
/// A window of one is a plain sequential fallback.
#[derive(Debug, Clone)]
pub struct FailoverSequence<'a, T>
{   pub backends: &'a [T]
  , pub width: usize
}

impl<'a, T> FailoverSequence<'a, T>
{   pub fn new(backends: &'a [T], width: usize) -> Self
    {   debug!(
          "Creating failover sequence with {} backends, window {}",
          backends.len(), width
        );
        FailoverSequence
        {   backends
          , width: width.max(1)
        }
    }

    /// Windows in priority order
    pub fn windows(&self) -> std::slice::Chunks<'a, T>
    {   self.backends.chunks(self.width)
    }
}

/// Failures recorded across one request, in attempt order
#[derive(Debug, Clone, Default)]
pub struct FailureLedger
{   entries: Vec<(String, AttemptFailure)>
}

impl FailureLedger
{   pub fn record(&mut self, backend: &str, failure: AttemptFailure)
    {   self.entries.push((backend.to_string(), failure));
    }

    pub fn len(&self) -> usize
    {   self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.entries.is_empty()
    }

    /// Collapse the ledger into the one error reported to the caller.
    ///
    /// All rate limited beats everything; any backend that answered
    /// but gave nothing usable makes it a parse problem; otherwise the
    /// last failure is reported.
    pub fn into_error(self) -> crate::error::Error
    {   let attempts = self.entries.len();
        if attempts > 0
          && self.entries.iter().all(|(_, f)| *f == AttemptFailure::RateLimited)
        {   return crate::error::Error::AllRateLimited { attempts };
        }
        if self.entries.iter().any(|(_, f)| f.got_response())
        {   return crate::error::Error::NothingParsed { attempts };
        }
        let last_error = self.entries
          .last()
          .map(|(id, f)| format!("{}: {}", id, f))
          .unwrap_or_else(|| "no backend attempted".to_string());
        crate::error::Error::BackendsExhausted
        {   attempts
          , last_error
        }
    }
}
