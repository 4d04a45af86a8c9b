use std::time::Duration;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};

use crate::config::{BackendConfig, Secret, StudioConfig};
use crate::error::{Error, Result};
use crate::failover::{AttemptFailure, FailoverSequence, FailureLedger};
use crate::parser::ResponseParser;
use crate::providers::ChatCompletionsClient;
use crate::{GenerationRequest, GenerationResult};

/// A configured backend paired with the credential it will use
#[derive(Debug, Clone)]
pub struct Backend
{   pub config: BackendConfig
  , pub api_key: Secret
  , /// Uses the deployment-wide credential rather than its own
    pub shared_key: bool
}

/// Outcome of one attempt window
enum WindowOutcome
{   Success(GenerationResult)
  , Fatal(Error)
  , Exhausted
}

/// Generation orchestrator.
///
/// Everything here is read-only after construction, so one instance
/// can serve any number of concurrent requests behind an `Arc`.
pub struct StudioClient
{   config: StudioConfig
  , backends: Vec<Backend>
  , provider: ChatCompletionsClient
  , parser: ResponseParser
}

impl StudioClient
{   /// Build a client resolving credentials from the process environment
    pub fn from_env(config: StudioConfig) -> Result<Self>
    {   Self::with_key_lookup(config, |var| {
          std::env::var(var).ok().filter(|v| !v.trim().is_empty())
        })
    }

    /// Build a client resolving credentials through `lookup`.
    ///
    /// Backends whose credential cannot be resolved are left out; a
    /// client with no usable backend still builds and reports a
    /// configuration error per request.
    pub fn with_key_lookup<F>(config: StudioConfig, lookup: F) -> Result<Self>
    where
      F: Fn(&str) -> Option<String>
    {   config.validate()?;
        let shared = lookup(&config.api_key_env).map(Secret::new);
        if shared.is_none()
        {   warn!("Shared credential {} is not set", config.api_key_env);
        }

        let backends: Vec<Backend> = config.backends
          .iter()
          .filter_map(|b| {
            let resolved = match &b.api_key_env
            {   Some(var) => lookup(var)
                  .map(|key| (Secret::new(key), false))
              , None => shared.clone().map(|key| (key, true))
            };
            if resolved.is_none()
            {   warn!("Skipping backend {}: no credential", b.id);
            }
            resolved.map(|(api_key, shared_key)| Backend
            {   config: b.clone()
              , api_key
              , shared_key
            })
          })
          .collect();

        debug!(
          "StudioClient ready with {} of {} backends",
          backends.len(), config.backends.len()
        );
        Ok(StudioClient
        {   provider: ChatCompletionsClient::new(config.generation.clone())
          , parser: ResponseParser::new(config.parser.clone())
          , backends
          , config
        })
    }

    pub fn config(&self) -> &StudioConfig
    {   &self.config
    }

    /// Backends that have a credential, in priority order
    pub fn backends(&self) -> &[Backend]
    {   &self.backends
    }

    /// Fails with a configuration error when no backend has a credential
    pub fn ensure_ready(&self) -> Result<()>
    {   if self.backends.is_empty()
        {   error!("No backend has a usable credential");
            return Err(Error::MissingApiKey(self.config.api_key_env.clone()));
        }
        Ok(())
    }

    /// Generate items for one request.
    ///
    /// Configuration and input problems are reported before any
    /// outbound call. Backend failures are contained here and only the
    /// collapsed result of all attempts reaches the caller.
    pub async fn generate(&self, request: &GenerationRequest)
      -> Result<GenerationResult>
    {   self.ensure_ready()?;
        request.validate(self.config.failover.min_prompt_chars)?;

        let count = self.config.count_for(request.mode);
        let system = crate::prompt::system_instruction(
          request.mode, request.language, count
        );
        let user = crate::prompt::user_turn(request, count);
        debug!(
          "Generating {} x {} in {}",
          count, request.mode, request.language
        );

        let deadline = Duration::from_millis(
          self.config.failover.request_deadline_ms
        );
        match tokio::time::timeout(
          deadline,
          self.run_fallback(&system, &user)
        ).await
        {   Ok(result) => result
          , Err(_) => {
              warn!("Request deadline of {:?} elapsed", deadline);
              Err(Error::Timeout)
            }
        }
    }

    async fn run_fallback(&self, system: &str, user: &str)
      -> Result<GenerationResult>
    {   let sequence = FailoverSequence::new(
          &self.backends,
          self.config.failover.race_width
        );
        let mut ledger = FailureLedger::default();

        for window in sequence.windows()
        {   match self.run_window(window, system, user, &mut ledger).await
            {   WindowOutcome::Success(result) => return Ok(result)
              , WindowOutcome::Fatal(e) => return Err(e)
              , WindowOutcome::Exhausted => {}
            }
        }

        let e = ledger.into_error();
        warn!("Fallback exhausted: {}", e);
        Err(e)
    }

    /// Attempt every backend of a window concurrently and settle in
    /// priority order: a backend only wins once every backend listed
    /// before it has failed. Dropping the stream cancels the rest.
    async fn run_window(
      &self
    , window: &[Backend]
    , system: &str
    , user: &str
    , ledger: &mut FailureLedger
    ) -> WindowOutcome
    {   let mut in_flight: FuturesUnordered<_> = window
          .iter()
          .enumerate()
          .map(|(idx, backend)| async move {
            (idx, self.attempt(backend, system, user).await)
          })
          .collect();

        let mut settled: Vec<Option<std::result::Result<Vec<String>, AttemptFailure>>>
          = (0..window.len()).map(|_| None).collect();
        let mut next = 0;

        while let Some((idx, outcome)) = in_flight.next().await
        {   if let Some(slot) = settled.get_mut(idx)
            {   *slot = Some(outcome);
            }
            while let Some(slot) = settled.get_mut(next)
            {   let Some(outcome) = slot.take() else { break };
                let backend = &window[next];
                match outcome
                {   Ok(results) => {
                      info!(
                        "Backend {} produced {} items",
                        backend.config.id, results.len()
                      );
                      return WindowOutcome::Success(GenerationResult
                      {   results
                        , backend: backend.config.id.clone()
                      });
                    }
                  , Err(AttemptFailure::Unauthorized) if backend.shared_key => {
                      error!(
                        "Backend {} rejected the shared credential",
                        backend.config.id
                      );
                      return WindowOutcome::Fatal(Error::Unauthorized(
                        backend.config.id.clone()
                      ));
                    }
                  , Err(failure) => {
                      warn!("Backend {} failed: {}", backend.config.id, failure);
                      ledger.record(&backend.config.id, failure);
                      next += 1;
                    }
                }
            }
        }
        WindowOutcome::Exhausted
    }

    async fn attempt(&self, backend: &Backend, system: &str, user: &str)
      -> std::result::Result<Vec<String>, AttemptFailure>
    {   debug!("Trying backend {}", backend.config.id);
        let content = self.provider
          .complete(&backend.config, &backend.api_key, system, user)
          .await?;
        let items = self.parser.parse(&content);
        if items.is_empty()
        {   return Err(AttemptFailure::Unparseable);
        }
        Ok(items)
    }
}
