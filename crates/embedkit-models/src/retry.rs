use std::future::Future;
use std::time::Duration;

use embedkit_core::{ConfigMap, ConfigMapExt, EmbedError};
use serde_json::Value;

use crate::backend::{ProviderBackend, ProviderRequest};

/// Retry schedule around a provider call.
///
/// Every failure is retried, transient or not. The delay before retry `n`
/// (0-indexed) is `min(base_delay * 2^n, max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Defaults, adjusted by `max_attempts`, `retry_base_delay_ms` and
    /// `retry_max_delay_ms` when present. `max_retries` counts retries after
    /// the first attempt and is only read when `max_attempts` is absent.
    pub fn from_config(config: &ConfigMap) -> Self {
        let mut policy = Self::default();
        if let Some(n) = config.get_u64("max_attempts") {
            policy.max_attempts = n.max(1) as usize;
        } else if let Some(retries) = config.get_u64("max_retries") {
            policy.max_attempts = retries.saturating_add(1) as usize;
        }
        if let Some(ms) = config.get_u64("retry_base_delay_ms") {
            policy.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = config.get_u64("retry_max_delay_ms") {
            policy.max_delay = Duration::from_millis(ms);
        }
        policy
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

/// Run `op` under `policy`. After the last failed attempt the error is
/// wrapped in [`EmbedError::ProviderCallFailed`].
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    provider: &str,
    mut op: F,
) -> Result<T, EmbedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EmbedError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= max_attempts => {
                tracing::warn!(
                    provider,
                    attempts = attempt + 1,
                    error = %e,
                    "provider call failed"
                );
                return Err(EmbedError::ProviderCallFailed {
                    provider: provider.to_string(),
                    attempts: attempt + 1,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    provider,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "provider call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Send once; a non-2xx status is an [`EmbedError::Api`] failure.
pub async fn send_json(
    backend: &dyn ProviderBackend,
    request: ProviderRequest,
) -> Result<Value, EmbedError> {
    let response = backend.send(request).await?;
    if !response.is_success() {
        let body = match response.body {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(EmbedError::Api {
            status: response.status,
            body,
        });
    }
    Ok(response.body)
}

/// [`send_json`] under a retry policy.
pub async fn send_with_retry(
    backend: &dyn ProviderBackend,
    policy: &RetryPolicy,
    provider: &str,
    request: ProviderRequest,
) -> Result<Value, EmbedError> {
    call_with_retry(policy, provider, || send_json(backend, request.clone())).await
}
