use std::sync::Arc;
use std::time::Duration;

use embedkit_core::{
    ConfigMap, ConfigMapExt, CredentialSource, EmbedError, EnvCredentials, ModelDescriptor,
};

use crate::backend::{HttpBackend, ProviderBackend, ProviderRequest};
use crate::retry::RetryPolicy;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Everything a provider constructor needs to build a client.
#[derive(Clone)]
pub struct ClientSpec {
    pub descriptor: Arc<ModelDescriptor>,
    /// Descriptor `extra_config` merged with caller overrides.
    pub config: ConfigMap,
    pub backend: Arc<dyn ProviderBackend>,
    pub credentials: Arc<dyn CredentialSource>,
}

impl ClientSpec {
    /// A spec with the descriptor's own config, an [`HttpBackend`] and
    /// environment credentials.
    pub fn new(descriptor: impl Into<Arc<ModelDescriptor>>) -> Self {
        let descriptor = descriptor.into();
        Self {
            config: descriptor.extra_config.clone(),
            descriptor,
            backend: Arc::new(HttpBackend::new()),
            credentials: Arc::new(EnvCredentials),
        }
    }

    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = config;
        self
    }

    pub fn with_config_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn ProviderBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config)
    }

    /// `timeout` config key in seconds, 60 by default.
    pub fn timeout(&self) -> Duration {
        let secs = self
            .config
            .get_u64("timeout")
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get_str(key).filter(|s| !s.is_empty())
    }

    /// `config_key` from config, else the credential stored under `env_key`.
    pub fn resolve_credential(&self, config_key: &str, env_key: Option<&str>) -> Option<String> {
        self.config_str(config_key)
            .map(str::to_string)
            .or_else(|| env_key.and_then(|key| self.credentials.credential(key)))
    }

    /// Like [`resolve_credential`](Self::resolve_credential), but missing is
    /// an initialization error naming the variable to set.
    pub fn require_credential(
        &self,
        config_key: &str,
        env_key: &str,
    ) -> Result<String, EmbedError> {
        self.resolve_credential(config_key, Some(env_key))
            .ok_or_else(|| {
                EmbedError::Initialization(format!(
                    "{} requires API key. Please set {env_key}",
                    self.descriptor.name
                ))
            })
    }

    /// Base URL from config with trailing slashes removed.
    pub fn base_url(&self, default: &str) -> String {
        self.config_str("base_url")
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    /// A POST to `url` carrying the configured timeout and any extra
    /// `headers` from config.
    pub fn request(&self, url: impl Into<String>, body: serde_json::Value) -> ProviderRequest {
        ProviderRequest::post(url, body)
            .with_timeout(self.timeout())
            .with_headers(self.config.get_string_map("headers"))
    }
}

impl std::fmt::Debug for ClientSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSpec")
            .field("model", &self.descriptor.name)
            .field("provider_kind", &self.descriptor.provider_kind)
            .field("config_keys", &self.config.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
