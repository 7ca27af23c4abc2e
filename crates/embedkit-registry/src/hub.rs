use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use embedkit_core::{
    merge_config, ConfigMap, CredentialSource, EmbedError, EmbeddingClient, EnvCredentials,
    HfHubCache, LocalModelCache, ModelDescriptor, ModelSummary,
};
use embedkit_models::{HttpBackend, ProviderBackend};

use crate::catalog::{CatalogConfig, ModelCatalog};
use crate::dispatcher::ProviderDispatcher;

/// Environment variable naming the registry document.
pub const REGISTRY_PATH_ENV: &str = "EMBEDKIT_REGISTRY_PATH";

/// Settings for an [`EmbeddingHub`].
#[derive(Clone)]
pub struct HubConfig {
    /// Registry document; `None` keeps the catalog in memory.
    pub registry_path: Option<PathBuf>,
    /// Config applied to every client below the caller's own overrides.
    pub default_overrides: ConfigMap,
    /// Connect timeout of the shared HTTP client. Request timeouts are per
    /// client (`timeout` config key).
    pub connect_timeout: Duration,
    pub credentials: Arc<dyn CredentialSource>,
    pub cache: Arc<dyn LocalModelCache>,
    /// Transport override; the HTTP backend is built when unset.
    pub backend: Option<Arc<dyn ProviderBackend>>,
}

impl HubConfig {
    pub fn new() -> Self {
        Self {
            registry_path: None,
            default_overrides: ConfigMap::new(),
            connect_timeout: Duration::from_secs(10),
            credentials: Arc::new(EnvCredentials),
            cache: Arc::new(HfHubCache::new()),
            backend: None,
        }
    }

    /// Defaults, with the registry path taken from `EMBEDKIT_REGISTRY_PATH`
    /// or else [`default_registry_path`](Self::default_registry_path).
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.registry_path = std::env::var_os(REGISTRY_PATH_ENV)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(Self::default_registry_path);
        config
    }

    /// `<config dir>/embedkit/model_registry.json` for the current user.
    pub fn default_registry_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "embedkit")
            .map(|dirs| dirs.config_dir().join("model_registry.json"))
    }

    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    pub fn with_default_override(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.default_overrides.insert(key.into(), value.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn LocalModelCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn ProviderBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    fn build_backend(&self) -> Result<Arc<dyn ProviderBackend>, EmbedError> {
        if let Some(backend) = &self.backend {
            return Ok(Arc::clone(backend));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| EmbedError::Initialization(format!("failed to build HTTP client: {e}")))?;
        Ok(Arc::new(HttpBackend::with_client(client)))
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("registry_path", &self.registry_path)
            .field("default_overrides", &self.default_overrides)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// A catalog and a dispatcher wired together: name in, client out.
///
/// Construct one explicitly and share it; there is no global instance.
pub struct EmbeddingHub {
    catalog: Arc<ModelCatalog>,
    dispatcher: ProviderDispatcher,
    default_overrides: ConfigMap,
}

impl EmbeddingHub {
    /// Load the catalog and register every provider compiled into this build.
    pub fn new(config: HubConfig) -> Result<Self, EmbedError> {
        let backend = config.build_backend()?;
        let mut catalog_config = CatalogConfig::new()
            .with_credentials(Arc::clone(&config.credentials))
            .with_cache(Arc::clone(&config.cache));
        if let Some(path) = &config.registry_path {
            catalog_config = catalog_config.with_path(path.clone());
        }

        let dispatcher = ProviderDispatcher::with_default_providers()
            .with_backend(backend)
            .with_credentials(config.credentials);

        Ok(Self {
            catalog: Arc::new(ModelCatalog::load(catalog_config)),
            dispatcher,
            default_overrides: config.default_overrides,
        })
    }

    /// A hub over an existing catalog and dispatcher.
    pub fn from_parts(catalog: Arc<ModelCatalog>, dispatcher: ProviderDispatcher) -> Self {
        Self {
            catalog,
            dispatcher,
            default_overrides: ConfigMap::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    pub fn dispatcher(&self) -> &ProviderDispatcher {
        &self.dispatcher
    }

    /// Mutable access for registering custom providers.
    pub fn dispatcher_mut(&mut self) -> &mut ProviderDispatcher {
        &mut self.dispatcher
    }

    /// Resolve `name` and build a client for it. `overrides` win over the
    /// hub defaults, which win over the descriptor's `extra_config`.
    pub fn client(
        &self,
        name: &str,
        overrides: &ConfigMap,
    ) -> Result<Box<dyn EmbeddingClient>, EmbedError> {
        let descriptor = self.catalog.resolve(name)?;
        let overrides = merge_config(&self.default_overrides, overrides);
        self.dispatcher.instantiate(&descriptor, &overrides)
    }

    pub fn list_models(&self, available_only: bool) -> Vec<ModelSummary> {
        self.catalog.list_models(available_only)
    }

    pub fn register_descriptor(
        &self,
        descriptor: ModelDescriptor,
    ) -> Result<Arc<ModelDescriptor>, EmbedError> {
        self.catalog.register_descriptor(descriptor)
    }

    pub fn refresh_availability(&self) {
        self.catalog.refresh_availability();
    }
}

impl std::fmt::Debug for EmbeddingHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingHub")
            .field("catalog", &self.catalog)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
