use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use embedkit_core::{
    check_embeddings, ClientStatus, EmbedError, EmbeddingClient, HfHubCache, ModelDescriptor,
};
use embedkit_models::{ClientSpec, Lifecycle};

use crate::model::{DeviceKind, LoadedModel};

/// Where to find the weights and how to run them.
#[derive(Debug, Clone)]
pub struct LocalTransformerConfig {
    pub model_dir: PathBuf,
    pub device: DeviceKind,
    /// Tokens past this limit are dropped before the forward pass.
    pub max_tokens: usize,
}

impl LocalTransformerConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            device: DeviceKind::Cpu,
            max_tokens: 512,
        }
    }

    pub fn with_device(mut self, device: DeviceKind) -> Self {
        self.device = device;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Resolve `model_path` through the hub cache (`cache_dir` overrides
    /// its root). Config keys: `device`.
    pub fn from_spec(spec: &ClientSpec) -> Result<Self, EmbedError> {
        let cache = match spec.config_str("cache_dir") {
            Some(root) => HfHubCache::with_root(root),
            None => HfHubCache::new(),
        };
        let model_path = &spec.descriptor.model_path;
        let model_dir = cache.resolve(model_path)?.ok_or_else(|| {
            EmbedError::Initialization(format!(
                "model {model_path} is not cached locally; \
                 download it into the HuggingFace cache first"
            ))
        })?;

        let mut config =
            Self::new(model_dir).with_max_tokens(spec.descriptor.max_input_tokens);
        if let Some(device) = spec.config_str("device") {
            config = config.with_device(device.parse()?);
        }
        Ok(config)
    }
}

/// Embeddings from a transformer checkpoint on this machine.
///
/// Each text gets its own forward pass and is mean pooled over its tokens;
/// vectors are not normalized. `close` drops the weights.
pub struct LocalTransformerEmbeddings {
    spec: ClientSpec,
    lifecycle: Lifecycle<LoadedModel>,
}

impl LocalTransformerEmbeddings {
    pub fn new(spec: ClientSpec) -> Self {
        Self {
            spec,
            lifecycle: Lifecycle::new(),
        }
    }

    async fn session(&self) -> Result<Arc<LoadedModel>, EmbedError> {
        self.lifecycle
            .get_or_init(|| async {
                let config = LocalTransformerConfig::from_spec(&self.spec)?;
                tracing::info!(
                    model = %self.spec.descriptor.name,
                    dir = %config.model_dir.display(),
                    device = ?config.device,
                    "loading local transformer"
                );
                tokio::task::spawn_blocking(move || {
                    LoadedModel::load(&config.model_dir, config.device, config.max_tokens)
                })
                .await
                .map_err(|e| EmbedError::Initialization(format!("model loading panicked: {e}")))?
            })
            .await
    }
}

#[async_trait]
impl EmbeddingClient for LocalTransformerEmbeddings {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.spec.descriptor
    }

    fn status(&self) -> ClientStatus {
        self.lifecycle.status()
    }

    async fn initialize(&self) -> Result<(), EmbedError> {
        self.session().await.map(|_| ())
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.session().await?;
        let owned: Vec<String> = texts.iter().map(|text| text.to_string()).collect();

        let embeddings = tokio::task::spawn_blocking(move || {
            owned
                .iter()
                .map(|text| model.embed(text))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| EmbedError::ProviderCallFailed {
            provider: "local_transformer".to_string(),
            attempts: 1,
            source: Box::new(EmbedError::Transport(format!("inference task failed: {e}"))),
        })??;

        check_embeddings(
            &self.spec.descriptor.name,
            texts.len(),
            self.spec.descriptor.dimension,
            &embeddings,
        )?;
        Ok(embeddings)
    }

    async fn close(&self) -> Result<(), EmbedError> {
        if self.lifecycle.reset().await.is_some() {
            tracing::debug!(model = %self.spec.descriptor.name, "released local model");
        }
        Ok(())
    }
}
