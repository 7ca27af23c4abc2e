use std::sync::Arc;

use async_trait::async_trait;
use embedkit_core::{
    check_embeddings, ClientStatus, ConfigMapExt, EmbedError, EmbeddingClient, ModelDescriptor,
};
use embedkit_embeddings::parse_indexed_data;
use embedkit_models::{call_with_retry, send_json, ClientSpec, Lifecycle};
use serde_json::{json, Value};

const PROVIDER: &str = "jina";

/// Configuration for [`JinaEmbeddings`].
#[derive(Debug, Clone)]
pub struct JinaEmbeddingsConfig {
    pub api_key: String,
    pub model: String,
    /// Full embeddings endpoint (default: `"https://api.jina.ai/v1/embeddings"`).
    pub base_url: String,
    pub dimensions: usize,
    pub normalized: bool,
    pub embedding_type: String,
    pub late_chunking: bool,
}

impl JinaEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.jina.ai/v1/embeddings".to_string(),
            dimensions,
            normalized: true,
            embedding_type: "float".to_string(),
            late_chunking: false,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    pub fn with_late_chunking(mut self, late_chunking: bool) -> Self {
        self.late_chunking = late_chunking;
        self
    }

    pub fn from_spec(spec: &ClientSpec) -> Result<Self, EmbedError> {
        let api_key = spec.require_credential("api_key", "JINA_API_KEY")?;
        let dimensions = spec
            .config
            .get_u64("dimensions")
            .map(|d| d as usize)
            .unwrap_or(spec.descriptor.dimension);
        let mut config = Self::new(api_key, spec.descriptor.model_path.clone(), dimensions);
        if let Some(base_url) = spec.config_str("base_url") {
            config = config.with_base_url(base_url);
        }
        if let Some(normalized) = spec.config.get_bool("normalized") {
            config = config.with_normalized(normalized);
        }
        if let Some(embedding_type) = spec.config_str("embedding_type") {
            config.embedding_type = embedding_type.to_string();
        }
        if let Some(late_chunking) = spec.config.get_bool("late_chunking") {
            config = config.with_late_chunking(late_chunking);
        }
        Ok(config)
    }

    fn payload(&self, texts: &[&str]) -> Value {
        json!({
            "model": self.model,
            "normalized": self.normalized,
            "embedding_type": self.embedding_type,
            "dimensions": self.dimensions,
            "late_chunking": self.late_chunking,
            "input": texts,
        })
    }
}

/// Embeddings backed by the Jina AI embeddings API.
pub struct JinaEmbeddings {
    spec: ClientSpec,
    lifecycle: Lifecycle<JinaEmbeddingsConfig>,
}

impl JinaEmbeddings {
    pub fn new(spec: ClientSpec) -> Self {
        Self {
            spec,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Embed with a one-off output dimension. The client's own setting is
    /// left untouched.
    pub async fn embed_with_dimensions(
        &self,
        texts: &[&str],
        dimensions: usize,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let config = self.session().await?;
        let config = config.as_ref().clone().with_dimensions(dimensions);
        self.embed_with_config(&config, texts).await
    }

    /// Embed with late chunking switched on or off for this call only.
    pub async fn embed_with_late_chunking(
        &self,
        texts: &[&str],
        late_chunking: bool,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let config = self.session().await?;
        let config = config.as_ref().clone().with_late_chunking(late_chunking);
        self.embed_with_config(&config, texts).await
    }

    async fn session(&self) -> Result<Arc<JinaEmbeddingsConfig>, EmbedError> {
        self.lifecycle
            .get_or_init(|| async { JinaEmbeddingsConfig::from_spec(&self.spec) })
            .await
    }

    async fn embed_with_config(
        &self,
        config: &JinaEmbeddingsConfig,
        texts: &[&str],
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .spec
            .request(config.base_url.clone(), config.payload(texts))
            .with_bearer(&config.api_key);

        let backend = self.spec.backend.as_ref();
        let body = call_with_retry(&self.spec.retry_policy(), PROVIDER, || async {
            let body = send_json(backend, request.clone()).await?;
            let has_data = body
                .get("data")
                .and_then(Value::as_array)
                .is_some_and(|data| !data.is_empty());
            if !has_data {
                return Err(EmbedError::MalformedResponse(
                    "no embedding data returned from Jina API".into(),
                ));
            }
            Ok(body)
        })
        .await?;

        let embeddings = parse_indexed_data(&body)?;
        check_embeddings(
            &self.spec.descriptor.name,
            texts.len(),
            config.dimensions,
            &embeddings,
        )?;
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for JinaEmbeddings {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.spec.descriptor
    }

    fn dimension(&self) -> usize {
        self.spec
            .config
            .get_u64("dimensions")
            .map(|d| d as usize)
            .unwrap_or(self.spec.descriptor.dimension)
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
        let config = self.session().await?;
        self.embed_with_config(&config, texts).await
    }

    async fn close(&self) -> Result<(), EmbedError> {
        self.lifecycle.reset().await;
        Ok(())
    }
}
