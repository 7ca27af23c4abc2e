use async_trait::async_trait;
use embedkit_core::{
    check_embeddings, ClientStatus, ConfigMap, ConfigMapExt, EmbedError, EmbeddingClient,
    ModelDescriptor,
};
use embedkit_embeddings::parse_indexed_data;
use embedkit_models::{send_with_retry, ClientSpec, Lifecycle};
use serde_json::{json, Value};

use crate::compat::OpenAiCompatible;

/// Resolved settings for an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingsConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// `"float"` unless overridden; base64 replies are decoded too.
    pub encoding_format: String,
    /// Requested output dimension, for models that support shortening.
    pub dimensions: Option<usize>,
    /// Extra top-level body fields sent with every request.
    pub extra_body: ConfigMap,
}

impl OpenAiEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OpenAiCompatible::OpenAi.default_base_url().to_string(),
            encoding_format: "float".to_string(),
            dimensions: None,
            extra_body: ConfigMap::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_encoding_format(mut self, encoding_format: impl Into<String>) -> Self {
        self.encoding_format = encoding_format.into();
        self
    }

    pub fn with_body_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_body.insert(key.into(), value.into());
        self
    }

    /// Build from a client spec: `api_key` config or the provider's
    /// environment variable, `base_url`, `dimensions`, `encoding_format`,
    /// and for NVIDIA `input_type` (default `passage`) and `truncate`
    /// (default `NONE`).
    pub fn from_spec(spec: &ClientSpec, flavor: OpenAiCompatible) -> Result<Self, EmbedError> {
        let api_key = spec.require_credential("api_key", flavor.credential_key())?;
        let mut config = Self::new(api_key, spec.descriptor.model_path.clone())
            .with_base_url(spec.base_url(flavor.default_base_url()));
        if let Some(format) = spec.config_str("encoding_format") {
            config = config.with_encoding_format(format);
        }
        if let Some(dimensions) = spec.config.get_u64("dimensions") {
            config = config.with_dimensions(dimensions as usize);
        }
        if flavor == OpenAiCompatible::Nvidia {
            config = config
                .with_body_field("input_type", spec.config_str("input_type").unwrap_or("passage"))
                .with_body_field("truncate", spec.config_str("truncate").unwrap_or("NONE"));
        }
        Ok(config)
    }

    fn body(&self, texts: &[&str]) -> Value {
        let mut body = json!({
            "model": self.model,
            "input": texts,
            "encoding_format": self.encoding_format,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(dimensions) = self.dimensions {
                obj.insert("dimensions".to_string(), json!(dimensions));
            }
            for (key, value) in &self.extra_body {
                obj.insert(key.clone(), value.clone());
            }
        }
        body
    }
}

/// Client for OpenAI, NVIDIA NIM and Zhipu embeddings.
pub struct OpenAiEmbeddings {
    spec: ClientSpec,
    flavor: OpenAiCompatible,
    lifecycle: Lifecycle<OpenAiEmbeddingsConfig>,
}

impl OpenAiEmbeddings {
    pub fn new(spec: ClientSpec, flavor: OpenAiCompatible) -> Self {
        Self {
            spec,
            flavor,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn openai(spec: ClientSpec) -> Self {
        Self::new(spec, OpenAiCompatible::OpenAi)
    }

    pub fn nvidia(spec: ClientSpec) -> Self {
        Self::new(spec, OpenAiCompatible::Nvidia)
    }

    pub fn zhipu(spec: ClientSpec) -> Self {
        Self::new(spec, OpenAiCompatible::Zhipu)
    }

    pub fn flavor(&self) -> OpenAiCompatible {
        self.flavor
    }

    /// Embed with an explicit NVIDIA `input_type` (`query` or `passage`).
    pub async fn embed_with_input_type(
        &self,
        texts: &[&str],
        input_type: &str,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let config = self.session().await?;
        let config = config.as_ref().clone().with_body_field("input_type", input_type);
        self.embed_with_config(&config, texts).await
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut results = self.embed_with_input_type(&[text], "query").await?;
        results
            .pop()
            .ok_or_else(|| EmbedError::MalformedResponse("empty response".to_string()))
    }

    pub async fn embed_passage(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.embed_with_input_type(texts, "passage").await
    }

    async fn session(&self) -> Result<std::sync::Arc<OpenAiEmbeddingsConfig>, EmbedError> {
        self.lifecycle
            .get_or_init(|| async {
                let config = OpenAiEmbeddingsConfig::from_spec(&self.spec, self.flavor)?;
                tracing::debug!(
                    provider = self.flavor.label(),
                    model = %config.model,
                    base_url = %config.base_url,
                    "initialized embeddings client"
                );
                Ok(config)
            })
            .await
    }

    async fn embed_with_config(
        &self,
        config: &OpenAiEmbeddingsConfig,
        texts: &[&str],
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let request = self
            .spec
            .request(format!("{}/embeddings", config.base_url), config.body(texts))
            .with_bearer(&config.api_key);

        tracing::debug!(provider = self.flavor.label(), count = texts.len(), "embedding batch");
        let body = send_with_retry(
            self.spec.backend.as_ref(),
            &self.spec.retry_policy(),
            self.flavor.label(),
            request,
        )
        .await?;

        let embeddings = parse_indexed_data(&body)?;
        let dimension = config.dimensions.unwrap_or(self.spec.descriptor.dimension);
        check_embeddings(&self.spec.descriptor.name, texts.len(), dimension, &embeddings)?;
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
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
