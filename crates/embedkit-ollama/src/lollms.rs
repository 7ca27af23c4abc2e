use std::sync::Arc;

use async_trait::async_trait;
use embedkit_core::{check_embeddings, ClientStatus, EmbedError, EmbeddingClient, ModelDescriptor};
use embedkit_embeddings::parse_vector;
use embedkit_models::{send_with_retry, ClientSpec, Lifecycle};
use futures::future::try_join_all;
use serde_json::json;

const PROVIDER: &str = "lollms";

pub struct LollmsEmbeddingsConfig {
    pub base_url: String,
    /// Sent verbatim as the `Authorization` header when set.
    pub api_key: Option<String>,
}

impl LollmsEmbeddingsConfig {
    pub fn new() -> Self {
        Self {
            base_url: "http://localhost:9600".to_string(),
            api_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_spec(spec: &ClientSpec) -> Self {
        let mut config = Self::new().with_base_url(spec.base_url("http://localhost:9600"));
        config.api_key = spec.resolve_credential("api_key", Some("LOLLMS_API_KEY"));
        config
    }
}

impl Default for LollmsEmbeddingsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Embeddings from a Lollms server's `/lollms_embed` endpoint, one request
/// per text.
pub struct LollmsEmbeddings {
    spec: ClientSpec,
    lifecycle: Lifecycle<LollmsEmbeddingsConfig>,
}

impl LollmsEmbeddings {
    pub fn new(spec: ClientSpec) -> Self {
        Self {
            spec,
            lifecycle: Lifecycle::new(),
        }
    }

    async fn session(&self) -> Result<Arc<LollmsEmbeddingsConfig>, EmbedError> {
        self.lifecycle
            .get_or_init(|| async { Ok(LollmsEmbeddingsConfig::from_spec(&self.spec)) })
            .await
    }

    async fn embed_text(
        &self,
        config: &LollmsEmbeddingsConfig,
        text: &str,
    ) -> Result<Vec<f32>, EmbedError> {
        let mut request = self.spec.request(
            format!("{}/lollms_embed", config.base_url),
            json!({ "text": text }),
        );
        if let Some(api_key) = &config.api_key {
            request = request.with_header("Authorization", api_key.clone());
        }

        let body = send_with_retry(
            self.spec.backend.as_ref(),
            &self.spec.retry_policy(),
            PROVIDER,
            request,
        )
        .await?;

        let vector = body
            .get("vector")
            .ok_or_else(|| EmbedError::MalformedResponse("missing 'vector' field".into()))?;
        parse_vector(vector, "vector")
    }
}

#[async_trait]
impl EmbeddingClient for LollmsEmbeddings {
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
        let config = self.session().await?;
        let embeddings =
            try_join_all(texts.iter().map(|text| self.embed_text(&config, text))).await?;
        check_embeddings(
            &self.spec.descriptor.name,
            texts.len(),
            self.spec.descriptor.dimension,
            &embeddings,
        )?;
        Ok(embeddings)
    }

    async fn close(&self) -> Result<(), EmbedError> {
        self.lifecycle.reset().await;
        Ok(())
    }
}
