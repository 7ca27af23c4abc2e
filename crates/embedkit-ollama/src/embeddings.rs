use std::sync::Arc;

use async_trait::async_trait;
use embedkit_core::{check_embeddings, ClientStatus, EmbedError, EmbeddingClient, ModelDescriptor};
use embedkit_embeddings::parse_vector;
use embedkit_models::{send_with_retry, ClientSpec, Lifecycle};
use futures::future::try_join_all;
use serde_json::json;

const PROVIDER: &str = "ollama";
const FALLBACK_MODEL: &str = "nomic-embed-text";

pub struct OllamaEmbeddingsConfig {
    pub model: String,
    pub base_url: String,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
}

impl OllamaEmbeddingsConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn from_spec(spec: &ClientSpec) -> Self {
        let mut config = Self::new(embedding_model(&spec.descriptor.model_path))
            .with_base_url(spec.base_url("http://localhost:11434"));
        config.api_key = spec.resolve_credential("api_key", Some("OLLAMA_API_KEY"));
        config
    }
}

/// Ollama only embeds with embedding models; anything else is swapped for
/// `nomic-embed-text`.
fn embedding_model(model: &str) -> String {
    if model.to_lowercase().contains("embed") {
        model.to_string()
    } else {
        tracing::warn!(
            model,
            fallback = FALLBACK_MODEL,
            "not an embedding model, falling back"
        );
        FALLBACK_MODEL.to_string()
    }
}

/// Embeddings from a local Ollama server via `/api/embeddings`.
///
/// The endpoint takes one prompt per request, so a batch becomes concurrent
/// requests. Results keep input order.
pub struct OllamaEmbeddings {
    spec: ClientSpec,
    lifecycle: Lifecycle<OllamaEmbeddingsConfig>,
}

impl OllamaEmbeddings {
    pub fn new(spec: ClientSpec) -> Self {
        Self {
            spec,
            lifecycle: Lifecycle::new(),
        }
    }

    async fn session(&self) -> Result<Arc<OllamaEmbeddingsConfig>, EmbedError> {
        self.lifecycle
            .get_or_init(|| async { Ok(OllamaEmbeddingsConfig::from_spec(&self.spec)) })
            .await
    }

    async fn embed_text(
        &self,
        config: &OllamaEmbeddingsConfig,
        text: &str,
    ) -> Result<Vec<f32>, EmbedError> {
        let mut request = self.spec.request(
            format!("{}/api/embeddings", config.base_url),
            json!({
                "model": config.model,
                "prompt": text,
            }),
        );
        if let Some(api_key) = &config.api_key {
            request = request.with_bearer(api_key);
        }

        let body = send_with_retry(
            self.spec.backend.as_ref(),
            &self.spec.retry_policy(),
            PROVIDER,
            request,
        )
        .await?;

        let embedding = body
            .get("embedding")
            .ok_or_else(|| EmbedError::MalformedResponse("missing 'embedding' field".into()))?;
        parse_vector(embedding, "embedding")
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
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
