//! Cohere embeddings over the native v2 `embed` endpoint.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use embedkit_core::{check_embeddings, ClientStatus, EmbedError, EmbeddingClient, ModelDescriptor};
use embedkit_embeddings::parse_vectors;
use embedkit_models::{send_with_retry, ClientSpec, Lifecycle};
use serde_json::{json, Value};

const PROVIDER: &str = "cohere";

/// Input type for Cohere embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohereInputType {
    SearchDocument,
    SearchQuery,
    Classification,
    Clustering,
}

impl CohereInputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CohereInputType::SearchDocument => "search_document",
            CohereInputType::SearchQuery => "search_query",
            CohereInputType::Classification => "classification",
            CohereInputType::Clustering => "clustering",
        }
    }
}

impl FromStr for CohereInputType {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search_document" => Ok(Self::SearchDocument),
            "search_query" => Ok(Self::SearchQuery),
            "classification" => Ok(Self::Classification),
            "clustering" => Ok(Self::Clustering),
            other => Err(EmbedError::Initialization(format!(
                "unsupported Cohere input_type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CohereEmbeddingsConfig {
    pub api_key: String,
    pub model: String,
    /// Default: `Classification`.
    pub input_type: CohereInputType,
    /// Default: `"https://api.cohere.ai/v2"`.
    pub base_url: String,
}

impl CohereEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            input_type: CohereInputType::Classification,
            base_url: "https://api.cohere.ai/v2".to_string(),
        }
    }

    pub fn with_input_type(mut self, input_type: CohereInputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_spec(spec: &ClientSpec) -> Result<Self, EmbedError> {
        let api_key = spec.require_credential("api_key", "COHERE_API_KEY")?;
        let mut config = Self::new(api_key, spec.descriptor.model_path.clone());
        config.base_url = spec.base_url(&config.base_url);
        if let Some(input_type) = spec.config_str("input_type") {
            config = config.with_input_type(input_type.parse()?);
        }
        Ok(config)
    }
}

/// Embeddings backed by the Cohere Embed API.
pub struct CohereEmbeddings {
    spec: ClientSpec,
    lifecycle: Lifecycle<CohereEmbeddingsConfig>,
}

impl CohereEmbeddings {
    pub fn new(spec: ClientSpec) -> Self {
        Self {
            spec,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Embed with an input type other than the configured one, e.g.
    /// `SearchQuery` for retrieval queries.
    pub async fn embed_with_type(
        &self,
        texts: &[&str],
        input_type: CohereInputType,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let config = self.session().await?;

        let body = json!({
            "model": config.model,
            "texts": texts,
            "input_type": input_type.as_str(),
            "embedding_types": ["float"],
        });
        let request = self
            .spec
            .request(format!("{}/embed", config.base_url), body)
            .with_bearer(&config.api_key);

        let response = send_with_retry(
            self.spec.backend.as_ref(),
            &self.spec.retry_policy(),
            PROVIDER,
            request,
        )
        .await?;

        let embeddings = parse_embeddings(&response)?;
        check_embeddings(
            &self.spec.descriptor.name,
            texts.len(),
            self.spec.descriptor.dimension,
            &embeddings,
        )?;
        Ok(embeddings)
    }

    async fn session(&self) -> Result<Arc<CohereEmbeddingsConfig>, EmbedError> {
        self.lifecycle
            .get_or_init(|| async { CohereEmbeddingsConfig::from_spec(&self.spec) })
            .await
    }
}

/// `embeddings.float` in v2 replies; a bare `embeddings` list in v1 replies.
fn parse_embeddings(body: &Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match body.get("embeddings") {
        Some(Value::Object(by_type)) => {
            let floats = by_type
                .get("float")
                .ok_or_else(|| EmbedError::MalformedResponse("missing embeddings.float".into()))?;
            parse_vectors(floats, "embeddings.float")
        }
        Some(list @ Value::Array(_)) => parse_vectors(list, "embeddings"),
        _ => Err(EmbedError::MalformedResponse(
            "response does not contain embeddings".into(),
        )),
    }
}

#[async_trait]
impl EmbeddingClient for CohereEmbeddings {
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
        let input_type = self.session().await?.input_type;
        self.embed_with_type(texts, input_type).await
    }

    async fn close(&self) -> Result<(), EmbedError> {
        self.lifecycle.reset().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = CohereEmbeddingsConfig::new("test-key", "embed-english-v3.0");
        assert_eq!(config.input_type, CohereInputType::Classification);
        assert_eq!(config.base_url, "https://api.cohere.ai/v2");
    }

    #[test]
    fn input_type_round_trips() {
        for input_type in [
            CohereInputType::SearchDocument,
            CohereInputType::SearchQuery,
            CohereInputType::Classification,
            CohereInputType::Clustering,
        ] {
            assert_eq!(input_type.as_str().parse::<CohereInputType>().unwrap(), input_type);
        }
        assert!("search".parse::<CohereInputType>().is_err());
    }
}
