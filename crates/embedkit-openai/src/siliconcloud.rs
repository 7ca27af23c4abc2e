use async_trait::async_trait;
use embedkit_core::{
    check_embeddings, ClientStatus, ConfigMapExt, EmbedError, EmbeddingClient, ModelDescriptor,
};
use embedkit_embeddings::decode_base64_f32;
use embedkit_models::{call_with_retry, send_json, ClientSpec, Lifecycle};
use serde_json::{json, Value};

const PROVIDER: &str = "siliconcloud";
const DEFAULT_ENDPOINT: &str = "https://api.siliconflow.cn/v1/embeddings";

#[derive(Debug, Clone)]
pub struct SiliconCloudConfig {
    /// Full `Authorization` header value, `Bearer ` prefix included.
    pub authorization: String,
    pub model: String,
    /// The embeddings endpoint itself, not a base URL.
    pub endpoint: String,
    /// Texts are cut to this many characters before sending.
    pub max_token_size: usize,
}

impl SiliconCloudConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let authorization = if api_key.starts_with("Bearer ") {
            api_key
        } else {
            format!("Bearer {api_key}")
        };
        Self {
            authorization,
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_token_size: 512,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_token_size(mut self, max_token_size: usize) -> Self {
        self.max_token_size = max_token_size;
        self
    }

    pub fn from_spec(spec: &ClientSpec) -> Result<Self, EmbedError> {
        let api_key = spec.require_credential("api_key", "SILICONCLOUD_API_KEY")?;
        let mut config = Self::new(api_key, spec.descriptor.model_path.clone());
        if let Some(endpoint) = spec.config_str("base_url") {
            config = config.with_endpoint(endpoint);
        }
        if let Some(size) = spec.config.get_u64("max_token_size").filter(|s| *s > 0) {
            config = config.with_max_token_size(size as usize);
        }
        Ok(config)
    }

    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.max_token_size) {
            Some((cut, _)) => &text[..cut],
            None => text,
        }
    }
}

/// SiliconCloud embeddings. Vectors come back base64-encoded.
pub struct SiliconCloudEmbeddings {
    spec: ClientSpec,
    lifecycle: Lifecycle<SiliconCloudConfig>,
}

impl SiliconCloudEmbeddings {
    pub fn new(spec: ClientSpec) -> Self {
        Self {
            spec,
            lifecycle: Lifecycle::new(),
        }
    }
}

#[async_trait]
impl EmbeddingClient for SiliconCloudEmbeddings {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.spec.descriptor
    }

    fn status(&self) -> ClientStatus {
        self.lifecycle.status()
    }

    async fn initialize(&self) -> Result<(), EmbedError> {
        self.lifecycle
            .get_or_init(|| async { SiliconCloudConfig::from_spec(&self.spec) })
            .await
            .map(|_| ())
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let config = self
            .lifecycle
            .get_or_init(|| async { SiliconCloudConfig::from_spec(&self.spec) })
            .await?;

        let input: Vec<&str> = texts.iter().map(|t| config.truncate(t)).collect();
        let request = self
            .spec
            .request(
                config.endpoint.clone(),
                json!({
                    "model": config.model,
                    "input": input,
                    "encoding_format": "base64",
                }),
            )
            .with_header("Authorization", config.authorization.clone());

        let backend = self.spec.backend.as_ref();
        let body = call_with_retry(&self.spec.retry_policy(), PROVIDER, || async {
            let body = send_json(backend, request.clone()).await?;
            // errors can arrive with a success status
            if body.get("code").is_some() {
                return Err(EmbedError::Api {
                    status: 200,
                    body: body.to_string(),
                });
            }
            Ok(body)
        })
        .await?;

        let embeddings = parse_base64_data(&body)?;
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

fn parse_base64_data(body: &Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| {
            EmbedError::MalformedResponse("response does not contain embedding data".into())
        })?;
    data.iter()
        .map(|item| {
            item.get("embedding")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    EmbedError::MalformedResponse("item does not contain a base64 embedding".into())
                })
                .and_then(decode_base64_f32)
        })
        .collect()
}
