use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use embedkit_core::{
    check_embeddings, ClientStatus, EmbedError, EmbeddingClient, ModelDescriptor,
};
use embedkit_embeddings::{parse_vector, parse_vectors};
use embedkit_models::{call_with_retry, ClientSpec, Lifecycle};
use futures::future::try_join_all;
use serde_json::{json, Value};

use crate::invoker::{AwsCredentials, BedrockInvoker};

const PROVIDER: &str = "bedrock";
const DEFAULT_REGION: &str = "us-east-1";

/// Request/response format, picked from the model id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedrockFamily {
    /// `amazon.titan-embed-text-v1`: `{inputText}`.
    TitanV1,
    /// `amazon.titan-embed-text-v2:0`: `{inputText, embeddingTypes}`.
    TitanV2,
    /// `cohere.embed-*`: batched `{texts, input_type, truncate}`.
    Cohere,
}

impl BedrockFamily {
    pub fn from_model_id(model_id: &str) -> Result<Self, EmbedError> {
        let vendor = model_id.split('.').next().unwrap_or_default();
        match vendor {
            "amazon" if model_id.contains("v2") => Ok(Self::TitanV2),
            "amazon" if model_id.contains("v1") => Ok(Self::TitanV1),
            "amazon" => Err(EmbedError::Initialization(format!(
                "Amazon model {model_id} is not supported"
            ))),
            "cohere" => Ok(Self::Cohere),
            other => Err(EmbedError::Initialization(format!(
                "Bedrock model provider '{other}' is not supported"
            ))),
        }
    }

    fn titan_body(&self, text: &str) -> Value {
        match self {
            Self::TitanV2 => json!({"inputText": text, "embeddingTypes": ["float"]}),
            _ => json!({"inputText": text}),
        }
    }
}

/// Settings resolved at initialization.
#[derive(Debug, Clone)]
pub struct BedrockEmbeddingsConfig {
    pub model_id: String,
    pub family: BedrockFamily,
    pub region: String,
    /// Cohere `input_type` (default: `search_document`).
    pub input_type: String,
    /// Cohere `truncate` (default: `NONE`).
    pub truncate: String,
    /// Explicit credentials; `None` leaves it to the SDK's default chain.
    pub credentials: Option<AwsCredentials>,
}

impl BedrockEmbeddingsConfig {
    /// Credentials come from `aws_access_key_id` / `aws_secret_access_key` /
    /// `aws_session_token` config keys, falling back to the matching `AWS_*`
    /// variables. The region is `region_name`, then `AWS_REGION`, then
    /// `us-east-1`.
    pub fn from_spec(spec: &ClientSpec) -> Result<Self, EmbedError> {
        let model_id = spec.descriptor.model_path.clone();
        let family = BedrockFamily::from_model_id(&model_id)?;
        let region = spec
            .config_str("region_name")
            .map(str::to_string)
            .or_else(|| spec.credentials.credential("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let access_key = spec.resolve_credential("aws_access_key_id", Some("AWS_ACCESS_KEY_ID"));
        let secret_key =
            spec.resolve_credential("aws_secret_access_key", Some("AWS_SECRET_ACCESS_KEY"));
        let credentials = match (access_key, secret_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token: spec
                    .resolve_credential("aws_session_token", Some("AWS_SESSION_TOKEN")),
            }),
            _ => None,
        };

        Ok(Self {
            model_id,
            family,
            region,
            input_type: spec
                .config_str("input_type")
                .unwrap_or("search_document")
                .to_string(),
            truncate: spec.config_str("truncate").unwrap_or("NONE").to_string(),
            credentials,
        })
    }
}

struct BedrockSession {
    config: BedrockEmbeddingsConfig,
    invoker: Arc<dyn BedrockInvoker>,
}

/// Embeddings through Bedrock `invoke_model`.
///
/// Titan models embed one text per call, so batches fan out concurrently.
/// Cohere models take the whole batch in one call.
pub struct BedrockEmbeddings {
    spec: ClientSpec,
    invoker: Option<Arc<dyn BedrockInvoker>>,
    lifecycle: Lifecycle<BedrockSession>,
}

impl BedrockEmbeddings {
    /// A client that builds an AWS SDK invoker on initialization.
    pub fn new(spec: ClientSpec) -> Self {
        Self {
            spec,
            invoker: None,
            lifecycle: Lifecycle::new(),
        }
    }

    /// A client that calls Bedrock through `invoker`.
    pub fn with_invoker(spec: ClientSpec, invoker: Arc<dyn BedrockInvoker>) -> Self {
        Self {
            spec,
            invoker: Some(invoker),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Cohere-only: embed with an explicit `input_type`, e.g. `search_query`.
    pub async fn embed_with_input_type(
        &self,
        texts: &[&str],
        input_type: &str,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let session = self.session().await?;
        if session.config.family != BedrockFamily::Cohere {
            return Err(EmbedError::Initialization(
                "input_type is only supported for Cohere models".to_string(),
            ));
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.embed_cohere(&session, texts, input_type).await?;
        self.check(texts.len(), embeddings)
    }

    async fn session(&self) -> Result<Arc<BedrockSession>, EmbedError> {
        self.lifecycle
            .get_or_init(|| async {
                let config = BedrockEmbeddingsConfig::from_spec(&self.spec)?;
                let invoker = match &self.invoker {
                    Some(invoker) => Arc::clone(invoker),
                    None => sdk_invoker(&config, self.spec.timeout()).await?,
                };
                tracing::debug!(
                    model = %config.model_id,
                    region = %config.region,
                    family = ?config.family,
                    "initialized Bedrock client"
                );
                Ok(BedrockSession { config, invoker })
            })
            .await
    }

    /// One `invoke_model` under the retry policy. Each attempt is bounded by
    /// the client's `timeout`; running past it counts as a failed attempt.
    async fn invoke(&self, session: &BedrockSession, body: Value) -> Result<Value, EmbedError> {
        let model_id = session.config.model_id.as_str();
        let timeout = self.spec.timeout();
        call_with_retry(&self.spec.retry_policy(), PROVIDER, || {
            let body = body.clone();
            async move {
                tokio::time::timeout(timeout, session.invoker.invoke_model(model_id, body))
                    .await
                    .map_err(|_| {
                        EmbedError::Timeout(format!(
                            "Bedrock invoke_model {model_id} exceeded {}s",
                            timeout.as_secs_f64()
                        ))
                    })?
            }
        })
        .await
    }

    async fn embed_titan(
        &self,
        session: &BedrockSession,
        text: &str,
    ) -> Result<Vec<f32>, EmbedError> {
        let reply = self
            .invoke(session, session.config.family.titan_body(text))
            .await?;
        let embedding = reply
            .get("embedding")
            .ok_or_else(|| EmbedError::MalformedResponse("missing 'embedding' field".into()))?;
        parse_vector(embedding, "embedding")
    }

    async fn embed_cohere(
        &self,
        session: &BedrockSession,
        texts: &[&str],
        input_type: &str,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let body = json!({
            "texts": texts,
            "input_type": input_type,
            "truncate": session.config.truncate,
        });
        let reply = self.invoke(session, body).await?;
        match reply.get("embeddings") {
            Some(Value::Object(by_type)) => by_type
                .get("float")
                .ok_or_else(|| EmbedError::MalformedResponse("missing embeddings.float".into()))
                .and_then(|floats| parse_vectors(floats, "embeddings.float")),
            Some(list) => parse_vectors(list, "embeddings"),
            None => Err(EmbedError::MalformedResponse(
                "missing 'embeddings' field".into(),
            )),
        }
    }

    fn check(
        &self,
        expected: usize,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        check_embeddings(
            &self.spec.descriptor.name,
            expected,
            self.spec.descriptor.dimension,
            &embeddings,
        )?;
        Ok(embeddings)
    }
}

#[cfg(feature = "sdk")]
async fn sdk_invoker(
    config: &BedrockEmbeddingsConfig,
    timeout: Duration,
) -> Result<Arc<dyn BedrockInvoker>, EmbedError> {
    let invoker =
        crate::invoker::SdkInvoker::new(&config.region, config.credentials.clone(), timeout).await;
    Ok(Arc::new(invoker))
}

#[cfg(not(feature = "sdk"))]
async fn sdk_invoker(
    _config: &BedrockEmbeddingsConfig,
    _timeout: Duration,
) -> Result<Arc<dyn BedrockInvoker>, EmbedError> {
    Err(EmbedError::Initialization(
        "embedkit-bedrock was built without the `sdk` feature; supply an invoker".to_string(),
    ))
}

#[async_trait]
impl EmbeddingClient for BedrockEmbeddings {
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
        let session = self.session().await?;
        let embeddings = match session.config.family {
            BedrockFamily::Cohere => {
                self.embed_cohere(&session, texts, &session.config.input_type)
                    .await?
            }
            BedrockFamily::TitanV1 | BedrockFamily::TitanV2 => {
                try_join_all(texts.iter().map(|text| self.embed_titan(&session, text))).await?
            }
        };
        self.check(texts.len(), embeddings)
    }

    async fn close(&self) -> Result<(), EmbedError> {
        self.lifecycle.reset().await;
        Ok(())
    }
}
