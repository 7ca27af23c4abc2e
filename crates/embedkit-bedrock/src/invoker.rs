use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use embedkit_core::EmbedError;
use serde_json::Value;

/// The `invoke_model` call, abstracted so the adapter can be driven
/// without AWS.
#[async_trait]
pub trait BedrockInvoker: Send + Sync {
    async fn invoke_model(&self, model_id: &str, body: Value) -> Result<Value, EmbedError>;
}

/// Static AWS credentials taken from config or the credential source.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "sdk")]
pub use sdk::SdkInvoker;

#[cfg(feature = "sdk")]
mod sdk {
    use std::time::Duration;

    use async_trait::async_trait;
    use aws_config::timeout::TimeoutConfig;
    use aws_sdk_bedrockruntime::config::Credentials;
    use aws_sdk_bedrockruntime::error::{DisplayErrorContext, SdkError};
    use aws_sdk_bedrockruntime::primitives::Blob;
    use embedkit_core::EmbedError;
    use serde_json::Value;

    use super::{AwsCredentials, BedrockInvoker};

    /// [`BedrockInvoker`] over the AWS SDK `bedrock-runtime` client.
    pub struct SdkInvoker {
        client: aws_sdk_bedrockruntime::Client,
    }

    impl SdkInvoker {
        /// Load AWS configuration from the environment. Explicit
        /// credentials, when given, take precedence over the default chain.
        /// `timeout` bounds each operation, retries included.
        pub async fn new(
            region: &str,
            credentials: Option<AwsCredentials>,
            timeout: Duration,
        ) -> Self {
            let mut loader = aws_config::from_env()
                .region(aws_config::Region::new(region.to_string()))
                .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
            if let Some(creds) = credentials {
                loader = loader.credentials_provider(Credentials::new(
                    creds.access_key_id,
                    creds.secret_access_key,
                    creds.session_token,
                    None,
                    "embedkit",
                ));
            }
            let config = loader.load().await;
            Self {
                client: aws_sdk_bedrockruntime::Client::new(&config),
            }
        }

        pub fn from_client(client: aws_sdk_bedrockruntime::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl BedrockInvoker for SdkInvoker {
        async fn invoke_model(&self, model_id: &str, body: Value) -> Result<Value, EmbedError> {
            let payload = serde_json::to_vec(&body)
                .map_err(|e| EmbedError::Transport(format!("failed to encode request: {e}")))?;
            let output = self
                .client
                .invoke_model()
                .model_id(model_id)
                .content_type("application/json")
                .accept("application/json")
                .body(Blob::new(payload))
                .send()
                .await
                .map_err(|e| match e {
                    SdkError::TimeoutError(_) => {
                        EmbedError::Timeout(format!("Bedrock invoke_model {model_id}"))
                    }
                    other => EmbedError::Transport(format!(
                        "Bedrock invoke_model failed: {}",
                        DisplayErrorContext(&other)
                    )),
                })?;
            serde_json::from_slice(output.body().as_ref()).map_err(|e| {
                EmbedError::MalformedResponse(format!("Bedrock response is not JSON: {e}"))
            })
        }
    }
}

/// Test invoker with queued replies. Every call is recorded.
#[derive(Clone, Default)]
pub struct FakeInvoker {
    replies: Arc<Mutex<VecDeque<Result<Value, EmbedError>>>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, body: Value) -> &Self {
        lock(&self.replies).push_back(Ok(body));
        self
    }

    pub fn push_error(&self, error: EmbedError) -> &Self {
        lock(&self.replies).push_back(Err(error));
        self
    }

    /// `(model_id, body)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl BedrockInvoker for FakeInvoker {
    async fn invoke_model(&self, model_id: &str, body: Value) -> Result<Value, EmbedError> {
        lock(&self.calls).push((model_id.to_string(), body));
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(EmbedError::Transport("FakeInvoker exhausted".to_string())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
