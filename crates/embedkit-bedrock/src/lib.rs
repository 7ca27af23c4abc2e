//! AWS Bedrock embeddings for embedkit.
//!
//! Supports the Amazon Titan text embedding models (v1 and v2 body formats)
//! and Cohere embed models hosted on Bedrock. Calls go through the
//! [`BedrockInvoker`] seam; the AWS SDK implementation is behind the
//! default `sdk` feature.

mod embeddings;
mod invoker;

pub use embeddings::{BedrockEmbeddings, BedrockEmbeddingsConfig, BedrockFamily};
#[cfg(feature = "sdk")]
pub use invoker::SdkInvoker;
pub use invoker::{AwsCredentials, BedrockInvoker, FakeInvoker};
