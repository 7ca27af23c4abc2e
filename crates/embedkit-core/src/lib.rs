//! Core types for embedkit.
//!
//! Every other crate in the workspace builds on the types here: the
//! declarative [`ModelDescriptor`], the [`ProviderKind`] tag, the
//! [`EmbeddingClient`] contract every provider adapter implements, and the
//! [`EmbedError`] taxonomy.

mod cache;
mod config;
mod credentials;
mod descriptor;
mod error;
mod probe;

use async_trait::async_trait;

pub use cache::{HfHubCache, LocalModelCache, NoLocalCache};
pub use config::{merge_config, ConfigMap, ConfigMapExt};
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use descriptor::{Availability, ModelDescriptor, ModelSummary, ProviderKind};
pub use error::EmbedError;
pub use probe::probe;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Where a client is in its `Uninitialized → Initializing → Ready` lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Uninitialized,
    Initializing,
    Ready,
}

// ---------------------------------------------------------------------------
// EmbeddingClient
// ---------------------------------------------------------------------------

/// The uniform contract every provider adapter fulfils.
///
/// The async methods are the non-blocking surface; wrap a client in
/// `embedkit_models::BlockingClient` for blocking calls. Embedding from an
/// uninitialized client initializes it first.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// The descriptor this client was instantiated from.
    fn descriptor(&self) -> &ModelDescriptor;

    fn dimension(&self) -> usize {
        self.descriptor().dimension
    }

    fn max_input_tokens(&self) -> usize {
        self.descriptor().max_input_tokens
    }

    fn status(&self) -> ClientStatus;

    /// Establish sessions, credentials or loaded weights. Idempotent.
    async fn initialize(&self) -> Result<(), EmbedError>;

    /// Embed `texts`, one vector per input in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single text. Same result as `embed_batch(&[text])[0]`.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut results = self.embed_batch(&[text]).await?;
        match results.len() {
            1 => Ok(results.remove(0)),
            n => Err(EmbedError::MalformedResponse(format!(
                "expected 1 embedding, got {n}"
            ))),
        }
    }

    /// Release sessions or model weights. The client initializes again on
    /// next use.
    async fn close(&self) -> Result<(), EmbedError> {
        Ok(())
    }
}

/// Check that a provider returned `expected` vectors of `dimension` floats.
pub fn check_embeddings(
    model: &str,
    expected: usize,
    dimension: usize,
    embeddings: &[Vec<f32>],
) -> Result<(), EmbedError> {
    if embeddings.len() != expected {
        return Err(EmbedError::MalformedResponse(format!(
            "{model}: expected {expected} embeddings, got {}",
            embeddings.len()
        )));
    }
    if let Some(bad) = embeddings.iter().find(|v| v.len() != dimension) {
        return Err(EmbedError::MalformedResponse(format!(
            "{model}: expected dimension {dimension}, got {}",
            bad.len()
        )));
    }
    Ok(())
}
