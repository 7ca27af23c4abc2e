//! embedkit: ask for an embedding model by name, get back a client that
//! turns text into vectors.
//!
//! This crate re-exports the embedkit sub-crates. Enable features to control
//! which providers are compiled in; the [`EmbeddingHub`] dispatches to every
//! provider present in the build.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `openai`, `cohere`, `jina`, `ollama` |
//! | `openai` | OpenAI, NVIDIA NIM, Zhipu and SiliconCloud |
//! | `cohere` | Cohere v2 embed |
//! | `jina` | Jina AI embeddings |
//! | `ollama` | Ollama and Lollms servers |
//! | `bedrock` | AWS Bedrock (Titan, Cohere on Bedrock) |
//! | `local` | Local BERT / XLM-RoBERTa checkpoints through candle |
//! | `metal`, `cuda` | `local` with GPU support compiled into candle |
//! | `full` | Every provider |
//!
//! The mock provider is always available.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use embedkit::{ConfigMap, EmbeddingClient, EmbeddingHub, HubConfig};
//!
//! # async fn run() -> Result<(), embedkit::EmbedError> {
//! let hub = EmbeddingHub::new(HubConfig::from_env())?;
//! for model in hub.list_models(true) {
//!     println!("{} ({}d)", model.name, model.dimension);
//! }
//!
//! let client = hub.client("mock-small", &ConfigMap::new())?;
//! let vectors = client.embed_batch(&["hello", "world"]).await?;
//! assert_eq!(vectors.len(), 2);
//! # Ok(())
//! # }
//! ```

/// Descriptors, provider kinds, the client trait and the error type.
/// Always available.
pub use embedkit_core as core;

/// Transport seam, retry policy, client lifecycle and the blocking wrapper.
pub use embedkit_models as models;

/// The mock provider and response-parsing helpers.
pub use embedkit_embeddings as embeddings;

/// Registry document, availability probe, catalog, dispatcher and hub.
pub use embedkit_registry as registry;

/// OpenAI-compatible providers: OpenAI, NVIDIA, Zhipu, SiliconCloud.
#[cfg(feature = "openai")]
pub use embedkit_openai as openai;

/// Cohere embeddings.
#[cfg(feature = "cohere")]
pub use embedkit_cohere as cohere;

/// Jina AI embeddings.
#[cfg(feature = "jina")]
pub use embedkit_jina as jina;

/// Ollama and Lollms embeddings.
#[cfg(feature = "ollama")]
pub use embedkit_ollama as ollama;

/// AWS Bedrock embeddings.
#[cfg(feature = "bedrock")]
pub use embedkit_bedrock as bedrock;

/// Local transformer embeddings.
#[cfg(feature = "local")]
pub use embedkit_local as local;

pub use embedkit_core::{
    Availability, ClientStatus, ConfigMap, EmbedError, EmbeddingClient, ModelDescriptor,
    ModelSummary, ProviderKind,
};
pub use embedkit_models::{BlockingClient, RetryPolicy};
pub use embedkit_registry::{
    CatalogConfig, EmbeddingHub, HubConfig, ModelCatalog, ModelOrder, ProviderDispatcher,
};
