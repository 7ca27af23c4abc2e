//! Model registry, availability probe, catalog and provider dispatch.
//!
//! ```no_run
//! use embedkit_core::ConfigMap;
//! use embedkit_registry::{EmbeddingHub, HubConfig};
//!
//! # async fn run() -> Result<(), embedkit_core::EmbedError> {
//! let hub = EmbeddingHub::new(HubConfig::from_env())?;
//! let client = hub.client("mock-small", &ConfigMap::new())?;
//! let vector = client.embed_one("hello").await?;
//! assert_eq!(vector.len(), 384);
//! # Ok(())
//! # }
//! ```

mod catalog;
mod dispatcher;
mod document;
mod hub;

pub use catalog::{CatalogConfig, ModelCatalog, ModelOrder};
pub use dispatcher::{ProviderConstructor, ProviderDispatcher};
pub use document::{builtin_descriptors, RegistryDocument};
pub use hub::{EmbeddingHub, HubConfig, REGISTRY_PATH_ENV};
pub use embedkit_core::probe;
