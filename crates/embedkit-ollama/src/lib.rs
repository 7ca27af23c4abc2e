//! Embedding adapters for self-hosted servers: Ollama and Lollms.
//!
//! Neither endpoint batches, so both clients fan a batch out into one
//! request per text and join the results in input order.

mod embeddings;
mod lollms;

pub use embeddings::{OllamaEmbeddings, OllamaEmbeddingsConfig};
pub use lollms::{LollmsEmbeddings, LollmsEmbeddingsConfig};
