//! Jina AI embeddings for embedkit.
//!
//! Sends `{model, normalized, embedding_type, dimensions, late_chunking,
//! input}` to the Jina embeddings endpoint. A reply with no `data` is a
//! failed call and goes through the retry policy like a transport error.

mod embeddings;

pub use embeddings::{JinaEmbeddings, JinaEmbeddingsConfig};
