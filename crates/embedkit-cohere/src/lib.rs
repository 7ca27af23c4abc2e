//! Cohere integration for embedkit.
//!
//! [`CohereEmbeddings`] calls the Cohere v2 `embed` endpoint and reads the
//! `float` embeddings from the reply. The input type defaults to
//! `classification` and can be set per client with the `input_type` config
//! key or per call with [`CohereEmbeddings::embed_with_type`].

mod embeddings;

pub use embeddings::{CohereEmbeddings, CohereEmbeddingsConfig, CohereInputType};
