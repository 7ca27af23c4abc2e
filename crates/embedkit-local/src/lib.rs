//! Local transformer embeddings for embedkit.
//!
//! Loads a BERT or XLM-RoBERTa checkpoint from the HuggingFace hub cache (or
//! a plain directory) and runs it with candle. The forward pass happens on
//! tokio's blocking pool so async callers are never stalled by inference.

mod embeddings;
mod model;

pub use embeddings::{LocalTransformerConfig, LocalTransformerEmbeddings};
pub use model::{DeviceKind, LoadedModel};
