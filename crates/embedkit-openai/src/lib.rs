//! OpenAI-compatible embedding adapters.
//!
//! [`OpenAiEmbeddings`] serves OpenAI, NVIDIA NIM and Zhipu, which share the
//! `{base_url}/embeddings` wire format. [`SiliconCloudEmbeddings`] talks to
//! SiliconCloud's base64 variant.

mod compat;
mod embeddings;
mod siliconcloud;

pub use compat::OpenAiCompatible;
pub use embeddings::{OpenAiEmbeddings, OpenAiEmbeddingsConfig};
pub use siliconcloud::{SiliconCloudConfig, SiliconCloudEmbeddings};
