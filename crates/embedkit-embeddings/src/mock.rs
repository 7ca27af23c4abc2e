use std::hash::Hasher;
use std::sync::Arc;

use async_trait::async_trait;
use embedkit_core::{ClientStatus, EmbedError, EmbeddingClient, ModelDescriptor, ProviderKind};
use embedkit_models::{ClientSpec, Lifecycle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use twox_hash::XxHash64;

/// Deterministic embeddings for testing.
///
/// Each text seeds a generator from its xxHash64, so the same text always
/// maps to the same vector of uniform values in `[-1, 1)`.
pub struct MockEmbeddings {
    descriptor: Arc<ModelDescriptor>,
    lifecycle: Lifecycle<()>,
}

impl MockEmbeddings {
    pub fn new(spec: ClientSpec) -> Self {
        Self {
            descriptor: spec.descriptor,
            lifecycle: Lifecycle::new(),
        }
    }

    /// A standalone mock of the given dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        let descriptor = ModelDescriptor::new("mock", ProviderKind::Mock, dimension)
            .with_display_name("Mock Embedding")
            .with_provider("Mock");
        Self {
            descriptor: Arc::new(descriptor),
            lifecycle: Lifecycle::new(),
        }
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddings {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn status(&self) -> ClientStatus {
        self.lifecycle.status()
    }

    async fn initialize(&self) -> Result<(), EmbedError> {
        self.lifecycle.get_or_init(|| async { Ok(()) }).await?;
        Ok(())
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.initialize().await?;
        Ok(texts
            .iter()
            .map(|text| mock_vector(text, self.descriptor.dimension))
            .collect())
    }

    async fn close(&self) -> Result<(), EmbedError> {
        self.lifecycle.reset().await;
        Ok(())
    }
}

/// The vector [`MockEmbeddings`] produces for `text`.
pub fn mock_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(text.as_bytes());
    let mut rng = StdRng::seed_from_u64(hasher.finish());
    (0..dimension).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}
