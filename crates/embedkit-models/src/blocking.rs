use embedkit_core::{ClientStatus, EmbedError, EmbeddingClient, ModelDescriptor};
use tokio::runtime::{Builder, Runtime};

/// Blocking surface over any [`EmbeddingClient`].
///
/// Owns a private current-thread runtime. Do not use from inside an async
/// context; call the client's async methods there instead.
pub struct BlockingClient {
    client: Box<dyn EmbeddingClient>,
    runtime: Runtime,
}

impl BlockingClient {
    pub fn new(client: Box<dyn EmbeddingClient>) -> Result<Self, EmbedError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EmbedError::Initialization(format!("failed to start runtime: {e}")))?;
        Ok(Self { client, runtime })
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        self.client.descriptor()
    }

    pub fn dimension(&self) -> usize {
        self.client.dimension()
    }

    pub fn status(&self) -> ClientStatus {
        self.client.status()
    }

    pub fn initialize(&self) -> Result<(), EmbedError> {
        self.runtime.block_on(self.client.initialize())
    }

    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.runtime.block_on(self.client.embed_one(text))
    }

    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.runtime.block_on(self.client.embed_batch(texts))
    }

    pub fn close(&self) -> Result<(), EmbedError> {
        self.runtime.block_on(self.client.close())
    }

    pub fn into_inner(self) -> Box<dyn EmbeddingClient> {
        self.client
    }
}
