use std::collections::HashMap;
use std::sync::Arc;

use embedkit_core::{
    merge_config, ConfigMap, CredentialSource, EmbedError, EmbeddingClient, EnvCredentials,
    ModelDescriptor, ProviderKind,
};
use embedkit_embeddings::MockEmbeddings;
use embedkit_models::{ClientSpec, HttpBackend, ProviderBackend};

/// Builds a client for one provider kind from a fully merged [`ClientSpec`].
pub type ProviderConstructor =
    Arc<dyn Fn(ClientSpec) -> Result<Box<dyn EmbeddingClient>, EmbedError> + Send + Sync>;

/// Maps provider kinds to constructors and turns descriptors into clients.
#[derive(Clone)]
pub struct ProviderDispatcher {
    constructors: HashMap<ProviderKind, ProviderConstructor>,
    backend: Arc<dyn ProviderBackend>,
    credentials: Arc<dyn CredentialSource>,
}

impl ProviderDispatcher {
    /// A dispatcher with no providers, sending over HTTP and reading
    /// credentials from the environment.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            backend: Arc::new(HttpBackend::new()),
            credentials: Arc::new(EnvCredentials),
        }
    }

    /// A dispatcher with every provider compiled into this build.
    pub fn with_default_providers() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(ProviderKind::Mock, |spec| {
            Ok(Box::new(MockEmbeddings::new(spec)))
        });

        #[cfg(feature = "openai")]
        {
            use embedkit_openai::{OpenAiEmbeddings, SiliconCloudEmbeddings};
            dispatcher.register(ProviderKind::ApiOpenAi, |spec| {
                Ok(Box::new(OpenAiEmbeddings::openai(spec)))
            });
            dispatcher.register(ProviderKind::ApiNvidia, |spec| {
                Ok(Box::new(OpenAiEmbeddings::nvidia(spec)))
            });
            dispatcher.register(ProviderKind::ApiZhipu, |spec| {
                Ok(Box::new(OpenAiEmbeddings::zhipu(spec)))
            });
            dispatcher.register(ProviderKind::ApiSiliconCloud, |spec| {
                Ok(Box::new(SiliconCloudEmbeddings::new(spec)))
            });
        }
        #[cfg(feature = "cohere")]
        dispatcher.register(ProviderKind::ApiCohere, |spec| {
            Ok(Box::new(embedkit_cohere::CohereEmbeddings::new(spec)))
        });
        #[cfg(feature = "jina")]
        dispatcher.register(ProviderKind::ApiJina, |spec| {
            Ok(Box::new(embedkit_jina::JinaEmbeddings::new(spec)))
        });
        #[cfg(feature = "ollama")]
        {
            use embedkit_ollama::{LollmsEmbeddings, OllamaEmbeddings};
            dispatcher.register(ProviderKind::LocalOllama, |spec| {
                Ok(Box::new(OllamaEmbeddings::new(spec)))
            });
            dispatcher.register(ProviderKind::ApiLollms, |spec| {
                Ok(Box::new(LollmsEmbeddings::new(spec)))
            });
        }
        #[cfg(feature = "bedrock")]
        dispatcher.register(ProviderKind::ApiBedrock, |spec| {
            Ok(Box::new(embedkit_bedrock::BedrockEmbeddings::new(spec)))
        });
        #[cfg(feature = "local")]
        dispatcher.register(ProviderKind::LocalTransformer, |spec| {
            Ok(Box::new(embedkit_local::LocalTransformerEmbeddings::new(spec)))
        });

        dispatcher
    }

    pub fn with_backend(mut self, backend: Arc<dyn ProviderBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register<F>(&mut self, kind: ProviderKind, constructor: F) -> &mut Self
    where
        F: Fn(ClientSpec) -> Result<Box<dyn EmbeddingClient>, EmbedError> + Send + Sync + 'static,
    {
        self.constructors.insert(kind, Arc::new(constructor));
        self
    }

    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Provider kinds with a registered constructor, in declaration order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect()
    }

    /// Build a client for `descriptor` with `overrides` layered on top of
    /// its `extra_config`.
    ///
    /// Fails with [`EmbedError::UnknownProvider`] when no constructor is
    /// registered for the kind, and with [`EmbedError::ModelUnavailable`]
    /// when the probe marked the model unavailable.
    pub fn instantiate(
        &self,
        descriptor: &Arc<ModelDescriptor>,
        overrides: &ConfigMap,
    ) -> Result<Box<dyn EmbeddingClient>, EmbedError> {
        let constructor = self
            .constructors
            .get(&descriptor.provider_kind)
            .ok_or_else(|| EmbedError::UnknownProvider(descriptor.provider_kind.to_string()))?;

        if !descriptor.is_available() {
            return Err(EmbedError::ModelUnavailable {
                model: descriptor.name.clone(),
                credential_key: descriptor.credential_key().map(str::to_string),
            });
        }

        let spec = ClientSpec::new(Arc::clone(descriptor))
            .with_config(merge_config(&descriptor.extra_config, overrides))
            .with_backend(Arc::clone(&self.backend))
            .with_credentials(Arc::clone(&self.credentials));
        tracing::debug!(
            model = %descriptor.name,
            kind = %descriptor.provider_kind,
            "instantiating embedding client"
        );
        constructor(spec)
    }
}

impl Default for ProviderDispatcher {
    fn default() -> Self {
        Self::with_default_providers()
    }
}

impl std::fmt::Debug for ProviderDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDispatcher")
            .field("kinds", &self.kinds())
            .finish_non_exhaustive()
    }
}
