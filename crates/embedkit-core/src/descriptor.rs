use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::LocalModelCache;
use crate::config::ConfigMap;
use crate::credentials::CredentialSource;
use crate::error::EmbedError;

// ---------------------------------------------------------------------------
// ProviderKind
// ---------------------------------------------------------------------------

/// Which transport/vendor a model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(alias = "local_hf")]
    LocalTransformer,
    LocalOllama,
    #[serde(rename = "api_openai")]
    ApiOpenAi,
    ApiNvidia,
    ApiCohere,
    ApiJina,
    #[serde(alias = "api_zhipuai")]
    ApiZhipu,
    ApiBedrock,
    #[serde(rename = "api_siliconcloud")]
    ApiSiliconCloud,
    ApiLollms,
    Mock,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 11] = [
        ProviderKind::LocalTransformer,
        ProviderKind::LocalOllama,
        ProviderKind::ApiOpenAi,
        ProviderKind::ApiNvidia,
        ProviderKind::ApiCohere,
        ProviderKind::ApiJina,
        ProviderKind::ApiZhipu,
        ProviderKind::ApiBedrock,
        ProviderKind::ApiSiliconCloud,
        ProviderKind::ApiLollms,
        ProviderKind::Mock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::LocalTransformer => "local_transformer",
            ProviderKind::LocalOllama => "local_ollama",
            ProviderKind::ApiOpenAi => "api_openai",
            ProviderKind::ApiNvidia => "api_nvidia",
            ProviderKind::ApiCohere => "api_cohere",
            ProviderKind::ApiJina => "api_jina",
            ProviderKind::ApiZhipu => "api_zhipu",
            ProviderKind::ApiBedrock => "api_bedrock",
            ProviderKind::ApiSiliconCloud => "api_siliconcloud",
            ProviderKind::ApiLollms => "api_lollms",
            ProviderKind::Mock => "mock",
        }
    }

    /// The credential key the availability probe checks for this kind.
    ///
    /// Kinds that never need a credential return `None`; a descriptor of such
    /// a kind that still sets `requires_credential` is never available.
    pub fn credential_key(&self) -> Option<&'static str> {
        match self {
            ProviderKind::ApiOpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::ApiNvidia => Some("NVIDIA_API_KEY"),
            ProviderKind::ApiCohere => Some("COHERE_API_KEY"),
            ProviderKind::ApiJina => Some("JINA_API_KEY"),
            ProviderKind::ApiZhipu => Some("ZHIPUAI_API_KEY"),
            ProviderKind::ApiBedrock => Some("AWS_ACCESS_KEY_ID"),
            ProviderKind::ApiSiliconCloud => Some("SILICONCLOUD_API_KEY"),
            ProviderKind::ApiLollms => Some("LOLLMS_API_KEY"),
            ProviderKind::LocalTransformer | ProviderKind::LocalOllama | ProviderKind::Mock => {
                None
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local_hf" => return Ok(ProviderKind::LocalTransformer),
            "api_zhipuai" => return Ok(ProviderKind::ApiZhipu),
            _ => {}
        }
        ProviderKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EmbedError::UnknownProvider(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ModelDescriptor
// ---------------------------------------------------------------------------

/// Declarative metadata for one embedding model.
///
/// `is_available` and `is_cached_locally` are computed by the availability
/// probe. They are never persisted; [`refresh_availability`](Self::refresh_availability)
/// is the only way to set them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub display_name: String,
    #[serde(alias = "model_type")]
    pub provider_kind: ProviderKind,
    pub dimension: usize,
    #[serde(alias = "max_tokens")]
    pub max_input_tokens: usize,
    pub provider: String,
    pub model_path: String,
    #[serde(alias = "requires_api_key")]
    pub requires_credential: bool,
    #[serde(default, alias = "config")]
    pub extra_config: ConfigMap,
    #[serde(skip)]
    is_available: bool,
    #[serde(skip)]
    is_cached_locally: bool,
}

impl ModelDescriptor {
    /// Create a descriptor. `display_name` defaults to `name`, `model_path`
    /// to `name`, and `requires_credential` to whether the kind has a
    /// credential key.
    pub fn new(name: impl Into<String>, provider_kind: ProviderKind, dimension: usize) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            model_path: name.clone(),
            name,
            provider_kind,
            dimension,
            max_input_tokens: 512,
            provider: String::new(),
            requires_credential: provider_kind.credential_key().is_some(),
            extra_config: ConfigMap::new(),
            is_available: false,
            is_cached_locally: false,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = max_input_tokens;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_model_path(mut self, model_path: impl Into<String>) -> Self {
        self.model_path = model_path.into();
        self
    }

    pub fn with_requires_credential(mut self, requires_credential: bool) -> Self {
        self.requires_credential = requires_credential;
        self
    }

    pub fn with_extra_config(mut self, extra_config: ConfigMap) -> Self {
        self.extra_config = extra_config;
        self
    }

    /// Add one provider-specific default.
    pub fn with_config_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.extra_config.insert(key.into(), value.into());
        self
    }

    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn is_cached_locally(&self) -> bool {
        self.is_cached_locally
    }

    /// The credential key this descriptor depends on, if any.
    pub fn credential_key(&self) -> Option<&'static str> {
        if self.requires_credential {
            self.provider_kind.credential_key()
        } else {
            None
        }
    }

    /// Re-run the availability probe and store its result.
    pub fn refresh_availability(
        &mut self,
        credentials: &dyn CredentialSource,
        cache: &dyn LocalModelCache,
    ) -> Availability {
        let availability = crate::probe(self, credentials, cache);
        self.apply_availability(availability);
        availability
    }

    /// A copy with the computed fields reset, as written to a registry
    /// document.
    pub fn without_availability(&self) -> Self {
        let mut descriptor = self.clone();
        descriptor.apply_availability(Availability::default());
        descriptor
    }

    pub(crate) fn apply_availability(&mut self, availability: Availability) {
        self.is_available = availability.is_available;
        self.is_cached_locally = availability.is_cached_locally;
    }

    /// Check the structural invariants: a non-empty name and strictly
    /// positive dimension and token limit.
    pub fn validate(&self) -> Result<(), EmbedError> {
        if self.name.trim().is_empty() {
            return Err(EmbedError::InvalidDescriptor(
                "descriptor name must not be empty".to_string(),
            ));
        }
        if self.dimension == 0 {
            return Err(EmbedError::InvalidDescriptor(format!(
                "{}: dimension must be positive",
                self.name
            )));
        }
        if self.max_input_tokens == 0 {
            return Err(EmbedError::InvalidDescriptor(format!(
                "{}: max_input_tokens must be positive",
                self.name
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            provider: self.provider.clone(),
            dimension: self.dimension,
            max_input_tokens: self.max_input_tokens,
            provider_kind: self.provider_kind,
            is_available: self.is_available,
            is_cached_locally: self.is_cached_locally,
            requires_credential: self.requires_credential,
        }
    }
}

/// Result of running the availability probe on one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    pub is_available: bool,
    pub is_cached_locally: bool,
}

/// Listing projection of a [`ModelDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub display_name: String,
    pub provider: String,
    pub dimension: usize,
    pub max_input_tokens: usize,
    pub provider_kind: ProviderKind,
    pub is_available: bool,
    pub is_cached_locally: bool,
    pub requires_credential: bool,
}
