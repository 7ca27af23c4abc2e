use std::ffi::OsString;
use std::path::{Path, PathBuf};

use embedkit_core::{EmbedError, ModelDescriptor, ProviderKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// The persisted registry: `{"models": [...]}`.
///
/// Computed availability fields are not part of the document. Unknown
/// fields on read are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub models: Vec<ModelDescriptor>,
}

impl RegistryDocument {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self { models }
    }

    /// The built-in model set.
    pub fn builtin() -> Self {
        Self::new(builtin_descriptors())
    }

    /// Read and parse a document. Descriptors are not validated here.
    pub fn read(path: &Path) -> Result<Self, EmbedError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EmbedError::Persistence(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            EmbedError::Persistence(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Check every descriptor's structural invariants.
    pub fn validate(&self) -> Result<(), EmbedError> {
        self.models.iter().try_for_each(ModelDescriptor::validate)
    }

    pub fn to_json_pretty(&self) -> Result<String, EmbedError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EmbedError::Persistence(format!("cannot serialize registry: {e}")))
    }

    /// Write to `<path>.tmp`, then rename over `path`, so readers never see
    /// a half-written document. Missing parent directories are created.
    pub fn write_atomic(&self, path: &Path) -> Result<(), EmbedError> {
        let contents = self.to_json_pretty()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EmbedError::Persistence(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let tmp_path = tmp_path(path);
        std::fs::write(&tmp_path, contents).map_err(|e| {
            EmbedError::Persistence(format!("cannot write {}: {e}", tmp_path.display()))
        })?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(EmbedError::Persistence(format!(
                "cannot replace {}: {e}",
                path.display()
            )));
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Descriptors available out of the box, at least one per provider kind.
pub fn builtin_descriptors() -> Vec<ModelDescriptor> {
    vec![
        // Local transformers
        ModelDescriptor::new("bge-small-zh-v1.5", ProviderKind::LocalTransformer, 512)
            .with_display_name("BGE Small Chinese v1.5")
            .with_max_input_tokens(512)
            .with_provider("BAAI")
            .with_model_path("BAAI/bge-small-zh-v1.5"),
        ModelDescriptor::new("bge-m3", ProviderKind::LocalTransformer, 1024)
            .with_display_name("BGE M3")
            .with_max_input_tokens(8192)
            .with_provider("BAAI")
            .with_model_path("BAAI/bge-m3"),
        ModelDescriptor::new("all-MiniLM-L6-v2", ProviderKind::LocalTransformer, 384)
            .with_display_name("All MiniLM L6 v2")
            .with_max_input_tokens(256)
            .with_provider("sentence-transformers")
            .with_model_path("sentence-transformers/all-MiniLM-L6-v2"),
        ModelDescriptor::new("nomic-embed-text", ProviderKind::LocalOllama, 768)
            .with_display_name("Nomic Embed Text (Ollama)")
            .with_max_input_tokens(8192)
            .with_provider("Ollama")
            .with_config_value("base_url", "http://localhost:11434"),
        // OpenAI-shaped APIs
        ModelDescriptor::new("text-embedding-ada-002", ProviderKind::ApiOpenAi, 1536)
            .with_display_name("OpenAI Ada 002")
            .with_max_input_tokens(8191)
            .with_provider("OpenAI")
            .with_config_value("base_url", "https://api.openai.com/v1"),
        ModelDescriptor::new("text-embedding-3-small", ProviderKind::ApiOpenAi, 1536)
            .with_display_name("OpenAI Embedding 3 Small")
            .with_max_input_tokens(8191)
            .with_provider("OpenAI")
            .with_config_value("base_url", "https://api.openai.com/v1"),
        ModelDescriptor::new("text-embedding-3-large", ProviderKind::ApiOpenAi, 3072)
            .with_display_name("OpenAI Embedding 3 Large")
            .with_max_input_tokens(8191)
            .with_provider("OpenAI")
            .with_config_value("base_url", "https://api.openai.com/v1"),
        ModelDescriptor::new("nv-embedqa-e5-v5", ProviderKind::ApiNvidia, 1024)
            .with_display_name("NVIDIA NV-EmbedQA E5 v5")
            .with_max_input_tokens(512)
            .with_provider("NVIDIA")
            .with_model_path("nvidia/nv-embedqa-e5-v5")
            .with_config_value("input_type", "passage"),
        ModelDescriptor::new("embedding-2", ProviderKind::ApiZhipu, 1024)
            .with_display_name("ZhipuAI Embedding 2")
            .with_max_input_tokens(512)
            .with_provider("ZhipuAI"),
        ModelDescriptor::new("siliconcloud-bge-m3", ProviderKind::ApiSiliconCloud, 1024)
            .with_display_name("SiliconCloud BGE M3")
            .with_max_input_tokens(512)
            .with_provider("SiliconCloud")
            .with_model_path("BAAI/bge-m3")
            .with_config_value("max_token_size", 512),
        // Other vendors
        ModelDescriptor::new("embed-multilingual-v3.0", ProviderKind::ApiCohere, 1024)
            .with_display_name("Cohere Multilingual v3.0")
            .with_max_input_tokens(512)
            .with_provider("Cohere")
            .with_config_value("input_type", "classification")
            .with_config_value("embedding_types", json!(["float"])),
        ModelDescriptor::new("embed-english-v3.0", ProviderKind::ApiCohere, 1024)
            .with_display_name("Cohere English v3.0")
            .with_max_input_tokens(512)
            .with_provider("Cohere")
            .with_config_value("input_type", "classification")
            .with_config_value("embedding_types", json!(["float"])),
        ModelDescriptor::new("jina-embeddings-v3", ProviderKind::ApiJina, 1024)
            .with_display_name("Jina Embeddings v3")
            .with_max_input_tokens(8192)
            .with_provider("Jina AI"),
        ModelDescriptor::new("titan-embed-text-v2", ProviderKind::ApiBedrock, 1024)
            .with_display_name("Amazon Titan Text Embeddings v2")
            .with_max_input_tokens(8192)
            .with_provider("AWS Bedrock")
            .with_model_path("amazon.titan-embed-text-v2:0"),
        ModelDescriptor::new("bedrock-cohere-embed-english-v3", ProviderKind::ApiBedrock, 1024)
            .with_display_name("Cohere English v3 on Bedrock")
            .with_max_input_tokens(512)
            .with_provider("AWS Bedrock")
            .with_model_path("cohere.embed-english-v3"),
        ModelDescriptor::new("lollms", ProviderKind::ApiLollms, 384)
            .with_display_name("Lollms server embeddings")
            .with_max_input_tokens(512)
            .with_provider("Lollms")
            .with_requires_credential(false)
            .with_config_value("base_url", "http://localhost:9600"),
        // Mock
        ModelDescriptor::new("mock-small", ProviderKind::Mock, 384)
            .with_display_name("Mock Small (384d)")
            .with_max_input_tokens(512)
            .with_provider("Mock")
            .with_model_path("mock"),
        ModelDescriptor::new("mock-large", ProviderKind::Mock, 1536)
            .with_display_name("Mock Large (1536d)")
            .with_max_input_tokens(8191)
            .with_provider("Mock")
            .with_model_path("mock"),
    ]
}
