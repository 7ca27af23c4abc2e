//! Providers that speak the OpenAI embeddings wire format.
//!
//! They differ in base URL, credential variable and a few extra body
//! fields; [`OpenAiCompatible`] carries those differences.

use embedkit_core::ProviderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiCompatible {
    OpenAi,
    /// NVIDIA NIM. Adds `input_type` and `truncate` to every request.
    Nvidia,
    Zhipu,
}

impl OpenAiCompatible {
    pub fn from_kind(kind: ProviderKind) -> Option<Self> {
        match kind {
            ProviderKind::ApiOpenAi => Some(Self::OpenAi),
            ProviderKind::ApiNvidia => Some(Self::Nvidia),
            ProviderKind::ApiZhipu => Some(Self::Zhipu),
            _ => None,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAi => ProviderKind::ApiOpenAi,
            Self::Nvidia => ProviderKind::ApiNvidia,
            Self::Zhipu => ProviderKind::ApiZhipu,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Nvidia => "https://integrate.api.nvidia.com/v1",
            Self::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
        }
    }

    /// Name used in logs and in `ProviderCallFailed`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Nvidia => "nvidia",
            Self::Zhipu => "zhipu",
        }
    }

    pub fn credential_key(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Nvidia => "NVIDIA_API_KEY",
            Self::Zhipu => "ZHIPUAI_API_KEY",
        }
    }
}
