use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use embedkit_core::EmbedError;
use serde_json::Value;
use tokenizers::Tokenizer;

/// Compute device for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    #[default]
    Cpu,
    Metal,
    Cuda,
}

impl DeviceKind {
    fn device(self) -> Result<Device, EmbedError> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Metal => Device::new_metal(0).map_err(load_error("Metal device")),
            Self::Cuda => Device::new_cuda(0).map_err(load_error("CUDA device")),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "metal" | "mps" => Ok(Self::Metal),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(EmbedError::Initialization(format!(
                "unknown device '{other}', expected cpu, metal or cuda"
            ))),
        }
    }
}

enum Encoder {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

/// Tokenizer and weights held in memory while a client is ready.
pub struct LoadedModel {
    encoder: Encoder,
    tokenizer: Tokenizer,
    device: Device,
    max_tokens: usize,
    pub model_dir: PathBuf,
}

impl LoadedModel {
    /// Load `config.json`, `tokenizer.json` and the weights from `model_dir`.
    /// `model.safetensors` is preferred; `pytorch_model.bin` is the fallback.
    pub fn load(
        model_dir: &Path,
        device: DeviceKind,
        max_tokens: usize,
    ) -> Result<Self, EmbedError> {
        let device = device.device()?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            EmbedError::Initialization(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path).map_err(|e| {
            EmbedError::Initialization(format!("cannot read {}: {e}", config_path.display()))
        })?;
        let config: Value = serde_json::from_str(&raw_config)
            .map_err(load_error(format!("invalid {}", config_path.display())))?;

        let vb = VarBuilder::from_tensors(load_weights(model_dir, &device)?, DType::F32, &device);

        let model_type = config
            .get("model_type")
            .and_then(Value::as_str)
            .unwrap_or("bert");
        let encoder = match model_type {
            "xlm-roberta" | "roberta" => {
                let config: XLMRobertaConfig = serde_json::from_value(config)
                    .map_err(load_error("invalid XLM-RoBERTa config"))?;
                Encoder::XlmRoberta(
                    XLMRobertaModel::new(&config, vb).map_err(load_error("failed to build model"))?,
                )
            }
            "bert" => {
                let config: BertConfig =
                    serde_json::from_value(config).map_err(load_error("invalid BERT config"))?;
                Encoder::Bert(
                    BertModel::load(vb, &config).map_err(load_error("failed to build model"))?,
                )
            }
            other => {
                return Err(EmbedError::Initialization(format!(
                    "unsupported model_type '{other}' in {}",
                    config_path.display()
                )))
            }
        };

        Ok(Self {
            encoder,
            tokenizer,
            device,
            max_tokens,
            model_dir: model_dir.to_path_buf(),
        })
    }

    /// Token ids for `text`, cut to the model's input limit.
    pub fn token_ids(&self, text: &str) -> Result<Vec<u32>, EmbedError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbedError::MalformedResponse(format!("tokenization failed: {e}")))?;
        let mut ids = encoding.get_ids().to_vec();
        ids.truncate(self.max_tokens.max(1));
        Ok(ids)
    }

    /// Mean of the last hidden state over all tokens of a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let ids = self.token_ids(text)?;
        self.forward(&ids).map_err(|e| {
            EmbedError::ProviderCallFailed {
                provider: "local_transformer".to_string(),
                attempts: 1,
                source: Box::new(EmbedError::Transport(format!("inference failed: {e}"))),
            }
        })
    }

    fn forward(&self, ids: &[u32]) -> candle_core::Result<Vec<f32>> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = input_ids.ones_like()?;

        let hidden = match &self.encoder {
            Encoder::Bert(model) => {
                model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?
            }
            Encoder::XlmRoberta(model) => model.forward(
                &input_ids,
                &attention_mask,
                &token_type_ids,
                None,
                None,
                None,
            )?,
        };

        // [1, T, H] -> [H]
        hidden
            .mean(1)?
            .squeeze(0)?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>, EmbedError> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.is_file() {
        return candle_core::safetensors::load(&safetensors, device)
            .map_err(load_error(format!("failed to read {}", safetensors.display())));
    }

    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.is_file() {
        let tensors = candle_core::pickle::read_all(&pickle)
            .map_err(load_error(format!("failed to read {}", pickle.display())))?;
        return tensors
            .into_iter()
            .map(|(name, tensor)| {
                tensor
                    .to_device(device)
                    .map(|tensor| (name, tensor))
                    .map_err(load_error("failed to move weights to device"))
            })
            .collect();
    }

    Err(EmbedError::Initialization(format!(
        "no model.safetensors or pytorch_model.bin in {}",
        model_dir.display()
    )))
}

fn load_error<E: Display>(context: impl Display) -> impl FnOnce(E) -> EmbedError {
    move |e| EmbedError::Initialization(format!("{context}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_names() {
        assert_eq!("CPU".parse::<DeviceKind>().unwrap(), DeviceKind::Cpu);
        assert_eq!("mps".parse::<DeviceKind>().unwrap(), DeviceKind::Metal);
        assert_eq!("cuda".parse::<DeviceKind>().unwrap(), DeviceKind::Cuda);
        assert!("tpu".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn missing_tokenizer_is_an_initialization_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        let err = LoadedModel::load(dir.path(), DeviceKind::Cpu, 512)
            .err()
            .unwrap();
        assert!(matches!(err, EmbedError::Initialization(msg) if msg.contains("tokenizer")));
    }
}
