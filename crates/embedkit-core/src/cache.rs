//! Offline inspection of locally cached transformer models.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::EmbedError;

/// Answers whether a model can be loaded without touching the network.
pub trait LocalModelCache: Send + Sync {
    fn is_cached(&self, model_path: &str) -> Result<bool, EmbedError>;
}

/// A cache that never has anything. Useful when local models are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalCache;

impl LocalModelCache for NoLocalCache {
    fn is_cached(&self, _model_path: &str) -> Result<bool, EmbedError> {
        Ok(false)
    }
}

/// The HuggingFace hub cache layout:
/// `<root>/models--{org}--{name}/snapshots/{revision}/config.json`.
///
/// The root is, in order: an explicit root, `HF_HUB_CACHE`, `$HF_HOME/hub`,
/// `~/.cache/huggingface/hub`. A `model_path` that is itself a directory
/// holding `config.json` also counts as cached.
#[derive(Debug, Clone, Default)]
pub struct HfHubCache {
    root: Option<PathBuf>,
}

impl HfHubCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// The hub cache directory in use, if one could be determined.
    pub fn root(&self) -> Option<PathBuf> {
        if let Some(root) = &self.root {
            return Some(root.clone());
        }
        if let Some(dir) = non_empty_env("HF_HUB_CACHE") {
            return Some(PathBuf::from(dir));
        }
        if let Some(home) = non_empty_env("HF_HOME") {
            return Some(PathBuf::from(home).join("hub"));
        }
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".cache").join("huggingface").join("hub"))
    }

    /// Directory holding the model files for `model_path`, or `None` if the
    /// model is not present.
    pub fn resolve(&self, model_path: &str) -> Result<Option<PathBuf>, EmbedError> {
        let direct = Path::new(model_path);
        if direct.join("config.json").is_file() {
            return Ok(Some(direct.to_path_buf()));
        }

        let Some(root) = self.root() else {
            return Ok(None);
        };
        let repo = root.join(format!("models--{}", model_path.replace('/', "--")));

        if let Ok(revision) = std::fs::read_to_string(repo.join("refs").join("main")) {
            let snapshot = repo.join("snapshots").join(revision.trim());
            if snapshot.join("config.json").is_file() {
                return Ok(Some(snapshot));
            }
        }

        let entries = match std::fs::read_dir(repo.join("snapshots")) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EmbedError::Initialization(format!(
                    "cannot read model cache for {model_path}: {e}"
                )))
            }
        };

        let mut snapshots: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.join("config.json").is_file())
            .collect();
        snapshots.sort();
        Ok(snapshots.pop())
    }
}

impl LocalModelCache for HfHubCache {
    fn is_cached(&self, model_path: &str) -> Result<bool, EmbedError> {
        self.resolve(model_path).map(|dir| dir.is_some())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
