use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use embedkit_core::{
    probe, CredentialSource, EmbedError, EnvCredentials, HfHubCache, LocalModelCache,
    ModelDescriptor, ModelSummary,
};

use crate::document::RegistryDocument;

/// Sort order for [`ModelCatalog::list_models_ordered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelOrder {
    /// Registry order: load order, then registration order.
    #[default]
    Insertion,
    Name,
    /// Smallest dimension first, ties broken by name.
    Dimension,
}

/// Where the catalog persists and what the probe consults.
#[derive(Clone)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
    pub credentials: Arc<dyn CredentialSource>,
    pub cache: Arc<dyn LocalModelCache>,
}

impl CatalogConfig {
    /// In-memory catalog probing the process environment and the
    /// HuggingFace hub cache.
    pub fn new() -> Self {
        Self {
            path: None,
            credentials: Arc::new(EnvCredentials),
            cache: Arc::new(HfHubCache::new()),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn LocalModelCache>) -> Self {
        self.cache = cache;
        self
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// The in-memory set of known models, keyed by name.
///
/// Reads and writes are synchronous. Availability is computed on load, on
/// registration and on [`refresh_availability`](Self::refresh_availability).
pub struct ModelCatalog {
    path: Option<PathBuf>,
    credentials: Arc<dyn CredentialSource>,
    cache: Arc<dyn LocalModelCache>,
    models: RwLock<Vec<Arc<ModelDescriptor>>>,
}

impl ModelCatalog {
    /// Load the registry at `config.path`, or the built-in set when there
    /// is no path. A document that is missing, unreadable or invalid is
    /// replaced by the built-in set with a warning; loading never fails.
    pub fn load(config: CatalogConfig) -> Self {
        let document = match &config.path {
            Some(path) => read_valid(path).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "falling back to built-in model registry"
                );
                RegistryDocument::builtin()
            }),
            None => RegistryDocument::builtin(),
        };
        Self::from_document(config, document)
    }

    /// A catalog over `document`, already validated by the caller.
    pub fn from_document(config: CatalogConfig, document: RegistryDocument) -> Self {
        let catalog = Self {
            path: config.path,
            credentials: config.credentials,
            cache: config.cache,
            models: RwLock::new(Vec::with_capacity(document.models.len())),
        };
        {
            let mut models = catalog.write();
            for descriptor in document.models {
                let descriptor = catalog.probed(descriptor);
                upsert(&mut models, descriptor);
            }
        }
        tracing::debug!(models = catalog.len(), "model catalog loaded");
        catalog
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|d| d.name == name)
    }

    /// Summaries in registry order, optionally only the available ones.
    pub fn list_models(&self, available_only: bool) -> Vec<ModelSummary> {
        self.list_models_ordered(available_only, ModelOrder::Insertion)
    }

    pub fn list_models_ordered(
        &self,
        available_only: bool,
        order: ModelOrder,
    ) -> Vec<ModelSummary> {
        let mut summaries: Vec<ModelSummary> = self
            .read()
            .iter()
            .filter(|d| !available_only || d.is_available())
            .map(|d| d.summary())
            .collect();
        match order {
            ModelOrder::Insertion => {}
            ModelOrder::Name => summaries.sort_by(|a, b| a.name.cmp(&b.name)),
            ModelOrder::Dimension => summaries.sort_by(|a, b| {
                a.dimension.cmp(&b.dimension).then_with(|| a.name.cmp(&b.name))
            }),
        }
        summaries
    }

    /// Snapshot of every descriptor in registry order.
    pub fn descriptors(&self) -> Vec<Arc<ModelDescriptor>> {
        self.read().clone()
    }

    pub fn get_descriptor(&self, name: &str) -> Result<Arc<ModelDescriptor>, EmbedError> {
        self.read()
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| EmbedError::UnknownModel(name.to_string()))
    }

    /// Alias of [`get_descriptor`](Self::get_descriptor).
    pub fn resolve(&self, name: &str) -> Result<Arc<ModelDescriptor>, EmbedError> {
        self.get_descriptor(name)
    }

    /// Add `descriptor`, or replace the one with the same name in place, and
    /// persist the registry.
    ///
    /// A persistence failure is returned as [`EmbedError::Persistence`], but
    /// the in-memory change is kept and the next save writes it.
    pub fn register_descriptor(
        &self,
        descriptor: ModelDescriptor,
    ) -> Result<Arc<ModelDescriptor>, EmbedError> {
        descriptor.validate()?;
        let descriptor = self.probed(descriptor);

        let mut models = self.write();
        let replaced = upsert(&mut models, Arc::clone(&descriptor));
        tracing::info!(
            model = %descriptor.name,
            kind = %descriptor.provider_kind,
            replaced,
            available = descriptor.is_available(),
            "registered embedding model"
        );

        if let Some(path) = &self.path {
            document_of(&models).write_atomic(path)?;
            tracing::info!(path = %path.display(), "model registry saved");
        }
        Ok(descriptor)
    }

    /// Persist the full set. Fails when the catalog has no path.
    pub fn save(&self) -> Result<(), EmbedError> {
        let path = self.path.as_ref().ok_or_else(|| {
            EmbedError::Persistence("catalog has no registry path".to_string())
        })?;
        let document = self.to_document();
        document.write_atomic(path)?;
        tracing::info!(
            path = %path.display(),
            models = document.models.len(),
            "model registry saved"
        );
        Ok(())
    }

    /// Re-run the availability probe on every descriptor. Only the computed
    /// availability fields change.
    pub fn refresh_availability(&self) {
        let mut models = self.write();
        for slot in models.iter_mut() {
            let availability = probe(slot, self.credentials.as_ref(), self.cache.as_ref());
            if availability.is_available != slot.is_available()
                || availability.is_cached_locally != slot.is_cached_locally()
            {
                Arc::make_mut(slot)
                    .refresh_availability(self.credentials.as_ref(), self.cache.as_ref());
            }
        }
    }

    /// The persisted form of the current set.
    pub fn to_document(&self) -> RegistryDocument {
        document_of(&self.read())
    }

    fn probed(&self, mut descriptor: ModelDescriptor) -> Arc<ModelDescriptor> {
        descriptor.refresh_availability(self.credentials.as_ref(), self.cache.as_ref());
        Arc::new(descriptor)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<ModelDescriptor>>> {
        self.models.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<ModelDescriptor>>> {
        self.models.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCatalog")
            .field("path", &self.path)
            .field("models", &self.len())
            .finish_non_exhaustive()
    }
}

fn read_valid(path: &Path) -> Result<RegistryDocument, EmbedError> {
    let document = RegistryDocument::read(path)?;
    document.validate()?;
    Ok(document)
}

/// Replace the entry with the same name in place, or append. Returns whether
/// an entry was replaced.
fn upsert(models: &mut Vec<Arc<ModelDescriptor>>, descriptor: Arc<ModelDescriptor>) -> bool {
    match models.iter_mut().find(|d| d.name == descriptor.name) {
        Some(slot) => {
            *slot = descriptor;
            true
        }
        None => {
            models.push(descriptor);
            false
        }
    }
}

/// Persisted form: computed availability is cleared.
fn document_of(models: &[Arc<ModelDescriptor>]) -> RegistryDocument {
    RegistryDocument::new(
        models
            .iter()
            .map(|d| d.without_availability())
            .collect(),
    )
}
