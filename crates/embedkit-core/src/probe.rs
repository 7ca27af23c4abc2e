use crate::cache::LocalModelCache;
use crate::credentials::CredentialSource;
use crate::descriptor::{Availability, ModelDescriptor, ProviderKind};

/// Decide whether `descriptor` can be used right now.
///
/// A descriptor that requires a credential is available only when the
/// credential under its kind's key is set and non-empty; a kind with no key
/// is then never available. Everything else is available. Local transformer
/// models also report whether their weights are cached; cache errors count
/// as not cached.
pub fn probe(
    descriptor: &ModelDescriptor,
    credentials: &dyn CredentialSource,
    cache: &dyn LocalModelCache,
) -> Availability {
    let is_available = if descriptor.requires_credential {
        descriptor
            .provider_kind
            .credential_key()
            .and_then(|key| credentials.credential(key))
            .is_some()
    } else {
        true
    };

    let is_cached_locally = descriptor.provider_kind == ProviderKind::LocalTransformer
        && match cache.is_cached(&descriptor.model_path) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::debug!(model = %descriptor.name, error = %e, "cache check failed");
                false
            }
        };

    Availability {
        is_available,
        is_cached_locally,
    }
}
