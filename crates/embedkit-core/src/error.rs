use thiserror::Error;

/// Unified error type for every embedkit crate.
///
/// `Transport`, `Api` and `Timeout` describe a single failed provider call.
/// They are produced inside the retry loop and reach callers wrapped in
/// [`EmbedError::ProviderCallFailed`].
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("unknown embedding model: {0}")]
    UnknownModel(String),
    #[error("unknown provider kind: {0}")]
    UnknownProvider(String),
    #[error("{}", unavailable_message(.model, .credential_key.as_deref()))]
    ModelUnavailable {
        model: String,
        /// Environment key the caller has to set, when the model needs one.
        credential_key: Option<String>,
    },
    #[error("initialization error: {0}")]
    Initialization(String),
    #[error("{provider} call failed after {attempts} attempt(s): {source}")]
    ProviderCallFailed {
        provider: String,
        attempts: usize,
        #[source]
        source: Box<EmbedError>,
    },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("registry persistence error: {0}")]
    Persistence(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("timeout: {0}")]
    Timeout(String),
}

impl EmbedError {
    /// The failure underneath a `ProviderCallFailed`, or `self` otherwise.
    pub fn root_cause(&self) -> &EmbedError {
        match self {
            EmbedError::ProviderCallFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn unavailable_message(model: &str, credential_key: Option<&str>) -> String {
    match credential_key {
        Some(key) => format!("model {model} requires a credential: missing credential, set {key}"),
        None => format!("model {model} is not available"),
    }
}
