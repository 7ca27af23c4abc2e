//! Plumbing shared by the provider adapters: the [`ProviderBackend`]
//! transport seam, [`RetryPolicy`], the client [`Lifecycle`] and the
//! [`ClientSpec`] handed to provider constructors.

mod backend;
mod blocking;
mod client_spec;
mod lifecycle;
mod retry;

pub use backend::{FakeBackend, HttpBackend, ProviderBackend, ProviderRequest, ProviderResponse};
pub use blocking::BlockingClient;
pub use client_spec::ClientSpec;
pub use lifecycle::Lifecycle;
pub use retry::{call_with_retry, send_json, send_with_retry, RetryPolicy};
