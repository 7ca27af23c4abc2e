use std::sync::Arc;

use embedkit_core::{
    ClientStatus, ConfigMap, EmbedError, EmbeddingClient, ModelDescriptor, NoLocalCache,
    ProviderKind, StaticCredentials,
};
use embedkit_embeddings::{mock_vector, MockEmbeddings};
use embedkit_models::FakeBackend;
use embedkit_registry::{
    CatalogConfig, EmbeddingHub, HubConfig, ModelCatalog, ProviderDispatcher,
};
use serde_json::json;

fn hub(credentials: StaticCredentials, backend: &Arc<FakeBackend>) -> EmbeddingHub {
    EmbeddingHub::new(
        HubConfig::new()
            .with_credentials(Arc::new(credentials))
            .with_cache(Arc::new(NoLocalCache))
            .with_backend(backend.clone())
            .with_default_override("retry_base_delay_ms", 1)
            .with_default_override("retry_max_delay_ms", 1),
    )
    .unwrap()
}

#[tokio::test]
async fn mock_small_end_to_end() {
    let backend = Arc::new(FakeBackend::new());
    let hub = hub(StaticCredentials::new(), &backend);

    let client = hub.client("mock-small", &ConfigMap::new()).unwrap();
    assert_eq!(client.dimension(), 384);
    assert_eq!(client.status(), ClientStatus::Uninitialized);

    let first = client.embed_one("hello").await.unwrap();
    let second = client.embed_one("hello").await.unwrap();
    assert_eq!(first.len(), 384);
    assert_eq!(first, second);
    assert_eq!(first, mock_vector("hello", 384));
    assert_eq!(client.status(), ClientStatus::Ready);

    let batch = client.embed_batch(&["hello", "world"]).await.unwrap();
    assert_eq!(batch[0], first);
    assert_eq!(batch[1], client.embed_one("world").await.unwrap());
    assert_eq!(backend.call_count(), 0);

    client.close().await.unwrap();
    assert_eq!(client.status(), ClientStatus::Uninitialized);
}

#[test]
fn unknown_model_from_hub() {
    let backend = Arc::new(FakeBackend::new());
    let hub = hub(StaticCredentials::new(), &backend);
    assert!(matches!(
        hub.client("no-such-model", &ConfigMap::new()),
        Err(EmbedError::UnknownModel(_))
    ));
}

#[test]
fn unavailable_model_names_the_missing_key() {
    let backend = Arc::new(FakeBackend::new());
    let hub = hub(StaticCredentials::new(), &backend);

    let err = hub
        .client("text-embedding-3-small", &ConfigMap::new())
        .err()
        .unwrap();
    match &err {
        EmbedError::ModelUnavailable {
            model,
            credential_key,
        } => {
            assert_eq!(model, "text-embedding-3-small");
            assert_eq!(credential_key.as_deref(), Some("OPENAI_API_KEY"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("set OPENAI_API_KEY"));
}

#[test]
fn missing_constructor_is_unknown_provider() {
    let catalog = ModelCatalog::load(
        CatalogConfig::new()
            .with_credentials(Arc::new(StaticCredentials::new()))
            .with_cache(Arc::new(NoLocalCache)),
    );
    let dispatcher = ProviderDispatcher::new();
    let descriptor = catalog.resolve("mock-small").unwrap();

    let err = dispatcher
        .instantiate(&descriptor, &ConfigMap::new())
        .err()
        .unwrap();
    assert!(matches!(err, EmbedError::UnknownProvider(kind) if kind == "mock"));
}

#[test]
fn unknown_provider_is_reported_before_unavailability() {
    let catalog = ModelCatalog::load(
        CatalogConfig::new()
            .with_credentials(Arc::new(StaticCredentials::new()))
            .with_cache(Arc::new(NoLocalCache)),
    );
    let descriptor = catalog.resolve("embed-english-v3.0").unwrap();
    assert!(!descriptor.is_available());

    let err = ProviderDispatcher::new()
        .instantiate(&descriptor, &ConfigMap::new())
        .err()
        .unwrap();
    assert!(matches!(err, EmbedError::UnknownProvider(_)));
}

#[tokio::test]
async fn custom_providers_can_be_registered() {
    let catalog = Arc::new(ModelCatalog::load(
        CatalogConfig::new()
            .with_credentials(Arc::new(StaticCredentials::new()))
            .with_cache(Arc::new(NoLocalCache)),
    ));
    catalog
        .register_descriptor(
            ModelDescriptor::new("in-house", ProviderKind::ApiLollms, 4)
                .with_requires_credential(false),
        )
        .unwrap();

    let mut dispatcher = ProviderDispatcher::new();
    dispatcher.register(ProviderKind::ApiLollms, |spec| {
        Ok(Box::new(MockEmbeddings::new(spec)))
    });
    let hub = EmbeddingHub::from_parts(catalog, dispatcher);

    let client = hub.client("in-house", &ConfigMap::new()).unwrap();
    assert_eq!(client.embed_one("x").await.unwrap(), mock_vector("x", 4));
}

#[cfg(feature = "openai")]
#[tokio::test]
async fn overrides_layer_over_hub_defaults_and_descriptor_config() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({
        "data": [{"index": 0, "embedding": vec![0.5f32; 1536]}]
    }));
    let hub = hub(
        StaticCredentials::new().with("OPENAI_API_KEY", "sk-env"),
        &backend,
    );

    let mut overrides = ConfigMap::new();
    overrides.insert("base_url".into(), json!("https://proxy.example/v1"));
    overrides.insert("api_key".into(), json!("sk-override"));
    let client = hub.client("text-embedding-3-small", &overrides).unwrap();

    let vector = client.embed_one("hello").await.unwrap();
    assert_eq!(vector.len(), 1536);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://proxy.example/v1/embeddings");
    assert_eq!(requests[0].header("Authorization"), Some("Bearer sk-override"));
    assert_eq!(requests[0].body["model"], "text-embedding-3-small");
}

#[cfg(feature = "openai")]
#[tokio::test]
async fn retries_reach_the_caller_as_provider_call_failed() {
    let backend = Arc::new(FakeBackend::new());
    for _ in 0..4 {
        backend.push_response(embedkit_models::ProviderResponse {
            status: 500,
            body: json!({"error": "overloaded"}),
        });
    }
    let hub = hub(
        StaticCredentials::new().with("OPENAI_API_KEY", "sk-env"),
        &backend,
    );
    let client = hub.client("text-embedding-ada-002", &ConfigMap::new()).unwrap();

    let err = client.embed_batch(&["a", "b"]).await.unwrap_err();
    assert!(matches!(
        err,
        EmbedError::ProviderCallFailed { attempts: 3, .. }
    ));
    assert_eq!(backend.call_count(), 3);
}
