use std::sync::Arc;

use embedkit::core::{NoLocalCache, StaticCredentials};
use embedkit::{
    BlockingClient, ClientStatus, ConfigMap, EmbedError, EmbeddingClient, EmbeddingHub, HubConfig,
    ModelDescriptor, ModelOrder, ProviderKind,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn config(credentials: StaticCredentials) -> HubConfig {
    HubConfig::new()
        .with_credentials(Arc::new(credentials))
        .with_cache(Arc::new(NoLocalCache))
}

#[test]
fn blocking_mock_client_from_a_persisted_registry() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model_registry.json");

    let hub =
        EmbeddingHub::new(config(StaticCredentials::new()).with_registry_path(&path)).unwrap();
    hub.register_descriptor(
        ModelDescriptor::new("mock-tiny", ProviderKind::Mock, 16)
            .with_display_name("Mock Tiny (16d)")
            .with_model_path("mock"),
    )
    .unwrap();
    assert!(path.is_file());

    let reopened =
        EmbeddingHub::new(config(StaticCredentials::new()).with_registry_path(&path)).unwrap();
    let async_client = reopened.client("mock-tiny", &ConfigMap::new()).unwrap();
    let client = BlockingClient::new(async_client).unwrap();
    assert_eq!(client.status(), ClientStatus::Uninitialized);
    client.initialize().unwrap();
    assert_eq!(client.status(), ClientStatus::Ready);

    let one = client.embed_one("blocking").unwrap();
    let batch = client.embed_batch(&["blocking", "calls"]).unwrap();
    assert_eq!(one.len(), 16);
    assert_eq!(batch[0], one);
    client.close().unwrap();
    assert_eq!(client.status(), ClientStatus::Uninitialized);
}

#[tokio::test]
async fn listing_respects_credentials() {
    init_tracing();
    let without = EmbeddingHub::new(config(StaticCredentials::new())).unwrap();
    let with = EmbeddingHub::new(config(
        StaticCredentials::new()
            .with("OPENAI_API_KEY", "sk-test")
            .with("COHERE_API_KEY", "co-test"),
    ))
    .unwrap();

    let names = |hub: &EmbeddingHub| -> Vec<String> {
        hub.list_models(true).into_iter().map(|m| m.name).collect()
    };
    assert!(!names(&without).contains(&"text-embedding-3-small".to_string()));
    assert!(names(&with).contains(&"text-embedding-3-small".to_string()));
    assert!(names(&with).contains(&"embed-english-v3.0".to_string()));
    assert!(names(&without).contains(&"mock-large".to_string()));

    let by_dimension = with.catalog().list_models_ordered(true, ModelOrder::Dimension);
    assert!(by_dimension
        .windows(2)
        .all(|pair| pair[0].dimension <= pair[1].dimension));
}

#[tokio::test]
async fn mock_large_is_1536_dimensional() {
    let hub = EmbeddingHub::new(config(StaticCredentials::new())).unwrap();
    let client = hub.client("mock-large", &ConfigMap::new()).unwrap();
    let vectors = client.embed_batch(&["a", "b", "c"]).await.unwrap();
    assert_eq!(vectors.len(), 3);
    assert!(vectors.iter().all(|v| v.len() == 1536));
    assert!(vectors.iter().flatten().all(|x| (-1.0..1.0).contains(x)));
}

#[tokio::test]
async fn missing_key_is_reported_before_any_call() {
    let hub = EmbeddingHub::new(config(StaticCredentials::new())).unwrap();
    let err = hub
        .client("embed-multilingual-v3.0", &ConfigMap::new())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        EmbedError::ModelUnavailable { ref credential_key, .. }
            if credential_key.as_deref() == Some("COHERE_API_KEY")
    ));
}
