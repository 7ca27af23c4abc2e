use embedkit_core::{ClientStatus, EmbedError, EmbeddingClient, ModelDescriptor, ProviderKind};
use embedkit_local::{DeviceKind, LocalTransformerConfig, LocalTransformerEmbeddings};
use embedkit_models::ClientSpec;

fn descriptor() -> ModelDescriptor {
    ModelDescriptor::new("bge-small-zh", ProviderKind::LocalTransformer, 512)
        .with_model_path("BAAI/bge-small-zh-v1.5")
}

#[tokio::test]
async fn uncached_model_fails_to_initialize() {
    let cache = tempfile::tempdir().unwrap();
    let spec = ClientSpec::new(descriptor())
        .with_config_value("cache_dir", cache.path().to_string_lossy().to_string());
    let client = LocalTransformerEmbeddings::new(spec);

    let err = client.initialize().await.unwrap_err();
    assert!(matches!(
        &err,
        EmbedError::Initialization(msg) if msg.contains("BAAI/bge-small-zh-v1.5")
    ));
    assert_eq!(client.status(), ClientStatus::Uninitialized);

    let err = client.embed_one("hello").await.unwrap_err();
    assert!(matches!(err, EmbedError::Initialization(_)));
}

#[tokio::test]
async fn empty_batch_does_not_load_weights() {
    let cache = tempfile::tempdir().unwrap();
    let spec = ClientSpec::new(descriptor())
        .with_config_value("cache_dir", cache.path().to_string_lossy().to_string());
    let client = LocalTransformerEmbeddings::new(spec);

    assert!(client.embed_batch(&[]).await.unwrap().is_empty());
    assert_eq!(client.status(), ClientStatus::Uninitialized);
}

#[tokio::test]
async fn incomplete_snapshot_reports_the_missing_file() {
    let cache = tempfile::tempdir().unwrap();
    let snapshot = cache
        .path()
        .join("models--BAAI--bge-small-zh-v1.5")
        .join("snapshots")
        .join("main");
    std::fs::create_dir_all(&snapshot).unwrap();
    std::fs::write(snapshot.join("config.json"), "{}").unwrap();

    let spec = ClientSpec::new(descriptor())
        .with_config_value("cache_dir", cache.path().to_string_lossy().to_string());
    let client = LocalTransformerEmbeddings::new(spec);

    let err = client.initialize().await.unwrap_err();
    assert!(matches!(&err, EmbedError::Initialization(msg) if msg.contains("tokenizer")));
    assert_eq!(client.status(), ClientStatus::Uninitialized);
    client.close().await.unwrap();
}

#[test]
fn config_resolves_cached_snapshot_and_device() {
    let cache = tempfile::tempdir().unwrap();
    let snapshot = cache
        .path()
        .join("models--BAAI--bge-small-zh-v1.5")
        .join("snapshots")
        .join("abc");
    std::fs::create_dir_all(&snapshot).unwrap();
    std::fs::write(snapshot.join("config.json"), "{}").unwrap();

    let spec = ClientSpec::new(descriptor().with_max_input_tokens(256))
        .with_config_value("cache_dir", cache.path().to_string_lossy().to_string())
        .with_config_value("device", "metal");
    let config = LocalTransformerConfig::from_spec(&spec).unwrap();
    assert_eq!(config.model_dir, snapshot);
    assert_eq!(config.device, DeviceKind::Metal);
    assert_eq!(config.max_tokens, 256);

    let spec = ClientSpec::new(descriptor())
        .with_config_value("cache_dir", cache.path().to_string_lossy().to_string())
        .with_config_value("device", "abacus");
    assert!(matches!(
        LocalTransformerConfig::from_spec(&spec),
        Err(EmbedError::Initialization(_))
    ));
}
