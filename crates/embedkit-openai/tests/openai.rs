use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use embedkit_core::{
    ClientStatus, EmbedError, EmbeddingClient, ModelDescriptor, ProviderKind, StaticCredentials,
};
use embedkit_models::{ClientSpec, FakeBackend, ProviderResponse};
use embedkit_openai::{OpenAiEmbeddings, SiliconCloudEmbeddings};
use serde_json::json;

fn spec(
    kind: ProviderKind,
    model_path: &str,
    dimension: usize,
    backend: &Arc<FakeBackend>,
) -> ClientSpec {
    let descriptor = ModelDescriptor::new(model_path, kind, dimension);
    let credentials = StaticCredentials::new()
        .with("OPENAI_API_KEY", "sk-openai")
        .with("NVIDIA_API_KEY", "nvapi-test")
        .with("ZHIPUAI_API_KEY", "zhipu-key")
        .with("SILICONCLOUD_API_KEY", "sc-key");
    ClientSpec::new(descriptor)
        .with_backend(backend.clone())
        .with_credentials(Arc::new(credentials))
        .with_config_value("retry_base_delay_ms", 1)
        .with_config_value("retry_max_delay_ms", 2)
}

fn openai_small(dimension: usize, backend: &Arc<FakeBackend>) -> OpenAiEmbeddings {
    OpenAiEmbeddings::openai(spec(
        ProviderKind::ApiOpenAi,
        "text-embedding-3-small",
        dimension,
        backend,
    ))
}

#[tokio::test]
async fn openai_embed_batch_sorts_by_index() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({
        "data": [
            {"embedding": [0.3, 0.4], "index": 1},
            {"embedding": [0.1, 0.2], "index": 0}
        ],
        "usage": {"prompt_tokens": 2, "total_tokens": 2}
    }));

    let client = openai_small(2, &backend);
    let vectors = client.embed_batch(&["hello", "world"]).await.unwrap();
    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);

    let request = &backend.requests()[0];
    assert_eq!(request.url, "https://api.openai.com/v1/embeddings");
    assert_eq!(request.header("Authorization"), Some("Bearer sk-openai"));
    assert_eq!(request.body["model"], "text-embedding-3-small");
    assert_eq!(request.body["input"], json!(["hello", "world"]));
    assert_eq!(request.body["encoding_format"], "float");
}

#[tokio::test]
async fn openai_embed_one_is_batch_of_one() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"data": [{"embedding": [0.5, 0.5, 0.5], "index": 0}]}));

    let client = openai_small(3, &backend);
    let vector = client.embed_one("hi").await.unwrap();
    assert_eq!(vector, vec![0.5, 0.5, 0.5]);
    assert_eq!(backend.requests()[0].body["input"], json!(["hi"]));
}

#[tokio::test]
async fn empty_batch_skips_transport() {
    let backend = Arc::new(FakeBackend::new());
    let client = openai_small(3, &backend);
    assert!(client.embed_batch(&[]).await.unwrap().is_empty());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn missing_key_fails_initialization() {
    let backend = Arc::new(FakeBackend::new());
    let client = OpenAiEmbeddings::openai(
        spec(ProviderKind::ApiOpenAi, "text-embedding-3-small", 3, &backend)
            .with_credentials(Arc::new(StaticCredentials::new())),
    );
    let err = client.initialize().await.unwrap_err();
    assert!(matches!(err, EmbedError::Initialization(_)));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
    assert_eq!(client.status(), ClientStatus::Uninitialized);
}

#[tokio::test]
async fn api_error_retried_then_reported() {
    let backend = Arc::new(FakeBackend::new());
    for _ in 0..3 {
        backend.push_response(ProviderResponse {
            status: 429,
            body: json!({"error": {"message": "rate limited"}}),
        });
    }

    let client = openai_small(3, &backend);
    let err = client.embed_one("hello").await.unwrap_err();
    assert!(matches!(err, EmbedError::ProviderCallFailed { attempts: 3, .. }));
    assert!(err.to_string().contains("429"));
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn wrong_dimension_is_malformed() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"data": [{"embedding": [0.1, 0.2], "index": 0}]}));

    let client = openai_small(3, &backend);
    let err = client.embed_one("hello").await.unwrap_err();
    assert!(matches!(err, EmbedError::MalformedResponse(_)));
    // parsing happens once, outside the retry loop
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn dimensions_override_is_sent_and_checked() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"data": [{"embedding": [0.1, 0.2], "index": 0}]}));

    let client = OpenAiEmbeddings::openai(
        spec(ProviderKind::ApiOpenAi, "text-embedding-3-large", 3072, &backend)
            .with_config_value("dimensions", 2),
    );
    assert_eq!(client.dimension(), 2);
    client.embed_one("hello").await.unwrap();
    assert_eq!(backend.requests()[0].body["dimensions"], 2);
}

#[tokio::test]
async fn nvidia_adds_input_type_and_truncate() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"data": [{"embedding": [1.0, 0.0], "index": 0}]}));
    backend.push_json(json!({"data": [{"embedding": [0.0, 1.0], "index": 0}]}));

    let client = OpenAiEmbeddings::nvidia(spec(
        ProviderKind::ApiNvidia,
        "nvidia/nv-embedqa-e5-v5",
        2,
        &backend,
    ));
    client.embed_one("passage text").await.unwrap();
    let query = client.embed_query("what is rust").await.unwrap();
    assert_eq!(query, vec![0.0, 1.0]);

    let requests = backend.requests();
    assert_eq!(requests[0].url, "https://integrate.api.nvidia.com/v1/embeddings");
    assert_eq!(requests[0].header("Authorization"), Some("Bearer nvapi-test"));
    assert_eq!(requests[0].body["input_type"], "passage");
    assert_eq!(requests[0].body["truncate"], "NONE");
    assert_eq!(requests[1].body["input_type"], "query");
}

#[tokio::test]
async fn zhipu_uses_its_endpoint_and_key() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"data": [{"embedding": [0.1, 0.2], "index": 0}]}));

    let client = OpenAiEmbeddings::zhipu(spec(ProviderKind::ApiZhipu, "embedding-2", 2, &backend));
    client.embed_one("你好").await.unwrap();

    let request = &backend.requests()[0];
    assert_eq!(request.url, "https://open.bigmodel.cn/api/paas/v4/embeddings");
    assert_eq!(request.header("Authorization"), Some("Bearer zhipu-key"));
    assert!(request.body.get("input_type").is_none());
}

fn encode(values: &[f32]) -> String {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

#[tokio::test]
async fn siliconcloud_decodes_base64_and_truncates() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"data": [{"embedding": encode(&[0.25, -0.5]), "index": 0}]}));

    let client = SiliconCloudEmbeddings::new(
        spec(ProviderKind::ApiSiliconCloud, "BAAI/bge-m3", 2, &backend)
            .with_config_value("max_token_size", 4),
    );
    let vector = client.embed_one("abcdefgh").await.unwrap();
    assert_eq!(vector, vec![0.25, -0.5]);

    let request = &backend.requests()[0];
    assert_eq!(request.url, "https://api.siliconflow.cn/v1/embeddings");
    assert_eq!(request.header("Authorization"), Some("Bearer sc-key"));
    assert_eq!(request.body["input"], json!(["abcd"]));
    assert_eq!(request.body["encoding_format"], "base64");
}

#[tokio::test]
async fn siliconcloud_error_code_counts_as_failure() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"code": 20015, "message": "model does not exist"}));
    backend.push_json(json!({"data": [{"embedding": encode(&[1.0, 2.0])}]}));

    let client = SiliconCloudEmbeddings::new(spec(
        ProviderKind::ApiSiliconCloud,
        "BAAI/bge-m3",
        2,
        &backend,
    ));
    let vector = client.embed_one("hello").await.unwrap();
    assert_eq!(vector, vec![1.0, 2.0]);
    assert_eq!(backend.call_count(), 2);
}
