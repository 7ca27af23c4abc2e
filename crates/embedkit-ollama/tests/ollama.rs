use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use embedkit_core::{
    EmbedError, EmbeddingClient, ModelDescriptor, ProviderKind, StaticCredentials,
};
use embedkit_models::{ClientSpec, FakeBackend, ProviderBackend, ProviderRequest, ProviderResponse};
use embedkit_ollama::{LollmsEmbeddings, OllamaEmbeddings};
use serde_json::json;

/// Answers later prompts sooner: the reply to prompt `n` of `order` is
/// delayed by `(len - n) * 20ms`. Each reply encodes its prompt's position.
struct ReversedBackend {
    order: Vec<&'static str>,
    finished: Mutex<Vec<String>>,
}

#[async_trait]
impl ProviderBackend for ReversedBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, EmbedError> {
        let prompt = request.body["prompt"].as_str().unwrap_or_default().to_string();
        let position = self.order.iter().position(|p| *p == prompt).unwrap();
        let delay = (self.order.len() - position) as u64 * 20;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.finished.lock().unwrap().push(prompt);
        Ok(ProviderResponse::ok(json!({"embedding": [position as f32, 1.0]})))
    }
}

fn spec(descriptor: ModelDescriptor, backend: &Arc<FakeBackend>) -> ClientSpec {
    ClientSpec::new(descriptor)
        .with_backend(backend.clone())
        .with_credentials(Arc::new(StaticCredentials::new()))
        .with_config_value("retry_base_delay_ms", 1)
        .with_config_value("retry_max_delay_ms", 1)
}

#[tokio::test]
async fn ollama_one_request_per_text_in_order() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"embedding": [1.0, 0.0]}));
    backend.push_json(json!({"embedding": [0.0, 1.0]}));
    backend.push_json(json!({"embedding": [0.5, 0.5]}));

    let descriptor = ModelDescriptor::new("nomic-embed-text", ProviderKind::LocalOllama, 2);
    let client = OllamaEmbeddings::new(spec(descriptor, &backend));
    let vectors = client.embed_batch(&["a", "b", "c"]).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);

    let requests = backend.requests();
    assert_eq!(requests.len(), 3);
    let prompts: Vec<_> = requests.iter().map(|r| r.body["prompt"].clone()).collect();
    assert_eq!(prompts, vec![json!("a"), json!("b"), json!("c")]);
    assert_eq!(requests[0].url, "http://localhost:11434/api/embeddings");
    assert_eq!(requests[0].body["model"], "nomic-embed-text");
    assert_eq!(requests[0].header("Authorization"), None);
}

#[tokio::test]
async fn ollama_keeps_input_order_when_replies_finish_out_of_order() {
    let backend = Arc::new(ReversedBackend {
        order: vec!["a", "b", "c", "d"],
        finished: Mutex::new(Vec::new()),
    });
    let descriptor = ModelDescriptor::new("nomic-embed-text", ProviderKind::LocalOllama, 2);
    let client = OllamaEmbeddings::new(
        ClientSpec::new(descriptor)
            .with_backend(backend.clone())
            .with_credentials(Arc::new(StaticCredentials::new())),
    );

    let vectors = client.embed_batch(&["a", "b", "c", "d"]).await.unwrap();
    assert_eq!(*backend.finished.lock().unwrap(), vec!["d", "c", "b", "a"]);
    assert_eq!(
        vectors,
        vec![vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, 1.0], vec![3.0, 1.0]]
    );
}

#[tokio::test]
async fn ollama_swaps_chat_models_for_nomic() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"embedding": [1.0, 0.0]}));

    let descriptor = ModelDescriptor::new("llama3", ProviderKind::LocalOllama, 2)
        .with_config_value("base_url", "http://gpu-box:11434/");
    let client = OllamaEmbeddings::new(spec(descriptor, &backend));
    client.embed_one("hi").await.unwrap();

    let request = &backend.requests()[0];
    assert_eq!(request.url, "http://gpu-box:11434/api/embeddings");
    assert_eq!(request.body["model"], "nomic-embed-text");
}

#[tokio::test]
async fn ollama_bearer_from_environment_key() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"embedding": [1.0, 0.0]}));

    let descriptor = ModelDescriptor::new("nomic-embed-text", ProviderKind::LocalOllama, 2);
    let client = OllamaEmbeddings::new(
        spec(descriptor, &backend)
            .with_credentials(Arc::new(
                StaticCredentials::new().with("OLLAMA_API_KEY", "ol-key"),
            )),
    );
    client.embed_one("hi").await.unwrap();
    assert_eq!(backend.requests()[0].header("Authorization"), Some("Bearer ol-key"));
}

#[tokio::test]
async fn ollama_failure_in_one_item_fails_batch() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"embedding": [1.0, 0.0]}));
    for _ in 0..3 {
        backend.push_response(ProviderResponse {
            status: 500,
            body: json!({"error": "model not found"}),
        });
    }

    let descriptor = ModelDescriptor::new("nomic-embed-text", ProviderKind::LocalOllama, 2);
    let client = OllamaEmbeddings::new(spec(descriptor, &backend));
    let err = client.embed_batch(&["a", "b"]).await.unwrap_err();
    assert!(matches!(err, EmbedError::ProviderCallFailed { .. }));
}

#[tokio::test]
async fn lollms_reads_vector_field() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"vector": [0.1, 0.2, 0.3]}));
    backend.push_json(json!({"vector": [0.4, 0.5, 0.6]}));

    let descriptor = ModelDescriptor::new("lollms-embedding", ProviderKind::ApiLollms, 3);
    let client = LollmsEmbeddings::new(
        spec(descriptor, &backend)
            .with_credentials(Arc::new(StaticCredentials::new().with("LOLLMS_API_KEY", "lk"))),
    );
    let vectors = client.embed_batch(&["x", "y"]).await.unwrap();
    assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);

    let requests = backend.requests();
    assert_eq!(requests[0].url, "http://localhost:9600/lollms_embed");
    assert_eq!(requests[0].body, json!({"text": "x"}));
    assert_eq!(requests[0].header("Authorization"), Some("lk"));
}

#[tokio::test]
async fn lollms_missing_vector_is_malformed() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_json(json!({"status": "ok"}));

    let descriptor = ModelDescriptor::new("lollms-embedding", ProviderKind::ApiLollms, 3);
    let client = LollmsEmbeddings::new(spec(descriptor, &backend));
    let err = client.embed_one("x").await.unwrap_err();
    assert!(matches!(err, EmbedError::MalformedResponse(_)));
}
