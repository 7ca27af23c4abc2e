use embedkit_core::{ClientStatus, EmbeddingClient, ModelDescriptor, ProviderKind};
use embedkit_embeddings::MockEmbeddings;
use embedkit_models::{BlockingClient, ClientSpec};

fn mock_small() -> MockEmbeddings {
    let descriptor = ModelDescriptor::new("mock-small", ProviderKind::Mock, 384);
    MockEmbeddings::new(ClientSpec::new(descriptor))
}

#[tokio::test]
async fn same_text_same_vector() {
    let client = mock_small();
    let a = client.embed_one("hello").await.unwrap();
    let b = client.embed_one("hello").await.unwrap();
    let c = client.embed_one("world").await.unwrap();

    assert_eq!(a.len(), 384);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.iter().all(|v| (-1.0..1.0).contains(v)));
}

#[tokio::test]
async fn batch_matches_single_calls() {
    let client = mock_small();
    let batch = client.embed_batch(&["a", "b", "c"]).await.unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0], client.embed_one("a").await.unwrap());
    assert_eq!(batch[1], client.embed_one("b").await.unwrap());
    assert_eq!(batch[2], client.embed_one("c").await.unwrap());
}

#[tokio::test]
async fn empty_batch_is_empty() {
    let client = mock_small();
    assert!(client.embed_batch(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn separate_clients_agree() {
    let a = mock_small().embed_one("shared").await.unwrap();
    let b = MockEmbeddings::with_dimension(384)
        .embed_one("shared")
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn lifecycle_follows_initialize_and_close() {
    let client = mock_small();
    assert_eq!(client.status(), ClientStatus::Uninitialized);
    client.embed_one("x").await.unwrap();
    assert_eq!(client.status(), ClientStatus::Ready);
    client.close().await.unwrap();
    assert_eq!(client.status(), ClientStatus::Uninitialized);
}

#[test]
fn blocking_surface() {
    let client = BlockingClient::new(Box::new(mock_small())).unwrap();
    client.initialize().unwrap();
    let one = client.embed_one("hello").unwrap();
    let batch = client.embed_batch(&["hello"]).unwrap();
    assert_eq!(one.len(), 384);
    assert_eq!(batch, vec![one]);
    client.close().unwrap();
}
