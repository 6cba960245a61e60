use docstore_core::config::{EmbeddingSettings, ProviderKind, Settings};
use docstore_core::{EmbeddingProvider, Error};
use docstore_embed::{get_default_embedder, HashEmbedder, OllamaEmbedder};
use mockito::Matcher;
use serde_json::json;

fn ollama_settings(base_url: String) -> EmbeddingSettings {
    EmbeddingSettings {
        provider: ProviderKind::Ollama,
        model: "nomic-embed-text".into(),
        base_url,
        timeout_secs: Some(5),
    }
}

#[tokio::test]
async fn hash_embeddings_are_normalized_and_deterministic() {
    let embedder = HashEmbedder::new(64);
    let texts = vec!["hello world".to_string(), "hello world".to_string(), "other words".to_string()];
    let vectors = embedder.embed_documents(&texts).await.expect("embed");
    assert_eq!(vectors.len(), 3);
    assert_eq!(vectors[0].len(), 64);
    let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "norm={norm}");
    assert_eq!(vectors[0], vectors[1]);
    assert_ne!(vectors[0], vectors[2]);
    assert_eq!(embedder.embed_query("hello world").await.expect("query"), vectors[0]);
}

#[tokio::test]
async fn hash_query_rejects_blank_text() {
    let err = HashEmbedder::new(8).embed_query("  ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn factory_honours_the_configured_provider() {
    let mut settings = Settings::default();
    settings.embedding.provider = ProviderKind::Hash;
    settings.vector.dimension = 32;
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 32);
    assert!(embedder.provider_id().starts_with("hash:"));
}

#[tokio::test]
async fn ollama_posts_the_batch_and_returns_vectors() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/embed")
        .match_body(Matcher::Json(json!({"model": "nomic-embed-text", "input": ["a", "b"]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2],[0.3,0.4]]}"#)
        .create_async()
        .await;

    let embedder = OllamaEmbedder::new(&ollama_settings(server.url()), 2).expect("client");
    let vectors = embedder.embed_documents(&["a".to_string(), "b".to_string()]).await.expect("embed");
    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    mock.assert_async().await;
}

#[tokio::test]
async fn ollama_query_sends_a_single_input() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/embed")
        .match_body(Matcher::Json(json!({"model": "nomic-embed-text", "input": ["hello"]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embeddings":[[1.0,0.0]]}"#)
        .create_async()
        .await;

    let embedder = OllamaEmbedder::new(&ollama_settings(format!("{}/", server.url())), 2).expect("client");
    assert_eq!(embedder.embed_query("hello").await.expect("embed"), vec![1.0, 0.0]);
    mock.assert_async().await;
}

#[tokio::test]
async fn ollama_http_error_is_an_engine_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/embed")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"model not found"}"#)
        .create_async()
        .await;

    let embedder = OllamaEmbedder::new(&ollama_settings(server.url()), 2).expect("client");
    let err = embedder.embed_query("hello").await.unwrap_err();
    assert!(matches!(err, Error::Engine { engine: "ollama", .. }), "{err}");
    assert!(err.to_string().contains("model not found"));
    mock.assert_async().await;
}

#[tokio::test]
async fn ollama_short_response_is_an_engine_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/embed")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embeddings":[[0.5,0.5]]}"#)
        .create_async()
        .await;

    let embedder = OllamaEmbedder::new(&ollama_settings(server.url()), 2).expect("client");
    let err = embedder.embed_documents(&["a".to_string(), "b".to_string()]).await.unwrap_err();
    assert!(matches!(err, Error::Engine { engine: "ollama", .. }), "{err}");
}

#[tokio::test]
async fn unreachable_ollama_is_engine_unavailable() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr")
    };
    let embedder = OllamaEmbedder::new(&ollama_settings(format!("http://{}", addr)), 2).expect("client");
    let err = embedder.embed_documents(&["a".to_string()]).await.unwrap_err();
    assert!(matches!(err, Error::EngineUnavailable { engine: "ollama", .. }), "{err}");
}
