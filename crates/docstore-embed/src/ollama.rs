use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docstore_core::config::EmbeddingSettings;
use docstore_core::error::{Error, Result};
use docstore_core::traits::EmbeddingProvider;

const ENGINE: &str = "ollama";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for Ollama's `/api/embed` endpoint. One request per batch.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dim: usize,
    id: String,
}

impl OllamaEmbedder {
    pub fn new(settings: &EmbeddingSettings, dim: usize) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| Error::engine(ENGINE, e))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            dim,
            id: format!("ollama:{}", settings.model),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn embed(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(self.url("/api/embed"))
            .json(&EmbedRequest { model: &self.model, input })
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::engine(ENGINE, anyhow::anyhow!("HTTP {}: {}", status, body.trim())));
        }
        let parsed: EmbedResponse = response.json().await.map_err(classify)?;
        if parsed.embeddings.len() != input.len() {
            return Err(Error::engine(
                ENGINE,
                anyhow::anyhow!("asked for {} embeddings, got {}", input.len(), parsed.embeddings.len()),
            ));
        }
        debug!(model = %self.model, count = input.len(), "embedded batch");
        Ok(parsed.embeddings)
    }
}

fn classify(e: reqwest::Error) -> Error {
    if e.is_connect() || e.is_timeout() {
        Error::unavailable(ENGINE, e)
    } else {
        Error::engine(ENGINE, e)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::Validation("query text must not be empty".into()));
        }
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| Error::engine(ENGINE, anyhow::anyhow!("empty embeddings response")))
    }
}
