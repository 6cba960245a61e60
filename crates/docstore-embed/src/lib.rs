//! Embedding providers for docstore.
//!
//! `OllamaEmbedder` talks to a running Ollama server; `HashEmbedder` is a
//! deterministic stand-in used by tests and offline development.

use std::sync::Arc;

use tracing::info;

use docstore_core::config::{ProviderKind, Settings};
use docstore_core::error::Result;
use docstore_core::traits::EmbeddingProvider;

pub mod hash;
pub mod ollama;

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;

/// Build the provider named by `settings.embedding.provider` at the configured
/// dimension. `APP_USE_FAKE_EMBEDDINGS=1` forces the hash provider.
pub fn get_default_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    let dim = settings.vector.dimension;
    if use_fake_embeddings() || settings.embedding.provider == ProviderKind::Hash {
        info!(dim, "using hash embeddings");
        return Ok(Arc::new(HashEmbedder::new(dim)));
    }
    let embedder = OllamaEmbedder::new(&settings.embedding, dim)?;
    info!(model = %settings.embedding.model, base_url = %settings.embedding.base_url, dim, "using ollama embeddings");
    Ok(Arc::new(embedder))
}

fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
