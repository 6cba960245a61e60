//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys separated by `__`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::assembler::ExplicitIdPolicy;
use crate::error::{Error, Result};
use crate::types::DistanceMetric;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Ok(Self { figment: Self::figment_for_env(&env_name) })
    }

    /// Defaults, then `config.toml`, then `config.<env>.toml`, then `APP_*` variables.
    pub fn figment_for_env(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Lance,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub vector: VectorSettings,
    pub embedding: EmbeddingSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSettings {
    pub engine: EngineKind,
    pub uri: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    /// Create a missing collection on the query path instead of failing.
    pub create_on_query: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    pub explicit_id_policy: ExplicitIdPolicy,
    pub default_collection: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vector: VectorSettings {
                engine: EngineKind::Lance,
                uri: "~/.local/share/docstore/lancedb".to_string(),
                dimension: 768,
                metric: DistanceMetric::Cosine,
                create_on_query: false,
            },
            embedding: EmbeddingSettings {
                provider: ProviderKind::Ollama,
                model: "nomic-embed-text".to_string(),
                base_url: "http://localhost:11434".to_string(),
                timeout_secs: None,
            },
            ingest: IngestSettings {
                explicit_id_policy: ExplicitIdPolicy::Shared,
                default_collection: "documents".to_string(),
            },
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.vector.dimension == 0 {
            return Err(Error::InvalidConfig("vector.dimension must be > 0".into()));
        }
        if self.vector.engine == EngineKind::Lance && self.vector.uri.trim().is_empty() {
            return Err(Error::InvalidConfig("vector.uri is required for the lance engine".into()));
        }
        if self.embedding.provider == ProviderKind::Ollama && self.embedding.model.trim().is_empty() {
            return Err(Error::InvalidConfig("embedding.model is required for the ollama provider".into()));
        }
        if self.ingest.default_collection.trim().is_empty() {
            return Err(Error::InvalidConfig("ingest.default_collection must not be empty".into()));
        }
        Ok(())
    }

    /// The vector store location with `~` and env vars expanded.
    pub fn vector_uri(&self) -> PathBuf {
        expand_path(&self.vector.uri)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
