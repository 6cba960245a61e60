//! `docstore`: ingest files into vector collections and query them.
//!
//! Settings come from `config.toml`, `config.<RUST_ENV>.toml` and `APP_*`
//! variables. Logs go to stderr; results go to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use docstore_core::config::{Config, Settings};
use docstore_core::types::{CollectionInfo, Document, RetrievalResult};
use docstore_core::FilterClause;
use docstore_embed::get_default_embedder;
use docstore_pipeline::{IngestReport, IngestionService, RetrievalService};
use docstore_vector::{with_manager, DeleteAck};

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Ingest documents into a vector store and search them")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a JSON, PDF, DOCX or TXT file and store its text units
    Ingest {
        file: PathBuf,
        /// Content tag; also the prefix of generated ids
        #[arg(long)]
        tag: String,
        #[arg(long)]
        collection: Option<String>,
        /// Use this id instead of generated ones
        #[arg(long)]
        id: Option<String>,
    },
    /// Nearest documents to a query text
    Query {
        text: String,
        #[arg(long)]
        collection: Option<String>,
        #[arg(short, default_value_t = 5)]
        k: usize,
        /// Metadata filter as JSON, e.g. '{"must":[{"field":"content_tag","op":"eq","value":"news"}]}'
        #[arg(long)]
        filter: Option<String>,
    },
    /// Remove documents by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        collection: Option<String>,
    },
    /// List collections with their dimension and size
    Collections,
    /// Dump every document of a collection
    Documents {
        #[arg(long)]
        collection: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let settings = Config::load()?.settings().context("Failed to load settings")?;
    let provider = get_default_embedder(&settings)?;
    let format = cli.format;
    let default_collection = settings.ingest.default_collection.clone();
    let policy = settings.ingest.explicit_id_policy;

    match cli.command {
        Commands::Ingest { file, tag, collection, id } => {
            let collection = collection.unwrap_or(default_collection);
            let report = run(&settings, provider, move |manager| async move {
                IngestionService::new(manager, policy).ingest(&file, &tag, &collection, id.as_deref()).await
            })
            .await?;
            print_ingest(format, &report)?;
        }
        Commands::Query { text, collection, k, filter } => {
            let collection = collection.unwrap_or(default_collection);
            let filter: Option<FilterClause> = filter
                .map(|raw| serde_json::from_str(&raw).context("--filter is not a valid filter clause"))
                .transpose()?;
            let results = run(&settings, provider, move |manager| async move {
                RetrievalService::new(manager).retrieve(&collection, &text, k, filter.as_ref()).await
            })
            .await?;
            print_results(format, &results)?;
        }
        Commands::Delete { ids, collection } => {
            let collection = collection.unwrap_or(default_collection);
            let ack = run(&settings, provider, move |manager| async move {
                let handle = manager.collection(&collection).await?;
                manager.delete(&handle, &ids).await
            })
            .await?;
            print_delete(format, &ack)?;
        }
        Commands::Collections => {
            let infos = run(&settings, provider, |manager| async move { manager.list_collections().await }).await?;
            print_collections(format, &infos)?;
        }
        Commands::Documents { collection } => {
            let collection = collection.unwrap_or(default_collection);
            let docs = run(&settings, provider, move |manager| async move {
                let handle = manager.collection(&collection).await?;
                manager.list_documents(&handle).await
            })
            .await?;
            print_documents(format, &docs)?;
        }
    }
    Ok(())
}

async fn run<F, Fut, T>(settings: &Settings, provider: Arc<dyn docstore_core::EmbeddingProvider>, f: F) -> Result<T>
where
    F: FnOnce(Arc<docstore_vector::CollectionManager>) -> Fut,
    Fut: std::future::Future<Output = docstore_core::Result<T>>,
{
    let value = with_manager(settings, provider, f).await?;
    info!("done");
    Ok(value)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_ingest(format: OutputFormat, report: &IngestReport) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Text => {
            println!("Stored {} document(s) in '{}'", report.count, report.collection);
            for id in &report.ids {
                println!("  {}", id);
            }
            Ok(())
        }
    }
}

fn print_results(format: OutputFormat, results: &[RetrievalResult]) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&results),
        OutputFormat::Text => {
            if results.is_empty() {
                println!("No results.");
            }
            for (rank, r) in results.iter().enumerate() {
                println!("{}. {} (distance {:.4})", rank + 1, r.id, r.distance);
                println!("   {}", preview(&r.text, 160));
            }
            Ok(())
        }
    }
}

fn print_delete(format: OutputFormat, ack: &DeleteAck) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(ack),
        OutputFormat::Text => {
            println!("Deleted {} id(s) from '{}'", ack.requested, ack.collection);
            Ok(())
        }
    }
}

fn print_collections(format: OutputFormat, infos: &[CollectionInfo]) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&infos),
        OutputFormat::Text => {
            if infos.is_empty() {
                println!("No collections.");
            }
            for c in infos {
                println!("{}  dim={}  metric={}  documents={}", c.name, c.dimension, c.metric.as_str(), c.size);
            }
            Ok(())
        }
    }
}

fn print_documents(format: OutputFormat, docs: &[Document]) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&docs),
        OutputFormat::Text => {
            for d in docs {
                println!("{}: {}", d.id, preview(&d.text, 120));
            }
            println!("{} document(s)", docs.len());
            Ok(())
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}
