//! Command-line ingestion entry point.
//!
//! ```bash
//! ingest notes.txt paper.pdf --source upload --max-chars 1200 --overlap 150
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ragpipe::{ingest_paths, IngestOptions, OpenAiEmbedder, RagConfig, RestChunkStore};

/// Ingest local TXT/PDF files into the chunk store.
#[derive(Debug, Parser)]
#[command(name = "ingest", version)]
struct Args {
    /// Files to ingest.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Source label stored with every chunk (defaults to each file's name).
    #[arg(long)]
    source: Option<String>,

    /// Maximum characters per chunk.
    #[arg(long, default_value_t = ragpipe::chunking::DEFAULT_MAX_CHARS)]
    max_chars: usize,

    /// Characters of overlap between consecutive chunks.
    #[arg(long, default_value_t = ragpipe::chunking::DEFAULT_OVERLAP)]
    overlap: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(count) => {
            println!("Inserted {count} chunks");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<usize, ragpipe::RagError> {
    let config = RagConfig::from_env()?;
    let embedder = OpenAiEmbedder::new(&config.embedder)?;
    let store = RestChunkStore::new(config.store)?;

    let options = IngestOptions {
        source: args.source,
        max_chars: args.max_chars,
        overlap: args.overlap,
    };
    ingest_paths(&embedder, &store, &args.paths, &options).await
}
