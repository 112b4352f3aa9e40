use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};

use crate::{
    answer::DEFAULT_MAX_UNITS,
    chunking::{DEFAULT_MAX_CHARS, DEFAULT_OVERLAP},
    ingestion::DEFAULT_BATCH_SIZE,
    model_manager::MODEL_ENV_VAR,
    retriever::DEFAULT_TOP_K,
    vector_db::DEFAULT_COLLECTION,
};

#[derive(Debug, Parser)]
#[command(
    name = "askdocs",
    version,
    about = "Ask questions about a folder of PDF documents"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Sentence-transformer model ID or local model path
    #[arg(long, global = true, env = MODEL_ENV_VAR)]
    pub model: Option<String>,

    /// Name of the vector collection
    #[arg(long, global = true, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rebuild the collection from a directory of PDFs
    Ingest(IngestArgs),
    /// Answer a single question
    Ask(AskArgs),
    /// Ask questions interactively
    Chat(ChatArgs),
    /// Serve the question-answering API over HTTP
    Serve(ServeArgs),
    /// Show data directory, model and index statistics
    Status(StatusArgs),
}

// -- Ingest --

#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Directory containing the PDF files
    #[arg(default_value = "docs")]
    pub docs: PathBuf,

    /// Chunks embedded and written per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Maximum chunk size in characters
    #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
    pub max_chars: usize,

    /// Approximate overlap between chunks in characters
    #[arg(long, default_value_t = DEFAULT_OVERLAP)]
    pub overlap: usize,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

// -- Ask --

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Maximum sentences in the answer
    #[arg(long, default_value_t = DEFAULT_MAX_UNITS)]
    pub max_units: usize,

    /// Ask a running `askdocs serve` instance instead (e.g. http://host:8000)
    #[arg(long)]
    pub remote: Option<String>,

    /// Output the answer and sources as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Chat --

#[derive(Debug, Parser)]
pub struct ChatArgs {
    /// Number of chunks to retrieve
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Maximum sentences in each answer
    #[arg(long, default_value_t = DEFAULT_MAX_UNITS)]
    pub max_units: usize,
}

// -- Serve --

#[derive(Debug, Parser)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "ASKDOCS_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Number of chunks to retrieve per question
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Maximum sentences in each answer
    #[arg(long, default_value_t = DEFAULT_MAX_UNITS)]
    pub max_units: usize,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
