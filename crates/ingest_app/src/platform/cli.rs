use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Submit content for ingestion and follow its progress.
#[derive(Debug, Parser)]
#[command(
    name = "ingest",
    version,
    about = "Submit documents or websites for ingestion and follow their progress"
)]
pub struct Args {
    /// RON configuration file. Defaults to `./ingest.ron` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// File holding the bearer token; overrides `token_file` from the config.
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    /// Overrides `api_base_url` from the config.
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Also log to the terminal.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a document and follow its processing.
    Upload {
        file: PathBuf,
        /// Question to ask once the collection is ready.
        #[arg(long)]
        ask: Option<String>,
    },
    /// Scrape a website and follow its processing.
    Scrape {
        url: String,
        /// Question to ask once the collection is ready.
        #[arg(long)]
        ask: Option<String>,
    },
    /// Ask a question against an existing collection.
    Ask { collection: String, question: String },
    /// Store the bearer token used for every request.
    Login { token: String },
    /// Forget the stored token.
    Logout,
}
