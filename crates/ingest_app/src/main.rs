//! `ingest`: submit a document or website to the ingestion service and
//! follow its progress in the terminal.
//!
//! ```bash
//! ingest login <TOKEN>
//! ingest upload ./manual.pdf --ask "What does the warranty cover?"
//! ingest scrape https://example.com/docs
//! ingest ask <COLLECTION> "How do I reset the device?"
//! ```

mod platform;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let args = platform::cli::Args::parse();
    match platform::run_app(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
