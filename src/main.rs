//! # Full Text RSS
//!
//! Turns a syndication feed with truncated summaries into one carrying the
//! full article text inline.
//!
//! ## Usage
//!
//! ```sh
//! full_text_rss serve --listen 127.0.0.1:8080
//! curl 'http://127.0.0.1:8080/?url=https%3A%2F%2Fnews.example%2Frss&limit=10'
//!
//! full_text_rss convert https://news.example/rss --format json
//! ```
//!
//! ## Architecture
//!
//! 1. **Request**: resolve `url`, `limit` and `timeout` from query or form
//! 2. **Feed**: fetch and parse the feed document
//! 3. **Fetching**: normalize entry links and fetch article pages (6 at a time,
//!    then a sequential retry pass for anything unresolved)
//! 4. **Extraction**: pick the main content region of each page
//! 5. **Output**: render RSS 2.0 (or JSON from the command line)

use clap::Parser;
use std::error::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod content_type;
mod error;
mod extract;
mod feed;
mod fetcher;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod request;
mod server;
#[cfg(test)]
mod testing;
mod utils;

use cli::{Cli, Command, ConvertArgs, OutputFormat};
use config::Settings;
use fetcher::ReqwestClient;
use outputs::{json, rss};
use pipeline::Enricher;
use request::FeedRequest;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init (stderr, stdout carries converted feeds) ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args.config, "Parsed CLI arguments");

    let settings = Settings::load(args.config.as_deref()).await?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        concurrency = settings.concurrency(),
        "full_text_rss starting up"
    );

    match args.command {
        Command::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| settings.listen.clone());
            let client = ReqwestClient::new(&settings)?;
            server::serve(Enricher::new(client, settings), &listen).await?;
        }
        Command::Convert(convert) => {
            let document = convert_feed(&convert, settings).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(document.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

/// One-shot conversion. Fatal errors are still printed as an `<error>`
/// document before being returned, so scripted callers see the same output
/// an HTTP client would.
async fn convert_feed(convert: &ConvertArgs, settings: Settings) -> Result<String, Box<dyn Error>> {
    let client = match ReqwestClient::new(&settings) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "HTTP client unavailable");
            println!("{}", rss::render_error(e.public_message()));
            return Err(e.into());
        }
    };
    let enricher = Enricher::new(client, settings);
    let params = convert.to_params();

    match convert.format {
        OutputFormat::Rss => Ok(server::respond(&enricher, &params).await),
        OutputFormat::Json => {
            let request = match FeedRequest::from_params(&params, enricher.settings()) {
                Ok(request) => request,
                Err(e) => {
                    error!(error = %e, "Rejected request");
                    println!("{}", rss::render_error(e.public_message()));
                    return Err(e.into());
                }
            };
            let feed = enricher.run(&request).await;
            Ok(json::render_feed(&feed)?)
        }
    }
}
