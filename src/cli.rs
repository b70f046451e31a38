//! Command-line interface definitions.
//!
//! Two modes: `serve` runs the HTTP endpoint, `convert` enriches a single
//! feed and prints the result to stdout.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

/// Command-line arguments for the full-text feed service.
///
/// # Examples
///
/// ```sh
/// # Serve on the configured address
/// full_text_rss serve --listen 0.0.0.0:8080
///
/// # Convert one feed, first 10 items
/// full_text_rss convert https://news.example/rss --limit 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "FULL_TEXT_RSS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP endpoint
    Serve {
        /// Socket address to bind, overriding the config file
        #[arg(short, long, env = "FULL_TEXT_RSS_LISTEN")]
        listen: Option<String>,
    },
    /// Enrich one feed and write it to stdout
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Feed URL
    pub url: String,

    /// Maximum number of items
    #[arg(short, long)]
    pub limit: Option<i64>,

    /// Per-fetch timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Rss)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Rss,
    Json,
}

impl ConvertArgs {
    /// The same parameter map an HTTP request would produce.
    pub fn to_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::from([("url".to_string(), self.url.clone())]);
        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), limit.to_string());
        }
        if let Some(timeout) = self.timeout {
            params.insert("timeout".to_string(), timeout.to_string());
        }
        params
    }
}
