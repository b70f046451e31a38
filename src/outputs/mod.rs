//! Output rendering for enriched feeds.
//!
//! # Submodules
//!
//! - [`rss`]: RSS 2.0 documents and the in-band `<error>` document
//! - [`json`]: Pretty-printed JSON for command-line use

pub mod json;
pub mod rss;
