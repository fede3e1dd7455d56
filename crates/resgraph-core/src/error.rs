use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A block lacks its line markers or has an unexpected shape.
    #[error("Malformed block #{index} in category '{category}': {reason}")]
    MalformedBlock {
        category: String,
        index: usize,
        reason: String,
    },

    #[error("Failed to read source file '{}': {source}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every registered category present for a key failed to enrich.
    #[error("Enrichment failed for '{key}' in all categories: {}", summarize(.failures))]
    EnrichmentFailed {
        key: String,
        failures: Vec<(String, String)>,
    },

    #[error("Invalid definitions input: {0}")]
    InvalidDefinitions(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse manifest '{file_path}' (document starting at line {line}): {message}")]
    ManifestParse {
        file_path: String,
        line: usize,
        message: String,
    },
}

fn summarize(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(category, reason)| format!("{category}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}
