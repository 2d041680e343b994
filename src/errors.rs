use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced at the engine boundary.
///
/// Probe-level transport failures are deliberately opaque: the classifier
/// treats an errored probe as "no response" and the scan continues, so
/// callers only ever see the fatal kinds below.
#[derive(Error, Debug)]
pub enum UmbraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid proxy URL '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid Host header value '{0}'")]
    InvalidHost(String),

    #[error("no scan targets provided")]
    NoTargets,

    #[error("wordlist is empty or contains no valid entries")]
    EmptyWordlist,

    #[error("failed to initialize output file '{path}': {source}")]
    OutputInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal task failure: {0}")]
    Task(String),
}
