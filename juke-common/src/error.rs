//! Common error types for the juke playback engine

use thiserror::Error;

/// Common result type for juke operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the playback engine
///
/// The first six variants are user-facing: front ends render them verbatim
/// as command replies. The rest cover ambient failures (I/O, HTTP transport,
/// configuration).
#[derive(Error, Debug)]
pub enum Error {
    /// Search yielded no usable result for a text query
    #[error("Nothing found for: {0}")]
    NotFound(String),

    /// Content-type probe failed or the response carried no content type
    #[error("Probe error: {0}")]
    Probe(String),

    /// Extraction failed after exhausting fallback egress paths
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Malformed seek target, rejected before reaching the session
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    /// Control command issued against a tenant with no active session
    #[error("Nothing is playing")]
    NotPlaying,

    /// The output transport failed unexpectedly
    #[error("Sink error: {0}")]
    Sink(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}
