//! Error types for documentation parsing.

use thiserror::Error;

/// Errors surfaced while parsing a documentation page.
///
/// Malformed rows, unknown columns and unrepresentable defaults are not
/// errors; they are counted in [`ParseDiagnostics`](crate::ParseDiagnostics).
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A follow-up field table could not be tied to any previously documented
    /// field: no preceding heading or paragraph names one.
    #[error("cannot find the field described by table `{block}` in any preceding heading")]
    UnresolvedSection { block: String },

    /// Text that should name an HTTP method names none.
    #[error("unknown HTTP method `{0}`")]
    UnknownMethod(String),

    /// Embedded JSON field list could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parser configuration could not be read or written as YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Worker pool for batch parsing could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Convenience alias for results with [`DiscoveryError`].
pub type Result<T> = std::result::Result<T, DiscoveryError>;
