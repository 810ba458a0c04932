use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// DAT parse or write error
    #[error("{0}")]
    Dat(#[from] datloom_formats::DatError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad command-line usage
    #[error("{0}")]
    Usage(String),
}
