/// Error types for the I/O side of the scanner.
/// Collaborator failures (quote fetch, market discovery, config, report output)
/// surface here. Per-observation conditions inside a scan never do: they are
/// skip reasons, and one bad observation never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{service} API error: {status} {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
