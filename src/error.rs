use thiserror::Error;

pub type Result<T> = std::result::Result<T, InsightsError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Mining(#[from] MiningError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to write report {path}: {source}")]
    Report {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failures talking to the code-review platform.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Missing API token: set the {0} environment variable")]
    MissingToken(&'static str),
    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} returned HTTP {status}")]
    Status { status: u16, url: String },
    #[error("Request to {url} was rate limited (HTTP {status}) and retries were exhausted")]
    RateLimited { status: u16, url: String },
    #[error("Malformed payload from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: BoxError,
    },
}

impl ExtractionError {
    pub fn malformed(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ExtractionError::Malformed {
            url: url.into(),
            source: source.into(),
        }
    }
}

/// Failures reading the version-control history.
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Cannot open repository at '{location}': {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: BoxError,
    },
    #[error("Cannot clone '{url}': {source}")]
    Clone {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("Branch '{0}' not found")]
    BranchNotFound(String),
    #[error("Failed to read commit history: {0}")]
    Traversal(#[source] BoxError),
}

impl MiningError {
    pub fn traversal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MiningError::Traversal(Box::new(err))
    }
}
