use thiserror::Error;

/// Failures surfaced by the pipeline stages and the capture flow.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamFetch { status: u16, body: String },
    #[error("upstream returned no records")]
    NoDataExtracted,
    #[error("transform called with no records")]
    EmptyInput,
    #[error("source id {0} cannot be offset without overflow")]
    IdOutOfRange(i64),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("prediction model error: {0}")]
    Model(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] rusqlite::Error),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
