use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProverError {
    #[error("Incomplete scan payload: {0}")]
    IncompletePayload(String),

    #[error("Malformed scan payload: {0}")]
    MalformedPayload(String),

    #[error("Verifier storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ProverError>;
