use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid fragment: {0}")]
    InvalidFragment(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
