use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Invalid mapreduce configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not find job with ID '{0}'")]
    JobNotFound(String),

    #[error("Invalid pagination cursor")]
    InvalidCursor,

    #[error("Job record store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, StatusError>;
