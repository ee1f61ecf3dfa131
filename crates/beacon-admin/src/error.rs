use beacon_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("passwords do not match: try it again, but this time type slooowwwlly")]
    PasswordMismatch,

    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AdminError>;
