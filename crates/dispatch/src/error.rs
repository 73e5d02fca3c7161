use shared::error::ErrorCode;
use storage::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no plugin is registered for `{0}`")]
    NotFound(String),
    #[error("data access failed: {0}")]
    DataAccess(#[from] DbError),
    #[error("no database attached to this request")]
    NoDatabase,
    #[error("{0}")]
    Internal(String),
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::NotFound(_) => ErrorCode::NotFound,
            DispatchError::DataAccess(_) | DispatchError::NoDatabase => ErrorCode::DataAccess,
            DispatchError::Internal(_) => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no theme is registered")]
    NoTheme,
    #[error("default object `{0}` is not registered")]
    UnknownDefaultObject(String),
    #[error("default theme `{0}` is not registered")]
    UnknownDefaultTheme(String),
    #[error("`{0}` is not a valid selector key")]
    InvalidKey(String),
}
