use serde::{Deserialize, Serialize};

/// User-facing failure classes. Every terminal failure the dispatcher renders
/// is reduced to one of these before it reaches the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    DataAccess,
    Internal,
}

impl ErrorCode {
    pub fn title(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "Not Found",
            ErrorCode::DataAccess => "Data Error",
            ErrorCode::Internal => "Internal Error",
        }
    }

    pub fn public_message(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "The requested page does not exist.",
            ErrorCode::DataAccess => "The data store could not complete the request.",
            ErrorCode::Internal => "Something went wrong while building this page.",
        }
    }
}
