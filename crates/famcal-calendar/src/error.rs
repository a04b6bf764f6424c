//! Calendar API error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: resource was modified")]
    Conflict,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl CalendarError {
    /// Whether the credentials behind the request were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::AuthRequired)
    }
}
