//! Service-layer error taxonomy.

use thiserror::Error;

use calbridge_core::ValidationError;
use calbridge_providers::{ProviderError, ProviderErrorCode};
use calbridge_store::StoreError;

/// Convenience alias for service results.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the service layer.
///
/// Provider errors are classified exactly once, on entry: authentication
/// and permission rejections become [`SyncError::Unauthorized`], malformed
/// requests and missing upstream resources become
/// [`SyncError::InvalidRequest`], and everything transient or unclassified
/// becomes [`SyncError::UpstreamFailure`]. [`SyncError::NotFound`] is
/// reserved for local mirror records; an upstream 404 is an invalid
/// request, not a missing local record.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The bearer token is missing, malformed, or rejected upstream.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request is malformed or references a missing upstream resource.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider failed in a way the caller may retry later.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// No local mirror record matches.
    #[error("not found: {0}")]
    NotFound(String),

    /// A fatal local persistence failure.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl From<ProviderError> for SyncError {
    fn from(error: ProviderError) -> Self {
        let message = error.to_string();
        match error.code() {
            ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::AuthorizationFailed => {
                Self::Unauthorized(message)
            }
            ProviderErrorCode::BadRequest | ProviderErrorCode::NotFound => {
                Self::InvalidRequest(message)
            }
            ProviderErrorCode::NetworkError
            | ProviderErrorCode::RateLimited
            | ProviderErrorCode::ServerError
            | ProviderErrorCode::InvalidResponse => Self::UpstreamFailure(message),
        }
    }
}

impl From<ValidationError> for SyncError {
    fn from(error: ValidationError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}
