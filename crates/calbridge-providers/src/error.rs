//! Wire-level failure classification shared by both adapters.
//!
//! Every HTTP and transport failure collapses into a [`ProviderError`]
//! tagged with a [`ProviderErrorCode`]. The code is the contract: the
//! service layer maps codes into its own taxonomy without inspecting
//! messages, and retry policy consults
//! [`is_retryable`](ProviderErrorCode::is_retryable) alone.

use std::fmt;

use thiserror::Error;

/// Classifies a provider failure for routing and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The bearer token was rejected (401).
    AuthenticationFailed,
    /// The token is live but lacks access to the resource (403).
    AuthorizationFailed,
    /// The addressed calendar or event does not exist upstream (404).
    NotFound,
    /// The provider refused the request as malformed (400).
    BadRequest,
    /// The provider asked the caller to back off (429).
    RateLimited,
    /// The request never completed: timeout, refused connection, DNS.
    NetworkError,
    /// The provider failed internally (5xx).
    ServerError,
    /// A response arrived but could not be understood.
    InvalidResponse,
}

impl ProviderErrorCode {
    /// Whether retrying the same call later can reasonably succeed.
    ///
    /// Only transport faults, throttling, and upstream outages qualify;
    /// everything else needs a changed request or changed credentials.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// The snake_case tag used in logs and error displays.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::RateLimited => "rate_limited",
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure from a calendar provider call.
///
/// Renders as `[provider] code: message`; the bracketed provider tag is
/// present once the error has passed through
/// [`with_provider`](Self::with_provider).
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Set at the adapter boundary, e.g. "google" or "microsoft".
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// A 401: the token was rejected.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// A 403: the token holds no access to the resource.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    /// A 404 from the provider.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// A 400: the provider refused the request body or parameters.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// A 429 throttle response.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// A transport fault before any response arrived.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// A 5xx from the provider.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// A response that failed to parse or broke the expected shape.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Tags the error with the provider it came from.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Shorthand for [`ProviderErrorCode::is_retryable`] on the code.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "[{provider}] {}: {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Result alias used across the adapter crates.
pub type ProviderResult<T> = Result<T, ProviderError>;
