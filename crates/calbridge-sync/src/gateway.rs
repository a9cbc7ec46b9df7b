//! Provider routing from request headers.
//!
//! Two headers drive routing: the authorization header carrying a bearer
//! token, and the provider header naming an adapter. When BOTH are absent
//! on a single-record operation, the caller wants the local mirror only;
//! that is a routing branch, not a validation failure. Once either header
//! is present the pair must be fully valid, and the authorization check
//! runs before the provider tag check.

use std::sync::Arc;

use calbridge_core::Provider;
use calbridge_providers::CalendarProvider;

use crate::error::{SyncError, SyncResult};

/// Where an operation should run.
#[derive(Debug)]
pub enum Route {
    /// No credentials were supplied; operate on the local mirror only.
    Local,
    /// Credentials selected a provider adapter.
    Provider(ProviderRoute),
}

/// A validated provider selection.
pub struct ProviderRoute {
    pub provider: Provider,
    pub token: String,
    adapter: Arc<dyn CalendarProvider>,
}

impl ProviderRoute {
    /// Returns the adapter this route selected.
    pub fn adapter(&self) -> &dyn CalendarProvider {
        self.adapter.as_ref()
    }
}

// `dyn CalendarProvider` is not `Debug`, so the adapter field is elided.
impl std::fmt::Debug for ProviderRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRoute")
            .field("provider", &self.provider)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Routes operations to a provider adapter or to the local mirror.
pub struct SyncGateway {
    google: Arc<dyn CalendarProvider>,
    microsoft: Arc<dyn CalendarProvider>,
}

impl SyncGateway {
    pub fn new(google: Arc<dyn CalendarProvider>, microsoft: Arc<dyn CalendarProvider>) -> Self {
        Self { google, microsoft }
    }

    /// Resolves the header pair into a route.
    ///
    /// Both headers absent routes to [`Route::Local`]. Otherwise the
    /// bearer token is validated first (missing or malformed raises
    /// [`SyncError::Unauthorized`]), then the provider tag (missing or
    /// unknown raises [`SyncError::InvalidRequest`]; matching is
    /// case-insensitive).
    pub fn resolve(
        &self,
        authorization: Option<&str>,
        provider_tag: Option<&str>,
    ) -> SyncResult<Route> {
        if authorization.is_none() && provider_tag.is_none() {
            return Ok(Route::Local);
        }

        let token = parse_bearer(authorization)?;
        let tag = provider_tag.ok_or_else(|| {
            SyncError::InvalidRequest("missing provider header".to_string())
        })?;
        let provider =
            Provider::parse(tag).map_err(|e| SyncError::InvalidRequest(e.to_string()))?;

        Ok(Route::Provider(ProviderRoute {
            provider,
            token,
            adapter: self.adapter(provider),
        }))
    }

    /// Resolves the header pair for an operation that cannot run locally.
    ///
    /// Used by list, create, and contacts, which always need an upstream
    /// call; header absence is unauthorized here instead of local routing.
    pub fn require_provider(
        &self,
        authorization: Option<&str>,
        provider_tag: Option<&str>,
    ) -> SyncResult<ProviderRoute> {
        match self.resolve(authorization, provider_tag)? {
            Route::Provider(route) => Ok(route),
            Route::Local => Err(SyncError::Unauthorized(
                "this operation requires provider credentials".to_string(),
            )),
        }
    }

    fn adapter(&self, provider: Provider) -> Arc<dyn CalendarProvider> {
        match provider {
            Provider::Google => Arc::clone(&self.google),
            Provider::Microsoft => Arc::clone(&self.microsoft),
        }
    }
}

fn parse_bearer(authorization: Option<&str>) -> SyncResult<String> {
    let header = authorization
        .ok_or_else(|| SyncError::Unauthorized("missing authorization header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            SyncError::Unauthorized("authorization header is not a bearer token".to_string())
        })?
        .trim();
    if token.is_empty() {
        return Err(SyncError::Unauthorized("bearer token is empty".to_string()));
    }
    Ok(token.to_string())
}
