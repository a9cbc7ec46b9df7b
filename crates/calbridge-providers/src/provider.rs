//! The [`CalendarProvider`] trait.
//!
//! Everything the service layer asks of an upstream calendar goes through
//! this trait: event listing and mutation in [`CanonicalEvent`] terms,
//! plus contact and profile lookups. Google and Microsoft each implement
//! it; [`ErrorProvider`] stands in when an adapter must always fail.

use std::future::Future;
use std::pin::Pin;

use calbridge_core::{
    CanonicalEvent, Contact, CreateEventRequest, EventPatch, EventWindow, Profile, Provider,
};

use crate::error::{ProviderError, ProviderResult};

/// Boxed future returned by the trait methods.
///
/// The trait must stay object-safe for `Arc<dyn CalendarProvider>`
/// routing, which rules out `async fn` in the trait itself.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One upstream calendar, seen through the canonical model.
///
/// Implementations translate between their wire format and
/// [`CanonicalEvent`]; callers never see a provider payload. The contract
/// every implementation honors:
///
/// - access tokens arrive per call and are never stored or refreshed
/// - `list_events` pages through the upstream internally and drops
///   cancelled events
/// - mutation methods validate their input before issuing any HTTP call
pub trait CalendarProvider: Send + Sync {
    /// Returns which provider this adapter talks to.
    fn kind(&self) -> Provider;

    /// Fetches events that overlap the given time window.
    ///
    /// Returns normalized events in the order the upstream API yields
    /// them.
    fn list_events(
        &self,
        token: String,
        window: EventWindow,
    ) -> BoxFuture<'_, ProviderResult<Vec<CanonicalEvent>>>;

    /// Creates an event upstream and returns its normalized form.
    ///
    /// The request is validated before any HTTP call is made; an invalid
    /// request fails with `BadRequest` without touching the network.
    fn create_event(
        &self,
        token: String,
        request: CreateEventRequest,
    ) -> BoxFuture<'_, ProviderResult<CanonicalEvent>>;

    /// Applies a sparse patch to an existing upstream event.
    ///
    /// Only fields the patch supplies are written; everything else keeps
    /// its current upstream value. Returns the updated normalized event.
    fn update_event(
        &self,
        token: String,
        event_id: String,
        patch: EventPatch,
    ) -> BoxFuture<'_, ProviderResult<CanonicalEvent>>;

    /// Deletes an event upstream.
    fn delete_event(&self, token: String, event_id: String) -> BoxFuture<'_, ProviderResult<()>>;

    /// Fetches the user's contacts, deduplicated by email.
    fn get_contacts(&self, token: String) -> BoxFuture<'_, ProviderResult<Vec<Contact>>>;

    /// Fetches the authenticated user's own profile.
    ///
    /// Used to resolve an organizer display name when the event payload
    /// does not carry one.
    fn lookup_profile(&self, token: String) -> BoxFuture<'_, ProviderResult<Profile>>;
}

/// An adapter that fails every call with a fixed error.
///
/// Stands in for a provider that could not be constructed, and doubles
/// as a test seam when a route must be present but unusable.
#[derive(Debug)]
pub struct ErrorProvider {
    kind: Provider,
    error: ProviderError,
}

impl ErrorProvider {
    pub fn new(kind: Provider, error: ProviderError) -> Self {
        Self { kind, error }
    }

    // ProviderError is not Clone; rebuild it from its parts per call.
    fn replay(&self) -> ProviderError {
        ProviderError::new(self.error.code(), self.error.message())
            .with_provider(self.kind.as_str())
    }
}

impl CalendarProvider for ErrorProvider {
    fn kind(&self) -> Provider {
        self.kind
    }

    fn list_events(
        &self,
        _token: String,
        _window: EventWindow,
    ) -> BoxFuture<'_, ProviderResult<Vec<CanonicalEvent>>> {
        let error = self.replay();
        Box::pin(async move { Err(error) })
    }

    fn create_event(
        &self,
        _token: String,
        _request: CreateEventRequest,
    ) -> BoxFuture<'_, ProviderResult<CanonicalEvent>> {
        let error = self.replay();
        Box::pin(async move { Err(error) })
    }

    fn update_event(
        &self,
        _token: String,
        _event_id: String,
        _patch: EventPatch,
    ) -> BoxFuture<'_, ProviderResult<CanonicalEvent>> {
        let error = self.replay();
        Box::pin(async move { Err(error) })
    }

    fn delete_event(&self, _token: String, _event_id: String) -> BoxFuture<'_, ProviderResult<()>> {
        let error = self.replay();
        Box::pin(async move { Err(error) })
    }

    fn get_contacts(&self, _token: String) -> BoxFuture<'_, ProviderResult<Vec<Contact>>> {
        let error = self.replay();
        Box::pin(async move { Err(error) })
    }

    fn lookup_profile(&self, _token: String) -> BoxFuture<'_, ProviderResult<Profile>> {
        let error = self.replay();
        Box::pin(async move { Err(error) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn error_provider_tags_its_failures() {
        let provider = ErrorProvider::new(
            Provider::Google,
            ProviderError::server("backend unavailable"),
        );

        assert_eq!(provider.kind(), Provider::Google);

        let window = EventWindow::new(Utc::now(), Utc::now() + Duration::hours(24));
        let err = provider
            .list_events("token".to_string(), window)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(err.provider(), Some("google"));
    }

    #[tokio::test]
    async fn error_provider_replays_on_every_call() {
        let provider = ErrorProvider::new(
            Provider::Microsoft,
            ProviderError::rate_limited("slow down"),
        );

        let first = provider.get_contacts("token".to_string()).await;
        let second = provider.lookup_profile("token".to_string()).await;
        assert_eq!(first.unwrap_err().code(), ProviderErrorCode::RateLimited);
        assert_eq!(second.unwrap_err().code(), ProviderErrorCode::RateLimited);
    }
}
