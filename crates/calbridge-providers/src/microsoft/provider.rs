//! Microsoft provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait on top of the
//! Graph client. Access tokens arrive with every call; the provider holds
//! no credentials of its own.

use std::time::Duration;

use calbridge_core::{
    CanonicalEvent, Contact, CreateEventRequest, EventPatch, EventWindow, Profile, Provider,
};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider};

use super::client::{GraphClient, normalize_event};

/// Microsoft calendar provider.
///
/// Events, contacts, and the caller's profile all go through Microsoft
/// Graph v1.0.
pub struct MicrosoftProvider {
    client: GraphClient,
}

impl MicrosoftProvider {
    /// Creates a new Microsoft provider with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: GraphClient::new(timeout),
        }
    }

    /// Points the Graph client at a different root, for tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(base_url);
        self
    }

    async fn list_events_impl(
        &self,
        token: &str,
        window: &EventWindow,
    ) -> ProviderResult<Vec<CanonicalEvent>> {
        let events = self.client.list_events(token, window).await?;
        Ok(events.into_iter().filter_map(normalize_event).collect())
    }

    async fn create_event_impl(
        &self,
        token: &str,
        request: &CreateEventRequest,
    ) -> ProviderResult<CanonicalEvent> {
        request
            .validate()
            .map_err(|e| ProviderError::bad_request(e.to_string()))?;

        let created = self.client.create_event(token, request).await?;
        let mut event = normalize_event(created).ok_or_else(|| {
            ProviderError::invalid_response("created event payload missing required fields")
        })?;

        // Lead and user associations are ours, not Graph's
        event.lead_id = request.lead_id.clone();
        event.user_id = request.user_id.clone();
        Ok(event)
    }

    async fn update_event_impl(
        &self,
        token: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> ProviderResult<CanonicalEvent> {
        patch
            .validate()
            .map_err(|e| ProviderError::bad_request(e.to_string()))?;

        // Fetch first: a one-sided time change resolves against the stored
        // interval, so a start-only move keeps the event duration.
        let current = self.client.get_event(token, event_id).await?;
        let existing = normalize_event(current).ok_or_else(|| {
            ProviderError::invalid_response("event payload missing required fields")
        })?;

        let times = (patch.touches_times() || patch.all_day.is_some()).then(|| {
            let (start, end) = patch.resolve_times(existing.start, existing.end);
            (start, end, patch.all_day.unwrap_or(existing.all_day))
        });

        let updated = self
            .client
            .patch_event(token, event_id, patch, times)
            .await?;
        normalize_event(updated).ok_or_else(|| {
            ProviderError::invalid_response("updated event payload missing required fields")
        })
    }
}

impl CalendarProvider for MicrosoftProvider {
    fn kind(&self) -> Provider {
        Provider::Microsoft
    }

    fn list_events(
        &self,
        token: String,
        window: EventWindow,
    ) -> BoxFuture<'_, ProviderResult<Vec<CanonicalEvent>>> {
        Box::pin(async move {
            self.list_events_impl(&token, &window)
                .await
                .map_err(|e| e.with_provider(Provider::Microsoft.as_str()))
        })
    }

    fn create_event(
        &self,
        token: String,
        request: CreateEventRequest,
    ) -> BoxFuture<'_, ProviderResult<CanonicalEvent>> {
        Box::pin(async move {
            self.create_event_impl(&token, &request)
                .await
                .map_err(|e| e.with_provider(Provider::Microsoft.as_str()))
        })
    }

    fn update_event(
        &self,
        token: String,
        event_id: String,
        patch: EventPatch,
    ) -> BoxFuture<'_, ProviderResult<CanonicalEvent>> {
        Box::pin(async move {
            self.update_event_impl(&token, &event_id, &patch)
                .await
                .map_err(|e| e.with_provider(Provider::Microsoft.as_str()))
        })
    }

    fn delete_event(&self, token: String, event_id: String) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            self.client
                .delete_event(&token, &event_id)
                .await
                .map_err(|e| e.with_provider(Provider::Microsoft.as_str()))
        })
    }

    fn get_contacts(&self, token: String) -> BoxFuture<'_, ProviderResult<Vec<Contact>>> {
        Box::pin(async move {
            self.client
                .list_contacts(&token)
                .await
                .map_err(|e| e.with_provider(Provider::Microsoft.as_str()))
        })
    }

    fn lookup_profile(&self, token: String) -> BoxFuture<'_, ProviderResult<Profile>> {
        Box::pin(async move {
            self.client
                .get_me(&token)
                .await
                .map_err(|e| e.with_provider(Provider::Microsoft.as_str()))
        })
    }
}
