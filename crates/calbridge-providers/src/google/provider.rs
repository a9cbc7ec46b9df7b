//! Google provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait on top of the
//! Calendar and People API clients. Access tokens arrive with every call;
//! the provider holds no credentials of its own.

use std::time::Duration;

use tracing::debug;

use calbridge_core::{
    CanonicalEvent, Contact, CreateEventRequest, EventPatch, EventWindow, Profile, Provider,
};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider};

use super::client::{GoogleCalendarClient, normalize_event};
use super::people::GooglePeopleClient;

/// Google calendar provider.
///
/// Events go through the Calendar API v3; contacts and the caller's own
/// profile go through the People API.
pub struct GoogleProvider {
    calendar: GoogleCalendarClient,
    people: GooglePeopleClient,
}

impl GoogleProvider {
    /// Creates a new Google provider with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            calendar: GoogleCalendarClient::new(timeout),
            people: GooglePeopleClient::new(timeout),
        }
    }

    /// Points the Calendar API client at a different root, for tests.
    pub fn with_calendar_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.calendar = self.calendar.with_base_url(base_url);
        self
    }

    /// Points the People API client at a different root, for tests.
    pub fn with_people_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.people = self.people.with_base_url(base_url);
        self
    }

    async fn list_events_impl(
        &self,
        token: &str,
        window: &EventWindow,
    ) -> ProviderResult<Vec<CanonicalEvent>> {
        let events = self.calendar.list_events(token, window).await?;

        // The Calendar API often omits the organizer display name on
        // self-organized events; the caller's own profile fills it in.
        let needs_profile = events.iter().any(|e| {
            e.organizer.as_ref().is_some_and(|o| {
                o.email.as_deref().is_some_and(|a| !a.trim().is_empty())
                    && o.display_name.as_deref().is_none_or(|n| n.trim().is_empty())
            })
        });

        let profile = if needs_profile {
            match self.people.fetch_profile(token).await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    debug!("profile lookup failed, organizer names fall back: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(events
            .into_iter()
            .filter_map(|e| normalize_event(e, profile.as_ref()))
            .collect())
    }

    async fn create_event_impl(
        &self,
        token: &str,
        request: &CreateEventRequest,
    ) -> ProviderResult<CanonicalEvent> {
        request
            .validate()
            .map_err(|e| ProviderError::bad_request(e.to_string()))?;

        let created = self.calendar.insert_event(token, request).await?;
        let mut event = normalize_event(created, None).ok_or_else(|| {
            ProviderError::invalid_response("created event payload missing required fields")
        })?;

        // Lead and user associations are ours, not Google's
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
        let current = self.calendar.get_event(token, event_id).await?;
        let existing = normalize_event(current, None).ok_or_else(|| {
            ProviderError::invalid_response("event payload missing required fields")
        })?;

        let times = (patch.touches_times() || patch.all_day.is_some()).then(|| {
            let (start, end) = patch.resolve_times(existing.start, existing.end);
            (start, end, patch.all_day.unwrap_or(existing.all_day))
        });

        let updated = self
            .calendar
            .patch_event(token, event_id, patch, times)
            .await?;
        normalize_event(updated, None).ok_or_else(|| {
            ProviderError::invalid_response("updated event payload missing required fields")
        })
    }
}

impl CalendarProvider for GoogleProvider {
    fn kind(&self) -> Provider {
        Provider::Google
    }

    fn list_events(
        &self,
        token: String,
        window: EventWindow,
    ) -> BoxFuture<'_, ProviderResult<Vec<CanonicalEvent>>> {
        Box::pin(async move {
            self.list_events_impl(&token, &window)
                .await
                .map_err(|e| e.with_provider(Provider::Google.as_str()))
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
                .map_err(|e| e.with_provider(Provider::Google.as_str()))
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
                .map_err(|e| e.with_provider(Provider::Google.as_str()))
        })
    }

    fn delete_event(&self, token: String, event_id: String) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            self.calendar
                .delete_event(&token, &event_id)
                .await
                .map_err(|e| e.with_provider(Provider::Google.as_str()))
        })
    }

    fn get_contacts(&self, token: String) -> BoxFuture<'_, ProviderResult<Vec<Contact>>> {
        Box::pin(async move {
            self.people
                .fetch_contacts(&token)
                .await
                .map_err(|e| e.with_provider(Provider::Google.as_str()))
        })
    }

    fn lookup_profile(&self, token: String) -> BoxFuture<'_, ProviderResult<Profile>> {
        Box::pin(async move {
            self.people
                .fetch_profile(&token)
                .await
                .map_err(|e| e.with_provider(Provider::Google.as_str()))
        })
    }
}
