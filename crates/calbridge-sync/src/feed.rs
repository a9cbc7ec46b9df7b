//! The unified feed: mirrored events and logged meetings, merged.

use std::sync::Arc;

use tracing::debug;

use calbridge_core::{CanonicalEvent, FALLBACK_ORGANIZER_NAME, FeedItem, Provider};
use calbridge_providers::CalendarProvider;
use calbridge_store::{EventFilter, MeetingFilter, MirrorStore};

use crate::effects::attempt;
use crate::error::SyncResult;

/// Criteria for assembling the unified feed.
///
/// The provider and user criteria narrow the event side only; logged
/// meetings have no provider. The lead criterion narrows both sides.
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub provider: Option<Provider>,
    pub user_id: Option<String>,
    pub lead_id: Option<String>,
}

impl FeedQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn for_lead(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }
}

/// Assembles the merged activity feed from the local mirror.
pub struct FeedBuilder {
    store: MirrorStore,
    google: Arc<dyn CalendarProvider>,
}

impl FeedBuilder {
    pub fn new(store: MirrorStore, google: Arc<dyn CalendarProvider>) -> Self {
        Self { store, google }
    }

    /// Builds the merged feed, newest first.
    ///
    /// Events and meetings are read from the mirror independently, merged,
    /// and sorted by start time descending. The sort is stable, so items
    /// sharing a start time keep events ahead of meetings.
    pub async fn build_feed(
        &self,
        query: &FeedQuery,
        token: Option<&str>,
    ) -> SyncResult<Vec<FeedItem>> {
        let mut event_filter = EventFilter::new();
        if let Some(provider) = query.provider {
            event_filter = event_filter.for_provider(provider);
        }
        if let Some(user_id) = &query.user_id {
            event_filter = event_filter.for_user(user_id);
        }
        if let Some(lead_id) = &query.lead_id {
            event_filter = event_filter.for_lead(lead_id);
        }
        let mut events = self.store.find_events(&event_filter)?;

        if let Some(token) = token
            && query.provider == Some(Provider::Google)
        {
            self.backfill_organizer_names(&mut events, token).await;
        }

        let mut meeting_filter = MeetingFilter::new();
        if let Some(lead_id) = &query.lead_id {
            meeting_filter = meeting_filter.for_lead(lead_id);
        }
        let meetings = self.store.find_meetings(&meeting_filter)?;

        let mut items: Vec<FeedItem> = events.iter().map(FeedItem::from_event).collect();
        items.extend(meetings.iter().map(FeedItem::from_meeting));
        items.sort_by(|a, b| b.start.cmp(&a.start));

        debug!(
            events = events.len(),
            meetings = meetings.len(),
            "assembled feed"
        );
        Ok(items)
    }

    /// Replaces placeholder organizer names with the authenticated
    /// profile's display name.
    ///
    /// A name is a placeholder when it merely echoes the organizer email
    /// or the fallback label. The lookup runs at most once per feed build
    /// and only when some event actually needs it; failures leave the
    /// names as they are.
    async fn backfill_organizer_names(&self, events: &mut [CanonicalEvent], token: &str) {
        if !events.iter().any(organizer_name_is_placeholder) {
            return;
        }
        let Some(profile) = attempt(
            "profile lookup",
            self.google.lookup_profile(token.to_string()),
        )
        .await
        else {
            return;
        };
        let Some(name) = profile
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
        else {
            return;
        };

        for event in events.iter_mut() {
            if organizer_name_is_placeholder(event)
                && let Some(email) = &event.organizer_email
                && profile.matches_email(email)
            {
                event.organizer_name = name.to_string();
            }
        }
    }
}

fn organizer_name_is_placeholder(event: &CanonicalEvent) -> bool {
    match &event.organizer_email {
        Some(email) => {
            event.organizer_name.eq_ignore_ascii_case(email)
                || event.organizer_name == FALLBACK_ORGANIZER_NAME
        }
        None => false,
    }
}
