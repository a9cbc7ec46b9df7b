//! Unified feed item types.
//!
//! The feed merges two independently-sourced collections into one shape:
//! canonical calendar events and manually logged meetings. Each item tags
//! its source so consumers can link back to the right record kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{CanonicalEvent, LocationKind, Provider};
use crate::meeting::{LoggedMeeting, MeetingKind};

/// Which collection a feed item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    CalendarEvent,
    LoggedMeeting,
}

/// One entry in the unified feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub source: FeedSource,
    /// The source record id: the provider-assigned external id for calendar
    /// events, the store row id for logged meetings.
    pub id: String,
    /// Set for calendar events only; logged meetings are not
    /// provider-sourced.
    pub provider: Option<Provider>,
    pub lead_id: Option<String>,
    pub title: String,
    pub start: DateTime<Utc>,
    /// Equal to `start` for logged meetings, which carry no
    /// duration-bearing interval in the feed.
    pub end: DateTime<Utc>,
    pub location_kind: Option<LocationKind>,
    pub location_details: Option<String>,
    pub online_meeting: bool,
    pub online_meeting_provider: Option<String>,
    pub organizer_email: Option<String>,
    pub organizer_name: String,
    pub outcome: Option<String>,
}

impl FeedItem {
    /// Builds a feed item from a canonical calendar event.
    pub fn from_event(event: &CanonicalEvent) -> Self {
        Self {
            source: FeedSource::CalendarEvent,
            id: event.external_id.clone(),
            provider: Some(event.provider),
            lead_id: event.lead_id.clone(),
            title: event.title.clone(),
            start: event.start,
            end: event.end,
            location_kind: Some(event.location_kind),
            location_details: event.location_details.clone(),
            online_meeting: event.online_meeting,
            online_meeting_provider: event
                .online_meeting_provider
                .map(|kind| kind.as_str().to_string()),
            organizer_email: event.organizer_email.clone(),
            organizer_name: event.organizer_name.clone(),
            outcome: event.outcome.clone(),
        }
    }

    /// Builds a feed item from a logged meeting.
    ///
    /// The organizer identity is the logging actor, and start and end both
    /// carry the moment the meeting occurred.
    pub fn from_meeting(meeting: &LoggedMeeting) -> Self {
        Self {
            source: FeedSource::LoggedMeeting,
            id: meeting.id.to_string(),
            provider: None,
            lead_id: meeting.lead_id.clone(),
            title: meeting.title.clone(),
            start: meeting.occurred_at,
            end: meeting.occurred_at,
            location_kind: None,
            location_details: None,
            online_meeting: meeting.kind == MeetingKind::Virtual,
            online_meeting_provider: meeting.virtual_provider.clone(),
            organizer_email: None,
            organizer_name: meeting.logged_by.clone(),
            outcome: Some(meeting.outcome.as_str().to_string()),
        }
    }
}
