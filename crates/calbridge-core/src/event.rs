//! Canonical calendar event types.
//!
//! This module provides the provider-agnostic event representation:
//! - [`CanonicalEvent`]: one calendar occurrence, mirrored locally
//! - [`Attendee`] / [`ResponseStatus`]: normalized attendee shape
//! - [`LocationKind`] / [`ConferenceKind`]: location and online-meeting
//!   classification
//! - [`CreateEventRequest`] / [`AttendeeInput`]: caller-supplied inputs for
//!   event creation

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::validate_interval;

/// Display name used when no organizer name can be resolved at all.
pub const FALLBACK_ORGANIZER_NAME: &str = "user";

/// The calendar provider an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Microsoft,
}

impl Provider {
    /// Parses a provider tag, case-insensitively.
    pub fn parse(tag: &str) -> Result<Self, ValidationError> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "microsoft" => Ok(Self::Microsoft),
            _ => Err(ValidationError::UnknownProvider(tag.to_string())),
        }
    }

    /// Returns the canonical lowercase tag for this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "microsoft",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attendee's reply to the invitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Accepted,
    Declined,
    Tentative,
    /// Invited but has not replied yet.
    NeedsAction,
    /// The provider reported something this model does not recognize.
    #[default]
    Unknown,
}

/// How an event's location is classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// A physical location; conferencing is suppressed on creation.
    InPerson,
    /// A Google Meet conference requested from the Google provider.
    GoogleMeet,
    /// A Microsoft Teams meeting requested from the Microsoft provider.
    Teams,
    /// Anything else, including events with no location at all.
    #[default]
    Other,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPerson => "in_person",
            Self::GoogleMeet => "google_meet",
            Self::Teams => "teams",
            Self::Other => "other",
        }
    }

    /// Parses the tag produced by [`LocationKind::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "in_person" => Some(Self::InPerson),
            "google_meet" => Some(Self::GoogleMeet),
            "teams" => Some(Self::Teams),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// The online-meeting service detected on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConferenceKind {
    GoogleMeet,
    Teams,
    Zoom,
    Other,
}

impl ConferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleMeet => "google_meet",
            Self::Teams => "teams",
            Self::Zoom => "zoom",
            Self::Other => "other",
        }
    }

    /// Parses the tag produced by [`ConferenceKind::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "google_meet" => Some(Self::GoogleMeet),
            "teams" => Some(Self::Teams),
            "zoom" => Some(Self::Zoom),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// An attendee on a canonical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Email address as the provider reported it.
    pub email: String,
    /// Display name, when the provider supplied one.
    pub display_name: Option<String>,
    /// Normalized response status.
    #[serde(default)]
    pub response_status: ResponseStatus,
}

impl Attendee {
    /// Creates an attendee carrying only an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            response_status: ResponseStatus::Unknown,
        }
    }

    /// Builder method to set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Builder method to set the response status.
    pub fn with_response_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }
}

/// A canonical calendar event mirroring one provider occurrence.
///
/// This is the single internal representation both provider adapters map
/// into and out of. Timestamps are UTC; the original IANA timezone name is
/// carried alongside for round-tripping to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Provider-assigned event identifier.
    pub external_id: String,
    /// Which provider the event lives on.
    pub provider: Provider,
    /// Owning user, when known.
    pub user_id: Option<String>,
    /// Associated lead, when the event is lead-linked.
    pub lead_id: Option<String>,
    /// Title (Google's summary, Graph's subject).
    pub title: String,
    /// Free-text description.
    pub description: Option<String>,
    /// When the event starts (UTC).
    pub start: DateTime<Utc>,
    /// When the event ends (UTC).
    pub end: DateTime<Utc>,
    /// IANA timezone name supplied by the provider, passed through untouched.
    pub timezone: Option<String>,
    /// True for date-only events.
    pub all_day: bool,
    /// How the location is classified.
    pub location_kind: LocationKind,
    /// Free-text location details (room, address, or join URL).
    pub location_details: Option<String>,
    /// Ordered attendee list.
    pub attendees: Vec<Attendee>,
    /// Organizer email, when the provider supplied one.
    pub organizer_email: Option<String>,
    /// Resolved organizer display name; never empty (falls back to
    /// [`FALLBACK_ORGANIZER_NAME`]).
    pub organizer_name: String,
    /// Whether the event carries an online meeting.
    pub online_meeting: bool,
    /// Which conferencing service backs the online meeting.
    pub online_meeting_provider: Option<ConferenceKind>,
    /// Free-text meeting outcome recorded against the event.
    pub outcome: Option<String>,
    /// Soft-delete marker; inactive events stay on disk for history.
    pub active: bool,
}

impl CanonicalEvent {
    /// Creates a new canonical event with required fields.
    pub fn new(
        external_id: impl Into<String>,
        provider: Provider,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            provider,
            user_id: None,
            lead_id: None,
            title: title.into(),
            description: None,
            start,
            end,
            timezone: None,
            all_day: false,
            location_kind: LocationKind::Other,
            location_details: None,
            attendees: Vec::new(),
            organizer_email: None,
            organizer_name: FALLBACK_ORGANIZER_NAME.to_string(),
            online_meeting: false,
            online_meeting_provider: None,
            outcome: None,
            active: true,
        }
    }

    /// Returns the event duration.
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Builder method to set the owning user.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Builder method to set the associated lead.
    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the provider timezone name.
    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    /// Builder method to mark the event all-day.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// Builder method to set the location classification and details.
    pub fn with_location(mut self, kind: LocationKind, details: Option<String>) -> Self {
        self.location_kind = kind;
        self.location_details = details;
        self
    }

    /// Builder method to set the attendee list.
    pub fn with_attendees(mut self, attendees: Vec<Attendee>) -> Self {
        self.attendees = attendees;
        self
    }

    /// Builder method to set the organizer email and resolved name.
    pub fn with_organizer(mut self, email: Option<String>, name: impl Into<String>) -> Self {
        self.organizer_email = email;
        self.organizer_name = name.into();
        self
    }

    /// Builder method to mark the event as an online meeting.
    pub fn with_online_meeting(mut self, kind: ConferenceKind) -> Self {
        self.online_meeting = true;
        self.online_meeting_provider = Some(kind);
        self
    }

    /// Builder method to set the recorded outcome.
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }
}

/// An attendee supplied by a caller on create/update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeInput {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl AttendeeInput {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Caller-supplied fields for creating a provider event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub location_kind: LocationKind,
    #[serde(default)]
    pub location_details: Option<String>,
    #[serde(default)]
    pub attendees: Vec<AttendeeInput>,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl CreateEventRequest {
    /// Creates a new request with required fields.
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            start,
            end,
            timezone: None,
            all_day: false,
            location_kind: LocationKind::Other,
            location_details: None,
            attendees: Vec::new(),
            lead_id: None,
            user_id: None,
        }
    }

    /// Validates the request; runs before any provider call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        validate_interval(self.start, self.end)
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the timezone name sent to the provider.
    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    /// Builder method to mark the event all-day.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// Builder method to set the location classification and details.
    pub fn with_location(mut self, kind: LocationKind, details: Option<String>) -> Self {
        self.location_kind = kind;
        self.location_details = details;
        self
    }

    /// Builder method to set the attendee list.
    pub fn with_attendees(mut self, attendees: Vec<AttendeeInput>) -> Self {
        self.attendees = attendees;
        self
    }

    /// Builder method to link the event to a lead.
    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    /// Builder method to set the owning user.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
