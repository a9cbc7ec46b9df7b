//! Core types: canonical events, logged meetings, patches, time windows

pub mod contact;
pub mod error;
pub mod event;
pub mod feed;
pub mod links;
pub mod meeting;
pub mod patch;
pub mod time;
pub mod tracing;

pub use contact::{Contact, Profile, dedup_contacts};
pub use error::ValidationError;
pub use event::{
    Attendee, AttendeeInput, CanonicalEvent, ConferenceKind, CreateEventRequest,
    FALLBACK_ORGANIZER_NAME, LocationKind, Provider, ResponseStatus,
};
pub use feed::{FeedItem, FeedSource};
pub use links::{classify_conference_url, detect_conference, unwrap_safelink};
pub use meeting::{
    FollowUpTask, LogMeetingRequest, LoggedMeeting, MeetingKind, MeetingOutcome, Participant,
};
pub use patch::{EventPatch, Patch};
pub use time::{EventWindow, MAX_EVENT_DURATION_HOURS, validate_interval};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
