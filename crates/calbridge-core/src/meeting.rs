//! Manually-logged meeting types.
//!
//! A logged meeting is recorded after the fact and is not backed by any
//! provider calendar event. It shares the unified feed with canonical
//! events but has its own lifecycle: created once, then patched only to
//! backfill the activity/task ids produced by downstream side effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How a logged meeting took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingKind {
    Virtual,
    InPerson,
    Phone,
}

impl MeetingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Virtual => "virtual",
            Self::InPerson => "in_person",
            Self::Phone => "phone",
        }
    }

    /// Parses the tag produced by [`MeetingKind::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "virtual" => Some(Self::Virtual),
            "in_person" => Some(Self::InPerson),
            "phone" => Some(Self::Phone),
            _ => None,
        }
    }
}

/// The recorded outcome of a logged meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingOutcome {
    Completed,
    FollowUpRequired,
    NoShow,
    Rescheduled,
}

impl MeetingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::FollowUpRequired => "follow_up_required",
            Self::NoShow => "no_show",
            Self::Rescheduled => "rescheduled",
        }
    }

    /// Parses the tag produced by [`MeetingOutcome::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "completed" => Some(Self::Completed),
            "follow_up_required" => Some(Self::FollowUpRequired),
            "no_show" => Some(Self::NoShow),
            "rescheduled" => Some(Self::Rescheduled),
            _ => None,
        }
    }
}

/// A participant in a logged meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the participant is outside the logging organization.
    #[serde(default)]
    pub external: bool,
}

impl Participant {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            external: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}

/// Details for the follow-up task a meeting log can request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpTask {
    pub title: String,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FollowUpTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            due_at: None,
            notes: None,
        }
    }

    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Caller-supplied fields for logging a meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMeetingRequest {
    pub title: String,
    pub kind: MeetingKind,
    /// Which service hosted the meeting; required iff `kind` is virtual.
    #[serde(default)]
    pub virtual_provider: Option<String>,
    /// When the meeting took place.
    pub occurred_at: DateTime<Utc>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub summary: Option<String>,
    pub outcome: MeetingOutcome,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub lead_id: Option<String>,
    /// The actor recording the meeting.
    pub logged_by: String,
    #[serde(default)]
    pub create_follow_up_task: bool,
    #[serde(default)]
    pub follow_up_task: Option<FollowUpTask>,
    /// Object-storage key of an uploaded attachment, when one exists.
    #[serde(default)]
    pub attachment_key: Option<String>,
}

impl LogMeetingRequest {
    /// Creates a new request with required fields.
    pub fn new(
        title: impl Into<String>,
        kind: MeetingKind,
        occurred_at: DateTime<Utc>,
        duration_minutes: i64,
        outcome: MeetingOutcome,
        logged_by: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            kind,
            virtual_provider: None,
            occurred_at,
            duration_minutes,
            summary: None,
            outcome,
            participants: Vec::new(),
            lead_id: None,
            logged_by: logged_by.into(),
            create_follow_up_task: false,
            follow_up_task: None,
            attachment_key: None,
        }
    }

    /// Validates the request against the given organization id.
    ///
    /// Runs before any persistence, so a failure here leaves no trace.
    pub fn validate(&self, organization_id: &str) -> Result<(), ValidationError> {
        if organization_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("organization id"));
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        if self.duration_minutes <= 0 {
            return Err(ValidationError::NonPositiveDuration);
        }
        if self.kind == MeetingKind::Virtual
            && self
                .virtual_provider
                .as_deref()
                .is_none_or(|tag| tag.trim().is_empty())
        {
            return Err(ValidationError::MissingVirtualProvider);
        }
        if self.create_follow_up_task && self.follow_up_task.is_none() {
            return Err(ValidationError::MissingFollowUpTask);
        }
        Ok(())
    }

    /// Builder method to set the virtual provider tag.
    pub fn with_virtual_provider(mut self, tag: impl Into<String>) -> Self {
        self.virtual_provider = Some(tag.into());
        self
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the participant list.
    pub fn with_participants(mut self, participants: Vec<Participant>) -> Self {
        self.participants = participants;
        self
    }

    /// Builder method to link the meeting to a lead.
    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    /// Builder method to request a follow-up task.
    pub fn with_follow_up_task(mut self, task: FollowUpTask) -> Self {
        self.create_follow_up_task = true;
        self.follow_up_task = Some(task);
        self
    }

    /// Builder method to reference an uploaded attachment.
    pub fn with_attachment_key(mut self, key: impl Into<String>) -> Self {
        self.attachment_key = Some(key.into());
        self
    }
}

/// A stored logged meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedMeeting {
    /// Store-assigned identifier; 0 until inserted.
    pub id: i64,
    pub title: String,
    pub kind: MeetingKind,
    pub virtual_provider: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub summary: Option<String>,
    pub outcome: MeetingOutcome,
    pub participants: Vec<Participant>,
    pub lead_id: Option<String>,
    pub logged_by: String,
    pub organization_id: String,
    /// Backfilled after the activity side effect resolves.
    pub activity_id: Option<String>,
    /// Backfilled after the task side effect resolves.
    pub follow_up_task_id: Option<String>,
    pub attachment_key: Option<String>,
    pub active: bool,
}

impl LoggedMeeting {
    /// Builds the record to persist from a validated request.
    pub fn from_request(request: &LogMeetingRequest, organization_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: request.title.clone(),
            kind: request.kind,
            virtual_provider: request.virtual_provider.clone(),
            occurred_at: request.occurred_at,
            duration_minutes: request.duration_minutes,
            summary: request.summary.clone(),
            outcome: request.outcome,
            participants: request.participants.clone(),
            lead_id: request.lead_id.clone(),
            logged_by: request.logged_by.clone(),
            organization_id: organization_id.into(),
            activity_id: None,
            follow_up_task_id: None,
            attachment_key: request.attachment_key.clone(),
            active: true,
        }
    }
}
