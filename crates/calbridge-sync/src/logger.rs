//! The meeting logger.
//!
//! One call, three phases: validate fail-fast, persist the meeting
//! record (fatal on failure), then fan out independent best-effort side
//! effects. Side-effect ids that were actually obtained are patched back
//! onto the stored record so the timeline stays navigable.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use calbridge_core::{LogMeetingRequest, LoggedMeeting};
use calbridge_store::MirrorStore;

use crate::effects::{
    ActivityLogger, ActivityRecord, ObjectStorage, TaskCreator, TaskPayload, attempt,
};
use crate::error::SyncResult;

/// What one log call produced.
///
/// Each side-effect id is present only when the corresponding
/// best-effort call succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogMeetingOutcome {
    pub meeting_id: i64,
    pub activity_id: Option<String>,
    pub follow_up_task_id: Option<String>,
    pub attachment_url: Option<String>,
}

/// Validates, persists, and fans out the side effects of logged meetings.
pub struct MeetingLogger {
    store: MirrorStore,
    activity: Arc<dyn ActivityLogger>,
    tasks: Arc<dyn TaskCreator>,
    storage: Arc<dyn ObjectStorage>,
}

impl MeetingLogger {
    pub fn new(
        store: MirrorStore,
        activity: Arc<dyn ActivityLogger>,
        tasks: Arc<dyn TaskCreator>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            store,
            activity,
            tasks,
            storage,
        }
    }

    /// Logs one meeting.
    ///
    /// Validation failures reject the request before anything is
    /// written. The insert itself is fatal on failure. Activity logging,
    /// follow-up task creation, and the attachment access URL are each
    /// best-effort and independent: a failure degrades that field to
    /// `None` without failing the call or suppressing the others.
    pub async fn log_meeting(
        &self,
        request: &LogMeetingRequest,
        organization_id: &str,
    ) -> SyncResult<LogMeetingOutcome> {
        request.validate(organization_id)?;

        let meeting = self
            .store
            .insert_meeting(&LoggedMeeting::from_request(request, organization_id))?;

        let activity_id = self.log_meeting_activity(&meeting).await;
        let follow_up_task_id = self.create_follow_up_task(request, &meeting).await;

        if activity_id.is_some() || follow_up_task_id.is_some() {
            match self.store.attach_meeting_links(
                meeting.id,
                activity_id.as_deref(),
                follow_up_task_id.as_deref(),
            ) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(meeting_id = meeting.id, "meeting row missing during link backfill")
                }
                Err(error) => {
                    warn!(meeting_id = meeting.id, "failed to backfill side-effect ids: {error}")
                }
            }
        }

        let attachment_url = match &meeting.attachment_key {
            Some(key) => {
                attempt(
                    "attachment access url",
                    self.storage.generate_access_url(key.clone()),
                )
                .await
            }
            None => None,
        };

        info!(
            meeting_id = meeting.id,
            kind = meeting.kind.as_str(),
            "meeting logged"
        );
        Ok(LogMeetingOutcome {
            meeting_id: meeting.id,
            activity_id,
            follow_up_task_id,
            attachment_url,
        })
    }

    async fn log_meeting_activity(&self, meeting: &LoggedMeeting) -> Option<String> {
        let record = ActivityRecord {
            lead_id: meeting.lead_id.clone(),
            activity_type: "meeting_logged".to_string(),
            description: meeting.title.clone(),
            performed_by: Some(meeting.logged_by.clone()),
            metadata: serde_json::json!({
                "meeting_id": meeting.id,
                "kind": meeting.kind.as_str(),
                "outcome": meeting.outcome.as_str(),
            }),
        };
        attempt("activity log", self.activity.log_activity(record)).await
    }

    async fn create_follow_up_task(
        &self,
        request: &LogMeetingRequest,
        meeting: &LoggedMeeting,
    ) -> Option<String> {
        if !request.create_follow_up_task {
            return None;
        }
        let task = request.follow_up_task.as_ref()?;
        let payload = TaskPayload {
            title: task.title.clone(),
            due_at: task.due_at,
            notes: task.notes.clone(),
            lead_id: meeting.lead_id.clone(),
            assigned_to: meeting.logged_by.clone(),
        };
        attempt("follow-up task creation", self.tasks.create_task(payload)).await
    }
}
