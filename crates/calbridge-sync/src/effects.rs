//! Collaborator ports and the best-effort wrapper.
//!
//! Activity logging, task creation, and attachment storage are external
//! services this crate calls but never implements. Each port is an
//! object-safe trait so tests can substitute recording fakes. [`attempt`]
//! is the single place best-effort semantics live: await the future, keep
//! a success, warn and drop a failure. Callers of `attempt` never see a
//! collaborator error.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use calbridge_providers::BoxFuture;

/// An opaque failure from a collaborator service.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EffectError(pub String);

/// Convenience alias for collaborator results.
pub type EffectResult<T> = Result<T, EffectError>;

/// A new activity record for a lead timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub lead_id: Option<String>,
    pub activity_type: String,
    pub description: String,
    pub performed_by: Option<String>,
    pub metadata: Value,
}

/// A follow-up task to create in the external task service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPayload {
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub lead_id: Option<String>,
    pub assigned_to: String,
}

/// Logs activity records against lead timelines.
pub trait ActivityLogger: Send + Sync {
    /// Logs one activity record, returning its assigned id.
    fn log_activity(&self, record: ActivityRecord) -> BoxFuture<'_, EffectResult<String>>;
}

/// Creates follow-up tasks in the external task service.
pub trait TaskCreator: Send + Sync {
    /// Creates one task, returning its assigned id.
    fn create_task(&self, payload: TaskPayload) -> BoxFuture<'_, EffectResult<String>>;
}

/// Generates URLs for attachment objects held in external storage.
pub trait ObjectStorage: Send + Sync {
    fn generate_upload_url(
        &self,
        key: String,
        content_type: String,
    ) -> BoxFuture<'_, EffectResult<String>>;

    fn generate_access_url(&self, key: String) -> BoxFuture<'_, EffectResult<String>>;

    fn delete_object(&self, key: String) -> BoxFuture<'_, EffectResult<bool>>;
}

/// Runs one best-effort side effect.
///
/// A success yields the value; a failure is logged under `label` and
/// dropped.
pub async fn attempt<T, E, F>(label: &str, future: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match future.await {
        Ok(value) => Some(value),
        Err(error) => {
            warn!("best-effort {label} failed: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attempt_keeps_success() {
        let value = attempt("noop", async { Ok::<_, EffectError>(7) }).await;
        assert_eq!(value, Some(7));
    }

    #[tokio::test]
    async fn attempt_swallows_failure() {
        let value = attempt("noop", async {
            Err::<i32, _>(EffectError("service down".to_string()))
        })
        .await;
        assert_eq!(value, None);
    }

    #[test]
    fn activity_record_serializes_with_metadata() {
        let record = ActivityRecord {
            lead_id: Some("lead-1".to_string()),
            activity_type: "meeting_logged".to_string(),
            description: "Discovery call".to_string(),
            performed_by: Some("user-1".to_string()),
            metadata: serde_json::json!({"meeting_id": 42}),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["activity_type"], "meeting_logged");
        assert_eq!(json["metadata"]["meeting_id"], 42);
    }
}
