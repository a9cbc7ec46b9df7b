//! Event orchestration shared by both providers.
//!
//! One service owns the create/update/delete/list/contacts flow so the
//! two adapters cannot drift: routing happens at the gateway, the adapter
//! does the wire work, and mirror persistence plus activity logging are
//! applied here. Mirror writes after a successful provider call are
//! best-effort; in the credential-less local branch the mirror is the
//! primary store and its failures are fatal.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use calbridge_core::{
    CanonicalEvent, Contact, CreateEventRequest, EventPatch, EventWindow, Provider,
};
use calbridge_store::MirrorStore;

use crate::config::SyncConfig;
use crate::effects::{ActivityLogger, ActivityRecord, attempt};
use crate::error::{SyncError, SyncResult};
use crate::gateway::{Route, SyncGateway};

/// The outcome of a delete operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteOutcome {
    pub message: String,
    pub event_id: String,
}

/// Orchestrates provider calls, mirror persistence, and activity logging.
pub struct EventService {
    gateway: SyncGateway,
    store: MirrorStore,
    activity: Arc<dyn ActivityLogger>,
    config: SyncConfig,
}

impl EventService {
    pub fn new(
        gateway: SyncGateway,
        store: MirrorStore,
        activity: Arc<dyn ActivityLogger>,
        config: SyncConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            activity,
            config,
        }
    }

    /// Lists upstream events and refreshes the local mirror from them.
    ///
    /// Without an explicit window, the configured lookahead window is
    /// used. Mirror refresh is best-effort; a store failure is logged and
    /// the listing is still returned.
    pub async fn list_events(
        &self,
        authorization: Option<&str>,
        provider_tag: Option<&str>,
        window: Option<EventWindow>,
    ) -> SyncResult<Vec<CanonicalEvent>> {
        let route = self.gateway.require_provider(authorization, provider_tag)?;
        let window = window
            .unwrap_or_else(|| EventWindow::lookahead(Utc::now(), self.config.lookahead_days));

        let events = route
            .adapter()
            .list_events(route.token.clone(), window)
            .await?;

        for event in &events {
            if let Err(error) = self.store.upsert_event(event) {
                warn!("mirror refresh failed for {}: {error}", event.external_id);
            }
        }
        debug!(provider = %route.provider, count = events.len(), "listed events");
        Ok(events)
    }

    /// Creates an event upstream, then mirrors it and logs an activity.
    ///
    /// The provider-side event exists once the adapter returns; local
    /// bookkeeping failures must not undo a successful create.
    pub async fn create_event(
        &self,
        authorization: Option<&str>,
        provider_tag: Option<&str>,
        request: CreateEventRequest,
    ) -> SyncResult<CanonicalEvent> {
        let route = self.gateway.require_provider(authorization, provider_tag)?;
        let event = route
            .adapter()
            .create_event(route.token.clone(), request)
            .await?;

        if let Err(error) = self.store.upsert_event(&event) {
            warn!("failed to mirror created event {}: {error}", event.external_id);
        }
        self.log_event_activity("event_created", &event).await;

        info!(provider = %route.provider, event_id = %event.external_id, "event created");
        Ok(event)
    }

    /// Applies a sparse patch to an event.
    ///
    /// With credentials the adapter updates upstream first and the mirror
    /// follows best-effort. Without any credentials the patch applies to
    /// the mirror record found by external id; that branch has no
    /// upstream call, and a store failure is fatal.
    pub async fn update_event(
        &self,
        authorization: Option<&str>,
        provider_tag: Option<&str>,
        event_id: &str,
        patch: EventPatch,
    ) -> SyncResult<CanonicalEvent> {
        if patch.is_empty() {
            return Err(SyncError::InvalidRequest(
                "patch contains no changes".to_string(),
            ));
        }
        patch.validate()?;

        match self.gateway.resolve(authorization, provider_tag)? {
            Route::Provider(route) => {
                let event = route
                    .adapter()
                    .update_event(route.token.clone(), event_id.to_string(), patch.clone())
                    .await?;

                let updated = self.mirror_update(&event, &patch).unwrap_or(event);
                if updated.lead_id.is_some() {
                    self.log_event_activity("event_updated", &updated).await;
                }
                info!(provider = %route.provider, event_id = %updated.external_id, "event updated");
                Ok(updated)
            }
            Route::Local => self.update_local(event_id, &patch),
        }
    }

    /// Deletes an event.
    ///
    /// With credentials the upstream delete is attempted but its failure
    /// is non-fatal; the mirror is always soft-deleted. Without
    /// credentials only the mirror is touched and a missing record is
    /// NotFound.
    pub async fn delete_event(
        &self,
        authorization: Option<&str>,
        provider_tag: Option<&str>,
        event_id: &str,
    ) -> SyncResult<DeleteOutcome> {
        match self.gateway.resolve(authorization, provider_tag)? {
            Route::Provider(route) => {
                let existing = self
                    .store
                    .find_event_by_external_id(route.provider, event_id)?;

                let upstream = attempt(
                    "provider delete",
                    route
                        .adapter()
                        .delete_event(route.token.clone(), event_id.to_string()),
                )
                .await;

                if let Err(error) = self.store.soft_delete_event(route.provider, event_id) {
                    warn!("mirror soft-delete failed for {event_id}: {error}");
                }
                if let Some(event) = existing.filter(|event| event.lead_id.is_some()) {
                    self.log_event_activity("event_deleted", &event).await;
                }

                let message = if upstream.is_some() {
                    "event deleted".to_string()
                } else {
                    "event deleted locally; provider delete failed".to_string()
                };
                info!(provider = %route.provider, event_id, "event deleted");
                Ok(DeleteOutcome {
                    message,
                    event_id: event_id.to_string(),
                })
            }
            Route::Local => {
                let existing = self.find_local(event_id)?;
                self.store
                    .soft_delete_event(existing.provider, event_id)?;
                info!(event_id, "event deleted locally");
                Ok(DeleteOutcome {
                    message: "event deleted locally".to_string(),
                    event_id: event_id.to_string(),
                })
            }
        }
    }

    /// Fetches the provider's contacts; nothing is persisted.
    pub async fn get_contacts(
        &self,
        authorization: Option<&str>,
        provider_tag: Option<&str>,
    ) -> SyncResult<Vec<Contact>> {
        let route = self.gateway.require_provider(authorization, provider_tag)?;
        let contacts = route.adapter().get_contacts(route.token.clone()).await?;
        debug!(provider = %route.provider, count = contacts.len(), "fetched contacts");
        Ok(contacts)
    }

    /// Mirrors a provider update: provider-sourced columns come from the
    /// returned event, locally owned fields (lead, outcome) follow the
    /// caller's patch. Returns the mirrored record when both writes land.
    fn mirror_update(&self, event: &CanonicalEvent, patch: &EventPatch) -> Option<CanonicalEvent> {
        if let Err(error) = self.store.upsert_event(event) {
            warn!("mirror refresh failed for {}: {error}", event.external_id);
            return None;
        }
        match self
            .store
            .apply_event_patch(event.provider, &event.external_id, patch, None)
        {
            Ok(updated) => updated,
            Err(error) => {
                warn!("mirror patch failed for {}: {error}", event.external_id);
                None
            }
        }
    }

    fn update_local(&self, event_id: &str, patch: &EventPatch) -> SyncResult<CanonicalEvent> {
        let existing = self.find_local(event_id)?;
        let times = patch
            .touches_times()
            .then(|| patch.resolve_times(existing.start, existing.end));
        let updated = self
            .store
            .apply_event_patch(existing.provider, event_id, patch, times)?
            .ok_or_else(|| SyncError::NotFound(format!("no local event {event_id}")))?;
        info!(event_id, "event updated locally");
        Ok(updated)
    }

    /// Finds an active mirror record by external id alone, trying each
    /// provider's keyspace in turn.
    fn find_local(&self, event_id: &str) -> SyncResult<CanonicalEvent> {
        for provider in [Provider::Google, Provider::Microsoft] {
            if let Some(event) = self.store.find_event_by_external_id(provider, event_id)? {
                return Ok(event);
            }
        }
        Err(SyncError::NotFound(format!("no local event {event_id}")))
    }

    async fn log_event_activity(&self, activity_type: &str, event: &CanonicalEvent) {
        let record = ActivityRecord {
            lead_id: event.lead_id.clone(),
            activity_type: activity_type.to_string(),
            description: event.title.clone(),
            performed_by: event.user_id.clone(),
            metadata: serde_json::json!({
                "provider": event.provider.as_str(),
                "external_id": event.external_id,
            }),
        };
        attempt("activity log", self.activity.log_activity(record)).await;
    }
}
