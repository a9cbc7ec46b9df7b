//! Shared test doubles for service-layer tests.

use parking_lot::Mutex;

use calbridge_core::{
    CanonicalEvent, Contact, CreateEventRequest, EventPatch, EventWindow, Profile, Provider,
};
use calbridge_providers::{BoxFuture, CalendarProvider, ProviderError, ProviderResult};

use crate::effects::{
    ActivityLogger, ActivityRecord, EffectError, EffectResult, ObjectStorage, TaskCreator,
    TaskPayload,
};

/// A scriptable provider serving canned data and recording every call.
pub(crate) struct StubProvider {
    kind: Provider,
    events: Vec<CanonicalEvent>,
    contacts: Vec<Contact>,
    profile: Option<Profile>,
    fail_delete: bool,
    calls: Mutex<Vec<String>>,
}

impl StubProvider {
    pub(crate) fn new(kind: Provider) -> Self {
        Self {
            kind,
            events: Vec::new(),
            contacts: Vec::new(),
            profile: None,
            fail_delete: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_events(mut self, events: Vec<CanonicalEvent>) -> Self {
        self.events = events;
        self
    }

    pub(crate) fn with_contacts(mut self, contacts: Vec<Contact>) -> Self {
        self.contacts = contacts;
        self
    }

    pub(crate) fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub(crate) fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }
}

impl CalendarProvider for StubProvider {
    fn kind(&self) -> Provider {
        self.kind
    }

    fn list_events(
        &self,
        _token: String,
        _window: EventWindow,
    ) -> BoxFuture<'_, ProviderResult<Vec<CanonicalEvent>>> {
        self.record("list_events");
        let events = self.events.clone();
        Box::pin(async move { Ok(events) })
    }

    fn create_event(
        &self,
        _token: String,
        request: CreateEventRequest,
    ) -> BoxFuture<'_, ProviderResult<CanonicalEvent>> {
        self.record("create_event");
        let kind = self.kind;
        Box::pin(async move {
            let mut event = CanonicalEvent::new(
                "created-1",
                kind,
                request.title.clone(),
                request.start,
                request.end,
            );
            event.lead_id = request.lead_id.clone();
            event.user_id = request.user_id.clone();
            event.location_kind = request.location_kind;
            Ok(event)
        })
    }

    fn update_event(
        &self,
        _token: String,
        event_id: String,
        patch: EventPatch,
    ) -> BoxFuture<'_, ProviderResult<CanonicalEvent>> {
        self.record("update_event");
        let existing = self
            .events
            .iter()
            .find(|event| event.external_id == event_id)
            .cloned();
        Box::pin(async move {
            let mut event =
                existing.ok_or_else(|| ProviderError::not_found("calendar resource not found"))?;
            if let Some(title) = &patch.title {
                event.title = title.clone();
            }
            let (start, end) = patch.resolve_times(event.start, event.end);
            event.start = start;
            event.end = end;
            Ok(event)
        })
    }

    fn delete_event(&self, _token: String, _event_id: String) -> BoxFuture<'_, ProviderResult<()>> {
        self.record("delete_event");
        let fail = self.fail_delete;
        Box::pin(async move {
            if fail {
                Err(ProviderError::server("delete backend unavailable"))
            } else {
                Ok(())
            }
        })
    }

    fn get_contacts(&self, _token: String) -> BoxFuture<'_, ProviderResult<Vec<Contact>>> {
        self.record("get_contacts");
        let contacts = self.contacts.clone();
        Box::pin(async move { Ok(contacts) })
    }

    fn lookup_profile(&self, _token: String) -> BoxFuture<'_, ProviderResult<Profile>> {
        self.record("lookup_profile");
        let profile = self.profile.clone();
        Box::pin(async move {
            profile.ok_or_else(|| ProviderError::server("profile backend unavailable"))
        })
    }
}

/// Records activity calls; optionally fails after recording, so callers
/// can still assert the attempt was made.
pub(crate) struct RecordingActivityLogger {
    records: Mutex<Vec<ActivityRecord>>,
    fail: bool,
}

impl RecordingActivityLogger {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn recorded(&self) -> Vec<ActivityRecord> {
        self.records.lock().clone()
    }
}

impl ActivityLogger for RecordingActivityLogger {
    fn log_activity(&self, record: ActivityRecord) -> BoxFuture<'_, EffectResult<String>> {
        let mut records = self.records.lock();
        records.push(record);
        let id = format!("act-{}", records.len());
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(EffectError("activity service down".to_string()))
            } else {
                Ok(id)
            }
        })
    }
}

/// Records task payloads; optionally fails after recording.
pub(crate) struct RecordingTaskCreator {
    payloads: Mutex<Vec<TaskPayload>>,
    fail: bool,
}

impl RecordingTaskCreator {
    pub(crate) fn new() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn recorded(&self) -> Vec<TaskPayload> {
        self.payloads.lock().clone()
    }
}

impl TaskCreator for RecordingTaskCreator {
    fn create_task(&self, payload: TaskPayload) -> BoxFuture<'_, EffectResult<String>> {
        let mut payloads = self.payloads.lock();
        payloads.push(payload);
        let id = format!("task-{}", payloads.len());
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(EffectError("task service down".to_string()))
            } else {
                Ok(id)
            }
        })
    }
}

/// Serves deterministic URLs; optionally fails every call.
pub(crate) struct StaticObjectStorage {
    fail: bool,
}

impl StaticObjectStorage {
    pub(crate) fn new() -> Self {
        Self { fail: false }
    }

    pub(crate) fn failing() -> Self {
        Self { fail: true }
    }

    fn url(&self, key: &str) -> EffectResult<String> {
        if self.fail {
            Err(EffectError("storage service down".to_string()))
        } else {
            Ok(format!("https://files.example/{key}"))
        }
    }
}

impl ObjectStorage for StaticObjectStorage {
    fn generate_upload_url(
        &self,
        key: String,
        _content_type: String,
    ) -> BoxFuture<'_, EffectResult<String>> {
        let result = self.url(&key);
        Box::pin(async move { result })
    }

    fn generate_access_url(&self, key: String) -> BoxFuture<'_, EffectResult<String>> {
        let result = self.url(&key);
        Box::pin(async move { result })
    }

    fn delete_object(&self, _key: String) -> BoxFuture<'_, EffectResult<bool>> {
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(EffectError("storage service down".to_string()))
            } else {
                Ok(true)
            }
        })
    }
}
