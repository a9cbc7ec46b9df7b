//! Low-level Google Calendar v3 client.
//!
//! Owns the wire DTOs, the request plumbing, and the conversion of API
//! events into [`CanonicalEvent`]; the provider wrapper above it adds
//! validation and error tagging.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use calbridge_core::{
    Attendee, AttendeeInput, CanonicalEvent, ConferenceKind, CreateEventRequest, EventPatch,
    EventWindow, LocationKind, Patch, Profile, Provider, ResponseStatus, classify_conference_url,
};

use crate::error::ProviderResult;
use crate::http::{build_client, handle_response, network_error, parse_json};
use crate::normalize::{reconcile_location, resolve_organizer_name};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Thin HTTP client over the Calendar v3 endpoints.
#[derive(Debug)]
pub(super) struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Creates a new Google Calendar client.
    pub(super) fn new(timeout: Duration) -> Self {
        Self {
            http_client: build_client(timeout),
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    /// Points the client at a different API root, for tests.
    pub(super) fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lists events from the primary calendar within the window.
    ///
    /// Recurring events are expanded server-side; pagination is followed
    /// until the API stops returning a `nextPageToken`.
    pub(super) async fn list_events(
        &self,
        token: &str,
        window: &EventWindow,
    ) -> ProviderResult<Vec<ApiEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(token, window, page_token.as_deref())
                .await?;

            all_events.extend(page.items);

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!("fetched {} events from google calendar", all_events.len());
        Ok(all_events)
    }

    async fn list_events_page(
        &self,
        token: &str,
        window: &EventWindow,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!("{}/calendars/primary/events", self.base_url);

        let mut request = self.http_client.get(&url).bearer_auth(token).query(&[
            ("timeMin", window.start.to_rfc3339()),
            ("timeMax", window.end.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token.to_string())]);
        }

        let response = request.send().await.map_err(network_error)?;
        let body = handle_response(response).await?;
        parse_json(&body)
    }

    /// Fetches a single event by id.
    pub(super) async fn get_event(&self, token: &str, event_id: &str) -> ProviderResult<ApiEvent> {
        let url = format!(
            "{}/calendars/primary/events/{}",
            self.base_url,
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;

        let body = handle_response(response).await?;
        parse_json(&body)
    }

    /// Creates an event on the primary calendar.
    ///
    /// A Google Meet location kind adds `conferenceDataVersion=1` plus a
    /// conference create request; other kinds write a plain location.
    pub(super) async fn insert_event(
        &self,
        token: &str,
        request: &CreateEventRequest,
    ) -> ProviderResult<ApiEvent> {
        let mut url = format!("{}/calendars/primary/events", self.base_url);
        if request.location_kind == LocationKind::GoogleMeet {
            url.push_str("?conferenceDataVersion=1");
        }

        let body = EventWriteBody::from_create(request);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let body = handle_response(response).await?;
        parse_json(&body)
    }

    /// Applies a sparse patch to an event.
    ///
    /// `times` carries the resolved start/end pair and the effective all-day
    /// flag when the patch touches the interval; `None` leaves both bounds
    /// untouched upstream.
    pub(super) async fn patch_event(
        &self,
        token: &str,
        event_id: &str,
        patch: &EventPatch,
        times: Option<(DateTime<Utc>, DateTime<Utc>, bool)>,
    ) -> ProviderResult<ApiEvent> {
        let url = format!(
            "{}/calendars/primary/events/{}",
            self.base_url,
            urlencoding::encode(event_id)
        );

        let body = EventWriteBody::from_patch(patch, times);
        let response = self
            .http_client
            .patch(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let body = handle_response(response).await?;
        parse_json(&body)
    }

    /// Deletes an event from the primary calendar.
    pub(super) async fn delete_event(&self, token: &str, event_id: &str) -> ProviderResult<()> {
        let url = format!(
            "{}/calendars/primary/events/{}",
            self.base_url,
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;

        handle_response(response).await?;
        Ok(())
    }
}

/// Converts a Google Calendar API event into a canonical event.
///
/// Returns `None` for cancelled events and payloads missing an id or a
/// parseable interval; those are skipped with a warning rather than failing
/// the whole listing.
pub(super) fn normalize_event(
    event: ApiEvent,
    profile: Option<&Profile>,
) -> Option<CanonicalEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let native = native_conference(&event);
    let timezone = event.start.time_zone.clone();

    let id = event.id?;
    let title = event.summary.unwrap_or_default();

    let (start, all_day) = parse_event_time(&event.start, &id, "start")?;
    let (end, _) = parse_event_time(&event.end, &id, "end")?;

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email?;
            let mut attendee = Attendee::new(email)
                .with_response_status(response_status(a.response_status.as_deref()));
            if let Some(name) = a.display_name {
                attendee = attendee.with_display_name(name);
            }
            Some(attendee)
        })
        .collect();

    let (location_kind, _online, conference) = reconcile_location(
        native,
        event.location.as_deref(),
        event.description.as_deref(),
    );

    let organizer_email = event.organizer.as_ref().and_then(|o| o.email.clone());
    let organizer_name = resolve_organizer_name(
        event.organizer.as_ref().and_then(|o| o.display_name.as_deref()),
        organizer_email.as_deref(),
        profile,
    );

    let location_details = event.location.filter(|l| !l.trim().is_empty());

    let mut canonical = CanonicalEvent::new(id, Provider::Google, title, start, end)
        .with_all_day(all_day)
        .with_location(location_kind, location_details)
        .with_attendees(attendees)
        .with_organizer(organizer_email, organizer_name);

    if let Some(kind) = conference {
        canonical = canonical.with_online_meeting(kind);
    }
    if let Some(description) = event.description {
        canonical = canonical.with_description(description);
    }
    if let Some(tz) = timezone {
        canonical = canonical.with_timezone(tz);
    }

    Some(canonical)
}

/// Detects an online meeting from the event's native conference fields.
fn native_conference(event: &ApiEvent) -> Option<ConferenceKind> {
    if let Some(link) = event.hangout_link.as_deref() {
        return Some(classify_conference_url(link));
    }

    event
        .conference_data
        .as_ref()?
        .entry_points
        .as_deref()?
        .iter()
        .filter_map(|ep| ep.uri.as_deref())
        .map(classify_conference_url)
        .find(|kind| *kind != ConferenceKind::Other)
}

fn parse_event_time(time: &ApiEventTime, id: &str, which: &str) -> Option<(DateTime<Utc>, bool)> {
    match (&time.date_time, &time.date) {
        (Some(dt), _) => {
            let parsed = DateTime::parse_from_rfc3339(dt)
                .map_err(|e| warn!("failed to parse {} time for event {}: {}", which, id, e))
                .ok()?;
            Some((parsed.with_timezone(&Utc), false))
        }
        (None, Some(date)) => {
            let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| warn!("failed to parse {} date for event {}: {}", which, id, e))
                .ok()?;
            Some((parsed.and_time(NaiveTime::MIN).and_utc(), true))
        }
        (None, None) => {
            warn!("event {} has no {} time", id, which);
            None
        }
    }
}

fn response_status(status: Option<&str>) -> ResponseStatus {
    match status {
        Some("accepted") => ResponseStatus::Accepted,
        Some("declined") => ResponseStatus::Declined,
        Some("tentative") => ResponseStatus::Tentative,
        Some("needsAction") => ResponseStatus::NeedsAction,
        _ => ResponseStatus::Unknown,
    }
}

/// Page envelope for `events.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// One event as the API returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: ApiEventTime,
    end: ApiEventTime,
    status: Option<String>,
    attendees: Option<Vec<ApiAttendee>>,
    pub(super) organizer: Option<ApiOrganizer>,
    hangout_link: Option<String>,
    conference_data: Option<ApiConferenceData>,
}

/// Carries a `dateTime` for timed events or a bare `date` for all-day.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    display_name: Option<String>,
    response_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiOrganizer {
    pub(super) email: Option<String>,
    pub(super) display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiConferenceData {
    entry_points: Option<Vec<ApiEntryPoint>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEntryPoint {
    uri: Option<String>,
}

/// Write payload for event insert and patch calls.
///
/// Absent fields are omitted so Google leaves them untouched; a cleared
/// [`Patch`] field serializes as an explicit `null`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventWriteBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    description: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    location: Patch<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<EventTimeBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<EventTimeBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<AttendeeBody>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conference_data: Option<ConferenceDataBody>,
}

impl EventWriteBody {
    fn from_create(request: &CreateEventRequest) -> Self {
        let (start, end) = if request.all_day {
            (
                EventTimeBody::all_day(request.start),
                EventTimeBody::all_day(request.end),
            )
        } else {
            (
                EventTimeBody::timed(request.start, request.timezone.as_deref()),
                EventTimeBody::timed(request.end, request.timezone.as_deref()),
            )
        };

        let attendees: Vec<AttendeeBody> =
            request.attendees.iter().map(AttendeeBody::from_input).collect();

        Self {
            summary: Some(request.title.clone()),
            description: request.description.clone().map_or(Patch::Keep, Patch::Set),
            location: request
                .location_details
                .clone()
                .filter(|l| !l.trim().is_empty())
                .map_or(Patch::Keep, Patch::Set),
            start: Some(start),
            end: Some(end),
            attendees: (!attendees.is_empty()).then_some(attendees),
            conference_data: (request.location_kind == LocationKind::GoogleMeet)
                .then(ConferenceDataBody::meet),
        }
    }

    fn from_patch(patch: &EventPatch, times: Option<(DateTime<Utc>, DateTime<Utc>, bool)>) -> Self {
        let (start, end) = match times {
            Some((start, end, true)) => (
                Some(EventTimeBody::all_day(start)),
                Some(EventTimeBody::all_day(end)),
            ),
            Some((start, end, false)) => (
                Some(EventTimeBody::timed(start, patch.timezone.as_deref())),
                Some(EventTimeBody::timed(end, patch.timezone.as_deref())),
            ),
            None => (None, None),
        };

        Self {
            summary: patch.title.clone(),
            description: patch.description.clone(),
            location: patch.location_details.clone(),
            start,
            end,
            attendees: patch
                .attendees
                .as_ref()
                .map(|list| list.iter().map(AttendeeBody::from_input).collect()),
            conference_data: None,
        }
    }
}

/// Event time in a write payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTimeBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl EventTimeBody {
    fn timed(at: DateTime<Utc>, time_zone: Option<&str>) -> Self {
        Self {
            date: None,
            date_time: Some(at.to_rfc3339()),
            time_zone: time_zone.map(String::from),
        }
    }

    fn all_day(at: DateTime<Utc>) -> Self {
        Self {
            date: Some(at.format("%Y-%m-%d").to_string()),
            date_time: None,
            time_zone: None,
        }
    }
}

/// Attendee in a write payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttendeeBody {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

impl AttendeeBody {
    fn from_input(input: &AttendeeInput) -> Self {
        Self {
            email: input.email.clone(),
            display_name: input.display_name.clone(),
        }
    }
}

/// Conference provisioning request in a write payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceDataBody {
    create_request: ConferenceCreateRequest,
}

impl ConferenceDataBody {
    fn meet() -> Self {
        Self {
            create_request: ConferenceCreateRequest {
                request_id: format!(
                    "calbridge-{}",
                    Utc::now().timestamp_nanos_opt().unwrap_or_default()
                ),
                conference_solution_key: ConferenceSolutionKey {
                    kind: "hangoutsMeet".to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceCreateRequest {
    request_id: String,
    conference_solution_key: ConferenceSolutionKey,
}

#[derive(Debug, Serialize)]
struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "summary": "Discovery Call",
                    "start": {
                        "dateTime": "2025-03-15T10:00:00Z"
                    },
                    "end": {
                        "dateTime": "2025-03-15T11:00:00Z"
                    },
                    "status": "confirmed"
                }
            ],
            "nextPageToken": "page-2"
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn normalize_maps_core_fields() {
        let json = r#"{
            "id": "event1",
            "summary": "Discovery Call",
            "description": "Agenda attached",
            "location": "Conference Room 4",
            "start": {
                "dateTime": "2025-03-15T10:00:00Z",
                "timeZone": "Europe/Paris"
            },
            "end": {
                "dateTime": "2025-03-15T11:00:00Z"
            },
            "organizer": {
                "email": "ana@example.com",
                "displayName": "Ana Lima"
            },
            "attendees": [
                {
                    "email": "bo@example.com",
                    "displayName": "Bo",
                    "responseStatus": "accepted"
                },
                {
                    "email": "cy@example.com",
                    "responseStatus": "needsAction"
                }
            ]
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let canonical = normalize_event(event, None).unwrap();

        assert_eq!(canonical.external_id, "event1");
        assert_eq!(canonical.provider, Provider::Google);
        assert_eq!(canonical.start, utc(2025, 3, 15, 10, 0, 0));
        assert_eq!(canonical.duration(), chrono::Duration::hours(1));
        assert_eq!(canonical.timezone.as_deref(), Some("Europe/Paris"));
        assert_eq!(canonical.location_kind, LocationKind::InPerson);
        assert!(!canonical.online_meeting);
        assert_eq!(canonical.organizer_name, "Ana Lima");
        assert_eq!(canonical.attendees.len(), 2);
        assert_eq!(canonical.attendees[0].response_status, ResponseStatus::Accepted);
        assert_eq!(
            canonical.attendees[1].response_status,
            ResponseStatus::NeedsAction
        );
    }

    #[test]
    fn normalize_skips_cancelled_events() {
        let json = r#"{
            "id": "event1",
            "summary": "Gone",
            "status": "cancelled",
            "start": {"dateTime": "2025-03-15T10:00:00Z"},
            "end": {"dateTime": "2025-03-15T11:00:00Z"}
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(normalize_event(event, None).is_none());
    }

    #[test]
    fn normalize_all_day_event() {
        let json = r#"{
            "id": "event1",
            "summary": "Offsite",
            "start": {"date": "2025-03-15"},
            "end": {"date": "2025-03-16"}
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let canonical = normalize_event(event, None).unwrap();

        assert!(canonical.all_day);
        assert_eq!(canonical.start, utc(2025, 3, 15, 0, 0, 0));
        assert_eq!(canonical.end, utc(2025, 3, 16, 0, 0, 0));
    }

    #[test]
    fn normalize_detects_meet_from_hangout_link() {
        let json = r#"{
            "id": "event1",
            "summary": "Sync",
            "hangoutLink": "https://meet.google.com/abc-defg-hij",
            "start": {"dateTime": "2025-03-15T10:00:00Z"},
            "end": {"dateTime": "2025-03-15T10:30:00Z"}
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let canonical = normalize_event(event, None).unwrap();

        assert!(canonical.online_meeting);
        assert_eq!(canonical.location_kind, LocationKind::GoogleMeet);
        assert_eq!(
            canonical.online_meeting_provider,
            Some(ConferenceKind::GoogleMeet)
        );
    }

    #[test]
    fn normalize_detects_zoom_from_conference_entry_points() {
        let json = r#"{
            "id": "event1",
            "summary": "External sync",
            "conferenceData": {
                "entryPoints": [
                    {"uri": "tel:+1-555-0100"},
                    {"uri": "https://zoom.us/j/123456789"}
                ]
            },
            "start": {"dateTime": "2025-03-15T10:00:00Z"},
            "end": {"dateTime": "2025-03-15T10:30:00Z"}
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let canonical = normalize_event(event, None).unwrap();

        assert!(canonical.online_meeting);
        assert_eq!(canonical.online_meeting_provider, Some(ConferenceKind::Zoom));
    }

    #[test]
    fn create_body_requests_meet_conference() {
        let request = CreateEventRequest::new(
            "Kickoff",
            utc(2025, 3, 15, 10, 0, 0),
            utc(2025, 3, 15, 11, 0, 0),
        )
        .with_location(LocationKind::GoogleMeet, None);

        let body = serde_json::to_value(EventWriteBody::from_create(&request)).unwrap();
        assert_eq!(body["summary"], "Kickoff");
        assert_eq!(
            body["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
        assert_eq!(body["start"]["dateTime"], "2025-03-15T10:00:00+00:00");
    }

    #[test]
    fn create_body_in_person_suppresses_conference() {
        let request = CreateEventRequest::new(
            "Kickoff",
            utc(2025, 3, 15, 10, 0, 0),
            utc(2025, 3, 15, 11, 0, 0),
        )
        .with_location(LocationKind::InPerson, Some("Room 4".to_string()));

        let body = serde_json::to_value(EventWriteBody::from_create(&request)).unwrap();
        assert_eq!(body["location"], "Room 4");
        assert!(body.get("conferenceData").is_none());
    }

    #[test]
    fn create_body_all_day_uses_date_fields() {
        let request = CreateEventRequest::new(
            "Offsite",
            utc(2025, 3, 15, 0, 0, 0),
            utc(2025, 3, 16, 0, 0, 0),
        )
        .with_all_day(true);

        let body = serde_json::to_value(EventWriteBody::from_create(&request)).unwrap();
        assert_eq!(body["start"]["date"], "2025-03-15");
        assert!(body["start"].get("dateTime").is_none());
    }

    #[test]
    fn patch_body_only_carries_supplied_fields() {
        let patch = EventPatch {
            title: Some("Renamed".to_string()),
            description: Patch::Clear,
            ..Default::default()
        };

        let body = serde_json::to_value(EventWriteBody::from_patch(&patch, None)).unwrap();
        assert_eq!(body["summary"], "Renamed");
        assert_eq!(body["description"], serde_json::Value::Null);
        assert!(body.get("location").is_none());
        assert!(body.get("start").is_none());
        assert!(body.get("attendees").is_none());
    }

    #[test]
    fn patch_body_writes_resolved_interval() {
        let patch = EventPatch::default();
        let times = Some((utc(2025, 3, 12, 14, 0, 0), utc(2025, 3, 12, 15, 30, 0), false));

        let body = serde_json::to_value(EventWriteBody::from_patch(&patch, times)).unwrap();
        assert_eq!(body["start"]["dateTime"], "2025-03-12T14:00:00+00:00");
        assert_eq!(body["end"]["dateTime"], "2025-03-12T15:30:00+00:00");
    }
}
