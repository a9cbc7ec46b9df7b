//! Microsoft Graph API client.
//!
//! This module provides a low-level HTTP client for the Microsoft Graph
//! calendar, contacts, and profile endpoints, and normalizes Graph events
//! into [`CanonicalEvent`].

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use calbridge_core::{
    Attendee, AttendeeInput, CanonicalEvent, ConferenceKind, Contact, CreateEventRequest,
    EventPatch, EventWindow, LocationKind, Patch, Profile, Provider, ResponseStatus,
    classify_conference_url, dedup_contacts,
};

use crate::error::ProviderResult;
use crate::http::{build_client, handle_response, network_error, parse_json};
use crate::normalize::{reconcile_location, resolve_organizer_name};

/// Base URL for Microsoft Graph v1.0.
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Pins event times in responses to UTC regardless of mailbox settings.
const PREFER_UTC: &str = "outlook.timezone=\"UTC\"";

/// Microsoft Graph API client.
#[derive(Debug)]
pub(super) struct GraphClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    /// Creates a new Graph client.
    pub(super) fn new(timeout: Duration) -> Self {
        Self {
            http_client: build_client(timeout),
            base_url: GRAPH_API_BASE.to_string(),
        }
    }

    /// Points the client at a different API root, for tests.
    pub(super) fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lists events within the window via `/me/calendarView`.
    ///
    /// The calendar view expands recurring events server-side. Pagination
    /// follows `@odata.nextLink`, which is an absolute URL carrying its own
    /// query string.
    pub(super) async fn list_events(
        &self,
        token: &str,
        window: &EventWindow,
    ) -> ProviderResult<Vec<GraphEvent>> {
        let first = format!("{}/me/calendarView", self.base_url);
        let mut events = Vec::new();
        let mut next: Option<String> = None;

        loop {
            let request = match next.as_deref() {
                Some(url) => self.http_client.get(url),
                None => self.http_client.get(&first).query(&[
                    ("startDateTime", window.start.to_rfc3339()),
                    ("endDateTime", window.end.to_rfc3339()),
                    ("$top", "100".to_string()),
                ]),
            };

            let response = request
                .bearer_auth(token)
                .header("Prefer", PREFER_UTC)
                .send()
                .await
                .map_err(network_error)?;

            let body = handle_response(response).await?;
            let page: EventListResponse = parse_json(&body)?;
            events.extend(page.value);

            match page.next_link {
                Some(link) => next = Some(link),
                None => break,
            }
        }

        debug!("listed {} events from microsoft graph", events.len());
        Ok(events)
    }

    /// Fetches a single event by id.
    pub(super) async fn get_event(
        &self,
        token: &str,
        event_id: &str,
    ) -> ProviderResult<GraphEvent> {
        let url = format!("{}/me/events/{}", self.base_url, urlencoding::encode(event_id));

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .header("Prefer", PREFER_UTC)
            .send()
            .await
            .map_err(network_error)?;

        let body = handle_response(response).await?;
        parse_json(&body)
    }

    /// Creates an event on the default calendar.
    ///
    /// A Teams location kind sets the online-meeting flags so Graph
    /// provisions a join link; other kinds write a plain location.
    pub(super) async fn create_event(
        &self,
        token: &str,
        request: &CreateEventRequest,
    ) -> ProviderResult<GraphEvent> {
        let url = format!("{}/me/events", self.base_url);

        let body = EventWriteBody::from_create(request);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .header("Prefer", PREFER_UTC)
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
    ) -> ProviderResult<GraphEvent> {
        let url = format!("{}/me/events/{}", self.base_url, urlencoding::encode(event_id));

        let body = EventWriteBody::from_patch(patch, times);
        let response = self
            .http_client
            .patch(&url)
            .bearer_auth(token)
            .header("Prefer", PREFER_UTC)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let body = handle_response(response).await?;
        parse_json(&body)
    }

    /// Deletes an event.
    pub(super) async fn delete_event(&self, token: &str, event_id: &str) -> ProviderResult<()> {
        let url = format!("{}/me/events/{}", self.base_url, urlencoding::encode(event_id));

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

    /// Lists the user's contacts, following pagination and de-duplicating
    /// by email.
    pub(super) async fn list_contacts(&self, token: &str) -> ProviderResult<Vec<Contact>> {
        let first = format!("{}/me/contacts", self.base_url);
        let mut contacts = Vec::new();
        let mut next: Option<String> = None;

        loop {
            let request = match next.as_deref() {
                Some(url) => self.http_client.get(url),
                None => self.http_client.get(&first).query(&[("$top", "100")]),
            };

            let response = request
                .bearer_auth(token)
                .send()
                .await
                .map_err(network_error)?;

            let body = handle_response(response).await?;
            let page: ContactListResponse = parse_json(&body)?;

            contacts.extend(page.value.into_iter().filter_map(contact_from_graph));

            match page.next_link {
                Some(link) => next = Some(link),
                None => break,
            }
        }

        Ok(dedup_contacts(contacts))
    }

    /// Fetches the authenticated user's profile from `/me`.
    pub(super) async fn get_me(&self, token: &str) -> ProviderResult<Profile> {
        let url = format!("{}/me", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;

        let body = handle_response(response).await?;
        let me: MeResponse = parse_json(&body)?;

        Ok(Profile {
            email: me.mail.or(me.user_principal_name),
            display_name: me.display_name,
        })
    }
}

/// Converts a Graph event into a canonical event.
///
/// Returns `None` for cancelled events and payloads missing an id or a
/// parseable interval; those are skipped with a warning rather than failing
/// the whole listing.
pub(super) fn normalize_event(event: GraphEvent) -> Option<CanonicalEvent> {
    if event.is_cancelled == Some(true) {
        return None;
    }

    let native = native_conference(&event);
    let timezone = event
        .original_start_time_zone
        .clone()
        .filter(|tz| !tz.trim().is_empty());

    let id = event.id?;
    let title = event.subject.unwrap_or_default();
    let all_day = event.is_all_day.unwrap_or(false);

    let start = parse_graph_time(event.start.as_ref(), &id, "start")?;
    let end = parse_graph_time(event.end.as_ref(), &id, "end")?;

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email_address.as_ref().and_then(|e| e.address.clone())?;
            let mut attendee = Attendee::new(email).with_response_status(response_status(
                a.status.as_ref().and_then(|s| s.response.as_deref()),
            ));
            if let Some(name) = a.email_address.and_then(|e| e.name) {
                attendee = attendee.with_display_name(name);
            }
            Some(attendee)
        })
        .collect();

    let location_text = event.location.and_then(|l| l.display_name);
    let (location_kind, _online, conference) = reconcile_location(
        native,
        location_text.as_deref(),
        event.body_preview.as_deref(),
    );

    let organizer_email = event
        .organizer
        .as_ref()
        .and_then(|o| o.email_address.as_ref())
        .and_then(|e| e.address.clone());
    let organizer_name = resolve_organizer_name(
        event
            .organizer
            .as_ref()
            .and_then(|o| o.email_address.as_ref())
            .and_then(|e| e.name.as_deref()),
        organizer_email.as_deref(),
        None,
    );

    let location_details = location_text.filter(|l| !l.trim().is_empty());

    let mut canonical = CanonicalEvent::new(id, Provider::Microsoft, title, start, end)
        .with_all_day(all_day)
        .with_location(location_kind, location_details)
        .with_attendees(attendees)
        .with_organizer(organizer_email, organizer_name);

    if let Some(kind) = conference {
        canonical = canonical.with_online_meeting(kind);
    }
    if let Some(preview) = event.body_preview
        && !preview.trim().is_empty()
    {
        canonical = canonical.with_description(preview);
    }
    if let Some(tz) = timezone {
        canonical = canonical.with_timezone(tz);
    }

    Some(canonical)
}

/// Detects an online meeting from the event's native Graph fields.
fn native_conference(event: &GraphEvent) -> Option<ConferenceKind> {
    if let Some(url) = event
        .online_meeting
        .as_ref()
        .and_then(|m| m.join_url.as_deref())
    {
        return Some(classify_conference_url(url));
    }

    if event.is_online_meeting == Some(true) {
        return Some(match event.online_meeting_provider.as_deref() {
            Some("teamsForBusiness") => ConferenceKind::Teams,
            _ => ConferenceKind::Other,
        });
    }

    None
}

/// Parses a Graph date-time.
///
/// With the UTC `Prefer` header Graph sends naive timestamps with up to
/// seven fractional digits; RFC 3339 values are accepted as a fallback.
fn parse_graph_time(time: Option<&GraphDateTime>, id: &str, which: &str) -> Option<DateTime<Utc>> {
    let Some(raw) = time.and_then(|t| t.date_time.as_deref()) else {
        warn!("event {} has no {} time", id, which);
        return None;
    };

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| warn!("failed to parse {} time for event {}: {}", which, id, e))
        .ok()
}

fn response_status(status: Option<&str>) -> ResponseStatus {
    match status {
        Some("accepted") => ResponseStatus::Accepted,
        Some("declined") => ResponseStatus::Declined,
        Some("tentativelyAccepted") => ResponseStatus::Tentative,
        Some("notResponded") => ResponseStatus::NeedsAction,
        _ => ResponseStatus::Unknown,
    }
}

fn contact_from_graph(contact: GraphContact) -> Option<Contact> {
    let email = contact
        .email_addresses
        .iter()
        .filter_map(|e| e.address.as_deref())
        .find(|a| !a.trim().is_empty())
        .map(str::to_string)?;

    let mut result = Contact::new(email);
    if let Some(name) = contact.display_name.filter(|n| !n.trim().is_empty()) {
        result = result.with_display_name(name);
    }
    Some(result)
}

/// Response from calendarView and other collection endpoints.
#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// A single event from Microsoft Graph.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GraphEvent {
    id: Option<String>,
    subject: Option<String>,
    body_preview: Option<String>,
    start: Option<GraphDateTime>,
    end: Option<GraphDateTime>,
    is_all_day: Option<bool>,
    is_cancelled: Option<bool>,
    is_online_meeting: Option<bool>,
    online_meeting_provider: Option<String>,
    online_meeting: Option<GraphOnlineMeeting>,
    location: Option<GraphLocation>,
    attendees: Option<Vec<GraphAttendee>>,
    organizer: Option<GraphRecipient>,
    original_start_time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphOnlineMeeting {
    join_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphLocation {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttendee {
    email_address: Option<GraphEmailAddress>,
    status: Option<GraphResponseStatus>,
}

#[derive(Debug, Deserialize)]
struct GraphResponseStatus {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecipient {
    email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    address: Option<String>,
    name: Option<String>,
}

/// Response from the contacts endpoint.
#[derive(Debug, Deserialize)]
struct ContactListResponse {
    #[serde(default)]
    value: Vec<GraphContact>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphContact {
    display_name: Option<String>,
    #[serde(default)]
    email_addresses: Vec<GraphEmailAddress>,
}

/// Response from `/me`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    mail: Option<String>,
    user_principal_name: Option<String>,
    display_name: Option<String>,
}

/// Write payload for event create and patch calls.
///
/// Absent fields are omitted so Graph leaves them untouched; a cleared
/// [`Patch`] field serializes as an explicit `null`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventWriteBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    body: Patch<ItemBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<GraphTimeBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<GraphTimeBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_all_day: Option<bool>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    location: Patch<LocationBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<AttendeeBody>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_online_meeting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    online_meeting_provider: Option<String>,
}

impl EventWriteBody {
    fn from_create(request: &CreateEventRequest) -> Self {
        let (start, end) = if request.all_day {
            (
                GraphTimeBody::all_day(request.start),
                GraphTimeBody::all_day(request.end),
            )
        } else {
            (
                GraphTimeBody::timed(request.start),
                GraphTimeBody::timed(request.end),
            )
        };

        let attendees: Vec<AttendeeBody> =
            request.attendees.iter().map(AttendeeBody::from_input).collect();
        // Only a Teams kind provisions a meeting; a Google Meet kind has no
        // Graph equivalent and degrades to a plain event.
        let teams = request.location_kind == LocationKind::Teams;

        Self {
            subject: Some(request.title.clone()),
            body: request
                .description
                .clone()
                .map_or(Patch::Keep, |text| Patch::Set(ItemBody::text(text))),
            start: Some(start),
            end: Some(end),
            is_all_day: request.all_day.then_some(true),
            location: request
                .location_details
                .clone()
                .filter(|l| !l.trim().is_empty())
                .map_or(Patch::Keep, |name| Patch::Set(LocationBody { display_name: name })),
            attendees: (!attendees.is_empty()).then_some(attendees),
            is_online_meeting: teams.then_some(true),
            online_meeting_provider: teams.then(|| "teamsForBusiness".to_string()),
        }
    }

    fn from_patch(patch: &EventPatch, times: Option<(DateTime<Utc>, DateTime<Utc>, bool)>) -> Self {
        let (start, end, is_all_day) = match times {
            Some((start, end, true)) => (
                Some(GraphTimeBody::all_day(start)),
                Some(GraphTimeBody::all_day(end)),
                Some(true),
            ),
            Some((start, end, false)) => (
                Some(GraphTimeBody::timed(start)),
                Some(GraphTimeBody::timed(end)),
                patch.all_day,
            ),
            None => (None, None, None),
        };

        Self {
            subject: patch.title.clone(),
            body: match &patch.description {
                Patch::Keep => Patch::Keep,
                Patch::Clear => Patch::Clear,
                Patch::Set(text) => Patch::Set(ItemBody::text(text.clone())),
            },
            start,
            end,
            is_all_day,
            location: match &patch.location_details {
                Patch::Keep => Patch::Keep,
                Patch::Clear => Patch::Clear,
                Patch::Set(name) => Patch::Set(LocationBody {
                    display_name: name.clone(),
                }),
            },
            attendees: patch
                .attendees
                .as_ref()
                .map(|list| list.iter().map(AttendeeBody::from_input).collect()),
            is_online_meeting: None,
            online_meeting_provider: None,
        }
    }
}

/// Event body in a write payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody {
    content_type: String,
    content: String,
}

impl ItemBody {
    fn text(content: String) -> Self {
        Self {
            content_type: "text".to_string(),
            content,
        }
    }
}

/// Event time in a write payload; always written as UTC.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphTimeBody {
    date_time: String,
    time_zone: String,
}

impl GraphTimeBody {
    fn timed(at: DateTime<Utc>) -> Self {
        Self {
            date_time: at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: "UTC".to_string(),
        }
    }

    fn all_day(at: DateTime<Utc>) -> Self {
        Self {
            date_time: at.format("%Y-%m-%dT00:00:00").to_string(),
            time_zone: "UTC".to_string(),
        }
    }
}

/// Location in a write payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationBody {
    display_name: String,
}

/// Attendee in a write payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttendeeBody {
    email_address: EmailAddressBody,
    #[serde(rename = "type")]
    kind: String,
}

impl AttendeeBody {
    fn from_input(input: &AttendeeInput) -> Self {
        Self {
            email_address: EmailAddressBody {
                address: input.email.clone(),
                name: input.display_name.clone(),
            },
            kind: "required".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmailAddressBody {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}
