//! Event persistence.
//!
//! Mirror rows are keyed by `(provider, external_id)`. Provider-sourced
//! columns are overwritten on every refresh; locally owned columns (user,
//! lead, outcome) survive refreshes that do not carry them. Deletion is a
//! soft-delete so past events remain queryable.

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use calbridge_core::{
    Attendee, CanonicalEvent, ConferenceKind, EventPatch, LocationKind, Patch, Provider,
    ResponseStatus,
};

use crate::error::StoreResult;
use crate::filter::EventFilter;
use crate::store::{MirrorStore, encode_json};

const EVENT_COLUMNS: &str = "external_id, provider, user_id, lead_id, title, description, \
     start_time, end_time, timezone, is_all_day, location_kind, location_details, attendees, \
     organizer_email, organizer_name, is_online_meeting, online_meeting_provider, outcome, \
     is_active";

impl MirrorStore {
    /// Inserts or refreshes the mirror row for a provider event.
    ///
    /// Locally owned columns keep their stored value unless the incoming
    /// event carries one, so a listing refresh cannot erase a lead link.
    /// An event that reappears after a soft-delete is reactivated.
    pub fn upsert_event(&self, event: &CanonicalEvent) -> StoreResult<()> {
        let attendees = encode_json("attendees", &event.attendees)?;
        let conn = self.connection();
        conn.execute(
            "INSERT INTO canonical_events (
                external_id, provider, user_id, lead_id, title, description,
                start_time, end_time, timezone, is_all_day, location_kind,
                location_details, attendees, organizer_email, organizer_name,
                is_online_meeting, online_meeting_provider, outcome, is_active, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                      ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            ON CONFLICT(provider, external_id) DO UPDATE SET
                user_id = COALESCE(excluded.user_id, user_id),
                lead_id = COALESCE(excluded.lead_id, lead_id),
                title = excluded.title,
                description = excluded.description,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                timezone = excluded.timezone,
                is_all_day = excluded.is_all_day,
                location_kind = excluded.location_kind,
                location_details = excluded.location_details,
                attendees = excluded.attendees,
                organizer_email = excluded.organizer_email,
                organizer_name = excluded.organizer_name,
                is_online_meeting = excluded.is_online_meeting,
                online_meeting_provider = excluded.online_meeting_provider,
                outcome = COALESCE(excluded.outcome, outcome),
                is_active = excluded.is_active,
                updated_at = excluded.updated_at",
            params![
                event.external_id,
                event.provider.as_str(),
                event.user_id,
                event.lead_id,
                event.title,
                event.description,
                event.start.timestamp(),
                event.end.timestamp(),
                event.timezone,
                event.all_day,
                event.location_kind.as_str(),
                event.location_details,
                attendees,
                event.organizer_email,
                event.organizer_name,
                event.online_meeting,
                event.online_meeting_provider.map(|kind| kind.as_str()),
                event.outcome,
                event.active,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Looks up one active event by its provider identity.
    pub fn find_event_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> StoreResult<Option<CanonicalEvent>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM canonical_events
             WHERE provider = ?1 AND external_id = ?2 AND is_active = 1"
        ))?;
        let event = stmt
            .query_row(params![provider.as_str(), external_id], row_to_event)
            .optional()?;
        Ok(event)
    }

    /// Queries mirrored events matching the filter, newest start first
    /// unless the filter asks for ascending order.
    pub fn find_events(&self, filter: &EventFilter) -> StoreResult<Vec<CanonicalEvent>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(user_id) = &filter.user_id {
            clauses.push("user_id = ?");
            args.push(Value::from(user_id.clone()));
        }
        if let Some(lead_id) = &filter.lead_id {
            clauses.push("lead_id = ?");
            args.push(Value::from(lead_id.clone()));
        }
        if let Some(provider) = filter.provider {
            clauses.push("provider = ?");
            args.push(Value::from(provider.as_str().to_string()));
        }
        if let Some(window) = &filter.window {
            clauses.push("start_time >= ?");
            args.push(Value::from(window.start.timestamp()));
            clauses.push("start_time < ?");
            args.push(Value::from(window.end.timestamp()));
        }
        if !filter.include_inactive {
            clauses.push("is_active = 1");
        }

        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM canonical_events");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        let order = filter.order.as_sql();
        sql.push_str(&format!(" ORDER BY start_time {order}, id {order}"));
        push_page(&mut sql, &mut args, filter.limit, filter.offset);

        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let events = stmt
            .query_map(params_from_iter(args), row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!("mirror query matched {} events", events.len());
        Ok(events)
    }

    /// Applies a sparse patch to the stored row and returns the result.
    ///
    /// `times` carries the interval already resolved against the stored
    /// record when the patch moves either bound. Returns `None` when no
    /// active row matches.
    pub fn apply_event_patch(
        &self,
        provider: Provider,
        external_id: &str,
        patch: &EventPatch,
        times: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> StoreResult<Option<CanonicalEvent>> {
        let mut sets: Vec<String> = vec!["updated_at = ?".to_string()];
        let mut args: Vec<Value> = vec![Value::from(Utc::now().timestamp())];

        if let Some(title) = &patch.title {
            sets.push("title = ?".to_string());
            args.push(Value::from(title.clone()));
        }
        if let Some((start, end)) = times {
            sets.push("start_time = ?".to_string());
            args.push(Value::from(start.timestamp()));
            sets.push("end_time = ?".to_string());
            args.push(Value::from(end.timestamp()));
        }
        if let Some(timezone) = &patch.timezone {
            sets.push("timezone = ?".to_string());
            args.push(Value::from(timezone.clone()));
        }
        if let Some(all_day) = patch.all_day {
            sets.push("is_all_day = ?".to_string());
            args.push(Value::from(i64::from(all_day)));
        }
        if let Some(kind) = patch.location_kind {
            sets.push("location_kind = ?".to_string());
            args.push(Value::from(kind.as_str().to_string()));
        }
        push_patch(&mut sets, &mut args, "location_details", &patch.location_details);
        push_patch(&mut sets, &mut args, "description", &patch.description);
        push_patch(&mut sets, &mut args, "outcome", &patch.outcome);
        push_patch(&mut sets, &mut args, "lead_id", &patch.lead_id);
        if let Some(inputs) = &patch.attendees {
            let attendees: Vec<Attendee> = inputs
                .iter()
                .map(|input| Attendee {
                    email: input.email.clone(),
                    display_name: input.display_name.clone(),
                    response_status: ResponseStatus::Unknown,
                })
                .collect();
            sets.push("attendees = ?".to_string());
            args.push(Value::from(encode_json("attendees", &attendees)?));
        }

        let sql = format!(
            "UPDATE canonical_events SET {}
             WHERE provider = ? AND external_id = ? AND is_active = 1",
            sets.join(", ")
        );
        args.push(Value::from(provider.as_str().to_string()));
        args.push(Value::from(external_id.to_string()));

        let changed = {
            let conn = self.connection();
            conn.execute(&sql, params_from_iter(args))?
        };
        if changed == 0 {
            return Ok(None);
        }
        self.find_event_by_external_id(provider, external_id)
    }

    /// Soft-deletes the mirror row, keeping it on disk for history.
    ///
    /// Returns `true` when an active row was marked inactive.
    pub fn soft_delete_event(&self, provider: Provider, external_id: &str) -> StoreResult<bool> {
        let conn = self.connection();
        let changed = conn.execute(
            "UPDATE canonical_events SET is_active = 0, updated_at = ?1
             WHERE provider = ?2 AND external_id = ?3 AND is_active = 1",
            params![Utc::now().timestamp(), provider.as_str(), external_id],
        )?;
        Ok(changed > 0)
    }

    /// Counts every stored event row, active or not.
    pub fn count_events(&self) -> StoreResult<i64> {
        let conn = self.connection();
        let count = conn.query_row("SELECT COUNT(*) FROM canonical_events", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}

fn push_patch(sets: &mut Vec<String>, args: &mut Vec<Value>, column: &str, patch: &Patch<String>) {
    match patch {
        Patch::Keep => {}
        Patch::Clear => sets.push(format!("{column} = NULL")),
        Patch::Set(value) => {
            sets.push(format!("{column} = ?"));
            args.push(Value::from(value.clone()));
        }
    }
}

/// Appends LIMIT/OFFSET. SQLite requires a LIMIT before OFFSET, so an
/// offset without a limit gets the unbounded `LIMIT -1`.
pub(crate) fn push_page(
    sql: &mut String,
    args: &mut Vec<Value>,
    limit: Option<u32>,
    offset: Option<u32>,
) {
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        args.push(Value::from(i64::from(limit)));
    } else if offset.is_some() {
        sql.push_str(" LIMIT -1");
    }
    if let Some(offset) = offset {
        sql.push_str(" OFFSET ?");
        args.push(Value::from(i64::from(offset)));
    }
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<CanonicalEvent> {
    let provider_tag: String = row.get(1)?;
    let provider = Provider::parse(&provider_tag)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    let location_tag: String = row.get(10)?;
    let location_kind =
        LocationKind::parse(&location_tag).ok_or_else(|| unknown_tag(10, &location_tag))?;

    let attendees = match row.get::<_, Option<String>>(12)? {
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(e))
        })?,
        None => Vec::new(),
    };

    let online_meeting_provider = match row.get::<_, Option<String>>(16)? {
        Some(tag) => Some(ConferenceKind::parse(&tag).ok_or_else(|| unknown_tag(16, &tag))?),
        None => None,
    };

    Ok(CanonicalEvent {
        external_id: row.get(0)?,
        provider,
        user_id: row.get(2)?,
        lead_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        start: timestamp_at(row, 6)?,
        end: timestamp_at(row, 7)?,
        timezone: row.get(8)?,
        all_day: row.get(9)?,
        location_kind,
        location_details: row.get(11)?,
        attendees,
        organizer_email: row.get(13)?,
        organizer_name: row.get(14)?,
        online_meeting: row.get(15)?,
        online_meeting_provider,
        outcome: row.get(17)?,
        active: row.get(18)?,
    })
}

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

pub(crate) fn unknown_tag(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown tag: {value}").into(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use calbridge_core::{
        Attendee, AttendeeInput, CanonicalEvent, ConferenceKind, EventPatch, EventWindow,
        LocationKind, Patch, Provider, ResponseStatus,
    };

    use crate::filter::{EventFilter, SortOrder};
    use crate::store::MirrorStore;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn store() -> MirrorStore {
        MirrorStore::open_in_memory().unwrap()
    }

    fn rich_event() -> CanonicalEvent {
        CanonicalEvent::new(
            "ev-1",
            Provider::Google,
            "Quarterly Review",
            utc(2025, 3, 12, 9, 0, 0),
            utc(2025, 3, 12, 10, 0, 0),
        )
        .with_user_id("user-1")
        .with_lead_id("lead-9")
        .with_description("Agenda attached")
        .with_timezone("Europe/Paris")
        .with_location(
            LocationKind::GoogleMeet,
            Some("https://meet.google.com/abc-defg-hij".to_string()),
        )
        .with_attendees(vec![
            Attendee::new("ana@example.com")
                .with_display_name("Ana Lima")
                .with_response_status(ResponseStatus::Accepted),
            Attendee::new("bob@example.com"),
        ])
        .with_organizer(Some("mona@example.com".to_string()), "Mona Example")
        .with_online_meeting(ConferenceKind::GoogleMeet)
        .with_outcome("completed")
    }

    #[test]
    fn upsert_round_trips_every_column() {
        let store = store();
        let event = rich_event();
        store.upsert_event(&event).unwrap();

        let found = store
            .find_event_by_external_id(Provider::Google, "ev-1")
            .unwrap()
            .unwrap();
        assert_eq!(found, event);
    }

    #[test]
    fn upsert_refreshes_without_duplicating() {
        let store = store();
        let mut event = rich_event();
        store.upsert_event(&event).unwrap();

        event.title = "Quarterly Review (moved)".to_string();
        event.start = utc(2025, 3, 13, 9, 0, 0);
        event.end = utc(2025, 3, 13, 10, 0, 0);
        store.upsert_event(&event).unwrap();

        assert_eq!(store.count_events().unwrap(), 1);
        let found = store
            .find_event_by_external_id(Provider::Google, "ev-1")
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Quarterly Review (moved)");
        assert_eq!(found.start, utc(2025, 3, 13, 9, 0, 0));
    }

    #[test]
    fn refresh_without_local_fields_keeps_them() {
        let store = store();
        store.upsert_event(&rich_event()).unwrap();

        // A provider refresh carries no user, lead, or outcome.
        let mut refresh = rich_event();
        refresh.user_id = None;
        refresh.lead_id = None;
        refresh.outcome = None;
        refresh.title = "Quarterly Review v2".to_string();
        store.upsert_event(&refresh).unwrap();

        let found = store
            .find_event_by_external_id(Provider::Google, "ev-1")
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Quarterly Review v2");
        assert_eq!(found.user_id.as_deref(), Some("user-1"));
        assert_eq!(found.lead_id.as_deref(), Some("lead-9"));
        assert_eq!(found.outcome.as_deref(), Some("completed"));
    }

    #[test]
    fn soft_delete_hides_row_and_reports_once() {
        let store = store();
        store.upsert_event(&rich_event()).unwrap();

        assert!(store.soft_delete_event(Provider::Google, "ev-1").unwrap());
        assert!(
            store
                .find_event_by_external_id(Provider::Google, "ev-1")
                .unwrap()
                .is_none()
        );

        let all = store
            .find_events(&EventFilter::new().include_inactive())
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
        assert_eq!(store.count_events().unwrap(), 1);

        assert!(!store.soft_delete_event(Provider::Google, "ev-1").unwrap());
    }

    #[test]
    fn upsert_reactivates_soft_deleted_event() {
        let store = store();
        store.upsert_event(&rich_event()).unwrap();
        store.soft_delete_event(Provider::Google, "ev-1").unwrap();

        store.upsert_event(&rich_event()).unwrap();
        let found = store
            .find_event_by_external_id(Provider::Google, "ev-1")
            .unwrap()
            .unwrap();
        assert!(found.active);
        assert_eq!(store.count_events().unwrap(), 1);
    }

    #[test]
    fn patch_sets_clears_and_keeps_fields() {
        let store = store();
        store.upsert_event(&rich_event()).unwrap();

        let patch = EventPatch {
            title: Some("Renamed".to_string()),
            description: Patch::Clear,
            outcome: Patch::Set("follow_up_required".to_string()),
            ..Default::default()
        };
        let updated = store
            .apply_event_patch(Provider::Google, "ev-1", &patch, None)
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.description, None);
        assert_eq!(updated.outcome.as_deref(), Some("follow_up_required"));
        assert_eq!(
            updated.location_details.as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );
        assert_eq!(updated.start, utc(2025, 3, 12, 9, 0, 0));
    }

    #[test]
    fn patch_applies_resolved_times() {
        let store = store();
        store.upsert_event(&rich_event()).unwrap();

        let patch = EventPatch {
            start: Some(utc(2025, 3, 14, 15, 0, 0)),
            ..Default::default()
        };
        let times = Some((utc(2025, 3, 14, 15, 0, 0), utc(2025, 3, 14, 16, 0, 0)));
        let updated = store
            .apply_event_patch(Provider::Google, "ev-1", &patch, times)
            .unwrap()
            .unwrap();

        assert_eq!(updated.start, utc(2025, 3, 14, 15, 0, 0));
        assert_eq!(updated.end, utc(2025, 3, 14, 16, 0, 0));
    }

    #[test]
    fn patch_replaces_attendees() {
        let store = store();
        store.upsert_event(&rich_event()).unwrap();

        let patch = EventPatch {
            attendees: Some(vec![
                AttendeeInput::new("carol@example.com").with_display_name("Carol"),
            ]),
            ..Default::default()
        };
        let updated = store
            .apply_event_patch(Provider::Google, "ev-1", &patch, None)
            .unwrap()
            .unwrap();

        assert_eq!(updated.attendees.len(), 1);
        assert_eq!(updated.attendees[0].email, "carol@example.com");
        assert_eq!(updated.attendees[0].display_name.as_deref(), Some("Carol"));
        assert_eq!(
            updated.attendees[0].response_status,
            ResponseStatus::Unknown
        );
    }

    #[test]
    fn patch_misses_absent_and_deleted_rows() {
        let store = store();
        let patch = EventPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert!(
            store
                .apply_event_patch(Provider::Google, "ev-404", &patch, None)
                .unwrap()
                .is_none()
        );

        store.upsert_event(&rich_event()).unwrap();
        store.soft_delete_event(Provider::Google, "ev-1").unwrap();
        assert!(
            store
                .apply_event_patch(Provider::Google, "ev-1", &patch, None)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn find_events_applies_filters_and_orders_descending() {
        let store = store();
        let e1 = CanonicalEvent::new(
            "ev-1",
            Provider::Google,
            "First",
            utc(2025, 3, 12, 9, 0, 0),
            utc(2025, 3, 12, 10, 0, 0),
        )
        .with_user_id("user-1")
        .with_lead_id("lead-a");
        let e2 = CanonicalEvent::new(
            "ev-2",
            Provider::Microsoft,
            "Second",
            utc(2025, 3, 13, 9, 0, 0),
            utc(2025, 3, 13, 10, 0, 0),
        )
        .with_user_id("user-1");
        let e3 = CanonicalEvent::new(
            "ev-3",
            Provider::Google,
            "Third",
            utc(2025, 3, 20, 9, 0, 0),
            utc(2025, 3, 20, 10, 0, 0),
        )
        .with_user_id("user-2")
        .with_lead_id("lead-a");
        for event in [&e1, &e2, &e3] {
            store.upsert_event(event).unwrap();
        }

        let all = store.find_events(&EventFilter::new()).unwrap();
        let titles: Vec<&str> = all.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Third", "Second", "First"]);

        let mine = store
            .find_events(&EventFilter::new().for_user("user-1"))
            .unwrap();
        assert_eq!(mine.len(), 2);

        let google = store
            .find_events(&EventFilter::new().for_provider(Provider::Google))
            .unwrap();
        assert_eq!(google.len(), 2);

        let window = EventWindow::new(utc(2025, 3, 1, 0, 0, 0), utc(2025, 3, 15, 0, 0, 0));
        let march = store
            .find_events(&EventFilter::new().within(window))
            .unwrap();
        let titles: Vec<&str> = march.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Second", "First"]);

        let lead = store
            .find_events(&EventFilter::new().for_lead("lead-a"))
            .unwrap();
        let titles: Vec<&str> = lead.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Third", "First"]);
    }

    #[test]
    fn find_events_pages_and_sorts_ascending() {
        let store = store();
        for (id, day) in [("ev-1", 12), ("ev-2", 13), ("ev-3", 14), ("ev-4", 15)] {
            let event = CanonicalEvent::new(
                id,
                Provider::Google,
                id.to_uppercase(),
                utc(2025, 3, day, 9, 0, 0),
                utc(2025, 3, day, 10, 0, 0),
            );
            store.upsert_event(&event).unwrap();
        }

        let page = store
            .find_events(&EventFilter::new().limit(2).offset(1))
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|e| e.external_id.as_str()).collect();
        assert_eq!(ids, ["ev-3", "ev-2"]);

        let oldest_first = store
            .find_events(&EventFilter::new().sort(SortOrder::Ascending).limit(2))
            .unwrap();
        let ids: Vec<&str> = oldest_first
            .iter()
            .map(|e| e.external_id.as_str())
            .collect();
        assert_eq!(ids, ["ev-1", "ev-2"]);
    }

    #[test]
    fn same_external_id_is_distinct_per_provider() {
        let store = store();
        let google = CanonicalEvent::new(
            "shared-id",
            Provider::Google,
            "Google copy",
            utc(2025, 3, 12, 9, 0, 0),
            utc(2025, 3, 12, 10, 0, 0),
        );
        let microsoft = CanonicalEvent::new(
            "shared-id",
            Provider::Microsoft,
            "Microsoft copy",
            utc(2025, 3, 12, 9, 0, 0),
            utc(2025, 3, 12, 10, 0, 0),
        );
        store.upsert_event(&google).unwrap();
        store.upsert_event(&microsoft).unwrap();

        assert_eq!(store.count_events().unwrap(), 2);
        let found = store
            .find_event_by_external_id(Provider::Microsoft, "shared-id")
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Microsoft copy");
    }
}
