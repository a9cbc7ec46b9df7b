//! Logged-meeting persistence.
//!
//! Meetings are inserted once and never rewritten; the only later writes
//! are the link columns (`activity_id`, `follow_up_task_id`) backfilled
//! after side effects resolve.

use chrono::Utc;
use rusqlite::types::{Type, Value};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use calbridge_core::{LoggedMeeting, MeetingKind, MeetingOutcome};

use crate::error::StoreResult;
use crate::events::{push_page, timestamp_at, unknown_tag};
use crate::filter::MeetingFilter;
use crate::store::{MirrorStore, encode_json};

const MEETING_COLUMNS: &str = "id, title, kind, virtual_provider, occurred_at, \
     duration_minutes, summary, outcome, participants, lead_id, logged_by, organization_id, \
     activity_id, follow_up_task_id, attachment_key, is_active";

impl MirrorStore {
    /// Persists a logged meeting and returns it with its assigned id.
    pub fn insert_meeting(&self, meeting: &LoggedMeeting) -> StoreResult<LoggedMeeting> {
        let participants = encode_json("participants", &meeting.participants)?;
        let conn = self.connection();
        conn.execute(
            "INSERT INTO logged_meetings (
                title, kind, virtual_provider, occurred_at, duration_minutes,
                summary, outcome, participants, lead_id, logged_by,
                organization_id, activity_id, follow_up_task_id, attachment_key,
                is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                meeting.title,
                meeting.kind.as_str(),
                meeting.virtual_provider,
                meeting.occurred_at.timestamp(),
                meeting.duration_minutes,
                meeting.summary,
                meeting.outcome.as_str(),
                participants,
                meeting.lead_id,
                meeting.logged_by,
                meeting.organization_id,
                meeting.activity_id,
                meeting.follow_up_task_id,
                meeting.attachment_key,
                meeting.active,
                Utc::now().timestamp(),
            ],
        )?;

        let mut stored = meeting.clone();
        stored.id = conn.last_insert_rowid();
        debug!("logged meeting {} stored", stored.id);
        Ok(stored)
    }

    /// Backfills side-effect link ids onto a stored meeting.
    ///
    /// Only supplied links are written; `None` leaves the column untouched,
    /// so a partial side-effect failure never erases an earlier link.
    pub fn attach_meeting_links(
        &self,
        meeting_id: i64,
        activity_id: Option<&str>,
        follow_up_task_id: Option<&str>,
    ) -> StoreResult<bool> {
        let conn = self.connection();
        let changed = conn.execute(
            "UPDATE logged_meetings SET
                activity_id = COALESCE(?1, activity_id),
                follow_up_task_id = COALESCE(?2, follow_up_task_id)
             WHERE id = ?3",
            params![activity_id, follow_up_task_id, meeting_id],
        )?;
        Ok(changed > 0)
    }

    /// Fetches one logged meeting by id.
    pub fn get_meeting(&self, meeting_id: i64) -> StoreResult<Option<LoggedMeeting>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEETING_COLUMNS} FROM logged_meetings WHERE id = ?1"
        ))?;
        let meeting = stmt
            .query_row(params![meeting_id], row_to_meeting)
            .optional()?;
        Ok(meeting)
    }

    /// Queries logged meetings matching the filter, newest first unless the
    /// filter asks for ascending order.
    pub fn find_meetings(&self, filter: &MeetingFilter) -> StoreResult<Vec<LoggedMeeting>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(organization_id) = &filter.organization_id {
            clauses.push("organization_id = ?");
            args.push(Value::from(organization_id.clone()));
        }
        if let Some(lead_id) = &filter.lead_id {
            clauses.push("lead_id = ?");
            args.push(Value::from(lead_id.clone()));
        }
        if !filter.include_inactive {
            clauses.push("is_active = 1");
        }

        let mut sql = format!("SELECT {MEETING_COLUMNS} FROM logged_meetings");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        let order = filter.order.as_sql();
        sql.push_str(&format!(" ORDER BY occurred_at {order}, id {order}"));
        push_page(&mut sql, &mut args, filter.limit, filter.offset);

        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let meetings = stmt
            .query_map(params_from_iter(args), row_to_meeting)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meetings)
    }

    /// Counts every stored meeting row.
    pub fn count_meetings(&self) -> StoreResult<i64> {
        let conn = self.connection();
        let count = conn.query_row("SELECT COUNT(*) FROM logged_meetings", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}

fn row_to_meeting(row: &Row<'_>) -> rusqlite::Result<LoggedMeeting> {
    let kind_tag: String = row.get(2)?;
    let kind = MeetingKind::parse(&kind_tag).ok_or_else(|| unknown_tag(2, &kind_tag))?;

    let outcome_tag: String = row.get(7)?;
    let outcome =
        MeetingOutcome::parse(&outcome_tag).ok_or_else(|| unknown_tag(7, &outcome_tag))?;

    let participants = match row.get::<_, Option<String>>(8)? {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?,
        None => Vec::new(),
    };

    Ok(LoggedMeeting {
        id: row.get(0)?,
        title: row.get(1)?,
        kind,
        virtual_provider: row.get(3)?,
        occurred_at: timestamp_at(row, 4)?,
        duration_minutes: row.get(5)?,
        summary: row.get(6)?,
        outcome,
        participants,
        lead_id: row.get(9)?,
        logged_by: row.get(10)?,
        organization_id: row.get(11)?,
        activity_id: row.get(12)?,
        follow_up_task_id: row.get(13)?,
        attachment_key: row.get(14)?,
        active: row.get(15)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use calbridge_core::{
        LogMeetingRequest, LoggedMeeting, MeetingKind, MeetingOutcome, Participant,
    };

    use crate::filter::{MeetingFilter, SortOrder};
    use crate::store::MirrorStore;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn store() -> MirrorStore {
        MirrorStore::open_in_memory().unwrap()
    }

    fn sample_meeting() -> LoggedMeeting {
        let request = LogMeetingRequest::new(
            "Discovery call",
            MeetingKind::Virtual,
            utc(2025, 3, 12, 14, 0, 0),
            45,
            MeetingOutcome::Completed,
            "user-1",
        )
        .with_virtual_provider("zoom")
        .with_summary("Walked through pricing")
        .with_participants(vec![
            Participant::new("ana@example.com").with_name("Ana Lima"),
            Participant::new("buyer@client.example").external(),
        ])
        .with_lead_id("lead-9");
        LoggedMeeting::from_request(&request, "org-1")
    }

    #[test]
    fn insert_assigns_id_and_round_trips() {
        let store = store();
        let stored = store.insert_meeting(&sample_meeting()).unwrap();
        assert!(stored.id > 0);

        let found = store.get_meeting(stored.id).unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(found.participants.len(), 2);
        assert!(found.participants[1].external);
        assert_eq!(found.virtual_provider.as_deref(), Some("zoom"));
    }

    #[test]
    fn get_missing_meeting_returns_none() {
        let store = store();
        assert!(store.get_meeting(42).unwrap().is_none());
    }

    #[test]
    fn attach_links_fills_columns_without_clearing() {
        let store = store();
        let stored = store.insert_meeting(&sample_meeting()).unwrap();

        assert!(
            store
                .attach_meeting_links(stored.id, Some("act-1"), None)
                .unwrap()
        );
        let found = store.get_meeting(stored.id).unwrap().unwrap();
        assert_eq!(found.activity_id.as_deref(), Some("act-1"));
        assert_eq!(found.follow_up_task_id, None);

        // A later backfill of the task link must not erase the activity.
        assert!(
            store
                .attach_meeting_links(stored.id, None, Some("task-7"))
                .unwrap()
        );
        let found = store.get_meeting(stored.id).unwrap().unwrap();
        assert_eq!(found.activity_id.as_deref(), Some("act-1"));
        assert_eq!(found.follow_up_task_id.as_deref(), Some("task-7"));
    }

    #[test]
    fn attach_links_to_missing_meeting_reports_false() {
        let store = store();
        assert!(!store.attach_meeting_links(42, Some("act-1"), None).unwrap());
    }

    #[test]
    fn find_meetings_filters_by_organization_and_lead() {
        let store = store();
        let mut first = sample_meeting();
        first.occurred_at = utc(2025, 3, 10, 9, 0, 0);
        let mut second = sample_meeting();
        second.occurred_at = utc(2025, 3, 14, 9, 0, 0);
        second.lead_id = None;
        let mut other_org = sample_meeting();
        other_org.organization_id = "org-2".to_string();

        store.insert_meeting(&first).unwrap();
        store.insert_meeting(&second).unwrap();
        store.insert_meeting(&other_org).unwrap();

        let org = store
            .find_meetings(&MeetingFilter::new().for_organization("org-1"))
            .unwrap();
        assert_eq!(org.len(), 2);
        assert_eq!(org[0].occurred_at, utc(2025, 3, 14, 9, 0, 0));
        assert_eq!(org[1].occurred_at, utc(2025, 3, 10, 9, 0, 0));

        let lead = store
            .find_meetings(&MeetingFilter::new().for_organization("org-1").for_lead("lead-9"))
            .unwrap();
        assert_eq!(lead.len(), 1);
        assert_eq!(lead[0].occurred_at, utc(2025, 3, 10, 9, 0, 0));

        assert_eq!(store.count_meetings().unwrap(), 3);
    }

    #[test]
    fn find_meetings_pages_and_sorts_ascending() {
        let store = store();
        for day in 10..14 {
            let mut meeting = sample_meeting();
            meeting.occurred_at = utc(2025, 3, day, 9, 0, 0);
            store.insert_meeting(&meeting).unwrap();
        }

        let page = store
            .find_meetings(&MeetingFilter::new().limit(2).offset(1))
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].occurred_at, utc(2025, 3, 12, 9, 0, 0));
        assert_eq!(page[1].occurred_at, utc(2025, 3, 11, 9, 0, 0));

        let oldest = store
            .find_meetings(&MeetingFilter::new().sort(SortOrder::Ascending).limit(1))
            .unwrap();
        assert_eq!(oldest.len(), 1);
        assert_eq!(oldest[0].occurred_at, utc(2025, 3, 10, 9, 0, 0));
    }
}
