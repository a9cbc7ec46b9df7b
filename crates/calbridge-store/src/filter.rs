//! Query filters for mirrored events and logged meetings.

use calbridge_core::{EventWindow, Provider};

/// Result ordering for store queries, by the record's primary timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Criteria for querying mirrored events.
///
/// All criteria are optional and combine with AND. Soft-deleted rows are
/// excluded unless [`EventFilter::include_inactive`] is set. Results are
/// ordered by start time, newest first unless overridden.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user_id: Option<String>,
    pub lead_id: Option<String>,
    pub provider: Option<Provider>,
    pub window: Option<EventWindow>,
    pub include_inactive: bool,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn for_lead(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    pub fn for_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Restricts results to events starting inside the window.
    pub fn within(mut self, window: EventWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn include_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    pub fn sort(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Criteria for querying logged meetings.
///
/// Results are ordered by occurrence time, newest first unless overridden.
#[derive(Debug, Clone, Default)]
pub struct MeetingFilter {
    pub organization_id: Option<String>,
    pub lead_id: Option<String>,
    pub include_inactive: bool,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl MeetingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn for_lead(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    pub fn include_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    pub fn sort(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}
