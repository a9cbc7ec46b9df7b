//! Sparse update types.
//!
//! Partial updates must distinguish three states per field: absent (leave
//! the stored value untouched), explicitly cleared, and set to a new value.
//! An `Option<Option<T>>` conflates the first two under serde defaults, so
//! [`Patch`] makes the distinction explicit. [`EventPatch`] is the sparse
//! update request for canonical events, including the duration-preserving
//! time resolution rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::event::{AttendeeInput, LocationKind};
use crate::time::validate_interval;

/// A three-state field update: keep, clear, or set.
///
/// JSON mapping: a missing key deserializes to `Keep` (via
/// `#[serde(default)]` on the containing field), an explicit `null` to
/// `Clear`, and a value to `Set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Leave the stored value untouched.
    Keep,
    /// Clear the stored value.
    Clear,
    /// Replace the stored value.
    Set(T),
}

impl<T> Patch<T> {
    /// Returns `true` if this patch leaves the field untouched.
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Returns `true` if this patch clears the field.
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Clear)
    }

    /// Returns `true` if this patch sets a new value.
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Returns the new value if this patch sets one.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Set(value) => serializer.serialize_some(value),
            // Keep never reaches here when fields carry
            // `skip_serializing_if = "Patch::is_keep"`; Clear maps to null.
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Self::Set(value),
            None => Self::Clear,
        })
    }
}

/// A sparse update request for a canonical event.
///
/// Required event fields (title, times) use `Option` (absent or replaced,
/// never cleared); nullable fields use [`Patch`] so callers can clear them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_kind: Option<LocationKind>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub location_details: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<AttendeeInput>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub outcome: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub lead_id: Patch<String>,
}

impl EventPatch {
    /// Returns `true` if no field is touched at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.timezone.is_none()
            && self.all_day.is_none()
            && self.location_kind.is_none()
            && self.location_details.is_keep()
            && self.description.is_keep()
            && self.attendees.is_none()
            && self.outcome.is_keep()
            && self.lead_id.is_keep()
    }

    /// Returns `true` if the patch touches the start or end time.
    pub fn touches_times(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Validates the patch.
    ///
    /// Time rules re-apply only when the request carries both bounds; a
    /// one-sided time change is resolved against the stored interval by
    /// [`EventPatch::resolve_times`] instead.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            validate_interval(start, end)?;
        }
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            return Err(ValidationError::EmptyField("title"));
        }
        Ok(())
    }

    /// Resolves the effective start/end against the stored interval.
    ///
    /// A start-only change preserves the stored duration by shifting the end;
    /// an end-only change preserves the stored start.
    pub fn resolve_times(
        &self,
        current_start: DateTime<Utc>,
        current_end: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, start + (current_end - current_start)),
            (None, Some(end)) => (current_start, end),
            (None, None) => (current_start, current_end),
        }
    }
}
