//! Validation errors for canonical event and logged meeting inputs.

use thiserror::Error;

/// Errors raised while validating caller-supplied inputs.
///
/// These are raised before any provider call or persistence write, so a
/// failed validation is guaranteed to have had no side effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The event end time is not strictly after its start time.
    #[error("event end time must be strictly after its start time")]
    EndNotAfterStart,

    /// The event spans more than the maximum allowed duration.
    #[error("event duration exceeds the maximum of {0} hours")]
    DurationTooLong(i64),

    /// A required field was empty or missing.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A virtual meeting was logged without naming its provider.
    #[error("a virtual meeting requires a virtual provider tag")]
    MissingVirtualProvider,

    /// A follow-up task was requested without supplying its details.
    #[error("follow-up task details are required when a follow-up task is requested")]
    MissingFollowUpTask,

    /// A meeting duration must be a positive number of minutes.
    #[error("meeting duration must be a positive number of minutes")]
    NonPositiveDuration,

    /// The supplied provider tag is not a known provider.
    #[error("unknown provider tag: {0}")]
    UnknownProvider(String),
}
