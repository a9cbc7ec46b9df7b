//! SQLite mirror for canonical events and logged meetings.
//!
//! Every provider event the service touches is mirrored here so listings,
//! lead timelines, and history queries work without a provider round
//! trip. Provider deletions become soft-deletes; manually logged meetings
//! live in their own append-only table with link columns backfilled after
//! side effects resolve.

pub mod error;
mod events;
pub mod filter;
mod meetings;
mod store;

pub use error::{StoreError, StoreResult};
pub use filter::{EventFilter, MeetingFilter, SortOrder};
pub use store::MirrorStore;
