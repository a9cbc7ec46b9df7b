//! Service layer: header routing, event orchestration, the unified feed,
//! and the meeting logger.
//!
//! This crate wires the provider adapters to the local mirror:
//!
//! - [`SyncGateway`] resolves the authorization/provider header pair to a
//!   provider adapter, or to local-only routing when both are absent
//! - [`EventService`] runs create/update/delete/list/contacts through the
//!   selected adapter and keeps the mirror in step
//! - [`FeedBuilder`] merges mirrored events and logged meetings into one
//!   descending feed
//! - [`MeetingLogger`] validates, persists, and fans out the side effects
//!   of logged meetings
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use calbridge_providers::{GoogleProvider, MicrosoftProvider};
//! use calbridge_store::MirrorStore;
//! use calbridge_sync::{ActivityLogger, EventService, SyncConfig, SyncGateway};
//!
//! # fn activity_logger() -> Arc<dyn ActivityLogger> { unimplemented!() }
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::default();
//!     let store = MirrorStore::open(&config.database_path)?;
//!     let gateway = SyncGateway::new(
//!         Arc::new(GoogleProvider::new(config.request_timeout)),
//!         Arc::new(MicrosoftProvider::new(config.request_timeout)),
//!     );
//!     let service = EventService::new(gateway, store, activity_logger(), config);
//!
//!     // Hand `service` to the transport layer.
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod effects;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod logger;
pub mod service;

#[cfg(test)]
mod testing;

pub use config::{DEFAULT_LOOKAHEAD_DAYS, DEFAULT_REQUEST_TIMEOUT, SyncConfig};
pub use effects::{
    ActivityLogger, ActivityRecord, EffectError, EffectResult, ObjectStorage, TaskCreator,
    TaskPayload, attempt,
};
pub use error::{SyncError, SyncResult};
pub use feed::{FeedBuilder, FeedQuery};
pub use gateway::{ProviderRoute, Route, SyncGateway};
pub use logger::{LogMeetingOutcome, MeetingLogger};
pub use service::{DeleteOutcome, EventService};
