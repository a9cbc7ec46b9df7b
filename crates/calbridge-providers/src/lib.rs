//! Calendar provider adapters.
//!
//! Two upstream calendars, one trait. [`GoogleProvider`] talks to the
//! Calendar v3 and People APIs, [`MicrosoftProvider`] to Microsoft Graph;
//! both hide behind [`CalendarProvider`] so the service layer routes by
//! trait object and never sees a wire format.
//!
//! ```text
//!   Google Calendar / People        Microsoft Graph
//!            │                            │
//!      GoogleProvider              MicrosoftProvider
//!            │                            │
//!            └───── CalendarProvider ─────┘
//!                          │
//!              normalize + reconcile
//!                          │
//!                   CanonicalEvent
//! ```
//!
//! Each adapter owns a thin HTTP client whose base URLs can be overridden,
//! so tests run the full request path against a local mock server. Bearer
//! tokens arrive per call as opaque, pre-obtained credentials; this crate
//! never issues or refreshes them.

pub mod error;
pub mod google;
mod http;
pub mod microsoft;
pub mod normalize;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use google::GoogleProvider;
pub use microsoft::MicrosoftProvider;
pub use normalize::{reconcile_location, resolve_organizer_name};
pub use provider::{BoxFuture, CalendarProvider};
