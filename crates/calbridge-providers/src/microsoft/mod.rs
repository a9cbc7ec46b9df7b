//! Microsoft Graph provider.
//!
//! Features:
//! - Event listing through `/me/calendarView` with `@odata.nextLink`
//!   pagination, times pinned to UTC via the `Prefer` header
//! - Teams meeting provisioning on create
//! - Sparse updates with a fetch-first step so one-sided time changes
//!   keep the stored duration
//! - Contacts and the caller's profile from the same Graph surface
//!
//! Access tokens arrive with every call; no OAuth flow lives here.

mod client;
mod provider;

pub use provider::MicrosoftProvider;
