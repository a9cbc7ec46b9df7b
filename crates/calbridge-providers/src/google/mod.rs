//! The Google adapter.
//!
//! [`GoogleProvider`] reads and writes events through the Calendar API v3
//! and discovers contacts and the user profile through the People API.
//! It covers:
//!
//! - event listing with server-side recurrence expansion and pagination
//! - event creation with optional Google Meet conference provisioning
//! - fetch-first sparse updates that preserve untouched provider fields
//! - contact discovery with a three-strategy People API fallback
//!
//! Tokens are supplied per call by the caller; this module performs no
//! OAuth flows of its own.

mod client;
mod people;
mod provider;

pub use provider::GoogleProvider;
