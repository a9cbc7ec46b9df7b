//! Normalization helpers shared by both provider adapters.
//!
//! Google and Microsoft describe the same facts in different places; the
//! helpers here collapse those signals into the canonical fields so the
//! adapters only differ in wire parsing.

use calbridge_core::{
    ConferenceKind, FALLBACK_ORGANIZER_NAME, LocationKind, Profile, detect_conference,
};

/// Classifies where a meeting happens from the signals a provider exposes.
///
/// Precedence: an explicit online-meeting marker in the native payload wins,
/// then conference URLs found in the location text, then in the description.
/// A plain non-empty location string classifies as in-person.
pub fn reconcile_location(
    native: Option<ConferenceKind>,
    location: Option<&str>,
    description: Option<&str>,
) -> (LocationKind, bool, Option<ConferenceKind>) {
    let detected = native
        .or_else(|| location.and_then(detect_conference))
        .or_else(|| description.and_then(detect_conference));

    if let Some(kind) = detected {
        return (conference_location(kind), true, Some(kind));
    }

    match location {
        Some(text) if !text.trim().is_empty() => (LocationKind::InPerson, false, None),
        _ => (LocationKind::Other, false, None),
    }
}

fn conference_location(kind: ConferenceKind) -> LocationKind {
    match kind {
        ConferenceKind::GoogleMeet => LocationKind::GoogleMeet,
        ConferenceKind::Teams => LocationKind::Teams,
        ConferenceKind::Zoom | ConferenceKind::Other => LocationKind::Other,
    }
}

/// Resolves the organizer display name for a normalized event.
///
/// Falls back through: the name carried in the provider payload, the
/// authenticated user's profile (only when the organizer email is the
/// user's own), the organizer email, and finally `"user"`.
pub fn resolve_organizer_name(
    payload_name: Option<&str>,
    email: Option<&str>,
    profile: Option<&Profile>,
) -> String {
    if let Some(name) = payload_name
        && !name.trim().is_empty()
    {
        return name.to_string();
    }

    if let Some(profile) = profile
        && let Some(addr) = email
        && profile.matches_email(addr)
        && let Some(display) = profile.display_name.as_deref()
        && !display.trim().is_empty()
    {
        return display.to_string();
    }

    if let Some(addr) = email
        && !addr.trim().is_empty()
    {
        return addr.to_string();
    }

    FALLBACK_ORGANIZER_NAME.to_string()
}
