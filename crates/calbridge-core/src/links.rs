//! Conference-URL detection for location reconciliation.
//!
//! Provider payloads do not always mark an event as an online meeting even
//! when its location or description carries a join URL. This module scans
//! free text for conferencing URLs so events classify consistently: pull
//! URLs out of locations and descriptions, strip the Outlook SafeLink
//! wrapper, and map the host to a [`ConferenceKind`].

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::event::ConferenceKind;

/// Matches bare URLs embedded in free text.
static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'\)\]]+"#).expect("Invalid URL regex"));

/// Matches Outlook SafeLinks, capturing the encoded original URL.
///
/// SafeLinks redirect through `safelinks.protection.outlook.com` and
/// carry the real destination percent-encoded in the `url` parameter.
static SAFELINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^/]*safelinks\.protection\.outlook\.com/?\?[^?]*url=([^&]+)")
        .expect("Invalid SafeLink regex")
});

/// Recovers the destination URL from an Outlook SafeLink.
///
/// Anything that is not a SafeLink passes through unchanged.
pub fn unwrap_safelink(url: &str) -> String {
    if let Some(caps) = SAFELINK_REGEX.captures(url)
        && let Some(encoded) = caps.get(1)
        && let Ok(decoded) = urlencoding::decode(encoded.as_str())
    {
        return decoded.into_owned();
    }
    url.to_string()
}

/// Classifies a single URL by its conferencing service host.
///
/// SafeLinks are unwrapped first. URLs that do not parse or belong to no
/// known service classify as [`ConferenceKind::Other`].
pub fn classify_conference_url(url: &str) -> ConferenceKind {
    let unwrapped = unwrap_safelink(url);
    let Ok(parsed) = Url::parse(&unwrapped) else {
        return ConferenceKind::Other;
    };
    let Some(host) = parsed.host_str() else {
        return ConferenceKind::Other;
    };

    if host == "meet.google.com" {
        ConferenceKind::GoogleMeet
    } else if host == "teams.microsoft.com" || host == "teams.live.com" {
        ConferenceKind::Teams
    } else if host == "zoom.us"
        || host.ends_with(".zoom.us")
        || host == "zoomgov.com"
        || host.ends_with(".zoomgov.com")
    {
        ConferenceKind::Zoom
    } else {
        ConferenceKind::Other
    }
}

/// Scans free text for a conferencing URL and returns the first service
/// found, or `None` when no known service appears.
pub fn detect_conference(text: &str) -> Option<ConferenceKind> {
    URL_REGEX
        .find_iter(text)
        .map(|m| classify_conference_url(m.as_str()))
        .find(|kind| *kind != ConferenceKind::Other)
}
