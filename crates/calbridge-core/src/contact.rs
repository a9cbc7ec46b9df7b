//! Contact and profile types shared by both provider adapters.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A contact discovered through a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// The contact's email address, lowercased on ingest.
    pub email: String,
    /// Display name, when the provider supplied one.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Contact {
    /// Creates a new contact, lowercasing the email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into().to_ascii_lowercase(),
            display_name: None,
        }
    }

    /// Builder method to set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// The authenticated user's own profile, used for organizer name backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Profile {
    /// Returns `true` when the profile email matches, case-insensitively.
    pub fn matches_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(email))
    }
}

/// De-duplicates contacts by email, case-insensitively.
///
/// The first-encountered entry wins; later duplicates are dropped.
pub fn dedup_contacts(contacts: Vec<Contact>) -> Vec<Contact> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(contacts.len());
    for contact in contacts {
        if seen.insert(contact.email.to_ascii_lowercase()) {
            out.push(contact);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lowercases_email() {
        let contact = Contact::new("Ana.Lima@Example.COM");
        assert_eq!(contact.email, "ana.lima@example.com");
    }

    #[test]
    fn dedup_is_case_insensitive_and_first_wins() {
        let contacts = vec![
            Contact {
                email: "Ana@example.com".to_string(),
                display_name: Some("Ana (work)".to_string()),
            },
            Contact {
                email: "bo@example.com".to_string(),
                display_name: None,
            },
            Contact {
                email: "ana@EXAMPLE.com".to_string(),
                display_name: Some("Ana (personal)".to_string()),
            },
        ];

        let deduped = dedup_contacts(contacts);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].email, "Ana@example.com");
        assert_eq!(deduped[0].display_name.as_deref(), Some("Ana (work)"));
        assert_eq!(deduped[1].email, "bo@example.com");
    }

    #[test]
    fn dedup_keeps_distinct_emails() {
        let contacts = vec![Contact::new("a@example.com"), Contact::new("b@example.com")];
        assert_eq!(dedup_contacts(contacts).len(), 2);
    }

    #[test]
    fn profile_email_match_ignores_case() {
        let profile = Profile {
            email: Some("Rep@Example.com".to_string()),
            display_name: Some("Rep".to_string()),
        };
        assert!(profile.matches_email("rep@example.com"));
        assert!(!profile.matches_email("other@example.com"));

        assert!(!Profile::default().matches_email("rep@example.com"));
    }
}
