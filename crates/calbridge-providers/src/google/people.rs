//! Google People API client.
//!
//! Contacts are discovered through three strategies tried in order, stopping
//! at the first one that yields anything: the user's saved connections, the
//! automatically-collected "other contacts", and finally contact-group
//! membership resolved through a batch lookup. The same API also serves the
//! authenticated user's own profile for organizer name backfill.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use calbridge_core::{Contact, Profile, dedup_contacts};

use crate::error::ProviderResult;
use crate::http::{build_client, handle_response, network_error, parse_json};

/// Base URL for the Google People API.
const PEOPLE_API_BASE: &str = "https://people.googleapis.com";

/// Fields requested for every person lookup.
const PERSON_FIELDS: &str = "names,emailAddresses";

/// Google People API client.
#[derive(Debug)]
pub(super) struct GooglePeopleClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GooglePeopleClient {
    /// Creates a new People API client.
    pub(super) fn new(timeout: Duration) -> Self {
        Self {
            http_client: build_client(timeout),
            base_url: PEOPLE_API_BASE.to_string(),
        }
    }

    /// Points the client at a different API root, for tests.
    pub(super) fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches the user's contacts, falling back through the three
    /// discovery strategies and de-duplicating by email.
    pub(super) async fn fetch_contacts(&self, token: &str) -> ProviderResult<Vec<Contact>> {
        let connections = self.list_connections(token).await?;
        if !connections.is_empty() {
            debug!("found {} contacts via connections", connections.len());
            return Ok(dedup_contacts(connections));
        }

        let other = self.list_other_contacts(token).await?;
        if !other.is_empty() {
            debug!("found {} contacts via other contacts", other.len());
            return Ok(dedup_contacts(other));
        }

        let grouped = self.list_group_members(token).await?;
        debug!("found {} contacts via contact groups", grouped.len());
        Ok(dedup_contacts(grouped))
    }

    /// Fetches the authenticated user's own profile.
    pub(super) async fn fetch_profile(&self, token: &str) -> ProviderResult<Profile> {
        let url = format!("{}/v1/people/me", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[("personFields", PERSON_FIELDS)])
            .send()
            .await
            .map_err(network_error)?;

        let body = handle_response(response).await?;
        let person: Person = parse_json(&body)?;

        Ok(Profile {
            email: first_email(&person),
            display_name: first_display_name(&person),
        })
    }

    async fn list_connections(&self, token: &str) -> ProviderResult<Vec<Contact>> {
        let url = format!("{}/v1/people/me/connections", self.base_url);
        let mut contacts = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url).bearer_auth(token).query(&[
                ("personFields", PERSON_FIELDS),
                ("pageSize", "200"),
            ]);

            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await.map_err(network_error)?;
            let body = handle_response(response).await?;
            let page: ConnectionsResponse = parse_json(&body)?;

            contacts.extend(page.connections.into_iter().filter_map(person_to_contact));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(contacts)
    }

    async fn list_other_contacts(&self, token: &str) -> ProviderResult<Vec<Contact>> {
        let url = format!("{}/v1/otherContacts", self.base_url);
        let mut contacts = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url).bearer_auth(token).query(&[
                ("readMask", PERSON_FIELDS),
                ("pageSize", "200"),
            ]);

            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await.map_err(network_error)?;
            let body = handle_response(response).await?;
            let page: OtherContactsResponse = parse_json(&body)?;

            contacts.extend(page.other_contacts.into_iter().filter_map(person_to_contact));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(contacts)
    }

    async fn list_group_members(&self, token: &str) -> ProviderResult<Vec<Contact>> {
        let url = format!("{}/v1/contactGroups", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;

        let body = handle_response(response).await?;
        let groups: ContactGroupsResponse = parse_json(&body)?;

        let mut member_names: Vec<String> = Vec::new();
        for group in groups.contact_groups {
            if group.member_count.unwrap_or(0) == 0 {
                continue;
            }

            let url = format!("{}/v1/{}", self.base_url, group.resource_name);
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(token)
                .query(&[("maxMembers", "200")])
                .send()
                .await
                .map_err(network_error)?;

            let body = handle_response(response).await?;
            let detail: ContactGroup = parse_json(&body)?;
            member_names.extend(detail.member_resource_names);
        }

        let mut contacts = Vec::new();
        // people:batchGet caps resource names per call
        for chunk in member_names.chunks(50) {
            let mut request = self
                .http_client
                .get(format!("{}/v1/people:batchGet", self.base_url))
                .bearer_auth(token)
                .query(&[("personFields", PERSON_FIELDS)]);

            for name in chunk {
                request = request.query(&[("resourceNames", name.as_str())]);
            }

            let response = request.send().await.map_err(network_error)?;
            let body = handle_response(response).await?;
            let batch: BatchGetResponse = parse_json(&body)?;

            contacts.extend(
                batch
                    .responses
                    .into_iter()
                    .filter_map(|r| r.person)
                    .filter_map(person_to_contact),
            );
        }

        Ok(contacts)
    }
}

fn person_to_contact(person: Person) -> Option<Contact> {
    let email = first_email(&person)?;
    let mut contact = Contact::new(email);
    if let Some(name) = first_display_name(&person) {
        contact = contact.with_display_name(name);
    }
    Some(contact)
}

fn first_email(person: &Person) -> Option<String> {
    person
        .email_addresses
        .iter()
        .filter_map(|e| e.value.as_deref())
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn first_display_name(person: &Person) -> Option<String> {
    person
        .names
        .iter()
        .filter_map(|n| n.display_name.as_deref())
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// A person record from the People API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Person {
    #[serde(default)]
    names: Vec<PersonName>,
    #[serde(default)]
    email_addresses: Vec<PersonEmail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonName {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonEmail {
    value: Option<String>,
}

/// Response from people.connections.list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionsResponse {
    #[serde(default)]
    connections: Vec<Person>,
    next_page_token: Option<String>,
}

/// Response from otherContacts.list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtherContactsResponse {
    #[serde(default)]
    other_contacts: Vec<Person>,
    next_page_token: Option<String>,
}

/// Response from contactGroups.list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactGroupsResponse {
    #[serde(default)]
    contact_groups: Vec<ContactGroup>,
}

/// A contact group; the detail fetch fills `memberResourceNames`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactGroup {
    resource_name: String,
    member_count: Option<u32>,
    #[serde(default)]
    member_resource_names: Vec<String>,
}

/// Response from people.batchGet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    responses: Vec<PersonResponse>,
}

#[derive(Debug, Deserialize)]
struct PersonResponse {
    person: Option<Person>,
}
