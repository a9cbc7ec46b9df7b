//! Shared HTTP plumbing for the provider clients.
//!
//! Both adapters classify upstream failures identically, so the status
//! mapping lives here instead of being repeated per client.

use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::error::{ProviderError, ProviderResult};

/// Builds the HTTP client a provider adapter uses for all calls.
pub(crate) fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("failed to create HTTP client")
}

/// Maps a transport-level failure onto a provider error.
pub(crate) fn network_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("request timeout")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// Reads a successful response body, or classifies the failure status.
pub(crate) async fn handle_response(response: Response) -> ProviderResult<String> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    match status {
        s if s.is_success() => response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e))),
        StatusCode::UNAUTHORIZED => Err(ProviderError::authentication(
            "access token expired or invalid",
        )),
        StatusCode::FORBIDDEN => Err(ProviderError::authorization("access denied to calendar")),
        StatusCode::NOT_FOUND => Err(ProviderError::not_found("calendar resource not found")),
        StatusCode::BAD_REQUEST => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::bad_request(format!(
                "invalid request: {}",
                body
            )))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::server(format!(
                "API error ({}): {}",
                s, body
            )))
        }
    }
}

/// Parses a JSON response body into the expected shape.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> ProviderResult<T> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    async fn probe(server: &mockito::Server) -> Response {
        reqwest::get(format!("{}/probe", server.url()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn success_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/probe")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let body = handle_response(probe(&server).await).await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn no_content_returns_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/probe")
            .with_status(204)
            .create_async()
            .await;

        let body = handle_response(probe(&server).await).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn unauthorized_classifies_as_authentication() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/probe")
            .with_status(401)
            .create_async()
            .await;

        let err = handle_response(probe(&server).await).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }

    #[tokio::test]
    async fn forbidden_classifies_as_authorization() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/probe")
            .with_status(403)
            .create_async()
            .await;

        let err = handle_response(probe(&server).await).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthorizationFailed);
    }

    #[tokio::test]
    async fn not_found_and_bad_request_classified() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/probe")
            .with_status(404)
            .create_async()
            .await;
        let err = handle_response(probe(&server).await).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);

        let _m = server
            .mock("GET", "/probe")
            .with_status(400)
            .with_body("bad time range")
            .create_async()
            .await;
        let err = handle_response(probe(&server).await).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::BadRequest);
        assert!(err.message().contains("bad time range"));
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/probe")
            .with_status(429)
            .with_header("Retry-After", "7")
            .create_async()
            .await;

        let err = handle_response(probe(&server).await).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::RateLimited);
        assert!(err.message().contains("retry after 7 seconds"));
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/probe")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = handle_response(probe(&server).await).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert!(err.message().contains("503"));
        assert!(err.message().contains("maintenance"));
    }

    #[test]
    fn parse_json_reports_invalid_response() {
        let err = parse_json::<serde_json::Value>("{not json").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }
}
