//! Client for the external postal-code lookup API.

use crate::domain::model::{AddressEntries, AddressEntry};
use crate::domain::ports::PostalLookup;
use crate::utils::error::LookupError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;

static POSTAL_CODE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{3}$").expect("postal code pattern"));

/// `DDDD-DDD`, ASCII digits only.
pub fn is_valid_postal_code(code: &str) -> bool {
    POSTAL_CODE_FORMAT.is_match(code)
}

pub struct CttLookupClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CttLookupClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, code: &str) -> String {
        format!(
            "{}/api/v1/{}/{}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            code
        )
    }
}

#[async_trait]
impl PostalLookup for CttLookupClient {
    async fn lookup(&self, code: &str) -> Result<AddressEntries, LookupError> {
        if !is_valid_postal_code(code) {
            return Err(LookupError::InvalidFormat);
        }

        // endpoint embeds the API key; only the code goes to the logs
        tracing::debug!(cp = %code, "Querying external postal-code API");
        let response = match self.client.get(self.endpoint(code)).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(cp = %code, error = %e.without_url(), "Postal code API error");
                return Err(LookupError::Unavailable);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(cp = %code, status = status.as_u16(), "Postal code API returned non-success");
            return Err(LookupError::UnexpectedStatus(status.as_u16()));
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(cp = %code, error = %e.without_url(), "Postal code API returned malformed body");
                return Err(LookupError::Unavailable);
            }
        };

        entries_from_body(body).ok_or_else(|| {
            tracing::warn!(cp = %code, "Postal code API returned no address entries");
            LookupError::NoData
        })
    }
}

/// Object items of a JSON array; anything else counts as no data.
fn entries_from_body(body: serde_json::Value) -> Option<AddressEntries> {
    let serde_json::Value::Array(items) = body else {
        return None;
    };

    let entries = items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Object(data) => Some(AddressEntry { data }),
            _ => None,
        })
        .collect();

    AddressEntries::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tracing_test::traced_test;

    const KEY: &str = "test-key";

    #[test]
    fn test_postal_code_format() {
        assert!(is_valid_postal_code("1000-001"));
        assert!(!is_valid_postal_code("1000001"));
        assert!(!is_valid_postal_code("1000-01"));
        assert!(!is_valid_postal_code(" 1000-001"));
        assert!(!is_valid_postal_code("١٠٠٠-٠٠١"));
    }

    #[tokio::test]
    async fn test_lookup_success_returns_entries() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/test-key/1000-001");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    {"cp": "1000-001", "localidade": "Lisboa", "morada": "Avenida da Liberdade"},
                    {"cp": "1000-001", "localidade": "Lisboa", "morada": "Rua Castilho"}
                ]));
        });

        let client = CttLookupClient::new(server.base_url(), KEY);
        let entries = client.lookup("1000-001").await.unwrap();

        api_mock.assert();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.primary().localidade(), Some("Lisboa"));
        assert_eq!(entries.primary().text("morada"), Some("Avenida da Liberdade"));
    }

    #[tokio::test]
    async fn test_bad_format_makes_no_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(serde_json::json!([]));
        });

        let client = CttLookupClient::new(server.base_url(), KEY);
        let err = client.lookup("bad").await.unwrap_err();

        assert_eq!(err, LookupError::InvalidFormat);
        api_mock.assert_hits(0);
    }

    fn warned_for_code(lines: &[&str]) -> Result<(), String> {
        if lines
            .iter()
            .any(|line| line.contains("WARN") && line.contains("cp=1000-001"))
        {
            Ok(())
        } else {
            Err("no warning carrying the postal code".to_string())
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_not_found_status_is_reported() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/test-key/1000-001");
            then.status(404);
        });

        let client = CttLookupClient::new(server.base_url(), KEY);
        let err = client.lookup("1000-001").await.unwrap_err();

        api_mock.assert();
        assert_eq!(err, LookupError::UnexpectedStatus(404));
        assert!(logs_contain("Postal code API returned non-success"));
        logs_assert(warned_for_code);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_empty_array_means_no_data() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/test-key/1000-001");
            then.status(200).json_body(serde_json::json!([]));
        });

        let client = CttLookupClient::new(server.base_url(), KEY);
        assert_eq!(client.lookup("1000-001").await.unwrap_err(), LookupError::NoData);
        assert!(logs_contain("Postal code API returned no address entries"));
        logs_assert(warned_for_code);
    }

    #[tokio::test]
    async fn test_object_body_means_no_data() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/test-key/1000-001");
            then.status(200).json_body(serde_json::json!({"error": "limite excedido"}));
        });

        let client = CttLookupClient::new(server.base_url(), KEY);
        assert_eq!(client.lookup("1000-001").await.unwrap_err(), LookupError::NoData);
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/test-key/1000-001");
            then.status(200).body("<html>maintenance</html>");
        });

        let client = CttLookupClient::new(server.base_url(), KEY);
        assert_eq!(client.lookup("1000-001").await.unwrap_err(), LookupError::Unavailable);
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let client = CttLookupClient::new("http://127.0.0.1:1", KEY);
        assert_eq!(client.lookup("1000-001").await.unwrap_err(), LookupError::Unavailable);
    }
}
