//! REST client for the bank data feed.
//!
//! Two read-only resources, each a JSON array. One attempt per call, no
//! caching, no auth headers.

use anyhow::Context;
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::models::{AccountRecord, TransactionRecord};
use crate::config::AppConfig;

/// Failures a fetch can produce, each reported differently to the user.
#[derive(Debug, Error)]
pub enum BankError {
    /// The request never produced a status line (DNS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The feed answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(StatusCode),
    /// The feed answered 2xx with an empty or malformed body.
    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Read-only client for the account and transactions resources.
pub struct BankClient {
    http: HttpClient,
    base_url: String,
}

impl BankClient {
    /// Build the client for the configured endpoint and request timeout.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.http_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http, base_url: config.bank_url.trim_end_matches('/').to_string() })
    }

    /// Client against an arbitrary endpoint, for tests.
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { http: HttpClient::new(), base_url: base_url.into() }
    }

    /// GET `{base}/account`.
    ///
    /// # Errors
    /// See [`BankError`].
    pub async fn fetch_account(&self) -> Result<Vec<AccountRecord>, BankError> {
        self.get_records("account").await
    }

    /// GET `{base}/transactions`.
    ///
    /// # Errors
    /// See [`BankError`].
    pub async fn fetch_transactions(&self) -> Result<Vec<TransactionRecord>, BankError> {
        self.get_records("transactions").await
    }

    async fn get_records<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>, BankError> {
        let url = format!("{}/{}", self.base_url, resource);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await.map_err(BankError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BankError::Status(status));
        }

        response.json::<Vec<T>>().await.map_err(BankError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a fresh local port.
    async fn stub_server(status_line: &str, body: &str) -> String {
        let response = format!(
            "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 2048];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn parses_account_records() {
        let base = stub_server("HTTP/1.1 200 OK", r#"[{"value": 523.10}]"#).await;
        let client = BankClient::with_base_url(base);

        let records = client.fetch_account().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value.to_string(), "523.10");
    }

    #[tokio::test]
    async fn parses_transaction_records() {
        let base =
            stub_server("HTTP/1.1 200 OK", r#"[{"date":"2024-01-02","amount":42,"description":"Coffee"}]"#).await;
        let client = BankClient::with_base_url(base);

        let records = client.fetch_transactions().await.unwrap();
        assert_eq!(records[0].date, "2024-01-02");
        assert_eq!(records[0].amount.to_string(), "42");
        assert_eq!(records[0].description, "Coffee");
    }

    #[tokio::test]
    async fn empty_feed_is_not_an_error() {
        let base = stub_server("HTTP/1.1 200 OK", "[]").await;
        let client = BankClient::with_base_url(base);

        assert!(client.fetch_account().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_a_status_error() {
        let base = stub_server("HTTP/1.1 500 Internal Server Error", "").await;
        let client = BankClient::with_base_url(base);

        match client.fetch_account().await {
            Err(BankError::Status(status)) => assert_eq!(status.as_u16(), 500),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_body_is_a_decode_error() {
        let base = stub_server("HTTP/1.1 200 OK", "").await;
        let client = BankClient::with_base_url(base);

        assert!(matches!(client.fetch_account().await, Err(BankError::Decode(_))));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let base = stub_server("HTTP/1.1 200 OK", r#"{"value": 1}"#).await;
        let client = BankClient::with_base_url(base);

        assert!(matches!(client.fetch_account().await, Err(BankError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_feed_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = BankClient::with_base_url(base);
        assert!(matches!(client.fetch_account().await, Err(BankError::Transport(_))));
    }
}
