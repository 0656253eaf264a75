use reqwest::{header, Client, Response};
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Firebase Realtime Database REST client.
pub struct FirebaseClient {
    http_client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl FirebaseClient {
    /// # Errors
    ///
    /// Returns `AppError::Firebase` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        // No overall timeout: the stream stays open indefinitely and idle
        // detection happens on the byte stream instead.
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Firebase(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.firebase_database_url.clone(),
            auth_token: config.firebase_auth_token.clone(),
        })
    }

    /// REST URL of a database path, e.g. `machines` -> `{base}/machines.json`.
    ///
    /// The auth token is sent as a query parameter on the request, never
    /// embedded here.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    /// Open a Server-Sent Events stream on `path`.
    ///
    /// Firebase answers with a `put` of the full subtree, then `put`/`patch`
    /// events for every change below it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Firebase` if the request fails or returns an error status.
    /// Error messages never carry the request URL, which holds the auth token.
    pub async fn open_stream(&self, path: &str) -> AppResult<Response> {
        let mut request = self
            .http_client
            .get(self.url_for(path))
            .header(header::ACCEPT, "text/event-stream");
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Firebase(format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Firebase(format!(
                "Permission denied ({status}) for path '{path}'"
            )));
        }

        if !status.is_success() {
            return Err(AppError::Firebase(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Deployment;

    fn config(token: Option<&str>, database_url: &str) -> Config {
        Config {
            database_url: "mysql://localhost/flameshield".to_string(),
            run_migrations: false,
            firebase_database_url: database_url.to_string(),
            firebase_auth_token: token.map(str::to_string),
            firebase_machines_path: "machines".to_string(),
            firebase_reconnect_delay_seconds: 5,
            firebase_idle_timeout_seconds: 90,
            sync_event_buffer: 16,
            api_host: "127.0.0.1".to_string(),
            api_port: 5000,
            disable_rate_limiting: true,
            rate_limit_per_second: 10,
            rate_limit_burst: 60,
            trust_proxy_headers: false,
            deployment: Deployment::Local,
        }
    }

    #[test]
    fn url_appends_json_suffix() {
        let client = FirebaseClient::new(&config(None, "https://flame-shield.example.firebaseio.com")).unwrap();
        assert_eq!(
            client.url_for("/machines/"),
            "https://flame-shield.example.firebaseio.com/machines.json"
        );
    }

    #[test]
    fn url_never_contains_token() {
        let client = FirebaseClient::new(&config(Some("secret"), "https://flame-shield.example.firebaseio.com")).unwrap();
        assert!(!client.url_for("machines").contains("secret"));
    }

    #[tokio::test]
    async fn connect_errors_do_not_leak_token() {
        let client = FirebaseClient::new(&config(Some("s3cretTOKEN"), "http://127.0.0.1:1")).unwrap();

        let err = client.open_stream("machines").await.unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Firebase error: Request failed"), "{message}");
        assert!(!message.contains("s3cretTOKEN"), "{message}");
    }
}
