//! Library refresh notification
//!
//! After a batch publishes something new, the media server is asked to rescan
//! its library. The request is fire-and-report: failures are returned to the
//! dispatcher, which logs them and carries on.

use crate::config::NotificationConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Header carrying the Plex authentication token
const PLEX_TOKEN_HEADER: &str = "X-Plex-Token";

/// Tells the media server that the library changed
#[async_trait]
pub trait LibraryNotifier: Send + Sync {
    /// Request a library refresh
    async fn refresh(&self) -> Result<()>;

    /// Short notifier name for logs
    fn name(&self) -> &'static str;
}

/// Build the notifier selected by configuration
///
/// Without a refresh URL the notifier only logs.
pub fn notifier_from_config(config: &NotificationConfig) -> Arc<dyn LibraryNotifier> {
    match &config.library_refresh_url {
        Some(url) => Arc::new(HttpLibraryNotifier::new(
            url.clone(),
            config.plex_token.clone(),
            config.timeout,
        )),
        None => Arc::new(NoOpNotifier),
    }
}

/// Refreshes the library with an HTTP `GET` to the media server
///
/// For Plex this is typically
/// `http://localhost:32400/library/sections/all/refresh`.
#[derive(Debug, Clone)]
pub struct HttpLibraryNotifier {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpLibraryNotifier {
    /// Create a notifier for `url`, sending `token` as `X-Plex-Token` if set
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            token,
            timeout,
        }
    }
}

#[async_trait]
impl LibraryNotifier for HttpLibraryNotifier {
    async fn refresh(&self) -> Result<()> {
        let mut request = self.client.get(&self.url).timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.header(PLEX_TOKEN_HEADER, token);
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::LibraryRefresh(format!(
                    "refresh request timed out after {:?}",
                    self.timeout
                )));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LibraryRefresh(format!(
                "media server returned status {}: {}",
                status, body
            )));
        }

        debug!(url = %self.url, "library refresh requested");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Notifier that only logs, used when no refresh URL is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl LibraryNotifier for NoOpNotifier {
    async fn refresh(&self) -> Result<()> {
        debug!("no library refresh URL configured, skipping refresh");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REFRESH_PATH: &str = "/library/sections/all/refresh";

    #[tokio::test]
    async fn refresh_sends_get_with_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(REFRESH_PATH))
            .and(header(PLEX_TOKEN_HEADER, "secret-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let notifier = HttpLibraryNotifier::new(
            format!("{}{}", mock_server.uri(), REFRESH_PATH),
            Some("secret-token".to_string()),
            Duration::from_secs(5),
        );

        notifier.refresh().await.unwrap();
    }

    #[tokio::test]
    async fn server_error_is_library_refresh_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&mock_server)
            .await;

        let notifier = HttpLibraryNotifier::new(
            format!("{}{}", mock_server.uri(), REFRESH_PATH),
            None,
            Duration::from_secs(5),
        );

        let err = notifier.refresh().await.unwrap_err();
        match err {
            Error::LibraryRefresh(message) => {
                assert!(message.contains("401"));
                assert!(message.contains("unauthorized"));
            }
            other => panic!("expected LibraryRefresh error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let notifier = HttpLibraryNotifier::new(
            format!("{}{}", mock_server.uri(), REFRESH_PATH),
            None,
            Duration::from_millis(100),
        );

        assert!(notifier.refresh().await.is_err());
    }

    #[test]
    fn config_without_url_builds_noop() {
        let notifier = notifier_from_config(&NotificationConfig::default());
        assert_eq!(notifier.name(), "noop");
    }

    #[test]
    fn config_with_url_builds_http() {
        let config = NotificationConfig {
            library_refresh_url: Some("http://localhost:32400/library/sections/all/refresh".into()),
            ..Default::default()
        };
        assert_eq!(notifier_from_config(&config).name(), "http");
    }
}
