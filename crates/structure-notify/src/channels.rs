//! Notification channels for digest delivery.
//!
//! This module provides the [`NotificationChannel`] trait, a
//! [`WebhookChannel`] that posts to a chat incoming webhook and a
//! [`LogChannel`] that prints instead of posting.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{NotifyError, Result};

/// A set of messages to deliver as one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Messages in display order.
    pub messages: Vec<String>,
}

impl Notification {
    /// Creates a notification from ordered messages.
    #[must_use]
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Messages separated by blank lines.
    #[must_use]
    pub fn text(&self) -> String {
        self.messages.join("\n\n")
    }

    /// True if there is nothing to deliver.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Result of sending a notification.
#[derive(Debug, Clone)]
pub struct NotificationResult {
    /// Whether the notification was delivered.
    pub success: bool,
    /// The channel that processed this notification.
    pub channel: String,
    /// Optional message or error description.
    pub message: Option<String>,
    /// Response status code (if applicable).
    pub status_code: Option<u16>,
}

impl NotificationResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: None,
            status_code: None,
        }
    }

    /// Sets the status code.
    #[must_use]
    pub const fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

/// Trait for notification channels.
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Returns the name of this channel.
    fn name(&self) -> &str;

    /// Delivers a notification.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` or `NotifyError::Rejected` if delivery
    /// fails.
    fn send(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<NotificationResult>> + Send;
}

/// Configuration for a webhook channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// The name of this webhook.
    pub name: String,
    /// The incoming webhook URL.
    pub url: String,
    /// Chat channel override sent in the payload.
    pub channel: Option<String>,
    /// Timeout in seconds for HTTP requests.
    pub timeout_secs: u64,
    /// User agent sent with requests.
    pub user_agent: Option<String>,
}

impl WebhookConfig {
    /// Creates a new webhook configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::InvalidConfig` if the URL is empty.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(NotifyError::InvalidConfig {
                reason: "webhook URL cannot be empty".to_string(),
            });
        }

        Ok(Self {
            name: name.into(),
            url,
            channel: None,
            timeout_secs: 30,
            user_agent: None,
        })
    }

    /// Sets the chat channel override.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Body posted to the incoming webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Message text.
    pub text: String,
    /// Chat channel override.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub channel: Option<String>,
}

impl WebhookPayload {
    /// Builds the payload for a notification.
    #[must_use]
    pub fn from_notification(notification: &Notification, channel: Option<&str>) -> Self {
        Self {
            text: notification.text(),
            channel: channel.map(str::to_string),
        }
    }
}

/// Posts notifications as JSON to an incoming webhook.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Creates a webhook channel with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` if the client cannot be built.
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Returns the webhook URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Formats the notification as JSON.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::SerializationError` if serialization fails.
    pub fn format_payload(&self, notification: &Notification) -> Result<String> {
        let payload = WebhookPayload::from_notification(notification, self.config.channel.as_deref());
        serde_json::to_string(&payload).map_err(NotifyError::from)
    }
}

impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn send(&self, notification: &Notification) -> Result<NotificationResult> {
        let payload = self.format_payload(notification)?;
        debug!(channel = %self.name(), bytes = payload.len(), "posting webhook notification");
        let response = self
            .client
            .post(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                channel = %self.name(),
                status = status.as_u16(),
                body = %body,
                "webhook rejected notification"
            );
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            channel = %self.name(),
            messages = notification.messages.len(),
            status = status.as_u16(),
            "sent webhook notification"
        );
        Ok(NotificationResult::success(self.name()).with_status_code(status.as_u16()))
    }
}

/// Prints notifications to stdout instead of posting them.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
}

impl LogChannel {
    /// Creates a new log channel.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new("log")
    }
}

impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<NotificationResult> {
        debug!(
            channel = %self.name(),
            messages = notification.messages.len(),
            "printing notification"
        );
        println!("{}", notification.text());
        Ok(NotificationResult::success(self.name()).with_message("printed to stdout"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn notification() -> Notification {
        Notification::new(vec![
            "Upcoming Test Corp Structure Maintenance Tasks".to_string(),
            "Jita - Keepstar\nNo core installed".to_string(),
        ])
    }

    /// Serves one request with the given status line and returns the raw
    /// request it received.
    async fn serve_once(status_line: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!("{status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok");
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (url, handle)
    }

    mod notification_tests {
        use super::*;

        #[test]
        fn text_joins_with_blank_lines() {
            assert_eq!(
                notification().text(),
                "Upcoming Test Corp Structure Maintenance Tasks\n\nJita - Keepstar\nNo core installed"
            );
        }

        #[test]
        fn empty_notification() {
            assert!(Notification::new(Vec::new()).is_empty());
            assert!(!notification().is_empty());
        }
    }

    mod payload_tests {
        use super::*;

        #[test]
        fn channel_omitted_when_unset() {
            let payload = WebhookPayload::from_notification(&notification(), None);
            let json = serde_json::to_value(&payload).unwrap();
            assert!(json.get("channel").is_none());
            assert_eq!(json["text"], notification().text());
        }

        #[test]
        fn configured_channel_is_sent() {
            let payload = WebhookPayload::from_notification(&notification(), Some("#structures"));
            assert_eq!(payload.channel.as_deref(), Some("#structures"));
        }
    }

    mod webhook_config_tests {
        use super::*;

        #[test]
        fn create_webhook_config() {
            let config = WebhookConfig::new("slack", "https://hooks.slack.com/services/T0/B0/x").unwrap();
            assert_eq!(config.name, "slack");
            assert_eq!(config.timeout_secs, 30);
            assert!(config.user_agent.is_none());
        }

        #[test]
        fn webhook_config_empty_url_fails() {
            match WebhookConfig::new("slack", "  ") {
                Err(NotifyError::InvalidConfig { reason }) => assert!(reason.contains("empty")),
                other => panic!("expected InvalidConfig, got {other:?}"),
            }
        }

        #[test]
        fn webhook_config_builders() {
            let config = WebhookConfig::new("slack", "http://example.com")
                .unwrap()
                .with_channel("#ops")
                .with_timeout_secs(5)
                .with_user_agent("structurebot");
            assert_eq!(config.channel.as_deref(), Some("#ops"));
            assert_eq!(config.timeout_secs, 5);
            assert_eq!(config.user_agent.as_deref(), Some("structurebot"));
        }
    }

    mod webhook_channel_tests {
        use super::*;

        #[tokio::test]
        async fn posts_json_payload() {
            let (url, server) = serve_once("HTTP/1.1 200 OK").await;
            let channel = WebhookChannel::new(
                WebhookConfig::new("slack", url).unwrap().with_channel("#structures"),
            )
            .unwrap();

            let result = channel.send(&notification()).await.unwrap();
            assert!(result.success);
            assert_eq!(result.status_code, Some(200));

            let request = server.await.unwrap();
            assert!(request.starts_with("POST /hook"));
            let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
            let payload: WebhookPayload = serde_json::from_str(body).unwrap();
            assert_eq!(payload.text, notification().text());
            assert_eq!(payload.channel.as_deref(), Some("#structures"));
        }

        #[tokio::test]
        async fn non_success_status_is_an_error() {
            let (url, server) = serve_once("HTTP/1.1 404 Not Found").await;
            let channel = WebhookChannel::new(WebhookConfig::new("slack", url).unwrap()).unwrap();

            let err = channel.send(&notification()).await.unwrap_err();
            assert!(matches!(err, NotifyError::Rejected { status: 404, .. }));
            server.await.unwrap();
        }

        #[test]
        fn format_payload() {
            let channel = WebhookChannel::new(WebhookConfig::new("slack", "http://example.com").unwrap()).unwrap();
            assert_eq!(channel.url(), "http://example.com");
            let json = channel.format_payload(&Notification::new(vec!["a".to_string()])).unwrap();
            assert_eq!(json, r#"{"text":"a"}"#);
        }
    }

    mod log_channel_tests {
        use super::*;

        #[tokio::test]
        async fn log_channel_prints() {
            let channel = LogChannel::default();
            assert_eq!(channel.name(), "log");
            let result = channel.send(&notification()).await.unwrap();
            assert!(result.success);
            assert_eq!(result.message.as_deref(), Some("printed to stdout"));
        }
    }
}
