//! Transport trait definition and shared error types.

use subwatch_core::SubscriptionId;

/// Errors that can occur while rendering or delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("subscription {0} has no notification topic")]
    MissingDestination(SubscriptionId),
}

/// Delivers one rendered message to a push destination.
///
/// `topic` and `domain` are interpreted by the service: ntfy posts to
/// `{domain}/{topic}`, Gotify treats `domain` as the server and `topic` as
/// the application token.
#[async_trait::async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, topic: &str, domain: &str, message: &str) -> Result<(), NotifyError>;

    /// Short service name used in logs (e.g. "ntfy").
    fn service_name(&self) -> &str;
}

/// Turn a non-2xx response into [`NotifyError::Status`].
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(NotifyError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Join a base URL and a path segment without doubling slashes.
pub(crate) fn join_url(domain: &str, path: &str) -> String {
    format!(
        "{}/{}",
        domain.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
