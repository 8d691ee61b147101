//! ntfy transport: plain-text POST to `{domain}/{topic}`.

use tracing::debug;

use crate::traits::{ensure_success, join_url, NotificationTransport, NotifyError};

/// Publishes messages to an ntfy server.
///
/// The message is sent as the request body; the configured title goes in the
/// `Title` header. An access token, when configured, is sent as a bearer
/// token for protected topics.
#[derive(Debug)]
pub struct NtfyTransport {
    title: String,
    token: Option<String>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl NtfyTransport {
    pub fn new(title: impl Into<String>, token: Option<String>) -> Self {
        Self {
            title: title.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, topic: &str, domain: &str, message: &str) -> Result<reqwest::Request, NotifyError> {
        let mut request = self
            .client
            .post(join_url(domain, topic))
            .header("Title", self.title.as_str())
            .body(message.to_string());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Ok(request.build()?)
    }
}

#[async_trait::async_trait]
impl NotificationTransport for NtfyTransport {
    async fn send(&self, topic: &str, domain: &str, message: &str) -> Result<(), NotifyError> {
        let request = self.request(topic, domain, message)?;
        let url = request.url().to_string();
        let response = self.client.execute(request).await?;
        ensure_success(response).await?;
        debug!(%url, "ntfy message published");
        Ok(())
    }

    fn service_name(&self) -> &str {
        "ntfy"
    }
}
