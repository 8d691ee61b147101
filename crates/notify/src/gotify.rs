//! Gotify transport: JSON POST to `{domain}/message?token={topic}`.

use serde::Serialize;
use tracing::debug;

use crate::traits::{ensure_success, join_url, NotificationTransport, NotifyError};

#[derive(Debug, Serialize)]
struct GotifyMessage<'a> {
    title: &'a str,
    message: &'a str,
    priority: u8,
}

/// Pushes messages to a Gotify server. The destination topic is the
/// application token and the domain is the server base URL.
#[derive(Debug)]
pub struct GotifyTransport {
    title: String,
    priority: u8,
    client: reqwest::Client,
}

impl GotifyTransport {
    pub fn new(title: impl Into<String>, priority: u8) -> Self {
        Self {
            title: title.into(),
            priority,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, token: &str, domain: &str, message: &str) -> Result<reqwest::Request, NotifyError> {
        let payload = GotifyMessage {
            title: &self.title,
            message,
            priority: self.priority,
        };
        Ok(self
            .client
            .post(join_url(domain, "message"))
            .query(&[("token", token)])
            .json(&payload)
            .build()?)
    }
}

#[async_trait::async_trait]
impl NotificationTransport for GotifyTransport {
    async fn send(&self, topic: &str, domain: &str, message: &str) -> Result<(), NotifyError> {
        let request = self.request(topic, domain, message)?;
        let response = self.client.execute(request).await?;
        ensure_success(response).await?;
        debug!(domain, "gotify message pushed");
        Ok(())
    }

    fn service_name(&self) -> &str {
        "gotify"
    }
}
