//! Due-date notifications for subwatch.
//!
//! This crate provides:
//! - `NotificationTransport` trait with ntfy and Gotify implementations
//! - Minijinja rendering of the notification message
//! - `Dispatcher`, which runs one dispatch cycle over the store's snapshot
//! - `DispatchRunner`, the periodic background task driving the dispatcher

pub mod dispatcher;
pub mod gotify;
pub mod ntfy;
pub mod runner;
pub mod templating;
pub mod traits;

use std::sync::Arc;

use subwatch_core::config::{NotifyConfig, NotifyService};

pub use dispatcher::{
    CycleReport, DeliveryRecord, DispatchSnapshot, Dispatcher, SubscriptionFailure, SubscriptionSource,
};
pub use gotify::GotifyTransport;
pub use ntfy::NtfyTransport;
pub use runner::{DispatchRunner, RunnerHandle, DISPATCH_CADENCE};
pub use templating::{MessageContext, MessageRenderer};
pub use traits::{NotificationTransport, NotifyError};

/// Build the transport selected by `NOTIFY_SERVICE`.
pub fn transport_from_config(cfg: &NotifyConfig) -> Arc<dyn NotificationTransport> {
    match cfg.service {
        NotifyService::Ntfy => Arc::new(NtfyTransport::new(cfg.title.clone(), cfg.ntfy_token.clone())),
        NotifyService::Gotify => Arc::new(GotifyTransport::new(cfg.title.clone(), cfg.gotify_priority)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notify_config(service: NotifyService) -> NotifyConfig {
        NotifyConfig {
            service,
            ntfy_domain: "https://ntfy.sh".to_string(),
            ntfy_token: None,
            message_template: None,
            title: "Subscription Due".to_string(),
            gotify_priority: 5,
            dispatch_enabled: true,
        }
    }

    #[test]
    fn transport_follows_configured_service() {
        assert_eq!(transport_from_config(&notify_config(NotifyService::Ntfy)).service_name(), "ntfy");
        assert_eq!(
            transport_from_config(&notify_config(NotifyService::Gotify)).service_name(),
            "gotify"
        );
    }
}
