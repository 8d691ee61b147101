//! Shared application state handed to every handler.

use std::sync::Arc;

use chrono::NaiveDateTime;

use subwatch_core::{Config, MonthRollover};
use subwatch_notify::{transport_from_config, Dispatcher, MessageRenderer, NotificationTransport};
use subwatch_store::SubscriptionStore;

pub struct AppState {
    pub store: Arc<SubscriptionStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub rollover: MonthRollover,
}

impl AppState {
    /// Wire the store to the transport selected in `config`.
    pub fn from_config(config: &Config, store: Arc<SubscriptionStore>) -> anyhow::Result<Self> {
        let transport = transport_from_config(&config.notify);
        Self::with_transport(config, store, transport)
    }

    /// Like [`from_config`](Self::from_config) with an explicit transport.
    pub fn with_transport(
        config: &Config,
        store: Arc<SubscriptionStore>,
        transport: Arc<dyn NotificationTransport>,
    ) -> anyhow::Result<Self> {
        let renderer = MessageRenderer::new(config.notify.message_template.clone())?;
        let rollover = config.schedule.month_rollover;
        let dispatcher = Dispatcher::new(store.clone(), transport, renderer)
            .with_rollover(rollover)
            .with_default_domain(config.notify.ntfy_domain.clone());

        Ok(Self {
            store,
            dispatcher: Arc::new(dispatcher),
            rollover,
        })
    }
}

/// Naive local wall-clock time; all schedule math works on naive timestamps.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
