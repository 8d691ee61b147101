//! One dispatch cycle: find occurrences due in the next 24 hours and push a
//! notification for each.
//!
//! A cycle works from a single snapshot of the store and a single `now`.
//! Failures are isolated at the smallest unit they affect: a calendar error
//! skips its subscription, a delivery error affects only its occurrence, and
//! only a failed store read skips the whole cycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use subwatch_core::timestamp::{self, format_date};
use subwatch_core::{
    MonthRollover, NotificationSettings, RecurrenceError, Subscription, SubscriptionId,
    UserConfiguration, Window,
};
use subwatch_store::{StoreError, SubscriptionStore};

use crate::templating::{MessageContext, MessageRenderer};
use crate::traits::{NotificationTransport, NotifyError};

// ── Source ────────────────────────────────────────────────────

/// Everything a cycle reads from the store, taken under one lock.
#[derive(Debug, Clone, Default)]
pub struct DispatchSnapshot {
    pub subscriptions: Vec<Subscription>,
    pub settings: Option<NotificationSettings>,
    pub user_configuration: UserConfiguration,
}

/// Where the dispatcher loads its per-cycle snapshot from.
#[async_trait::async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Notify-enabled subscriptions in store order, plus the settings
    /// needed to resolve destinations and currencies.
    async fn load_notifiable(&self) -> Result<DispatchSnapshot, StoreError>;
}

#[async_trait::async_trait]
impl SubscriptionSource for SubscriptionStore {
    async fn load_notifiable(&self) -> Result<DispatchSnapshot, StoreError> {
        let txn = self.begin().await;
        Ok(DispatchSnapshot {
            subscriptions: txn.list_notifiable(),
            settings: txn.notification_settings(),
            user_configuration: txn.user_configuration(),
        })
    }
}

// ── Report ────────────────────────────────────────────────────

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub subscription_id: SubscriptionId,
    pub name: String,
    #[serde(with = "timestamp::naive")]
    pub occurrence: NaiveDateTime,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A subscription skipped for the cycle because its schedule could not be
/// computed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFailure {
    pub subscription_id: SubscriptionId,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    #[serde(with = "timestamp::naive")]
    pub now: NaiveDateTime,
    pub subscriptions_checked: usize,
    /// Delivery attempts, in store order then chronological order.
    pub deliveries: Vec<DeliveryRecord>,
    pub failures: Vec<SubscriptionFailure>,
}

impl CycleReport {
    fn new(now: NaiveDateTime) -> Self {
        Self {
            now,
            subscriptions_checked: 0,
            deliveries: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn sent(&self) -> usize {
        self.deliveries.iter().filter(|d| d.success).count()
    }

    pub fn failed(&self) -> usize {
        self.deliveries.iter().filter(|d| !d.success).count()
    }
}

// ── Dispatcher ────────────────────────────────────────────────

/// Runs dispatch cycles against a source and a transport.
pub struct Dispatcher {
    source: Arc<dyn SubscriptionSource>,
    transport: Arc<dyn NotificationTransport>,
    renderer: MessageRenderer,
    rollover: MonthRollover,
    /// Destination used when neither the subscription nor the stored
    /// settings provide one (domain only; topic stays unset).
    default_settings: NotificationSettings,
}

impl Dispatcher {
    pub fn new(
        source: Arc<dyn SubscriptionSource>,
        transport: Arc<dyn NotificationTransport>,
        renderer: MessageRenderer,
    ) -> Self {
        Self {
            source,
            transport,
            renderer,
            rollover: MonthRollover::default(),
            default_settings: NotificationSettings::default(),
        }
    }

    pub fn with_rollover(mut self, rollover: MonthRollover) -> Self {
        self.rollover = rollover;
        self
    }

    /// Domain used for subscriptions with no domain of their own when no
    /// global settings are stored.
    pub fn with_default_domain(mut self, domain: impl Into<String>) -> Self {
        self.default_settings.domain = domain.into();
        self
    }

    /// Load the store snapshot and run one cycle at `now`.
    ///
    /// A failed load is logged and returned; nothing is sent.
    pub async fn run_cycle(&self, now: NaiveDateTime) -> Result<CycleReport, StoreError> {
        let snapshot = match self.source.load_notifiable().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Could not load subscriptions, skipping dispatch cycle");
                return Err(e);
            }
        };
        Ok(self.run_dispatch_cycle(now, &snapshot).await)
    }

    /// Run one cycle over an already-loaded snapshot.
    ///
    /// Subscriptions are processed in snapshot order and each subscription's
    /// due occurrences in ascending order. Subscriptions with `notify = false`
    /// are ignored.
    pub async fn run_dispatch_cycle(
        &self,
        now: NaiveDateTime,
        snapshot: &DispatchSnapshot,
    ) -> CycleReport {
        let window = Window::dispatch(now);
        let fallback = snapshot.settings.as_ref().unwrap_or(&self.default_settings);
        let mut report = CycleReport::new(now);

        info!(
            now = %now,
            subscriptions = snapshot.subscriptions.len(),
            service = self.transport.service_name(),
            "Dispatch cycle started"
        );

        for subscription in snapshot.subscriptions.iter().filter(|s| s.notify) {
            report.subscriptions_checked += 1;

            let due = match window.filter(window.schedule(subscription, self.rollover)) {
                Ok(due) => due,
                Err(e) => {
                    self.record_schedule_failure(&mut report, subscription, &e);
                    continue;
                }
            };

            for occurrence in due {
                let record = self
                    .deliver(subscription, occurrence, fallback, &snapshot.user_configuration)
                    .await;
                report.deliveries.push(record);
            }
        }

        info!(
            checked = report.subscriptions_checked,
            sent = report.sent(),
            failed = report.failed(),
            skipped = report.failures.len(),
            "Dispatch cycle finished"
        );
        report
    }

    fn record_schedule_failure(
        &self,
        report: &mut CycleReport,
        subscription: &Subscription,
        error: &RecurrenceError,
    ) {
        warn!(
            subscription_id = subscription.id,
            error = %error,
            "Could not compute schedule, skipping subscription this cycle"
        );
        report.failures.push(SubscriptionFailure {
            subscription_id: subscription.id,
            name: subscription.name.clone(),
            error: error.to_string(),
        });
    }

    async fn deliver(
        &self,
        subscription: &Subscription,
        occurrence: NaiveDateTime,
        fallback: &NotificationSettings,
        user_configuration: &UserConfiguration,
    ) -> DeliveryRecord {
        let start = Instant::now();
        let result = self
            .send_one(subscription, occurrence, fallback, user_configuration)
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let error = match result {
            Ok(()) => {
                info!(
                    subscription_id = subscription.id,
                    occurrence = %format_date(&occurrence),
                    service = self.transport.service_name(),
                    duration_ms,
                    "Notification delivered"
                );
                None
            }
            Err(e) => {
                warn!(
                    subscription_id = subscription.id,
                    occurrence = %format_date(&occurrence),
                    service = self.transport.service_name(),
                    error = %e,
                    duration_ms,
                    "Notification delivery failed"
                );
                Some(e.to_string())
            }
        };

        DeliveryRecord {
            subscription_id: subscription.id,
            name: subscription.name.clone(),
            occurrence,
            success: error.is_none(),
            error,
            duration_ms,
        }
    }

    async fn send_one(
        &self,
        subscription: &Subscription,
        occurrence: NaiveDateTime,
        fallback: &NotificationSettings,
        user_configuration: &UserConfiguration,
    ) -> Result<(), NotifyError> {
        let destination = subscription
            .destination(Some(fallback))
            .ok_or(NotifyError::MissingDestination(subscription.id))?;

        let message = self.renderer.render(&MessageContext {
            name: subscription.name.clone(),
            amount: subscription.amount,
            due_date: format_date(&occurrence),
            currency: user_configuration
                .effective_currency(&subscription.currency)
                .to_string(),
            account: subscription.account.clone(),
        })?;

        self.transport
            .send(&destination.topic, &destination.domain, &message)
            .await
    }
}
