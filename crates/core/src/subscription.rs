//! The subscription record as persisted by the store and consumed by the engine.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::recurrence::Interval;
use crate::settings::NotificationSettings;
use crate::timestamp;

/// Store-assigned subscription identifier.
pub type SubscriptionId = u64;

/// Currency marker meaning "use the user's configured currency".
pub const DEFAULT_CURRENCY: &str = "default";

// ── Interval unit ─────────────────────────────────────────────

/// Calendar unit a subscription repeats in.
///
/// Values outside the fixed set are kept as [`IntervalUnit::Unknown`] so that
/// legacy records still load; new input carrying them is rejected by
/// [`SubscriptionDraft::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
    Years,
    Unknown(String),
}

impl IntervalUnit {
    pub fn is_known(&self) -> bool {
        !matches!(self, IntervalUnit::Unknown(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            IntervalUnit::Days => "days",
            IntervalUnit::Weeks => "weeks",
            IntervalUnit::Months => "months",
            IntervalUnit::Years => "years",
            IntervalUnit::Unknown(raw) => raw,
        }
    }
}

impl From<String> for IntervalUnit {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "days" => IntervalUnit::Days,
            "weeks" => IntervalUnit::Weeks,
            "months" => IntervalUnit::Months,
            "years" => IntervalUnit::Years,
            _ => IntervalUnit::Unknown(raw),
        }
    }
}

impl From<IntervalUnit> for String {
    fn from(unit: IntervalUnit) -> Self {
        match unit {
            IntervalUnit::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Subscription ──────────────────────────────────────────────

fn default_interval_value() -> u32 {
    1
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// A persisted recurring payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    pub amount: f64,
    /// Anchor occurrence; not necessarily in the future.
    #[serde(with = "timestamp::naive")]
    pub due_date: NaiveDateTime,
    #[serde(default = "default_interval_value")]
    pub interval_value: u32,
    pub interval_unit: IntervalUnit,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub notify_topic: Option<String>,
    #[serde(default)]
    pub notify_domain: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub autopay: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Where a notification for a subscription is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub topic: String,
    pub domain: String,
}

impl Subscription {
    /// Build a record from validated input and a store-assigned id.
    pub fn from_draft(id: SubscriptionId, draft: SubscriptionDraft) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            amount: draft.amount,
            due_date: draft.due_date,
            interval_value: draft.interval_value,
            interval_unit: draft.interval_unit,
            notify: draft.notify,
            notify_topic: non_blank(draft.notify_topic),
            notify_domain: non_blank(draft.notify_domain),
            icon: draft.icon,
            color: draft.color,
            account: draft.account,
            autopay: draft.autopay,
            currency: draft.currency,
            tags: draft.tags,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.interval_value, self.interval_unit.clone())
    }

    /// Resolve the delivery destination, falling back to the global settings
    /// for whichever of topic/domain the subscription does not set itself.
    pub fn destination(&self, fallback: Option<&NotificationSettings>) -> Option<Destination> {
        let topic = self
            .notify_topic
            .clone()
            .or_else(|| fallback.and_then(|s| non_blank(Some(s.topic.clone()))))?;
        let domain = self
            .notify_domain
            .clone()
            .or_else(|| fallback.and_then(|s| non_blank(Some(s.domain.clone()))))
            .unwrap_or_else(|| crate::settings::DEFAULT_NTFY_DOMAIN.to_string());
        Some(Destination {
            topic,
            domain: domain.trim_end_matches('/').to_string(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── Draft (create/update input) ───────────────────────────────

/// Create/update payload for a subscription. Carries no id; the store
/// assigns one on create and the path supplies it on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDraft {
    pub name: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(with = "timestamp::naive")]
    pub due_date: NaiveDateTime,
    #[serde(default = "default_interval_value")]
    pub interval_value: u32,
    pub interval_unit: IntervalUnit,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub notify_topic: Option<String>,
    #[serde(default)]
    pub notify_domain: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub autopay: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SubscriptionDraft {
    /// Check the draft against the data model invariants.
    ///
    /// `fallback` is the global notification settings, which can satisfy the
    /// topic requirement for notify-enabled subscriptions.
    pub fn validate(&self, fallback: Option<&NotificationSettings>) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::InvalidAmount(self.amount.to_string()));
        }
        if self.interval_value == 0 {
            return Err(ValidationError::ZeroInterval);
        }
        if let IntervalUnit::Unknown(raw) = &self.interval_unit {
            return Err(ValidationError::UnknownIntervalUnit(raw.clone()));
        }
        if self.currency.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "currency" });
        }
        if self.notify {
            let own_topic = non_blank(self.notify_topic.clone()).is_some();
            let fallback_topic = fallback.is_some_and(|s| !s.topic.trim().is_empty());
            if !own_topic && !fallback_topic {
                return Err(ValidationError::MissingNotifyTopic);
            }
        }
        Ok(())
    }
}

/// Accept the amount as either a JSON number or a numeric string.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
    }

    match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(n) => Ok(n),
        RawAmount::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            serde::de::Error::custom(format!("Invalid amount: {s}. Must be a number."))
        }),
    }
}
