//! Singleton settings records kept alongside subscriptions.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NTFY_DOMAIN: &str = "https://ntfy.sh";

fn default_domain() -> String {
    DEFAULT_NTFY_DOMAIN.to_string()
}

/// Global push destination used by subscriptions that do not set their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub topic: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            topic: String::new(),
            domain: default_domain(),
        }
    }
}

/// Display preferences applied to subscriptions using the `default` currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfiguration {
    pub currency: String,
    #[serde(default = "default_true")]
    pub show_currency_symbol: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UserConfiguration {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            show_currency_symbol: true,
        }
    }
}

impl UserConfiguration {
    /// Resolve a subscription's currency, replacing the `default` marker.
    pub fn effective_currency<'a>(&'a self, currency: &'a str) -> &'a str {
        if currency == crate::subscription::DEFAULT_CURRENCY {
            &self.currency
        } else {
            currency
        }
    }
}
