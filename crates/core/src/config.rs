use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::recurrence::MonthRollover;
use crate::settings::DEFAULT_NTFY_DOMAIN;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    match profiled_env_opt(profile, key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: '{}'", key, raw);
            default
        }),
        None => default,
    }
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
        _ => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Build config for a named profile (empty string = default). When set
    /// (e.g. `PROD`), every key is first looked up as `{PROFILE}_{KEY}`,
    /// falling back to `{KEY}`. Call `load_dotenv()` first.
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            notify: NotifyConfig::from_env_profiled(p),
            schedule: ScheduleConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!("  storage:   data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  notify:    service={}, domain={}, token={}, dispatch={}",
            self.notify.service,
            self.notify.ntfy_domain,
            if self.notify.ntfy_token.is_some() { "set" } else { "(none)" },
            if self.notify.dispatch_enabled { "enabled" } else { "disabled" }
        );
        tracing::info!("  schedule:  month_rollover={}", self.schedule.month_rollover);
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 3001),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
        }
    }

    /// Location of the JSON document holding all records.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("subscriptions.json")
    }
}

// ── Notifications ─────────────────────────────────────────────

/// Push service the transport speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyService {
    Ntfy,
    Gotify,
}

impl FromStr for NotifyService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ntfy" => Ok(NotifyService::Ntfy),
            "gotify" => Ok(NotifyService::Gotify),
            other => Err(format!("unknown notify service '{other}' (expected ntfy|gotify)")),
        }
    }
}

impl fmt::Display for NotifyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyService::Ntfy => f.write_str("ntfy"),
            NotifyService::Gotify => f.write_str("gotify"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub service: NotifyService,
    pub ntfy_domain: String,
    pub ntfy_token: Option<String>,
    /// Optional minijinja template overriding the default message text.
    pub message_template: Option<String>,
    pub title: String,
    pub gotify_priority: u8,
    /// Run the background dispatcher alongside the HTTP server.
    pub dispatch_enabled: bool,
}

impl NotifyConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            service: profiled_env_parse(p, "NOTIFY_SERVICE", NotifyService::Ntfy),
            ntfy_domain: profiled_env_or(p, "NTFY_DOMAIN", DEFAULT_NTFY_DOMAIN),
            ntfy_token: profiled_env_opt(p, "NTFY_TOKEN"),
            message_template: profiled_env_opt(p, "NOTIFY_MESSAGE_TEMPLATE"),
            title: profiled_env_or(p, "NOTIFY_TITLE", "Subscription Due"),
            gotify_priority: profiled_env_parse(p, "GOTIFY_PRIORITY", 5),
            dispatch_enabled: profiled_env_bool(p, "DISPATCH_ENABLED", true),
        }
    }
}

// ── Schedule ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(with = "rollover_str")]
    pub month_rollover: MonthRollover,
}

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            month_rollover: profiled_env_parse(p, "MONTH_ROLLOVER", MonthRollover::Wrap),
        }
    }
}

mod rollover_str {
    use super::MonthRollover;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(r: &MonthRollover, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&r.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<MonthRollover, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
