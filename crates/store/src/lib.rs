//! Persistence for subscriptions and the settings records next to them.
//!
//! All records live in one JSON document on disk. Every read and write goes
//! through a single process-wide [`tokio::sync::Mutex`]: callers obtain a
//! [`StoreTxn`] with [`SubscriptionStore::begin`] and the lock is released
//! when the transaction is dropped, on success and error paths alike.
//!
//! ```text
//! data/
//!   subscriptions.json   <- { next_id, subscriptions, notification_settings, user_configuration }
//! ```

mod error;

pub use error::StoreError;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use subwatch_core::{
    NotificationSettings, Subscription, SubscriptionDraft, SubscriptionId, UserConfiguration,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    next_id: SubscriptionId,
    #[serde(default)]
    subscriptions: Vec<Subscription>,
    #[serde(default)]
    notification_settings: Option<NotificationSettings>,
    #[serde(default)]
    user_configuration: Option<UserConfiguration>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            subscriptions: Vec::new(),
            notification_settings: None,
            user_configuration: None,
        }
    }
}

/// JSON-file-backed store with one lock gating every transaction.
pub struct SubscriptionStore {
    /// `None` keeps everything in memory (tests, ephemeral runs).
    path: Option<PathBuf>,
    document: Mutex<StoreDocument>,
}

impl SubscriptionStore {
    /// Open the store at `path`, creating parent directories as needed.
    /// A missing file starts an empty store; it is written on first change.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let document = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            let doc: StoreDocument = serde_json::from_str(&json)?;
            info!(
                "Loaded {} subscriptions from {}",
                doc.subscriptions.len(),
                path.display()
            );
            doc
        } else {
            info!("No store at {} yet, starting empty", path.display());
            StoreDocument::default()
        };

        Ok(Self {
            path: Some(path),
            document: Mutex::new(document),
        })
    }

    /// Store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: Mutex::new(StoreDocument::default()),
        }
    }

    /// Acquire the store-wide lock. At most one transaction exists at a time.
    pub async fn begin(&self) -> StoreTxn<'_> {
        StoreTxn {
            document: self.document.lock().await,
            path: self.path.as_deref(),
        }
    }

    // ── Single-operation conveniences ───────────────────────────

    pub async fn list_all(&self) -> Vec<Subscription> {
        self.begin().await.list_all()
    }

    pub async fn list_notifiable(&self) -> Vec<Subscription> {
        self.begin().await.list_notifiable()
    }

    pub async fn get(&self, id: SubscriptionId) -> Option<Subscription> {
        self.begin().await.get(id)
    }

    pub async fn create(&self, draft: SubscriptionDraft) -> Result<Subscription, StoreError> {
        self.begin().await.create(draft)
    }

    pub async fn update(
        &self,
        id: SubscriptionId,
        draft: SubscriptionDraft,
    ) -> Result<Subscription, StoreError> {
        self.begin().await.update(id, draft)
    }

    pub async fn delete(&self, id: SubscriptionId) -> Result<Subscription, StoreError> {
        self.begin().await.delete(id)
    }
}

/// Exclusive access to the store for the lifetime of the value.
///
/// Writes are applied to a copy, persisted, and only then made visible, so a
/// failed write leaves the in-memory state unchanged.
pub struct StoreTxn<'a> {
    document: MutexGuard<'a, StoreDocument>,
    path: Option<&'a Path>,
}

impl StoreTxn<'_> {
    // ── Reads ───────────────────────────────────────────────────

    /// Every subscription, in insertion order.
    pub fn list_all(&self) -> Vec<Subscription> {
        self.document.subscriptions.clone()
    }

    /// Subscriptions with `notify = true`, in insertion order.
    pub fn list_notifiable(&self) -> Vec<Subscription> {
        self.document
            .subscriptions
            .iter()
            .filter(|s| s.notify)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Subscription> {
        self.document.subscriptions.iter().find(|s| s.id == id).cloned()
    }

    pub fn notification_settings(&self) -> Option<NotificationSettings> {
        self.document.notification_settings.clone()
    }

    pub fn user_configuration(&self) -> UserConfiguration {
        self.document.user_configuration.clone().unwrap_or_default()
    }

    // ── Writes ──────────────────────────────────────────────────

    /// Validate and insert a new subscription, assigning the next id.
    pub fn create(&mut self, draft: SubscriptionDraft) -> Result<Subscription, StoreError> {
        draft.validate(self.document.notification_settings.as_ref())?;

        let mut next = self.document.clone();
        let id = next.next_id;
        next.next_id += 1;
        let subscription = Subscription::from_draft(id, draft);
        next.subscriptions.push(subscription.clone());

        self.commit(next)?;
        debug!(subscription_id = id, "subscription created");
        Ok(subscription)
    }

    /// Replace an existing subscription's fields, keeping its id.
    pub fn update(
        &mut self,
        id: SubscriptionId,
        draft: SubscriptionDraft,
    ) -> Result<Subscription, StoreError> {
        let index = self.position(id)?;
        draft.validate(self.document.notification_settings.as_ref())?;

        let mut next = self.document.clone();
        let subscription = Subscription::from_draft(id, draft);
        next.subscriptions[index] = subscription.clone();

        self.commit(next)?;
        debug!(subscription_id = id, "subscription updated");
        Ok(subscription)
    }

    /// Remove a subscription, returning the removed record.
    pub fn delete(&mut self, id: SubscriptionId) -> Result<Subscription, StoreError> {
        let index = self.position(id)?;

        let mut next = self.document.clone();
        let removed = next.subscriptions.remove(index);

        self.commit(next)?;
        debug!(subscription_id = id, "subscription deleted");
        Ok(removed)
    }

    pub fn set_notification_settings(
        &mut self,
        settings: NotificationSettings,
    ) -> Result<NotificationSettings, StoreError> {
        let mut next = self.document.clone();
        next.notification_settings = Some(settings.clone());
        self.commit(next)?;
        Ok(settings)
    }

    pub fn set_user_configuration(
        &mut self,
        config: UserConfiguration,
    ) -> Result<UserConfiguration, StoreError> {
        let mut next = self.document.clone();
        next.user_configuration = Some(config.clone());
        self.commit(next)?;
        Ok(config)
    }

    // ── Internals ───────────────────────────────────────────────

    fn position(&self, id: SubscriptionId) -> Result<usize, StoreError> {
        self.document
            .subscriptions
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn commit(&mut self, next: StoreDocument) -> Result<(), StoreError> {
        if let Some(path) = self.path {
            persist(path, &next)?;
        }
        *self.document = next;
        Ok(())
    }
}

/// Write the document next to `path` and rename it into place.
fn persist(path: &Path, document: &StoreDocument) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(document)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use subwatch_core::{IntervalUnit, ValidationError, DEFAULT_CURRENCY};

    fn draft(name: &str, notify: bool) -> SubscriptionDraft {
        SubscriptionDraft {
            name: name.to_string(),
            amount: 9.99,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            interval_value: 1,
            interval_unit: IntervalUnit::Months,
            notify,
            notify_topic: notify.then(|| "bills".to_string()),
            notify_domain: None,
            icon: None,
            color: None,
            account: None,
            autopay: false,
            currency: DEFAULT_CURRENCY.to_string(),
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let store = SubscriptionStore::in_memory();
        let a = store.create(draft("a", false)).await.unwrap();
        let b = store.create(draft("b", true)).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.list_all().await.len(), 2);
    }

    #[tokio::test]
    async fn list_notifiable_filters_and_keeps_order() {
        let store = SubscriptionStore::in_memory();
        store.create(draft("quiet", false)).await.unwrap();
        store.create(draft("loud-1", true)).await.unwrap();
        store.create(draft("loud-2", true)).await.unwrap();

        let names: Vec<_> = store
            .list_notifiable()
            .await
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["loud-1", "loud-2"]);
    }

    #[tokio::test]
    async fn update_and_delete_report_not_found() {
        let store = SubscriptionStore::in_memory();
        assert!(matches!(
            store.update(42, draft("x", false)).await,
            Err(StoreError::NotFound(42))
        ));
        assert!(matches!(store.delete(42).await, Err(StoreError::NotFound(42))));
    }

    #[tokio::test]
    async fn update_replaces_fields_and_keeps_id() {
        let store = SubscriptionStore::in_memory();
        let created = store.create(draft("old", false)).await.unwrap();
        let mut changed = draft("new", false);
        changed.interval_unit = IntervalUnit::Weeks;
        let updated = store.update(created.id, changed).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "new");
        assert_eq!(store.get(created.id).await.unwrap().interval_unit, IntervalUnit::Weeks);
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = SubscriptionStore::in_memory();
        let created = store.create(draft("gone", false)).await.unwrap();
        let removed = store.delete(created.id).await.unwrap();
        assert_eq!(removed.name, "gone");
        assert!(store.get(created.id).await.is_none());
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_without_side_effects() {
        let store = SubscriptionStore::in_memory();
        let mut bad = draft("bad", true);
        bad.notify_topic = None;
        assert!(matches!(
            store.create(bad).await,
            Err(StoreError::Validation(ValidationError::MissingNotifyTopic))
        ));
        assert!(store.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn global_topic_satisfies_notify_validation() {
        let store = SubscriptionStore::in_memory();
        {
            let mut txn = store.begin().await;
            txn.set_notification_settings(NotificationSettings {
                topic: "household".to_string(),
                domain: "https://ntfy.sh".to_string(),
            })
            .unwrap();
        }
        let mut d = draft("uses-global", true);
        d.notify_topic = None;
        assert!(store.create(d).await.is_ok());
    }

    #[tokio::test]
    async fn user_configuration_defaults_to_usd() {
        let store = SubscriptionStore::in_memory();
        let cfg = store.begin().await.user_configuration();
        assert_eq!(cfg.currency, "USD");
        assert!(cfg.show_currency_symbol);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("subscriptions.json");

        {
            let store = SubscriptionStore::open(&path).unwrap();
            store.create(draft("kept", true)).await.unwrap();
            let mut txn = store.begin().await;
            txn.set_user_configuration(UserConfiguration {
                currency: "EUR".to_string(),
                show_currency_symbol: false,
            })
            .unwrap();
        }

        let reopened = SubscriptionStore::open(&path).unwrap();
        let all = reopened.list_all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "kept");
        assert_eq!(reopened.begin().await.user_configuration().currency, "EUR");

        // Ids continue after reopen.
        let next = reopened.create(draft("next", false)).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SubscriptionStore::open(&path), Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn concurrent_creates_are_serialized() {
        let store = Arc::new(SubscriptionStore::in_memory());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(draft(&format!("s{i}"), false)).await.unwrap().id
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());
    }
}
