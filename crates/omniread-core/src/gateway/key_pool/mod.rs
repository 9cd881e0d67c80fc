//! Rotating pool of provider API keys with per-key cooldowns.

mod cooldown;


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use omniread_types::models::{mask_key, KeyPoolConfig};
use omniread_types::{ApiKey, FeatureThresholds, KeyStatus, PoolStatus, StoreError, SystemModule};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::modules::store::{LocalStore, StoreKey};
use cooldown::CooldownTracker;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Mutation notifications for subscribers (settings screens, health meters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    KeyAdded { key: String, label: String },
    KeyRemoved { key: String },
    CooldownStarted { key: String },
    CooldownExpired { key: String },
    /// Key list re-read from the store (import, cache clear)
    Reloaded { count: usize },
}

#[derive(Debug, Clone)]
pub struct KeyPoolOptions {
    /// Record the pool is persisted under
    pub storage_key: StoreKey,
    /// Default label prefix, e.g. `Key` -> `Key 3`
    pub label_prefix: String,
    pub cooldown: Duration,
    /// Secondary pools rotate without cooldown bookkeeping
    pub track_cooldowns: bool,
}

impl KeyPoolOptions {
    pub fn primary(config: &KeyPoolConfig) -> Self {
        Self {
            storage_key: StoreKey::ApiKeys,
            label_prefix: "Key".to_string(),
            cooldown: Duration::from_secs(config.cooldown_secs),
            track_cooldowns: true,
        }
    }

    pub fn secondary() -> Self {
        Self {
            storage_key: StoreKey::SecondaryKeys,
            label_prefix: "Groq Key".to_string(),
            cooldown: Duration::ZERO,
            track_cooldowns: false,
        }
    }
}

/// Round-robin key selector.
///
/// Keys in cooldown are skipped; when every pooled key is cooling (or the
/// pool is empty) the static fallback key is handed out instead. The
/// rotation cursor and cooldowns live in memory only and reset with the
/// process.
pub struct KeyPool {
    keys: RwLock<Vec<ApiKey>>,
    cursor: AtomicUsize,
    cooldowns: Arc<CooldownTracker>,
    fallback_key: RwLock<String>,
    options: KeyPoolOptions,
    store: Option<Arc<LocalStore>>,
    events: broadcast::Sender<PoolEvent>,
}

impl KeyPool {
    /// Detached pool, nothing is persisted.
    pub fn new(options: KeyPoolOptions, fallback_key: impl Into<String>) -> Self {
        Self::with_keys(options, fallback_key, Vec::new(), None)
    }

    /// Pool backed by `store`, loading whatever was saved under the
    /// configured record. A malformed record loads as an empty pool.
    pub fn load(
        store: Arc<LocalStore>,
        options: KeyPoolOptions,
        fallback_key: impl Into<String>,
    ) -> Self {
        let keys: Vec<ApiKey> = store.get(options.storage_key).unwrap_or_default();
        tracing::info!("Loaded {} key(s) from {}", keys.len(), options.storage_key);
        Self::with_keys(options, fallback_key, keys, Some(store))
    }

    fn with_keys(
        options: KeyPoolOptions,
        fallback_key: impl Into<String>,
        keys: Vec<ApiKey>,
        store: Option<Arc<LocalStore>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            keys: RwLock::new(keys),
            cursor: AtomicUsize::new(0),
            cooldowns: Arc::new(CooldownTracker::new()),
            fallback_key: RwLock::new(fallback_key.into()),
            options,
            store,
            events,
        }
    }

    /// Replace the in-memory key list with the stored record. Detached pools
    /// keep their keys. Cooldowns of keys that are gone are dropped.
    pub fn reload(&self) -> usize {
        let Some(store) = &self.store else {
            return self.len();
        };

        let stored: Vec<ApiKey> = store.get(self.options.storage_key).unwrap_or_default();
        let count = stored.len();
        {
            let mut keys = self.keys.write();
            for old in keys.iter().filter(|old| !stored.iter().any(|k| k.key == old.key)) {
                self.cooldowns.forget(&old.key);
            }
            *keys = stored;
        }
        self.cursor.store(0, Ordering::Relaxed);

        tracing::info!("Reloaded {} key(s) from {}", count, self.options.storage_key);
        self.notify(PoolEvent::Reloaded { count });
        count
    }

    pub fn options(&self) -> &KeyPoolOptions {
        &self.options
    }

    pub fn fallback_key(&self) -> String {
        self.fallback_key.read().clone()
    }

    pub fn set_fallback_key(&self, key: impl Into<String>) {
        *self.fallback_key.write() = key.into();
    }

    /// Append a key. Duplicates are ignored; returns whether the pool changed.
    pub fn add_key(&self, key: &str, label: &str) -> Result<bool, StoreError> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(false);
        }

        let entry = {
            let mut keys = self.keys.write();
            if keys.iter().any(|k| k.key == key) {
                tracing::debug!("Key {} already pooled", mask_key(key));
                return Ok(false);
            }
            let label = if label.trim().is_empty() {
                format!("{} {}", self.options.label_prefix, keys.len() + 1)
            } else {
                label.trim().to_string()
            };
            let entry = ApiKey::new(key, label);
            keys.push(entry.clone());
            self.persist(&keys)?;
            entry
        };

        tracing::info!("Added key {} ({})", entry.masked(), entry.label);
        self.notify(PoolEvent::KeyAdded { key: entry.key, label: entry.label });
        Ok(true)
    }

    /// Remove a key; returns whether it was pooled.
    pub fn remove_key(&self, key: &str) -> Result<bool, StoreError> {
        {
            let mut keys = self.keys.write();
            let before = keys.len();
            keys.retain(|k| k.key != key);
            if keys.len() == before {
                return Ok(false);
            }
            self.persist(&keys)?;
        }

        tracing::info!("Removed key {}", mask_key(key));
        self.notify(PoolEvent::KeyRemoved { key: key.to_string() });
        Ok(true)
    }

    /// Next usable key, or the fallback key (possibly empty) when no pooled
    /// key is eligible.
    pub fn select_key(&self) -> String {
        let eligible: Vec<String> = self
            .keys
            .read()
            .iter()
            .filter(|k| !self.is_in_cooldown(&k.key))
            .map(|k| k.key.clone())
            .collect();

        if eligible.is_empty() {
            return self.fallback_key();
        }

        let len = eligible.len();
        let index = self.cursor.load(Ordering::Relaxed) % len;
        self.cursor.store((index + 1) % len, Ordering::Relaxed);
        eligible[index].clone()
    }

    /// Put `key` into cooldown for the configured window. The fallback key
    /// and pools without cooldown tracking are never penalized.
    pub fn mark_rate_limited(&self, key: &str) {
        if !self.options.track_cooldowns || key.is_empty() || *self.fallback_key.read() == key {
            return;
        }

        let deadline = self.cooldowns.start(key, self.options.cooldown);
        tracing::warn!(
            "Key {} marked as rate limited for {}s. Switching...",
            mask_key(key),
            self.options.cooldown.as_secs()
        );
        self.notify(PoolEvent::CooldownStarted { key: key.to_string() });

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime for cooldown timer, relying on lazy expiry");
            return;
        };
        let cooldowns = Arc::clone(&self.cooldowns);
        let events = self.events.clone();
        let key = key.to_string();
        runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if cooldowns.expire(&key, deadline) {
                tracing::debug!("Cooldown of key {} expired", mask_key(&key));
                let _ = events.send(PoolEvent::CooldownExpired { key });
            }
        });
    }

    pub fn is_in_cooldown(&self, key: &str) -> bool {
        self.options.track_cooldowns && self.cooldowns.is_cooling(key)
    }

    pub fn cooldown_remaining(&self, key: &str) -> Duration {
        self.cooldowns.remaining(key)
    }

    /// Lift every cooldown at once; returns how many entries were dropped.
    pub fn clear_cooldowns(&self) -> usize {
        let cleared = self.cooldowns.clear();
        if cleared > 0 {
            tracing::info!("Cleared {} cooldown(s)", cleared);
        }
        cleared
    }

    pub fn purge_expired_cooldowns(&self) -> usize {
        self.cooldowns.purge_expired()
    }

    pub fn keys(&self) -> Vec<KeyStatus> {
        self.keys.read().iter().map(|k| KeyStatus::from_key(k, self.is_in_cooldown(&k.key))).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// True when a pooled or fallback key exists.
    pub fn has_any_key(&self) -> bool {
        !self.is_empty() || !self.fallback_key.read().is_empty()
    }

    pub fn status(&self) -> PoolStatus {
        let keys = self.keys.read();
        let active = keys.iter().filter(|k| !self.is_in_cooldown(&k.key)).count();
        PoolStatus::new(keys.len(), active)
    }

    /// Percentage of pooled keys not in cooldown. An empty pool is fully
    /// healthy when a fallback key exists and dead otherwise.
    pub fn health(&self) -> u8 {
        let status = self.status();
        if status.total == 0 {
            return if self.fallback_key.read().is_empty() { 0 } else { 100 };
        }
        (status.active * 100 / status.total) as u8
    }

    pub fn is_feature_enabled(&self, thresholds: &FeatureThresholds, module: SystemModule) -> bool {
        thresholds.is_enabled(module, self.health())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_stream(&self) -> BroadcastStream<PoolEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    fn notify(&self, event: PoolEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn persist(&self, keys: &[ApiKey]) -> Result<(), StoreError> {
        match &self.store {
            Some(store) => store.set(self.options.storage_key, keys),
            None => Ok(()),
        }
    }
}
