//! Application State
//!
//! Wires configuration, the local store, both key pools, the daily limiter,
//! and the gateway into one shareable handle.

use std::path::Path;
use std::sync::Arc;

use omniread_types::{AppConfig, DailyUsage};

use crate::error::AppResult;
use crate::gateway::upstream::build_http_client;
use crate::gateway::{AiGateway, KeyPool, KeyPoolOptions};
use crate::modules::daily_usage::DailyLimiter;
use crate::modules::store::{LocalStore, StoreKey};
use crate::modules::{config, logger, paths, records};
use crate::services::{ChapterService, ReaderAssist, ScannerService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub config: AppConfig,
    pub store: Arc<LocalStore>,
    pub gateway: Arc<AiGateway>,
    pub chapters: ChapterService,
    pub scanner: ScannerService,
    pub assist: ReaderAssist,
    /// `GROQ_API_KEY`, the secondary fallback when no legacy key is stored
    pub secondary_env_key: String,
}

impl AppState {
    /// Initialize logging and load everything from the default data directory.
    pub fn bootstrap() -> AppResult<Self> {
        logger::init_logger();
        Self::bootstrap_in(&paths::get_data_dir()?)
    }

    /// Load config and store from `data_dir`; fallback keys come from the
    /// environment.
    pub fn bootstrap_in(data_dir: &Path) -> AppResult<Self> {
        let config = config::load_config_from(data_dir)?;
        let store = Arc::new(LocalStore::open(data_dir.join(paths::STORE_FILE))?);
        tracing::info!("Data directory: {}", data_dir.display());

        Self::from_components(
            config,
            store,
            config::primary_fallback_key(),
            config::secondary_fallback_key(),
        )
    }

    /// Assemble state from already-loaded parts. The secondary pool falls
    /// back to the legacy single-key record before `secondary_env_key`.
    pub fn from_components(
        config: AppConfig,
        store: Arc<LocalStore>,
        primary_fallback: String,
        secondary_env_key: String,
    ) -> AppResult<Self> {
        let http = build_http_client(config.primary.request_timeout_secs)?;

        let keys = Arc::new(KeyPool::load(
            Arc::clone(&store),
            KeyPoolOptions::primary(&config.key_pool),
            primary_fallback,
        ));

        let secondary_fallback = resolve_secondary_fallback(&store, &secondary_env_key);
        let secondary_keys = Arc::new(KeyPool::load(
            Arc::clone(&store),
            KeyPoolOptions::secondary(),
            secondary_fallback,
        ));

        let limiter = Arc::new(DailyLimiter::new(Arc::clone(&store)));
        let gateway = Arc::new(AiGateway::new(&config, http, keys, secondary_keys, limiter));

        tracing::info!(
            "Gateway ready: {} primary key(s), health {}%, daily cap {}",
            gateway.keys().len(),
            gateway.health(),
            config.gateway.daily_cap
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                chapters: ChapterService::new(Arc::clone(&gateway)),
                scanner: ScannerService::new(Arc::clone(&gateway), Arc::clone(&store)),
                assist: ReaderAssist::new(Arc::clone(&gateway)),
                config,
                store,
                gateway,
                secondary_env_key,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.inner.store
    }

    pub fn gateway(&self) -> &Arc<AiGateway> {
        &self.inner.gateway
    }

    pub fn chapters(&self) -> &ChapterService {
        &self.inner.chapters
    }

    pub fn scanner(&self) -> &ScannerService {
        &self.inner.scanner
    }

    pub fn assist(&self) -> &ReaderAssist {
        &self.inner.assist
    }

    pub fn daily_usage(&self) -> DailyUsage {
        self.inner.gateway.limiter().usage()
    }

    /// Persist the single legacy secondary key and use it as the secondary
    /// pool's fallback.
    pub fn save_legacy_secondary_key(&self, key: &str) -> AppResult<()> {
        self.inner.store.set(StoreKey::LegacySecondaryKey, key)?;
        self.inner.gateway.secondary_keys().set_fallback_key(key);
        Ok(())
    }

    pub fn export_data(&self) -> AppResult<String> {
        Ok(self.inner.store.export()?)
    }

    /// Restore a save file; both key pools switch to the restored records.
    pub fn import_data(&self, document: &str) -> AppResult<usize> {
        let restored = self.inner.store.import(document)?;
        self.reload_key_pools();
        Ok(restored)
    }

    pub fn clear_cache(&self) -> AppResult<usize> {
        let dropped = records::clear_system_cache(&self.inner.store)?;
        self.reload_key_pools();
        Ok(dropped)
    }

    /// Re-read both pools and the secondary fallback after bulk store edits.
    pub fn reload_key_pools(&self) {
        let gateway = &self.inner.gateway;
        gateway.keys().reload();
        gateway.secondary_keys().reload();
        gateway
            .secondary_keys()
            .set_fallback_key(resolve_secondary_fallback(&self.inner.store, &self.inner.secondary_env_key));
    }
}

fn resolve_secondary_fallback(store: &LocalStore, env_key: &str) -> String {
    let legacy_key: Option<String> = store.get(StoreKey::LegacySecondaryKey);
    legacy_key.filter(|k| !k.is_empty()).unwrap_or_else(|| env_key.to_string())
}
