//! Known record names of the local store namespace.

use std::fmt;

/// Every record the application persists. Prefixed names keep the namespace
/// compatible with save files produced by earlier releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    History,
    Library,
    Settings,
    Profile,
    Users,
    Reviews,
    Achievements,
    Drafts,
    Dungeon,
    Sect,
    Progress,
    Directory,
    PendingQueue,
    Notes,
    ParagraphComments,
    Reports,
    SiteConfig,
    DailyLimit,
    AuditLogs,
    Transactions,
    MarketItems,
    ApiKeys,
    SecondaryKeys,
    /// Single secondary key saved before pooling existed; never exported.
    LegacySecondaryKey,
}

impl StoreKey {
    pub const ALL: [StoreKey; 24] = [
        StoreKey::History,
        StoreKey::Library,
        StoreKey::Settings,
        StoreKey::Profile,
        StoreKey::Users,
        StoreKey::Reviews,
        StoreKey::Achievements,
        StoreKey::Drafts,
        StoreKey::Dungeon,
        StoreKey::Sect,
        StoreKey::Progress,
        StoreKey::Directory,
        StoreKey::PendingQueue,
        StoreKey::Notes,
        StoreKey::ParagraphComments,
        StoreKey::Reports,
        StoreKey::SiteConfig,
        StoreKey::DailyLimit,
        StoreKey::AuditLogs,
        StoreKey::Transactions,
        StoreKey::MarketItems,
        StoreKey::ApiKeys,
        StoreKey::SecondaryKeys,
        StoreKey::LegacySecondaryKey,
    ];

    /// Records `clear_cache` keeps.
    pub const PRESERVED_ON_CLEAR: [StoreKey; 5] = [
        StoreKey::Profile,
        StoreKey::Settings,
        StoreKey::Users,
        StoreKey::MarketItems,
        StoreKey::SiteConfig,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            StoreKey::History => "omniread_history",
            StoreKey::Library => "omniread_library",
            StoreKey::Settings => "omniread_settings",
            StoreKey::Profile => "omniread_profile_v2",
            StoreKey::Users => "omniread_users_db",
            StoreKey::Reviews => "omniread_reviews",
            StoreKey::Achievements => "omniread_achievements",
            StoreKey::Drafts => "omniread_drafts",
            StoreKey::Dungeon => "omniread_dungeon",
            StoreKey::Sect => "omniread_sect",
            StoreKey::Progress => "omniread_progress",
            StoreKey::Directory => "omniread_directory",
            StoreKey::PendingQueue => "omniread_pending_queue",
            StoreKey::Notes => "omniread_notes",
            StoreKey::ParagraphComments => "omniread_para_comments",
            StoreKey::Reports => "omniread_admin_reports",
            StoreKey::SiteConfig => "omniread_site_config",
            StoreKey::DailyLimit => "omniread_daily_limit",
            StoreKey::AuditLogs => "omniread_audit_logs",
            StoreKey::Transactions => "omniread_transactions",
            StoreKey::MarketItems => "omniread_market_items",
            StoreKey::ApiKeys => "omniread_api_keys",
            StoreKey::SecondaryKeys => "omniread_groq_key_pool",
            StoreKey::LegacySecondaryKey => "omniread_groq_key",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Whether the record takes part in save-file export/import.
    pub const fn is_exported(&self) -> bool {
        !matches!(self, StoreKey::LegacySecondaryKey)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
