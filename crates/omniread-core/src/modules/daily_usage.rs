//! Per-day cap on user-initiated generative calls.

use std::sync::Arc;

use chrono::NaiveDate;
use omniread_types::{DailyUsage, StoreError};
use serde_json::{Map, Value};

use super::store::{LocalStore, StoreKey};

const PROFILE_USAGE_FIELD: &str = "dailyAiUsage";

/// Source of "today" for day-boundary resets.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Daily usage counter persisted under the daily-limit record.
///
/// Check and increment happen under the store's write lock, but callers on
/// different processes still race last-write-wins.
pub struct DailyLimiter {
    store: Arc<LocalStore>,
    clock: Arc<dyn Clock>,
}

impl DailyLimiter {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<LocalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Count one call against today's cap. Returns `false` without touching
    /// the store when the cap is already reached.
    pub fn check_and_increment(&self, cap: u32) -> Result<bool, StoreError> {
        let today = self.clock.today();
        let mut counted = None;

        let allowed = self.store.update_if(StoreKey::DailyLimit, |record: &mut Option<DailyUsage>| {
            let usage = record.unwrap_or_else(|| DailyUsage::new(today)).for_day(today);
            if usage.count >= cap {
                return false;
            }
            let next = DailyUsage { date: today, count: usage.count + 1 };
            *record = Some(next);
            counted = Some(next);
            true
        })?;

        match counted {
            Some(usage) => {
                tracing::debug!("Daily usage {}/{}", usage.count, cap);
                self.mirror_to_profile(usage)?;
            },
            None => tracing::warn!("Daily AI limit of {} reached, denying call", cap),
        }
        Ok(allowed)
    }

    /// Copy the counter into the saved profile so profile views show it.
    /// Nothing happens until a profile exists.
    fn mirror_to_profile(&self, usage: DailyUsage) -> Result<(), StoreError> {
        let Some(mut profile) = self.store.get::<Map<String, Value>>(StoreKey::Profile) else {
            return Ok(());
        };
        let value = serde_json::to_value(usage)
            .map_err(|e| StoreError::ParseError { message: format!("daily usage: {}", e) })?;
        profile.insert(PROFILE_USAGE_FIELD.to_string(), value);
        self.store.set(StoreKey::Profile, &profile)
    }

    /// Today's usage; a stale record from another day reads as zero.
    pub fn usage(&self) -> DailyUsage {
        let today = self.clock.today();
        self.store
            .get::<DailyUsage>(StoreKey::DailyLimit)
            .map(|u| u.for_day(today))
            .unwrap_or_else(|| DailyUsage::new(today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FixedClock(Mutex<NaiveDate>);

    impl FixedClock {
        fn new(date: NaiveDate) -> Arc<Self> {
            Arc::new(Self(Mutex::new(date)))
        }

        fn advance_day(&self) {
            let mut date = self.0.lock();
            *date = date.succ_opt().expect("valid date");
        }
    }

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            *self.0.lock()
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).expect("valid date")
    }

    #[test]
    fn test_cap_denies_after_limit() {
        let store = Arc::new(LocalStore::in_memory());
        let limiter = DailyLimiter::with_clock(store, FixedClock::new(day(19)));

        assert!(limiter.check_and_increment(2).expect("first"));
        assert!(limiter.check_and_increment(2).expect("second"));
        assert!(!limiter.check_and_increment(2).expect("third"));
        assert!(!limiter.check_and_increment(2).expect("fourth"));
        assert_eq!(limiter.usage().count, 2);
    }

    #[test]
    fn test_counter_resets_once_per_day() {
        let store = Arc::new(LocalStore::in_memory());
        let clock = FixedClock::new(day(19));
        let limiter = DailyLimiter::with_clock(store, clock.clone());

        assert!(limiter.check_and_increment(1).expect("day one"));
        assert!(!limiter.check_and_increment(1).expect("day one denied"));

        clock.advance_day();
        assert_eq!(limiter.usage().count, 0);
        assert!(limiter.check_and_increment(1).expect("day two"));
        assert!(!limiter.check_and_increment(1).expect("day two denied"));
        assert_eq!(limiter.usage(), DailyUsage { date: day(20), count: 1 });
    }

    #[test]
    fn test_counter_persists_in_store() {
        let store = Arc::new(LocalStore::in_memory());
        let limiter = DailyLimiter::with_clock(store.clone(), FixedClock::new(day(19)));
        limiter.check_and_increment(50).expect("increment");

        let raw = store.get_raw(StoreKey::DailyLimit.as_str()).expect("record");
        assert_eq!(raw, r#"{"date":"2026-10-19","count":1}"#);
    }

    #[test]
    fn test_denied_call_leaves_store_file_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        let store = Arc::new(LocalStore::open(&path).expect("open"));
        let limiter = DailyLimiter::with_clock(store, FixedClock::new(day(19)));

        assert!(limiter.check_and_increment(1).expect("first"));
        std::fs::remove_file(&path).expect("remove");

        assert!(!limiter.check_and_increment(1).expect("denied"));
        assert!(!path.exists());
    }

    #[test]
    fn test_usage_mirrored_into_profile() {
        let store = Arc::new(LocalStore::in_memory());
        let limiter = DailyLimiter::with_clock(store.clone(), FixedClock::new(day(19)));

        limiter.check_and_increment(5).expect("no profile yet");
        assert!(store.get_raw(StoreKey::Profile.as_str()).is_none());

        store.set_raw(StoreKey::Profile.as_str(), r#"{"username":"reader"}"#).expect("profile");
        limiter.check_and_increment(5).expect("second");

        let profile: Value = store.get(StoreKey::Profile).expect("profile");
        assert_eq!(profile["username"], "reader");
        assert_eq!(profile["dailyAiUsage"]["date"], "2026-10-19");
        assert_eq!(profile["dailyAiUsage"]["count"], 2);
    }
}
