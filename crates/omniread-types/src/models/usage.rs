//! Daily usage counter record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day count of user-initiated generative calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyUsage {
    /// Calendar day the count belongs to
    pub date: NaiveDate,
    /// Calls made on that day
    pub count: u32,
}

impl DailyUsage {
    /// Fresh counter for `date`.
    pub const fn new(date: NaiveDate) -> Self {
        Self { date, count: 0 }
    }

    /// Counter for `date`, resetting when the stored day differs.
    pub fn for_day(self, date: NaiveDate) -> Self {
        if self.date == date {
            self
        } else {
            Self::new(date)
        }
    }
}
