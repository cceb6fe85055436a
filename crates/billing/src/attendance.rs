//! Attendance aggregation
//!
//! Turns raw check-in timestamps into the number of distinct calendar days
//! visited per month. Two check-ins on the same local day count once.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::calendar::{Calendar, MonthKey};

/// Distinct attended days per calendar month
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyAttendance {
    days: HashMap<MonthKey, u32>,
}

impl MonthlyAttendance {
    /// Distinct days attended in `key`, zero when the month has no visits
    pub fn days_in(&self, key: MonthKey) -> u32 {
        self.days.get(&key).copied().unwrap_or(0)
    }

    /// Whether `key` reaches the billing threshold (inclusive)
    pub fn meets_threshold(&self, key: MonthKey, threshold: u32) -> bool {
        self.days_in(key) >= threshold
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonthKey, u32)> + '_ {
        self.days.iter().map(|(k, v)| (*k, *v))
    }
}

/// Distinct local calendar days among `timestamps`. Unparseable entries are
/// dropped.
pub fn distinct_days<S: AsRef<str>>(calendar: &Calendar, timestamps: &[S]) -> BTreeSet<NaiveDate> {
    let mut discarded = 0usize;
    let days: BTreeSet<NaiveDate> = timestamps
        .iter()
        .filter_map(|raw| {
            let parsed = calendar.parse_instant(raw.as_ref());
            if parsed.is_none() {
                discarded += 1;
            }
            parsed
        })
        .map(|instant| calendar.local_date(instant))
        .collect();

    if discarded > 0 {
        tracing::debug!(discarded = discarded, "Dropped malformed attendance timestamps");
    }

    days
}

/// Group visits into distinct attended days per month
pub fn aggregate_attendance<S: AsRef<str>>(
    calendar: &Calendar,
    timestamps: &[S],
) -> MonthlyAttendance {
    let mut days: HashMap<MonthKey, u32> = HashMap::new();
    for day in distinct_days(calendar, timestamps) {
        let key = MonthKey::from_date(day);
        *days.entry(key).or_insert(0) += 1;
    }
    MonthlyAttendance { days }
}
