//! Calendar-month arithmetic
//!
//! All month and day boundaries are computed in the gym's configured
//! timezone. Instants are carried as `DateTime<Utc>` and only converted to
//! local wall time when a calendar boundary is needed.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Upper bound on how many months a forward scan may walk.
///
/// Guards against expiry dates decades in the past; scans silently stop
/// once this many months have been visited.
pub const MAX_SCAN_MONTHS: u32 = 60;

/// Naive datetime layouts accepted in addition to RFC 3339. These carry no
/// offset and are read as local wall time in the configured timezone.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A calendar month (year + month) used as a grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Returns `None` unless `month` is in `1..=12`
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Step back `months` calendar months
    pub fn back(self, months: u32) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month) - 1 - i64::from(months);
        Self {
            year: i32::try_from(index.div_euclid(12)).unwrap_or(i32::MIN),
            month: u32::try_from(index.rem_euclid(12)).unwrap_or(0) + 1,
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MAX)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// Timezone-aware calendar used by every billing computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
}

impl Default for Calendar {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl Calendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local calendar date of an instant
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    pub fn month_key(&self, instant: DateTime<Utc>) -> MonthKey {
        MonthKey::from_date(self.local_date(instant))
    }

    /// First instant (00:00:00.000 local) of the given month
    pub fn month_start(&self, key: MonthKey) -> DateTime<Utc> {
        self.local_midnight(key.first_day())
    }

    /// Last instant (23:59:59.999 local) of the given month
    pub fn month_end_of(&self, key: MonthKey) -> DateTime<Utc> {
        self.month_start(key.next()) - Duration::milliseconds(1)
    }

    /// Last instant of the month containing `instant`
    pub fn month_end(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.month_end_of(self.month_key(instant))
    }

    /// First instant of the month following the one containing `instant`
    pub fn next_month_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.month_start(self.month_key(instant).next())
    }

    /// Short display label: `"Mar"`, or `"Mar 2023"` when the year differs
    /// from the year of `now`.
    pub fn month_label(&self, key: MonthKey, now: DateTime<Utc>) -> String {
        let name = key.first_day().format("%b").to_string();
        if key.year() == self.month_key(now).year() {
            name
        } else {
            format!("{} {}", name, key.year())
        }
    }

    /// Parse a stored timestamp.
    ///
    /// Accepts RFC 3339, offset-less datetimes (read as local time) and bare
    /// dates (read as UTC midnight). Anything else yields `None`.
    pub fn parse_instant(&self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return self.resolve_local(naive);
            }
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// Parse a stored timestamp, falling back to `fallback` when it is
    /// malformed.
    pub fn parse_or(&self, raw: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
        match self.parse_instant(raw) {
            Some(instant) => instant,
            None => {
                tracing::warn!(raw = raw, fallback = %fallback, "Malformed timestamp, using fallback");
                fallback
            }
        }
    }

    fn resolve_local(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            // DST gap: the wall time does not exist, take the first valid one after it
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(chrono::NaiveTime::MIN);
        self.resolve_local(naive).unwrap_or_else(|| {
            tracing::warn!(date = %date, tz = %self.tz, "Cannot resolve local midnight, using UTC");
            naive.and_utc()
        })
    }
}
