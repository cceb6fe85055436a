//! Due calculation
//!
//! Read path for dashboards and reports. Decides which elapsed months a
//! member owes for and which are free gap months.
//!
//! ## Rules
//! - Manual dues are always owed, one entry per month counted back from the
//!   month before `now`.
//! - Every month after the paid-through date up to `now` is billable when
//!   the member attended at least `threshold` distinct days, otherwise it
//!   is a gap month and costs nothing.
//! - The running month counts as paid when the expiry is at or after `now`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::attendance::{aggregate_attendance, MonthlyAttendance};
use crate::calendar::{Calendar, MonthKey, MAX_SCAN_MONTHS};

/// Outstanding dues for one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueResult {
    /// Number of owed months, always equal to `months.len()`
    pub count: usize,
    /// Owed months, oldest first
    pub months: Vec<MonthKey>,
    /// Display label for each entry of `months`
    pub labels: Vec<String>,
    /// Elapsed months skipped for low attendance
    pub gap_months: u32,
    pub is_running_month_paid: bool,
    pub paid_until: Option<DateTime<Utc>>,
}

impl DueResult {
    pub fn is_settled(&self) -> bool {
        self.count == 0
    }

    /// Amount still owed after the wallet balance is applied. Never negative.
    pub fn amount_owed(&self, plan_price: i64, balance: i64) -> i64 {
        let gross = i64::try_from(self.count)
            .unwrap_or(i64::MAX)
            .saturating_mul(plan_price.max(0));
        gross.saturating_sub(balance.max(0)).max(0)
    }
}

/// Compute dues from raw attendance timestamps
pub fn calculate_dues<S: AsRef<str>>(
    calendar: &Calendar,
    expiry: Option<DateTime<Utc>>,
    attendance: &[S],
    threshold: u32,
    manual_due: u32,
    now: DateTime<Utc>,
) -> DueResult {
    // Aggregation only matters once there is a timeline to scan
    let monthly = match expiry {
        Some(_) => aggregate_attendance(calendar, attendance),
        None => MonthlyAttendance::default(),
    };
    calculate_dues_from(calendar, expiry, &monthly, threshold, manual_due, now)
}

/// Compute dues from already aggregated attendance
pub fn calculate_dues_from(
    calendar: &Calendar,
    expiry: Option<DateTime<Utc>>,
    attendance: &MonthlyAttendance,
    threshold: u32,
    manual_due: u32,
    now: DateTime<Utc>,
) -> DueResult {
    let current_month = calendar.month_key(now);

    let mut months: Vec<MonthKey> =
        std::iter::successors(Some(current_month.prev()), |key| Some(key.prev()))
            .take(usize::try_from(manual_due).unwrap_or(usize::MAX))
            .collect();
    months.reverse();

    let is_running_month_paid = expiry.is_some_and(|e| e >= now);

    let mut gap_months = 0u32;
    if let Some(expiry) = expiry {
        let mut cursor = calendar.next_month_start(expiry);
        let mut visited = 0u32;
        while cursor <= now {
            if visited == MAX_SCAN_MONTHS {
                tracing::warn!(
                    expiry = %expiry,
                    now = %now,
                    "Due scan hit the month cap, older months ignored"
                );
                break;
            }
            visited += 1;

            let key = calendar.month_key(cursor);
            if attendance.meets_threshold(key, threshold) {
                tracing::debug!(month = %key, days = attendance.days_in(key), "Billable month");
                months.push(key);
            } else {
                tracing::debug!(month = %key, days = attendance.days_in(key), "Gap month");
                gap_months += 1;
            }
            cursor = calendar.next_month_start(cursor);
        }
    }

    // Stable: a manual entry stays ahead of a scanned entry for the same month
    months.sort();

    let labels = months
        .iter()
        .map(|key| calendar.month_label(*key, now))
        .collect();

    DueResult {
        count: months.len(),
        months,
        labels,
        gap_months,
        is_running_month_paid,
        paid_until: expiry,
    }
}
