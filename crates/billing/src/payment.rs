//! Payment application
//!
//! Write path. Converts a payment into months of credit and walks the
//! member's timeline forward from the paid-through date.
//!
//! ## Order of operations
//! 1. Wallet balance plus payment becomes whole months of credit; the
//!    remainder stays in the wallet.
//! 2. Manual dues are paid first. They do not move the expiry.
//! 3. Elapsed months are walked oldest first: gap months advance the expiry
//!    for free, billable months consume one credit each and an unpaid
//!    billable month stops the walk.
//! 4. Leftover credit pays for future months in advance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::{aggregate_attendance, MonthlyAttendance};
use crate::calendar::{Calendar, MAX_SCAN_MONTHS};
use crate::error::{BillingError, BillingResult};

/// Months granted by any positive payment on a zero-price plan
pub const FREE_PLAN_ADVANCE_MONTHS: u32 = 99;

/// An incoming payment together with the wallet state it applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentRequest {
    pub amount_paid: i64,
    pub plan_price: i64,
    pub current_balance: i64,
    pub current_manual_due: u32,
}

impl PaymentRequest {
    /// Reject negative amounts before they reach the calculation
    pub fn validate(&self) -> BillingResult<()> {
        if self.amount_paid < 0 {
            return Err(BillingError::NegativeAmount(self.amount_paid));
        }
        if self.plan_price < 0 {
            return Err(BillingError::NegativePrice(self.plan_price));
        }
        if self.current_balance < 0 {
            return Err(BillingError::NegativeBalance(self.current_balance));
        }
        Ok(())
    }
}

/// New billing state to persist after a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentResult {
    pub new_expiry: DateTime<Utc>,
    pub new_balance: i64,
    pub new_manual_due: u32,
}

/// Apply a payment against raw attendance timestamps.
///
/// A missing expiry is treated as `now`.
pub fn process_payment<S: AsRef<str>>(
    calendar: &Calendar,
    current_expiry: Option<DateTime<Utc>>,
    attendance: &[S],
    request: &PaymentRequest,
    threshold: u32,
    now: DateTime<Utc>,
) -> PaymentResult {
    let monthly = aggregate_attendance(calendar, attendance);
    process_payment_from(calendar, current_expiry, &monthly, request, threshold, now)
}

/// Apply a payment against already aggregated attendance
pub fn process_payment_from(
    calendar: &Calendar,
    current_expiry: Option<DateTime<Utc>>,
    attendance: &MonthlyAttendance,
    request: &PaymentRequest,
    threshold: u32,
    now: DateTime<Utc>,
) -> PaymentResult {
    let mut balance = request.current_balance.saturating_add(request.amount_paid);

    let mut months_to_pay: u32 = if request.plan_price > 0 {
        let months = balance.div_euclid(request.plan_price);
        balance = balance.rem_euclid(request.plan_price);
        u32::try_from(months.max(0)).unwrap_or(u32::MAX)
    } else if request.plan_price == 0 && request.amount_paid > 0 {
        FREE_PLAN_ADVANCE_MONTHS
    } else {
        0
    };

    let mut manual_due = request.current_manual_due;
    let settled_manual = manual_due.min(months_to_pay);
    manual_due -= settled_manual;
    months_to_pay -= settled_manual;
    if settled_manual > 0 {
        tracing::debug!(settled = settled_manual, remaining = manual_due, "Settled manual dues");
    }

    let mut expiry = current_expiry.unwrap_or(now);
    let mut cursor = calendar.next_month_start(expiry);

    for _ in 0..MAX_SCAN_MONTHS {
        let key = calendar.month_key(cursor);
        let elapsed = cursor <= now;

        if elapsed && !attendance.meets_threshold(key, threshold) {
            tracing::debug!(month = %key, "Skipping gap month");
        } else if months_to_pay > 0 {
            months_to_pay -= 1;
            tracing::debug!(month = %key, advance = !elapsed, "Credited month");
        } else {
            tracing::debug!(month = %key, "Out of credit");
            break;
        }

        expiry = calendar.month_end(cursor);
        cursor = calendar.next_month_start(cursor);
    }

    if months_to_pay > 0 {
        tracing::warn!(
            unused_months = months_to_pay,
            new_expiry = %expiry,
            "Payment credit exceeded the scan window and was not applied"
        );
    }

    PaymentResult {
        new_expiry: expiry,
        new_balance: balance,
        new_manual_due: manual_due,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(raw: &str) -> DateTime<Utc> {
        raw.parse().unwrap()
    }

    fn request(amount_paid: i64, plan_price: i64, balance: i64, manual: u32) -> PaymentRequest {
        PaymentRequest {
            amount_paid,
            plan_price,
            current_balance: balance,
            current_manual_due: manual,
        }
    }

    fn visits_in(year: i32, month: u32, days: u32) -> Vec<String> {
        (1..=days)
            .map(|d| format!("{:04}-{:02}-{:02}T10:00:00Z", year, month, d))
            .collect()
    }

    #[test]
    fn test_validate_rejects_negatives() {
        assert!(matches!(
            request(-1, 500, 0, 0).validate(),
            Err(BillingError::NegativeAmount(-1))
        ));
        assert!(matches!(
            request(100, -500, 0, 0).validate(),
            Err(BillingError::NegativePrice(-500))
        ));
        assert!(matches!(
            request(100, 500, -3, 0).validate(),
            Err(BillingError::NegativeBalance(-3))
        ));
        assert!(request(0, 0, 0, 0).validate().is_ok());
    }

    #[test]
    fn test_pays_billable_month_and_keeps_remainder() {
        let cal = Calendar::default();
        let attendance = visits_in(2024, 2, 4);
        let result = process_payment(
            &cal,
            Some(utc("2024-01-31T23:59:59.999Z")),
            &attendance,
            &request(650, 500, 0, 0),
            3,
            utc("2024-02-20T00:00:00Z"),
        );
        assert_eq!(result.new_expiry, utc("2024-02-29T23:59:59.999Z"));
        assert_eq!(result.new_balance, 150);
        assert_eq!(result.new_manual_due, 0);
    }

    #[test]
    fn test_wallet_balance_completes_a_month() {
        let cal = Calendar::default();
        let attendance = visits_in(2024, 2, 4);
        let result = process_payment(
            &cal,
            Some(utc("2024-01-31T23:59:59.999Z")),
            &attendance,
            &request(300, 500, 200, 0),
            1,
            utc("2024-02-20T00:00:00Z"),
        );
        assert_eq!(result.new_expiry, utc("2024-02-29T23:59:59.999Z"));
        assert_eq!(result.new_balance, 0);
    }

    #[test]
    fn test_partial_payment_only_tops_up_wallet() {
        let cal = Calendar::default();
        let attendance = visits_in(2024, 2, 4);
        let expiry = utc("2024-01-31T23:59:59.999Z");
        let result = process_payment(
            &cal,
            Some(expiry),
            &attendance,
            &request(200, 500, 100, 0),
            1,
            utc("2024-02-20T00:00:00Z"),
        );
        assert_eq!(result.new_expiry, expiry);
        assert_eq!(result.new_balance, 300);
    }

    #[test]
    fn test_gap_months_advance_without_credit() {
        let cal = Calendar::default();
        let mut attendance = visits_in(2024, 4, 5);
        attendance.extend(visits_in(2024, 2, 1));
        let result = process_payment(
            &cal,
            Some(utc("2024-01-31T23:59:59.999Z")),
            &attendance,
            &request(0, 500, 0, 0),
            3,
            utc("2024-04-20T00:00:00Z"),
        );
        // Feb and Mar are gaps, Apr is billable and unpaid
        assert_eq!(result.new_expiry, utc("2024-03-31T23:59:59.999Z"));
    }

    #[test]
    fn test_leftover_credit_pays_in_advance() {
        let cal = Calendar::default();
        let attendance: Vec<String> = Vec::new();
        let result = process_payment(
            &cal,
            Some(utc("2024-05-31T23:59:59.999Z")),
            &attendance,
            &request(1500, 500, 0, 0),
            1,
            utc("2024-05-15T00:00:00Z"),
        );
        assert_eq!(result.new_expiry, utc("2024-08-31T23:59:59.999Z"));
        assert_eq!(result.new_balance, 0);
    }

    #[test]
    fn test_manual_dues_paid_before_timeline() {
        let cal = Calendar::default();
        let attendance: Vec<String> = Vec::new();
        let expiry = utc("2024-05-31T23:59:59.999Z");
        let result = process_payment(
            &cal,
            Some(expiry),
            &attendance,
            &request(1000, 500, 0, 3),
            1,
            utc("2024-05-15T00:00:00Z"),
        );
        assert_eq!(result.new_manual_due, 1);
        assert_eq!(result.new_expiry, expiry);
        assert_eq!(result.new_balance, 0);
    }

    #[test]
    fn test_free_plan_advances_far_ahead() {
        let cal = Calendar::default();
        let attendance: Vec<String> = Vec::new();
        let result = process_payment(
            &cal,
            Some(utc("2024-05-31T23:59:59.999Z")),
            &attendance,
            &request(1, 0, 0, 0),
            1,
            utc("2024-05-15T00:00:00Z"),
        );
        // 99 months of credit, but the walk stops at the month cap
        assert_eq!(result.new_expiry, utc("2029-05-31T23:59:59.999Z"));
        assert_eq!(result.new_balance, 1);
    }

    #[test]
    fn test_free_plan_zero_payment_grants_nothing() {
        let cal = Calendar::default();
        let attendance: Vec<String> = Vec::new();
        let expiry = utc("2024-05-31T23:59:59.999Z");
        let result = process_payment(
            &cal,
            Some(expiry),
            &attendance,
            &request(0, 0, 0, 0),
            1,
            utc("2024-05-15T00:00:00Z"),
        );
        assert_eq!(result.new_expiry, expiry);
    }

    #[test]
    fn test_missing_expiry_starts_from_now() {
        let cal = Calendar::default();
        let attendance: Vec<String> = Vec::new();
        let result = process_payment(
            &cal,
            None,
            &attendance,
            &request(500, 500, 0, 0),
            1,
            utc("2024-05-15T00:00:00Z"),
        );
        assert_eq!(result.new_expiry, utc("2024-06-30T23:59:59.999Z"));
    }
}
