//! Initial billing state for new and migrated members

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;

/// Debt a member brings along when migrated from an earlier system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "months", rename_all = "snake_case")]
pub enum LegacyDues {
    /// Fresh member, nothing owed
    #[default]
    None,
    /// Owed months kept as a counter outside the expiry timeline. Always
    /// due, regardless of attendance.
    Manual(u32),
    /// Owed months placed on the timeline by moving the expiry back. These
    /// are billed like any other month, so low-attendance months stay free.
    Backdated(u32),
}

/// Billing triple for a freshly created member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitialBillingState {
    pub expiry_date: DateTime<Utc>,
    pub manual_due_months: u32,
    pub balance: i64,
}

/// Paid-through date is the end of the month before joining, shifted back
/// further for backdated legacy dues.
pub fn initial_billing_state(
    calendar: &Calendar,
    joined_at: DateTime<Utc>,
    legacy: LegacyDues,
) -> InitialBillingState {
    let join_month = calendar.month_key(joined_at);

    let (anchor, manual_due_months) = match legacy {
        LegacyDues::None => (join_month.prev(), 0),
        LegacyDues::Manual(months) => (join_month.prev(), months),
        LegacyDues::Backdated(months) => (join_month.back(months.saturating_add(1)), 0),
    };

    InitialBillingState {
        expiry_date: calendar.month_end_of(anchor),
        manual_due_months,
        balance: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(raw: &str) -> DateTime<Utc> {
        raw.parse().unwrap()
    }

    #[test]
    fn test_new_member_paid_through_previous_month() {
        let cal = Calendar::default();
        let state = initial_billing_state(&cal, utc("2024-01-17T09:00:00Z"), LegacyDues::None);
        assert_eq!(state.expiry_date, utc("2023-12-31T23:59:59.999Z"));
        assert_eq!(state.manual_due_months, 0);
        assert_eq!(state.balance, 0);
    }

    #[test]
    fn test_manual_legacy_dues_keep_anchor() {
        let cal = Calendar::default();
        let state = initial_billing_state(&cal, utc("2024-03-02T09:00:00Z"), LegacyDues::Manual(4));
        assert_eq!(state.expiry_date, utc("2024-02-29T23:59:59.999Z"));
        assert_eq!(state.manual_due_months, 4);
    }

    #[test]
    fn test_backdated_legacy_dues_move_anchor() {
        let cal = Calendar::default();
        let state =
            initial_billing_state(&cal, utc("2024-03-02T09:00:00Z"), LegacyDues::Backdated(2));
        assert_eq!(state.expiry_date, utc("2023-12-31T23:59:59.999Z"));
        assert_eq!(state.manual_due_months, 0);
    }

    #[test]
    fn test_legacy_dues_json_shape() {
        let parsed: LegacyDues = serde_json::from_str(r#"{"kind":"manual","months":3}"#).unwrap();
        assert_eq!(parsed, LegacyDues::Manual(3));
        let none: LegacyDues = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert_eq!(none, LegacyDues::None);
    }
}
