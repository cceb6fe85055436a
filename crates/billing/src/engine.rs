//! Billing engine
//!
//! Entry point used by the request and reporting layers. Resolves the
//! member's plan from settings, validates input at the boundary and hands
//! the pure calculations their explicit `now`.
//!
//! ## Concurrency
//! Each call is a pure transform from old account state to new. Callers
//! must serialize payments per member; two payments computed from the same
//! snapshot will overwrite each other.

use chrono::{DateTime, Utc};
use serde::Serialize;

use gymtrack_shared::{format_instant, GymSettings, MemberAccount, MemberId, MembershipPlan};

use crate::calendar::Calendar;
use crate::dues::{calculate_dues, DueResult};
use crate::enrollment::{initial_billing_state, LegacyDues};
use crate::error::{BillingError, BillingResult};
use crate::payment::{process_payment, PaymentRequest, PaymentResult};
use crate::streak::current_streak;

/// Outcome of applying a payment to a member account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    /// Account with the new billing state applied, ready to persist
    pub account: MemberAccount,
    pub result: PaymentResult,
}

/// Dashboard view of a member's dues
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueSummary {
    pub member_id: MemberId,
    pub dues: DueResult,
    pub amount_owed: i64,
    pub streak: u32,
}

/// Billing engine bound to one gym's settings
#[derive(Debug, Clone)]
pub struct BillingEngine {
    calendar: Calendar,
    settings: GymSettings,
}

impl BillingEngine {
    pub fn new(settings: GymSettings) -> Self {
        Self {
            calendar: Calendar::new(settings.timezone),
            settings,
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn settings(&self) -> &GymSettings {
        &self.settings
    }

    /// Look up a plan, mapping a miss to a billing error
    pub fn plan(&self, name: &str) -> BillingResult<&MembershipPlan> {
        self.settings
            .plan(name)
            .map_err(|_| BillingError::UnknownPlan(name.to_string()))
    }

    /// Create the billing state for a new member
    pub fn enroll(
        &self,
        name: &str,
        plan: &str,
        joined_at: DateTime<Utc>,
        legacy: LegacyDues,
    ) -> BillingResult<MemberAccount> {
        if name.trim().is_empty() {
            return Err(BillingError::InvalidInput(
                "member name must not be empty".to_string(),
            ));
        }
        let plan = self.plan(plan)?;
        let state = initial_billing_state(&self.calendar, joined_at, legacy);

        let account = MemberAccount {
            id: MemberId::new(),
            name: name.trim().to_string(),
            plan: plan.name.clone(),
            expiry_date: Some(format_instant(state.expiry_date)),
            manual_due_months: state.manual_due_months,
            balance: state.balance,
        };

        tracing::info!(
            member_id = %account.id,
            plan = %account.plan,
            expiry = %state.expiry_date,
            manual_due = state.manual_due_months,
            "Enrolled member"
        );

        Ok(account)
    }

    /// Stored expiry as an instant. A malformed value counts as `now`.
    fn resolve_expiry(&self, account: &MemberAccount, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        account
            .expiry_date
            .as_deref()
            .map(|raw| self.calendar.parse_or(raw, now))
    }

    /// Outstanding dues for a member
    pub fn dues<S: AsRef<str>>(
        &self,
        account: &MemberAccount,
        attendance: &[S],
        now: DateTime<Utc>,
    ) -> DueResult {
        calculate_dues(
            &self.calendar,
            self.resolve_expiry(account, now),
            attendance,
            self.settings.attendance_threshold,
            account.manual_due_months,
            now,
        )
    }

    /// Dues plus the informational figures shown next to them
    pub fn summary<S: AsRef<str>>(
        &self,
        account: &MemberAccount,
        attendance: &[S],
        now: DateTime<Utc>,
        wall_clock_now: DateTime<Utc>,
    ) -> BillingResult<DueSummary> {
        let price = self.plan(&account.plan)?.price;
        let dues = self.dues(account, attendance, now);
        Ok(DueSummary {
            member_id: account.id,
            amount_owed: dues.amount_owed(price, account.balance),
            dues,
            streak: self.streak(attendance, wall_clock_now),
        })
    }

    /// Apply a payment and return the account state to persist
    pub fn apply_payment<S: AsRef<str>>(
        &self,
        account: &MemberAccount,
        attendance: &[S],
        amount_paid: i64,
        now: DateTime<Utc>,
    ) -> BillingResult<PaymentOutcome> {
        let plan = self.plan(&account.plan)?;
        let request = PaymentRequest {
            amount_paid,
            plan_price: plan.price,
            current_balance: account.balance,
            current_manual_due: account.manual_due_months,
        };
        request.validate()?;

        let previous_expiry = self.resolve_expiry(account, now);
        let result = process_payment(
            &self.calendar,
            previous_expiry,
            attendance,
            &request,
            self.settings.attendance_threshold,
            now,
        );

        tracing::info!(
            member_id = %account.id,
            amount_paid = amount_paid,
            previous_expiry = ?previous_expiry,
            new_expiry = %result.new_expiry,
            new_balance = result.new_balance,
            new_manual_due = result.new_manual_due,
            "Applied payment"
        );

        Ok(PaymentOutcome {
            account: account.with_billing_state(
                result.new_expiry,
                result.new_balance,
                result.new_manual_due,
            ),
            result,
        })
    }

    /// Current attendance streak, measured against the real wall clock
    pub fn streak<S: AsRef<str>>(&self, attendance: &[S], wall_clock_now: DateTime<Utc>) -> u32 {
        current_streak(&self.calendar, attendance, wall_clock_now)
    }
}
