//! Common types used across GymTrack

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Member ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for MemberId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Plans
// =============================================================================

/// A membership plan as listed in the gym's price list.
///
/// Prices are whole units of the gym's currency. A price of zero marks a
/// free plan; any positive payment on a free plan advances the membership
/// without limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipPlan {
    pub name: String,
    pub price: i64,
}

impl MembershipPlan {
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }

    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// A single check-in. Appended on arrival and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendanceVisit {
    pub member_id: MemberId,
    /// Raw ISO-8601 timestamp as stored. Malformed values are tolerated
    /// here and dropped during aggregation.
    pub timestamp: String,
}

impl AttendanceVisit {
    pub fn new(member_id: MemberId, timestamp: impl Into<String>) -> Self {
        Self {
            member_id,
            timestamp: timestamp.into(),
        }
    }
}

/// Billing state of a member, as persisted by the storage layer.
///
/// `expiry_date` is the paid-through instant (end of the last settled
/// month), kept as the raw stored string so a malformed value does not
/// make the whole record unreadable. `manual_due_months` is legacy debt carried over for migrated
/// members and `balance` is the wallet remainder, always below the plan
/// price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberAccount {
    pub id: MemberId,
    pub name: String,
    pub plan: String,
    pub expiry_date: Option<String>,
    pub manual_due_months: u32,
    pub balance: i64,
}

impl MemberAccount {
    /// Apply a freshly computed billing triple, leaving identity untouched.
    pub fn with_billing_state(
        &self,
        expiry_date: DateTime<Utc>,
        balance: i64,
        manual_due_months: u32,
    ) -> Self {
        Self {
            expiry_date: Some(format_instant(expiry_date)),
            balance,
            manual_due_months,
            ..self.clone()
        }
    }
}

/// Storage form of an instant: RFC 3339, UTC, millisecond precision.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Extract the raw timestamps belonging to one member.
pub fn timestamps_for(member_id: MemberId, visits: &[AttendanceVisit]) -> Vec<&str> {
    visits
        .iter()
        .filter(|v| v.member_id == member_id)
        .map(|v| v.timestamp.as_str())
        .collect()
}
