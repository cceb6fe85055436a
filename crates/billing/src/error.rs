//! Billing error types
//!
//! The calculation functions themselves never fail. These errors come from
//! validating caller input before it reaches them.

use thiserror::Error;

/// Billing-specific errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Invalid amount: {0} (payments must not be negative)")]
    NegativeAmount(i64),

    #[error("Invalid plan price: {0} (prices must not be negative)")]
    NegativePrice(i64),

    #[error("Invalid wallet balance: {0} (balances must not be negative)")]
    NegativeBalance(i64),

    #[error("Unknown membership plan: {0}")]
    UnknownPlan(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<BillingError> for gymtrack_shared::GymError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::UnknownPlan(plan) => Self::NotFound(format!("plan '{}'", plan)),
            other => Self::Billing(other.to_string()),
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use gymtrack_shared::GymError;

    #[test]
    fn test_unknown_plan_maps_to_not_found() {
        let err: GymError = BillingError::UnknownPlan("gold".to_string()).into();
        assert!(matches!(err, GymError::NotFound(ref what) if what == "plan 'gold'"));
    }

    #[test]
    fn test_other_errors_map_to_billing() {
        let err: GymError = BillingError::NegativeAmount(-5).into();
        match err {
            GymError::Billing(msg) => assert!(msg.contains("-5")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
