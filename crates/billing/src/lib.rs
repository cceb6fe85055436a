//! GymTrack dues engine
//!
//! Pure calculations over a member's paid-through date, attendance history
//! and wallet. Nothing here performs I/O or reads the clock; every function
//! takes `now` explicitly so operators can simulate time.

pub mod attendance;
pub mod calendar;
pub mod dues;
pub mod engine;
pub mod enrollment;
pub mod error;
pub mod payment;
pub mod streak;

pub use attendance::{aggregate_attendance, MonthlyAttendance};
pub use calendar::{Calendar, MonthKey, MAX_SCAN_MONTHS};
pub use dues::{calculate_dues, calculate_dues_from, DueResult};
pub use engine::{BillingEngine, DueSummary, PaymentOutcome};
pub use enrollment::{initial_billing_state, InitialBillingState, LegacyDues};
pub use error::{BillingError, BillingResult};
pub use payment::{
    process_payment, process_payment_from, PaymentRequest, PaymentResult,
    FREE_PLAN_ADVANCE_MONTHS,
};
pub use streak::current_streak;
