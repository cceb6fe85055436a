//! Gym settings
//!
//! Timezone, attendance threshold and the plan price list. Loaded either
//! from environment variables or from a JSON document; both paths reject
//! partial or unknown input instead of guessing.

use std::env;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::GymError;
use crate::types::MembershipPlan;

const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_THRESHOLD: u32 = 1;
const DEFAULT_PLANS: &str = "standard=500";

/// Settings consumed by the billing engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GymSettings {
    /// IANA timezone used for calendar-day and calendar-month boundaries
    pub timezone: Tz,
    /// Distinct attended days a month needs before it becomes billable
    pub attendance_threshold: u32,
    pub plans: Vec<MembershipPlan>,
    /// Operator-simulated "now". When unset the wall clock is used.
    #[serde(default)]
    pub simulated_now: Option<DateTime<Utc>>,
}

impl GymSettings {
    /// Load settings from environment variables
    ///
    /// - `GYM_TIMEZONE` (default `UTC`)
    /// - `GYM_ATTENDANCE_THRESHOLD` (default `1`)
    /// - `GYM_PLANS` as `name=price,name=price` (default `standard=500`)
    /// - `GYM_SIMULATED_NOW` optional RFC 3339 instant
    pub fn from_env() -> Result<Self, ConfigError> {
        let timezone = env::var("GYM_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string())
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidTimezone(e.to_string()))?;

        let attendance_threshold = match env::var("GYM_ATTENDANCE_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("GYM_ATTENDANCE_THRESHOLD", raw))?,
            Err(_) => DEFAULT_THRESHOLD,
        };

        let plans = parse_plans(
            &env::var("GYM_PLANS").unwrap_or_else(|_| DEFAULT_PLANS.to_string()),
        )?;

        let simulated_now = match env::var("GYM_SIMULATED_NOW") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                DateTime::parse_from_rfc3339(raw.trim())
                    .map_err(|_| ConfigError::Invalid("GYM_SIMULATED_NOW", raw.clone()))?
                    .with_timezone(&Utc),
            ),
            _ => None,
        };

        let settings = Self {
            timezone,
            attendance_threshold,
            plans,
            simulated_now,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a JSON document
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.plans.is_empty() {
            return Err(ConfigError::NoPlans);
        }
        for plan in &self.plans {
            if plan.price < 0 {
                return Err(ConfigError::NegativePrice(plan.name.clone()));
            }
        }
        Ok(())
    }

    /// The instant the engine should treat as "now"
    pub fn now(&self, wall_clock: DateTime<Utc>) -> DateTime<Utc> {
        self.simulated_now.unwrap_or(wall_clock)
    }

    /// Look up a plan by name
    pub fn plan(&self, name: &str) -> Result<&MembershipPlan, GymError> {
        self.plans
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| GymError::NotFound(format!("plan '{}'", name)))
    }
}

impl Default for GymSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            attendance_threshold: DEFAULT_THRESHOLD,
            plans: vec![MembershipPlan::new("standard", 500)],
            simulated_now: None,
        }
    }
}

fn parse_plans(raw: &str) -> Result<Vec<MembershipPlan>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, price) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::Invalid("GYM_PLANS", entry.to_string()))?;
            let price = price
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::Invalid("GYM_PLANS", entry.to_string()))?;
            Ok(MembershipPlan::new(name.trim(), price))
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("Malformed settings document: {0}")]
    Malformed(String),
    #[error("At least one membership plan must be configured")]
    NoPlans,
    #[error("Plan '{0}' has a negative price")]
    NegativePrice(String),
}
