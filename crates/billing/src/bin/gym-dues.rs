//! Dues utility for GymTrack operators
//!
//! Reads a member snapshot exported from the database and prints what the
//! member owes, or what a payment would change. Nothing is written back;
//! persist the printed account yourself if the result looks right.
//!
//! Usage:
//!   cargo run --bin gym-dues -- dues member.json
//!   cargo run --bin gym-dues -- pay member.json 1000
//!   cargo run --bin gym-dues -- dues member.json --now 2024-03-01T00:00:00Z
//!
//! Snapshot format:
//!   { "account": { ...MemberAccount... }, "visits": [ { "member_id": "...", "timestamp": "..." } ] }
//!
//! Settings come from GYM_TIMEZONE, GYM_ATTENDANCE_THRESHOLD, GYM_PLANS and
//! GYM_SIMULATED_NOW (a .env file is honoured).

use std::env;
use std::fs;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use gymtrack_billing::BillingEngine;
use gymtrack_shared::{timestamps_for, AttendanceVisit, GymError, GymSettings, MemberAccount};

const USAGE: &str = "Usage:
  gym-dues dues <snapshot.json> [--now <timestamp>]
  gym-dues pay <snapshot.json> <amount> [--now <timestamp>]";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MemberSnapshot {
    account: MemberAccount,
    visits: Vec<AttendanceVisit>,
}

/// Run one command against a snapshot and render the result as JSON
fn execute(
    engine: &BillingEngine,
    command: &str,
    amount: Option<&str>,
    snapshot: &MemberSnapshot,
    now: DateTime<Utc>,
    wall_clock: DateTime<Utc>,
) -> Result<String, GymError> {
    let attendance = timestamps_for(snapshot.account.id, &snapshot.visits);

    tracing::info!(
        member_id = %snapshot.account.id,
        visits = attendance.len(),
        now = %now,
        "Loaded member snapshot"
    );

    let rendered = match command {
        "dues" => {
            let summary = engine.summary(&snapshot.account, &attendance, now, wall_clock)?;
            serde_json::to_string_pretty(&summary)
        }
        "pay" => {
            let amount = parse_amount(amount)?;
            let outcome = engine.apply_payment(&snapshot.account, &attendance, amount, now)?;
            serde_json::to_string_pretty(&outcome)
        }
        other => return Err(GymError::Validation(format!("unknown command '{}'", other))),
    };

    rendered.map_err(|e| GymError::Internal(format!("failed to render result: {}", e)))
}

fn parse_amount(raw: Option<&str>) -> Result<i64, GymError> {
    let raw = raw.ok_or_else(|| GymError::Validation("missing payment amount".to_string()))?;
    raw.trim()
        .parse()
        .map_err(|_| GymError::Validation(format!("invalid amount '{}'", raw)))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gymtrack_billing=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let now_override = match args.iter().position(|a| a == "--now") {
        Some(idx) if idx + 1 < args.len() => {
            let raw = args.remove(idx + 1);
            args.remove(idx);
            Some(raw)
        }
        Some(_) => bail!("--now needs a timestamp\n{}", USAGE),
        None => None,
    };

    let (command, snapshot_path) = match (args.first(), args.get(1)) {
        (Some(command), Some(path)) => (command.clone(), path.clone()),
        _ => bail!(USAGE),
    };

    let settings = GymSettings::from_env()
        .map_err(GymError::from)
        .context("Failed to load gym settings")?;
    let engine = BillingEngine::new(settings);

    let wall_clock = Utc::now();
    let mut now = engine.settings().now(wall_clock);
    if let Some(raw) = now_override {
        now = engine.calendar().parse_or(&raw, now);
    }

    let raw = fs::read_to_string(&snapshot_path)
        .with_context(|| format!("Failed to read snapshot {}", snapshot_path))?;
    let snapshot: MemberSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed snapshot {}", snapshot_path))?;

    let output = execute(
        &engine,
        &command,
        args.get(2).map(String::as_str),
        &snapshot,
        now,
        wall_clock,
    )
    .with_context(|| format!("'{}' failed for {}", command, snapshot_path))?;
    println!("{}", output);

    Ok(())
}
