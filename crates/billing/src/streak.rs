//! Attendance streaks
//!
//! Informational only. Nothing in billing reads the streak.

use chrono::{DateTime, Duration, Utc};

use crate::attendance::distinct_days;
use crate::calendar::Calendar;

/// Current run of consecutive attended days.
///
/// The run must end today or yesterday (local calendar of `wall_clock_now`),
/// otherwise the streak is zero. Counting walks back from the most recent
/// day and stops at the first missed day.
pub fn current_streak<S: AsRef<str>>(
    calendar: &Calendar,
    timestamps: &[S],
    wall_clock_now: DateTime<Utc>,
) -> u32 {
    let days = distinct_days(calendar, timestamps);
    let mut recent_first = days.iter().rev();

    let Some(&latest) = recent_first.next() else {
        return 0;
    };

    let today = calendar.local_date(wall_clock_now);
    let yesterday = today - Duration::days(1);
    if latest != today && latest != yesterday {
        return 0;
    }

    let mut streak = 1;
    let mut previous = latest;
    for &day in recent_first {
        if previous - day != Duration::days(1) {
            break;
        }
        streak += 1;
        previous = day;
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(raw: &str) -> DateTime<Utc> {
        raw.parse().unwrap()
    }

    #[test]
    fn test_no_visits() {
        let cal = Calendar::default();
        let visits: Vec<String> = Vec::new();
        assert_eq!(current_streak(&cal, &visits, utc("2024-05-10T12:00:00Z")), 0);
    }

    #[test]
    fn test_consecutive_days_ending_today() {
        let cal = Calendar::default();
        let visits = [
            "2024-05-10T07:00:00Z",
            "2024-05-10T18:00:00Z",
            "2024-05-09T07:00:00Z",
            "2024-05-08T07:00:00Z",
            "2024-05-06T07:00:00Z",
        ];
        assert_eq!(current_streak(&cal, &visits, utc("2024-05-10T20:00:00Z")), 3);
    }

    #[test]
    fn test_streak_anchored_yesterday() {
        let cal = Calendar::default();
        let visits = ["2024-05-09T07:00:00Z", "2024-05-08T07:00:00Z"];
        assert_eq!(current_streak(&cal, &visits, utc("2024-05-10T20:00:00Z")), 2);
    }

    #[test]
    fn test_stale_attendance_resets() {
        let cal = Calendar::default();
        let visits = [
            "2024-05-08T07:00:00Z",
            "2024-05-07T07:00:00Z",
            "2024-05-06T07:00:00Z",
        ];
        assert_eq!(current_streak(&cal, &visits, utc("2024-05-10T20:00:00Z")), 0);
    }

    #[test]
    fn test_gap_breaks_streak() {
        let cal = Calendar::default();
        // Day N and N-3 only
        let visits = ["2024-05-10T07:00:00Z", "2024-05-07T07:00:00Z"];
        assert_eq!(current_streak(&cal, &visits, utc("2024-05-10T20:00:00Z")), 1);
    }

    #[test]
    fn test_streak_crosses_month_boundary() {
        let cal = Calendar::default();
        let visits = [
            "2024-03-01T07:00:00Z",
            "2024-02-29T07:00:00Z",
            "2024-02-28T07:00:00Z",
        ];
        assert_eq!(current_streak(&cal, &visits, utc("2024-03-01T09:00:00Z")), 3);
    }

    #[test]
    fn test_streak_uses_local_days() {
        let cal = Calendar::new(chrono_tz::Asia::Tokyo);
        // 16:00Z on the 9th is already the 10th in Tokyo
        let visits = ["2024-05-09T16:00:00Z", "2024-05-09T01:00:00Z"];
        assert_eq!(current_streak(&cal, &visits, utc("2024-05-10T03:00:00Z")), 2);
    }
}
