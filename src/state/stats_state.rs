//! Daily visit streaks and session hours

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timer_state::UserId;

/// Usage counters for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: UserId,
    pub current_streak: u32,
    pub highest_streak: u32,
    pub last_visit_date: DateTime<Utc>,
    pub total_visit_days: u32,
    pub total_hours: f64,
    /// Set while a session is open
    pub last_login_time: Option<DateTime<Utc>>,
}

/// Result of recording a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    /// Already counted today
    SameDay,
    /// Visit on the following day extended the streak
    Extended,
    /// A gap of `days` broke the streak
    Reset { days: i64 },
}

impl UserStats {
    /// First visit: a one-day streak
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            current_streak: 1,
            highest_streak: 1,
            last_visit_date: now,
            total_visit_days: 1,
            total_hours: 0.0,
            last_login_time: None,
        }
    }

    /// Count a visit at `now`, updating the streak by calendar day (UTC)
    pub fn record_visit(&mut self, now: DateTime<Utc>) -> VisitOutcome {
        let today = now.date_naive();
        let last = self.last_visit_date.date_naive();
        let days = (today - last).num_days();

        if days == 0 {
            return VisitOutcome::SameDay;
        }

        let outcome = if days == 1 {
            self.current_streak += 1;
            self.highest_streak = self.highest_streak.max(self.current_streak);
            VisitOutcome::Extended
        } else {
            self.current_streak = 1;
            VisitOutcome::Reset { days }
        };

        self.last_visit_date = now;
        self.total_visit_days += 1;
        outcome
    }

    pub fn start_session(&mut self, now: DateTime<Utc>) {
        self.last_login_time = Some(now);
    }

    /// Close the open session, returning the hours it added
    pub fn end_session(&mut self, now: DateTime<Utc>) -> f64 {
        let spent = self
            .last_login_time
            .take()
            .map(|since| hours_between(since, now))
            .unwrap_or(0.0);
        self.total_hours += spent;
        spent
    }

    /// Total hours including a session still in progress
    pub fn hours_at(&self, now: DateTime<Utc>) -> f64 {
        let live = self
            .last_login_time
            .map(|since| hours_between(since, now))
            .unwrap_or(0.0);
        self.total_hours + live
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let secs = (to - from).num_milliseconds().max(0) as f64 / 1000.0;
    secs / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn same_day_visits_do_not_count_twice() {
        let mut stats = UserStats::new(1, at(1, 8));
        assert_eq!(stats.record_visit(at(1, 23)), VisitOutcome::SameDay);
        assert_eq!(stats.total_visit_days, 1);
        assert_eq!(stats.last_visit_date, at(1, 8));
    }

    #[test]
    fn consecutive_days_extend_the_streak() {
        let mut stats = UserStats::new(1, at(1, 23));
        assert_eq!(stats.record_visit(at(2, 0)), VisitOutcome::Extended);
        assert_eq!(stats.record_visit(at(3, 12)), VisitOutcome::Extended);
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.highest_streak, 3);
        assert_eq!(stats.total_visit_days, 3);
    }

    #[test]
    fn a_gap_resets_the_streak_but_keeps_the_record() {
        let mut stats = UserStats::new(1, at(1, 9));
        stats.record_visit(at(2, 9));
        assert_eq!(stats.record_visit(at(5, 9)), VisitOutcome::Reset { days: 3 });
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.highest_streak, 2);
        assert_eq!(stats.total_visit_days, 3);
    }

    #[test]
    fn sessions_accumulate_hours() {
        let start = at(1, 9);
        let mut stats = UserStats::new(1, start);
        stats.start_session(start);
        assert!((stats.hours_at(start + Duration::minutes(30)) - 0.5).abs() < 1e-9);

        let added = stats.end_session(start + Duration::hours(2));
        assert!((added - 2.0).abs() < 1e-9);
        assert!(stats.last_login_time.is_none());
        assert!((stats.hours_at(start + Duration::hours(5)) - 2.0).abs() < 1e-9);

        // closing twice adds nothing
        assert_eq!(stats.end_session(start + Duration::hours(6)), 0.0);
    }
}
