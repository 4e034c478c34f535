//! Usage streak and session-hours service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::guard::UserLocks;
use crate::{
    error::StatsError,
    state::{UserId, UserStats, VisitOutcome},
    storage::StatsStore,
};

/// Stats as shown to the user, with any open session counted in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub current_streak: u32,
    pub highest_streak: u32,
    pub total_visits: u32,
    pub total_hours: f64,
}

impl StatsSummary {
    fn of(stats: &UserStats, now: DateTime<Utc>) -> Self {
        Self {
            current_streak: stats.current_streak,
            highest_streak: stats.highest_streak,
            total_visits: stats.total_visit_days,
            total_hours: stats.hours_at(now),
        }
    }
}

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn StatsStore>,
    locks: Arc<UserLocks>,
}

impl StatsService {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self {
            store,
            locks: Arc::new(UserLocks::new()),
        }
    }

    pub fn prune_idle(&self) -> usize {
        self.locks.prune_idle()
    }

    fn load_or_create(&self, user_id: UserId, now: DateTime<Utc>) -> Result<(UserStats, bool), StatsError> {
        match self.store.load_stats(user_id)? {
            Some(stats) => Ok((stats, false)),
            None => Ok((UserStats::new(user_id, now), true)),
        }
    }

    pub async fn get_stats(&self, user_id: UserId, now: DateTime<Utc>) -> Result<StatsSummary, StatsError> {
        let _guard = self.locks.lock(user_id).await;
        let (stats, created) = self.load_or_create(user_id, now)?;
        if created {
            self.store.save_stats(&stats)?;
        }
        Ok(StatsSummary::of(&stats, now))
    }

    /// Count today's visit toward the daily streak
    pub async fn record_visit(&self, user_id: UserId, now: DateTime<Utc>) -> Result<StatsSummary, StatsError> {
        let _guard = self.locks.lock(user_id).await;
        let (mut stats, created) = self.load_or_create(user_id, now)?;

        if created {
            info!("First visit recorded for user {}", user_id);
        } else {
            match stats.record_visit(now) {
                VisitOutcome::SameDay => {
                    debug!("User {} already visited today", user_id);
                    return Ok(StatsSummary::of(&stats, now));
                }
                VisitOutcome::Extended => {
                    info!("User {} extended streak to {}", user_id, stats.current_streak)
                }
                VisitOutcome::Reset { days } => {
                    info!("User {} streak reset after {} days away", user_id, days)
                }
            }
        }

        self.store.save_stats(&stats)?;
        Ok(StatsSummary::of(&stats, now))
    }

    pub async fn start_session(&self, user_id: UserId, now: DateTime<Utc>) -> Result<(), StatsError> {
        let _guard = self.locks.lock(user_id).await;
        let (mut stats, _) = self.load_or_create(user_id, now)?;
        stats.start_session(now);
        self.store.save_stats(&stats)?;
        Ok(())
    }

    /// Close the session, returning the new total hours
    pub async fn end_session(&self, user_id: UserId, now: DateTime<Utc>) -> Result<f64, StatsError> {
        let _guard = self.locks.lock(user_id).await;
        let mut stats = self
            .store
            .load_stats(user_id)?
            .ok_or(StatsError::NotFound(user_id))?;

        let spent = stats.end_session(now);
        self.store.save_stats(&stats)?;
        debug!("User {} session added {:.3}h", user_id, spent);
        Ok(stats.total_hours)
    }

    pub async fn delete_user_data(&self, user_id: UserId) -> Result<bool, StatsError> {
        let _guard = self.locks.lock(user_id).await;
        Ok(self.store.delete_stats(user_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use chrono::{Duration, TimeZone};

    fn service() -> StatsService {
        StatsService::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn visits_on_consecutive_days_build_a_streak() {
        let stats = service();
        let day1 = Utc.with_ymd_and_hms(2024, 1, 30, 20, 0, 0).unwrap();

        let first = stats.record_visit(1, day1).await.unwrap();
        assert_eq!(first.current_streak, 1);

        let same = stats.record_visit(1, day1 + Duration::hours(2)).await.unwrap();
        assert_eq!(same.total_visits, 1);

        let next = stats.record_visit(1, day1 + Duration::days(1)).await.unwrap();
        assert_eq!(next.current_streak, 2);
        assert_eq!(next.highest_streak, 2);
        assert_eq!(next.total_visits, 2);
    }

    #[tokio::test]
    async fn ending_a_session_requires_stats() {
        let stats = service();
        let now = Utc::now();
        assert!(matches!(stats.end_session(3, now).await, Err(StatsError::NotFound(3))));

        stats.start_session(3, now).await.unwrap();
        let live = stats.get_stats(3, now + Duration::minutes(90)).await.unwrap();
        assert!((live.total_hours - 1.5).abs() < 1e-6);

        let total = stats.end_session(3, now + Duration::hours(3)).await.unwrap();
        assert!((total - 3.0).abs() < 1e-6);
    }
}
