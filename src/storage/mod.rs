//! Durable storage for timer records, usage stats and tasks
//!
//! Services talk to storage only through [`TimerStore`], [`StatsStore`] and
//! [`TaskStore`]. [`SqliteStore`] is the durable backend; [`CachedStore`]
//! decorates any `TimerStore` with a best-effort in-process cache.

pub mod cache;
pub mod sqlite;

use thiserror::Error;

use chrono::{DateTime, Utc};

use crate::state::{LocalId, Task, TaskOrder, TimerState, UserId, UserStats};

pub use cache::CachedStore;
pub use sqlite::SqliteStore;

/// Storage failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read-by-key / write-with-overwrite access to timer records
pub trait TimerStore: Send + Sync {
    fn load(&self, user_id: UserId) -> Result<Option<TimerState>, StoreError>;

    fn save(&self, state: &TimerState) -> Result<(), StoreError>;

    /// Remove the record, returning whether one existed
    fn delete(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// All records currently flagged as running
    fn running(&self) -> Result<Vec<TimerState>, StoreError>;

    /// Drop any cached copy of the record. Stores without a cache ignore this.
    fn invalidate_cache(&self, _user_id: UserId) {}

    /// Evict stale cached copies, returning how many were dropped
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Persistence for [`UserStats`]
pub trait StatsStore: Send + Sync {
    fn load_stats(&self, user_id: UserId) -> Result<Option<UserStats>, StoreError>;

    fn save_stats(&self, stats: &UserStats) -> Result<(), StoreError>;

    fn delete_stats(&self, user_id: UserId) -> Result<bool, StoreError>;
}

/// Persistence for a user's task list
pub trait TaskStore: Send + Sync {
    /// Tasks in list order. `created_within` keeps only tasks created in
    /// the half-open range `[start, end)`.
    fn list_tasks(
        &self,
        user_id: UserId,
        hide_completed: bool,
        created_within: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Task>, StoreError>;

    /// Insert a task at the end of the list with the next free local id
    fn create_task(
        &self,
        user_id: UserId,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError>;

    fn load_task(&self, user_id: UserId, local_id: LocalId) -> Result<Option<Task>, StoreError>;

    fn save_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Apply all positions atomically, returning how many tasks matched
    fn reorder_tasks(
        &self,
        user_id: UserId,
        orders: &[TaskOrder],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    fn delete_task(&self, user_id: UserId, local_id: LocalId) -> Result<bool, StoreError>;

    /// Remove every task, or only completed ones, returning the count
    fn delete_tasks(&self, user_id: UserId, completed_only: bool) -> Result<usize, StoreError>;
}
