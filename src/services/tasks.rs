//! Per-user task list service

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, info};

use super::guard::UserLocks;
use crate::{
    error::TaskError,
    state::{
        task_state::{validate_description, validate_title},
        LocalId, NewTask, Task, TaskFilter, TaskOrder, UserId,
    },
    storage::TaskStore,
};

/// The UTC calendar day containing `now`, as `[start, end)`
fn utc_day(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    locks: Arc<UserLocks>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            locks: Arc::new(UserLocks::new()),
        }
    }

    pub fn prune_idle(&self) -> usize {
        self.locks.prune_idle()
    }

    pub async fn list(&self, user_id: UserId, filter: TaskFilter, now: DateTime<Utc>) -> Result<Vec<Task>, TaskError> {
        let window = filter.show_today_only.then(|| utc_day(now));
        Ok(self.store.list_tasks(user_id, filter.hide_completed, window)?)
    }

    pub async fn create(&self, user_id: UserId, input: NewTask, now: DateTime<Utc>) -> Result<Task, TaskError> {
        validate_title(&input.title).map_err(TaskError::Invalid)?;
        validate_description(&input.description).map_err(TaskError::Invalid)?;

        let _guard = self.locks.lock(user_id).await;
        let task = self
            .store
            .create_task(user_id, &input.title, &input.description, now)?;
        info!("User {} created task {}", user_id, task.local_id);
        Ok(task)
    }

    /// Load a task, apply `edit` and write it back under the user's lock
    async fn modify(
        &self,
        user_id: UserId,
        local_id: LocalId,
        now: DateTime<Utc>,
        edit: impl FnOnce(&mut Task),
    ) -> Result<Task, TaskError> {
        let _guard = self.locks.lock(user_id).await;
        let mut task = self
            .store
            .load_task(user_id, local_id)?
            .ok_or(TaskError::NotFound(local_id))?;

        edit(&mut task);
        task.updated_at = now;
        self.store.save_task(&task)?;
        Ok(task)
    }

    pub async fn update_title(
        &self,
        user_id: UserId,
        local_id: LocalId,
        title: String,
        now: DateTime<Utc>,
    ) -> Result<Task, TaskError> {
        validate_title(&title).map_err(TaskError::Invalid)?;
        self.modify(user_id, local_id, now, |task| task.title = title).await
    }

    pub async fn update_description(
        &self,
        user_id: UserId,
        local_id: LocalId,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<Task, TaskError> {
        if description.is_empty() {
            return Err(TaskError::Invalid("description must not be empty".to_string()));
        }
        validate_description(&description).map_err(TaskError::Invalid)?;
        self.modify(user_id, local_id, now, |task| task.description = description)
            .await
    }

    pub async fn set_completed(
        &self,
        user_id: UserId,
        local_id: LocalId,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<Task, TaskError> {
        let task = self
            .modify(user_id, local_id, now, |task| task.completed = completed)
            .await?;
        debug!("User {} marked task {} completed={}", user_id, local_id, completed);
        Ok(task)
    }

    /// Apply new list positions. Unknown local ids are skipped.
    pub async fn reorder(&self, user_id: UserId, orders: &[TaskOrder], now: DateTime<Utc>) -> Result<usize, TaskError> {
        let _guard = self.locks.lock(user_id).await;
        let matched = self.store.reorder_tasks(user_id, orders, now)?;
        debug!("User {} reordered {} of {} tasks", user_id, matched, orders.len());
        Ok(matched)
    }

    pub async fn delete(&self, user_id: UserId, local_id: LocalId) -> Result<(), TaskError> {
        let _guard = self.locks.lock(user_id).await;
        if !self.store.delete_task(user_id, local_id)? {
            return Err(TaskError::NotFound(local_id));
        }
        info!("User {} deleted task {}", user_id, local_id);
        Ok(())
    }

    pub async fn delete_all(&self, user_id: UserId) -> Result<usize, TaskError> {
        let _guard = self.locks.lock(user_id).await;
        Ok(self.store.delete_tasks(user_id, false)?)
    }

    pub async fn delete_completed(&self, user_id: UserId) -> Result<usize, TaskError> {
        let _guard = self.locks.lock(user_id).await;
        Ok(self.store.delete_tasks(user_id, true)?)
    }

    pub async fn delete_user_data(&self, user_id: UserId) -> Result<usize, TaskError> {
        self.delete_all(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use chrono::TimeZone;

    fn service() -> TaskService {
        TaskService::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn utc_day_spans_midnight_to_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 17, 45, 3).unwrap();
        let (start, end) = utc_day(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_storage() {
        let tasks = service();
        let now = Utc::now();
        assert!(matches!(tasks.create(1, new_task("x"), now).await, Err(TaskError::Invalid(_))));
        assert!(tasks.list(1, TaskFilter::default(), now).await.unwrap().is_empty());

        tasks.create(1, new_task("Proper title"), now).await.unwrap();
        assert!(matches!(
            tasks.update_description(1, 1, String::new(), now).await,
            Err(TaskError::Invalid(_))
        ));
        assert!(matches!(
            tasks.update_title(1, 1, "y".repeat(200), now).await,
            Err(TaskError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn edits_touch_only_the_addressed_task() {
        let tasks = service();
        let created = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
        let later = created + Duration::minutes(5);
        tasks.create(2, new_task("First"), created).await.unwrap();
        tasks.create(2, new_task("Second"), created).await.unwrap();

        let renamed = tasks.update_title(2, 2, "Second, renamed".to_string(), later).await.unwrap();
        assert_eq!(renamed.updated_at, later);
        assert_eq!(renamed.created_at, created);

        let done = tasks.set_completed(2, 1, true, later).await.unwrap();
        assert!(done.completed);

        let listed = tasks.list(2, TaskFilter::default(), later).await.unwrap();
        assert_eq!(listed[0].title, "First");
        assert_eq!(listed[1].title, "Second, renamed");
        assert!(!listed[1].completed);
    }

    #[tokio::test]
    async fn missing_tasks_are_not_found() {
        let tasks = service();
        let now = Utc::now();
        assert!(matches!(
            tasks.set_completed(3, 9, true, now).await,
            Err(TaskError::NotFound(9))
        ));
        assert!(matches!(tasks.delete(3, 9).await, Err(TaskError::NotFound(9))));
    }

    #[tokio::test]
    async fn today_filter_uses_the_utc_day() {
        let tasks = service();
        let yesterday = Utc.with_ymd_and_hms(2024, 6, 9, 23, 30, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2024, 6, 10, 0, 15, 0).unwrap();
        tasks.create(4, new_task("Yesterday"), yesterday).await.unwrap();
        tasks.create(4, new_task("Today"), today).await.unwrap();

        let filter = TaskFilter {
            hide_completed: false,
            show_today_only: true,
        };
        let listed = tasks.list(4, filter, today).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Today");
    }

    #[tokio::test]
    async fn delete_completed_leaves_open_tasks() {
        let tasks = service();
        let now = Utc::now();
        for title in ["One", "Two", "Three"] {
            tasks.create(5, new_task(title), now).await.unwrap();
        }
        tasks.set_completed(5, 2, true, now).await.unwrap();

        assert_eq!(tasks.delete_completed(5).await.unwrap(), 1);
        assert_eq!(tasks.delete_completed(5).await.unwrap(), 0);
        assert_eq!(tasks.delete_user_data(5).await.unwrap(), 2);
    }
}
