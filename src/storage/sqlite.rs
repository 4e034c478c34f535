//! SQLite-backed timer, stats and task storage

use std::{path::Path, sync::Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{StatsStore, StoreError, TaskStore, TimerStore};
use crate::state::{LocalId, Phase, Task, TaskOrder, TimerState, UserId, UserStats};

const TASK_COLUMNS: &str =
    "user_id, local_id, title, description, completed, sort_order, created_at, updated_at";

const TIMER_COLUMNS: &str = "user_id, pomodoro_duration, short_break_duration, long_break_duration,
     current_phase, remaining_time, is_running, auto_transition,
     completed_pomodoros, total_completed_pomodoros, updated_at";

/// Durable store over a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path` and apply the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened timer database at {}", path.display());
        Self::with_connection(conn)
    }

    /// In-memory database, used by tests and `--database :memory:`
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {}", e)))?;
        f(&conn)
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS pomodoro_settings (
            user_id                   INTEGER PRIMARY KEY,
            pomodoro_duration         INTEGER NOT NULL DEFAULT 25,
            short_break_duration      INTEGER NOT NULL DEFAULT 5,
            long_break_duration       INTEGER NOT NULL DEFAULT 15,
            current_phase             TEXT    NOT NULL DEFAULT 'pomodoro',
            remaining_time            INTEGER NOT NULL,
            is_running                INTEGER NOT NULL DEFAULT 0,
            auto_transition           INTEGER NOT NULL DEFAULT 0,
            completed_pomodoros       INTEGER NOT NULL DEFAULT 0,
            total_completed_pomodoros INTEGER NOT NULL DEFAULT 0,
            updated_at                TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_pomodoro_settings_running
            ON pomodoro_settings(is_running);

        CREATE TABLE IF NOT EXISTS user_stats (
            user_id          INTEGER PRIMARY KEY,
            current_streak   INTEGER NOT NULL,
            highest_streak   INTEGER NOT NULL,
            last_visit_date  TEXT    NOT NULL,
            total_visit_days INTEGER NOT NULL,
            total_hours      REAL    NOT NULL DEFAULT 0,
            last_login_time  TEXT
        );

        CREATE TABLE IF NOT EXISTS tasks (
            user_id     INTEGER NOT NULL,
            local_id    INTEGER NOT NULL,
            title       TEXT    NOT NULL,
            description TEXT    NOT NULL DEFAULT '',
            completed   INTEGER NOT NULL DEFAULT 0,
            sort_order  INTEGER NOT NULL,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL,
            PRIMARY KEY (user_id, local_id)
        );",
    )
}

fn sql_id(user_id: UserId) -> Result<i64, StoreError> {
    i64::try_from(user_id)
        .map_err(|_| StoreError::Corrupt(format!("user id {} exceeds SQLite INTEGER range", user_id)))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp '{}': {}", value, e)))
}

/// Fixed-width UTC timestamps, so text comparison in SQL orders correctly
fn task_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

struct TaskRow {
    user_id: i64,
    local_id: LocalId,
    title: String,
    description: String,
    completed: bool,
    order: i64,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            local_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            completed: row.get(4)?,
            order: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_task(self) -> Result<Task, StoreError> {
        Ok(Task {
            user_id: u64::try_from(self.user_id)
                .map_err(|_| StoreError::Corrupt(format!("negative user id {}", self.user_id)))?,
            local_id: self.local_id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            order: self.order,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

/// Column values as SQLite hands them back, before domain validation
struct TimerRow {
    user_id: i64,
    durations: [u32; 3],
    phase: String,
    remaining_time: u32,
    is_running: bool,
    auto_transition: bool,
    completed: u32,
    total_completed: u32,
    updated_at: String,
}

impl TimerRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            durations: [row.get(1)?, row.get(2)?, row.get(3)?],
            phase: row.get(4)?,
            remaining_time: row.get(5)?,
            is_running: row.get(6)?,
            auto_transition: row.get(7)?,
            completed: row.get(8)?,
            total_completed: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_state(self) -> Result<TimerState, StoreError> {
        let [pomodoro, short_break, long_break] = self.durations;
        Ok(TimerState {
            user_id: u64::try_from(self.user_id)
                .map_err(|_| StoreError::Corrupt(format!("negative user id {}", self.user_id)))?,
            pomodoro_duration: pomodoro,
            short_break_duration: short_break,
            long_break_duration: long_break,
            current_phase: self.phase.parse::<Phase>().map_err(StoreError::Corrupt)?,
            remaining_time: self.remaining_time,
            is_running: self.is_running,
            auto_transition: self.auto_transition,
            completed_pomodoros: self.completed,
            total_completed_pomodoros: self.total_completed,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

impl TimerStore for SqliteStore {
    fn load(&self, user_id: UserId) -> Result<Option<TimerState>, StoreError> {
        let id = sql_id(user_id)?;
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM pomodoro_settings WHERE user_id = ?1", TIMER_COLUMNS),
                params![id],
                TimerRow::read,
            )
            .optional()?
            .map(TimerRow::into_state)
            .transpose()
        })
    }

    fn save(&self, state: &TimerState) -> Result<(), StoreError> {
        let id = sql_id(state.user_id)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pomodoro_settings (
                    user_id, pomodoro_duration, short_break_duration, long_break_duration,
                    current_phase, remaining_time, is_running, auto_transition,
                    completed_pomodoros, total_completed_pomodoros, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(user_id) DO UPDATE SET
                    pomodoro_duration = excluded.pomodoro_duration,
                    short_break_duration = excluded.short_break_duration,
                    long_break_duration = excluded.long_break_duration,
                    current_phase = excluded.current_phase,
                    remaining_time = excluded.remaining_time,
                    is_running = excluded.is_running,
                    auto_transition = excluded.auto_transition,
                    completed_pomodoros = excluded.completed_pomodoros,
                    total_completed_pomodoros = excluded.total_completed_pomodoros,
                    updated_at = excluded.updated_at",
                params![
                    id,
                    state.pomodoro_duration,
                    state.short_break_duration,
                    state.long_break_duration,
                    state.current_phase.as_str(),
                    state.remaining_time,
                    state.is_running,
                    state.auto_transition,
                    state.completed_pomodoros,
                    state.total_completed_pomodoros,
                    state.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn delete(&self, user_id: UserId) -> Result<bool, StoreError> {
        let id = sql_id(user_id)?;
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM pomodoro_settings WHERE user_id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }

    fn running(&self) -> Result<Vec<TimerState>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM pomodoro_settings WHERE is_running = 1 ORDER BY user_id",
                TIMER_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], TimerRow::read)?
                .collect::<Result<Vec<_>, _>>()?;
            debug!("Found {} running timer records", rows.len());
            rows.into_iter().map(TimerRow::into_state).collect()
        })
    }
}

impl StatsStore for SqliteStore {
    fn load_stats(&self, user_id: UserId) -> Result<Option<UserStats>, StoreError> {
        let id = sql_id(user_id)?;
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT current_streak, highest_streak, last_visit_date, total_visit_days,
                            total_hours, last_login_time
                     FROM user_stats WHERE user_id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, u32>(0)?,
                            row.get::<_, u32>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, u32>(3)?,
                            row.get::<_, f64>(4)?,
                            row.get::<_, Option<String>>(5)?,
                        ))
                    },
                )
                .optional()?;

            let Some((current, highest, last_visit, visits, hours, last_login)) = row else {
                return Ok(None);
            };
            Ok(Some(UserStats {
                user_id,
                current_streak: current,
                highest_streak: highest,
                last_visit_date: parse_time(&last_visit)?,
                total_visit_days: visits,
                total_hours: hours,
                last_login_time: last_login.as_deref().map(parse_time).transpose()?,
            }))
        })
    }

    fn save_stats(&self, stats: &UserStats) -> Result<(), StoreError> {
        let id = sql_id(stats.user_id)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_stats (
                    user_id, current_streak, highest_streak, last_visit_date,
                    total_visit_days, total_hours, last_login_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id) DO UPDATE SET
                    current_streak = excluded.current_streak,
                    highest_streak = excluded.highest_streak,
                    last_visit_date = excluded.last_visit_date,
                    total_visit_days = excluded.total_visit_days,
                    total_hours = excluded.total_hours,
                    last_login_time = excluded.last_login_time",
                params![
                    id,
                    stats.current_streak,
                    stats.highest_streak,
                    stats.last_visit_date.to_rfc3339(),
                    stats.total_visit_days,
                    stats.total_hours,
                    stats.last_login_time.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
    }

    fn delete_stats(&self, user_id: UserId) -> Result<bool, StoreError> {
        let id = sql_id(user_id)?;
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM user_stats WHERE user_id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }
}

impl TaskStore for SqliteStore {
    fn list_tasks(
        &self,
        user_id: UserId,
        hide_completed: bool,
        created_within: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Task>, StoreError> {
        let id = sql_id(user_id)?;
        let (from, until) = match created_within {
            Some((start, end)) => (Some(task_time(start)), Some(task_time(end))),
            None => (None, None),
        };
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks
                 WHERE user_id = ?1
                   AND (?2 = 0 OR completed = 0)
                   AND (?3 IS NULL OR created_at >= ?3)
                   AND (?4 IS NULL OR created_at < ?4)
                 ORDER BY sort_order, local_id",
                TASK_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![id, hide_completed, from, until], TaskRow::read)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(TaskRow::into_task).collect()
        })
    }

    fn create_task(
        &self,
        user_id: UserId,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError> {
        let id = sql_id(user_id)?;
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let (last_local, last_order): (i64, i64) = tx.query_row(
                "SELECT COALESCE(MAX(local_id), 0), COALESCE(MAX(sort_order), 0)
                 FROM tasks WHERE user_id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let local_id = LocalId::try_from(last_local + 1)
                .map_err(|_| StoreError::Corrupt(format!("local id overflow for user {}", user_id)))?;

            let task = Task {
                user_id,
                local_id,
                title: title.to_string(),
                description: description.to_string(),
                completed: false,
                order: last_order + 1,
                created_at: now,
                updated_at: now,
            };
            tx.execute(
                &format!("INSERT INTO tasks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", TASK_COLUMNS),
                params![
                    id,
                    task.local_id,
                    task.title,
                    task.description,
                    task.completed,
                    task.order,
                    task_time(task.created_at),
                    task_time(task.updated_at),
                ],
            )?;
            tx.commit()?;
            Ok(task)
        })
    }

    fn load_task(&self, user_id: UserId, local_id: LocalId) -> Result<Option<Task>, StoreError> {
        let id = sql_id(user_id)?;
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM tasks WHERE user_id = ?1 AND local_id = ?2", TASK_COLUMNS),
                params![id, local_id],
                TaskRow::read,
            )
            .optional()?
            .map(TaskRow::into_task)
            .transpose()
        })
    }

    fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        let id = sql_id(task.user_id)?;
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET title = ?3, description = ?4, completed = ?5, sort_order = ?6,
                                  updated_at = ?7
                 WHERE user_id = ?1 AND local_id = ?2",
                params![
                    id,
                    task.local_id,
                    task.title,
                    task.description,
                    task.completed,
                    task.order,
                    task_time(task.updated_at),
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::Corrupt(format!(
                    "task {} of user {} vanished during update",
                    task.local_id, task.user_id
                )));
            }
            Ok(())
        })
    }

    fn reorder_tasks(
        &self,
        user_id: UserId,
        orders: &[TaskOrder],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let id = sql_id(user_id)?;
        let stamp = task_time(now);
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut matched = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE tasks SET sort_order = ?3, updated_at = ?4
                     WHERE user_id = ?1 AND local_id = ?2",
                )?;
                for item in orders {
                    matched += stmt.execute(params![id, item.local_id, item.order, stamp])?;
                }
            }
            tx.commit()?;
            Ok(matched)
        })
    }

    fn delete_task(&self, user_id: UserId, local_id: LocalId) -> Result<bool, StoreError> {
        let id = sql_id(user_id)?;
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM tasks WHERE user_id = ?1 AND local_id = ?2",
                params![id, local_id],
            )?;
            Ok(removed > 0)
        })
    }

    fn delete_tasks(&self, user_id: UserId, completed_only: bool) -> Result<usize, StoreError> {
        let id = sql_id(user_id)?;
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM tasks WHERE user_id = ?1 AND (?2 = 0 OR completed = 1)",
                params![id, completed_only],
            )?;
            debug!("Deleted {} tasks for user {}", removed, user_id);
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timer_records_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timers.db");

        let mut state = TimerState::new(3);
        state.current_phase = Phase::LongBreak;
        state.remaining_time = 77;
        state.is_running = true;
        state.total_completed_pomodoros = 9;
        SqliteStore::open(&path).unwrap().save(&state).unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        let loaded = reopened.load(3).unwrap().unwrap();
        assert_eq!(loaded.current_phase, Phase::LongBreak);
        assert_eq!(loaded.remaining_time, 77);
        assert!(loaded.is_running);
        assert_eq!(loaded.total_completed_pomodoros, 9);
        assert_eq!(loaded.updated_at.timestamp(), state.updated_at.timestamp());
    }

    #[test]
    fn save_overwrites_and_delete_removes() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load(1).unwrap().is_none());

        let mut state = TimerState::new(1);
        store.save(&state).unwrap();
        state.remaining_time = 10;
        store.save(&state).unwrap();
        assert_eq!(store.load(1).unwrap().unwrap().remaining_time, 10);

        assert!(store.delete(1).unwrap());
        assert!(!store.delete(1).unwrap());
        assert!(store.load(1).unwrap().is_none());
    }

    #[test]
    fn running_lists_only_running_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        for id in 1..=4 {
            let mut state = TimerState::new(id);
            state.is_running = id % 2 == 0;
            store.save(&state).unwrap();
        }
        let ids: Vec<_> = store.running().unwrap().iter().map(|s| s.user_id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn unknown_phase_is_reported_as_corrupt() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&TimerState::new(5)).unwrap();
        store
            .with_conn(|conn| {
                conn.execute("UPDATE pomodoro_settings SET current_phase = 'nap'", [])?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(store.load(5), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn stats_round_trip_with_optional_login() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut stats = UserStats::new(8, now);
        stats.total_hours = 1.25;
        store.save_stats(&stats).unwrap();
        assert_eq!(store.load_stats(8).unwrap(), Some(stats.clone()));

        stats.start_session(now);
        store.save_stats(&stats).unwrap();
        assert_eq!(store.load_stats(8).unwrap().unwrap().last_login_time, Some(now));

        assert!(store.delete_stats(8).unwrap());
        assert!(store.load_stats(8).unwrap().is_none());
    }

    fn task_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn created_tasks_get_increasing_ids_and_positions() {
        let store = task_store();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let first = store.create_task(1, "Plan sprint", "", now).unwrap();
        let second = store.create_task(1, "Review PR", "two files", now).unwrap();
        let other_user = store.create_task(2, "Groceries", "", now).unwrap();

        assert_eq!((first.local_id, first.order), (1, 1));
        assert_eq!((second.local_id, second.order), (2, 2));
        assert_eq!(other_user.local_id, 1);
        assert_eq!(store.load_task(1, 2).unwrap(), Some(second));
    }

    #[test]
    fn listing_honours_filters_and_order() {
        let store = task_store();
        let yesterday = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap();
        let today = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        store.create_task(3, "Old task", "", yesterday).unwrap();
        store.create_task(3, "New task", "", today).unwrap();
        let mut done = store.create_task(3, "Done task", "", today).unwrap();
        done.completed = true;
        store.save_task(&done).unwrap();

        store
            .reorder_tasks(
                3,
                &[
                    TaskOrder { local_id: 1, order: 30 },
                    TaskOrder { local_id: 2, order: 10 },
                    TaskOrder { local_id: 3, order: 20 },
                ],
                today,
            )
            .unwrap();

        let titles = |tasks: Vec<Task>| tasks.into_iter().map(|t| t.title).collect::<Vec<_>>();
        assert_eq!(
            titles(store.list_tasks(3, false, None).unwrap()),
            vec!["New task", "Done task", "Old task"]
        );
        assert_eq!(
            titles(store.list_tasks(3, true, None).unwrap()),
            vec!["New task", "Old task"]
        );

        let day_start = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let day_end = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap();
        assert_eq!(
            titles(store.list_tasks(3, true, Some((day_start, day_end))).unwrap()),
            vec!["New task"]
        );
    }

    #[test]
    fn bulk_deletes_respect_completion_and_owner() {
        let store = task_store();
        let now = Utc::now();
        let mut done = store.create_task(4, "Done", "", now).unwrap();
        done.completed = true;
        store.save_task(&done).unwrap();
        store.create_task(4, "Open", "", now).unwrap();
        store.create_task(5, "Someone else", "", now).unwrap();

        assert_eq!(store.delete_tasks(4, true).unwrap(), 1);
        assert_eq!(store.delete_tasks(4, true).unwrap(), 0);
        assert_eq!(store.delete_tasks(4, false).unwrap(), 1);
        assert_eq!(store.list_tasks(5, false, None).unwrap().len(), 1);

        assert!(store.delete_task(5, 1).unwrap());
        assert!(!store.delete_task(5, 1).unwrap());
    }
}
