//! Per-user task list entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timer_state::UserId;

/// Per-user task number, starting at 1
pub type LocalId = u32;

pub const TITLE_LEN: (usize, usize) = (2, 95);
pub const DESCRIPTION_LEN: (usize, usize) = (2, 870);

/// One task on a user's list.
///
/// Tasks are addressed by `(user_id, local_id)`; `local_id` is never reused
/// while the user has tasks with higher numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub user_id: UserId,
    pub local_id: LocalId,
    pub title: String,
    pub description: String,
    pub completed: bool,
    /// Position on the list, ascending
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a task
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// One `(localId, order)` pair of a reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOrder {
    pub local_id: LocalId,
    pub order: i64,
}

/// Listing filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    #[serde(default)]
    pub hide_completed: bool,
    /// Only tasks created on the current UTC day
    #[serde(default)]
    pub show_today_only: bool,
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(format!("{} must be between {} and {} characters", field, min, max));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    check_len("title", title, TITLE_LEN)
}

/// An empty description is allowed; anything else must fit the bounds
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.is_empty() {
        return Ok(());
    }
    check_len("description", description, DESCRIPTION_LEN)
}
