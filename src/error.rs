//! Error types for the timer engine, stats and task services

use thiserror::Error;

use crate::{
    state::{LocalId, UserId},
    storage::StoreError,
};

/// Failures of timer operations
#[derive(Error, Debug)]
pub enum TimerError {
    #[error("timer settings not found for user {0}")]
    NotFound(UserId),

    #[error("timer already running")]
    AlreadyRunning,

    #[error("timer is not running")]
    NotRunning,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Failures of usage stats operations
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("stats not found for user {0}")]
    NotFound(UserId),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Failures of task list operations
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(LocalId),

    #[error("{0}")]
    Invalid(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T, E = TimerError> = std::result::Result<T, E>;
