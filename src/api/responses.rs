//! API request and response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    error::{StatsError, TaskError, TimerError},
    state::{Phase, TimerState},
};

/// Body of POST /pomodoro-start
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartRequest {
    pub phase: Option<Phase>,
}

/// Body of POST /pomodoro-phase
#[derive(Debug, Clone, Deserialize)]
pub struct PhaseRequest {
    pub phase: Phase,
}

/// Body of POST /pomodoro-auto-mode
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoModeRequest {
    pub auto_transition: bool,
}

/// Settings view of a timer record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub pomodoro: u32,
    pub short_break: u32,
    pub long_break: u32,
    pub remaining_time: u32,
    pub is_running: bool,
    pub current_phase: Phase,
    pub auto_transition: bool,
}

impl From<&TimerState> for SettingsResponse {
    fn from(state: &TimerState) -> Self {
        Self {
            pomodoro: state.pomodoro_duration,
            short_break: state.short_break_duration,
            long_break: state.long_break_duration,
            remaining_time: state.remaining_time,
            is_running: state.is_running,
            current_phase: state.current_phase,
            auto_transition: state.auto_transition,
        }
    }
}

/// Success acknowledgement carrying operation-specific fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack<T> {
    pub success: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Ack<T> {
    pub fn new(message: &str, data: T) -> Self {
        Self {
            success: message.to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseResponse {
    pub current_phase: Phase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoModeResponse {
    pub auto_transition: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndResponse {
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub timer_deleted: bool,
    pub stats_deleted: bool,
    pub tasks_deleted: usize,
}

/// Body of PUT /task/update-title/:id
#[derive(Debug, Clone, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

/// Body of PUT /task/update-description/:id
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionRequest {
    pub description: String,
}

/// Body of PUT /task/complete/:id
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub completed: bool,
}

/// Task payloads are wrapped as `{"data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub message: String,
    pub count: usize,
}

impl CountResponse {
    pub fn new(message: &str, count: usize) -> Self {
        Self {
            message: message.to_string(),
            count,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub address: String,
    pub uptime: String,
    pub live_timers: usize,
}

impl HealthResponse {
    pub fn ok(address: String, uptime: String, live_timers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            address,
            uptime,
            live_timers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Everything a handler can fail with
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    /// Malformed path, query or body
    BadRequest(String),
    Timer(TimerError),
    Stats(StatsError),
    Task(TaskError),
}

impl From<TimerError> for ApiError {
    fn from(e: TimerError) -> Self {
        ApiError::Timer(e)
    }
}

impl From<StatsError> for ApiError {
    fn from(e: StatsError) -> Self {
        ApiError::Stats(e)
    }
}

impl From<TaskError> for ApiError {
    fn from(e: TaskError) -> Self {
        ApiError::Task(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Timer(TimerError::NotFound(_))
            | ApiError::Stats(StatsError::NotFound(_))
            | ApiError::Task(TaskError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Timer(
                TimerError::AlreadyRunning | TimerError::NotRunning | TimerError::InvalidSettings(_),
            )
            | ApiError::Task(TaskError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Timer(TimerError::Store(_))
            | ApiError::Stats(StatsError::Store(_))
            | ApiError::Task(TaskError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Timer(e) => e.to_string(),
            ApiError::Stats(e) => e.to_string(),
            ApiError::Task(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.message());
            "internal storage error".to_string()
        } else {
            self.message()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
