//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{extract::State, response::Json};
use chrono::Utc;
use tracing::info;

use super::{
    auth::CurrentUser,
    extract::{JsonBody, OptionalJsonBody, PathParam, QueryParams},
    responses::{
        Ack, ApiError, AutoModeRequest, AutoModeResponse, CompleteRequest, CountResponse,
        DataResponse, DeletedResponse, DescriptionRequest, HealthResponse, MessageResponse,
        PhaseRequest, PhaseResponse, SessionEndResponse, SettingsResponse, StartRequest,
        TitleRequest,
    },
};
use crate::{
    services::{Countdown, StatsSummary},
    state::{AppState, LocalId, NewTask, Task, TaskFilter, TaskOrder, TimerSettings, TimerStatus},
};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Handle GET /pomodoro-settings
pub async fn get_settings_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<SettingsResponse> {
    let settings = state.timer.get_settings(user_id).await?;
    Ok(Json(SettingsResponse::from(&settings)))
}

/// Handle POST /pomodoro-update-settings
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(body): JsonBody<TimerSettings>,
) -> ApiResult<Ack<SettingsResponse>> {
    let settings = state.timer.update_settings(user_id, body).await?;
    Ok(Json(Ack::new(
        "Settings updated successfully",
        SettingsResponse::from(&settings),
    )))
}

/// Handle GET /pomodoro-timer-status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<TimerStatus> {
    Ok(Json(state.timer.get_status(user_id).await?))
}

/// Handle POST /pomodoro-start - the body (and its phase) is optional
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    OptionalJsonBody(body): OptionalJsonBody<StartRequest>,
) -> ApiResult<Ack<Countdown>> {
    let requested = body.and_then(|req| req.phase);
    let countdown = state.timer.start(user_id, requested).await?;
    Ok(Json(Ack::new("Timer started successfully", countdown)))
}

/// Handle POST /pomodoro-stop
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Ack<Countdown>> {
    let countdown = state.timer.stop(user_id).await?;
    Ok(Json(Ack::new("Timer stopped successfully", countdown)))
}

/// Handle POST /pomodoro-phase
pub async fn change_phase_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(body): JsonBody<PhaseRequest>,
) -> ApiResult<Ack<PhaseResponse>> {
    let current_phase = state.timer.change_phase(user_id, body.phase).await?;
    Ok(Json(Ack::new("Phase changed", PhaseResponse { current_phase })))
}

/// Handle POST /pomodoro-auto-mode
pub async fn auto_mode_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(body): JsonBody<AutoModeRequest>,
) -> ApiResult<Ack<AutoModeResponse>> {
    let auto_transition = state
        .timer
        .set_auto_transition(user_id, body.auto_transition)
        .await?;
    Ok(Json(Ack::new(
        "Auto transition updated successfully",
        AutoModeResponse { auto_transition },
    )))
}

/// Handle POST /pomodoro-reset
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Ack<TimerStatus>> {
    let status = state.timer.reset_completed(user_id).await?;
    Ok(Json(Ack::new("Completed pomodoros reset", status)))
}

/// Handle GET /stats
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<StatsSummary> {
    Ok(Json(state.stats.get_stats(user_id, Utc::now()).await?))
}

/// Handle POST /stats/update-streak
pub async fn update_streak_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<StatsSummary> {
    Ok(Json(state.stats.record_visit(user_id, Utc::now()).await?))
}

/// Handle POST /start-session
pub async fn session_start_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<MessageResponse> {
    state.stats.start_session(user_id, Utc::now()).await?;
    Ok(Json(MessageResponse::new("Session started")))
}

/// Handle POST /end-session
pub async fn session_end_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Ack<SessionEndResponse>> {
    let total_hours = state.stats.end_session(user_id, Utc::now()).await?;
    Ok(Json(Ack::new("Session ended", SessionEndResponse { total_hours })))
}

/// Handle GET /tasks?hideCompleted=&showTodayOnly=
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    QueryParams(filter): QueryParams<TaskFilter>,
) -> ApiResult<DataResponse<Vec<Task>>> {
    let data = state.tasks.list(user_id, filter, Utc::now()).await?;
    Ok(Json(DataResponse { data }))
}

/// Handle POST /tasks-create
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(body): JsonBody<NewTask>,
) -> ApiResult<DataResponse<Task>> {
    let data = state.tasks.create(user_id, body, Utc::now()).await?;
    Ok(Json(DataResponse { data }))
}

/// Handle PUT /task/update-title/:id
pub async fn update_task_title_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    PathParam(local_id): PathParam<LocalId>,
    JsonBody(body): JsonBody<TitleRequest>,
) -> ApiResult<DataResponse<Task>> {
    let data = state
        .tasks
        .update_title(user_id, local_id, body.title, Utc::now())
        .await?;
    Ok(Json(DataResponse { data }))
}

/// Handle PUT /task/update-description/:id
pub async fn update_task_description_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    PathParam(local_id): PathParam<LocalId>,
    JsonBody(body): JsonBody<DescriptionRequest>,
) -> ApiResult<DataResponse<Task>> {
    let data = state
        .tasks
        .update_description(user_id, local_id, body.description, Utc::now())
        .await?;
    Ok(Json(DataResponse { data }))
}

/// Handle PUT /task/complete/:id
pub async fn complete_task_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    PathParam(local_id): PathParam<LocalId>,
    JsonBody(body): JsonBody<CompleteRequest>,
) -> ApiResult<DataResponse<Task>> {
    let data = state
        .tasks
        .set_completed(user_id, local_id, body.completed, Utc::now())
        .await?;
    Ok(Json(DataResponse { data }))
}

/// Handle PUT /tasks/order
pub async fn reorder_tasks_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(body): JsonBody<Vec<TaskOrder>>,
) -> ApiResult<CountResponse> {
    let updated = state.tasks.reorder(user_id, &body, Utc::now()).await?;
    Ok(Json(CountResponse::new("Tasks order updated successfully", updated)))
}

/// Handle DELETE /task/delete/:id
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    PathParam(local_id): PathParam<LocalId>,
) -> ApiResult<MessageResponse> {
    state.tasks.delete(user_id, local_id).await?;
    Ok(Json(MessageResponse::new("Task successfully deleted")))
}

/// Handle DELETE /task/delete-all
pub async fn delete_all_tasks_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<CountResponse> {
    let removed = state.tasks.delete_all(user_id).await?;
    Ok(Json(CountResponse::new("All tasks successfully deleted", removed)))
}

/// Handle DELETE /task/delete-completed
pub async fn delete_completed_tasks_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<CountResponse> {
    let removed = state.tasks.delete_completed(user_id).await?;
    let message = if removed == 0 {
        "No completed tasks to delete"
    } else {
        "All completed tasks successfully deleted"
    };
    Ok(Json(CountResponse::new(message, removed)))
}

/// Handle DELETE /user-data - cascade removal of everything the user owns
pub async fn delete_user_data_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Ack<DeletedResponse>> {
    let timer_deleted = state.timer.delete_user_data(user_id).await?;
    let stats_deleted = state.stats.delete_user_data(user_id).await?;
    let tasks_deleted = state.tasks.delete_user_data(user_id).await?;
    info!(
        "Deleted data for user {} (timer={}, stats={}, tasks={})",
        user_id, timer_deleted, stats_deleted, tasks_deleted
    );
    Ok(Json(Ack::new(
        "User data deleted",
        DeletedResponse {
            timer_deleted,
            stats_deleted,
            tasks_deleted,
        },
    )))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(
        state.address(),
        state.get_uptime(),
        state.timer.live_drivers(),
    ))
}
