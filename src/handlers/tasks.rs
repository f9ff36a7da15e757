use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};

use super::{ApiJson, ApiQuery, ApiResponse, ApiResult, ensure_changes, parse_enum, parse_id};
use crate::{
    error::AppResult,
    models::{CreateTask, Task, TaskFilter, TaskFilterQuery, TaskPatch, TaskTransition},
    state::AppState,
    store::not_found,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/area/:area", get(list_by_area))
        .route("/estado/:estado", get(list_by_status))
        .route("/empleado/:id", get(list_by_employee))
        .route(
            "/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/:id/estado", patch(transition_task))
}

/// Without criteria this is the full list.
async fn list_tasks(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TaskFilterQuery>,
) -> ApiResult<Vec<Task>> {
    let criteria = TaskFilter::try_from(query)?;
    Ok(ApiResponse::list(state.tasks.filter(&criteria).await?))
}

async fn list_by_area(
    State(state): State<AppState>,
    Path(area): Path<String>,
) -> ApiResult<Vec<Task>> {
    let area = parse_enum(&area)?;
    Ok(ApiResponse::list(state.tasks.get_by_area(area).await?))
}

async fn list_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<Vec<Task>> {
    let status = parse_enum(&status)?;
    Ok(ApiResponse::list(state.tasks.get_by_status(status).await?))
}

async fn list_by_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Task>> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::list(state.tasks.get_by_employee(id).await?))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Task> {
    let id = parse_id(&id)?;
    let task = state
        .tasks
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Task>(id))?;
    Ok(ApiResponse::data(task))
}

async fn create_task(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateTask>,
) -> AppResult<(StatusCode, Json<ApiResponse<Task>>)> {
    let task = state.tasks.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("task created", task),
    ))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Task> {
    let id = parse_id(&id)?;
    ensure_changes(patch.has_changes())?;
    let task = state.tasks.update(id, patch).await?;
    Ok(ApiResponse::with_message("task updated", task))
}

async fn transition_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TaskTransition>,
) -> ApiResult<Task> {
    let id = parse_id(&id)?;
    let task = state.tasks.transition(id, body.status).await?;
    Ok(ApiResponse::with_message("task status updated", task))
}

async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Task> {
    let id = parse_id(&id)?;
    let task = state.tasks.delete(id).await?;
    Ok(ApiResponse::with_message("task deleted", task))
}
