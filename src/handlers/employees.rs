use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use super::{
    ApiJson, ApiQuery, ApiResponse, ApiResult, EmailAvailability, EmailCheckQuery,
    ensure_changes, parse_enum, parse_id,
};
use crate::{
    error::AppResult,
    models::{CreateEmployee, Employee, EmployeePatch, EmployeeStats},
    store::not_found,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/activos", get(list_active))
        .route("/estadisticas", get(employee_stats))
        .route("/validar-email", get(check_email))
        .route("/rol/:rol", get(list_by_role))
        .route("/area/:area", get(list_by_area))
        .route(
            "/:id",
            get(get_employee)
                .put(update_employee)
                .delete(delete_employee),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(rename = "permanente", default)]
    pub permanent: bool,
}

async fn list_employees(State(state): State<AppState>) -> ApiResult<Vec<Employee>> {
    Ok(ApiResponse::list(state.employees.get_all().await?))
}

async fn list_active(State(state): State<AppState>) -> ApiResult<Vec<Employee>> {
    Ok(ApiResponse::list(state.employees.get_active().await?))
}

async fn employee_stats(State(state): State<AppState>) -> ApiResult<EmployeeStats> {
    Ok(ApiResponse::data(state.employees.stats().await?))
}

async fn check_email(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmailCheckQuery>,
) -> ApiResult<EmailAvailability> {
    let (email, exclude) = query.parts()?;
    let available = state.employees.is_email_available(&email, exclude).await?;
    Ok(ApiResponse::data(EmailAvailability { email, available }))
}

async fn list_by_role(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> ApiResult<Vec<Employee>> {
    let role = parse_enum(&role)?;
    Ok(ApiResponse::list(state.employees.get_by_role(role).await?))
}

async fn list_by_area(
    State(state): State<AppState>,
    Path(area): Path<String>,
) -> ApiResult<Vec<Employee>> {
    let area = parse_enum(&area)?;
    Ok(ApiResponse::list(state.employees.get_by_area(area).await?))
}

async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Employee> {
    let id = parse_id(&id)?;
    let employee = state
        .employees
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Employee>(id))?;
    Ok(ApiResponse::data(employee))
}

async fn create_employee(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateEmployee>,
) -> AppResult<(StatusCode, Json<ApiResponse<Employee>>)> {
    let employee = state.employees.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("employee created", employee),
    ))
}

async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<EmployeePatch>,
) -> ApiResult<Employee> {
    let id = parse_id(&id)?;
    ensure_changes(patch.has_changes())?;
    let employee = state.employees.update(id, patch).await?;
    Ok(ApiResponse::with_message("employee updated", employee))
}

/// Deactivates by default; `?permanente=true` removes the record.
async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> ApiResult<Employee> {
    let id = parse_id(&id)?;
    if query.permanent {
        let employee = state.employees.remove(id).await?;
        Ok(ApiResponse::with_message("employee removed", employee))
    } else {
        let employee = state.employees.deactivate(id).await?;
        Ok(ApiResponse::with_message("employee deactivated", employee))
    }
}
