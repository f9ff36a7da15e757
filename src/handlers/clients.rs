use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use super::{
    ApiJson, ApiQuery, ApiResponse, ApiResult, EmailAvailability, EmailCheckQuery,
    ensure_changes, parse_id,
};
use crate::{
    error::AppResult,
    models::{Client, ClientPatch, CreateClient},
    state::AppState,
    store::not_found,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/buscar", get(search_clients))
        .route("/validar-email", get(check_email))
        .route(
            "/:id",
            get(get_client).put(update_client).delete(delete_client),
        )
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(rename = "nombre")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido")]
    pub last_name: Option<String>,
}

async fn list_clients(State(state): State<AppState>) -> ApiResult<Vec<Client>> {
    Ok(ApiResponse::list(state.clients.get_all().await?))
}

async fn search_clients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<Client>> {
    let found = state
        .clients
        .search(query.first_name.as_deref(), query.last_name.as_deref())
        .await?;
    Ok(ApiResponse::list(found))
}

async fn check_email(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmailCheckQuery>,
) -> ApiResult<EmailAvailability> {
    let (email, exclude) = query.parts()?;
    let available = state.clients.is_email_available(&email, exclude).await?;
    Ok(ApiResponse::data(EmailAvailability { email, available }))
}

async fn get_client(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Client> {
    let id = parse_id(&id)?;
    let client = state
        .clients
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Client>(id))?;
    Ok(ApiResponse::data(client))
}

async fn create_client(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateClient>,
) -> AppResult<(StatusCode, Json<ApiResponse<Client>>)> {
    let client = state.clients.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("client created", client),
    ))
}

async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ClientPatch>,
) -> ApiResult<Client> {
    let id = parse_id(&id)?;
    ensure_changes(patch.has_changes())?;
    let client = state.clients.update(id, patch).await?;
    Ok(ApiResponse::with_message("client updated", client))
}

async fn delete_client(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Client> {
    let id = parse_id(&id)?;
    let client = state.clients.delete(id).await?;
    Ok(ApiResponse::with_message("client deleted", client))
}
