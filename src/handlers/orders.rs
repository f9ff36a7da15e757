use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use super::{ApiJson, ApiResponse, ApiResult, ensure_changes, parse_enum, parse_id};
use crate::{
    error::AppResult,
    models::{CreateOrder, Order, OrderPatch, OrderStats},
    state::AppState,
    store::not_found,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/estadisticas", get(order_stats))
        .route("/tipo/:tipo", get(list_by_type))
        .route("/plataforma/:plataforma", get(list_by_platform))
        .route("/estado/:estado", get(list_by_status))
        .route(
            "/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
}

async fn list_orders(State(state): State<AppState>) -> ApiResult<Vec<Order>> {
    Ok(ApiResponse::list(state.orders.get_all().await?))
}

async fn order_stats(State(state): State<AppState>) -> ApiResult<OrderStats> {
    Ok(ApiResponse::data(state.orders.stats().await?))
}

async fn list_by_type(
    State(state): State<AppState>,
    Path(order_type): Path<String>,
) -> ApiResult<Vec<Order>> {
    let order_type = parse_enum(&order_type)?;
    Ok(ApiResponse::list(state.orders.get_by_type(order_type).await?))
}

async fn list_by_platform(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Vec<Order>> {
    let platform = parse_enum(&platform)?;
    Ok(ApiResponse::list(state.orders.get_by_platform(platform).await?))
}

async fn list_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<Vec<Order>> {
    let status = parse_enum(&status)?;
    Ok(ApiResponse::list(state.orders.get_by_status(status).await?))
}

async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Order> {
    let id = parse_id(&id)?;
    let order = state
        .orders
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Order>(id))?;
    Ok(ApiResponse::data(order))
}

async fn create_order(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateOrder>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let order = state.orders.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("order created", order),
    ))
}

async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<OrderPatch>,
) -> ApiResult<Order> {
    let id = parse_id(&id)?;
    ensure_changes(patch.has_changes())?;
    let order = state.orders.update(id, patch).await?;
    Ok(ApiResponse::with_message("order updated", order))
}

async fn delete_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Order> {
    let id = parse_id(&id)?;
    let order = state.orders.delete(id).await?;
    Ok(ApiResponse::with_message("order deleted", order))
}
