use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};

use super::{ApiJson, ApiResponse, ApiResult, ensure_changes, parse_enum, parse_id};
use crate::{
    error::AppResult,
    models::{CreateSupply, StockDiscount, StockUpdate, Supply, SupplyAlert, SupplyPatch},
    state::AppState,
    store::not_found,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_supplies).post(create_supply))
        .route("/bajo-stock", get(list_low_stock))
        .route("/alertas", get(list_alerts))
        .route("/categoria/:categoria", get(list_by_category))
        .route(
            "/:id",
            get(get_supply).put(update_supply).delete(delete_supply),
        )
        .route("/:id/stock", patch(set_stock))
        .route("/:id/descontar", post(discount_stock))
}

async fn list_supplies(State(state): State<AppState>) -> ApiResult<Vec<Supply>> {
    Ok(ApiResponse::list(state.supplies.get_all().await?))
}

async fn list_low_stock(State(state): State<AppState>) -> ApiResult<Vec<Supply>> {
    Ok(ApiResponse::list(state.supplies.get_low_stock().await?))
}

async fn list_alerts(State(state): State<AppState>) -> ApiResult<Vec<SupplyAlert>> {
    Ok(ApiResponse::list(state.supplies.alerts().await?))
}

async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Vec<Supply>> {
    let category = parse_enum(&category)?;
    Ok(ApiResponse::list(
        state.supplies.get_by_category(category).await?,
    ))
}

async fn get_supply(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Supply> {
    let id = parse_id(&id)?;
    let supply = state
        .supplies
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Supply>(id))?;
    Ok(ApiResponse::data(supply))
}

async fn create_supply(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateSupply>,
) -> AppResult<(StatusCode, Json<ApiResponse<Supply>>)> {
    let supply = state.supplies.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("supply created", supply),
    ))
}

async fn update_supply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<SupplyPatch>,
) -> ApiResult<Supply> {
    let id = parse_id(&id)?;
    ensure_changes(patch.has_changes())?;
    let supply = state.supplies.update(id, patch).await?;
    Ok(ApiResponse::with_message("supply updated", supply))
}

async fn set_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StockUpdate>,
) -> ApiResult<Supply> {
    let id = parse_id(&id)?;
    let supply = state.supplies.set_stock(id, body.stock).await?;
    Ok(ApiResponse::with_message("stock updated", supply))
}

async fn discount_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StockDiscount>,
) -> ApiResult<Supply> {
    let id = parse_id(&id)?;
    let quantity = body.quantity()?;
    let supply = state.supplies.discount_stock(id, quantity).await?;
    Ok(ApiResponse::with_message("stock discounted", supply))
}

async fn delete_supply(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Supply> {
    let id = parse_id(&id)?;
    let supply = state.supplies.delete(id).await?;
    Ok(ApiResponse::with_message("supply deleted", supply))
}
