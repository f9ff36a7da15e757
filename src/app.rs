use axum::{
    Router,
    extract::State,
    http::{Uri, header},
    middleware::map_response_with_state,
    response::IntoResponse,
    response::Response,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::{AppError, INTERNAL_ERROR_MESSAGE, InternalDetail, error_response},
    handlers,
    state::AppState,
    views,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", handlers::routes())
        .merge(handlers::health_routes())
        .merge(views::routes())
        .fallback(fallback)
        .layer(map_response_with_state(state.clone(), expose_internal_detail))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unknown `/api` paths answer with the JSON envelope; everything else gets a page.
async fn fallback(uri: Uri) -> Response {
    let path = uri.path();
    if path == "/api" || path.starts_with("/api/") {
        AppError::not_found(format!("route {path} not found")).into_response()
    } else {
        views::not_found_page(path)
    }
}

/// Re-renders storage failures with their detail when the state allows it.
async fn expose_internal_detail(State(state): State<AppState>, response: Response) -> Response {
    if !state.expose_internal_errors {
        return response;
    }
    let Some(InternalDetail(detail)) = response.extensions().get::<InternalDetail>().cloned()
    else {
        return response;
    };

    let status = response.status();
    let is_page = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));
    if is_page {
        views::error_page(status, INTERNAL_ERROR_MESSAGE, Some(&detail))
    } else {
        error_response(status, INTERNAL_ERROR_MESSAGE.to_string(), Some(detail))
    }
}
