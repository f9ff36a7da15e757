use axum::{Router, extract::State, routing::get};

use super::{PageResult, escape, layout, table};
use crate::state::AppState;

/// Read-only; clients are managed through the JSON API.
pub fn routes() -> Router<AppState> {
    Router::new().route("/clientes", get(list_page))
}

async fn list_page(State(state): State<AppState>) -> PageResult {
    let clients = state.clients.get_all().await?;
    let rows: Vec<String> = clients
        .iter()
        .map(|client| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                client.id,
                escape(&client.display_name()),
                escape(&client.email),
                escape(client.phone.as_deref().unwrap_or("")),
            )
        })
        .collect();
    let body = format!(
        "<h1>Clientes</h1>\n{}",
        table(&["Id", "Nombre", "Email", "Telefono"], &rows, "No hay clientes registrados.")
    );
    Ok(layout("Clientes", "clientes", &body))
}
