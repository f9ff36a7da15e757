use axum::{
    Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;
use std::fmt::Write as _;

use super::{
    HtmlForm, PageResult, RedirectResult, blank_to_none, delete_button, escape, form, layout,
    optional_enum, optional_number, optional_string, parse_path_id, required_enum, select, table, text_input,
    textarea,
};
use crate::{
    error::{AppError, AppResult},
    models::{Client, CreateOrder, Order, OrderItem, OrderPatch, OrderStatus, OrderType, Platform},
    state::AppState,
    store::not_found,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pedidos", get(list_page))
        .route("/pedidos/nuevo", get(new_page).post(create))
        .route("/pedidos/editar/:id", get(edit_page).post(update))
        .route("/pedidos/eliminar/:id", post(delete))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    #[serde(rename = "numeroOrden")]
    order_number: String,
    #[serde(rename = "clienteId")]
    client_id: String,
    #[serde(rename = "cliente")]
    client_name: String,
    /// One `producto,cantidad,precio` per line.
    items: String,
    total: String,
    #[serde(rename = "tipo")]
    order_type: String,
    #[serde(rename = "plataforma")]
    platform: String,
    #[serde(rename = "estado")]
    status: String,
    #[serde(rename = "tiempoEstimado")]
    estimated_minutes: String,
    #[serde(rename = "observaciones")]
    notes: String,
}

/// Parses the items textarea. The product name may itself contain commas; quantity
/// and price are the last two fields of each line.
pub(crate) fn parse_items(raw: &str) -> AppResult<Vec<OrderItem>> {
    let mut items = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = || {
            AppError::validation(format!(
                "items line {}: expected `producto,cantidad,precio`, got `{line}`",
                index + 1
            ))
        };
        let mut parts = line.rsplitn(3, ',');
        let (Some(price), Some(quantity), Some(product)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        items.push(OrderItem {
            product: product.trim().to_string(),
            quantity: quantity.trim().parse().map_err(|_| malformed())?,
            unit_price: price.trim().parse().map_err(|_| malformed())?,
        });
    }
    Ok(items)
}

fn items_text(items: &[OrderItem]) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "{},{},{}", item.product, item.quantity, item.unit_price);
    }
    out
}

impl OrderForm {
    fn into_create(self) -> AppResult<CreateOrder> {
        Ok(CreateOrder {
            items: parse_items(&self.items)?,
            total: optional_number("total", &self.total)?,
            client_id: optional_number("clienteId", &self.client_id)?,
            estimated_minutes: optional_number("tiempoEstimado", &self.estimated_minutes)?,
            order_type: required_enum(&self.order_type)?,
            platform: required_enum(&self.platform)?,
            status: optional_enum(&self.status)?,
            order_number: optional_string(&self.order_number),
            client_name: optional_string(&self.client_name),
            notes: Some(self.notes),
        })
    }

    /// A blank total with the items field recomputes the total from the items.
    fn into_patch(self) -> AppResult<OrderPatch> {
        Ok(OrderPatch {
            items: Some(parse_items(&self.items)?),
            total: optional_number("total", &self.total)?,
            client_id: Some(optional_number("clienteId", &self.client_id)?),
            estimated_minutes: optional_number("tiempoEstimado", &self.estimated_minutes)?,
            order_type: Some(required_enum(&self.order_type)?),
            platform: Some(required_enum(&self.platform)?),
            status: Some(required_enum(&self.status)?),
            order_number: blank_to_none(&self.order_number).map(str::to_string),
            client_name: Some(optional_string(&self.client_name)),
            notes: Some(self.notes),
        })
    }
}

fn client_select(clients: &[Client], selected: Option<u64>) -> String {
    let mut out = String::from(
        "<label>Cliente <select name=\"clienteId\"><option value=\"\">Sin cliente registrado</option>",
    );
    for client in clients {
        let marker = if Some(client.id) == selected { " selected" } else { "" };
        let _ = write!(
            out,
            "<option value=\"{id}\"{marker}>{name}</option>",
            id = client.id,
            name = escape(&client.display_name())
        );
    }
    out.push_str("</select></label>");
    out
}

fn fields(order: Option<&Order>, clients: &[Client]) -> Vec<String> {
    let mut fields = vec![
        text_input(
            "Numero de orden",
            "numeroOrden",
            order.map_or("", |o| o.order_number.as_str()),
            "text",
        ),
        client_select(clients, order.and_then(|o| o.client_id)),
        text_input(
            "Nombre del cliente (sin registro)",
            "cliente",
            order.and_then(|o| o.client_name.as_deref()).unwrap_or(""),
            "text",
        ),
        textarea(
            "Items (producto,cantidad,precio por linea)",
            "items",
            &order.map(|o| items_text(&o.items)).unwrap_or_default(),
        ),
        text_input(
            "Total (vacio para calcularlo)",
            "total",
            &order.map(|o| o.total.to_string()).unwrap_or_default(),
            "text",
        ),
        select::<OrderType>("Tipo", "tipo", order.map(|o| o.order_type), None),
        select::<Platform>("Plataforma", "plataforma", order.map(|o| o.platform), None),
    ];
    fields.push(select::<OrderStatus>(
        "Estado",
        "estado",
        Some(order.map(|o| o.status).unwrap_or_default()),
        None,
    ));
    fields.push(text_input(
        "Tiempo estimado (min)",
        "tiempoEstimado",
        &order.map(|o| o.estimated_minutes.to_string()).unwrap_or_default(),
        "number",
    ));
    fields.push(textarea(
        "Observaciones",
        "observaciones",
        order.map_or("", |o| o.notes.as_str()),
    ));
    fields
}

async fn list_page(State(state): State<AppState>) -> PageResult {
    let orders = state.orders.get_all().await?;
    let mut rows = Vec::with_capacity(orders.len());
    for order in &orders {
        let client = state.orders.client_display_name(order).await?;
        rows.push(format!(
            "<tr><td>{id}</td><td>{number}</td><td>{client}</td><td>{kind}</td><td>{platform}</td>\
             <td>{status}</td><td>{items}</td><td>{total:.2}</td><td>{minutes}</td><td>{created}</td>\
             <td><a href=\"/pedidos/editar/{id}\">Editar</a> {delete}</td></tr>",
            id = order.id,
            number = escape(&order.order_number),
            client = escape(&client),
            kind = order.order_type,
            platform = order.platform,
            status = order.status,
            items = order.items.len(),
            total = order.total,
            minutes = order.estimated_minutes,
            created = order.created_at.format("%Y-%m-%d %H:%M"),
            delete = delete_button(&format!("/pedidos/eliminar/{}", order.id)),
        ));
    }
    let body = format!(
        "<h1>Pedidos</h1>\n<p><a href=\"/pedidos/nuevo\">Nuevo pedido</a></p>\n{}",
        table(
            &[
                "Id", "Numero", "Cliente", "Tipo", "Plataforma", "Estado", "Items", "Total",
                "Minutos", "Creado", "",
            ],
            &rows,
            "No hay pedidos.",
        )
    );
    Ok(layout("Pedidos", "pedidos", &body))
}

async fn new_page(State(state): State<AppState>) -> PageResult {
    let clients = state.clients.get_all().await?;
    let body = format!(
        "<h1>Nuevo pedido</h1>\n{}",
        form("/pedidos/nuevo", &fields(None, &clients), "Crear")
    );
    Ok(layout("Nuevo pedido", "pedidos", &body))
}

async fn create(State(state): State<AppState>, HtmlForm(input): HtmlForm<OrderForm>) -> RedirectResult {
    state.orders.create(input.into_create()?).await?;
    Ok(Redirect::to("/pedidos"))
}

async fn edit_page(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let id = parse_path_id(&id)?;
    let order = state
        .orders
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Order>(id))?;
    let clients = state.clients.get_all().await?;
    let body = format!(
        "<h1>Editar pedido {}</h1>\n{}",
        escape(&order.order_number),
        form(&format!("/pedidos/editar/{id}"), &fields(Some(&order), &clients), "Guardar")
    );
    Ok(layout("Editar pedido", "pedidos", &body))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    HtmlForm(input): HtmlForm<OrderForm>,
) -> RedirectResult {
    let id = parse_path_id(&id)?;
    state.orders.update(id, input.into_patch()?).await?;
    Ok(Redirect::to("/pedidos"))
}

async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> RedirectResult {
    let id = parse_path_id(&id)?;
    state.orders.delete(id).await?;
    Ok(Redirect::to("/pedidos"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_textarea_splits_from_the_right() {
        let items = parse_items("Milanesa, con papas,2,1500\n\n  Agua,1,800.5  \n").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product, "Milanesa, con papas");
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].unit_price, 800.5);
    }

    #[test]
    fn malformed_item_line_is_rejected() {
        let err = parse_items("Pizza,dos,100").unwrap_err();
        assert!(err.to_string().contains("items line 1"));
        assert!(parse_items("Pizza").is_err());
    }
}
