use axum::{
    Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;

use super::{
    HtmlForm, PageResult, RedirectResult, delete_button, escape, form, layout, optional_number,
    optional_string, parse_path_id, required_enum, select, table, text_input,
};
use crate::{
    error::AppResult,
    models::{CreateSupply, Supply, SupplyCategory, SupplyPatch},
    state::AppState,
    store::not_found,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/insumos", get(list_page))
        .route("/insumos/nuevo", get(new_page).post(create))
        .route("/insumos/editar/:id", get(edit_page).post(update))
        .route("/insumos/eliminar/:id", post(delete))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SupplyForm {
    #[serde(rename = "nombre")]
    name: String,
    #[serde(rename = "categoria")]
    category: String,
    stock: String,
    #[serde(rename = "stockMinimo")]
    min_stock: String,
    #[serde(rename = "unidadMedida")]
    unit: String,
    #[serde(rename = "proveedor")]
    supplier: String,
}

impl SupplyForm {
    fn into_create(self) -> AppResult<CreateSupply> {
        Ok(CreateSupply {
            category: required_enum(&self.category)?,
            stock: optional_number("stock", &self.stock)?,
            min_stock: optional_number("stockMinimo", &self.min_stock)?,
            unit: optional_string(&self.unit),
            supplier: optional_string(&self.supplier),
            name: self.name,
        })
    }

    fn into_patch(self) -> AppResult<SupplyPatch> {
        Ok(SupplyPatch {
            category: Some(required_enum(&self.category)?),
            stock: optional_number("stock", &self.stock)?,
            min_stock: optional_number("stockMinimo", &self.min_stock)?,
            unit: Some(self.unit.trim().to_string()),
            supplier: Some(self.supplier.trim().to_string()),
            name: Some(self.name),
        })
    }
}

fn row(supply: &Supply) -> String {
    let class = if supply.is_low() { " class=\"low\"" } else { "" };
    format!(
        "<tr{class}><td>{id}</td><td>{name}</td><td>{category}</td><td>{stock}</td><td>{min}</td>\
         <td>{unit}</td><td>{supplier}</td><td>{status}</td><td>{updated}</td>\
         <td><a href=\"/insumos/editar/{id}\">Editar</a> {delete}</td></tr>",
        id = supply.id,
        name = escape(&supply.name),
        category = supply.category,
        stock = supply.stock,
        min = supply.min_stock,
        unit = escape(&supply.unit),
        supplier = escape(&supply.supplier),
        status = supply.status,
        updated = supply.updated_at.format("%Y-%m-%d %H:%M"),
        delete = delete_button(&format!("/insumos/eliminar/{}", supply.id)),
    )
}

fn fields(supply: Option<&Supply>) -> Vec<String> {
    vec![
        text_input("Nombre", "nombre", supply.map_or("", |s| s.name.as_str()), "text"),
        select::<SupplyCategory>("Categoria", "categoria", supply.map(|s| s.category), None),
        text_input(
            "Stock",
            "stock",
            &supply.map(|s| s.stock.to_string()).unwrap_or_default(),
            "number",
        ),
        text_input(
            "Stock minimo",
            "stockMinimo",
            &supply.map(|s| s.min_stock.to_string()).unwrap_or_default(),
            "number",
        ),
        text_input("Unidad de medida", "unidadMedida", supply.map_or("", |s| s.unit.as_str()), "text"),
        text_input("Proveedor", "proveedor", supply.map_or("", |s| s.supplier.as_str()), "text"),
    ]
}

async fn list_page(State(state): State<AppState>) -> PageResult {
    let supplies = state.supplies.get_all().await?;
    let alerts = supplies.iter().filter(|supply| supply.is_low()).count();
    let rows: Vec<String> = supplies.iter().map(row).collect();
    let mut body = String::from("<h1>Insumos</h1>\n");
    if alerts > 0 {
        body.push_str(&format!(
            "<p class=\"alert\">{alerts} insumo(s) en o por debajo del stock minimo.</p>\n"
        ));
    }
    body.push_str("<p><a href=\"/insumos/nuevo\">Nuevo insumo</a></p>\n");
    body.push_str(&table(
        &[
            "Id", "Nombre", "Categoria", "Stock", "Minimo", "Unidad", "Proveedor", "Estado",
            "Actualizado", "",
        ],
        &rows,
        "No hay insumos.",
    ));
    Ok(layout("Insumos", "insumos", &body))
}

async fn new_page() -> PageResult {
    let body = format!(
        "<h1>Nuevo insumo</h1>\n{}",
        form("/insumos/nuevo", &fields(None), "Crear")
    );
    Ok(layout("Nuevo insumo", "insumos", &body))
}

async fn create(State(state): State<AppState>, HtmlForm(input): HtmlForm<SupplyForm>) -> RedirectResult {
    state.supplies.create(input.into_create()?).await?;
    Ok(Redirect::to("/insumos"))
}

async fn edit_page(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let id = parse_path_id(&id)?;
    let supply = state
        .supplies
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Supply>(id))?;
    let body = format!(
        "<h1>Editar insumo {}</h1>\n{}",
        escape(&supply.name),
        form(&format!("/insumos/editar/{id}"), &fields(Some(&supply)), "Guardar")
    );
    Ok(layout("Editar insumo", "insumos", &body))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    HtmlForm(input): HtmlForm<SupplyForm>,
) -> RedirectResult {
    let id = parse_path_id(&id)?;
    state.supplies.update(id, input.into_patch()?).await?;
    Ok(Redirect::to("/insumos"))
}

async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> RedirectResult {
    let id = parse_path_id(&id)?;
    state.supplies.delete(id).await?;
    Ok(Redirect::to("/insumos"))
}
