use axum::{
    Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{
    HtmlForm, PageResult, RedirectResult, blank_to_none, delete_button, escape, form, layout,
    optional_string, or_blank, parse_path_id, required_enum, select, table, text_input,
};
use crate::{
    error::{AppError, AppResult},
    models::{CreateEmployee, Employee, EmployeeArea, EmployeePatch, Role},
    state::AppState,
    store::not_found,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/empleados", get(list_page))
        .route("/empleados/nuevo", get(new_page).post(create))
        .route("/empleados/editar/:id", get(edit_page).post(update))
        .route("/empleados/eliminar/:id", post(deactivate))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmployeeForm {
    #[serde(rename = "nombre")]
    first_name: String,
    #[serde(rename = "apellido")]
    last_name: String,
    email: String,
    #[serde(rename = "telefono")]
    phone: String,
    #[serde(rename = "rol")]
    role: String,
    area: String,
    #[serde(rename = "fechaIngreso")]
    hire_date: String,
    /// Checkbox; absent when unticked.
    #[serde(rename = "activo")]
    active: Option<String>,
}

impl EmployeeForm {
    fn hire_date(&self) -> AppResult<Option<NaiveDate>> {
        blank_to_none(&self.hire_date)
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    AppError::validation(format!("fechaIngreso must be YYYY-MM-DD, got `{raw}`"))
                })
            })
            .transpose()
    }

    fn into_create(self) -> AppResult<CreateEmployee> {
        Ok(CreateEmployee {
            hire_date: self.hire_date()?,
            role: required_enum(&self.role)?,
            area: required_enum(&self.area)?,
            phone: optional_string(&self.phone),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
        })
    }

    fn into_patch(self) -> AppResult<EmployeePatch> {
        Ok(EmployeePatch {
            hire_date: self.hire_date()?,
            role: Some(required_enum(&self.role)?),
            area: Some(required_enum(&self.area)?),
            phone: Some(optional_string(&self.phone)),
            active: Some(self.active.is_some()),
            first_name: Some(self.first_name),
            last_name: Some(self.last_name),
            email: Some(self.email),
        })
    }
}

fn row(employee: &Employee) -> String {
    format!(
        "<tr><td>{id}</td><td>{name}</td><td>{email}</td><td>{phone}</td><td>{role}</td>\
         <td>{area}</td><td>{hired}</td><td>{active}</td>\
         <td><a href=\"/empleados/editar/{id}\">Editar</a> {delete}</td></tr>",
        id = employee.id,
        name = escape(&employee.full_name()),
        email = escape(&employee.email),
        phone = escape(employee.phone.as_deref().unwrap_or("")),
        role = employee.role,
        area = employee.area,
        hired = employee.hire_date,
        active = if employee.active { "si" } else { "no" },
        delete = delete_button(&format!("/empleados/eliminar/{}", employee.id)),
    )
}

fn fields(employee: Option<&Employee>) -> Vec<String> {
    let mut fields = vec![
        text_input("Nombre", "nombre", employee.map_or("", |e| e.first_name.as_str()), "text"),
        text_input("Apellido", "apellido", employee.map_or("", |e| e.last_name.as_str()), "text"),
        text_input("Email", "email", employee.map_or("", |e| e.email.as_str()), "email"),
        text_input(
            "Telefono",
            "telefono",
            employee.and_then(|e| e.phone.as_deref()).unwrap_or(""),
            "text",
        ),
        select::<Role>("Rol", "rol", employee.map(|e| e.role), None),
        select::<EmployeeArea>("Area", "area", employee.map(|e| e.area), None),
        text_input(
            "Fecha de ingreso",
            "fechaIngreso",
            &or_blank(employee.map(|e| e.hire_date)),
            "date",
        ),
    ];
    if let Some(employee) = employee {
        let checked = if employee.active { " checked" } else { "" };
        fields.push(format!(
            "<label>Activo <input type=\"checkbox\" name=\"activo\" value=\"on\"{checked}></label>"
        ));
    }
    fields
}

async fn list_page(State(state): State<AppState>) -> PageResult {
    let employees = state.employees.get_all().await?;
    let rows: Vec<String> = employees.iter().map(row).collect();
    let body = format!(
        "<h1>Empleados</h1>\n<p><a href=\"/empleados/nuevo\">Nuevo empleado</a></p>\n{}",
        table(
            &["Id", "Nombre", "Email", "Telefono", "Rol", "Area", "Ingreso", "Activo", ""],
            &rows,
            "No hay empleados cargados.",
        )
    );
    Ok(layout("Empleados", "empleados", &body))
}

async fn new_page() -> PageResult {
    let body = format!(
        "<h1>Nuevo empleado</h1>\n{}",
        form("/empleados/nuevo", &fields(None), "Crear")
    );
    Ok(layout("Nuevo empleado", "empleados", &body))
}

async fn create(State(state): State<AppState>, HtmlForm(input): HtmlForm<EmployeeForm>) -> RedirectResult {
    state.employees.create(input.into_create()?).await?;
    Ok(Redirect::to("/empleados"))
}

async fn edit_page(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let id = parse_path_id(&id)?;
    let employee = state
        .employees
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Employee>(id))?;
    let body = format!(
        "<h1>Editar empleado {}</h1>\n{}",
        escape(&employee.full_name()),
        form(&format!("/empleados/editar/{id}"), &fields(Some(&employee)), "Guardar")
    );
    Ok(layout("Editar empleado", "empleados", &body))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    HtmlForm(input): HtmlForm<EmployeeForm>,
) -> RedirectResult {
    let id = parse_path_id(&id)?;
    state.employees.update(id, input.into_patch()?).await?;
    Ok(Redirect::to("/empleados"))
}

async fn deactivate(State(state): State<AppState>, Path(id): Path<String>) -> RedirectResult {
    let id = parse_path_id(&id)?;
    state.employees.deactivate(id).await?;
    Ok(Redirect::to("/empleados"))
}
