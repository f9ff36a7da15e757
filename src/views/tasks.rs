use axum::{
    Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;

use super::{
    HtmlForm, HtmlQuery, PageResult, RedirectResult, delete_button, escape, form, layout,
    optional_enum, optional_number, parse_path_id, required_enum, select, table, text_input,
    textarea,
};
use crate::{
    error::AppResult,
    models::{
        CreateTask, Employee, OrderType, Platform, Priority, Task, TaskArea, TaskFilter,
        TaskFilterQuery, TaskPatch, TaskStatus,
    },
    state::AppState,
    store::not_found,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tareas", get(list_page))
        .route("/tareas/nueva", get(new_page).post(create))
        .route("/tareas/editar/:id", get(edit_page).post(update))
        .route("/tareas/eliminar/:id", post(delete))
        .route("/tareas/filtrar", get(filtered_page))
        .route("/filtros", get(filter_form))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaskForm {
    #[serde(rename = "titulo")]
    title: String,
    #[serde(rename = "descripcion")]
    description: String,
    area: String,
    #[serde(rename = "estado")]
    status: String,
    #[serde(rename = "prioridad")]
    priority: String,
    #[serde(rename = "empleadoAsignado")]
    assigned_employee: String,
    #[serde(rename = "pedidoAsociado")]
    order_id: String,
    #[serde(rename = "observaciones")]
    notes: String,
}

impl TaskForm {
    fn into_create(self) -> AppResult<CreateTask> {
        Ok(CreateTask {
            area: required_enum(&self.area)?,
            priority: optional_enum(&self.priority)?,
            assigned_employee: optional_number("empleadoAsignado", &self.assigned_employee)?,
            order_id: optional_number("pedidoAsociado", &self.order_id)?,
            title: self.title,
            description: Some(self.description),
            notes: Some(self.notes),
        })
    }

    /// Every field is sent by the edit form; blank references clear the link.
    fn into_patch(self) -> AppResult<TaskPatch> {
        Ok(TaskPatch {
            area: Some(required_enum(&self.area)?),
            status: optional_enum(&self.status)?,
            priority: optional_enum(&self.priority)?,
            assigned_employee: Some(optional_number(
                "empleadoAsignado",
                &self.assigned_employee,
            )?),
            order_id: Some(optional_number("pedidoAsociado", &self.order_id)?),
            title: Some(self.title),
            description: Some(self.description),
            notes: Some(self.notes),
        })
    }
}

fn when(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn employee_names(employees: &[Employee]) -> HashMap<u64, String> {
    employees
        .iter()
        .map(|employee| (employee.id, employee.full_name()))
        .collect()
}

fn row(task: &Task, names: &HashMap<u64, String>) -> String {
    let employee = match task.assigned_employee {
        Some(id) => names
            .get(&id)
            .map(|name| escape(name))
            .unwrap_or_else(|| format!("#{id}")),
        None => "-".to_string(),
    };
    let order = task
        .order_id
        .map(|id| format!("<a href=\"/pedidos/editar/{id}\">#{id}</a>"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "<tr><td>{id}</td><td>{title}</td><td>{area}</td><td>{status}</td><td>{priority}</td>\
         <td>{employee}</td><td>{order}</td><td>{created}</td><td>{started}</td><td>{finished}</td>\
         <td><a href=\"/tareas/editar/{id}\">Editar</a> {delete}</td></tr>",
        id = task.id,
        title = escape(&task.title),
        area = task.area,
        status = task.status,
        priority = task.priority,
        created = when(Some(task.created_at)),
        started = when(task.started_at),
        finished = when(task.finished_at),
        delete = delete_button(&format!("/tareas/eliminar/{}", task.id)),
    )
}

fn task_table(tasks: &[Task], employees: &[Employee]) -> String {
    let names = employee_names(employees);
    let rows: Vec<String> = tasks.iter().map(|task| row(task, &names)).collect();
    table(
        &[
            "Id", "Titulo", "Area", "Estado", "Prioridad", "Empleado", "Pedido", "Creada",
            "Inicio", "Fin", "",
        ],
        &rows,
        "No hay tareas.",
    )
}

fn employee_select(name: &str, employees: &[Employee], selected: Option<u64>) -> String {
    let mut out = format!(
        "<label>Empleado <select name=\"{name}\"><option value=\"\">Sin asignar</option>"
    );
    for employee in employees {
        let marker = if Some(employee.id) == selected { " selected" } else { "" };
        let _ = write!(
            out,
            "<option value=\"{id}\"{marker}>{name}</option>",
            id = employee.id,
            name = escape(&employee.full_name())
        );
    }
    out.push_str("</select></label>");
    out
}

fn fields(task: Option<&Task>, employees: &[Employee]) -> Vec<String> {
    let mut fields = vec![
        text_input("Titulo", "titulo", task.map_or("", |t| t.title.as_str()), "text"),
        textarea("Descripcion", "descripcion", task.map_or("", |t| t.description.as_str())),
        select::<TaskArea>("Area", "area", task.map(|t| t.area), None),
        select::<Priority>(
            "Prioridad",
            "prioridad",
            Some(task.map(|t| t.priority).unwrap_or_default()),
            None,
        ),
    ];
    if let Some(task) = task {
        fields.push(select::<TaskStatus>("Estado", "estado", Some(task.status), None));
    }
    fields.push(employee_select(
        "empleadoAsignado",
        employees,
        task.and_then(|t| t.assigned_employee),
    ));
    fields.push(text_input(
        "Pedido asociado",
        "pedidoAsociado",
        &task.and_then(|t| t.order_id).map(|id| id.to_string()).unwrap_or_default(),
        "number",
    ));
    fields.push(textarea(
        "Observaciones",
        "observaciones",
        task.map_or("", |t| t.notes.as_str()),
    ));
    fields
}

async fn list_page(State(state): State<AppState>) -> PageResult {
    let tasks = state.tasks.get_all().await?;
    let employees = state.employees.get_all().await?;
    let body = format!(
        "<h1>Tareas</h1>\n<p><a href=\"/tareas/nueva\">Nueva tarea</a> | <a href=\"/filtros\">Filtrar</a></p>\n{}",
        task_table(&tasks, &employees)
    );
    Ok(layout("Tareas", "tareas", &body))
}

async fn new_page(State(state): State<AppState>) -> PageResult {
    let employees = state.employees.get_active().await?;
    let body = format!(
        "<h1>Nueva tarea</h1>\n{}",
        form("/tareas/nueva", &fields(None, &employees), "Crear")
    );
    Ok(layout("Nueva tarea", "tareas", &body))
}

async fn create(State(state): State<AppState>, HtmlForm(input): HtmlForm<TaskForm>) -> RedirectResult {
    state.tasks.create(input.into_create()?).await?;
    Ok(Redirect::to("/tareas"))
}

async fn edit_page(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let id = parse_path_id(&id)?;
    let task = state
        .tasks
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found::<Task>(id))?;
    let employees = state.employees.get_all().await?;
    let body = format!(
        "<h1>Editar tarea {}</h1>\n{}",
        escape(&task.title),
        form(&format!("/tareas/editar/{id}"), &fields(Some(&task), &employees), "Guardar")
    );
    Ok(layout("Editar tarea", "tareas", &body))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    HtmlForm(input): HtmlForm<TaskForm>,
) -> RedirectResult {
    let id = parse_path_id(&id)?;
    state.tasks.update(id, input.into_patch()?).await?;
    Ok(Redirect::to("/tareas"))
}

async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> RedirectResult {
    let id = parse_path_id(&id)?;
    state.tasks.delete(id).await?;
    Ok(Redirect::to("/tareas"))
}

async fn filter_form(State(state): State<AppState>) -> PageResult {
    let employees = state.employees.get_all().await?;
    let mut fields = vec![
        select::<TaskStatus>("Estado", "estado", None, Some("todos")),
        select::<Priority>("Prioridad", "prioridad", None, Some("todas")),
        select::<TaskArea>("Area", "area", None, Some("todas")),
        employee_select("empleadoAsignado", &employees, None),
    ];
    for (label, name) in [
        ("Creada desde", "fechaDesde"),
        ("Creada hasta", "fechaHasta"),
        ("Iniciada desde", "inicioDesde"),
        ("Iniciada hasta", "inicioHasta"),
        ("Finalizada desde", "finDesde"),
        ("Finalizada hasta", "finHasta"),
    ] {
        fields.push(text_input(label, name, "", "date"));
    }
    fields.push(select::<OrderType>("Tipo de pedido", "tipoPedido", None, Some("todos")));
    fields.push(select::<Platform>("Plataforma", "plataforma", None, Some("todas")));
    fields.push(text_input("Limite", "limite", "", "number"));

    let mut body = String::from("<h1>Filtrar tareas</h1>\n<form method=\"get\" action=\"/tareas/filtrar\">\n");
    for field in &fields {
        body.push_str(field);
        body.push('\n');
    }
    body.push_str("<button type=\"submit\">Filtrar</button>\n</form>");
    Ok(layout("Filtros", "filtros", &body))
}

async fn filtered_page(
    State(state): State<AppState>,
    HtmlQuery(query): HtmlQuery<TaskFilterQuery>,
) -> PageResult {
    let criteria = TaskFilter::try_from(query)?;
    let tasks = state.tasks.filter(&criteria).await?;
    let employees = state.employees.get_all().await?;
    let body = format!(
        "<h1>Tareas filtradas</h1>\n<p>{} resultado(s). <a href=\"/filtros\">Cambiar filtros</a></p>\n{}",
        tasks.len(),
        task_table(&tasks, &employees)
    );
    Ok(layout("Tareas filtradas", "filtros", &body))
}
