//! Server-rendered HTML pages over the same repositories as the JSON API.

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts, rejection::FormRejection, rejection::QueryRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use std::fmt::Write as _;

use crate::{
    error::{AppError, AppResult},
    models::WireEnum,
    state::AppState,
};

mod clients;
mod employees;
mod orders;
mod supplies;
mod tasks;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/tareas") }))
        .merge(employees::routes())
        .merge(tasks::routes())
        .merge(orders::routes())
        .merge(supplies::routes())
        .merge(clients::routes())
}

// ============================================================================
// Errors
// ============================================================================

/// An [`AppError`] rendered as an HTML page with the mapped status code.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<FormRejection> for PageError {
    fn from(rejection: FormRejection) -> Self {
        Self(AppError::validation(format!(
            "invalid form: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for PageError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::from(rejection))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let AppError::Store(err) = &self.0 {
            tracing::error!(error = %err, "storage failure while rendering page");
        }
        let mut response = error_page(self.0.status(), &self.0.public_message(), None);
        if let Some(detail) = self.0.internal_detail() {
            response.extensions_mut().insert(detail);
        }
        response
    }
}

/// The "Error {code}" page, with the storage detail in a `<pre>` when given.
pub fn error_page(status: StatusCode, message: &str, detail: Option<&str>) -> Response {
    let mut body = format!(
        "<h1>Error {}</h1><p class=\"error\">{}</p>",
        status.as_u16(),
        escape(message)
    );
    if let Some(detail) = detail {
        let _ = write!(body, "<pre>{}</pre>", escape(detail));
    }
    body.push_str("<p><a href=\"/\">Volver al inicio</a></p>");
    (status, layout("Error", "", &body)).into_response()
}

pub type PageResult = Result<Html<String>, PageError>;
pub type RedirectResult = Result<Redirect, PageError>;

/// Urlencoded form body whose rejections render as an error page.
#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(PageError))]
pub struct HtmlForm<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(PageError))]
pub struct HtmlQuery<T>(pub T);

/// 404 page for paths outside `/api`.
pub fn not_found_page(path: &str) -> Response {
    PageError(AppError::not_found(format!("page {path} not found"))).into_response()
}

// ============================================================================
// Rendering helpers
// ============================================================================

const NAV: [(&str, &str); 6] = [
    ("tareas", "Tareas"),
    ("empleados", "Empleados"),
    ("pedidos", "Pedidos"),
    ("insumos", "Insumos"),
    ("clientes", "Clientes"),
    ("filtros", "Filtros"),
];

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn layout(title: &str, active: &str, body: &str) -> Html<String> {
    let mut nav = String::new();
    for (slug, label) in NAV {
        let class = if slug == active { " class=\"active\"" } else { "" };
        let _ = write!(nav, "<a href=\"/{slug}\"{class}>{label}</a>");
    }
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | Resto</title>\n</head>\n<body>\n<nav>{nav}</nav>\n\
         <main>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
    ))
}

/// `<table>` with escaped header labels; `rows` are pre-rendered `<tr>` elements.
pub fn table(headers: &[&str], rows: &[String], empty: &str) -> String {
    if rows.is_empty() {
        return format!("<p class=\"empty\">{}</p>", escape(empty));
    }
    let mut out = String::from("<table>\n<thead><tr>");
    for header in headers {
        let _ = write!(out, "<th>{}</th>", escape(header));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out.push_str("</tbody>\n</table>");
    out
}

pub fn text_input(label: &str, name: &str, value: &str, kind: &str) -> String {
    format!(
        "<label>{label} <input type=\"{kind}\" name=\"{name}\" value=\"{value}\"></label>",
        label = escape(label),
        value = escape(value),
    )
}

pub fn textarea(label: &str, name: &str, value: &str) -> String {
    format!(
        "<label>{label} <textarea name=\"{name}\">{value}</textarea></label>",
        label = escape(label),
        value = escape(value),
    )
}

/// `<select>` over every value of `E`, with an optional leading blank choice.
pub fn select<E: WireEnum>(label: &str, name: &str, selected: Option<E>, blank: Option<&str>) -> String {
    let mut out = format!("<label>{} <select name=\"{name}\">", escape(label));
    if let Some(blank) = blank {
        let _ = write!(out, "<option value=\"\">{}</option>", escape(blank));
    }
    for value in E::ALL {
        let marker = if Some(*value) == selected { " selected" } else { "" };
        let _ = write!(
            out,
            "<option value=\"{wire}\"{marker}>{wire}</option>",
            wire = value.as_str()
        );
    }
    out.push_str("</select></label>");
    out
}

pub fn form(action: &str, fields: &[String], submit: &str) -> String {
    let mut out = format!("<form method=\"post\" action=\"{}\">\n", escape(action));
    for field in fields {
        out.push_str(field);
        out.push('\n');
    }
    let _ = write!(out, "<button type=\"submit\">{}</button>\n</form>", escape(submit));
    out
}

pub fn delete_button(action: &str) -> String {
    format!(
        "<form method=\"post\" action=\"{}\" class=\"inline\"><button type=\"submit\">Eliminar</button></form>",
        escape(action)
    )
}

// ============================================================================
// Form field parsing
// ============================================================================

pub(crate) fn blank_to_none(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub(crate) fn optional_string(raw: &str) -> Option<String> {
    blank_to_none(raw).map(str::to_string)
}

pub(crate) fn required_enum<E: WireEnum>(raw: &str) -> AppResult<E> {
    E::parse_wire(raw.trim())
}

pub(crate) fn optional_enum<E: WireEnum>(raw: &str) -> AppResult<Option<E>> {
    blank_to_none(raw).map(E::parse_wire).transpose()
}

pub(crate) fn optional_number<N: std::str::FromStr>(field: &str, raw: &str) -> AppResult<Option<N>> {
    blank_to_none(raw)
        .map(|value| {
            value
                .parse::<N>()
                .map_err(|_| AppError::validation(format!("{field} must be a number, got `{value}`")))
        })
        .transpose()
}

pub(crate) fn parse_path_id(raw: &str) -> AppResult<u64> {
    crate::handlers::parse_id(raw)
}

pub(crate) fn or_blank<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[test]
    fn escape_handles_markup() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn select_marks_current_value() {
        let html = select::<Priority>("Prioridad", "prioridad", Some(Priority::Low), None);
        assert!(html.contains("<option value=\"baja\" selected>baja</option>"));
        assert!(html.contains("<option value=\"alta\">alta</option>"));
    }

    #[test]
    fn optional_fields_treat_blank_as_absent() {
        assert_eq!(optional_number::<u64>("id", "  ").unwrap(), None);
        assert_eq!(optional_number::<u64>("id", "7").unwrap(), Some(7));
        assert!(optional_number::<u64>("id", "siete").is_err());
        assert_eq!(optional_enum::<Priority>("").unwrap(), None);
    }
}
