use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use resto_backoffice::{build_router, state::AppState};
use tower::ServiceExt;

struct Page {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

async fn request(app: &axum::Router, method: Method, uri: &str, form: Option<&str>) -> Page {
    let builder = Request::builder().method(method).uri(uri);
    let request = match form {
        Some(form) => builder
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("response expected");
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");
    Page {
        status,
        location,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

#[tokio::test]
async fn root_redirects_to_tasks() {
    let app = build_router(AppState::in_memory());
    let page = request(&app, Method::GET, "/", None).await;
    assert!(page.status.is_redirection());
    assert_eq!(page.location.as_deref(), Some("/tareas"));
}

#[tokio::test]
async fn employee_form_creates_and_lists() {
    let app = build_router(AppState::in_memory());

    let form = request(&app, Method::GET, "/empleados/nuevo", None).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("name=\"rol\""));

    let created = request(
        &app,
        Method::POST,
        "/empleados/nuevo",
        Some("nombre=Lucia&apellido=Diaz&email=lucia%40resto.com&telefono=&rol=mozo&area=salon&fechaIngreso=2024-02-10"),
    )
    .await;
    assert!(created.status.is_redirection(), "{}", created.body);
    assert_eq!(created.location.as_deref(), Some("/empleados"));

    let list = request(&app, Method::GET, "/empleados", None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert!(list.body.contains("Lucia Diaz"));
    assert!(list.body.contains("2024-02-10"));

    let edit = request(&app, Method::GET, "/empleados/editar/1", None).await;
    assert!(edit.body.contains("value=\"lucia@resto.com\""));
}

#[tokio::test]
async fn invalid_form_renders_error_page() {
    let app = build_router(AppState::in_memory());
    let page = request(
        &app,
        Method::POST,
        "/insumos/nuevo",
        Some("nombre=Sal&categoria=especias&stock=3"),
    )
    .await;
    assert_eq!(page.status, StatusCode::BAD_REQUEST);
    assert!(page.body.contains("<h1>Error 400</h1>"));
    assert!(page.body.contains("especias"));
}

#[tokio::test]
async fn order_form_parses_item_lines() {
    let app = build_router(AppState::in_memory());
    let created = request(
        &app,
        Method::POST,
        "/pedidos/nuevo",
        Some("cliente=Mesa+2&items=Pizza%2C2%2C1500%0D%0AAgua%2C1%2C500&total=&tipo=presencial&plataforma=local&estado=&tiempoEstimado=&observaciones="),
    )
    .await;
    assert!(created.status.is_redirection(), "{}", created.body);

    let list = request(&app, Method::GET, "/pedidos", None).await;
    assert!(list.body.contains("Mesa 2"));
    assert!(list.body.contains("3500.00"));
}

#[tokio::test]
async fn task_filter_page_lists_matches() {
    let app = build_router(AppState::in_memory());
    for form in [
        "titulo=Contar+latas&descripcion=&area=control_inventario&prioridad=alta&empleadoAsignado=&pedidoAsociado=&observaciones=",
        "titulo=Armar+combo&descripcion=&area=gestion_pedidos&prioridad=&empleadoAsignado=&pedidoAsociado=&observaciones=",
    ] {
        let created = request(&app, Method::POST, "/tareas/nueva", Some(form)).await;
        assert!(created.status.is_redirection(), "{}", created.body);
    }

    let filters = request(&app, Method::GET, "/filtros", None).await;
    assert_eq!(filters.status, StatusCode::OK);
    assert!(filters.body.contains("action=\"/tareas/filtrar\""));

    let filtered = request(
        &app,
        Method::GET,
        "/tareas/filtrar?estado=&prioridad=&area=control_inventario&empleadoAsignado=&fechaDesde=&tipoPedido=&limite=",
        None,
    )
    .await;
    assert_eq!(filtered.status, StatusCode::OK);
    assert!(filtered.body.contains("Contar latas"));
    assert!(!filtered.body.contains("Armar combo"));

    let deleted = request(&app, Method::POST, "/tareas/eliminar/1", None).await;
    assert!(deleted.status.is_redirection());
    let list = request(&app, Method::GET, "/tareas", None).await;
    assert!(!list.body.contains("Contar latas"));
}

#[tokio::test]
async fn unknown_page_is_html_not_found() {
    let app = build_router(AppState::in_memory());
    let page = request(&app, Method::GET, "/no-existe", None).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
    assert!(page.body.contains("<!DOCTYPE html>"));

    let missing = request(&app, Method::GET, "/insumos/editar/9", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.body.contains("Error 404"));
}

#[tokio::test]
async fn storage_failure_page_shows_detail_only_when_enabled() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("insumos.json"), r#"{ "insumos": 3 }"#).unwrap();

    let hidden = build_router(AppState::json_files(dir.path()));
    let page = request(&hidden, Method::GET, "/insumos", None).await;
    assert_eq!(page.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(page.body.contains("<h1>Error 500</h1>"));
    assert!(!page.body.contains("<pre>"));

    let exposed = build_router(AppState::json_files(dir.path()).with_internal_errors(true));
    let page = request(&exposed, Method::GET, "/insumos", None).await;
    assert_eq!(page.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(page.body.contains("<h1>Error 500</h1>"));
    assert!(page.body.contains("<pre>"));
    assert!(page.body.contains("must be an array"));
}
