//! Offline cleanup of legacy data files so the typed stores can read them.
//!
//! Works on raw [`serde_json::Value`] documents: legacy files carry string numbers,
//! retired categories and missing fields that the typed models would reject.
//! Employees are only read, to check task references.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::{SupplyCategory, SupplyStatus, TaskArea, WireEnum, timestamp};
use crate::store::{LAST_ID_KEY, StoreError, StoreResult, write_atomic};

pub const SCHEMA_VERSION: u64 = 1;

/// Legacy supply categories folded into `alimentos`.
const FOOD_ALIASES: [&str; 5] = ["verduras", "vegetales", "hortalizas", "lacteos", "lácteos"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub supplies_changed: usize,
    pub orders_changed: usize,
    /// Includes the appended inventory task, if any.
    pub tasks_changed: usize,
    pub inventory_task_added: bool,
    pub backups: Vec<PathBuf>,
    pub dry_run: bool,
}

pub struct DataNormalizer {
    data_dir: PathBuf,
    dry_run: bool,
    now: DateTime<Utc>,
}

impl DataNormalizer {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            dry_run: false,
            now: timestamp::now(),
        }
    }

    /// Report what would change without touching any file.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Clock used for filled-in timestamps and backup names.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn run(&self) -> StoreResult<NormalizeReport> {
        let employees = DataFile::read(&self.data_dir, "empleados")?;
        let mut tasks = DataFile::read(&self.data_dir, "tareas")?;
        let mut orders = DataFile::read(&self.data_dir, "pedidos")?;
        let mut supplies = DataFile::read(&self.data_dir, "insumos")?;

        let employee_ids = ids(&employees.records());
        let order_ids = ids(&orders.records());
        let now = timestamp::format(&self.now);

        let mut report = NormalizeReport {
            dry_run: self.dry_run,
            ..NormalizeReport::default()
        };

        let mut supply_records = supplies.records();
        report.supplies_changed = normalize_each(&mut supply_records, |supply| {
            normalize_supply(supply, &now)
        });

        let mut order_records = orders.records();
        report.orders_changed = normalize_each(&mut order_records, normalize_order);

        let mut task_records = tasks.records();
        report.tasks_changed = normalize_each(&mut task_records, |task| {
            normalize_task(task, &employee_ids, &order_ids)
        });
        if !has_inventory_task(&task_records) {
            let id = next_id(tasks.last_id(), &task_records)?;
            task_records.push(inventory_task(id, &now));
            report.tasks_changed += 1;
            report.inventory_task_added = true;
            info!("appended a control_inventario task");
        }

        supplies.replace(supply_records);
        orders.replace(order_records);
        tasks.replace(task_records);

        if self.dry_run {
            info!(?report, "dry run, no files written");
            return Ok(report);
        }

        let stamp = backup_stamp(&self.now);
        for file in [&supplies, &orders, &tasks] {
            report.backups.push(file.backup_and_save(&stamp)?);
        }
        info!(
            supplies = report.supplies_changed,
            orders = report.orders_changed,
            tasks = report.tasks_changed,
            "data files normalized"
        );
        Ok(report)
    }
}

// ============================================================================
// Files
// ============================================================================

struct DataFile {
    collection: &'static str,
    path: PathBuf,
    raw: String,
    document: Map<String, Value>,
}

impl DataFile {
    /// Missing or malformed files abort the whole run.
    fn read(dir: &Path, collection: &'static str) -> StoreResult<Self> {
        let path = dir.join(format!("{collection}.json"));
        let raw = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let document = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(document)) => document,
            Ok(_) => {
                return Err(StoreError::Shape {
                    path,
                    message: "top-level value must be an object".to_string(),
                });
            }
            Err(source) => return Err(StoreError::Parse { path, source }),
        };
        debug!(path = %path.display(), "read data file");
        Ok(Self {
            collection,
            path,
            raw,
            document,
        })
    }

    /// The collection array; anything else counts as empty.
    fn records(&self) -> Vec<Value> {
        match self.document.get(self.collection) {
            Some(Value::Array(records)) => records.clone(),
            _ => Vec::new(),
        }
    }

    fn last_id(&self) -> u64 {
        self.document
            .get(LAST_ID_KEY)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    fn replace(&mut self, records: Vec<Value>) {
        self.document
            .insert(self.collection.to_string(), Value::Array(records));
        self.document
            .entry("schemaVersion")
            .or_insert_with(|| json!(SCHEMA_VERSION));
    }

    /// Copies the untouched original next to the file, then writes the new document.
    fn backup_and_save(&self, stamp: &str) -> StoreResult<PathBuf> {
        let backup = self
            .path
            .with_file_name(format!("{}.backup.{stamp}.json", self.collection));
        write_atomic(&backup, self.raw.as_bytes())?;

        let contents = serde_json::to_string_pretty(&self.document).map_err(|source| {
            StoreError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        write_atomic(&self.path, contents.as_bytes())?;
        info!(
            file = %self.path.display(),
            backup = %backup.display(),
            "data file rewritten"
        );
        Ok(backup)
    }
}

/// `2024-05-01T10:00:00.000Z` becomes `2024-05-01T10-00-00-000Z`.
fn backup_stamp(now: &DateTime<Utc>) -> String {
    timestamp::format(now).replace([':', '.'], "-")
}

// ============================================================================
// Record rules
// ============================================================================

/// Applies `rule` to every object record and counts the ones it changed.
fn normalize_each(records: &mut [Value], mut rule: impl FnMut(&mut Map<String, Value>)) -> usize {
    let mut changed = 0;
    for record in records.iter_mut() {
        let Value::Object(fields) = record else {
            continue;
        };
        let before = fields.clone();
        rule(fields);
        if *fields != before {
            changed += 1;
        }
    }
    changed
}

fn normalize_supply(supply: &mut Map<String, Value>, now: &str) {
    let stock = count(supply.get("stock"));
    let min_stock = count(supply.get("stockMinimo"));
    let category = category(supply.get("categoria"));

    supply.insert("stock".into(), json!(stock));
    supply.insert("stockMinimo".into(), json!(min_stock));
    supply.insert("categoria".into(), json!(category.as_str()));
    supply.insert(
        "estado".into(),
        json!(SupplyStatus::for_levels(stock, min_stock).as_str()),
    );
    for key in ["unidadMedida", "proveedor"] {
        if !supply.get(key).is_some_and(Value::is_string) {
            supply.insert(key.into(), json!(""));
        }
    }
    if is_blank(supply.get("ultimaActualizacion")) {
        supply.insert("ultimaActualizacion".into(), json!(now));
    }
}

fn normalize_order(order: &mut Map<String, Value>) {
    let total = amount(order.get("total"));
    let minutes = count(order.get("tiempoEstimado"));
    let items = match order.get("items") {
        Some(Value::Array(items)) => items.iter().map(normalize_item).collect(),
        _ => Vec::new(),
    };

    order.insert("total".into(), total);
    order.insert("tiempoEstimado".into(), json!(minutes));
    order.insert("items".into(), Value::Array(items));
    order.shift_remove("itemsText");
}

/// Rebuilds an item from its three known fields.
fn normalize_item(item: &Value) -> Value {
    let product = item
        .get("producto")
        .and_then(Value::as_str)
        .unwrap_or_default();
    json!({
        "producto": product,
        "cantidad": count(item.get("cantidad")),
        "precio": amount(item.get("precio")),
    })
}

fn normalize_task(task: &mut Map<String, Value>, employees: &HashSet<u64>, orders: &HashSet<u64>) {
    for (key, known) in [("empleadoAsignado", employees), ("pedidoAsociado", orders)] {
        let keep = task
            .get(key)
            .and_then(Value::as_u64)
            .is_some_and(|id| known.contains(&id));
        if !keep {
            task.insert(key.into(), Value::Null);
        }
    }
    if !task.get("observaciones").is_some_and(Value::is_string) {
        task.insert("observaciones".into(), json!(""));
    }
    for key in ["fechaInicio", "fechaFinalizacion"] {
        task.entry(key).or_insert(Value::Null);
    }
}

fn has_inventory_task(tasks: &[Value]) -> bool {
    tasks
        .iter()
        .any(|task| task.get("area").and_then(Value::as_str) == Some(TaskArea::InventoryControl.as_str()))
}

fn inventory_task(id: u64, now: &str) -> Value {
    json!({
        "id": id,
        "titulo": "Registrar ingreso de queso",
        "descripcion": "Ingreso de 5 kg de queso mozzarella",
        "area": TaskArea::InventoryControl.as_str(),
        "estado": "pendiente",
        "prioridad": "media",
        "empleadoAsignado": null,
        "pedidoAsociado": null,
        "fechaCreacion": now,
        "fechaInicio": null,
        "fechaFinalizacion": null,
        "observaciones": "Generada por la normalizacion de datos",
    })
}

// ============================================================================
// Value coercions
// ============================================================================

fn ids(records: &[Value]) -> HashSet<u64> {
    records
        .iter()
        .filter_map(|record| record.get("id").and_then(Value::as_u64))
        .collect()
}

/// One past both the recorded `ultimoId` and every present id.
fn next_id(last_id: u64, records: &[Value]) -> StoreResult<u64> {
    records
        .iter()
        .filter_map(|record| record.get("id").and_then(Value::as_u64))
        .fold(last_id, u64::max)
        .checked_add(1)
        .ok_or(StoreError::IdsExhausted {
            collection: "tareas",
        })
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(raw)) => raw.trim().is_empty(),
        Some(_) => false,
    }
}

/// Null, empty and non-numeric values become 0.
fn number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        Some(Value::Bool(flag)) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Non-negative whole number; fractions are truncated.
fn count(value: Option<&Value>) -> u32 {
    let n = number(value);
    if n <= 0.0 {
        0
    } else {
        n.min(f64::from(u32::MAX)).trunc() as u32
    }
}

/// Money amount. Whole values stay JSON integers so untouched files compare equal.
fn amount(value: Option<&Value>) -> Value {
    let n = number(value);
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

fn category(value: Option<&Value>) -> SupplyCategory {
    let raw = value
        .and_then(Value::as_str)
        .map(|raw| raw.trim().to_lowercase())
        .unwrap_or_default();
    if FOOD_ALIASES.contains(&raw.as_str()) {
        return SupplyCategory::Food;
    }
    SupplyCategory::parse_wire(&raw).unwrap_or(SupplyCategory::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, value: Value) {
        fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn read(dir: &Path, name: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(dir.join(name)).unwrap()).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        timestamp::parse("2024-05-01T10:00:00.000Z").unwrap()
    }

    fn seed(dir: &Path) {
        write(dir, "empleados.json", json!({"empleados": [{"id": 1, "nombre": "Ana"}]}));
        write(
            dir,
            "pedidos.json",
            json!({"pedidos": [{
                "id": 4,
                "total": "1500",
                "tiempoEstimado": "25",
                "items": [{"producto": "Pizza", "cantidad": "2", "precio": "750.5", "extra": 1}],
                "itemsText": "Pizza x2"
            }]}),
        );
        write(
            dir,
            "insumos.json",
            json!({"insumos": [
                {"id": 1, "nombre": "Lechuga", "categoria": "Verduras", "stock": "3", "stockMinimo": null},
                {"id": 2, "nombre": "Cosa", "categoria": "misc", "stock": 20, "stockMinimo": 5,
                 "unidadMedida": "u", "proveedor": "P", "estado": "disponible",
                 "ultimaActualizacion": "2024-01-01T00:00:00.000Z"}
            ]}),
        );
        write(
            dir,
            "tareas.json",
            json!({"tareas": [
                {"id": 7, "titulo": "Armar", "area": "gestion_pedidos", "empleadoAsignado": 1, "pedidoAsociado": 99},
                {"id": 8, "titulo": "Repartir", "area": "gestion_pedidos", "empleadoAsignado": 5}
            ], "schemaVersion": 3}),
        );
    }

    #[test]
    fn normalizes_every_collection() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());

        let report = DataNormalizer::new(dir.path()).at(fixed_now()).run().unwrap();
        assert_eq!(report.supplies_changed, 2);
        assert_eq!(report.orders_changed, 1);
        assert_eq!(report.tasks_changed, 3);
        assert!(report.inventory_task_added);
        assert_eq!(report.backups.len(), 3);

        let supplies = read(dir.path(), "insumos.json");
        let lettuce = &supplies["insumos"][0];
        assert_eq!(lettuce["categoria"], "alimentos");
        assert_eq!(lettuce["stock"], 3);
        assert_eq!(lettuce["stockMinimo"], 0);
        assert_eq!(lettuce["estado"], "disponible");
        assert_eq!(lettuce["unidadMedida"], "");
        assert_eq!(lettuce["ultimaActualizacion"], "2024-05-01T10:00:00.000Z");
        assert_eq!(supplies["insumos"][1]["categoria"], "otros");
        assert_eq!(supplies["schemaVersion"], 1);

        let orders = read(dir.path(), "pedidos.json");
        let order = &orders["pedidos"][0];
        assert_eq!(order["total"], 1500);
        assert_eq!(order["tiempoEstimado"], 25);
        assert_eq!(order["items"][0], json!({"producto": "Pizza", "cantidad": 2, "precio": 750.5}));
        assert!(order.get("itemsText").is_none());

        let tasks = read(dir.path(), "tareas.json");
        assert_eq!(tasks["schemaVersion"], 3);
        assert_eq!(tasks["tareas"][0]["empleadoAsignado"], 1);
        assert_eq!(tasks["tareas"][0]["pedidoAsociado"], Value::Null);
        assert_eq!(tasks["tareas"][1]["empleadoAsignado"], Value::Null);
        assert_eq!(tasks["tareas"][1]["observaciones"], "");
        assert_eq!(tasks["tareas"][2]["id"], 9);
        assert_eq!(tasks["tareas"][2]["area"], "control_inventario");

        let backup = "tareas.backup.2024-05-01T10-00-00-000Z.json";
        assert_eq!(read(dir.path(), backup)["tareas"][0]["pedidoAsociado"], 99);
        assert!(report.backups.contains(&dir.path().join(backup)));
    }

    #[test]
    fn second_run_changes_nothing() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        DataNormalizer::new(dir.path()).at(fixed_now()).run().unwrap();

        let report = DataNormalizer::new(dir.path()).at(fixed_now()).run().unwrap();
        assert_eq!(report.supplies_changed, 0);
        assert_eq!(report.orders_changed, 0);
        assert_eq!(report.tasks_changed, 0);
        assert!(!report.inventory_task_added);
    }

    #[test]
    fn inventory_task_skips_ids_of_deleted_tasks() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        write(
            dir.path(),
            "tareas.json",
            json!({"tareas": [{"id": 2, "titulo": "Armar", "area": "gestion_pedidos"}], "ultimoId": 11}),
        );

        DataNormalizer::new(dir.path()).at(fixed_now()).run().unwrap();

        let tasks = read(dir.path(), "tareas.json");
        assert_eq!(tasks["tareas"][1]["id"], 12);
        assert_eq!(tasks["ultimoId"], 11);
    }

    #[test]
    fn dry_run_leaves_files_alone() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        let before = fs::read_to_string(dir.path().join("pedidos.json")).unwrap();

        let report = DataNormalizer::new(dir.path()).dry_run(true).run().unwrap();
        assert!(report.dry_run);
        assert_eq!(report.orders_changed, 1);
        assert!(report.backups.is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("pedidos.json")).unwrap(), before);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[test]
    fn missing_or_malformed_file_aborts() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        fs::remove_file(dir.path().join("insumos.json")).unwrap();
        assert!(matches!(
            DataNormalizer::new(dir.path()).run(),
            Err(StoreError::Io { .. })
        ));

        fs::write(dir.path().join("insumos.json"), "{ nope").unwrap();
        assert!(matches!(
            DataNormalizer::new(dir.path()).run(),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn coercions_default_to_zero() {
        assert_eq!(count(Some(&json!("abc"))), 0);
        assert_eq!(count(Some(&json!(-4))), 0);
        assert_eq!(count(Some(&json!(2.9))), 2);
        assert_eq!(count(None), 0);
        assert_eq!(amount(Some(&json!(""))), json!(0));
        assert_eq!(amount(Some(&json!("12.25"))), json!(12.25));
    }
}
