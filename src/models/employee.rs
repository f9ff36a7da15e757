use super::{Tally, double_option, wire_enum};
use crate::store::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

wire_enum! {
    Role as "role" {
        Administrator => "administrador",
        Cook => "cocinero",
        Courier => "repartidor",
        Waiter => "mozo",
        StockClerk => "encargado_stock",
    }
}

wire_enum! {
    EmployeeArea as "area" {
        Kitchen => "cocina",
        Delivery => "reparto",
        DiningRoom => "salon",
        Inventory => "inventario",
        Administration => "administracion",
    }
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "rol")]
    pub role: Role,
    pub area: EmployeeArea,
    #[serde(rename = "fechaIngreso")]
    pub hire_date: NaiveDate,
    #[serde(rename = "activo", default = "active_by_default")]
    pub active: bool,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Employee {
    const COLLECTION: &'static str = "empleados";
    const LABEL: &'static str = "employee";

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEmployee {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "rol")]
    pub role: Role,
    pub area: EmployeeArea,
    #[serde(rename = "fechaIngreso", default)]
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmployeePatch {
    #[serde(rename = "nombre")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(
        rename = "telefono",
        default,
        deserialize_with = "double_option::deserialize"
    )]
    pub phone: Option<Option<String>>,
    #[serde(rename = "rol")]
    pub role: Option<Role>,
    pub area: Option<EmployeeArea>,
    #[serde(rename = "fechaIngreso")]
    pub hire_date: Option<NaiveDate>,
    #[serde(rename = "activo")]
    pub active: Option<bool>,
}

impl EmployeePatch {
    pub fn has_changes(&self) -> bool {
        self.first_name.is_some()
            || self.last_name.is_some()
            || self.email.is_some()
            || self.phone.is_some()
            || self.role.is_some()
            || self.area.is_some()
            || self.hire_date.is_some()
            || self.active.is_some()
    }
}

/// Counts over active employees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeStats {
    pub total: usize,
    #[serde(rename = "porRol")]
    pub by_role: Tally<Role>,
    #[serde(rename = "porArea")]
    pub by_area: Tally<EmployeeArea>,
}

impl EmployeeStats {
    pub fn of(employees: &[Employee]) -> Self {
        Self {
            total: employees.len(),
            by_role: Tally::count(employees.iter().map(|e| e.role)),
            by_area: Tally::count(employees.iter().map(|e| e.area)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_record_without_flags_loads_active() {
        let employee: Employee = serde_json::from_str(
            r#"{"id":3,"nombre":"Ana","apellido":"Paz","email":"ana@resto.com",
                "rol":"cocinero","area":"cocina","fechaIngreso":"2023-02-01"}"#,
        )
        .unwrap();

        assert!(employee.active);
        assert_eq!(employee.phone, None);
        assert_eq!(employee.full_name(), "Ana Paz");
    }

    #[test]
    fn patch_rejects_unknown_keys() {
        let err = serde_json::from_str::<EmployeePatch>(r#"{"sueldo": 10}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn patch_tells_null_phone_from_absent_phone() {
        let cleared: EmployeePatch = serde_json::from_str(r#"{"telefono": null}"#).unwrap();
        let untouched: EmployeePatch = serde_json::from_str(r#"{"nombre": "Eva"}"#).unwrap();

        assert_eq!(cleared.phone, Some(None));
        assert!(cleared.has_changes());
        assert_eq!(untouched.phone, None);
    }
}
