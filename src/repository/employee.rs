use crate::error::{AppError, AppResult};
use crate::models::{
    CreateEmployee, Employee, EmployeeArea, EmployeePatch, EmployeeStats, Role, optional_text,
    required_text, same_email, valid_email,
};
use crate::store::{Collection, RecordStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

pub struct EmployeeRepository {
    records: Collection<Employee>,
}

/// Another active employee already uses `email`.
fn email_taken(records: &[Employee], email: &str, exclude: Option<u64>) -> bool {
    records
        .iter()
        .any(|e| e.active && Some(e.id) != exclude && same_email(&e.email, email))
}

fn email_conflict(email: &str) -> AppError {
    AppError::conflict(format!("email {email} is already in use"))
}

impl EmployeeRepository {
    pub fn new(store: Arc<dyn RecordStore<Employee>>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Employee>> {
        self.records.load().await
    }

    pub async fn get_by_id(&self, id: u64) -> AppResult<Option<Employee>> {
        self.records.find(id).await
    }

    pub async fn get_active(&self) -> AppResult<Vec<Employee>> {
        self.records.filter(|e| e.active).await
    }

    pub async fn get_by_role(&self, role: Role) -> AppResult<Vec<Employee>> {
        debug!(%role, "employees by role");
        self.records.filter(|e| e.active && e.role == role).await
    }

    pub async fn get_by_area(&self, area: EmployeeArea) -> AppResult<Vec<Employee>> {
        debug!(%area, "employees by area");
        self.records.filter(|e| e.active && e.area == area).await
    }

    pub async fn is_email_available(&self, email: &str, exclude: Option<u64>) -> AppResult<bool> {
        let records = self.records.load().await?;
        Ok(!email_taken(&records, email, exclude))
    }

    pub async fn create(&self, data: CreateEmployee) -> AppResult<Employee> {
        let first_name = required_text("nombre", &data.first_name)?;
        let last_name = required_text("apellido", &data.last_name)?;
        let email = valid_email(&data.email)?;

        let employee = self
            .records
            .insert_with(|id, records| {
                if email_taken(records, &email, None) {
                    return Err(email_conflict(&email));
                }
                Ok(Employee {
                    id,
                    first_name,
                    last_name,
                    email,
                    phone: optional_text(data.phone),
                    role: data.role,
                    area: data.area,
                    hire_date: data.hire_date.unwrap_or_else(|| Utc::now().date_naive()),
                    active: true,
                })
            })
            .await?;

        info!(id = employee.id, role = %employee.role, "employee created");
        Ok(employee)
    }

    /// Merges `patch`. The email is re-checked when it changes or when the employee
    /// is reactivated.
    pub async fn update(&self, id: u64, patch: EmployeePatch) -> AppResult<Employee> {
        let first_name = patch
            .first_name
            .as_deref()
            .map(|name| required_text("nombre", name))
            .transpose()?;
        let last_name = patch
            .last_name
            .as_deref()
            .map(|name| required_text("apellido", name))
            .transpose()?;
        let email = patch.email.as_deref().map(valid_email).transpose()?;

        let employee = self
            .records
            .update_with(id, |employee, records| {
                let email_changed = email
                    .as_deref()
                    .is_some_and(|email| !same_email(email, &employee.email));
                let reactivated = patch.active == Some(true) && !employee.active;

                if let Some(first_name) = first_name {
                    employee.first_name = first_name;
                }
                if let Some(last_name) = last_name {
                    employee.last_name = last_name;
                }
                if let Some(email) = email {
                    employee.email = email;
                }
                if let Some(phone) = patch.phone {
                    employee.phone = optional_text(phone);
                }
                if let Some(role) = patch.role {
                    employee.role = role;
                }
                if let Some(area) = patch.area {
                    employee.area = area;
                }
                if let Some(hire_date) = patch.hire_date {
                    employee.hire_date = hire_date;
                }
                if let Some(active) = patch.active {
                    employee.active = active;
                }

                if employee.active
                    && (email_changed || reactivated)
                    && email_taken(records, &employee.email, Some(employee.id))
                {
                    return Err(email_conflict(&employee.email));
                }
                Ok(())
            })
            .await?;

        info!(id, "employee updated");
        Ok(employee)
    }

    /// Soft delete: the record stays, flagged inactive.
    pub async fn deactivate(&self, id: u64) -> AppResult<Employee> {
        let employee = self
            .records
            .update_with(id, |employee, _| {
                employee.active = false;
                Ok(())
            })
            .await?;
        info!(id, "employee deactivated");
        Ok(employee)
    }

    pub async fn remove(&self, id: u64) -> AppResult<Employee> {
        let employee = self.records.remove(id).await?;
        info!(id, "employee removed");
        Ok(employee)
    }

    pub async fn stats(&self) -> AppResult<EmployeeStats> {
        Ok(EmployeeStats::of(&self.get_active().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn employee(id: u64, email: &str, active: bool) -> Employee {
        Employee {
            id,
            first_name: "Ana".to_string(),
            last_name: "Paz".to_string(),
            email: email.to_string(),
            phone: None,
            role: Role::Cook,
            area: EmployeeArea::Kitchen,
            hire_date: NaiveDate::from_ymd_opt(2023, 1, 10).unwrap(),
            active,
        }
    }

    fn repo(seed: Vec<Employee>) -> EmployeeRepository {
        EmployeeRepository::new(Arc::new(MemoryStore::with_records(seed)))
    }

    fn new_employee(email: &str) -> CreateEmployee {
        CreateEmployee {
            first_name: "Luis".to_string(),
            last_name: "Gómez".to_string(),
            email: email.to_string(),
            phone: Some("  ".to_string()),
            role: Role::Waiter,
            area: EmployeeArea::DiningRoom,
            hire_date: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_next_id_and_defaults() {
        let repo = repo(vec![employee(4, "ana@resto.com", true)]);

        let created = repo.create(new_employee(" luis@resto.com ")).await.unwrap();

        assert_eq!(created.id, 5);
        assert_eq!(created.email, "luis@resto.com");
        assert_eq!(created.phone, None);
        assert!(created.active);
        assert_eq!(created.hire_date, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn duplicate_active_email_is_a_conflict_regardless_of_case() {
        let repo = repo(vec![employee(1, "ana@resto.com", true)]);

        let err = repo.create(new_employee("ANA@resto.com")).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inactive_employee_frees_the_email() {
        let repo = repo(vec![employee(1, "ana@resto.com", false)]);

        assert!(repo.is_email_available("ana@resto.com", None).await.unwrap());
        assert_eq!(repo.create(new_employee("ana@resto.com")).await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn reactivating_rechecks_email() {
        let repo = repo(vec![
            employee(1, "ana@resto.com", false),
            employee(2, "ana@resto.com", true),
        ]);

        let err = repo
            .update(
                1,
                EmployeePatch {
                    active: Some(true),
                    ..EmployeePatch::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert!(!repo.get_by_id(1).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn keeping_own_email_is_not_a_conflict() {
        let repo = repo(vec![employee(1, "ana@resto.com", true)]);

        let updated = repo
            .update(
                1,
                EmployeePatch {
                    email: Some("Ana@Resto.com".to_string()),
                    role: Some(Role::StockClerk),
                    ..EmployeePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role, Role::StockClerk);
    }

    #[tokio::test]
    async fn blank_name_and_bad_email_are_rejected() {
        let repo = repo(Vec::new());
        let mut data = new_employee("luis@resto.com");
        data.first_name = "   ".to_string();
        assert!(matches!(repo.create(data).await, Err(AppError::Validation(_))));
        assert!(matches!(
            repo.create(new_employee("luis@resto")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deactivate_keeps_record_and_remove_drops_it() {
        let repo = repo(vec![employee(1, "a@r.com", true), employee(2, "b@r.com", true)]);

        repo.deactivate(1).await.unwrap();
        repo.remove(2).await.unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
        assert!(repo.get_active().await.unwrap().is_empty());
        assert!(matches!(repo.remove(2).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn role_and_area_lookups_skip_inactive() {
        let repo = repo(vec![employee(1, "a@r.com", true), employee(2, "b@r.com", false)]);

        assert_eq!(repo.get_by_role(Role::Cook).await.unwrap().len(), 1);
        assert_eq!(repo.get_by_area(EmployeeArea::Kitchen).await.unwrap().len(), 1);

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.by_role.get(Role::Cook), 1);
        assert_eq!(stats.by_area.get(EmployeeArea::Delivery), 0);
    }
}
