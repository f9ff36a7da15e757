use super::{double_option, timestamp, wire_enum};
use crate::error::{AppError, AppResult};
use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

wire_enum! {
    TaskArea as "task area" {
        OrderHandling => "gestion_pedidos",
        InventoryControl => "control_inventario",
    }
}

wire_enum! {
    /// Linear lifecycle: pending, then in progress, then finished.
    TaskStatus as "task status" {
        Pending => "pendiente",
        InProgress => "en_proceso",
        Finished => "finalizada",
    }
}

wire_enum! {
    #[derive(Default)]
    Priority as "priority" {
        High => "alta",
        #[default]
        Medium => "media",
        Low => "baja",
    }
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Finished => 2,
        }
    }

    /// Staying put or moving exactly one step forward.
    pub fn can_become(self, next: TaskStatus) -> bool {
        next.rank() == self.rank() || next.rank() == self.rank() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    pub area: TaskArea,
    #[serde(rename = "estado")]
    pub status: TaskStatus,
    #[serde(rename = "prioridad", default)]
    pub priority: Priority,
    #[serde(rename = "empleadoAsignado", default)]
    pub assigned_employee: Option<u64>,
    #[serde(rename = "pedidoAsociado", default)]
    pub order_id: Option<u64>,
    #[serde(rename = "fechaCreacion", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fechaInicio", default, with = "timestamp::option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "fechaFinalizacion", default, with = "timestamp::option")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(rename = "observaciones", default)]
    pub notes: String,
}

impl Task {
    /// Moves the task to `next`, stamping the start and finish times the first time
    /// each state is reached.
    pub fn advance(&mut self, next: TaskStatus, now: DateTime<Utc>) -> AppResult<()> {
        if !self.status.can_become(next) {
            return Err(AppError::validation(format!(
                "task {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        self.status = next;
        match next {
            TaskStatus::InProgress if self.started_at.is_none() => self.started_at = Some(now),
            TaskStatus::Finished if self.finished_at.is_none() => self.finished_at = Some(now),
            _ => {}
        }
        Ok(())
    }
}

impl Record for Task {
    const COLLECTION: &'static str = "tareas";
    const LABEL: &'static str = "task";

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTask {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    pub area: TaskArea,
    #[serde(rename = "prioridad", default)]
    pub priority: Option<Priority>,
    #[serde(rename = "empleadoAsignado", default)]
    pub assigned_employee: Option<u64>,
    #[serde(rename = "pedidoAsociado", default)]
    pub order_id: Option<u64>,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    pub area: Option<TaskArea>,
    #[serde(rename = "estado")]
    pub status: Option<TaskStatus>,
    #[serde(rename = "prioridad")]
    pub priority: Option<Priority>,
    #[serde(
        rename = "empleadoAsignado",
        default,
        deserialize_with = "double_option::deserialize"
    )]
    pub assigned_employee: Option<Option<u64>>,
    #[serde(
        rename = "pedidoAsociado",
        default,
        deserialize_with = "double_option::deserialize"
    )]
    pub order_id: Option<Option<u64>>,
    #[serde(rename = "observaciones")]
    pub notes: Option<String>,
}

impl TaskPatch {
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.area.is_some()
            || self.status.is_some()
            || self.priority.is_some()
            || self.assigned_employee.is_some()
            || self.order_id.is_some()
            || self.notes.is_some()
    }
}

/// Body of `PATCH /api/tareas/:id/estado`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskTransition {
    #[serde(rename = "estado")]
    pub status: TaskStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task {
            id: 1,
            title: "Contar harina".to_string(),
            description: String::new(),
            area: TaskArea::InventoryControl,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            assigned_employee: None,
            order_id: None,
            created_at: timestamp::parse("2024-05-01T08:00:00.000Z").unwrap(),
            started_at: None,
            finished_at: None,
            notes: String::new(),
        }
    }

    #[test]
    fn start_time_is_stamped_once() {
        let mut task = task();
        let first = timestamp::parse("2024-05-01T09:00:00.000Z").unwrap();
        let later = timestamp::parse("2024-05-01T09:30:00.000Z").unwrap();

        task.advance(TaskStatus::InProgress, first).unwrap();
        task.advance(TaskStatus::InProgress, later).unwrap();

        assert_eq!(task.started_at, Some(first));
        assert_eq!(task.finished_at, None);
    }

    #[test]
    fn skipping_and_going_back_are_rejected() {
        let now = timestamp::now();
        let mut task = task();
        assert!(task.advance(TaskStatus::Finished, now).is_err());
        assert_eq!(task.status, TaskStatus::Pending);

        task.advance(TaskStatus::InProgress, now).unwrap();
        task.advance(TaskStatus::Finished, now).unwrap();
        assert!(task.advance(TaskStatus::Pending, now).is_err());
        assert_eq!(task.finished_at, Some(now));
    }

    #[test]
    fn stored_task_round_trips_with_nulls() {
        let raw = r#"{"id":1,"titulo":"Contar harina","descripcion":"","area":"control_inventario","estado":"pendiente","prioridad":"media","empleadoAsignado":null,"pedidoAsociado":null,"fechaCreacion":"2024-05-01T08:00:00.000Z","fechaInicio":null,"fechaFinalizacion":null,"observaciones":""}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(serde_json::to_string(&task).unwrap(), raw);
    }
}
