use super::OrderRepository;
use crate::error::AppResult;
use crate::models::{
    CreateTask, Task, TaskArea, TaskFilter, TaskPatch, TaskStatus, required_text, timestamp,
};
use crate::store::{Collection, RecordStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct TaskRepository {
    records: Collection<Task>,
    orders: Arc<OrderRepository>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn RecordStore<Task>>, orders: Arc<OrderRepository>) -> Self {
        Self {
            records: Collection::new(store),
            orders,
        }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Task>> {
        self.records.load().await
    }

    pub async fn get_by_id(&self, id: u64) -> AppResult<Option<Task>> {
        self.records.find(id).await
    }

    pub async fn get_by_status(&self, status: TaskStatus) -> AppResult<Vec<Task>> {
        self.records.filter(|t| t.status == status).await
    }

    pub async fn get_by_area(&self, area: TaskArea) -> AppResult<Vec<Task>> {
        self.records.filter(|t| t.area == area).await
    }

    pub async fn get_by_employee(&self, employee_id: u64) -> AppResult<Vec<Task>> {
        self.records
            .filter(|t| t.assigned_employee == Some(employee_id))
            .await
    }

    /// Conjunction of every criterion in `criteria`. An order-type or platform
    /// criterion keeps tasks without an order plus tasks whose order matches it.
    pub async fn filter(&self, criteria: &TaskFilter) -> AppResult<Vec<Task>> {
        let mut tasks = self.records.filter(|t| criteria.matches(t)).await?;

        if criteria.filters_orders() {
            let order_ids: HashSet<u64> = self
                .orders
                .get_all()
                .await?
                .into_iter()
                .filter(|o| {
                    criteria.order_type.is_none_or(|kind| o.order_type == kind)
                        && criteria.platform.is_none_or(|platform| o.platform == platform)
                })
                .map(|o| o.id)
                .collect();
            tasks.retain(|t| t.order_id.is_none_or(|id| order_ids.contains(&id)));
        }

        if let Some(limit) = criteria.limit {
            tasks.truncate(limit);
        }
        debug!(count = tasks.len(), "tasks filtered");
        Ok(tasks)
    }

    /// New tasks always start pending.
    pub async fn create(&self, data: CreateTask) -> AppResult<Task> {
        let title = required_text("titulo", &data.title)?;

        let task = self
            .records
            .insert_with(|id, _| {
                Ok(Task {
                    id,
                    title,
                    description: data.description.unwrap_or_default(),
                    area: data.area,
                    status: TaskStatus::Pending,
                    priority: data.priority.unwrap_or_default(),
                    assigned_employee: data.assigned_employee,
                    order_id: data.order_id,
                    created_at: timestamp::now(),
                    started_at: None,
                    finished_at: None,
                    notes: data.notes.unwrap_or_default(),
                })
            })
            .await?;

        info!(id = task.id, area = %task.area, "task created");
        Ok(task)
    }

    /// Merges `patch`. A status change follows the same rules as [`Self::transition`].
    pub async fn update(&self, id: u64, patch: TaskPatch) -> AppResult<Task> {
        let title = patch
            .title
            .as_deref()
            .map(|title| required_text("titulo", title))
            .transpose()?;

        let task = self
            .records
            .update_with(id, |task, _| {
                if let Some(status) = patch.status {
                    task.advance(status, timestamp::now())?;
                }
                if let Some(title) = title {
                    task.title = title;
                }
                if let Some(description) = patch.description {
                    task.description = description;
                }
                if let Some(area) = patch.area {
                    task.area = area;
                }
                if let Some(priority) = patch.priority {
                    task.priority = priority;
                }
                if let Some(employee) = patch.assigned_employee {
                    task.assigned_employee = employee;
                }
                if let Some(order_id) = patch.order_id {
                    task.order_id = order_id;
                }
                if let Some(notes) = patch.notes {
                    task.notes = notes.trim().to_string();
                }
                Ok(())
            })
            .await?;

        info!(id, status = %task.status, "task updated");
        Ok(task)
    }

    pub async fn transition(&self, id: u64, status: TaskStatus) -> AppResult<Task> {
        let task = self
            .records
            .update_with(id, |task, _| task.advance(status, timestamp::now()))
            .await?;
        info!(id, %status, "task status changed");
        Ok(task)
    }

    pub async fn delete(&self, id: u64) -> AppResult<Task> {
        let task = self.records.remove(id).await?;
        info!(id, "task deleted");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Order, OrderItem, OrderStatus, OrderType, Platform, Priority};
    use crate::repository::ClientRepository;
    use crate::store::MemoryStore;

    fn task(id: u64, area: TaskArea, order_id: Option<u64>) -> Task {
        Task {
            id,
            title: format!("tarea {id}"),
            description: String::new(),
            area,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            assigned_employee: None,
            order_id,
            created_at: timestamp::parse(&format!("2024-05-{:02}T10:00:00.000Z", id)).unwrap(),
            started_at: None,
            finished_at: None,
            notes: String::new(),
        }
    }

    fn order(id: u64, order_type: OrderType, platform: Platform) -> Order {
        Order {
            id,
            order_number: Order::default_number(id),
            client_id: None,
            client_name: Some("Mesa 1".to_string()),
            items: vec![OrderItem {
                product: "Café".to_string(),
                quantity: 1,
                unit_price: 1500.0,
            }],
            total: 1500.0,
            order_type,
            platform,
            status: OrderStatus::Pending,
            created_at: timestamp::now(),
            estimated_minutes: 30,
            notes: String::new(),
        }
    }

    fn repo(tasks: Vec<Task>, orders: Vec<Order>) -> TaskRepository {
        let clients = Arc::new(ClientRepository::new(Arc::new(MemoryStore::<
            crate::models::Client,
        >::new())));
        let orders = Arc::new(OrderRepository::new(
            Arc::new(MemoryStore::with_records(orders)),
            clients,
        ));
        TaskRepository::new(Arc::new(MemoryStore::with_records(tasks)), orders)
    }

    fn seeded() -> TaskRepository {
        repo(
            vec![
                task(1, TaskArea::OrderHandling, Some(10)),
                task(2, TaskArea::OrderHandling, Some(11)),
                task(3, TaskArea::InventoryControl, None),
                task(4, TaskArea::OrderHandling, Some(99)),
            ],
            vec![
                order(10, OrderType::Delivery, Platform::Rappi),
                order(11, OrderType::InPerson, Platform::Local),
            ],
        )
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[tokio::test]
    async fn area_filter_returns_exact_subset() {
        let repo = seeded();
        let criteria = TaskFilter {
            area: Some(TaskArea::OrderHandling),
            ..TaskFilter::default()
        };

        assert_eq!(ids(&repo.filter(&criteria).await.unwrap()), [1, 2, 4]);
        assert_eq!(
            ids(&repo.get_by_area(TaskArea::InventoryControl).await.unwrap()),
            [3]
        );
    }

    #[tokio::test]
    async fn order_type_keeps_unlinked_tasks_and_matching_orders() {
        let repo = seeded();
        let criteria = TaskFilter {
            order_type: Some(OrderType::Delivery),
            ..TaskFilter::default()
        };

        assert_eq!(ids(&repo.filter(&criteria).await.unwrap()), [1, 3]);
    }

    #[tokio::test]
    async fn combined_criteria_are_conjunctive() {
        let repo = seeded();
        let criteria = TaskFilter {
            area: Some(TaskArea::OrderHandling),
            platform: Some(Platform::Local),
            ..TaskFilter::default()
        };

        assert_eq!(ids(&repo.filter(&criteria).await.unwrap()), [2]);
    }

    #[tokio::test]
    async fn limit_truncates() {
        let repo = seeded();
        let criteria = TaskFilter {
            limit: Some(2),
            ..TaskFilter::default()
        };

        assert_eq!(ids(&repo.filter(&criteria).await.unwrap()), [1, 2]);
    }

    #[tokio::test]
    async fn start_time_is_set_once_through_the_repository() {
        let repo = seeded();

        let started = repo.transition(3, TaskStatus::InProgress).await.unwrap();
        let first_start = started.started_at.unwrap();
        let again = repo
            .update(
                3,
                TaskPatch {
                    status: Some(TaskStatus::InProgress),
                    notes: Some("revisar".to_string()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(again.started_at, Some(first_start));
        assert_eq!(again.notes, "revisar");
    }

    #[tokio::test]
    async fn invalid_transition_is_rejected_without_saving() {
        let repo = seeded();

        let err = repo.transition(1, TaskStatus::Finished).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            repo.get_by_id(1).await.unwrap().unwrap().status,
            TaskStatus::Pending
        );
    }

    #[tokio::test]
    async fn create_starts_pending_with_default_priority() {
        let repo = repo(Vec::new(), Vec::new());

        let task = repo
            .create(CreateTask {
                title: "Controlar freezer".to_string(),
                description: None,
                area: TaskArea::InventoryControl,
                priority: None,
                assigned_employee: Some(3),
                order_id: None,
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(task.id, 1);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(ids(&repo.get_by_employee(3).await.unwrap()), [1]);
    }
}
