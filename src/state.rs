use std::path::Path;
use std::sync::Arc;

use crate::{
    config::{AppConfig, StorageBackend},
    models::{Client, Employee, Order, Supply, Task},
    repository::{
        ClientRepository, EmployeeRepository, OrderRepository, SupplyRepository, TaskRepository,
    },
    store::{JsonFileStore, MemoryStore, RecordStore},
};

#[derive(Clone)]
pub struct AppState {
    pub employees: Arc<EmployeeRepository>,
    pub tasks: Arc<TaskRepository>,
    pub orders: Arc<OrderRepository>,
    pub supplies: Arc<SupplyRepository>,
    pub clients: Arc<ClientRepository>,
    /// Show storage error detail in 500 responses. Enabled in development.
    pub expose_internal_errors: bool,
}

impl AppState {
    /// Wires the repositories over the given stores. Orders resolve client names and
    /// tasks join on orders, so both share the same repository instances.
    pub fn from_stores(
        employees: Arc<dyn RecordStore<Employee>>,
        tasks: Arc<dyn RecordStore<Task>>,
        orders: Arc<dyn RecordStore<Order>>,
        supplies: Arc<dyn RecordStore<Supply>>,
        clients: Arc<dyn RecordStore<Client>>,
    ) -> Self {
        let clients = Arc::new(ClientRepository::new(clients));
        let orders = Arc::new(OrderRepository::new(orders, clients.clone()));
        Self {
            employees: Arc::new(EmployeeRepository::new(employees)),
            tasks: Arc::new(TaskRepository::new(tasks, orders.clone())),
            orders,
            supplies: Arc::new(SupplyRepository::new(supplies)),
            clients,
            expose_internal_errors: false,
        }
    }

    pub fn with_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// One `<collection>.json` file per entity under `dir`.
    pub fn json_files(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::from_stores(
            Arc::new(JsonFileStore::<Employee>::in_dir(dir)),
            Arc::new(JsonFileStore::<Task>::in_dir(dir)),
            Arc::new(JsonFileStore::<Order>::in_dir(dir)),
            Arc::new(JsonFileStore::<Supply>::in_dir(dir)),
            Arc::new(JsonFileStore::<Client>::in_dir(dir)),
        )
    }

    pub fn in_memory() -> Self {
        Self::from_stores(
            Arc::new(MemoryStore::<Employee>::new()),
            Arc::new(MemoryStore::<Task>::new()),
            Arc::new(MemoryStore::<Order>::new()),
            Arc::new(MemoryStore::<Supply>::new()),
            Arc::new(MemoryStore::<Client>::new()),
        )
    }

    pub fn open(config: &AppConfig) -> Self {
        let state = match config.storage {
            StorageBackend::JsonFiles => Self::json_files(&config.data_dir),
            StorageBackend::Memory => Self::in_memory(),
        };
        state.with_internal_errors(config.expose_internal_errors())
    }
}
