//! Entity repositories. Each one wraps a [`Collection`](crate::store::Collection) and
//! re-reads its backing array on every call.

mod client;
mod employee;
mod order;
mod supply;
mod task;

pub use client::ClientRepository;
pub use employee::EmployeeRepository;
pub use order::OrderRepository;
pub use supply::SupplyRepository;
pub use task::TaskRepository;
