use super::ClientRepository;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateOrder, DEFAULT_ESTIMATED_MINUTES, Order, OrderPatch, OrderStats, OrderStatus, OrderType,
    Platform, items_total, optional_text, timestamp, validate_items, validate_total,
};
use crate::store::{Collection, RecordStore};
use std::sync::Arc;
use tracing::info;

pub struct OrderRepository {
    records: Collection<Order>,
    clients: Arc<ClientRepository>,
}

fn ensure_client(order: &Order) -> AppResult<()> {
    let has_name = order
        .client_name
        .as_deref()
        .is_some_and(|name| !name.trim().is_empty());
    if order.client_id.is_none() && !has_name {
        return Err(AppError::validation(
            "an order needs a client: clienteId or cliente",
        ));
    }
    Ok(())
}

impl OrderRepository {
    pub fn new(store: Arc<dyn RecordStore<Order>>, clients: Arc<ClientRepository>) -> Self {
        Self {
            records: Collection::new(store),
            clients,
        }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Order>> {
        self.records.load().await
    }

    pub async fn get_by_id(&self, id: u64) -> AppResult<Option<Order>> {
        self.records.find(id).await
    }

    pub async fn get_by_type(&self, order_type: OrderType) -> AppResult<Vec<Order>> {
        self.records.filter(|o| o.order_type == order_type).await
    }

    pub async fn get_by_platform(&self, platform: Platform) -> AppResult<Vec<Order>> {
        self.records.filter(|o| o.platform == platform).await
    }

    pub async fn get_by_status(&self, status: OrderStatus) -> AppResult<Vec<Order>> {
        self.records.filter(|o| o.status == status).await
    }

    /// Creates an order. Without an explicit `total` the sum of the items is used.
    pub async fn create(&self, data: CreateOrder) -> AppResult<Order> {
        validate_items(&data.items)?;
        if let Some(total) = data.total {
            validate_total(total)?;
        }
        let total = data.total.unwrap_or_else(|| items_total(&data.items));

        let order = self
            .records
            .insert_with(|id, _| {
                let order = Order {
                    id,
                    order_number: optional_text(data.order_number)
                        .unwrap_or_else(|| Order::default_number(id)),
                    client_id: data.client_id,
                    client_name: optional_text(data.client_name),
                    items: data.items,
                    total,
                    order_type: data.order_type,
                    platform: data.platform,
                    status: data.status.unwrap_or_default(),
                    created_at: timestamp::now(),
                    estimated_minutes: data.estimated_minutes.unwrap_or(DEFAULT_ESTIMATED_MINUTES),
                    notes: data.notes.unwrap_or_default(),
                };
                ensure_client(&order)?;
                Ok(order)
            })
            .await?;

        info!(id = order.id, number = %order.order_number, "order created");
        Ok(order)
    }

    /// Merges `patch`. New items without a new total recompute the total.
    pub async fn update(&self, id: u64, patch: OrderPatch) -> AppResult<Order> {
        if let Some(items) = &patch.items {
            validate_items(items)?;
        }
        if let Some(total) = patch.total {
            validate_total(total)?;
        }

        let order = self
            .records
            .update_with(id, |order, _| {
                if let Some(number) = optional_text(patch.order_number) {
                    order.order_number = number;
                }
                if let Some(client_id) = patch.client_id {
                    order.client_id = client_id;
                }
                if let Some(client_name) = patch.client_name {
                    order.client_name = optional_text(client_name);
                }
                match (patch.items, patch.total) {
                    (Some(items), None) => {
                        order.total = items_total(&items);
                        order.items = items;
                    }
                    (items, total) => {
                        if let Some(items) = items {
                            order.items = items;
                        }
                        if let Some(total) = total {
                            order.total = total;
                        }
                    }
                }
                if let Some(order_type) = patch.order_type {
                    order.order_type = order_type;
                }
                if let Some(platform) = patch.platform {
                    order.platform = platform;
                }
                if let Some(status) = patch.status {
                    order.status = status;
                }
                if let Some(minutes) = patch.estimated_minutes {
                    order.estimated_minutes = minutes;
                }
                if let Some(notes) = patch.notes {
                    order.notes = notes;
                }
                ensure_client(order)
            })
            .await?;

        info!(id, status = %order.status, "order updated");
        Ok(order)
    }

    pub async fn delete(&self, id: u64) -> AppResult<Order> {
        let order = self.records.remove(id).await?;
        info!(id, "order deleted");
        Ok(order)
    }

    pub async fn stats(&self) -> AppResult<OrderStats> {
        Ok(OrderStats::of(&self.get_all().await?))
    }

    /// Name to show for the order's customer: the linked client, else the legacy
    /// inline name, else a placeholder with the dangling client id.
    pub async fn client_display_name(&self, order: &Order) -> AppResult<String> {
        if let Some(client_id) = order.client_id {
            if let Some(name) = self.clients.display_name(client_id).await? {
                return Ok(name);
            }
        }
        if let Some(name) = order
            .client_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            return Ok(name.to_string());
        }
        Ok(match order.client_id {
            Some(client_id) => format!("Cliente #{client_id}"),
            None => "Sin cliente".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, OrderItem};
    use crate::store::MemoryStore;

    fn item(product: &str, quantity: u32, unit_price: f64) -> OrderItem {
        OrderItem {
            product: product.to_string(),
            quantity,
            unit_price,
        }
    }

    fn new_order() -> CreateOrder {
        CreateOrder {
            order_number: None,
            client_id: Some(1),
            client_name: None,
            items: vec![item("Milanesa", 2, 4500.0), item("Agua", 1, 900.0)],
            total: None,
            order_type: OrderType::Delivery,
            platform: Platform::Rappi,
            status: None,
            estimated_minutes: None,
            notes: None,
        }
    }

    fn repo() -> OrderRepository {
        let clients = ClientRepository::new(Arc::new(MemoryStore::with_records(vec![Client {
            id: 1,
            first_name: "Juan".to_string(),
            last_name: "Pérez".to_string(),
            email: "juan@mail.com".to_string(),
            phone: None,
        }])));
        OrderRepository::new(Arc::new(MemoryStore::<Order>::new()), Arc::new(clients))
    }

    #[tokio::test]
    async fn create_fills_defaults() {
        let repo = repo();

        let order = repo.create(new_order()).await.unwrap();

        assert_eq!(order.id, 1);
        assert_eq!(order.order_number, "ORD-001");
        assert_eq!(order.total, 9900.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.estimated_minutes, 30);
    }

    #[tokio::test]
    async fn create_requires_client_and_items() {
        let repo = repo();

        let mut no_client = new_order();
        no_client.client_id = None;
        no_client.client_name = Some(" ".to_string());
        assert!(matches!(repo.create(no_client).await, Err(AppError::Validation(_))));

        let mut no_items = new_order();
        no_items.items.clear();
        assert!(matches!(repo.create(no_items).await, Err(AppError::Validation(_))));

        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn any_status_can_be_set_directly() {
        let repo = repo();
        repo.create(new_order()).await.unwrap();

        let order = repo
            .update(
                1,
                OrderPatch {
                    status: Some(OrderStatus::Closed),
                    ..OrderPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Closed);

        let order = repo
            .update(
                1,
                OrderPatch {
                    status: Some(OrderStatus::Pending),
                    ..OrderPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn new_items_recompute_total_unless_total_given() {
        let repo = repo();
        repo.create(new_order()).await.unwrap();

        let order = repo
            .update(
                1,
                OrderPatch {
                    items: Some(vec![item("Pizza", 1, 8000.0)]),
                    ..OrderPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(order.total, 8000.0);

        let order = repo
            .update(
                1,
                OrderPatch {
                    items: Some(vec![item("Pizza", 2, 8000.0)]),
                    total: Some(15000.0),
                    ..OrderPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(order.total, 15000.0);
    }

    #[tokio::test]
    async fn client_display_name_falls_back() {
        let repo = repo();
        let mut order = repo.create(new_order()).await.unwrap();
        assert_eq!(repo.client_display_name(&order).await.unwrap(), "Juan Pérez");

        order.client_id = Some(77);
        assert_eq!(repo.client_display_name(&order).await.unwrap(), "Cliente #77");

        order.client_name = Some("Mesa 3".to_string());
        assert_eq!(repo.client_display_name(&order).await.unwrap(), "Mesa 3");
    }

    #[tokio::test]
    async fn stats_count_every_bucket() {
        let repo = repo();
        repo.create(new_order()).await.unwrap();
        let mut in_person = new_order();
        in_person.order_type = OrderType::InPerson;
        in_person.platform = Platform::Local;
        repo.create(in_person).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_type.get(OrderType::Delivery), 1);
        assert_eq!(stats.by_platform.get(Platform::PedidosYa), 0);
        assert_eq!(stats.by_status.get(OrderStatus::Pending), 2);
    }
}
