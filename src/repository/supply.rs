use crate::error::{AppError, AppResult};
use crate::models::{
    CreateSupply, DEFAULT_MIN_STOCK, Supply, SupplyAlert, SupplyCategory, SupplyPatch,
    SupplyStatus, optional_text, required_text, timestamp,
};
use crate::store::{Collection, RecordStore, not_found};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SupplyRepository {
    records: Collection<Supply>,
}

/// Single path for every stock change, so status and timestamp never drift.
fn apply_stock(supply: &mut Supply, stock: u32) {
    supply.stock = stock;
    supply.touch_levels(timestamp::now());
}

impl SupplyRepository {
    pub fn new(store: Arc<dyn RecordStore<Supply>>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Supply>> {
        self.records.load().await
    }

    pub async fn get_by_id(&self, id: u64) -> AppResult<Option<Supply>> {
        self.records.find(id).await
    }

    pub async fn get_low_stock(&self) -> AppResult<Vec<Supply>> {
        self.records.filter(Supply::is_low).await
    }

    pub async fn get_by_category(&self, category: SupplyCategory) -> AppResult<Vec<Supply>> {
        self.records.filter(|s| s.category == category).await
    }

    pub async fn alerts(&self) -> AppResult<Vec<SupplyAlert>> {
        Ok(self
            .get_low_stock()
            .await?
            .iter()
            .map(SupplyAlert::from)
            .collect())
    }

    pub async fn create(&self, data: CreateSupply) -> AppResult<Supply> {
        let name = required_text("nombre", &data.name)?;
        let stock = data.stock.unwrap_or(0);
        let min_stock = data.min_stock.unwrap_or(DEFAULT_MIN_STOCK);

        let supply = self
            .records
            .insert_with(|id, _| {
                Ok(Supply {
                    id,
                    name,
                    category: data.category,
                    stock,
                    min_stock,
                    unit: optional_text(data.unit).unwrap_or_default(),
                    supplier: optional_text(data.supplier).unwrap_or_default(),
                    updated_at: timestamp::now(),
                    status: SupplyStatus::for_levels(stock, min_stock),
                })
            })
            .await?;

        info!(id = supply.id, status = %supply.status, "supply created");
        Ok(supply)
    }

    /// Merges `patch`; a stock or threshold change recomputes status and timestamp.
    pub async fn update(&self, id: u64, patch: SupplyPatch) -> AppResult<Supply> {
        let name = patch
            .name
            .as_deref()
            .map(|name| required_text("nombre", name))
            .transpose()?;
        let touches_levels = patch.touches_levels();

        let supply = self
            .records
            .update_with(id, |supply, _| {
                if let Some(name) = name {
                    supply.name = name;
                }
                if let Some(category) = patch.category {
                    supply.category = category;
                }
                if let Some(min_stock) = patch.min_stock {
                    supply.min_stock = min_stock;
                }
                if let Some(unit) = patch.unit {
                    supply.unit = unit.trim().to_string();
                }
                if let Some(supplier) = patch.supplier {
                    supply.supplier = supplier.trim().to_string();
                }
                if touches_levels {
                    let stock = patch.stock.unwrap_or(supply.stock);
                    apply_stock(supply, stock);
                }
                Ok(())
            })
            .await?;

        info!(id, "supply updated");
        Ok(supply)
    }

    pub async fn set_stock(&self, id: u64, stock: u32) -> AppResult<Supply> {
        let supply = self
            .records
            .update_with(id, |supply, _| {
                apply_stock(supply, stock);
                Ok(())
            })
            .await?;
        info!(id, stock, status = %supply.status, "stock set");
        Ok(supply)
    }

    /// Takes `quantity` units out of stock. Asking for more than is available fails
    /// with `InsufficientStock` and leaves the record unchanged.
    pub async fn discount_stock(&self, id: u64, quantity: u32) -> AppResult<Supply> {
        if quantity == 0 {
            return Err(AppError::validation("cantidad must be a positive integer"));
        }

        let supply = self
            .records
            .mutate(|records| {
                let supply = records
                    .iter_mut()
                    .find(|supply| supply.id == id)
                    .ok_or_else(|| not_found::<Supply>(id))?;
                if quantity > supply.stock {
                    warn!(id, requested = quantity, available = supply.stock, "insufficient stock");
                    return Err(AppError::InsufficientStock {
                        requested: quantity,
                        available: supply.stock,
                    });
                }
                let remaining = supply.stock - quantity;
                apply_stock(supply, remaining);
                Ok(supply.clone())
            })
            .await?;

        info!(id, quantity, stock = supply.stock, "stock discounted");
        Ok(supply)
    }

    pub async fn delete(&self, id: u64) -> AppResult<Supply> {
        let supply = self.records.remove(id).await?;
        info!(id, "supply deleted");
        Ok(supply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn supply(id: u64, stock: u32, min_stock: u32) -> Supply {
        Supply {
            id,
            name: format!("insumo {id}"),
            category: SupplyCategory::Food,
            stock,
            min_stock,
            unit: "kg".to_string(),
            supplier: "Molinos".to_string(),
            updated_at: timestamp::parse("2024-01-01T00:00:00.000Z").unwrap(),
            status: SupplyStatus::for_levels(stock, min_stock),
        }
    }

    fn repo(seed: Vec<Supply>) -> (Arc<MemoryStore<Supply>>, SupplyRepository) {
        let store = Arc::new(MemoryStore::with_records(seed));
        (store.clone(), SupplyRepository::new(store))
    }

    #[tokio::test]
    async fn discount_larger_than_stock_leaves_record_untouched() {
        let (store, repo) = repo(vec![supply(1, 3, 5)]);
        let before = store.load().await.unwrap();

        let err = repo.discount_stock(1, 4).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::InsufficientStock {
                requested: 4,
                available: 3
            }
        ));
        assert_eq!(store.load().await.unwrap(), before);
    }

    #[tokio::test]
    async fn discount_subtracts_exactly_and_recomputes_status() {
        let (_, repo) = repo(vec![supply(1, 10, 5)]);

        let after = repo.discount_stock(1, 5).await.unwrap();
        assert_eq!(after.stock, 5);
        assert_eq!(after.status, SupplyStatus::Low);
        assert!(after.updated_at > supply(1, 10, 5).updated_at);

        let empty = repo.discount_stock(1, 5).await.unwrap();
        assert_eq!(empty.stock, 0);
        assert_eq!(empty.status, SupplyStatus::OutOfStock);
    }

    #[tokio::test]
    async fn discount_of_missing_supply_is_not_found() {
        let (_, repo) = repo(Vec::new());
        assert!(matches!(
            repo.discount_stock(9, 1).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.discount_stock(9, 0).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn raising_threshold_recomputes_status() {
        let (_, repo) = repo(vec![supply(1, 8, 5)]);

        let updated = repo
            .update(
                1,
                SupplyPatch {
                    min_stock: Some(10),
                    ..SupplyPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.stock, 8);
        assert_eq!(updated.status, SupplyStatus::Low);
    }

    #[tokio::test]
    async fn create_defaults_threshold_and_status() {
        let (_, repo) = repo(Vec::new());

        let created = repo
            .create(CreateSupply {
                name: "Lavandina".to_string(),
                category: SupplyCategory::Cleaning,
                stock: Some(12),
                min_stock: None,
                unit: None,
                supplier: Some(" Limpio SA ".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(created.min_stock, 5);
        assert_eq!(created.status, SupplyStatus::Available);
        assert_eq!(created.supplier, "Limpio SA");
        assert_eq!(created.unit, "");
    }

    #[tokio::test]
    async fn low_stock_and_alerts_include_threshold_equal() {
        let (_, repo) = repo(vec![supply(1, 5, 5), supply(2, 6, 5), supply(3, 0, 2)]);

        let low: Vec<u64> = repo.get_low_stock().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(low, [1, 3]);

        let alerts = repo.alerts().await.unwrap();
        assert_eq!(alerts[1].current_stock, 0);
        assert_eq!(alerts[1].status, SupplyStatus::OutOfStock);
        assert_eq!(alerts[0].supplier, "Molinos");
    }
}
