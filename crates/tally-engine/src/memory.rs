//! # In-Memory Store
//!
//! A process-local implementation of both store traits, used by tests and
//! by embedders that don't need durability.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InMemoryStore (Clone: shares one Arc<RwLock<Inner>>)                   │
//! │                                                                         │
//! │  reads   → read lock   (find_*, list)                                   │
//! │  writes  → write lock  (create, update, delete, *_stock)                │
//! │                                                                         │
//! │  adjust_stock checks `stock + delta >= 0` and applies the delta under   │
//! │  the same write lock, so it is the same compare-and-apply primitive     │
//! │  the SQLite store gets from its conditional UPDATE. Order status        │
//! │  updates compare the expected status under the write lock the same way. │
//! │                                                                         │
//! │  Locks are std::sync and never held across an .await.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tally_core::{
    CatalogStore, NewOrder, NewProduct, Order, OrderId, OrderItem, OrderStatus, OrderStore,
    OwnerId, Product, ProductId, StockAdjustment, StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct Inner {
    products: BTreeMap<ProductId, Product>,
    /// Items are stored without their resolved product.
    orders: BTreeMap<OrderId, Order>,
    last_product_id: ProductId,
    last_order_id: OrderId,
    last_item_id: i64,
}

impl Inner {
    fn owned_product(&self, id: ProductId, owner: OwnerId) -> Option<&Product> {
        self.products.get(&id).filter(|p| p.owner_id == owner)
    }

    fn code_taken(&self, code: &str, owner: OwnerId, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.owner_id == owner && p.code == code && Some(p.id) != except)
    }

    /// Attaches the live product to each item.
    fn resolve(&self, order: &Order) -> Order {
        let mut order = order.clone();
        for item in &mut order.items {
            item.product = self
                .owned_product(item.product_id, order.owner_id)
                .map(Product::summary);
        }
        order
    }
}

/// Thread-safe in-memory catalog and order store.
///
/// ## Usage
/// ```rust,ignore
/// let store = InMemoryStore::new();
/// let engine = OrderEngine::new(
///     Arc::new(store.clone()),
///     Arc::new(store),
///     EngineConfig::default(),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

// =============================================================================
// CatalogStore
// =============================================================================

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        let mut inner = self.write()?;

        if inner.code_taken(&product.code, product.owner_id, None) {
            return Err(StoreError::Duplicate {
                field: "code".to_string(),
                value: product.code,
            });
        }

        inner.last_product_id += 1;
        let now = Utc::now();
        let created = Product {
            id: inner.last_product_id,
            owner_id: product.owner_id,
            code: product.code,
            name: product.name,
            description: product.description,
            price_cents: product.price_cents,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };

        inner.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id_and_owner(
        &self,
        id: ProductId,
        owner: OwnerId,
    ) -> StoreResult<Option<Product>> {
        Ok(self.read()?.owned_product(id, owner).cloned())
    }

    async fn find_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Product>> {
        // BTreeMap iterates in id order
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn find_by_code_and_owner(
        &self,
        code: &str,
        owner: OwnerId,
    ) -> StoreResult<Option<Product>> {
        Ok(self
            .read()?
            .products
            .values()
            .find(|p| p.owner_id == owner && p.code == code)
            .cloned())
    }

    async fn update(&self, product: &Product, owner: OwnerId) -> StoreResult<bool> {
        let mut inner = self.write()?;

        if inner.owned_product(product.id, owner).is_none() {
            return Ok(false);
        }
        if inner.code_taken(&product.code, owner, Some(product.id)) {
            return Err(StoreError::Duplicate {
                field: "code".to_string(),
                value: product.code.clone(),
            });
        }

        if let Some(stored) = inner.products.get_mut(&product.id) {
            stored.code = product.code.clone();
            stored.name = product.name.clone();
            stored.description = product.description.clone();
            stored.price_cents = product.price_cents;
            stored.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn set_stock(&self, id: ProductId, owner: OwnerId, stock: i64) -> StoreResult<bool> {
        let mut inner = self.write()?;

        match inner.products.get_mut(&id).filter(|p| p.owner_id == owner) {
            Some(stored) => {
                stored.stock = stock;
                stored.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ProductId, owner: OwnerId) -> StoreResult<bool> {
        let mut inner = self.write()?;

        if inner.owned_product(id, owner).is_none() {
            return Ok(false);
        }
        Ok(inner.products.remove(&id).is_some())
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        owner: OwnerId,
        delta: i64,
    ) -> StoreResult<StockAdjustment> {
        let mut inner = self.write()?;

        let Some(product) = inner.products.get_mut(&id).filter(|p| p.owner_id == owner) else {
            return Ok(StockAdjustment::NotFound);
        };

        match product.stock.checked_add(delta) {
            Some(stock) if stock >= 0 => {
                product.stock = stock;
                product.updated_at = Utc::now();
                Ok(StockAdjustment::Applied(product.clone()))
            }
            Some(_) => Ok(StockAdjustment::WouldGoNegative {
                product: product.clone(),
            }),
            None => Ok(StockAdjustment::Overflow {
                product: product.clone(),
            }),
        }
    }
}

// =============================================================================
// OrderStore
// =============================================================================

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create(&self, order: NewOrder) -> StoreResult<OrderId> {
        let mut inner = self.write()?;

        inner.last_order_id += 1;
        let order_id = inner.last_order_id;

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            inner.last_item_id += 1;
            items.push(OrderItem {
                id: inner.last_item_id,
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                subtotal_cents: item.subtotal_cents,
                product: None,
            });
        }

        let now = Utc::now();
        inner.orders.insert(
            order_id,
            Order {
                id: order_id,
                owner_id: order.owner_id,
                status: order.status,
                total_cents: order.total_cents,
                items,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(order_id)
    }

    async fn find_by_id_and_owner(
        &self,
        id: OrderId,
        owner: OwnerId,
    ) -> StoreResult<Option<Order>> {
        let inner = self.read()?;
        Ok(inner
            .orders
            .get(&id)
            .filter(|o| o.owner_id == owner)
            .map(|o| inner.resolve(o)))
    }

    async fn find_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Order>> {
        let inner = self.read()?;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.owner_id == owner)
            .map(|o| inner.resolve(o))
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn update(
        &self,
        order: &Order,
        owner: OwnerId,
        expected: OrderStatus,
    ) -> StoreResult<bool> {
        let mut inner = self.write()?;

        match inner
            .orders
            .get_mut(&order.id)
            .filter(|o| o.owner_id == owner && o.status == expected)
        {
            Some(stored) => {
                stored.status = order.status;
                stored.updated_at = order.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: OrderId, owner: OwnerId) -> StoreResult<bool> {
        let mut inner = self.write()?;

        if !inner.orders.get(&id).is_some_and(|o| o.owner_id == owner) {
            return Ok(false);
        }
        Ok(inner.orders.remove(&id).is_some())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
