//! # Store Traits
//!
//! The storage seams the engine is built against.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every method takes the owner explicitly and must behave as if rows     │
//! │  of other owners do not exist:                                          │
//! │                                                                         │
//! │    find_*   → Ok(None)         for absent OR foreign rows               │
//! │    update   → Ok(false)        for absent OR foreign rows               │
//! │               (and, for orders, when the stored status moved on)        │
//! │    delete   → Ok(false)        for absent OR foreign rows               │
//! │                                                                         │
//! │  adjust_stock must apply `stock + delta >= 0` as ONE atomic step        │
//! │  (conditional UPDATE, row lock, or a write lock) so two concurrent      │
//! │  orders can never drive stock negative.                                 │
//! │                                                                         │
//! │  Product update never writes stock; only adjust_stock (relative) and    │
//! │  set_stock (absolute) do.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations live in `tally-db` (SQLite) and `tally-engine`
//! (in-memory).

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::status::OrderStatus;
use crate::types::{NewOrder, NewProduct, Order, OrderId, OwnerId, Product, ProductId};

/// Outcome of [`CatalogStore::adjust_stock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockAdjustment {
    /// Delta applied; carries the updated product.
    Applied(Product),
    /// No product with this id for this owner.
    NotFound,
    /// Applying the delta would make stock negative; nothing changed.
    WouldGoNegative { product: Product },
    /// Applying the delta would overflow `i64`; nothing changed.
    Overflow { product: Product },
}

/// Product persistence, scoped by owner.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a product, returning it with its assigned id and timestamps.
    ///
    /// Fails with [`StoreError::Duplicate`](crate::StoreError::Duplicate)
    /// when `(owner, code)` is taken.
    async fn create(&self, product: NewProduct) -> StoreResult<Product>;

    async fn find_by_id_and_owner(
        &self,
        id: ProductId,
        owner: OwnerId,
    ) -> StoreResult<Option<Product>>;

    /// All products of `owner`, ordered by id.
    async fn find_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Product>>;

    async fn find_by_code_and_owner(
        &self,
        code: &str,
        owner: OwnerId,
    ) -> StoreResult<Option<Product>>;

    /// Overwrites code, name, description and price. `product.stock` is
    /// ignored.
    async fn update(&self, product: &Product, owner: OwnerId) -> StoreResult<bool>;

    /// Sets stock to an absolute level.
    async fn set_stock(&self, id: ProductId, owner: OwnerId, stock: i64) -> StoreResult<bool>;

    async fn delete(&self, id: ProductId, owner: OwnerId) -> StoreResult<bool>;

    /// Atomically adds `delta` to stock unless the result would be negative.
    async fn adjust_stock(
        &self,
        id: ProductId,
        owner: OwnerId,
        delta: i64,
    ) -> StoreResult<StockAdjustment>;
}

/// Order persistence, scoped by owner.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order and all of its items, returning the new id.
    async fn create(&self, order: NewOrder) -> StoreResult<OrderId>;

    /// Loads an order with its items and each item's current product.
    async fn find_by_id_and_owner(&self, id: OrderId, owner: OwnerId)
        -> StoreResult<Option<Order>>;

    /// All orders of `owner`, newest first.
    async fn find_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Order>>;

    /// Persists the order's status and `updated_at`, but only while the
    /// stored status is still `expected`. Items are immutable and ignored.
    ///
    /// `Ok(false)` when the order is absent, foreign, or no longer in
    /// `expected`; nothing is written in that case.
    async fn update(
        &self,
        order: &Order,
        owner: OwnerId,
        expected: OrderStatus,
    ) -> StoreResult<bool>;

    /// Deletes an order together with its items.
    async fn delete(&self, id: OrderId, owner: OwnerId) -> StoreResult<bool>;
}
