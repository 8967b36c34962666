//! # Order Repository
//!
//! SQLite implementation of [`OrderStore`].
//!
//! ## Order Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  orders (header)                                                        │
//! │    id, owner_id, status, total_cents, created_at, updated_at            │
//! │       │ 1                                                               │
//! │       │                                                                 │
//! │       │ N   (ON DELETE CASCADE)                                         │
//! │  order_items                                                            │
//! │    id, order_id, product_id, quantity, unit_price_cents, subtotal_cents │
//! │       │                                                                 │
//! │       │ LEFT JOIN on read (no FK: products may be deleted)              │
//! │       ▼                                                                 │
//! │  products → OrderItem.product = Some(summary) | None                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Header and items are written in one transaction, so a reader never sees
//! an order without its items.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{
    NewOrder, Order, OrderId, OrderItem, OrderStatus, OrderStore, OwnerId, ProductSummary,
    StoreResult,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    owner_id: OwnerId,
    status: OrderStatus,
    total_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            owner_id: self.owner_id,
            status: self.status,
            total_cents: self.total_cents,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// An order item joined with the (possibly deleted) product.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    order_id: OrderId,
    product_id: i64,
    quantity: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
    product_code: Option<String>,
    product_name: Option<String>,
    product_price_cents: Option<i64>,
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        let product = match (row.product_code, row.product_name, row.product_price_cents) {
            (Some(code), Some(name), Some(price_cents)) => Some(ProductSummary {
                id: row.product_id,
                code,
                name,
                price_cents,
            }),
            _ => None,
        };

        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            subtotal_cents: row.subtotal_cents,
            product,
        }
    }
}

const ORDER_COLUMNS: &str = "id, owner_id, status, total_cents, created_at, updated_at";

const ITEM_SELECT: &str = r#"
    SELECT
        oi.id,
        oi.order_id,
        oi.product_id,
        oi.quantity,
        oi.unit_price_cents,
        oi.subtotal_cents,
        p.code        AS product_code,
        p.name        AS product_name,
        p.price_cents AS product_price_cents
    FROM order_items oi
    INNER JOIN orders o ON o.id = oi.order_id
    LEFT JOIN products p ON p.id = oi.product_id AND p.owner_id = o.owner_id
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order header and all of its items atomically.
    pub async fn insert(&self, order: &NewOrder) -> DbResult<OrderId> {
        debug!(
            owner_id = order.owner_id,
            items = order.items.len(),
            total_cents = order.total_cents,
            "Inserting order"
        );

        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (owner_id, status, total_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(order.owner_id)
        .bind(order.status)
        .bind(order.total_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let order_id = result.last_insert_rowid();

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, product_id, quantity, unit_price_cents, subtotal_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.subtotal_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(order_id, "Order inserted");
        Ok(order_id)
    }

    /// Gets an order with its items, scoped to its owner.
    pub async fn get_by_id(&self, id: OrderId, owner: OwnerId) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND owner_id = ?2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ItemRow>(&format!(
            "{ITEM_SELECT} WHERE oi.order_id = ?1 ORDER BY oi.id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

        Ok(Some(row.into_order(items)))
    }

    /// Lists an owner's orders, newest first.
    ///
    /// Items for all orders are fetched with a single query and grouped.
    pub async fn list(&self, owner: OwnerId) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        let item_rows = sqlx::query_as::<_, ItemRow>(&format!(
            "{ITEM_SELECT} WHERE o.owner_id = ?1 ORDER BY oi.order_id, oi.id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items_by_order
                .entry(row.order_id)
                .or_default()
                .push(OrderItem::from(row));
        }

        let orders: Vec<Order> = rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect();

        debug!(owner_id = owner, count = orders.len(), "Listed orders");
        Ok(orders)
    }

    /// Persists status and `updated_at` if the stored status is still
    /// `expected`. Items are immutable.
    ///
    /// The guard sits in the WHERE clause, so of two writers that read the
    /// same status only the first one matches a row.
    pub async fn update_status(
        &self,
        order: &Order,
        owner: OwnerId,
        expected: OrderStatus,
    ) -> DbResult<bool> {
        debug!(
            id = order.id,
            from = %expected,
            to = %order.status,
            "Updating order status"
        );

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?1,
                updated_at = ?2
            WHERE id = ?3 AND owner_id = ?4 AND status = ?5
            "#,
        )
        .bind(order.status)
        .bind(order.updated_at)
        .bind(order.id)
        .bind(owner)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes an order and its items.
    pub async fn delete(&self, id: OrderId, owner: OwnerId) -> DbResult<bool> {
        debug!(id, "Deleting order");

        // order_items cascade through the foreign key
        let result = sqlx::query("DELETE FROM orders WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts the items stored for an order (for diagnostics).
    pub async fn count_items(&self, order_id: OrderId) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn create(&self, order: NewOrder) -> StoreResult<OrderId> {
        Ok(self.insert(&order).await?)
    }

    async fn find_by_id_and_owner(
        &self,
        id: OrderId,
        owner: OwnerId,
    ) -> StoreResult<Option<Order>> {
        Ok(self.get_by_id(id, owner).await?)
    }

    async fn find_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Order>> {
        Ok(self.list(owner).await?)
    }

    async fn update(
        &self,
        order: &Order,
        owner: OwnerId,
        expected: OrderStatus,
    ) -> StoreResult<bool> {
        Ok(self.update_status(order, owner, expected).await?)
    }

    async fn delete(&self, id: OrderId, owner: OwnerId) -> StoreResult<bool> {
        Ok(OrderRepository::delete(self, id, owner).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::{NewOrderItem, NewProduct};

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                owner_id: 1,
                code: "W-1".to_string(),
                name: "Widget".to_string(),
                description: String::new(),
                price_cents: 1000,
                stock: 10,
            })
            .await
            .unwrap();
        (db, product.id)
    }

    fn new_order(owner_id: OwnerId, product_id: i64, quantity: i64) -> NewOrder {
        NewOrder {
            owner_id,
            status: OrderStatus::Pending,
            total_cents: 1000 * quantity,
            items: vec![NewOrderItem {
                product_id,
                quantity,
                unit_price_cents: 1000,
                subtotal_cents: 1000 * quantity,
            }],
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_resolves_product() {
        let (db, product_id) = setup().await;
        let repo = db.orders();

        let id = repo.insert(&new_order(1, product_id, 2)).await.unwrap();
        let order = repo.get_by_id(id, 1).await.unwrap().unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_cents, 2000);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].subtotal_cents, 2000);

        let summary = order.items[0].product.as_ref().unwrap();
        assert_eq!(summary.code, "W-1");
        assert_eq!(summary.name, "Widget");
    }

    #[tokio::test]
    async fn test_deleted_product_resolves_to_none() {
        let (db, product_id) = setup().await;
        let repo = db.orders();

        let id = repo.insert(&new_order(1, product_id, 1)).await.unwrap();
        assert!(db.products().delete(product_id, 1).await.unwrap());

        let order = repo.get_by_id(id, 1).await.unwrap().unwrap();
        assert!(order.items[0].product.is_none());
        assert_eq!(order.items[0].unit_price_cents, 1000);
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let (db, product_id) = setup().await;
        let repo = db.orders();

        let id = repo.insert(&new_order(1, product_id, 1)).await.unwrap();

        assert!(repo.get_by_id(id, 2).await.unwrap().is_none());
        assert!(repo.list(2).await.unwrap().is_empty());
        assert!(!OrderRepository::delete(&repo, id, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (db, product_id) = setup().await;
        let repo = db.orders();

        let first = repo.insert(&new_order(1, product_id, 1)).await.unwrap();
        let second = repo.insert(&new_order(1, product_id, 2)).await.unwrap();

        let orders = repo.list(1).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second);
        assert_eq!(orders[1].id, first);
        assert_eq!(orders[0].items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_update_status_and_delete_cascades() {
        let (db, product_id) = setup().await;
        let repo = db.orders();

        let id = repo.insert(&new_order(1, product_id, 1)).await.unwrap();
        let mut order = repo.get_by_id(id, 1).await.unwrap().unwrap();

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        assert!(repo
            .update_status(&order, 1, OrderStatus::Pending)
            .await
            .unwrap());

        let reloaded = repo.get_by_id(id, 1).await.unwrap().unwrap();
        assert_eq!(reloaded.status, OrderStatus::Cancelled);

        assert!(OrderRepository::delete(&repo, id, 1).await.unwrap());
        assert!(repo.get_by_id(id, 1).await.unwrap().is_none());
        assert_eq!(repo.count_items(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_status_requires_expected_status() {
        let (db, product_id) = setup().await;
        let repo = db.orders();

        let id = repo.insert(&new_order(1, product_id, 1)).await.unwrap();
        let mut order = repo.get_by_id(id, 1).await.unwrap().unwrap();
        order.status = OrderStatus::Cancelled;

        assert!(repo
            .update_status(&order, 1, OrderStatus::Pending)
            .await
            .unwrap());
        // A second writer that also read `pending` matches nothing
        assert!(!repo
            .update_status(&order, 1, OrderStatus::Pending)
            .await
            .unwrap());
        assert!(!repo
            .update_status(&order, 2, OrderStatus::Cancelled)
            .await
            .unwrap());

        let reloaded = repo.get_by_id(id, 1).await.unwrap().unwrap();
        assert_eq!(reloaded.status, OrderStatus::Cancelled);
    }
}
