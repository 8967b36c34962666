//! # Product Repository
//!
//! SQLite implementation of [`CatalogStore`].
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: read, check, write (lost update under concurrency)      │
//! │     SELECT stock ...; if stock >= 3 { UPDATE ... SET stock = 7 }   │
//! │                                                                     │
//! │  ✅ CORRECT: one conditional delta update                          │
//! │     UPDATE products SET stock = stock + ?1                         │
//! │     WHERE id = ?3 AND owner_id = ?4 AND stock + ?1 >= 0            │
//! │                                                                     │
//! │  Order A: takes 3 → stock - 3                                      │
//! │  Order B: takes 2 → stock - 2                                      │
//! │  SQLite serializes writers; the guard is re-evaluated per write,   │
//! │  so at most one of them can take the last unit.                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{
    CatalogStore, NewProduct, OwnerId, Product, ProductId, StockAdjustment, StoreResult,
};

const PRODUCT_COLUMNS: &str =
    "id, owner_id, code, name, description, price_cents, stock, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.insert(&new_product).await?;
/// let found = repo.get_by_code("WIDGET-1", owner).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with id and timestamps
    /// * `Err(DbError::UniqueViolation)` - Code already used by this owner
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(owner_id = product.owner_id, code = %product.code, "Inserting product");

        let now = Utc::now();

        let inserted = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (
                owner_id, code, name, description,
                price_cents, stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.owner_id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&product.code))?;

        Ok(inserted)
    }

    /// Gets a product by id, scoped to its owner.
    pub async fn get_by_id(&self, id: ProductId, owner: OwnerId) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND owner_id = ?2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its code, scoped to its owner.
    pub async fn get_by_code(&self, code: &str, owner: OwnerId) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1 AND owner_id = ?2"
        ))
        .bind(code)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products of an owner, ordered by id.
    pub async fn list(&self, owner: OwnerId) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE owner_id = ?1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        debug!(owner_id = owner, count = products.len(), "Listed products");
        Ok(products)
    }

    /// Overwrites code, name, description and price.
    ///
    /// Stock is left alone; it only moves through [`update_stock`] and
    /// [`set_stock`].
    ///
    /// ## Returns
    /// * `Ok(true)` - Row updated
    /// * `Ok(false)` - No such product for this owner
    ///
    /// [`update_stock`]: ProductRepository::update_stock
    /// [`set_stock`]: ProductRepository::set_stock
    pub async fn update(&self, product: &Product, owner: OwnerId) -> DbResult<bool> {
        debug!(id = product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?1,
                name = ?2,
                description = ?3,
                price_cents = ?4,
                updated_at = ?5
            WHERE id = ?6 AND owner_id = ?7
            "#,
        )
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(Utc::now())
        .bind(product.id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&product.code))?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets stock to an absolute level.
    pub async fn set_stock(&self, id: ProductId, owner: OwnerId, stock: i64) -> DbResult<bool> {
        debug!(id, stock, "Setting stock");

        let result = sqlx::query(
            "UPDATE products SET stock = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
        )
        .bind(stock)
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Applies a stock delta in a single conditional statement.
    ///
    /// ## Arguments
    /// * `delta` - Change in stock (negative to reserve, positive to restock)
    pub async fn update_stock(
        &self,
        id: ProductId,
        owner: OwnerId,
        delta: i64,
    ) -> DbResult<StockAdjustment> {
        debug!(id, delta, "Updating stock");

        let updated = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET
                stock = stock + ?1,
                updated_at = ?2
            WHERE id = ?3 AND owner_id = ?4
              AND stock + ?1 >= 0
              AND (?1 <= 0 OR stock <= ?5 - ?1)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(delta)
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        // SQLite turns an overflowing integer sum into a REAL instead of failing
        .bind(i64::MAX)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(product) = updated {
            return Ok(StockAdjustment::Applied(product));
        }

        // Nothing matched: either the product is missing or a guard failed
        match self.get_by_id(id, owner).await? {
            None => Ok(StockAdjustment::NotFound),
            Some(product) if product.stock.checked_add(delta).is_none() => {
                Ok(StockAdjustment::Overflow { product })
            }
            Some(product) => Ok(StockAdjustment::WouldGoNegative { product }),
        }
    }

    /// Hard-deletes a product.
    ///
    /// Order items keep their frozen price data and resolve the product to
    /// nothing afterwards.
    pub async fn delete(&self, id: ProductId, owner: OwnerId) -> DbResult<bool> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts an owner's products (for diagnostics).
    pub async fn count(&self, owner: OwnerId) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE owner_id = ?1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl CatalogStore for ProductRepository {
    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        Ok(self.insert(&product).await?)
    }

    async fn find_by_id_and_owner(
        &self,
        id: ProductId,
        owner: OwnerId,
    ) -> StoreResult<Option<Product>> {
        Ok(self.get_by_id(id, owner).await?)
    }

    async fn find_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Product>> {
        Ok(self.list(owner).await?)
    }

    async fn find_by_code_and_owner(
        &self,
        code: &str,
        owner: OwnerId,
    ) -> StoreResult<Option<Product>> {
        Ok(self.get_by_code(code, owner).await?)
    }

    async fn update(&self, product: &Product, owner: OwnerId) -> StoreResult<bool> {
        Ok(ProductRepository::update(self, product, owner).await?)
    }

    async fn set_stock(&self, id: ProductId, owner: OwnerId, stock: i64) -> StoreResult<bool> {
        Ok(ProductRepository::set_stock(self, id, owner, stock).await?)
    }

    async fn delete(&self, id: ProductId, owner: OwnerId) -> StoreResult<bool> {
        Ok(ProductRepository::delete(self, id, owner).await?)
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        owner: OwnerId,
        delta: i64,
    ) -> StoreResult<StockAdjustment> {
        Ok(self.update_stock(id, owner, delta).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::StoreError;

    fn widget(owner_id: OwnerId, code: &str, stock: i64) -> NewProduct {
        NewProduct {
            owner_id,
            code: code.to_string(),
            name: format!("Widget {code}"),
            description: String::new(),
            price_cents: 1000,
            stock,
        }
    }

    async fn repo() -> ProductRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().products()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let created = repo.insert(&widget(1, "W-1", 5)).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(created.stock, 5);

        let found = repo.get_by_id(created.id, 1).await.unwrap().unwrap();
        assert_eq!(found, created);

        let by_code = repo.get_by_code("W-1", 1).await.unwrap().unwrap();
        assert_eq!(by_code.id, created.id);
    }

    #[tokio::test]
    async fn test_foreign_owner_sees_nothing() {
        let repo = repo().await;
        let created = repo.insert(&widget(1, "W-1", 5)).await.unwrap();

        assert!(repo.get_by_id(created.id, 2).await.unwrap().is_none());
        assert!(repo.get_by_code("W-1", 2).await.unwrap().is_none());
        assert!(!ProductRepository::delete(&repo, created.id, 2).await.unwrap());
        assert_eq!(
            repo.update_stock(created.id, 2, -1).await.unwrap(),
            StockAdjustment::NotFound
        );
    }

    #[tokio::test]
    async fn test_duplicate_code_per_owner() {
        let repo = repo().await;
        repo.insert(&widget(1, "W-1", 5)).await.unwrap();

        let err: StoreError = repo.insert(&widget(1, "W-1", 5)).await.unwrap_err().into();
        assert!(matches!(err, StoreError::Duplicate { ref value, .. } if value == "W-1"));

        // Same code is fine for another owner
        repo.insert(&widget(2, "W-1", 5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_stock_guard() {
        let repo = repo().await;
        let p = repo.insert(&widget(1, "W-1", 3)).await.unwrap();

        match repo.update_stock(p.id, 1, -2).await.unwrap() {
            StockAdjustment::Applied(updated) => assert_eq!(updated.stock, 1),
            other => panic!("unexpected {other:?}"),
        }

        match repo.update_stock(p.id, 1, -2).await.unwrap() {
            StockAdjustment::WouldGoNegative { product } => assert_eq!(product.stock, 1),
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(
            repo.update_stock(9999, 1, 1).await.unwrap(),
            StockAdjustment::NotFound
        );
    }

    #[tokio::test]
    async fn test_update_and_list() {
        let repo = repo().await;
        let mut a = repo.insert(&widget(1, "A", 1)).await.unwrap();
        repo.insert(&widget(1, "B", 1)).await.unwrap();
        repo.insert(&widget(2, "C", 1)).await.unwrap();

        a.name = "Renamed".to_string();
        a.price_cents = 250;
        assert!(ProductRepository::update(&repo, &a, 1).await.unwrap());

        let listed = repo.list(1).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Renamed");
        assert_eq!(listed[0].price_cents, 250);
        assert_eq!(repo.count(1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_leaves_stock_alone() {
        let repo = repo().await;
        let mut stale = repo.insert(&widget(1, "W-1", 10)).await.unwrap();

        // An order reserves 3 after `stale` was read
        repo.update_stock(stale.id, 1, -3).await.unwrap();

        stale.price_cents = 1200;
        assert!(ProductRepository::update(&repo, &stale, 1).await.unwrap());

        let current = repo.get_by_id(stale.id, 1).await.unwrap().unwrap();
        assert_eq!(current.price_cents, 1200);
        assert_eq!(current.stock, 7);

        assert!(ProductRepository::set_stock(&repo, stale.id, 1, 25).await.unwrap());
        assert!(!ProductRepository::set_stock(&repo, stale.id, 2, 0).await.unwrap());
        assert_eq!(repo.get_by_id(stale.id, 1).await.unwrap().unwrap().stock, 25);
    }

    #[tokio::test]
    async fn test_update_stock_rejects_overflow() {
        let repo = repo().await;
        let p = repo.insert(&widget(1, "W-1", i64::MAX - 1)).await.unwrap();

        match repo.update_stock(p.id, 1, 2).await.unwrap() {
            StockAdjustment::Overflow { product } => assert_eq!(product.stock, i64::MAX - 1),
            other => panic!("unexpected {other:?}"),
        }

        match repo.update_stock(p.id, 1, 1).await.unwrap() {
            StockAdjustment::Applied(updated) => assert_eq!(updated.stock, i64::MAX),
            other => panic!("unexpected {other:?}"),
        }
    }
}
