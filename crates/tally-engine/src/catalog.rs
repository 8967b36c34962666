//! # Catalog Service
//!
//! Owner-scoped product management on top of a [`CatalogStore`].
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_product       validate → code free? → store.create              │
//! │  get_product          store.find_by_id_and_owner      → NotFound        │
//! │  get_product_by_code  store.find_by_code_and_owner    → NotFound        │
//! │  list_products        store.find_by_owner (id order)                    │
//! │  update_product       load → apply patch → validate → store.update,     │
//! │                       then store.set_stock if stock was patched         │
//! │  adjust_stock         store.adjust_stock (atomic, never below zero)     │
//! │  delete_product       store.delete                    → NotFound        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, info};

use tally_core::validation::{
    validate_code, validate_price_cents, validate_product_name, validate_stock,
};
use tally_core::{
    CatalogStore, CoreError, CoreResult, NewProduct, OwnerId, Product, ProductId, ProductPatch,
    StockAdjustment, StoreError, ValidationError,
};

/// Product management for a single store backend.
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn CatalogStore>) -> Self {
        CatalogService { products }
    }

    /// Creates a product for `owner`.
    ///
    /// The owner on `input` is ignored in favor of the explicit `owner`.
    pub async fn create_product(&self, owner: OwnerId, input: NewProduct) -> CoreResult<Product> {
        let input = NewProduct {
            owner_id: owner,
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            ..input
        };

        validate_code(&input.code)?;
        validate_product_name(&input.name)?;
        validate_price_cents(input.price_cents)?;
        validate_stock(input.stock)?;

        if self
            .products
            .find_by_code_and_owner(&input.code, owner)
            .await?
            .is_some()
        {
            return Err(CoreError::DuplicateCode { code: input.code });
        }

        let code = input.code.clone();
        let product = self
            .products
            .create(input)
            .await
            .map_err(|e| duplicate_as_conflict(e, &code))?;

        info!(owner_id = owner, product_id = product.id, code = %product.code, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId, owner: OwnerId) -> CoreResult<Product> {
        self.products
            .find_by_id_and_owner(id, owner)
            .await?
            .ok_or_else(CoreError::product_not_found)
    }

    pub async fn get_product_by_code(&self, code: &str, owner: OwnerId) -> CoreResult<Product> {
        self.products
            .find_by_code_and_owner(code.trim(), owner)
            .await?
            .ok_or_else(CoreError::product_not_found)
    }

    /// All products of `owner`, ordered by id.
    pub async fn list_products(&self, owner: OwnerId) -> CoreResult<Vec<Product>> {
        Ok(self.products.find_by_owner(owner).await?)
    }

    /// Applies a partial update. Fields left `None` keep their value.
    ///
    /// ## Rules
    /// - Code and name, when given, are validated like on creation
    /// - A new code must not be used by another product of the same owner
    ///   (keeping the current code is fine)
    /// - Price and stock must not be negative
    /// - Stock is written on its own and only when patched, so orders placed
    ///   while the patch is applied keep their reservations
    pub async fn update_product(
        &self,
        id: ProductId,
        owner: OwnerId,
        patch: ProductPatch,
    ) -> CoreResult<Product> {
        let mut product = self.get_product(id, owner).await?;

        if patch.is_empty() {
            return Ok(product);
        }

        let details_changed = patch.code.is_some()
            || patch.name.is_some()
            || patch.description.is_some()
            || patch.price_cents.is_some();

        if let Some(code) = patch.code {
            let code = code.trim().to_string();
            validate_code(&code)?;
            if code != product.code {
                if let Some(existing) = self.products.find_by_code_and_owner(&code, owner).await? {
                    if existing.id != product.id {
                        return Err(CoreError::DuplicateCode { code });
                    }
                }
            }
            product.code = code;
        }

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            validate_product_name(&name)?;
            product.name = name;
        }

        if let Some(description) = patch.description {
            product.description = description;
        }

        if let Some(price_cents) = patch.price_cents {
            validate_price_cents(price_cents)?;
            product.price_cents = price_cents;
        }

        if let Some(stock) = patch.stock {
            validate_stock(stock)?;
        }

        if details_changed {
            let updated = self
                .products
                .update(&product, owner)
                .await
                .map_err(|e| duplicate_as_conflict(e, &product.code))?;
            if !updated {
                return Err(CoreError::product_not_found());
            }
        }

        if let Some(stock) = patch.stock {
            if !self.products.set_stock(id, owner, stock).await? {
                return Err(CoreError::product_not_found());
            }
        }

        info!(owner_id = owner, product_id = id, "Product updated");

        // Re-read so the caller sees store-assigned fields and current stock
        self.get_product(id, owner).await
    }

    /// Adds `delta` to a product's stock.
    ///
    /// ## Errors
    /// - `NotFound` when the product is absent or not owned
    /// - `ValidationError::NegativeStock` when `stock + delta < 0`
    /// - `ValidationError::StockOverflow` when `stock + delta` overflows
    pub async fn adjust_stock(
        &self,
        id: ProductId,
        owner: OwnerId,
        delta: i64,
    ) -> CoreResult<Product> {
        debug!(product_id = id, delta, "Adjusting stock");

        match self.products.adjust_stock(id, owner, delta).await? {
            StockAdjustment::Applied(product) => {
                info!(
                    owner_id = owner,
                    product_id = id,
                    delta,
                    stock = product.stock,
                    "Stock adjusted"
                );
                Ok(product)
            }
            StockAdjustment::NotFound => Err(CoreError::product_not_found()),
            StockAdjustment::WouldGoNegative { .. } => Err(ValidationError::NegativeStock.into()),
            StockAdjustment::Overflow { .. } => Err(ValidationError::StockOverflow.into()),
        }
    }

    /// Deletes a product. Orders that reference it keep their snapshots.
    pub async fn delete_product(&self, id: ProductId, owner: OwnerId) -> CoreResult<()> {
        if !self.products.delete(id, owner).await? {
            return Err(CoreError::product_not_found());
        }

        info!(owner_id = owner, product_id = id, "Product deleted");
        Ok(())
    }
}

/// A store-level unique violation on the code is the same conflict as the
/// pre-check; it only shows up when two writers race for one code.
fn duplicate_as_conflict(err: StoreError, code: &str) -> CoreError {
    match err {
        StoreError::Duplicate { .. } => CoreError::DuplicateCode {
            code: code.to_string(),
        },
        other => CoreError::Store(other),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tally_core::{ErrorKind, StoreResult};

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryStore::new()))
    }

    fn input(code: &str, price_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            owner_id: 0,
            code: code.to_string(),
            name: format!("Product {code}"),
            description: "test product".to_string(),
            price_cents,
            stock,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let catalog = service();
        let created = catalog.create_product(7, input("A-1", 1000, 10)).await.unwrap();

        assert_eq!(created.owner_id, 7);
        assert_eq!(catalog.get_product(created.id, 7).await.unwrap(), created);
        assert_eq!(
            catalog.get_product_by_code("A-1", 7).await.unwrap().id,
            created.id
        );
    }

    #[tokio::test]
    async fn test_create_validation() {
        let catalog = service();

        let err = catalog.create_product(1, input("", 100, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = catalog.create_product(1, input("A 1", 100, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = catalog.create_product(1, input("A-1", -1, 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "price cannot be negative");

        let err = catalog.create_product(1, input("A-1", 100, -1)).await.unwrap_err();
        assert_eq!(err.to_string(), "stock cannot be negative");
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() {
        let catalog = service();
        catalog.create_product(1, input("A-1", 100, 1)).await.unwrap();

        let err = catalog.create_product(1, input("A-1", 100, 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateCode { ref code } if code == "A-1"));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Codes are per owner
        catalog.create_product(2, input("A-1", 100, 1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_partial_update() {
        let catalog = service();
        let a = catalog.create_product(1, input("A-1", 100, 1)).await.unwrap();
        catalog.create_product(1, input("B-1", 100, 1)).await.unwrap();

        let updated = catalog
            .update_product(
                a.id,
                1,
                ProductPatch {
                    price_cents: Some(250),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 250);
        assert_eq!(updated.name, a.name);
        assert_eq!(updated.stock, 1);

        // Keeping the current code is not a conflict
        catalog
            .update_product(
                a.id,
                1,
                ProductPatch {
                    code: Some("A-1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = catalog
            .update_product(
                a.id,
                1,
                ProductPatch {
                    code: Some("B-1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateCode { .. }));

        let err = catalog
            .update_product(
                a.id,
                1,
                ProductPatch {
                    name: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let catalog = service();
        let p = catalog.create_product(1, input("A-1", 100, 3)).await.unwrap();

        assert_eq!(catalog.adjust_stock(p.id, 1, 2).await.unwrap().stock, 5);
        assert_eq!(catalog.adjust_stock(p.id, 1, -5).await.unwrap().stock, 0);

        let err = catalog.adjust_stock(p.id, 1, -1).await.unwrap_err();
        assert_eq!(err.to_string(), "stock cannot be negative");
        assert_eq!(catalog.get_product(p.id, 1).await.unwrap().stock, 0);

        let err = catalog.adjust_stock(9999, 1, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "product not found");
    }

    #[tokio::test]
    async fn test_adjust_stock_overflow_rejected() {
        let catalog = service();
        let p = catalog
            .create_product(1, input("A-1", 100, i64::MAX - 1))
            .await
            .unwrap();

        let err = catalog.adjust_stock(p.id, 1, 2).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::StockOverflow)
        ));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            catalog.get_product(p.id, 1).await.unwrap().stock,
            i64::MAX - 1
        );
    }

    /// Catalog store that lets an order take 3 units right after the next
    /// product read, the way a concurrent `create_order` would.
    struct ReservingCatalog {
        inner: InMemoryStore,
        reserve_after_read: AtomicBool,
    }

    #[async_trait]
    impl CatalogStore for ReservingCatalog {
        async fn create(&self, product: NewProduct) -> StoreResult<Product> {
            CatalogStore::create(&self.inner, product).await
        }

        async fn find_by_id_and_owner(
            &self,
            id: ProductId,
            owner: OwnerId,
        ) -> StoreResult<Option<Product>> {
            let found = CatalogStore::find_by_id_and_owner(&self.inner, id, owner).await?;
            if self.reserve_after_read.swap(false, Ordering::SeqCst) {
                self.inner.adjust_stock(id, owner, -3).await?;
            }
            Ok(found)
        }

        async fn find_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Product>> {
            CatalogStore::find_by_owner(&self.inner, owner).await
        }

        async fn find_by_code_and_owner(
            &self,
            code: &str,
            owner: OwnerId,
        ) -> StoreResult<Option<Product>> {
            self.inner.find_by_code_and_owner(code, owner).await
        }

        async fn update(&self, product: &Product, owner: OwnerId) -> StoreResult<bool> {
            CatalogStore::update(&self.inner, product, owner).await
        }

        async fn set_stock(&self, id: ProductId, owner: OwnerId, stock: i64) -> StoreResult<bool> {
            self.inner.set_stock(id, owner, stock).await
        }

        async fn delete(&self, id: ProductId, owner: OwnerId) -> StoreResult<bool> {
            CatalogStore::delete(&self.inner, id, owner).await
        }

        async fn adjust_stock(
            &self,
            id: ProductId,
            owner: OwnerId,
            delta: i64,
        ) -> StoreResult<StockAdjustment> {
            self.inner.adjust_stock(id, owner, delta).await
        }
    }

    #[tokio::test]
    async fn test_patch_keeps_concurrent_reservation() {
        let store = Arc::new(ReservingCatalog {
            inner: InMemoryStore::new(),
            reserve_after_read: AtomicBool::new(false),
        });
        let catalog = CatalogService::new(store.clone());
        let p = catalog.create_product(1, input("A-1", 100, 10)).await.unwrap();

        store.reserve_after_read.store(true, Ordering::SeqCst);
        let updated = catalog
            .update_product(
                p.id,
                1,
                ProductPatch {
                    price_cents: Some(150),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price_cents, 150);
        assert_eq!(updated.stock, 7);
        assert_eq!(catalog.get_product(p.id, 1).await.unwrap().stock, 7);
    }

    #[tokio::test]
    async fn test_patch_sets_stock_explicitly() {
        let catalog = service();
        let p = catalog.create_product(1, input("A-1", 100, 10)).await.unwrap();

        let updated = catalog
            .update_product(
                p.id,
                1,
                ProductPatch {
                    stock: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 4);
        assert_eq!(updated.price_cents, 100);

        let err = catalog
            .update_product(
                p.id,
                1,
                ProductPatch {
                    name: Some("Renamed".to_string()),
                    stock: Some(-1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "stock cannot be negative");

        // A rejected patch writes nothing
        let current = catalog.get_product(p.id, 1).await.unwrap();
        assert_eq!(current.name, p.name);
        assert_eq!(current.stock, 4);
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let catalog = service();
        let p = catalog.create_product(1, input("A-1", 100, 3)).await.unwrap();

        for err in [
            catalog.get_product(p.id, 2).await.unwrap_err(),
            catalog.get_product_by_code("A-1", 2).await.unwrap_err(),
            catalog.adjust_stock(p.id, 2, 1).await.unwrap_err(),
            catalog.delete_product(p.id, 2).await.unwrap_err(),
            catalog
                .update_product(
                    p.id,
                    2,
                    ProductPatch {
                        stock: Some(0),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }

        assert!(catalog.list_products(2).await.unwrap().is_empty());
        assert_eq!(catalog.get_product(p.id, 1).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_delete_product() {
        let catalog = service();
        let p = catalog.create_product(1, input("A-1", 100, 3)).await.unwrap();

        catalog.delete_product(p.id, 1).await.unwrap();
        assert_eq!(
            catalog.get_product(p.id, 1).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            catalog.delete_product(p.id, 1).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
