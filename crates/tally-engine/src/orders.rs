//! # Order Engine
//!
//! Order creation with stock reservation, status transitions, cancellation
//! with restock, and deletion. Every operation is scoped by owner.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Order Lifecycle                                 │
//! │                                                                         │
//! │  1. CREATE                                                              │
//! │     └── validate lines → per line: load product, snapshot price,        │
//! │         reserve stock (atomic) → persist order (pending) → re-read      │
//! │                                                                         │
//! │  2. ADVANCE                                                             │
//! │     └── update_status: pending → confirmed → shipped → delivered        │
//! │                                                                         │
//! │  3. CANCEL                                                              │
//! │     └── cancel_order: cancelled (guarded write) → restock if it was     │
//! │         pending/confirmed                                               │
//! │                                                                         │
//! │  4. DELETE                                                              │
//! │     └── delete_order: cancelled orders only                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Partial Failure During Creation
//! ```text
//! lines:   [A×2]        [B×1]         [C×5]
//!            │            │             │
//!            ▼            ▼             ▼
//!         A -= 2 ✓     B -= 1 ✓     C short ✗
//!                                       │
//!          rollback_partial_orders?     │
//!          ├── true:  B += 1, A += 2 ◄──┘  (reverse order)
//!          └── false: nothing restored
//! ```

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use tally_core::validation::validate_order_lines;
use tally_core::{
    CatalogStore, CoreError, CoreResult, Money, NewOrder, NewOrderItem, Order, OrderId, OrderLine,
    OrderStatus, OrderStore, OwnerId, ProductId, StockAdjustment, ValidationError,
};

use crate::config::EngineConfig;

// =============================================================================
// Cancellation Outcome
// =============================================================================

/// Result of [`OrderEngine::cancel_order_detailed`].
///
/// Restock is best-effort: a product deleted since the order was placed (or
/// a store failure on one item) doesn't block the cancellation. Those items
/// are listed in `skipped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cancellation {
    /// The order, now `cancelled`.
    pub order: Order,

    /// `(product_id, quantity)` returned to stock.
    pub restocked: Vec<(ProductId, i64)>,

    /// Products whose stock could not be restored.
    pub skipped: Vec<ProductId>,
}

impl Cancellation {
    /// True when every item was returned to stock.
    pub fn fully_restocked(&self) -> bool {
        self.skipped.is_empty()
    }
}

// =============================================================================
// Order Engine
// =============================================================================

/// Order lifecycle engine.
///
/// Holds no per-request state; clones share the same stores.
#[derive(Clone)]
pub struct OrderEngine {
    products: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    config: EngineConfig,
}

impl OrderEngine {
    pub fn new(
        products: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        config: EngineConfig,
    ) -> Self {
        OrderEngine {
            products,
            orders,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates an order for `owner`, reserving stock for every line.
    ///
    /// ## Errors
    /// - `Validation` - empty order, bad quantity, too many lines, overflow
    /// - `NotFound` - a product is absent or not owned
    /// - `InsufficientStock` - a product can't cover its line
    /// - `Store` - backing store failure
    ///
    /// Input is fully validated before any store is touched.
    pub async fn create_order(&self, owner: OwnerId, lines: &[OrderLine]) -> CoreResult<Order> {
        validate_order_lines(
            lines,
            self.config.max_order_lines,
            self.config.max_item_quantity,
        )?;

        let mut reserved: Vec<(ProductId, i64)> = Vec::with_capacity(lines.len());

        let outcome = self.reserve_and_persist(owner, lines, &mut reserved).await;
        let order_id = match outcome {
            Ok(id) => id,
            Err(err) => {
                if self.config.rollback_partial_orders {
                    self.release(owner, &reserved).await;
                } else if !reserved.is_empty() {
                    warn!(
                        owner_id = owner,
                        lines = reserved.len(),
                        "Order creation failed, reserved stock left in place"
                    );
                }
                return Err(err);
            }
        };

        let order = self.get_order(order_id, owner).await?;

        info!(
            owner_id = owner,
            order_id,
            items = order.items.len(),
            total = %order.total(),
            "Order created"
        );
        Ok(order)
    }

    /// Prices and reserves each line, then writes the order.
    ///
    /// Every successful decrement is pushed to `reserved` so the caller can
    /// undo it.
    async fn reserve_and_persist(
        &self,
        owner: OwnerId,
        lines: &[OrderLine],
        reserved: &mut Vec<(ProductId, i64)>,
    ) -> CoreResult<OrderId> {
        let mut items = Vec::with_capacity(lines.len());
        let mut total = Money::zero();

        for line in lines {
            let product = self
                .products
                .find_by_id_and_owner(line.product_id, owner)
                .await?
                .ok_or_else(CoreError::product_not_found)?;

            if !product.has_stock_for(line.quantity) {
                return Err(CoreError::InsufficientStock {
                    name: product.name,
                    available: product.stock,
                    requested: line.quantity,
                });
            }

            let item = NewOrderItem::priced(&product, line.quantity)
                .ok_or(ValidationError::AmountOverflow)?;
            total = total
                .checked_add(Money::from_cents(item.subtotal_cents))
                .ok_or(ValidationError::AmountOverflow)?;

            debug!(
                product_id = product.id,
                quantity = line.quantity,
                "Reserving stock"
            );

            match self
                .products
                .adjust_stock(product.id, owner, -line.quantity)
                .await?
            {
                StockAdjustment::Applied(_) => reserved.push((product.id, line.quantity)),
                StockAdjustment::NotFound => return Err(CoreError::product_not_found()),
                // A concurrent order took the stock between the read and the write
                StockAdjustment::WouldGoNegative { product } => {
                    return Err(CoreError::InsufficientStock {
                        name: product.name,
                        available: product.stock,
                        requested: line.quantity,
                    })
                }
                StockAdjustment::Overflow { .. } => {
                    return Err(ValidationError::StockOverflow.into())
                }
            }

            items.push(item);
        }

        let order_id = self
            .orders
            .create(NewOrder {
                owner_id: owner,
                status: OrderStatus::Pending,
                total_cents: total.cents(),
                items,
            })
            .await?;

        Ok(order_id)
    }

    /// Gives reserved stock back, newest reservation first.
    ///
    /// Failures are logged; the caller returns its original error regardless.
    async fn release(&self, owner: OwnerId, reserved: &[(ProductId, i64)]) {
        for &(product_id, quantity) in reserved.iter().rev() {
            match self.products.adjust_stock(product_id, owner, quantity).await {
                Ok(StockAdjustment::Applied(_)) => {
                    debug!(product_id, quantity, "Reserved stock released");
                }
                Ok(outcome) => {
                    error!(product_id, quantity, ?outcome, "Failed to release reserved stock");
                }
                Err(err) => {
                    error!(product_id, quantity, error = %err, "Failed to release reserved stock");
                }
            }
        }
    }

    /// Loads one order with its items.
    pub async fn get_order(&self, order_id: OrderId, owner: OwnerId) -> CoreResult<Order> {
        self.orders
            .find_by_id_and_owner(order_id, owner)
            .await?
            .ok_or_else(CoreError::order_not_found)
    }

    /// All orders of `owner`, newest first.
    pub async fn list_orders(&self, owner: OwnerId) -> CoreResult<Vec<Order>> {
        Ok(self.orders.find_by_owner(owner).await?)
    }

    /// Moves an order to `new_status` if the transition table allows it.
    ///
    /// This is a pure status change. Moving to `cancelled` here does NOT
    /// restock; use [`cancel_order`](Self::cancel_order) for that.
    ///
    /// The write only lands if the status is still the one the transition
    /// was checked against; otherwise the order is re-read and re-checked.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        owner: OwnerId,
        new_status: OrderStatus,
    ) -> CoreResult<Order> {
        loop {
            let mut order = self.get_order(order_id, owner).await?;
            let previous = order.status;

            order.status = previous.transition(new_status)?;
            order.updated_at = Utc::now();

            if self.orders.update(&order, owner, previous).await? {
                info!(
                    owner_id = owner,
                    order_id,
                    from = %previous,
                    to = %order.status,
                    "Order status changed"
                );
                return Ok(order);
            }

            debug!(order_id, from = %previous, "Order changed concurrently, re-checking");
        }
    }

    /// [`update_status`](Self::update_status) for raw string input.
    ///
    /// Unknown names fail with `invalid status` before the order is loaded.
    pub async fn update_status_str(
        &self,
        order_id: OrderId,
        owner: OwnerId,
        new_status: &str,
    ) -> CoreResult<Order> {
        let status: OrderStatus = new_status.parse()?;
        self.update_status(order_id, owner, status).await
    }

    /// Cancels an order, returning reserved stock when it hasn't shipped.
    pub async fn cancel_order(&self, order_id: OrderId, owner: OwnerId) -> CoreResult<Order> {
        Ok(self.cancel_order_detailed(order_id, owner).await?.order)
    }

    /// Cancels an order and reports what was restocked.
    ///
    /// ## Rules
    /// ```text
    /// cancelled  → AlreadyCancelled (nothing changes)
    /// delivered  → DeliveredImmutable
    /// pending    ┐
    /// confirmed  ┘→ cancelled, then restock every item
    /// shipped    → cancelled, no restock (goods already left)
    /// ```
    ///
    /// The status is written first, guarded on the status that was read.
    /// Only the caller whose write lands restocks, so a failed write leaves
    /// stock untouched and two racing cancels restock once.
    pub async fn cancel_order_detailed(
        &self,
        order_id: OrderId,
        owner: OwnerId,
    ) -> CoreResult<Cancellation> {
        let (order, previous) = loop {
            let mut order = self.get_order(order_id, owner).await?;
            let previous = order.status;

            match previous {
                OrderStatus::Cancelled => return Err(CoreError::AlreadyCancelled),
                OrderStatus::Delivered => return Err(CoreError::DeliveredImmutable),
                _ => {}
            }

            order.status = OrderStatus::Cancelled;
            order.updated_at = Utc::now();

            if self.orders.update(&order, owner, previous).await? {
                break (order, previous);
            }

            // Lost the guard: re-read, which reports AlreadyCancelled if
            // another cancel won
            debug!(order_id, from = %previous, "Order changed concurrently, re-checking");
        };

        let mut restocked = Vec::new();
        let mut skipped = Vec::new();

        if previous.holds_reclaimable_stock() {
            for item in &order.items {
                match self
                    .products
                    .adjust_stock(item.product_id, owner, item.quantity)
                    .await
                {
                    Ok(StockAdjustment::Applied(_)) => {
                        restocked.push((item.product_id, item.quantity));
                    }
                    Ok(outcome) => {
                        warn!(
                            order_id,
                            product_id = item.product_id,
                            quantity = item.quantity,
                            ?outcome,
                            "Restock skipped"
                        );
                        skipped.push(item.product_id);
                    }
                    Err(err) => {
                        warn!(
                            order_id,
                            product_id = item.product_id,
                            quantity = item.quantity,
                            error = %err,
                            "Restock failed, skipped"
                        );
                        skipped.push(item.product_id);
                    }
                }
            }
        } else {
            debug!(order_id, status = %previous, "No stock to reclaim");
        }

        info!(
            owner_id = owner,
            order_id,
            from = %previous,
            restocked = restocked.len(),
            skipped = skipped.len(),
            "Order cancelled"
        );

        Ok(Cancellation {
            order,
            restocked,
            skipped,
        })
    }

    /// Deletes a cancelled order together with its items.
    pub async fn delete_order(&self, order_id: OrderId, owner: OwnerId) -> CoreResult<()> {
        let order = self.get_order(order_id, owner).await?;

        if order.status != OrderStatus::Cancelled {
            return Err(CoreError::DeleteRequiresCancelled);
        }

        if !self.orders.delete(order_id, owner).await? {
            return Err(CoreError::order_not_found());
        }

        info!(owner_id = owner, order_id, "Order deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
