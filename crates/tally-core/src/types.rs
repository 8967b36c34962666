//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Owner (OwnerId)                                │
//! │                 ┌───────────────┴───────────────┐                       │
//! │                 ▼                               ▼                       │
//! │            Product                           Order                      │
//! │   (code unique per owner,          (status, total_cents)                │
//! │    price_cents, stock >= 0)                   │                         │
//! │                 ▲                             ▼                         │
//! │                 │ product_id            OrderItem × N                   │
//! │                 └──────────────── (quantity, unit_price_cents,          │
//! │                                    subtotal_cents: frozen snapshot)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Products have:
//! - `id`: immutable numeric id, used for relations
//! - `code`: human-readable business key, unique per owner, mutable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::status::OrderStatus;

/// Identifier of the owning user (tenant).
pub type OwnerId = i64;

/// Product identifier.
pub type ProductId = i64;

/// Order identifier.
pub type OrderId = i64;

// =============================================================================
// Product
// =============================================================================

/// A catalog product owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: ProductId,

    /// Owner of this product.
    pub owner_id: OwnerId,

    /// Business key, unique per owner.
    pub code: String,

    /// Display name; also used in insufficient-stock messages.
    pub name: String,

    pub description: String,

    /// Price in cents (>= 0).
    pub price_cents: i64,

    /// Units available (>= 0).
    pub stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// The subset of fields embedded in order items.
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            price_cents: self.price_cents,
        }
    }
}

/// Current view of the product an order item points at.
///
/// This is the LIVE product, resolved on read. Pricing history lives in
/// [`OrderItem::unit_price_cents`], never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSummary {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub price_cents: i64,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub owner_id: OwnerId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i64,
}

/// Partial product update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
}

impl ProductPatch {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.stock.is_none()
    }
}

// =============================================================================
// Order
// =============================================================================

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        OrderLine {
            product_id,
            quantity,
        }
    }
}

/// An order and its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: OrderId,
    pub owner_id: OwnerId,
    pub status: OrderStatus,
    /// Σ item.subtotal_cents, fixed at creation.
    pub total_cents: i64,
    /// Items in submission order.
    pub items: Vec<OrderItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Recomputes Σ subtotals from the stored items.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}

/// A line item. Uses the snapshot pattern: price data is frozen at order
/// time and never re-read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit price in cents at time of order (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents (frozen).
    pub subtotal_cents: i64,
    /// Live product, `None` once the product has been deleted.
    pub product: Option<ProductSummary>,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// An order ready to be persisted by an [`OrderStore`](crate::store::OrderStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub owner_id: OwnerId,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub items: Vec<NewOrderItem>,
}

/// A priced line of a [`NewOrder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl NewOrderItem {
    /// Prices `quantity` units of `product` at its current price.
    ///
    /// Returns `None` if the subtotal overflows.
    pub fn priced(product: &Product, quantity: i64) -> Option<Self> {
        let subtotal = product.price().checked_multiply_quantity(quantity)?;
        Some(NewOrderItem {
            product_id: product.id,
            quantity,
            unit_price_cents: product.price_cents,
            subtotal_cents: subtotal.cents(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
