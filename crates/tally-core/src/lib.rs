//! # tally-core: Pure Domain Logic for Tally
//!
//! Products, orders, money, the order status machine, validation rules and
//! the store traits the engine is written against. No I/O lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-engine (OrderEngine, CatalogService)                             │
//! │       │ uses types, validation, status machine                         │
//! │       │ calls Arc<dyn CatalogStore> / Arc<dyn OrderStore>              │
//! │       ▼                                                                 │
//! │  tally-core (THIS CRATE) ◄──── implements store traits ──── tally-db    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, OrderItem, ...)
//! - [`status`] - Order status enumeration and transition table
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain, validation and store error types
//! - [`validation`] - Input validation
//! - [`store`] - Catalog and order store traits
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::{OrderStatus, Money};
//!
//! let price = Money::from_cents(1000);
//! assert_eq!((price * 2i64).cents(), 2000);
//!
//! assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
//! assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod status;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, StoreError, StoreResult, ValidationError};
pub use money::Money;
pub use status::OrderStatus;
pub use store::{CatalogStore, OrderStore, StockAdjustment};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum product code length.
pub const MAX_CODE_LEN: usize = 50;

/// Maximum product name length.
pub const MAX_NAME_LEN: usize = 200;
