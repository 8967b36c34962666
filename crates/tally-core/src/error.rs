//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CoreError                                       │
//! │                                                                         │
//! │   Validation(ValidationError)   malformed input          → Validation   │
//! │   NotFound { entity }           absent OR not owned      → NotFound     │
//! │   InsufficientStock, Already-   business rule violated   → Conflict     │
//! │   Cancelled, DeliveredImmut-                                            │
//! │   able, DeleteRequiresCancel-                                           │
//! │   led, DuplicateCode                                                    │
//! │   Store(StoreError)             backing store failed     → Storage      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Messages are short and lowercase; transports add their own framing
//! 3. Not-found never reveals whether the entity exists for another owner

use thiserror::Error;

use crate::status::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Errors returned by every engine and catalog operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or out-of-range input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Entity is absent or belongs to another owner.
    ///
    /// ## Tenant Isolation
    /// Both cases produce the identical error so a caller cannot probe
    /// for other owners' ids.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Requested quantity exceeds the product's available stock.
    ///
    /// ## User Workflow
    /// ```text
    /// create_order([{ product: 7, quantity: 5 }])
    ///      │
    ///      ▼
    /// product 7 "Widget": stock = 1
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Widget", available: 1, requested: 5 }
    ///      │
    ///      ▼
    /// "insufficient stock: Widget"
    /// ```
    #[error("insufficient stock: {name}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Cancelling an order that is already cancelled.
    #[error("already cancelled")]
    AlreadyCancelled,

    /// Delivered orders can no longer be cancelled.
    #[error("cannot cancel delivered order")]
    DeliveredImmutable,

    /// Only cancelled orders may be deleted.
    #[error("can only delete cancelled orders")]
    DeleteRequiresCancelled,

    /// Another product of the same owner already uses this code.
    ///
    /// The code is kept for logs and callers; the message stays fixed.
    #[error("product code already exists")]
    DuplicateCode { code: String },

    /// The backing store failed.
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification used by transport layers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Storage,
}

impl CoreError {
    /// Not-found for a product.
    pub fn product_not_found() -> Self {
        CoreError::NotFound { entity: "product" }
    }

    /// Not-found for an order.
    pub fn order_not_found() -> Self {
        CoreError::NotFound { entity: "order" }
    }

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. }
            | CoreError::AlreadyCancelled
            | CoreError::DeliveredImmutable
            | CoreError::DeleteRequiresCancelled
            | CoreError::DuplicateCode { .. } => ErrorKind::Conflict,
            CoreError::Store(StoreError::Duplicate { .. }) => ErrorKind::Conflict,
            CoreError::Store(_) => ErrorKind::Storage,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store is touched whenever the input alone is enough
/// to reject the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Order submitted without lines.
    #[error("empty order")]
    EmptyOrder,

    /// Line quantity is zero or negative, or above a configured maximum.
    #[error("invalid quantity")]
    InvalidQuantity { quantity: i64 },

    /// More lines than the configured maximum.
    #[error("order cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// Stock would drop below zero, or a negative stock was supplied.
    #[error("stock cannot be negative")]
    NegativeStock,

    /// A restock would push stock past `i64::MAX`; nothing changed.
    #[error("stock exceeds the supported range")]
    StockOverflow,

    /// Negative price supplied.
    #[error("price cannot be negative")]
    NegativePrice,

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., illegal characters in a product code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Status string outside the fixed enumeration.
    #[error("invalid status: {value}")]
    InvalidStatus { value: String },

    /// Requested status is not a successor of the current one.
    #[error("invalid status transition")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A subtotal or total does not fit in the money range.
    #[error("amount overflows the supported range")]
    AmountOverflow,
}

// =============================================================================
// Store Error
// =============================================================================

/// Failures reported by a [`CatalogStore`](crate::store::CatalogStore) or
/// [`OrderStore`](crate::store::OrderStore) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Unique constraint violated.
    #[error("duplicate {field}: '{value}'")]
    Duplicate { field: String, value: String },

    /// Store could not be reached (pool closed/exhausted, lock poisoned).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
