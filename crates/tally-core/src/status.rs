//! # Order Status Machine
//!
//! The fixed status enumeration and its transition table.
//!
//! ## State Diagram
//! ```text
//!              ┌───────────┐
//!              │  pending  │
//!              └─────┬─────┘
//!          ┌─────────┴──────────┐
//!          ▼                    ▼
//!    ┌───────────┐        ┌───────────┐
//!    │ confirmed │───────►│ cancelled │ (terminal)
//!    └─────┬─────┘        └───────────┘
//!          ▼
//!    ┌───────────┐        ┌───────────┐
//!    │  shipped  │───────►│ delivered │ (terminal)
//!    └───────────┘        └───────────┘
//! ```
//!
//! Unknown status strings never reach the table: [`OrderStatus::from_str`]
//! rejects them with [`ValidationError::InvalidStatus`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// The lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, stock reserved, awaiting confirmation.
    Pending,
    /// Accepted by the seller; stock still reclaimable.
    Confirmed,
    /// Goods left the warehouse.
    Shipped,
    /// Received by the customer. Terminal.
    Delivered,
    /// Cancelled. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns the lowercase wire/storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses reachable from `self` in one step.
    ///
    /// Terminal states return an empty slice (deny-all).
    pub const fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    /// Checks whether `next` is an allowed successor of `self`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Validates a transition, returning the target status on success.
    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, ValidationError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ValidationError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// `delivered` and `cancelled` accept no further transitions.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether the order still holds reclaimable stock.
    ///
    /// Stock reserved at creation goes back to the catalog on cancellation
    /// only while the goods have not shipped.
    pub const fn holds_reclaimable_stock(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    /// Parses a status name. Case and surrounding whitespace are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
