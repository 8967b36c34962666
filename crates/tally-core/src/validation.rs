//! # Validation Module
//!
//! Input validation for catalog and order operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (out of scope)                                      │
//! │  └── Deserialization, basic shape                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Runs before any store access                                       │
//! │  └── Codes, names, prices, stock, quantities, line counts               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store                                                         │
//! │  ├── UNIQUE (owner_id, code)                                            │
//! │  └── CHECK (stock >= 0)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_code, validate_quantity};
//!
//! validate_code("WIDGET-01").unwrap();
//! validate_quantity(5, None).unwrap();
//! assert!(validate_quantity(5, Some(3)).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::OrderLine;
use crate::{MAX_CODE_LEN, MAX_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_CODE_LEN`] characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_code;
///
/// assert!(validate_code("PROD-001").is_ok());
/// assert!(validate_code("").is_err());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_NAME_LEN`] characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `max`, when one is configured
pub fn validate_quantity(qty: i64, max: Option<i64>) -> ValidationResult<()> {
    if qty <= 0 || max.is_some_and(|max| qty > max) {
        return Err(ValidationError::InvalidQuantity { quantity: qty });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::NegativePrice);
    }

    Ok(())
}

/// Validates an absolute stock level.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::NegativeStock);
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the lines of a new order before anything is looked up.
///
/// ## Rules
/// - At least one line
/// - At most `max_lines` lines, when configured
/// - Every quantity passes [`validate_quantity`]
///
/// ## User Workflow
/// ```text
/// create_order(owner, lines)
///      │
///      ▼
/// validate_order_lines ← THIS FUNCTION
///      │
///      ├── [] → "empty order"
///      ├── qty <= 0 → "invalid quantity"
///      │
///      └── OK → per-line product lookup & stock reservation
/// ```
pub fn validate_order_lines(
    lines: &[OrderLine],
    max_lines: Option<usize>,
    max_quantity: Option<i64>,
) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyOrder);
    }

    if let Some(max) = max_lines.filter(|&max| lines.len() > max) {
        return Err(ValidationError::TooManyLines { max });
    }

    for line in lines {
        validate_quantity(line.quantity, max_quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert!(validate_code("PROD-001").is_ok());
        assert!(validate_code("ABC123").is_ok());
        assert!(validate_code("product_1").is_ok());

        assert!(validate_code("").is_err());
        assert!(validate_code("   ").is_err());
        assert!(validate_code("has space").is_err());
        assert!(validate_code(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Gaming Laptop").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1, None).is_ok());
        assert!(validate_quantity(1_000_000, None).is_ok());
        assert!(validate_quantity(999, Some(999)).is_ok());

        assert_eq!(
            validate_quantity(0, None),
            Err(ValidationError::InvalidQuantity { quantity: 0 })
        );
        assert!(validate_quantity(-1, None).is_err());
        assert!(validate_quantity(1000, Some(999)).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price_cents(0).is_ok());
        assert_eq!(validate_price_cents(-1), Err(ValidationError::NegativePrice));
        assert!(validate_stock(0).is_ok());
        assert_eq!(validate_stock(-1), Err(ValidationError::NegativeStock));
    }

    #[test]
    fn test_validate_order_lines() {
        assert_eq!(
            validate_order_lines(&[], None, None),
            Err(ValidationError::EmptyOrder)
        );

        let lines = [OrderLine::new(1, 2), OrderLine::new(2, 0)];
        assert_eq!(
            validate_order_lines(&lines, None, None),
            Err(ValidationError::InvalidQuantity { quantity: 0 })
        );

        let lines = [OrderLine::new(1, 1), OrderLine::new(2, 1)];
        assert_eq!(
            validate_order_lines(&lines, Some(1), None),
            Err(ValidationError::TooManyLines { max: 1 })
        );
        assert!(validate_order_lines(&lines, Some(2), None).is_ok());

        let many = vec![OrderLine::new(1, 5000); 500];
        assert!(validate_order_lines(&many, None, None).is_ok());
    }
}
