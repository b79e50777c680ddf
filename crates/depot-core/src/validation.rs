//! # Validation Module
//!
//! Input validation shared by every entity's `validate()`.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: SPA forms                                                    │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (serde deserialization)                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE (Entity::validate)                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Repository (uniqueness, existence, lifecycle rules)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text name accepted anywhere.
pub const MAX_NAME_LEN: usize = 200;

/// Longest SKU / document number accepted.
pub const MAX_CODE_LEN: usize = 50;

/// Largest quantity accepted on a line, receipt or shipment.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Largest amount in cents accepted for a price, payment or order total.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000_000;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-blank value no longer than `max` characters.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a name field (1-200 characters).
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    validate_required(field, value, MAX_NAME_LEN)
}

/// Validates a code such as a SKU or PO number.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ```rust
/// use depot_core::validation::validate_code;
///
/// assert!(validate_code("sku", "PAL-001").is_ok());
/// assert!(validate_code("sku", "has space").is_err());
/// ```
pub fn validate_code(field: &str, value: &str) -> ValidationResult<()> {
    validate_required(field, value, MAX_CODE_LEN)?;

    if !value
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional email address. Blank is treated as absent.
pub fn validate_email(field: &str, value: Option<&str>) -> ValidationResult<()> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(());
    };

    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantities on hand may be zero but never negative.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Order line quantities and payment amounts must be strictly positive.
pub fn validate_positive(field: &str, value: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// A line, receipt or shipment quantity: at least one, at most
/// [`MAX_QUANTITY`].
pub fn validate_quantity(field: &str, value: i64) -> ValidationResult<()> {
    validate_positive(field, value)?;
    if value > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }

    Ok(())
}

/// A price or total in cents: zero up to [`MAX_AMOUNT_CENTS`].
pub fn validate_amount(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Normalizes a value for case-insensitive uniqueness checks.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}
