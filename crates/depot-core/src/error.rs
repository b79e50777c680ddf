//! # Error Types
//!
//! Domain-specific error types for depot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  depot-core errors (this file)                                         │
//! │  ├── CoreError        - Lifecycle and business rule violations         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  depot-store errors (separate crate)                                   │
//! │  └── StoreError       - Backend operation failures                     │
//! │                                                                         │
//! │  server errors (in app)                                                │
//! │  └── ApiError         - What the SPA sees (serialized)                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → ApiError → SPA       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the pure domain layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The requested status change is not allowed from the current status.
    ///
    /// ## When This Occurs
    /// - Approving a purchase order that was never submitted
    /// - Shipping a sales order that is still a draft
    /// - Any change out of a terminal status (Received, Cancelled, Delivered)
    #[error("{entity} {id} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: String,
        id: String,
        from: String,
        to: String,
    },

    /// The record is in a state that does not allow the operation.
    ///
    /// ## When This Occurs
    /// - Archiving an already archived record
    /// - Editing the lines of a purchase order that was already approved
    #[error("{entity} {id}: {reason}")]
    InvalidState {
        entity: String,
        id: String,
        reason: String,
    },

    /// Not enough stock on hand to ship.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Receiving (or shipping) more than the line still expects.
    #[error("Line {line} of {order}: {requested} exceeds remaining quantity {remaining}")]
    OverReceipt {
        order: String,
        line: usize,
        remaining: i64,
        requested: i64,
    },

    /// The operation would leave the system without an active administrator.
    #[error("At least one active administrator must remain")]
    LastAdmin,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity label and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write reaches a backend.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email, bad SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "PAL-001".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for PAL-001: available 3, requested 5"
        );

        let err = CoreError::InvalidTransition {
            entity: "Purchase order".to_string(),
            id: "po-1".to_string(),
            from: "Draft".to_string(),
            to: "Approved".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Purchase order po-1 cannot move from Draft to Approved"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: sku is required");
    }
}
