//! # Error Types
//!
//! Domain-specific error types for ipq-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ipq-core errors (this file)                                           │
//! │  ├── CoreError        - Collaborator (store/cache) failures            │
//! │  └── ValidationError  - Unparsable field names, empty identifiers      │
//! │                                                                         │
//! │  ipq-db errors (separate crate)                                        │
//! │  ├── DbError          - Database operation failures → CoreError::Store │
//! │  └── ConfigError      - Config file / environment problems             │
//! │                                                                         │
//! │  Flow: DbError → CoreError → caller                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT an Error
//! Resolution is total over its inputs. A product no rule matches resolves
//! to `ResolvedSource::None`, a blank admin value reads as "no value", and an
//! unknown field name extracts as `ExtractedValue::None`. Errors only surface
//! when a collaborator itself fails (database unavailable, poisoned lock).

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Failures reported by the collaborators the engine reads from.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A content or options store could not answer.
    ///
    /// ## When This Occurs
    /// - SQLite pool closed or exhausted
    /// - In-memory store lock poisoned by a panicking writer
    #[error("Store unavailable: {0}")]
    Store(String),

    /// The rule cache could not be read or written.
    #[error("Cache unavailable: {0}")]
    Cache(String),

}

impl CoreError {
    /// Creates a Store error from any displayable message.
    pub fn store(message: impl Into<String>) -> Self {
        CoreError::Store(message.into())
    }

    /// Creates a Cache error from any displayable message.
    pub fn cache(message: impl Into<String>) -> Self {
        CoreError::Cache(message.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by the strict parsers (`FromStr`) and `validate_role` only; the
/// engine never returns them. The lenient entry points
/// such as `QuantityField::parse` turn the same inputs into `None`.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::store("pool closed");
        assert_eq!(err.to_string(), "Store unavailable: pool closed");

        let err = CoreError::cache("transients table missing");
        assert_eq!(err.to_string(), "Cache unavailable: transients table missing");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "role".to_string(),
        };
        assert_eq!(err.to_string(), "role is required");

        let err = ValidationError::NotAllowed {
            field: "field".to_string(),
            allowed: vec!["min".to_string(), "max".to_string()],
        };
        assert_eq!(err.to_string(), r#"field must be one of: ["min", "max"]"#);
    }
}
