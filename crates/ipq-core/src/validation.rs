//! # Validation Module
//!
//! Normalization of admin-entered values.
//!
//! ## Where Raw Values Come From
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Raw Value Sources                                  │
//! │                                                                         │
//! │  Product meta box       "_wpbo_minimum" = "6"                          │
//! │  Quantity rule form     "_min" = "12 units"                            │
//! │  Site settings page     "ipq_site_min" = "0"                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  validate_number() ← THIS MODULE                                       │
//! │           │                                                             │
//! │           ├── "6"        → Some(6)                                     │
//! │           ├── "12 units" → Some(12)   (leading integer)                │
//! │           ├── "0"        → None       (zero means unset)               │
//! │           ├── "-5"       → None       (negative means unset)           │
//! │           └── ""         → None                                        │
//! │                                                                         │
//! │  Every quantity read from a store goes through this function.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Normalization
// =============================================================================

/// Normalizes a user-entered quantity.
///
/// ## Rules
/// - Escape backslashes are stripped first
/// - The leading integer is parsed (whitespace and sign allowed, trailing
///   characters ignored); no digits parses as 0
/// - 0 and negative values are "no value", never zero
/// - Values beyond `u32::MAX` saturate
///
/// ## Example
/// ```rust
/// use ipq_core::validation::validate_number;
///
/// assert_eq!(validate_number("7"), Some(7));
/// assert_eq!(validate_number("7abc"), Some(7));
/// assert_eq!(validate_number("0"), None);
/// assert_eq!(validate_number("-5"), None);
/// ```
pub fn validate_number(raw: &str) -> Option<u32> {
    let unescaped = strip_slashes(raw);
    let number = parse_leading_int(&unescaped).unwrap_or(0);

    if number <= 0 {
        return None;
    }

    Some(u32::try_from(number).unwrap_or(u32::MAX))
}

/// Parses a rule priority.
///
/// Unlike quantities, 0 and negative priorities are kept: lower numbers win,
/// so 0 is simply a very strong priority. Blank or digit-less input means the
/// priority is unset.
pub fn parse_priority(raw: &str) -> Option<i64> {
    parse_leading_int(&strip_slashes(raw))
}

/// Parses the leading integer of a string.
///
/// Returns `None` when no digit follows the optional whitespace and sign.
/// Overflow saturates at `i64::MIN` / `i64::MAX`.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;

    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        seen_digit = true;
        let digit = i64::from(byte - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }

    seen_digit.then_some(value)
}

/// Removes escaping backslashes; an escaped backslash becomes a single one.
fn strip_slashes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }

    out
}

// =============================================================================
// Flags and Identifiers
// =============================================================================

/// Checkbox values are stored as `"on"`; anything else is off.
pub fn is_flag_on(raw: &str) -> bool {
    raw.trim() == "on"
}

/// Validates a role identifier.
///
/// ## Rules
/// - Must not be empty after trimming
///
/// ## Returns
/// The trimmed role.
pub fn validate_role(role: &str) -> ValidationResult<&str> {
    let role = role.trim();

    if role.is_empty() {
        return Err(ValidationError::Required {
            field: "role".to_string(),
        });
    }

    Ok(role)
}

// =============================================================================
// Unit Tests
// =============================================================================
