//! # Repository Module
//!
//! SQLite repositories behind the rule engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  QuantityEngine (ipq-core)                                              │
//! │       │                                                                 │
//! │       │  ports: ContentStore / OptionsStore / CacheStore                │
//! │       ▼                                                                 │
//! │  stores.rs adapters                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  QuantityRuleRepository   ProductRepository                             │
//! │  OptionsRepository        TransientRepository                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`QuantityRuleRepository`](rule::QuantityRuleRepository) - Rule CRUD and publication
//! - [`ProductRepository`](product::ProductRepository) - Products and override meta
//! - [`OptionsRepository`](options::OptionsRepository) - Options and the sitewide record
//! - [`TransientRepository`](transient::TransientRepository) - Expiring cache rows

pub mod options;
pub mod product;
pub mod rule;
pub mod transient;

use serde::de::DeserializeOwned;
use tracing::warn;

/// Decodes a JSON array column; malformed content reads as empty.
pub(crate) fn decode_json_list<T: DeserializeOwned>(raw: &str, column: &str, id: i64) -> Vec<T> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(id, column = %column, error = %e, "Malformed JSON column, treating as empty");
        Vec::new()
    })
}
