//! # ipq-core: Quantity Rule Resolution Engine
//!
//! This crate decides which purchase-quantity constraints (minimum, maximum,
//! step and their out-of-stock variants) apply to a product for a given
//! customer role. It contains the decision logic only; every store it reads
//! from is reached through the traits in [`ports`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        IPQ Architecture                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Presentation (storefront script, admin screens)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ product + role                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ipq-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   RuleResolver ──► ResolvedSource ──► ValueExtractor            │   │
//! │  │        │                                   │                    │   │
//! │  │        ▼                                   ▼                    │   │
//! │  │   RuleRepository (per-role cache)     QuantityValues            │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO FILES • STORES ONLY THROUGH PORTS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ports (async traits)                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          ipq-db (SQLite)   or   memory (in-process maps)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, QuantityRule, SiteOptions, ResolvedSource)
//! - [`validation`] - Numeric normalization of admin-entered values
//! - [`options`] - Stored shape of the site options record and its defaults
//! - [`resolution`] - Pure precedence and rule-selection logic
//! - [`extraction`] - Pure value extraction for a resolved source
//! - [`ports`] - Traits for the content, options, cache and identity collaborators
//! - [`engine`] - Repository, resolver and extractor services wired over the ports
//! - [`memory`] - In-memory port implementations
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use ipq_core::engine::QuantityEngine;
//! use ipq_core::memory::{MemoryCacheStore, MemoryContentStore, MemoryOptionsStore, StaticIdentity};
//! use ipq_core::{Product, QuantityLimits, QuantityRule, ResolvedSource};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let content = Arc::new(MemoryContentStore::new());
//! content.insert_rule(
//!     QuantityRule::new(7, "Bulk drinks")
//!         .with_categories([15])
//!         .with_roles(["guest"])
//!         .with_priority(1)
//!         .with_limits(QuantityLimits::new().min(6).step(6)),
//! ).unwrap();
//!
//! let engine = QuantityEngine::new(
//!     content,
//!     Arc::new(MemoryOptionsStore::default()),
//!     Arc::new(MemoryCacheStore::new()),
//!     Arc::new(StaticIdentity::guest()),
//! );
//!
//! let product = Product::new(42, "Sparkling water").with_categories([15]);
//! let source = engine.resolve(&product, None).await.unwrap();
//! assert_eq!(source, ResolvedSource::Rule(7));
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod extraction;
pub mod memory;
pub mod options;
pub mod ports;
pub mod resolution;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use ipq_core::QuantityRule` instead of
// `use ipq_core::types::QuantityRule`

pub use error::{CoreError, CoreResult, ValidationError};
pub use extraction::{ExtractedValue, QuantityField, QuantityValues, ValidationParams};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Role used when no authenticated actor is present.
pub const GUEST_ROLE: &str = "guest";

/// Record kind under which quantity rules are stored.
pub const RULE_POST_TYPE: &str = "quantity-rule";

/// Publication status of rules that take part in resolution.
pub const PUBLISHED_STATUS: &str = "publish";

/// Cache key prefix for the per-role rule snapshot (`ipq_rules_<role>`).
pub const RULE_CACHE_PREFIX: &str = "ipq_rules_";

/// Lifetime of a per-role rule snapshot: 12 hours.
///
/// ## Staleness
/// Rule edits are not pushed into the cache. A snapshot keeps serving the
/// rule membership it captured until it expires or is invalidated through
/// [`engine::RuleRepository::invalidate`].
pub const RULE_CACHE_TTL_SECS: u64 = 60 * 60 * 12;

/// Options key holding the sitewide record.
pub const SITE_OPTIONS_KEY: &str = "ipq_options";
