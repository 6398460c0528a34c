//! # Ports
//!
//! Traits for the collaborators the engine reads from.
//!
//! ## Implementations
//! ```text
//! ┌───────────────────┬──────────────────────────┬──────────────────────────┐
//! │ Port              │ ipq-db (SQLite)          │ ipq-core::memory         │
//! ├───────────────────┼──────────────────────────┼──────────────────────────┤
//! │ ContentStore      │ Database                 │ MemoryContentStore       │
//! │ OptionsStore      │ OptionsRepository        │ MemoryOptionsStore       │
//! │ CacheStore        │ TransientRepository      │ MemoryCacheStore         │
//! │ IdentityProvider  │ (presentation layer)     │ StaticIdentity           │
//! └───────────────────┴──────────────────────────┴──────────────────────────┘
//! ```
//!
//! Stores are async because the SQLite adapters are; the engine awaits them
//! sequentially within one request.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{ProductId, ProductQuantitySettings, QuantityRule, RuleId, SiteOptions};

/// Rules and per-product quantity settings.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All published quantity rules, in no particular order.
    async fn published_rules(&self) -> CoreResult<Vec<QuantityRule>>;

    /// One rule by id, whatever its status.
    async fn rule(&self, id: RuleId) -> CoreResult<Option<QuantityRule>>;

    /// Override flags and values of a product.
    ///
    /// A product without stored settings has every flag off.
    async fn product_settings(&self, product_id: ProductId) -> CoreResult<ProductQuantitySettings>;

    /// Replaces the role set of a rule.
    async fn save_rule_roles(&self, id: RuleId, roles: &BTreeSet<String>) -> CoreResult<()>;
}

/// The sitewide settings record.
#[async_trait]
pub trait OptionsStore: Send + Sync {
    /// Current site options; defaults when nothing is stored.
    async fn site_options(&self) -> CoreResult<SiteOptions>;
}

/// Expiring key/value storage for JSON snapshots.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Value under `key` unless missing or expired.
    async fn get(&self, key: &str) -> CoreResult<Option<String>>;

    /// Stores `value` under `key` for `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CoreResult<()>;

    async fn delete(&self, key: &str) -> CoreResult<()>;
}

/// Who is asking.
pub trait IdentityProvider: Send + Sync {
    /// Primary role of the authenticated actor; `None` when nobody is signed in.
    fn current_role(&self) -> Option<String>;
}
