//! # ipq-db: SQLite Storage for Quantity Rules
//!
//! This crate stores products, quantity rules, site options and cache
//! transients in SQLite and plugs them into the ipq-core engine ports.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        IPQ Data Flow                                    │
//! │                                                                         │
//! │  QuantityEngine::limits(product, role)                                  │
//! │       │                                                                 │
//! │       ▼  ContentStore / OptionsStore / CacheStore                       │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ipq-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │   │   │
//! │  │   │               │    │ QuantityRule   │   │              │   │   │
//! │  │   │ SqlitePool    │◄───│ Product        │   │ 001_initial  │   │   │
//! │  │   │ IpqConfig     │    │ Options        │   │ _schema.sql  │   │   │
//! │  │   │               │    │ Transient      │   │              │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (ipq.db)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML configuration with environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Rule, product, options and transient repositories
//! - [`stores`] - ipq-core port implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ipq_core::memory::StaticIdentity;
//! use ipq_db::{Database, IpqConfig};
//!
//! let config = IpqConfig::load_or_default(None);
//! let db = Database::new(config.to_db_config()).await?;
//!
//! let engine = db.quantity_engine(Arc::new(StaticIdentity::guest()), Some(config.rule_cache_ttl()));
//! let product = db.products().get_by_id(42).await?.expect("product");
//! let limits = engine.limits(&product, Some("customer")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod stores;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, IpqConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::options::OptionsRepository;
pub use repository::product::{ProductQuantityMeta, ProductRepository};
pub use repository::rule::{QuantityRuleRepository, RuleDraft};
pub use repository::transient::TransientRepository;
