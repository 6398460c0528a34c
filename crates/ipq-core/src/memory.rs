//! # In-Memory Ports
//!
//! Port implementations over plain maps, for tests and for embedders that
//! keep their catalog in process.
//!
//! ## Thread Safety
//! Each store wraps its map in `std::sync::RwLock`/`Mutex`. Locks are held
//! only for the copy in or out, never across an `.await`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::ports::{CacheStore, ContentStore, IdentityProvider, OptionsStore};
use crate::types::{
    ProductId, ProductQuantitySettings, QuantityRule, RuleId, RuleStatus, SiteOptions,
};

fn poisoned<T>(_: PoisonError<T>) -> CoreError {
    CoreError::store("memory store lock poisoned")
}

// =============================================================================
// Content Store
// =============================================================================

#[derive(Debug, Clone)]
struct StoredRule {
    rule: QuantityRule,
    status: RuleStatus,
}

/// Rules and product settings held in maps.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    rules: RwLock<BTreeMap<RuleId, StoredRule>>,
    products: RwLock<HashMap<ProductId, ProductQuantitySettings>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        MemoryContentStore::default()
    }

    /// Inserts or replaces a published rule.
    pub fn insert_rule(&self, rule: QuantityRule) -> CoreResult<()> {
        self.insert_rule_with_status(rule, RuleStatus::Publish)
    }

    pub fn insert_rule_with_status(
        &self,
        rule: QuantityRule,
        status: RuleStatus,
    ) -> CoreResult<()> {
        let mut rules = self.rules.write().map_err(poisoned)?;
        rules.insert(rule.id, StoredRule { rule, status });
        Ok(())
    }

    pub fn remove_rule(&self, id: RuleId) -> CoreResult<Option<QuantityRule>> {
        let mut rules = self.rules.write().map_err(poisoned)?;
        Ok(rules.remove(&id).map(|stored| stored.rule))
    }

    pub fn set_product_settings(
        &self,
        product_id: ProductId,
        settings: ProductQuantitySettings,
    ) -> CoreResult<()> {
        let mut products = self.products.write().map_err(poisoned)?;
        products.insert(product_id, settings);
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn published_rules(&self) -> CoreResult<Vec<QuantityRule>> {
        let rules = self.rules.read().map_err(poisoned)?;
        Ok(rules
            .values()
            .filter(|stored| stored.status == RuleStatus::Publish)
            .map(|stored| stored.rule.clone())
            .collect())
    }

    async fn rule(&self, id: RuleId) -> CoreResult<Option<QuantityRule>> {
        let rules = self.rules.read().map_err(poisoned)?;
        Ok(rules.get(&id).map(|stored| stored.rule.clone()))
    }

    async fn product_settings(&self, product_id: ProductId) -> CoreResult<ProductQuantitySettings> {
        let products = self.products.read().map_err(poisoned)?;
        Ok(products.get(&product_id).copied().unwrap_or_default())
    }

    async fn save_rule_roles(&self, id: RuleId, roles: &BTreeSet<String>) -> CoreResult<()> {
        let mut rules = self.rules.write().map_err(poisoned)?;
        if let Some(stored) = rules.get_mut(&id) {
            stored.rule.roles = roles.clone();
        }
        Ok(())
    }
}

// =============================================================================
// Options Store
// =============================================================================

/// Site options held in memory.
#[derive(Debug, Default)]
pub struct MemoryOptionsStore {
    options: RwLock<SiteOptions>,
}

impl MemoryOptionsStore {
    pub fn new(options: SiteOptions) -> Self {
        MemoryOptionsStore {
            options: RwLock::new(options),
        }
    }

    pub fn set(&self, options: SiteOptions) -> CoreResult<()> {
        *self.options.write().map_err(poisoned)? = options;
        Ok(())
    }
}

#[async_trait]
impl OptionsStore for MemoryOptionsStore {
    async fn site_options(&self) -> CoreResult<SiteOptions> {
        Ok(self.options.read().map_err(poisoned)?.clone())
    }
}

// =============================================================================
// Cache Store
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Expiring string cache.
///
/// Expired entries are dropped lazily when read.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        MemoryCacheStore::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn expiry(ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::cache("memory cache lock poisoned"))?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CoreResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::cache("memory cache lock poisoned"))?;

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: expiry(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::cache("memory cache lock poisoned"))?;

        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Identity
// =============================================================================

/// A fixed actor.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    role: Option<String>,
}

impl StaticIdentity {
    /// Nobody signed in.
    pub fn guest() -> Self {
        StaticIdentity { role: None }
    }

    pub fn signed_in(role: impl Into<String>) -> Self {
        StaticIdentity {
            role: Some(role.into()),
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_role(&self) -> Option<String> {
        self.role.clone()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
