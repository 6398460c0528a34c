//! # Rule Repository
//!
//! Role-filtered view of the published rules, cached per role.
//!
//! ## Cache Flow
//! ```text
//! rules_for_role("wholesale")
//!      │
//!      ▼
//! cache.get("ipq_rules_wholesale") ──hit──► decode ──ok──► return snapshot
//!      │miss                                  │err
//!      ▼                                      ▼
//! content.published_rules()  ◄────────────────┘
//!      │
//!      ▼
//! keep rules whose roles contain "wholesale"
//!      │
//!      ▼
//! cache.set("ipq_rules_wholesale", json, 12h) ──► return
//! ```
//!
//! The cache only speeds things up. A cache that cannot be read or written
//! is logged and bypassed; the rules still come from the content store.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::CoreResult;
use crate::ports::{CacheStore, ContentStore};
use crate::types::QuantityRule;
use crate::{RULE_CACHE_PREFIX, RULE_CACHE_TTL_SECS};

/// Per-role rule lookup.
#[derive(Clone)]
pub struct RuleRepository {
    content: Arc<dyn ContentStore>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl RuleRepository {
    /// Creates a repository with the default 12 hour snapshot lifetime.
    pub fn new(content: Arc<dyn ContentStore>, cache: Arc<dyn CacheStore>) -> Self {
        RuleRepository {
            content,
            cache,
            ttl: Duration::from_secs(RULE_CACHE_TTL_SECS),
        }
    }

    /// Sets the snapshot lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key of a role's snapshot.
    pub fn cache_key(role: &str) -> String {
        format!("{}{}", RULE_CACHE_PREFIX, role)
    }

    /// Published rules offered to `role`.
    ///
    /// ## Returns
    /// The cached snapshot when one is live, otherwise a fresh filtered list
    /// (which is then cached). No rules gives an empty vec.
    pub async fn rules_for_role(&self, role: &str) -> CoreResult<Vec<QuantityRule>> {
        let key = Self::cache_key(role);

        if let Some(rules) = self.cached(&key).await {
            debug!(role = %role, count = rules.len(), "Rule snapshot served from cache");
            return Ok(rules);
        }

        let rules: Vec<QuantityRule> = self
            .content
            .published_rules()
            .await?
            .into_iter()
            .filter(|rule| rule.applies_to_role(role))
            .collect();

        debug!(role = %role, count = rules.len(), "Rule snapshot built from store");

        match serde_json::to_string(&rules) {
            Ok(json) => {
                if let Err(e) = self.cache.set(&key, json, self.ttl).await {
                    warn!(role = %role, error = %e, "Failed to cache rule snapshot");
                }
            }
            Err(e) => warn!(role = %role, error = %e, "Failed to encode rule snapshot"),
        }

        Ok(rules)
    }

    async fn cached(&self, key: &str) -> Option<Vec<QuantityRule>> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key, error = %e, "Rule cache unreadable, bypassing");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(rules) => Some(rules),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable rule snapshot");
                None
            }
        }
    }

    /// Drops the cached snapshot of one role.
    pub async fn invalidate(&self, role: &str) -> CoreResult<()> {
        debug!(role = %role, "Invalidating rule snapshot");
        self.cache.delete(&Self::cache_key(role)).await
    }

    /// Drops the cached snapshots of several roles.
    pub async fn invalidate_all<I, S>(&self, roles: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for role in roles {
            self.invalidate(role.as_ref()).await?;
        }
        Ok(())
    }

    /// Gives every published rule without roles the full set of `known_roles`.
    ///
    /// Rules from before roles existed carry an empty set and would match
    /// nobody. Snapshots of every known role are dropped afterwards.
    ///
    /// ## Returns
    /// Number of rules updated.
    pub async fn backfill_roles(&self, known_roles: &[String]) -> CoreResult<usize> {
        let roles: BTreeSet<String> = known_roles.iter().cloned().collect();
        let mut updated = 0;

        for rule in self.content.published_rules().await? {
            if rule.roles.is_empty() {
                self.content.save_rule_roles(rule.id, &roles).await?;
                updated += 1;
            }
        }

        if updated > 0 {
            self.invalidate_all(&roles).await?;
        }

        info!(updated, roles = roles.len(), "Backfilled rule roles");
        Ok(updated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
