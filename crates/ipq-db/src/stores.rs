//! # Port Adapters
//!
//! ipq-core port implementations over the SQLite repositories.
//!
//! ```text
//! ContentStore  ◄── Database            (rules + product meta)
//! OptionsStore  ◄── OptionsRepository   (ipq_options record)
//! CacheStore    ◄── TransientRepository (transients table)
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::pool::Database;
use crate::repository::options::OptionsRepository;
use crate::repository::transient::TransientRepository;
use ipq_core::ports::{CacheStore, ContentStore, OptionsStore};
use ipq_core::{
    CoreError, CoreResult, ProductId, ProductQuantitySettings, QuantityRule, RuleId, SiteOptions,
};

#[async_trait]
impl ContentStore for Database {
    async fn published_rules(&self) -> CoreResult<Vec<QuantityRule>> {
        Ok(self.rules().published().await?)
    }

    async fn rule(&self, id: RuleId) -> CoreResult<Option<QuantityRule>> {
        Ok(self.rules().get(id).await?)
    }

    async fn product_settings(&self, product_id: ProductId) -> CoreResult<ProductQuantitySettings> {
        Ok(self.products().quantity_settings(product_id).await?)
    }

    async fn save_rule_roles(&self, id: RuleId, roles: &BTreeSet<String>) -> CoreResult<()> {
        Ok(self.rules().set_roles(id, roles).await?)
    }
}

#[async_trait]
impl OptionsStore for OptionsRepository {
    async fn site_options(&self) -> CoreResult<SiteOptions> {
        Ok(OptionsRepository::site_options(self).await?)
    }
}

// Cache failures are reported as Cache, not Store, so the rule repository
// can log and bypass them.
#[async_trait]
impl CacheStore for TransientRepository {
    async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        TransientRepository::get(self, key)
            .await
            .map_err(|e| CoreError::cache(e.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CoreResult<()> {
        TransientRepository::set(self, key, &value, ttl)
            .await
            .map_err(|e| CoreError::cache(e.to_string()))
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        TransientRepository::delete(self, key)
            .await
            .map_err(|e| CoreError::cache(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
