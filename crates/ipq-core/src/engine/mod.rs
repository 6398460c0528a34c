//! # Engine Services
//!
//! The resolution services wired over the ports, plus [`QuantityEngine`],
//! the facade a presentation layer talks to.
//!
//! ## Request Flow
//! ```text
//! QuantityEngine::limits(product, role)
//!      │
//!      ├─► RuleResolver::resolve ──► product flags ─► site switch ─► rules
//!      │         │                                                   │
//!      │         │                                   RuleRepository (cache)
//!      │         ▼
//!      │   ResolvedSource
//!      │
//!      └─► ValueExtractor::values(product, source) ──► QuantityValues
//! ```
//!
//! Every call is request scoped. The only state written along the way is the
//! per-role rule snapshot in the cache store.

mod extractor;
mod repository;
mod resolver;

pub use extractor::ValueExtractor;
pub use repository::RuleRepository;
pub use resolver::RuleResolver;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::CoreResult;
use crate::extraction::{ExtractedValue, QuantityField, QuantityValues, ValidationParams};
use crate::ports::{CacheStore, ContentStore, IdentityProvider, OptionsStore};
use crate::types::{Product, ResolvedSource};

/// Resolution and extraction behind one handle.
#[derive(Clone)]
pub struct QuantityEngine {
    resolver: RuleResolver,
    extractor: ValueExtractor,
}

impl QuantityEngine {
    /// Wires the engine over its collaborators with the default cache TTL.
    pub fn new(
        content: Arc<dyn ContentStore>,
        options: Arc<dyn OptionsStore>,
        cache: Arc<dyn CacheStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let rules = RuleRepository::new(content.clone(), cache);
        QuantityEngine {
            resolver: RuleResolver::new(content.clone(), options.clone(), rules, identity),
            extractor: ValueExtractor::new(content, options),
        }
    }

    /// Same engine with a different rule snapshot lifetime.
    pub fn with_cache_ttl(
        content: Arc<dyn ContentStore>,
        options: Arc<dyn OptionsStore>,
        cache: Arc<dyn CacheStore>,
        identity: Arc<dyn IdentityProvider>,
        ttl: Duration,
    ) -> Self {
        let rules = RuleRepository::new(content.clone(), cache).with_ttl(ttl);
        QuantityEngine {
            resolver: RuleResolver::new(content.clone(), options.clone(), rules, identity),
            extractor: ValueExtractor::new(content, options),
        }
    }

    pub fn resolver(&self) -> &RuleResolver {
        &self.resolver
    }

    pub fn extractor(&self) -> &ValueExtractor {
        &self.extractor
    }

    /// Rule repository, for invalidation and role backfill.
    pub fn rules(&self) -> &RuleRepository {
        self.resolver.rules()
    }

    /// See [`RuleResolver::resolve`].
    pub async fn resolve(
        &self,
        product: &Product,
        role: Option<&str>,
    ) -> CoreResult<ResolvedSource> {
        self.resolver.resolve(product, role).await
    }

    /// See [`ValueExtractor::extract`].
    pub async fn extract(
        &self,
        field: QuantityField,
        product: &Product,
        source: ResolvedSource,
    ) -> CoreResult<ExtractedValue> {
        self.extractor.extract(field, product, source).await
    }

    /// See [`ValueExtractor::extract_named`].
    pub async fn extract_named(
        &self,
        field: &str,
        product: &Product,
        source: ResolvedSource,
    ) -> CoreResult<ExtractedValue> {
        self.extractor.extract_named(field, product, source).await
    }

    /// Resolves `product` and returns every value of the winning source.
    ///
    /// ## Returns
    /// `None` when the product is deactivated or nothing applies.
    pub async fn limits(
        &self,
        product: &Product,
        role: Option<&str>,
    ) -> CoreResult<Option<QuantityValues>> {
        let source = self.resolve(product, role).await?;
        self.extractor.values(product, source).await
    }

    /// Parameters for the storefront quantity script of a variable product.
    ///
    /// Out-of-stock values replace min/max here for every source, not only
    /// for product overrides. A tracked stock of exactly 0 counts as out of
    /// stock, unlike storefront checks that treat 0 as "not tracked".
    ///
    /// ## Returns
    /// `None` for non-variable products and when no source applies.
    pub async fn validation_params(
        &self,
        product: &Product,
        role: Option<&str>,
    ) -> CoreResult<Option<ValidationParams>> {
        if !product.is_variable() {
            return Ok(None);
        }

        let source = self.resolve(product, role).await?;
        let Some(values) = self.extractor.values(product, source).await? else {
            return Ok(None);
        };

        let values = if product.is_out_of_stock() {
            values.with_out_of_stock_values()
        } else {
            values
        };

        let params = ValidationParams::from(&values);
        debug!(product_id = product.id, source = %source, ?params, "Built validation params");
        Ok(Some(params))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCacheStore, MemoryContentStore, MemoryOptionsStore, StaticIdentity};
    use crate::types::{
        ProductQuantitySettings, ProductType, QuantityLimits, QuantityRule, SiteOptions,
    };

    struct Fixture {
        content: Arc<MemoryContentStore>,
        options: Arc<MemoryOptionsStore>,
        engine: QuantityEngine,
    }

    fn fixture() -> Fixture {
        let content = Arc::new(MemoryContentStore::new());
        let options = Arc::new(MemoryOptionsStore::default());
        let engine = QuantityEngine::new(
            content.clone(),
            options.clone(),
            Arc::new(MemoryCacheStore::new()),
            Arc::new(StaticIdentity::guest()),
        );
        Fixture {
            content,
            options,
            engine,
        }
    }

    fn shirt() -> Product {
        Product::new(50, "Shirt")
            .with_type(ProductType::Variable)
            .with_categories([3])
    }

    #[tokio::test]
    async fn test_limits_from_rule() {
        let fx = fixture();
        fx.content
            .insert_rule(
                QuantityRule::new(4, "Shirts")
                    .with_categories([3])
                    .with_roles(["guest"])
                    .with_priority(2)
                    .with_limits(QuantityLimits::new().min(2).max(20).step(2)),
            )
            .unwrap();

        let values = fx.engine.limits(&shirt(), None).await.unwrap().unwrap();
        assert_eq!(values.min_value, Some(2));
        assert_eq!(values.max_value, Some(20));
        assert_eq!(values.priority, Some(2));

        let min = fx
            .engine
            .extract_named("min", &shirt(), ResolvedSource::Rule(4))
            .await
            .unwrap();
        assert_eq!(min.as_quantity(), values.min_value);
    }

    #[tokio::test]
    async fn test_limits_none_when_nothing_applies() {
        let fx = fixture();
        assert_eq!(fx.engine.limits(&shirt(), None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_validation_params_only_for_variable_products() {
        let fx = fixture();
        fx.options
            .set(SiteOptions::sitewide(QuantityLimits::new().min(3).step(3)))
            .unwrap();

        let simple = Product::new(1, "Mug");
        assert_eq!(fx.engine.validation_params(&simple, None).await.unwrap(), None);

        let params = fx.engine.validation_params(&shirt(), None).await.unwrap().unwrap();
        assert_eq!(
            params,
            ValidationParams {
                min: Some(3),
                max: None,
                step: Some(3)
            }
        );
    }

    #[tokio::test]
    async fn test_validation_params_inactive() {
        let fx = fixture();
        fx.options.set(SiteOptions::sitewide(QuantityLimits::new().min(3))).unwrap();
        fx.content
            .set_product_settings(
                50,
                ProductQuantitySettings {
                    deactivated: true,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(fx.engine.validation_params(&shirt(), None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_validation_params_apply_out_of_stock_for_sitewide() {
        let fx = fixture();
        fx.options
            .set(SiteOptions::sitewide(
                QuantityLimits::new().min(5).max(50).min_oos(1).max_oos(2),
            ))
            .unwrap();

        let sold_out = shirt().with_stock(Some(0));

        // The extractor leaves sitewide values alone
        let min = fx
            .engine
            .extract(QuantityField::Min, &sold_out, ResolvedSource::Sitewide)
            .await
            .unwrap();
        assert_eq!(min, ExtractedValue::Quantity(5));

        let params = fx.engine.validation_params(&sold_out, None).await.unwrap().unwrap();
        assert_eq!(params.min, Some(1));
        assert_eq!(params.max, Some(2));

        let oversold = shirt().with_stock(Some(-3));
        let params = fx.engine.validation_params(&oversold, None).await.unwrap().unwrap();
        assert_eq!(params.min, Some(1));

        let in_stock = shirt().with_stock(Some(4));
        let params = fx.engine.validation_params(&in_stock, None).await.unwrap().unwrap();
        assert_eq!(params.min, Some(5));

        let untracked = shirt().with_stock(None);
        let params = fx.engine.validation_params(&untracked, None).await.unwrap().unwrap();
        assert_eq!(params.min, Some(5));
    }

    #[tokio::test]
    async fn test_explicit_role_and_rule_invalidation() {
        let fx = fixture();
        fx.content
            .insert_rule(
                QuantityRule::new(1, "Trade")
                    .with_categories([3])
                    .with_roles(["wholesale"])
                    .with_limits(QuantityLimits::new().min(12)),
            )
            .unwrap();

        assert_eq!(fx.engine.resolve(&shirt(), None).await.unwrap(), ResolvedSource::None);
        assert_eq!(
            fx.engine.resolve(&shirt(), Some("wholesale")).await.unwrap(),
            ResolvedSource::Rule(1)
        );

        fx.content
            .insert_rule(
                QuantityRule::new(2, "Retail")
                    .with_categories([3])
                    .with_roles(["guest"])
                    .with_limits(QuantityLimits::new().min(1)),
            )
            .unwrap();

        // The guest snapshot still predates the retail rule
        assert_eq!(fx.engine.resolve(&shirt(), None).await.unwrap(), ResolvedSource::None);
        fx.engine.rules().invalidate("guest").await.unwrap();
        assert_eq!(fx.engine.resolve(&shirt(), None).await.unwrap(), ResolvedSource::Rule(2));
    }

    #[tokio::test]
    async fn test_zero_ttl_engine_sees_changes() {
        let content = Arc::new(MemoryContentStore::new());
        let engine = QuantityEngine::with_cache_ttl(
            content.clone(),
            Arc::new(MemoryOptionsStore::default()),
            Arc::new(MemoryCacheStore::new()),
            Arc::new(StaticIdentity::guest()),
            Duration::ZERO,
        );
        assert_eq!(engine.rules().ttl(), Duration::ZERO);
        assert_eq!(engine.resolve(&shirt(), None).await.unwrap(), ResolvedSource::None);

        content
            .insert_rule(
                QuantityRule::new(8, "Any shirt")
                    .with_categories([3])
                    .with_roles(["guest"]),
            )
            .unwrap();
        assert_eq!(engine.resolve(&shirt(), None).await.unwrap(), ResolvedSource::Rule(8));
    }
}
