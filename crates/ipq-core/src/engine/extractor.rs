//! # Value Extractor
//!
//! Loads the data behind a [`ResolvedSource`] and hands it to the pure
//! extraction in [`crate::extraction`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::CoreResult;
use crate::extraction::{extract, ExtractedValue, QuantityField, QuantityValues, SourceData};
use crate::ports::{ContentStore, OptionsStore};
use crate::types::{Product, ResolvedSource};

/// Reads constraint values for resolved sources.
#[derive(Clone)]
pub struct ValueExtractor {
    content: Arc<dyn ContentStore>,
    options: Arc<dyn OptionsStore>,
}

impl ValueExtractor {
    pub fn new(content: Arc<dyn ContentStore>, options: Arc<dyn OptionsStore>) -> Self {
        ValueExtractor { content, options }
    }

    /// Extracts one field (or `All`) for `product` from `source`.
    pub async fn extract(
        &self,
        field: QuantityField,
        product: &Product,
        source: ResolvedSource,
    ) -> CoreResult<ExtractedValue> {
        let value = match source {
            ResolvedSource::Inactive => extract(field, product, SourceData::Inactive),
            ResolvedSource::None => extract(field, product, SourceData::Unresolved),
            ResolvedSource::Override => {
                let settings = self.content.product_settings(product.id).await?;
                extract(field, product, SourceData::Override(&settings))
            }
            ResolvedSource::Sitewide => {
                let options = self.options.site_options().await?;
                extract(field, product, SourceData::Sitewide(&options))
            }
            ResolvedSource::Rule(id) => match self.content.rule(id).await? {
                Some(rule) => extract(field, product, SourceData::Rule(&rule)),
                None => {
                    warn!(rule_id = id, "Resolved rule no longer exists");
                    ExtractedValue::None
                }
            },
        };

        debug!(product_id = product.id, source = %source, field = %field, "Extracted value");
        Ok(value)
    }

    /// Same as [`extract`](Self::extract) with a field name; unknown names
    /// give [`ExtractedValue::None`].
    pub async fn extract_named(
        &self,
        field: &str,
        product: &Product,
        source: ResolvedSource,
    ) -> CoreResult<ExtractedValue> {
        match QuantityField::parse(field) {
            Some(field) => self.extract(field, product, source).await,
            None => {
                debug!(field = %field, "Unknown field requested");
                Ok(ExtractedValue::None)
            }
        }
    }

    /// All values of `source`; `None` for Inactive/None sources.
    pub async fn values(
        &self,
        product: &Product,
        source: ResolvedSource,
    ) -> CoreResult<Option<QuantityValues>> {
        Ok(self.extract(QuantityField::All, product, source).await?.into_values())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryContentStore, MemoryOptionsStore};
    use crate::types::{ProductQuantitySettings, QuantityLimits, QuantityRule, SiteOptions};

    fn setup() -> (Arc<MemoryContentStore>, Arc<MemoryOptionsStore>, ValueExtractor) {
        let content = Arc::new(MemoryContentStore::new());
        let options = Arc::new(MemoryOptionsStore::default());
        let extractor = ValueExtractor::new(content.clone(), options.clone());
        (content, options, extractor)
    }

    #[tokio::test]
    async fn test_override_min_out_of_stock() {
        let (content, _, extractor) = setup();
        content
            .set_product_settings(
                1,
                ProductQuantitySettings {
                    override_enabled: true,
                    limits: QuantityLimits::new().min(2).min_oos(3),
                    ..Default::default()
                },
            )
            .unwrap();
        let product = Product::new(1, "Sold out").with_stock(Some(0));

        let min = extractor
            .extract(QuantityField::Min, &product, ResolvedSource::Override)
            .await
            .unwrap();
        assert_eq!(min, ExtractedValue::Quantity(3));

        let min_oos = extractor
            .extract(QuantityField::MinOos, &product, ResolvedSource::Override)
            .await
            .unwrap();
        assert_eq!(min_oos, ExtractedValue::Quantity(3));
    }

    #[tokio::test]
    async fn test_sitewide_single_field_shape_is_bare() {
        let (_, options, extractor) = setup();
        options
            .set(SiteOptions::sitewide(QuantityLimits::new().min(4).step(2)))
            .unwrap();
        let product = Product::new(1, "Any");

        let min = extractor
            .extract(QuantityField::Min, &product, ResolvedSource::Sitewide)
            .await
            .unwrap();
        assert_eq!(min, ExtractedValue::Quantity(4));
        assert_eq!(serde_json::to_string(&min).unwrap(), "4");
    }

    #[tokio::test]
    async fn test_rule_values() {
        let (content, _, extractor) = setup();
        content
            .insert_rule(
                QuantityRule::new(9, "Cases")
                    .with_priority(3)
                    .with_roles(["customer"])
                    .with_limits(QuantityLimits::new().min(6).step(6)),
            )
            .unwrap();
        let product = Product::new(1, "Any");

        let values = extractor
            .values(&product, ResolvedSource::Rule(9))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(values.min_value, Some(6));
        assert_eq!(values.step, Some(6));
        assert_eq!(values.priority, Some(3));
        assert_eq!(values.roles, Some(vec!["customer".to_string()]));
    }

    #[tokio::test]
    async fn test_missing_rule_yields_nothing() {
        let (_, _, extractor) = setup();
        let value = extractor
            .extract(QuantityField::Min, &Product::new(1, "Any"), ResolvedSource::Rule(404))
            .await
            .unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_unknown_field_name() {
        let (_, options, extractor) = setup();
        options.set(SiteOptions::sitewide(QuantityLimits::new().min(4))).unwrap();

        let value = extractor
            .extract_named("colour", &Product::new(1, "Any"), ResolvedSource::Sitewide)
            .await
            .unwrap();
        assert!(value.is_none());

        let value = extractor
            .extract_named("min", &Product::new(1, "Any"), ResolvedSource::Sitewide)
            .await
            .unwrap();
        assert_eq!(value.as_quantity(), Some(4));
    }

    #[tokio::test]
    async fn test_inactive_and_none_have_no_values() {
        let (_, _, extractor) = setup();
        let product = Product::new(1, "Any");
        assert_eq!(extractor.values(&product, ResolvedSource::Inactive).await.unwrap(), None);
        assert_eq!(extractor.values(&product, ResolvedSource::None).await.unwrap(), None);
    }
}
