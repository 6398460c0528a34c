//! # Value Extraction
//!
//! Turns a resolved source into constraint values.
//!
//! ## Per-Source Behavior
//! ```text
//! ┌──────────────┬──────────────────────────────┬─────────────────────────┐
//! │ Source       │ Values read from             │ Out-of-stock swap       │
//! ├──────────────┼──────────────────────────────┼─────────────────────────┤
//! │ Inactive     │ -                            │ -  (every field absent) │
//! │ None         │ -                            │ -  (every field absent) │
//! │ Override     │ product quantity settings    │ min/max ← *_oos if set  │
//! │ Sitewide     │ site options                 │ never                   │
//! │ Rule(id)     │ the rule                     │ never                   │
//! └──────────────┴──────────────────────────────┴─────────────────────────┘
//! ```
//!
//! The swap applies when the product tracks stock and has none left. Queries
//! for `min_oos` / `max_oos` themselves always return the stored value.
//!
//! ## Return Shape
//! Every source answers single-field queries with the same
//! [`ExtractedValue`] variant; sitewide values are not wrapped in a labeled
//! record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{Product, ProductQuantitySettings, QuantityLimits, QuantityRule, SiteOptions};

// =============================================================================
// Field Selector
// =============================================================================

/// The value a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityField {
    Min,
    Max,
    Step,
    MinOos,
    MaxOos,
    Priority,
    Role,
    All,
}

impl QuantityField {
    pub const ALL_NAMES: [&'static str; 8] =
        ["min", "max", "step", "min_oos", "max_oos", "priority", "role", "all"];

    /// Lenient parse: unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "min" => Some(QuantityField::Min),
            "max" => Some(QuantityField::Max),
            "step" => Some(QuantityField::Step),
            "min_oos" => Some(QuantityField::MinOos),
            "max_oos" => Some(QuantityField::MaxOos),
            "priority" => Some(QuantityField::Priority),
            "role" => Some(QuantityField::Role),
            "all" => Some(QuantityField::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityField::Min => "min",
            QuantityField::Max => "max",
            QuantityField::Step => "step",
            QuantityField::MinOos => "min_oos",
            QuantityField::MaxOos => "max_oos",
            QuantityField::Priority => "priority",
            QuantityField::Role => "role",
            QuantityField::All => "all",
        }
    }
}

impl fmt::Display for QuantityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantityField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuantityField::parse(s).ok_or_else(|| ValidationError::NotAllowed {
            field: "field".to_string(),
            allowed: QuantityField::ALL_NAMES.iter().map(|s| s.to_string()).collect(),
        })
    }
}

// =============================================================================
// Results
// =============================================================================

/// The full set of values for a source.
///
/// `priority` and `roles` are only filled for rule sources.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuantityValues {
    pub min_value: Option<u32>,
    pub max_value: Option<u32>,
    pub step: Option<u32>,
    pub min_oos: Option<u32>,
    pub max_oos: Option<u32>,
    #[ts(type = "number | null")]
    pub priority: Option<i64>,
    pub roles: Option<Vec<String>>,
}

impl QuantityValues {
    /// Applies out-of-stock values to min/max where they are set.
    pub fn with_out_of_stock_values(mut self) -> Self {
        if self.min_oos.is_some() {
            self.min_value = self.min_oos;
        }
        if self.max_oos.is_some() {
            self.max_value = self.max_oos;
        }
        self
    }
}

/// Answer to a single extraction query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtractedValue {
    /// No value: inactive, unresolved, unset, or not applicable.
    None,
    Quantity(u32),
    Priority(i64),
    Roles(Vec<String>),
    All(QuantityValues),
}

impl ExtractedValue {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, ExtractedValue::None)
    }

    pub fn as_quantity(&self) -> Option<u32> {
        match self {
            ExtractedValue::Quantity(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_priority(&self) -> Option<i64> {
        match self {
            ExtractedValue::Priority(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_roles(&self) -> Option<&[String]> {
        match self {
            ExtractedValue::Roles(roles) => Some(roles),
            _ => None,
        }
    }

    pub fn into_values(self) -> Option<QuantityValues> {
        match self {
            ExtractedValue::All(values) => Some(values),
            _ => None,
        }
    }
}

fn quantity(value: Option<u32>) -> ExtractedValue {
    value.map_or(ExtractedValue::None, ExtractedValue::Quantity)
}

/// Parameters handed to the storefront quantity-input script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidationParams {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub step: Option<u32>,
}

impl From<&QuantityValues> for ValidationParams {
    fn from(values: &QuantityValues) -> Self {
        ValidationParams {
            min: values.min_value,
            max: values.max_value,
            step: values.step,
        }
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// The loaded data behind a resolved source.
#[derive(Debug, Clone, Copy)]
pub enum SourceData<'a> {
    Inactive,
    Unresolved,
    Override(&'a ProductQuantitySettings),
    Sitewide(&'a SiteOptions),
    Rule(&'a QuantityRule),
}

/// Extracts `field` for `product` from already-loaded source data.
pub fn extract(field: QuantityField, product: &Product, data: SourceData<'_>) -> ExtractedValue {
    match data {
        SourceData::Inactive | SourceData::Unresolved => ExtractedValue::None,
        SourceData::Override(settings) => extract_override(field, product, &settings.limits),
        SourceData::Sitewide(options) => extract_limits(field, &options.limits),
        SourceData::Rule(rule) => extract_rule(field, rule),
    }
}

fn extract_override(
    field: QuantityField,
    product: &Product,
    limits: &QuantityLimits,
) -> ExtractedValue {
    let out_of_stock = product.is_out_of_stock();
    let min = if out_of_stock { limits.min_oos.or(limits.min) } else { limits.min };
    let max = if out_of_stock { limits.max_oos.or(limits.max) } else { limits.max };

    match field {
        QuantityField::Min => quantity(min),
        QuantityField::Max => quantity(max),
        QuantityField::All => ExtractedValue::All(QuantityValues {
            min_value: min,
            max_value: max,
            ..values_of(limits)
        }),
        other => extract_limits(other, limits),
    }
}

fn extract_rule(field: QuantityField, rule: &QuantityRule) -> ExtractedValue {
    match field {
        QuantityField::Priority => {
            rule.priority.map_or(ExtractedValue::None, ExtractedValue::Priority)
        }
        QuantityField::Role => ExtractedValue::Roles(rule.roles.iter().cloned().collect()),
        QuantityField::All => ExtractedValue::All(QuantityValues {
            priority: rule.priority,
            roles: Some(rule.roles.iter().cloned().collect()),
            ..values_of(&rule.limits)
        }),
        other => extract_limits(other, &rule.limits),
    }
}

/// Plain reads; priority and role are not applicable here.
fn extract_limits(field: QuantityField, limits: &QuantityLimits) -> ExtractedValue {
    match field {
        QuantityField::Min => quantity(limits.min),
        QuantityField::Max => quantity(limits.max),
        QuantityField::Step => quantity(limits.step),
        QuantityField::MinOos => quantity(limits.min_oos),
        QuantityField::MaxOos => quantity(limits.max_oos),
        QuantityField::Priority | QuantityField::Role => ExtractedValue::None,
        QuantityField::All => ExtractedValue::All(values_of(limits)),
    }
}

fn values_of(limits: &QuantityLimits) -> QuantityValues {
    QuantityValues {
        min_value: limits.min,
        max_value: limits.max,
        step: limits.step,
        min_oos: limits.min_oos,
        max_oos: limits.max_oos,
        priority: None,
        roles: None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn override_settings() -> ProductQuantitySettings {
        ProductQuantitySettings {
            deactivated: false,
            override_enabled: true,
            limits: QuantityLimits::new().min(2).max(10).step(2).min_oos(3).max_oos(4),
        }
    }

    fn empty_product() -> Product {
        Product::new(1, "Out of stock").with_stock(Some(0))
    }

    #[test]
    fn test_field_parse() {
        assert_eq!(QuantityField::parse("min_oos"), Some(QuantityField::MinOos));
        assert_eq!(QuantityField::parse("minimum"), None);
        assert!("colour".parse::<QuantityField>().is_err());
        for name in QuantityField::ALL_NAMES {
            assert_eq!(QuantityField::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_inactive_and_unresolved_yield_nothing() {
        let product = Product::new(1, "Any");
        for name in QuantityField::ALL_NAMES {
            let field = QuantityField::parse(name).unwrap();
            assert!(extract(field, &product, SourceData::Inactive).is_none());
            assert!(extract(field, &product, SourceData::Unresolved).is_none());
        }
    }

    #[test]
    fn test_override_substitutes_out_of_stock_min() {
        let settings = override_settings();
        let value = extract(QuantityField::Min, &empty_product(), SourceData::Override(&settings));
        assert_eq!(value, ExtractedValue::Quantity(3));

        let value = extract(QuantityField::Max, &empty_product(), SourceData::Override(&settings));
        assert_eq!(value, ExtractedValue::Quantity(4));
    }

    #[test]
    fn test_override_raw_oos_fields_not_substituted() {
        let settings = override_settings();
        let source = SourceData::Override(&settings);

        let value = extract(QuantityField::MinOos, &empty_product(), source);
        assert_eq!(value, ExtractedValue::Quantity(3));

        let value = extract(QuantityField::MaxOos, &empty_product(), source);
        assert_eq!(value, ExtractedValue::Quantity(4));
    }

    #[test]
    fn test_override_in_stock_uses_plain_values() {
        let settings = override_settings();
        let in_stock = Product::new(1, "Stocked").with_stock(Some(8));
        let untracked = Product::new(2, "Untracked");

        for product in [&in_stock, &untracked] {
            assert_eq!(
                extract(QuantityField::Min, product, SourceData::Override(&settings)),
                ExtractedValue::Quantity(2)
            );
        }
    }

    #[test]
    fn test_override_falls_back_when_oos_unset() {
        let settings = ProductQuantitySettings {
            override_enabled: true,
            limits: QuantityLimits::new().min(2).max(10),
            ..Default::default()
        };
        let value = extract(QuantityField::Min, &empty_product(), SourceData::Override(&settings));
        assert_eq!(value, ExtractedValue::Quantity(2));
    }

    #[test]
    fn test_override_all_substitutes() {
        let settings = override_settings();
        let values = extract(QuantityField::All, &empty_product(), SourceData::Override(&settings))
            .into_values()
            .unwrap();

        assert_eq!(values.min_value, Some(3));
        assert_eq!(values.max_value, Some(4));
        assert_eq!(values.step, Some(2));
        assert_eq!(values.min_oos, Some(3));
        assert_eq!(values.priority, None);
        assert_eq!(values.roles, None);
    }

    #[test]
    fn test_override_has_no_priority_or_role() {
        let settings = override_settings();
        let product = Product::new(1, "Any");
        let source = SourceData::Override(&settings);
        assert!(extract(QuantityField::Priority, &product, source).is_none());
        assert!(extract(QuantityField::Role, &product, source).is_none());
    }

    #[test]
    fn test_sitewide_never_substitutes() {
        let options = SiteOptions::sitewide(QuantityLimits::new().min(5).max(50).min_oos(1));

        let value = extract(QuantityField::Min, &empty_product(), SourceData::Sitewide(&options));
        assert_eq!(value, ExtractedValue::Quantity(5));

        let values = extract(QuantityField::All, &empty_product(), SourceData::Sitewide(&options))
            .into_values()
            .unwrap();
        assert_eq!(values.min_value, Some(5));
        assert_eq!(values.min_oos, Some(1));

        let source = SourceData::Sitewide(&options);
        let value = extract(QuantityField::MinOos, &empty_product(), source);
        assert_eq!(value, ExtractedValue::Quantity(1));
    }

    #[test]
    fn test_sitewide_has_no_priority_or_role() {
        let options = SiteOptions::sitewide(QuantityLimits::new().min(5));
        let source = SourceData::Sitewide(&options);

        assert!(extract(QuantityField::Priority, &empty_product(), source).is_none());
        assert!(extract(QuantityField::Role, &empty_product(), source).is_none());
    }

    #[test]
    fn test_rule_never_substitutes() {
        let rule = QuantityRule::new(3, "Cases")
            .with_limits(QuantityLimits::new().min(6).min_oos(1));

        let value = extract(QuantityField::Min, &empty_product(), SourceData::Rule(&rule));
        assert_eq!(value, ExtractedValue::Quantity(6));
    }

    #[test]
    fn test_rule_all_matches_individual_fields() {
        let rule = QuantityRule::new(3, "Wholesale")
            .with_priority(2)
            .with_roles(["wholesale", "guest"])
            .with_limits(QuantityLimits::new().min(6).max(60).step(6).min_oos(12).max_oos(24));
        let product = Product::new(1, "Any").with_stock(Some(-1));
        let data = SourceData::Rule(&rule);

        let all = extract(QuantityField::All, &product, data).into_values().unwrap();

        assert_eq!(all.min_value, extract(QuantityField::Min, &product, data).as_quantity());
        assert_eq!(all.max_value, extract(QuantityField::Max, &product, data).as_quantity());
        assert_eq!(all.step, extract(QuantityField::Step, &product, data).as_quantity());
        assert_eq!(all.min_oos, extract(QuantityField::MinOos, &product, data).as_quantity());
        assert_eq!(all.max_oos, extract(QuantityField::MaxOos, &product, data).as_quantity());
        assert_eq!(all.priority, extract(QuantityField::Priority, &product, data).as_priority());
        assert_eq!(
            all.roles.as_deref(),
            extract(QuantityField::Role, &product, data).as_roles()
        );
        assert_eq!(all.roles, Some(vec!["guest".to_string(), "wholesale".to_string()]));
    }

    #[test]
    fn test_rule_unset_values_are_absent() {
        let rule = QuantityRule::new(3, "Step only").with_limits(QuantityLimits::new().step(4));
        let product = Product::new(1, "Any");

        assert!(extract(QuantityField::Min, &product, SourceData::Rule(&rule)).is_none());
        assert!(extract(QuantityField::Priority, &product, SourceData::Rule(&rule)).is_none());
        assert_eq!(
            extract(QuantityField::Step, &product, SourceData::Rule(&rule)),
            ExtractedValue::Quantity(4)
        );
    }

    #[test]
    fn test_values_out_of_stock_swap() {
        let values = QuantityValues {
            min_value: Some(2),
            max_value: Some(10),
            min_oos: Some(1),
            ..Default::default()
        }
        .with_out_of_stock_values();

        assert_eq!(values.min_value, Some(1));
        assert_eq!(values.max_value, Some(10));
    }
}
