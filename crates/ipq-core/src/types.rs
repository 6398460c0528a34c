//! # Domain Types
//!
//! Core domain types used throughout the resolution engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  QuantityRule   │   │   SiteOptions   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id, priority   │   │  rule_active    │       │
//! │  │  stock_quantity │   │  targets        │   │  limits         │       │
//! │  │  categories     │   │  roles          │   │  quantity note  │       │
//! │  │  tags           │   │  limits         │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌──────────────────────────┐   ┌─────────────────────────────────┐    │
//! │  │ ProductQuantitySettings  │   │        ResolvedSource           │    │
//! │  │  ──────────────────────  │   │  ─────────────────────────────  │    │
//! │  │  deactivated             │   │  Inactive | Override | Sitewide │    │
//! │  │  override_enabled        │   │  Rule(id) | None                │    │
//! │  │  limits                  │   │                                 │    │
//! │  └──────────────────────────┘   └─────────────────────────────────┘    │
//! │                                                                         │
//! │  QuantityLimits {min, max, step, min_oos, max_oos} is shared by the    │
//! │  three configuration sources.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

/// Product identifier.
pub type ProductId = i64;

/// Quantity rule identifier.
pub type RuleId = i64;

/// Taxonomy term identifier (categories and tags share one id space).
pub type TermId = i64;

// =============================================================================
// Product Type
// =============================================================================

/// Catalog type of a product.
///
/// Resolution ignores it; only variable products get client-side validation
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[default]
    Simple,
    Variable,
    Grouped,
    External,
}

impl ProductType {
    /// Returns the storage name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Simple => "simple",
            ProductType::Variable => "variable",
            ProductType::Grouped => "grouped",
            ProductType::External => "external",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(ProductType::Simple),
            "variable" => Ok(ProductType::Variable),
            "grouped" => Ok(ProductType::Grouped),
            "external" => Ok(ProductType::External),
            _ => Err(ValidationError::NotAllowed {
                field: "product_type".to_string(),
                allowed: ["simple", "variable", "grouped", "external"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// The catalog view of a product the engine needs.
///
/// Read-only here; the catalog owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    pub name: String,

    pub product_type: ProductType,

    /// Managed stock level. `None` when stock is not tracked.
    pub stock_quantity: Option<i64>,

    pub category_ids: BTreeSet<TermId>,

    pub tag_ids: BTreeSet<TermId>,
}

impl Product {
    /// Creates an untracked simple product with no terms.
    pub fn new(id: ProductId, name: impl Into<String>) -> Self {
        Product {
            id,
            name: name.into(),
            product_type: ProductType::Simple,
            stock_quantity: None,
            category_ids: BTreeSet::new(),
            tag_ids: BTreeSet::new(),
        }
    }

    pub fn with_type(mut self, product_type: ProductType) -> Self {
        self.product_type = product_type;
        self
    }

    pub fn with_stock(mut self, stock_quantity: Option<i64>) -> Self {
        self.stock_quantity = stock_quantity;
        self
    }

    pub fn with_categories(mut self, ids: impl IntoIterator<Item = TermId>) -> Self {
        self.category_ids.extend(ids);
        self
    }

    pub fn with_tags(mut self, ids: impl IntoIterator<Item = TermId>) -> Self {
        self.tag_ids.extend(ids);
        self
    }

    /// Union of category and tag ids.
    pub fn terms(&self) -> BTreeSet<TermId> {
        self.category_ids.union(&self.tag_ids).copied().collect()
    }

    /// Stock is tracked and at or below zero.
    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        matches!(self.stock_quantity, Some(stock) if stock <= 0)
    }

    #[inline]
    pub fn is_variable(&self) -> bool {
        self.product_type == ProductType::Variable
    }
}

// =============================================================================
// Quantity Limits
// =============================================================================

/// The five constraint values every configuration source carries.
///
/// Each value is a positive integer or absent; zero never appears because
/// [`crate::validation::validate_number`] maps it to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuantityLimits {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub step: Option<u32>,
    /// Minimum used while the product is out of stock.
    pub min_oos: Option<u32>,
    /// Maximum used while the product is out of stock.
    pub max_oos: Option<u32>,
}

impl QuantityLimits {
    pub fn new() -> Self {
        QuantityLimits::default()
    }

    pub fn min(mut self, value: u32) -> Self {
        self.min = positive(value);
        self
    }

    pub fn max(mut self, value: u32) -> Self {
        self.max = positive(value);
        self
    }

    pub fn step(mut self, value: u32) -> Self {
        self.step = positive(value);
        self
    }

    pub fn min_oos(mut self, value: u32) -> Self {
        self.min_oos = positive(value);
        self
    }

    pub fn max_oos(mut self, value: u32) -> Self {
        self.max_oos = positive(value);
        self
    }

    /// True when no value is set at all.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.step.is_none()
            && self.min_oos.is_none()
            && self.max_oos.is_none()
    }
}

fn positive(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}

// =============================================================================
// Quantity Rule
// =============================================================================

/// Category and tag ids a rule targets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxonomyTargets {
    pub categories: BTreeSet<TermId>,
    pub tags: BTreeSet<TermId>,
}

impl TaxonomyTargets {
    /// Union of category and tag targets.
    pub fn terms(&self) -> BTreeSet<TermId> {
        self.categories.union(&self.tags).copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.tags.is_empty()
    }
}

/// An administrator-authored quantity rule.
///
/// ## Matching
/// A rule applies to a product only when its targets share at least one
/// term with the product. Among applicable rules the lowest priority number
/// wins; a rule without priority loses to any rule that has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityRule {
    pub id: RuleId,

    pub title: String,

    pub targets: TaxonomyTargets,

    /// Lower wins. `None` ranks below every explicit priority.
    pub priority: Option<i64>,

    /// Roles the rule is offered to (`"guest"` for anonymous shoppers).
    pub roles: BTreeSet<String>,

    pub limits: QuantityLimits,
}

impl QuantityRule {
    /// Creates a rule with no targets, roles, priority or limits.
    pub fn new(id: RuleId, title: impl Into<String>) -> Self {
        QuantityRule {
            id,
            title: title.into(),
            targets: TaxonomyTargets::default(),
            priority: None,
            roles: BTreeSet::new(),
            limits: QuantityLimits::default(),
        }
    }

    pub fn with_categories(mut self, ids: impl IntoIterator<Item = TermId>) -> Self {
        self.targets.categories.extend(ids);
        self
    }

    pub fn with_tags(mut self, ids: impl IntoIterator<Item = TermId>) -> Self {
        self.targets.tags.extend(ids);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_limits(mut self, limits: QuantityLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Whether the rule is offered to `role`.
    #[inline]
    pub fn applies_to_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Publication state of a stored rule. Only published rules are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    #[default]
    Publish,
    Draft,
    Trash,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Publish => "publish",
            RuleStatus::Draft => "draft",
            RuleStatus::Trash => "trash",
        }
    }
}

impl FromStr for RuleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "publish" => Ok(RuleStatus::Publish),
            "draft" => Ok(RuleStatus::Draft),
            "trash" => Ok(RuleStatus::Trash),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["publish".into(), "draft".into(), "trash".into()],
            }),
        }
    }
}

// =============================================================================
// Product Override Settings
// =============================================================================

/// Per-product quantity settings from the product edit screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductQuantitySettings {
    /// Quantity limits are switched off for this product.
    pub deactivated: bool,

    /// `limits` replace any sitewide or rule values.
    pub override_enabled: bool,

    pub limits: QuantityLimits,
}

// =============================================================================
// Site Options
// =============================================================================

/// Where the quantity note is printed relative to the quantity input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotePosition {
    Above,
    #[default]
    Below,
}

impl NotePosition {
    /// Lenient parse; anything but "above" is below.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("above") {
            NotePosition::Above
        } else {
            NotePosition::Below
        }
    }
}

/// Normalized sitewide settings.
///
/// Built from the stored record by [`crate::options::SiteOptionsRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteOptions {
    /// Sitewide limits apply to every product without its own override.
    pub site_rule_active: bool,

    pub limits: QuantityLimits,

    pub show_qty_note: bool,

    /// Note template; `%MIN%` is replaced by the minimum.
    pub qty_text: String,

    pub qty_note_position: NotePosition,

    /// Extra CSS class for the note.
    pub qty_class: String,
}

impl Default for SiteOptions {
    fn default() -> Self {
        SiteOptions {
            site_rule_active: false,
            limits: QuantityLimits::default(),
            show_qty_note: false,
            qty_text: crate::options::DEFAULT_QTY_TEXT.to_string(),
            qty_note_position: NotePosition::Below,
            qty_class: String::new(),
        }
    }
}

impl SiteOptions {
    /// Activates the sitewide rule with the given limits.
    pub fn sitewide(limits: QuantityLimits) -> Self {
        SiteOptions {
            site_rule_active: true,
            limits,
            ..SiteOptions::default()
        }
    }

    /// Renders the quantity note for a minimum.
    ///
    /// ## Returns
    /// * `Some(text)` - note enabled and a minimum applies
    /// * `None` - note disabled or nothing to say
    pub fn quantity_note(&self, min: Option<u32>) -> Option<String> {
        if !self.show_qty_note {
            return None;
        }
        let min = min?;
        Some(self.qty_text.replace("%MIN%", &min.to_string()))
    }
}

// =============================================================================
// Resolved Source
// =============================================================================

/// Which configuration source governs a product for a role.
///
/// ## Precedence
/// ```text
/// deactivated flag ──yes──► Inactive
///        │no
/// override flag ─────yes──► Override
///        │no
/// site rule active ──yes──► Sitewide
///        │no
/// best matching rule ─────► Rule(id) | None
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "rule_id", rename_all = "snake_case")]
pub enum ResolvedSource {
    /// Quantity limits disabled for the product.
    Inactive,
    /// Per-product values.
    Override,
    /// Site options values.
    Sitewide,
    /// The values of one quantity rule.
    Rule(RuleId),
    /// No source applies.
    None,
}

impl ResolvedSource {
    /// Whether any constraint values come out of this source.
    #[inline]
    pub fn has_values(&self) -> bool {
        !matches!(self, ResolvedSource::Inactive | ResolvedSource::None)
    }

    /// The rule id for `Rule` sources.
    #[inline]
    pub fn rule_id(&self) -> Option<RuleId> {
        match self {
            ResolvedSource::Rule(id) => Some(*id),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResolvedSource::Inactive => "inactive",
            ResolvedSource::Override => "override",
            ResolvedSource::Sitewide => "sitewide",
            ResolvedSource::Rule(_) => "rule",
            ResolvedSource::None => "none",
        }
    }
}

impl fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedSource::Rule(id) => write!(f, "rule #{}", id),
            other => f.write_str(other.label()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_terms_union() {
        let product = Product::new(1, "Cola")
            .with_categories([10, 11])
            .with_tags([11, 30]);

        let terms: Vec<_> = product.terms().into_iter().collect();
        assert_eq!(terms, vec![10, 11, 30]);
    }

    #[test]
    fn test_product_out_of_stock() {
        assert!(!Product::new(1, "Untracked").is_out_of_stock());
        assert!(!Product::new(1, "In stock").with_stock(Some(4)).is_out_of_stock());
        assert!(Product::new(1, "Empty").with_stock(Some(0)).is_out_of_stock());
        assert!(Product::new(1, "Backorder").with_stock(Some(-2)).is_out_of_stock());
    }

    #[test]
    fn test_limits_builder_drops_zero() {
        let limits = QuantityLimits::new().min(0).max(10);
        assert_eq!(limits.min, None);
        assert_eq!(limits.max, Some(10));
        assert!(QuantityLimits::new().is_empty());
    }

    #[test]
    fn test_product_type_from_str() {
        assert_eq!("variable".parse::<ProductType>().unwrap(), ProductType::Variable);
        assert_eq!(" Simple ".parse::<ProductType>().unwrap(), ProductType::Simple);
        assert!("bundle".parse::<ProductType>().is_err());
    }

    #[test]
    fn test_rule_status_from_str() {
        assert_eq!("publish".parse::<RuleStatus>().unwrap(), RuleStatus::Publish);
        assert!("pending".parse::<RuleStatus>().is_err());
    }

    #[test]
    fn test_quantity_note() {
        let mut options = SiteOptions::default();
        assert_eq!(options.quantity_note(Some(3)), None);

        options.show_qty_note = true;
        assert_eq!(options.quantity_note(Some(3)).as_deref(), Some("Minimum Qty: 3"));
        assert_eq!(options.quantity_note(None), None);
    }

    #[test]
    fn test_resolved_source_display() {
        assert_eq!(ResolvedSource::Rule(12).to_string(), "rule #12");
        assert_eq!(ResolvedSource::Sitewide.to_string(), "sitewide");
        assert!(!ResolvedSource::Inactive.has_values());
        assert!(ResolvedSource::Override.has_values());
        assert_eq!(ResolvedSource::Rule(4).rule_id(), Some(4));
    }

    #[test]
    fn test_resolved_source_serialization() {
        let json = serde_json::to_string(&ResolvedSource::Rule(9)).unwrap();
        assert_eq!(json, r#"{"kind":"rule","rule_id":9}"#);

        let json = serde_json::to_string(&ResolvedSource::Inactive).unwrap();
        assert_eq!(json, r#"{"kind":"inactive"}"#);
    }
}
