//! # Resolution
//!
//! Pure decision logic: which configuration source governs a product.
//!
//! ## Two Stages
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stage 1: source_precedence()            (fixed business order)         │
//! │                                                                         │
//! │    settings.deactivated      → Inactive                                │
//! │    settings.override_enabled → Override                                │
//! │    options.site_rule_active  → Sitewide                                │
//! │    otherwise                 → fall through to stage 2                 │
//! │                                                                         │
//! │  Stage 2: select_rule()                                                │
//! │                                                                         │
//! │    candidates = rules for role                                          │
//! │    matching   = candidates where targets ∩ product terms ≠ ∅           │
//! │    winner     = min by (priority unset?, priority, id)                  │
//! │                                                                         │
//! │    R1 prio 1 ┐                                                          │
//! │    R2 prio 5 ├──► R1                                                   │
//! │    R3 unset  ┘                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Equal priorities (and the all-unset case) go to the lowest rule id so the
//! winner never depends on store iteration order.

use crate::types::{
    Product, ProductQuantitySettings, QuantityRule, ResolvedSource, RuleId, SiteOptions,
};

/// Applies the fixed precedence of product flags and the sitewide switch.
///
/// ## Returns
/// * `Some(source)` - decided without looking at rules
/// * `None` - rule matching decides
pub fn source_precedence(
    settings: &ProductQuantitySettings,
    options: &SiteOptions,
) -> Option<ResolvedSource> {
    if settings.deactivated {
        Some(ResolvedSource::Inactive)
    } else if settings.override_enabled {
        Some(ResolvedSource::Override)
    } else if options.site_rule_active {
        Some(ResolvedSource::Sitewide)
    } else {
        None
    }
}

/// Whether a rule targets at least one of the product's terms.
///
/// A rule without targets matches nothing.
pub fn rule_matches(rule: &QuantityRule, product: &Product) -> bool {
    let product_terms = product.terms();
    rule.targets
        .categories
        .iter()
        .chain(rule.targets.tags.iter())
        .any(|term| product_terms.contains(term))
}

/// Picks the governing rule among `rules` for `product`.
pub fn select_rule<'a, I>(rules: I, product: &Product) -> Option<&'a QuantityRule>
where
    I: IntoIterator<Item = &'a QuantityRule>,
{
    rules
        .into_iter()
        .filter(|rule| rule_matches(rule, product))
        .min_by_key(|rule| precedence_key(rule))
}

/// Sort key: explicit priorities first, lower number first, lower id first.
fn precedence_key(rule: &QuantityRule) -> (bool, i64, RuleId) {
    match rule.priority {
        Some(priority) => (false, priority, rule.id),
        None => (true, 0, rule.id),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuantityLimits;

    fn product() -> Product {
        Product::new(100, "Cola 330ml").with_categories([10]).with_tags([50])
    }

    fn rule(id: RuleId) -> QuantityRule {
        QuantityRule::new(id, format!("Rule {id}")).with_roles(["guest"])
    }

    #[test]
    fn test_deactivated_wins_over_everything() {
        let settings = ProductQuantitySettings {
            deactivated: true,
            override_enabled: true,
            limits: QuantityLimits::new().min(2),
        };
        let options = SiteOptions::sitewide(QuantityLimits::new().min(5));

        assert_eq!(
            source_precedence(&settings, &options),
            Some(ResolvedSource::Inactive)
        );
    }

    #[test]
    fn test_override_beats_sitewide() {
        let settings = ProductQuantitySettings {
            override_enabled: true,
            ..Default::default()
        };
        let options = SiteOptions::sitewide(QuantityLimits::new().min(5));

        assert_eq!(
            source_precedence(&settings, &options),
            Some(ResolvedSource::Override)
        );
    }

    #[test]
    fn test_sitewide_when_no_product_flags() {
        let options = SiteOptions::sitewide(QuantityLimits::new());
        assert_eq!(
            source_precedence(&ProductQuantitySettings::default(), &options),
            Some(ResolvedSource::Sitewide)
        );
        assert_eq!(
            source_precedence(&ProductQuantitySettings::default(), &SiteOptions::default()),
            None
        );
    }

    #[test]
    fn test_rule_matches_by_category_or_tag() {
        assert!(rule_matches(&rule(1).with_categories([10]), &product()));
        assert!(rule_matches(&rule(1).with_tags([50]), &product()));
        assert!(rule_matches(&rule(1).with_categories([99]).with_tags([50]), &product()));
        assert!(!rule_matches(&rule(1).with_categories([11]), &product()));
    }

    #[test]
    fn test_rule_without_targets_never_matches() {
        let empty = rule(1).with_priority(0);
        assert!(!rule_matches(&empty, &product()));
        assert!(select_rule([&empty], &product()).is_none());
    }

    #[test]
    fn test_lowest_priority_wins() {
        let r1 = rule(1).with_categories([10]).with_priority(1);
        let r2 = rule(2).with_categories([10]).with_priority(5);

        let winner = select_rule([&r2, &r1], &product()).unwrap();
        assert_eq!(winner.id, 1);
    }

    #[test]
    fn test_explicit_priority_beats_unset() {
        let unset = rule(1).with_categories([10]);
        let explicit = rule(2).with_tags([50]).with_priority(40);

        let winner = select_rule([&unset, &explicit], &product()).unwrap();
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn test_tie_break_is_lowest_id() {
        let a = rule(8).with_categories([10]).with_priority(3);
        let b = rule(4).with_categories([10]).with_priority(3);
        assert_eq!(select_rule([&a, &b], &product()).unwrap().id, 4);
        assert_eq!(select_rule([&b, &a], &product()).unwrap().id, 4);

        let c = rule(9).with_tags([50]);
        let d = rule(6).with_tags([50]);
        assert_eq!(select_rule([&c, &d], &product()).unwrap().id, 6);
    }

    #[test]
    fn test_non_matching_rule_ignored_despite_priority() {
        let strong = rule(1).with_categories([77]).with_priority(0);
        let weak = rule(2).with_categories([10]).with_priority(99);

        assert_eq!(select_rule([&strong, &weak], &product()).unwrap().id, 2);
    }
}
