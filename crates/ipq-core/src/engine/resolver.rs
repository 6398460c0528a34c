//! # Rule Resolver
//!
//! Decides which configuration source governs a product for a role.
//!
//! ## Role Determination
//! 1. An explicit, non-blank role argument
//! 2. Otherwise the identity provider's current role
//! 3. Otherwise `"guest"`

use std::sync::Arc;

use tracing::debug;

use crate::engine::repository::RuleRepository;
use crate::error::CoreResult;
use crate::ports::{ContentStore, IdentityProvider, OptionsStore};
use crate::resolution::{select_rule, source_precedence};
use crate::types::{Product, QuantityRule, ResolvedSource};
use crate::validation::validate_role;
use crate::GUEST_ROLE;

/// Resolves products to their governing source.
#[derive(Clone)]
pub struct RuleResolver {
    content: Arc<dyn ContentStore>,
    options: Arc<dyn OptionsStore>,
    rules: RuleRepository,
    identity: Arc<dyn IdentityProvider>,
}

impl RuleResolver {
    pub fn new(
        content: Arc<dyn ContentStore>,
        options: Arc<dyn OptionsStore>,
        rules: RuleRepository,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        RuleResolver {
            content,
            options,
            rules,
            identity,
        }
    }

    /// The repository used for rule candidates.
    pub fn rules(&self) -> &RuleRepository {
        &self.rules
    }

    /// Role a resolution runs under.
    pub fn role_for(&self, role: Option<&str>) -> String {
        if let Some(role) = role.and_then(|r| validate_role(r).ok()) {
            return role.to_string();
        }

        self.identity
            .current_role()
            .as_deref()
            .and_then(|r| validate_role(r).ok())
            .unwrap_or(GUEST_ROLE)
            .to_string()
    }

    /// Determines the governing source for `product`.
    ///
    /// ## Returns
    /// Exactly one of Inactive, Override, Sitewide, Rule(id) or None.
    /// Errors only come from the stores.
    pub async fn resolve(
        &self,
        product: &Product,
        role: Option<&str>,
    ) -> CoreResult<ResolvedSource> {
        let settings = self.content.product_settings(product.id).await?;
        let options = self.options.site_options().await?;

        if let Some(source) = source_precedence(&settings, &options) {
            debug!(product_id = product.id, source = %source, "Resolved without rules");
            return Ok(source);
        }

        let source = match self.resolve_rule(product, role).await? {
            Some(rule) => ResolvedSource::Rule(rule.id),
            None => ResolvedSource::None,
        };

        debug!(product_id = product.id, source = %source, "Resolved by rule matching");
        Ok(source)
    }

    /// The winning rule for `product`, ignoring product flags and the
    /// sitewide switch.
    pub async fn resolve_rule(
        &self,
        product: &Product,
        role: Option<&str>,
    ) -> CoreResult<Option<QuantityRule>> {
        let role = self.role_for(role);
        let candidates = self.rules.rules_for_role(&role).await?;
        let winner = select_rule(&candidates, product).cloned();

        debug!(
            product_id = product.id,
            role = %role,
            candidates = candidates.len(),
            winner = ?winner.as_ref().map(|rule| rule.id),
            "Rule matching finished"
        );

        Ok(winner)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
