//! # Quantity Rule Repository
//!
//! Storage of administrator-authored quantity rules.
//!
//! ## Row Layout
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │ quantity_rules                                                           │
//! │                                                                          │
//! │ id │ title │ post_type     │ status  │ priority │ minimum │ ... │ roles    │
//! │ ───┼───────┼───────────────┼─────────┼──────────┼─────────┼─────┼───────── │
//! │ 7  │ Cases │ quantity-rule │ publish │ "1"      │ "6"     │ ... │ ["guest"]│
//! │ 8  │ Old   │ quantity-rule │ publish │ ""       │ "7abc"  │ ... │ []       │
//! │                                                                          │
//! │ Quantities stay as typed; `QuantityRule` carries the normalized values.  │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::decode_json_list;
use ipq_core::validation::{parse_priority, validate_number};
use ipq_core::{QuantityLimits, QuantityRule, RuleId, RuleStatus, TaxonomyTargets, TermId};
use ipq_core::{PUBLISHED_STATUS, RULE_POST_TYPE};

// =============================================================================
// Draft
// =============================================================================

/// A rule as entered on the edit screen, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDraft {
    pub title: String,
    pub status: RuleStatus,
    pub priority: String,
    pub minimum: String,
    pub maximum: String,
    pub step: String,
    pub minimum_oos: String,
    pub maximum_oos: String,
    pub categories: Vec<TermId>,
    pub tags: Vec<TermId>,
    pub roles: Vec<String>,
}

impl RuleDraft {
    pub fn new(title: impl Into<String>) -> Self {
        RuleDraft {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: RuleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn priority(mut self, raw: impl Into<String>) -> Self {
        self.priority = raw.into();
        self
    }

    pub fn min(mut self, raw: impl Into<String>) -> Self {
        self.minimum = raw.into();
        self
    }

    pub fn max(mut self, raw: impl Into<String>) -> Self {
        self.maximum = raw.into();
        self
    }

    pub fn step(mut self, raw: impl Into<String>) -> Self {
        self.step = raw.into();
        self
    }

    pub fn min_oos(mut self, raw: impl Into<String>) -> Self {
        self.minimum_oos = raw.into();
        self
    }

    pub fn max_oos(mut self, raw: impl Into<String>) -> Self {
        self.maximum_oos = raw.into();
        self
    }

    pub fn categories(mut self, ids: impl IntoIterator<Item = TermId>) -> Self {
        self.categories.extend(ids);
        self
    }

    pub fn tags(mut self, ids: impl IntoIterator<Item = TermId>) -> Self {
        self.tags.extend(ids);
        self
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: i64,
    title: String,
    priority: String,
    minimum: String,
    maximum: String,
    step: String,
    minimum_oos: String,
    maximum_oos: String,
    categories: String,
    tags: String,
    roles: String,
}

impl RuleRow {
    fn into_rule(self) -> QuantityRule {
        let categories: Vec<TermId> = decode_json_list(&self.categories, "categories", self.id);
        let tags: Vec<TermId> = decode_json_list(&self.tags, "tags", self.id);
        let roles: Vec<String> = decode_json_list(&self.roles, "roles", self.id);

        QuantityRule {
            id: self.id,
            title: self.title,
            targets: TaxonomyTargets {
                categories: categories.into_iter().collect(),
                tags: tags.into_iter().collect(),
            },
            priority: parse_priority(&self.priority),
            roles: roles.into_iter().collect(),
            limits: QuantityLimits {
                min: validate_number(&self.minimum),
                max: validate_number(&self.maximum),
                step: validate_number(&self.step),
                min_oos: validate_number(&self.minimum_oos),
                max_oos: validate_number(&self.maximum_oos),
            },
        }
    }
}

const RULE_COLUMNS: &str = "id, title, priority, minimum, maximum, step, minimum_oos, maximum_oos, \
                            categories, tags, roles";

// =============================================================================
// Repository
// =============================================================================

/// Repository for quantity rule records.
#[derive(Debug, Clone)]
pub struct QuantityRuleRepository {
    pool: SqlitePool,
}

impl QuantityRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        QuantityRuleRepository { pool }
    }

    /// Inserts a rule and returns its generated id.
    pub async fn insert(&self, draft: &RuleDraft) -> DbResult<RuleId> {
        debug!(title = %draft.title, status = draft.status.as_str(), "Inserting quantity rule");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO quantity_rules (
                title, post_type, status, priority,
                minimum, maximum, step, minimum_oos, maximum_oos,
                categories, tags, roles, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?13
            )
            "#,
        )
        .bind(&draft.title)
        .bind(RULE_POST_TYPE)
        .bind(draft.status.as_str())
        .bind(&draft.priority)
        .bind(&draft.minimum)
        .bind(&draft.maximum)
        .bind(&draft.step)
        .bind(&draft.minimum_oos)
        .bind(&draft.maximum_oos)
        .bind(serde_json::to_string(&draft.categories)?)
        .bind(serde_json::to_string(&draft.tags)?)
        .bind(serde_json::to_string(&draft.roles)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Replaces every field of an existing rule.
    pub async fn update(&self, id: RuleId, draft: &RuleDraft) -> DbResult<()> {
        debug!(rule_id = id, "Updating quantity rule");

        let result = sqlx::query(
            r#"
            UPDATE quantity_rules SET
                title = ?2,
                status = ?3,
                priority = ?4,
                minimum = ?5,
                maximum = ?6,
                step = ?7,
                minimum_oos = ?8,
                maximum_oos = ?9,
                categories = ?10,
                tags = ?11,
                roles = ?12,
                updated_at = ?13
            WHERE id = ?1 AND post_type = ?14
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(draft.status.as_str())
        .bind(&draft.priority)
        .bind(&draft.minimum)
        .bind(&draft.maximum)
        .bind(&draft.step)
        .bind(&draft.minimum_oos)
        .bind(&draft.maximum_oos)
        .bind(serde_json::to_string(&draft.categories)?)
        .bind(serde_json::to_string(&draft.tags)?)
        .bind(serde_json::to_string(&draft.roles)?)
        .bind(Utc::now())
        .bind(RULE_POST_TYPE)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("QuantityRule", id));
        }

        Ok(())
    }

    /// Gets a rule by id, whatever its status.
    pub async fn get(&self, id: RuleId) -> DbResult<Option<QuantityRule>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM quantity_rules WHERE id = ?1 AND post_type = ?2"
        );

        let row = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(id)
            .bind(RULE_POST_TYPE)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(RuleRow::into_rule))
    }

    /// Status of a rule, `None` when it doesn't exist.
    pub async fn status(&self, id: RuleId) -> DbResult<Option<RuleStatus>> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT status FROM quantity_rules WHERE id = ?1 AND post_type = ?2",
        )
        .bind(id)
        .bind(RULE_POST_TYPE)
        .fetch_optional(&self.pool)
        .await?;

        Ok(raw.and_then(|raw| match raw.parse() {
            Ok(status) => Some(status),
            Err(_) => {
                warn!(rule_id = id, status = %raw, "Unknown rule status");
                None
            }
        }))
    }

    /// All published rules, ordered by id.
    pub async fn published(&self) -> DbResult<Vec<QuantityRule>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM quantity_rules \
             WHERE post_type = ?1 AND status = ?2 ORDER BY id"
        );

        let rows = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(RULE_POST_TYPE)
            .bind(PUBLISHED_STATUS)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Loaded published rules");
        Ok(rows.into_iter().map(RuleRow::into_rule).collect())
    }

    pub async fn set_status(&self, id: RuleId, status: RuleStatus) -> DbResult<()> {
        debug!(rule_id = id, status = status.as_str(), "Changing rule status");

        let result = sqlx::query(
            "UPDATE quantity_rules SET status = ?2, updated_at = ?3 \
             WHERE id = ?1 AND post_type = ?4",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(RULE_POST_TYPE)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("QuantityRule", id));
        }

        Ok(())
    }

    /// Replaces the role set of a rule.
    pub async fn set_roles(&self, id: RuleId, roles: &BTreeSet<String>) -> DbResult<()> {
        let encoded = serde_json::to_string(roles)?;

        let result = sqlx::query(
            "UPDATE quantity_rules SET roles = ?2, updated_at = ?3 \
             WHERE id = ?1 AND post_type = ?4",
        )
        .bind(id)
        .bind(encoded)
        .bind(Utc::now())
        .bind(RULE_POST_TYPE)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("QuantityRule", id));
        }

        Ok(())
    }

    /// Permanently removes a rule.
    pub async fn delete(&self, id: RuleId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM quantity_rules WHERE id = ?1 AND post_type = ?2")
            .bind(id)
            .bind(RULE_POST_TYPE)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("QuantityRule", id));
        }

        Ok(())
    }

    /// Counts published rules (for diagnostics).
    pub async fn count_published(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quantity_rules WHERE post_type = ?1 AND status = ?2",
        )
        .bind(RULE_POST_TYPE)
        .bind(PUBLISHED_STATUS)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> (Database, QuantityRuleRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rules = db.rules();
        (db, rules)
    }

    #[tokio::test]
    async fn test_insert_and_get_normalizes() {
        let (_db, rules) = repo().await;

        let id = rules
            .insert(
                &RuleDraft::new("Cases")
                    .priority("0")
                    .min("7abc")
                    .max("-5")
                    .step("6")
                    .min_oos("")
                    .categories([15, 16])
                    .tags([3])
                    .roles(["guest", "customer"]),
            )
            .await
            .unwrap();

        let rule = rules.get(id).await.unwrap().unwrap();
        assert_eq!(rule.title, "Cases");
        assert_eq!(rule.priority, Some(0));
        assert_eq!(rule.limits.min, Some(7));
        assert_eq!(rule.limits.max, None);
        assert_eq!(rule.limits.step, Some(6));
        assert_eq!(rule.limits.min_oos, None);
        assert_eq!(rule.targets.terms().len(), 3);
        assert!(rule.applies_to_role("guest"));
        assert!(rule.applies_to_role("customer"));
    }

    #[tokio::test]
    async fn test_published_excludes_other_statuses() {
        let (_db, rules) = repo().await;

        let live = rules.insert(&RuleDraft::new("Live")).await.unwrap();
        let draft = rules
            .insert(&RuleDraft::new("Draft").status(RuleStatus::Draft))
            .await
            .unwrap();
        let trashed = rules.insert(&RuleDraft::new("Trashed")).await.unwrap();
        rules.set_status(trashed, RuleStatus::Trash).await.unwrap();

        let ids: Vec<_> = rules.published().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![live]);
        assert_eq!(rules.count_published().await.unwrap(), 1);

        assert_eq!(rules.status(draft).await.unwrap(), Some(RuleStatus::Draft));
        assert_eq!(rules.status(trashed).await.unwrap(), Some(RuleStatus::Trash));
        assert!(rules.get(draft).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_and_set_roles() {
        let (_db, rules) = repo().await;
        let id = rules.insert(&RuleDraft::new("Before")).await.unwrap();

        rules
            .update(id, &RuleDraft::new("After").min("2").categories([9]))
            .await
            .unwrap();

        let roles: BTreeSet<String> = ["wholesale".to_string()].into();
        rules.set_roles(id, &roles).await.unwrap();

        let rule = rules.get(id).await.unwrap().unwrap();
        assert_eq!(rule.title, "After");
        assert_eq!(rule.limits.min, Some(2));
        assert_eq!(rule.roles, roles);
    }

    #[tokio::test]
    async fn test_missing_rule_errors() {
        let (_db, rules) = repo().await;

        assert!(rules.get(404).await.unwrap().is_none());
        assert!(rules.status(404).await.unwrap().is_none());
        assert!(matches!(
            rules.update(404, &RuleDraft::new("x")).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(rules.delete(404).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_malformed_json_degrades_to_empty() {
        let (db, rules) = repo().await;
        let id = rules.insert(&RuleDraft::new("Broken").categories([1])).await.unwrap();

        sqlx::query("UPDATE quantity_rules SET categories = 'not json', roles = '{}' WHERE id = ?1")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();

        let rule = rules.get(id).await.unwrap().unwrap();
        assert!(rule.targets.is_empty());
        assert!(rule.roles.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_db, rules) = repo().await;
        let id = rules.insert(&RuleDraft::new("Gone")).await.unwrap();

        rules.delete(id).await.unwrap();
        assert!(rules.get(id).await.unwrap().is_none());
    }
}
