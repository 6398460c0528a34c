//! # Product Repository
//!
//! Products as far as quantity resolution cares about them, plus the
//! per-product override meta from the product edit screen.
//!
//! ## Two Tables
//! ```text
//! products                        product_quantity_meta
//! ┌────┬──────────┬───────┐        ┌────────────┬───────────┬───────────┬─────┐
//! │ id │ type     │ stock │        │ product_id │ deactive  │ override  │ min │
//! ├────┼──────────┼───────┤   1:1  ├────────────┼───────────┼───────────┼─────┤
//! │ 42 │ variable │ 0     │ ◄───── │ 42         │ ""        │ "on"      │ "2" │
//! └────┴──────────┴───────┘        └────────────┴───────────┴───────────┴─────┘
//! ```
//! A product without a meta row has every flag off.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::decode_json_list;
use ipq_core::validation::{is_flag_on, validate_number};
use ipq_core::{Product, ProductId, ProductQuantitySettings, ProductType, QuantityLimits, TermId};

// =============================================================================
// Quantity Meta
// =============================================================================

/// Raw override meta of one product, as the edit screen stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductQuantityMeta {
    pub deactive_flag: String,
    pub override_flag: String,
    pub minimum: String,
    pub maximum: String,
    pub step: String,
    pub minimum_oos: String,
    pub maximum_oos: String,
}

impl ProductQuantityMeta {
    /// Normalized flags and values.
    pub fn to_settings(&self) -> ProductQuantitySettings {
        ProductQuantitySettings {
            deactivated: is_flag_on(&self.deactive_flag),
            override_enabled: is_flag_on(&self.override_flag),
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

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    product_type: String,
    stock_quantity: Option<i64>,
    category_ids: String,
    tag_ids: String,
}

impl ProductRow {
    fn into_product(self) -> Product {
        let product_type = self.product_type.parse().unwrap_or_else(|_| {
            warn!(
                product_id = self.id,
                product_type = %self.product_type,
                "Unknown product type, treating as simple"
            );
            ProductType::Simple
        });
        let categories: Vec<TermId> = decode_json_list(&self.category_ids, "category_ids", self.id);
        let tags: Vec<TermId> = decode_json_list(&self.tag_ids, "tag_ids", self.id);

        Product::new(self.id, self.name)
            .with_type(product_type)
            .with_stock(self.stock_quantity)
            .with_categories(categories)
            .with_tags(tags)
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for products and their quantity meta.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product or replaces the stored one with the same id.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        debug!(product_id = product.id, name = %product.name, "Upserting product");

        let categories: Vec<TermId> = product.category_ids.iter().copied().collect();
        let tags: Vec<TermId> = product.tag_ids.iter().copied().collect();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, product_type, stock_quantity,
                category_ids, tag_ids, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                product_type = excluded.product_type,
                stock_quantity = excluded.stock_quantity,
                category_ids = excluded.category_ids,
                tag_ids = excluded.tag_ids,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.product_type.as_str())
        .bind(product.stock_quantity)
        .bind(serde_json::to_string(&categories)?)
        .bind(serde_json::to_string(&tags)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by its id.
    pub async fn get_by_id(&self, id: ProductId) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, product_type, stock_quantity, category_ids, tag_ids \
             FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProductRow::into_product))
    }

    /// All products ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, product_type, stock_quantity, category_ids, tag_ids \
             FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }

    /// Sets the stock level; `None` stops tracking stock.
    pub async fn set_stock(&self, id: ProductId, stock_quantity: Option<i64>) -> DbResult<()> {
        debug!(product_id = id, ?stock_quantity, "Setting stock");

        let result =
            sqlx::query("UPDATE products SET stock_quantity = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(stock_quantity)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Stores the override meta of a product, replacing any previous meta.
    pub async fn save_quantity_meta(
        &self,
        product_id: ProductId,
        meta: &ProductQuantityMeta,
    ) -> DbResult<()> {
        debug!(product_id, "Saving quantity meta");

        sqlx::query(
            r#"
            INSERT INTO product_quantity_meta (
                product_id, deactive_flag, override_flag,
                minimum, maximum, step, minimum_oos, maximum_oos, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(product_id) DO UPDATE SET
                deactive_flag = excluded.deactive_flag,
                override_flag = excluded.override_flag,
                minimum = excluded.minimum,
                maximum = excluded.maximum,
                step = excluded.step,
                minimum_oos = excluded.minimum_oos,
                maximum_oos = excluded.maximum_oos,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(&meta.deactive_flag)
        .bind(&meta.override_flag)
        .bind(&meta.minimum)
        .bind(&meta.maximum)
        .bind(&meta.step)
        .bind(&meta.minimum_oos)
        .bind(&meta.maximum_oos)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Raw override meta, `None` when the product has none.
    pub async fn quantity_meta(
        &self,
        product_id: ProductId,
    ) -> DbResult<Option<ProductQuantityMeta>> {
        let meta = sqlx::query_as::<_, ProductQuantityMeta>(
            "SELECT deactive_flag, override_flag, minimum, maximum, step, minimum_oos, maximum_oos \
             FROM product_quantity_meta WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(meta)
    }

    /// Normalized override settings; every flag off when nothing is stored.
    pub async fn quantity_settings(
        &self,
        product_id: ProductId,
    ) -> DbResult<ProductQuantitySettings> {
        Ok(self
            .quantity_meta(product_id)
            .await?
            .map(|meta| meta.to_settings())
            .unwrap_or_default())
    }

    /// Counts stored products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
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

    async fn repo() -> (Database, ProductRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let products = db.products();
        (db, products)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (_db, products) = repo().await;
        let shirt = Product::new(42, "Shirt")
            .with_type(ProductType::Variable)
            .with_stock(Some(3))
            .with_categories([1, 2])
            .with_tags([9]);

        products.upsert(&shirt).await.unwrap();
        assert_eq!(products.get_by_id(42).await.unwrap(), Some(shirt.clone()));

        let renamed = Product::new(42, "Polo").with_type(ProductType::Simple);
        products.upsert(&renamed).await.unwrap();
        assert_eq!(products.get_by_id(42).await.unwrap(), Some(renamed));
        assert_eq!(products.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_stock() {
        let (_db, products) = repo().await;
        products.upsert(&Product::new(1, "Mug").with_stock(Some(5))).await.unwrap();

        products.set_stock(1, Some(0)).await.unwrap();
        assert!(products.get_by_id(1).await.unwrap().unwrap().is_out_of_stock());

        products.set_stock(1, None).await.unwrap();
        let mug = products.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(mug.stock_quantity, None);
        assert!(!mug.is_out_of_stock());

        assert!(matches!(products.set_stock(99, Some(1)).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_quantity_meta_round_trip() {
        let (_db, products) = repo().await;
        products.upsert(&Product::new(7, "Beans")).await.unwrap();

        assert_eq!(
            products.quantity_settings(7).await.unwrap(),
            ProductQuantitySettings::default()
        );

        let meta = ProductQuantityMeta {
            override_flag: "on".into(),
            minimum: "2".into(),
            maximum: "0".into(),
            minimum_oos: "3 boxes".into(),
            ..Default::default()
        };
        products.save_quantity_meta(7, &meta).await.unwrap();

        assert_eq!(products.quantity_meta(7).await.unwrap(), Some(meta));

        let settings = products.quantity_settings(7).await.unwrap();
        assert!(settings.override_enabled);
        assert!(!settings.deactivated);
        assert_eq!(settings.limits.min, Some(2));
        assert_eq!(settings.limits.max, None);
        assert_eq!(settings.limits.min_oos, Some(3));
    }

    #[tokio::test]
    async fn test_meta_requires_product() {
        let (_db, products) = repo().await;
        let result = products
            .save_quantity_meta(404, &ProductQuantityMeta::default())
            .await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[test]
    fn test_meta_flags() {
        let meta = ProductQuantityMeta {
            deactive_flag: "on".into(),
            override_flag: "off".into(),
            ..Default::default()
        };
        let settings = meta.to_settings();
        assert!(settings.deactivated);
        assert!(!settings.override_enabled);
    }
}
