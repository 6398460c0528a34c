//! # Options Repository
//!
//! Named option values, and the sitewide quantity record stored as a JSON
//! object under [`SITE_OPTIONS_KEY`].
//!
//! ## Activation Defaults
//! ```text
//! ensure_defaults()
//!      │
//!      ├── no record ─────────► write every default ─────────► true
//!      │
//!      └── record exists ─┬── all keys present ─────────────► false
//!                         └── keys missing ─► add them, keep
//!                                             existing values ► true
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use ipq_core::options::{SiteOptionsRecord, ACTIVATION_DEFAULTS};
use ipq_core::{SiteOptions, SITE_OPTIONS_KEY};

/// Repository for the `options` table.
#[derive(Debug, Clone)]
pub struct OptionsRepository {
    pool: SqlitePool,
}

impl OptionsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OptionsRepository { pool }
    }

    /// Raw value of an option.
    pub async fn get_raw(&self, name: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM options WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Writes an option, replacing any previous value.
    pub async fn set_raw(&self, name: &str, value: &str) -> DbResult<()> {
        debug!(name = %name, "Writing option");

        sqlx::query(
            r#"
            INSERT INTO options (name, value, autoload) VALUES (?1, ?2, 1)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, name: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM options WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// The stored sitewide record.
    ///
    /// A missing or undecodable record reads as the defaults.
    pub async fn site_options_record(&self) -> DbResult<SiteOptionsRecord> {
        let Some(raw) = self.get_raw(SITE_OPTIONS_KEY).await? else {
            return Ok(SiteOptionsRecord::default());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Site options record is not valid JSON, using defaults");
            SiteOptionsRecord::default()
        }))
    }

    /// Normalized sitewide settings.
    pub async fn site_options(&self) -> DbResult<SiteOptions> {
        Ok(self.site_options_record().await?.to_options())
    }

    /// Stores normalized settings back as the sitewide record.
    pub async fn save_site_options(&self, options: &SiteOptions) -> DbResult<()> {
        let record = SiteOptionsRecord::from_options(options);
        self.set_raw(SITE_OPTIONS_KEY, &serde_json::to_string(&record)?).await
    }

    /// Seeds the sitewide record with its activation defaults.
    ///
    /// ## Returns
    /// `true` when something was written.
    pub async fn ensure_defaults(&self) -> DbResult<bool> {
        let existing = match self.get_raw(SITE_OPTIONS_KEY).await? {
            Some(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(serde_json::Value::Object(map)) => Some(map),
                Ok(_) | Err(_) => {
                    warn!("Site options record is not a JSON object, rewriting with defaults");
                    None
                }
            },
            None => None,
        };

        let had_record = existing.is_some();
        let mut record = existing.unwrap_or_default();
        let mut added = 0;

        for (key, value) in ACTIVATION_DEFAULTS {
            if !record.contains_key(*key) {
                record.insert((*key).to_string(), serde_json::Value::String((*value).to_string()));
                added += 1;
            }
        }

        if had_record && added == 0 {
            debug!("Site options already carry every default");
            return Ok(false);
        }

        self.set_raw(SITE_OPTIONS_KEY, &serde_json::Value::Object(record).to_string())
            .await?;

        info!(added, created = !had_record, "Site option defaults written");
        Ok(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
