//! # Seed Data Generator
//!
//! Populates a database with demo products, quantity rules and site options,
//! then prints how every product resolves for a few roles.
//!
//! ## Usage
//! ```bash
//! # Database from the config file (./ipq.db when there is none)
//! cargo run -p ipq-db --bin seed
//!
//! # Specify database path
//! cargo run -p ipq-db --bin seed -- --db ./data/ipq.db
//!
//! # Load settings from a config file (IPQ_* env vars still apply)
//! cargo run -p ipq-db --bin seed -- --config ./ipq.toml
//! ```
//!
//! ## Generated Data
//! - Beverages, apparel and hardware products, some out of stock
//! - Rules scoped to guests/customers, to wholesale buyers, and one legacy
//!   rule without roles (backfilled with the configured known roles)
//! - A product-level override with out-of-stock values, and a deactivated
//!   product

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use ipq_core::memory::StaticIdentity;
use ipq_core::{Product, ProductType, RuleStatus};
use ipq_db::{Database, IpqConfig, ProductQuantityMeta, RuleDraft};
use tracing_subscriber::EnvFilter;

const BEVERAGES: i64 = 1;
const APPAREL: i64 = 2;
const HARDWARE: i64 = 3;

const BULK_TAG: i64 = 10;
const CLEARANCE_TAG: i64 = 11;

/// Roles the resolution table is printed for. `None` is an anonymous shopper.
const ROLES: &[Option<&str>] = &[None, Some("customer"), Some("wholesale")];

fn demo_products() -> Vec<Product> {
    vec![
        Product::new(101, "Sparkling Water 500ml")
            .with_categories([BEVERAGES])
            .with_tags([BULK_TAG])
            .with_stock(Some(240)),
        Product::new(102, "Cola 330ml")
            .with_categories([BEVERAGES])
            .with_stock(Some(0)),
        Product::new(201, "T-Shirt")
            .with_type(ProductType::Variable)
            .with_categories([APPAREL])
            .with_stock(Some(35)),
        Product::new(202, "Hoodie")
            .with_type(ProductType::Variable)
            .with_categories([APPAREL])
            .with_tags([CLEARANCE_TAG])
            .with_stock(Some(0)),
        Product::new(301, "Wood Screws (box)")
            .with_categories([HARDWARE])
            .with_tags([BULK_TAG]),
        Product::new(401, "Gift Card"),
    ]
}

fn demo_rules() -> Vec<RuleDraft> {
    vec![
        RuleDraft::new("Drinks by the case")
            .categories([BEVERAGES])
            .priority("1")
            .min("6")
            .step("6")
            .roles(["guest", "customer"]),
        RuleDraft::new("Trade drinks")
            .categories([BEVERAGES])
            .priority("0")
            .min("24")
            .step("24")
            .roles(["wholesale"]),
        RuleDraft::new("Bulk items")
            .tags([BULK_TAG])
            .priority("5")
            .min("10")
            .roles(["guest", "customer", "wholesale"]),
        RuleDraft::new("Apparel limits")
            .categories([APPAREL])
            .min("1")
            .max("10")
            .min_oos("1")
            .max_oos("2")
            .roles(["guest", "customer"]),
        // Stored before rules had roles; picked up by the backfill
        RuleDraft::new("Hardware packs")
            .categories([HARDWARE])
            .priority("2")
            .min("50")
            .step("50"),
        RuleDraft::new("Unfinished idea")
            .categories([BEVERAGES, APPAREL, HARDWARE])
            .priority("-10")
            .min("1000")
            .roles(["guest"])
            .status(RuleStatus::Draft),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("IPQ Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides the config file)");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = IpqConfig::load_or_default(config_path);
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("IPQ Seed Data Generator");
    println!("=======================");
    println!("Database:  {}", config.database.path.display());
    println!("Cache TTL: {}s", config.cache.rule_ttl_secs);
    println!();

    let db = Database::new(config.to_db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.options().ensure_defaults().await? {
        println!("✓ Site option defaults written");
    }

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products, skipping inserts", existing);
    } else {
        seed(&db).await?;
    }

    let engine = db.quantity_engine(
        Arc::new(StaticIdentity::guest()),
        Some(config.rule_cache_ttl()),
    );

    let backfilled = engine.rules().backfill_roles(&config.roles.known).await?;
    if backfilled > 0 {
        println!("✓ Backfilled roles on {} legacy rule(s)", backfilled);
    }

    let site = db.options().site_options().await?;

    println!();
    println!(
        "{:<24} {:<10} {:<12} {:>5} {:>5} {:>5}  note",
        "product", "role", "source", "min", "max", "step"
    );
    println!("{}", "-".repeat(80));

    for product in db.products().list().await? {
        for role in ROLES {
            let source = engine.resolve(&product, *role).await?;
            let values = engine.limits(&product, *role).await?.unwrap_or_default();
            let note = site.quantity_note(values.min_value).unwrap_or_default();

            println!(
                "{:<24} {:<10} {:<12} {:>5} {:>5} {:>5}  {}",
                product.name,
                role.unwrap_or("guest"),
                source.to_string(),
                show(values.min_value),
                show(values.max_value),
                show(values.step),
                note
            );
        }

        if let Some(params) = engine.validation_params(&product, None).await? {
            println!("{:<24} storefront params: {}", "", serde_json::to_string(&params)?);
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

async fn seed(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("Inserting demo data...");

    let products = db.products();
    for product in demo_products() {
        products.upsert(&product).await?;
    }

    products
        .save_quantity_meta(
            202,
            &ProductQuantityMeta {
                override_flag: "on".into(),
                minimum: "2".into(),
                maximum: "4".into(),
                minimum_oos: "1".into(),
                maximum_oos: "1".into(),
                ..Default::default()
            },
        )
        .await?;

    products
        .save_quantity_meta(
            401,
            &ProductQuantityMeta {
                deactive_flag: "on".into(),
                ..Default::default()
            },
        )
        .await?;

    let rules = db.rules();
    for draft in demo_rules() {
        rules.insert(&draft).await?;
    }

    let mut site = db.options().site_options().await?;
    site.show_qty_note = true;
    db.options().save_site_options(&site).await?;

    println!(
        "✓ {} products, {} published rules",
        products.count().await?,
        rules.count_published().await?
    );

    Ok(())
}

fn show(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,ipq_core=info,ipq_db=info,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

