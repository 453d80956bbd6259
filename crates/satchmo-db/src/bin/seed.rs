//! # Seed Data Generator
//!
//! Populates a database with demo discounts and settings, then prices a
//! sample order so the whole pipeline can be checked by hand.
//!
//! ## Usage
//! ```bash
//! # Use satchmo.toml from the platform config dir (or defaults)
//! cargo run -p satchmo-db --bin seed
//!
//! # Specify database path
//! cargo run -p satchmo-db --bin seed -- --db ./data/satchmo.db
//!
//! # Specify config file
//! cargo run -p satchmo-db --bin seed -- --config ./satchmo.toml
//! ```
//!
//! ## Seeded Data
//! - `TAX.MODULE` = percent, `TAX.PERCENT` = 8.25
//! - `SPRING`: 10% off, orders of $20 or more
//! - `FIVEOFF`: $5 off split across lines, shipping included
//! - `SHIPFREE`: free shipping
//! - `AUTO15`: automatic 15% on every discountable product

use std::env;
use std::path::PathBuf;

use chrono::{Days, Utc};
use rust_decimal::Decimal;
use satchmo_core::cart::Cart;
use satchmo_core::configuration::{register_default_settings, ConfigurationSettings};
use satchmo_core::discount::Discount;
use satchmo_core::{Money, Product, ProductKind};
use satchmo_db::{init_tracing, AppConfig, Database, OrderService, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
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
                println!("Satchmo Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (overrides satchmo.toml)");
                println!("  -c, --config <PATH>    Config file path");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    init_tracing(DEFAULT_LOG_FILTER);

    let mut app = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        app.database.path = path;
    }

    println!("🌱 Satchmo Seed Data Generator");
    println!("==============================");
    println!("Database: {}", app.database.path.display());
    println!();

    if let Some(parent) = app.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(app.db_config()).await?;
    println!("✓ Connected to database");

    // Settings
    let mut settings = ConfigurationSettings::new();
    register_default_settings(&mut settings)?;
    let loaded = db.settings().hydrate(&mut settings).await?;
    println!("✓ Loaded {} stored setting(s)", loaded);

    settings.update("TAX", "MODULE", "tax.modules.percent")?;
    settings.update("TAX", "PERCENT", "8.25")?;
    let written = db.settings().write_through(&mut settings).await?;
    println!("✓ Wrote {} setting change(s)", written);

    // Discounts
    let today = Utc::now().date_naive();
    let ends = today.checked_add_days(Days::new(90)).unwrap_or(today);

    let existing = db.discounts().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} discount(s), skipping", existing);
    } else {
        for discount in demo_discounts(today, ends) {
            db.discounts().insert(&discount).await?;
            println!("  + {} ({})", discount.code, discount.description);
        }
        println!("✓ Discounts created");
    }

    // Sample order
    let tee = Product::new("TEE-BLK-M", "T-Shirt Black M", Money::from_cents(1999));
    let mug = Product::new("MUG", "Coffee Mug", Money::from_cents(899));
    let ebook = Product::new("EBOOK-RUST", "Rust Cookbook", Money::from_cents(1500)).with_kind(
        ProductKind::Downloadable {
            file_name: "rust-cookbook.pdf".to_string(),
        },
    );

    let mut cart = Cart::new();
    cart.add_item(&tee, 2)?;
    cart.add_item(&mug, 1)?;
    cart.add_item(&ebook, 1)?;

    let service = OrderService::new(db.clone());
    let placed = service
        .place_order(&cart, Money::from_cents(700), Some("SPRING"), &settings, today)
        .await?;

    if let Some(check) = &placed.discount_check {
        println!("  Code SPRING: {}", check.message);
    }

    let auto = service.best_auto_discount(&mug, &settings, today).await?;
    if let Some(discount) = auto {
        println!("  Best automatic discount for {}: {}", mug.name, discount.code);
    }

    let totals = placed.order.totals();
    println!();
    println!("Order {}", placed.order.id);
    for item in &placed.order.items {
        println!(
            "  {:<20} x{:<3} {:>10}  -{}",
            item.product.name, item.quantity, item.line_item_price, item.discount
        );
    }
    println!("  Sub total:  {}", totals.sub_total);
    println!("  Discount:   {}", totals.discount);
    println!("  Shipping:   {} (-{})", totals.shipping_cost, totals.shipping_discount);
    println!("  Tax:        {}", totals.tax);
    println!("  Total:      {}", totals.total);

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn demo_discounts(start: chrono::NaiveDate, end: chrono::NaiveDate) -> Vec<Discount> {
    vec![
        Discount::new("SPRING", "10% off orders over $20", start, end)
            .with_percentage(Decimal::from(10))
            .with_min_order(Money::from_cents(2000)),
        Discount::new("FIVEOFF", "$5 off, shipping included", start, end)
            .with_amount(Money::from_cents(500))
            .with_shipping_included(),
        Discount::new("SHIPFREE", "Free shipping", start, end)
            .with_free_shipping()
            .with_allowed_uses(100),
        Discount::new("AUTO15", "15% off everything", start, end)
            .automatic()
            .with_percentage(Decimal::from(15)),
    ]
}
