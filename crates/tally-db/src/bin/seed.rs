//! # Seed Data Generator
//!
//! Populates the database with a development catalog for one owner.
//!
//! ## Usage
//! ```bash
//! # Generate 50 products for owner 1 (default)
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount for another owner
//! cargo run -p tally-db --bin seed -- --count 1000 --owner 42
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! The catalog tops out at one product per category/name/size combination.
//!
//! Each product has:
//! - Unique code: `{CATEGORY}-{NAME}-{INDEX}`
//! - Price: $1.99 - $9.99 plus a size addon
//! - Stock: 0 - 100

use std::env;
use tally_core::NewProduct;
use tally_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "HW",
        &[
            "Hammer",
            "Screwdriver",
            "Wrench",
            "Pliers",
            "Tape Measure",
            "Level",
            "Utility Knife",
            "Drill Bits",
        ],
    ),
    (
        "EL",
        &[
            "USB Cable",
            "HDMI Cable",
            "Power Strip",
            "Extension Cord",
            "LED Bulb",
            "Batteries AA",
            "Batteries AAA",
            "Wall Charger",
        ],
    ),
    (
        "OF",
        &[
            "Notebook",
            "Ballpoint Pens",
            "Stapler",
            "Paper Clips",
            "Sticky Notes",
            "Binder",
            "Highlighter",
            "Envelopes",
        ],
    ),
];

/// Size variants for products
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Medium", 150), ("Large", 300), ("Bulk", 900)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut owner_id: i64 = 1;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner_id = args[i + 1].parse().unwrap_or(owner_id);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 50)");
                println!("  -o, --owner <ID>   Owner id to seed for (default: 1)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, owner_id, count, "Seeding catalog");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let products = db.products();

    let existing = products.count(owner_id).await?;
    if existing > 0 {
        warn!(
            owner_id,
            existing, "Owner already has products, skipping seed to avoid duplicate codes"
        );
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size_name, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(
                    owner_id,
                    category_code,
                    name,
                    size_name,
                    *price_addon,
                    category_idx * 1000 + name_idx * 20 + size_idx,
                );

                if let Err(e) = products.insert(&product).await {
                    warn!(code = %product.code, error = %e, "Failed to insert product");
                    continue;
                }

                generated += 1;
            }
        }
    }

    info!(generated, elapsed = ?start.elapsed(), "Seed complete");

    db.close().await;
    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(
    owner_id: i64,
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> NewProduct {
    let short: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let code = format!("{}-{}-{:04}", category, short, seed);

    // $1.99 - $9.99 + size addon
    let price_cents = 199 + ((seed * 17) % 800) as i64 + price_addon;

    NewProduct {
        owner_id,
        code,
        name: format!("{} {}", name, size),
        description: format!("{} ({})", name, size.to_lowercase()),
        price_cents,
        stock: (seed % 101) as i64,
    }
}
