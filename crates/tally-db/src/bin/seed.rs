//! # Seed Data Generator
//!
//! Populates the database with wholesale products and opening stock for
//! development.
//!
//! ## Usage
//! ```bash
//! # 60 products across two warehouses (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p tally-db --bin seed -- --count 200 --db ./data/tally.db
//!
//! # Extra warehouses
//! cargo run -p tally-db --bin seed -- --warehouses main,annex,depot
//! ```
//!
//! Each product gets:
//! - SKU `{CATEGORY}-{NAME}-{SIZE}`, used as its ID so bills are easy to type
//! - A box size typical for its pack (24, 12 or 6)
//! - A tax-inclusive piece price and a GST slab (0%, 5%, 12%, 18%)
//! - Opening stock in every warehouse, normalized to boxes + loose

use chrono::Utc;
use std::env;
use tally_core::quantity::normalize;
use tally_core::{Product, Stock, StockKey};
use tally_db::{Database, DbConfig};

/// Product families for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "GRN",
        &[
            "Basmati Rice",
            "Sona Masoori Rice",
            "Toor Dal",
            "Moong Dal",
            "Chana Dal",
            "Wheat Atta",
            "Besan",
            "Poha",
            "Rava",
            "Sugar",
        ],
    ),
    (
        "OIL",
        &[
            "Sunflower Oil",
            "Groundnut Oil",
            "Mustard Oil",
            "Coconut Oil",
            "Ghee",
        ],
    ),
    (
        "BEV",
        &[
            "Tea Dust",
            "Filter Coffee",
            "Instant Coffee",
            "Malt Drink",
            "Mango Drink",
        ],
    ),
    (
        "HOM",
        &[
            "Detergent Powder",
            "Dishwash Bar",
            "Bath Soap",
            "Toothpaste",
            "Floor Cleaner",
        ],
    ),
];

/// Pack variants: (label, items per box, price multiplier %)
const PACKS: &[(&str, i64, i64)] = &[("500G", 24, 100), ("1KG", 12, 190), ("5KG", 6, 900)];

/// GST slabs in basis points
const TAX_RATES: &[u32] = &[0, 500, 1200, 1800];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./tally_dev.db");
    let mut warehouses: Vec<String> = vec!["main".to_string(), "annex".to_string()];

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--warehouses" | "-w" => {
                if i + 1 < args.len() {
                    warehouses = args[i + 1]
                        .split(',')
                        .map(|w| w.trim().to_string())
                        .filter(|w| !w.is_empty())
                        .collect();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>          Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>          Database file path (default: ./tally_dev.db)");
                println!("  -w, --warehouses <LIST>  Comma-separated warehouse IDs (default: main,annex)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database:   {}", db_path);
    println!("Products:   {}", count);
    println!("Warehouses: {}", warehouses.join(", "));
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products and opening stock...");

    let mut generated = 0;
    let mut stock_rows = 0;
    let start = std::time::Instant::now();

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (pack_idx, pack) in PACKS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 100 + name_idx * 10 + pack_idx;
                let product = generate_product(category_code, name, *pack, seed);

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }
                generated += 1;

                for (w_idx, warehouse) in warehouses.iter().enumerate() {
                    let stock = opening_stock(&product, warehouse, seed + w_idx * 7)?;
                    db.stock().set(&stock).await?;
                    stock_rows += 1;
                }

                if generated % 20 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products and {} stock records in {:?}",
        generated, stock_rows, elapsed
    );

    let sample = db.products().list(1).await?;
    if let (Some(sample), Some(warehouse)) = (sample.first(), warehouses.first()) {
        let key = StockKey::new(&sample.id, warehouse);
        if let Some(stock) = db.stock().get(&key).await? {
            println!(
                "  Sample: {} @ {} = {} boxes + {} loose ({} pieces)",
                sample.sku,
                key.warehouse_id,
                stock.boxes,
                stock.loose_items,
                stock.total_items()
            );
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(category: &str, name: &str, pack: (&str, i64, i64), seed: usize) -> Product {
    let now = Utc::now();
    let (pack_label, items_per_box, multiplier_pct) = pack;

    let short: String = name
        .split_whitespace()
        .map(|word| word.chars().take(3).collect::<String>())
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{}", category, short, pack_label);

    // Base piece price 20.00 - 99.99, scaled by pack size
    let base_price = 2_000 + ((seed * 37) % 8_000) as i64;
    let selling_price_cents = base_price * multiplier_pct / 100;

    Product {
        id: sku.clone(),
        name: format!("{} {}", name, pack_label),
        sku,
        items_per_box,
        selling_price_cents,
        tax_rate_bps: TAX_RATES[seed % TAX_RATES.len()],
        created_at: now,
        updated_at: now,
    }
}

/// Opening stock for one warehouse: 0 to 40 boxes plus a loose remainder.
fn opening_stock(
    product: &Product,
    warehouse: &str,
    seed: usize,
) -> Result<Stock, Box<dyn std::error::Error>> {
    let pieces = ((seed * 53) % (40 * product.items_per_box as usize + 1)) as i64;
    let quantity = normalize(pieces, product.items_per_box)?;

    Ok(Stock {
        product_id: product.id.clone(),
        warehouse_id: warehouse.to_string(),
        boxes: quantity.boxes,
        items_per_box: product.items_per_box,
        loose_items: quantity.loose,
        updated_at: Utc::now(),
    })
}
