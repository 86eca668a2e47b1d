//! # Seed Data Generator
//!
//! Populates a development database with suppliers, medicines and opening
//! stock. Stock goes in through the purchase engine like any other delivery,
//! so the seeded batches carry purchase history.
//!
//! ## Usage
//! ```bash
//! # Use pharmstock.toml / PHARMSTOCK_* settings
//! cargo run -p pharmstock-db --bin seed
//!
//! # Specify database path
//! cargo run -p pharmstock-db --bin seed -- --db ./data/pharmstock.db
//!
//! # Specify config file
//! cargo run -p pharmstock-db --bin seed -- --config ./pharmstock.toml
//! ```
//!
//! ## Generated Data
//! - 3 suppliers
//! - One medicine per catalog entry below
//! - One opening purchase per supplier, two batches per medicine with
//!   staggered expiry dates so FEFO picking has something to choose from

use chrono::{Months, Utc};
use pharmstock_core::{
    Actor, NewMedicine, NewPurchase, NewPurchaseItem, NewSupplier, PaymentStatus, Role,
};
use pharmstock_db::{init_tracing, AppConfig, Database};
use std::env;
use std::path::PathBuf;
use tracing::info;

const SUPPLIERS: &[(&str, &str, &str)] = &[
    ("MedSupply", "MedSupply Distributors Ltd", "+1 555 0100"),
    ("CityPharma", "City Pharma Wholesale", "+1 555 0101"),
    ("GenRx", "GenRx Generics Inc", "+1 555 0102"),
];

/// (brand name, generic name, unit cost in cents, prescription only)
const CATALOG: &[(&str, &str, i64, bool)] = &[
    ("Panadol 500mg", "Paracetamol", 120, false),
    ("Brufen 400mg", "Ibuprofen", 180, false),
    ("Amoxil 500mg", "Amoxicillin", 450, true),
    ("Augmentin 625mg", "Amoxicillin/Clavulanate", 980, true),
    ("Losec 20mg", "Omeprazole", 320, false),
    ("Zyrtec 10mg", "Cetirizine", 150, false),
    ("Glucophage 500mg", "Metformin", 210, true),
    ("Lipitor 20mg", "Atorvastatin", 760, true),
    ("Norvasc 5mg", "Amlodipine", 340, true),
    ("Ventolin Inhaler", "Salbutamol", 1250, true),
    ("Flagyl 400mg", "Metronidazole", 260, true),
    ("Clarityne 10mg", "Loratadine", 175, false),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PharmStock Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("PharmStock Seed Data Generator");
    println!("==============================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database, migrations applied");

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
        .fetch_one(db.pool())
        .await?;
    if existing > 0 {
        println!("⚠ Database already has {} medicines", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admin = Actor::new("seed", Role::Admin);
    let start = std::time::Instant::now();

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (name, company, phone) in SUPPLIERS {
        let supplier = db
            .suppliers()
            .insert(&NewSupplier {
                name: (*name).to_string(),
                company_name: Some((*company).to_string()),
                phone: (*phone).to_string(),
            })
            .await?;
        supplier_ids.push(supplier.id);
    }
    println!("✓ Created {} suppliers", supplier_ids.len());

    let mut medicine_ids = Vec::with_capacity(CATALOG.len());
    for (name, generic, _, requires_prescription) in CATALOG {
        let medicine = db
            .medicines()
            .insert(&NewMedicine {
                name: (*name).to_string(),
                generic_name: Some((*generic).to_string()),
                reorder_level: None,
                requires_prescription: *requires_prescription,
            })
            .await?;
        medicine_ids.push(medicine.id);
    }
    println!("✓ Created {} medicines", medicine_ids.len());

    let today = Utc::now().date_naive();
    let mut batches = 0;

    for (s, supplier_id) in supplier_ids.iter().enumerate() {
        let mut items = Vec::new();
        let mut total = 0i64;

        for (m, medicine_id) in medicine_ids.iter().enumerate() {
            if m % supplier_ids.len() != s {
                continue;
            }
            let unit_cost = CATALOG[m].2;

            for lot in 0..2u32 {
                let quantity = 40 + ((m as i64 * 13 + lot as i64 * 7) % 60);
                let expiry = today
                    .checked_add_months(Months::new(6 + 12 * lot + m as u32))
                    .unwrap_or(today);

                total += unit_cost * quantity;
                items.push(NewPurchaseItem {
                    medicine_id: medicine_id.clone(),
                    batch_number: format!("LOT-{:02}{}", m, (b'A' + lot as u8) as char),
                    quantity,
                    unit_price_cents: unit_cost,
                    expiry_date: Some(expiry),
                    location: Some(format!("Shelf {}", (b'A' + (m % 6) as u8) as char)),
                    ..Default::default()
                });
            }
        }

        if items.is_empty() {
            continue;
        }
        batches += items.len();

        let purchase_id = db
            .purchases()
            .submit(
                &admin,
                NewPurchase {
                    invoice_number: format!("SEED-{:03}", s + 1),
                    supplier_id: supplier_id.clone(),
                    purchase_date: today,
                    total_cents: total,
                    tax_cents: 0,
                    discount_cents: 0,
                    net_cents: total,
                    payment_status: PaymentStatus::Paid,
                    payment_method: Some("bank transfer".to_string()),
                    notes: Some("Opening stock".to_string()),
                },
                items,
            )
            .await?;

        info!(purchase_id = %purchase_id, "Seeded opening purchase");
    }

    println!("✓ Received {} batches in {:?}", batches, start.elapsed());
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
