//! # Seed Data Generator
//!
//! Fills a store with a small demo warehouse for development.
//!
//! ## Usage
//! ```bash
//! # SQLite document store (default)
//! cargo run -p depot-store --bin seed
//!
//! # Specify database path
//! cargo run -p depot-store --bin seed -- --db ./data/depot.db
//!
//! # Mock store snapshot instead
//! cargo run -p depot-store --bin seed -- --snapshot ./data/depot.json
//! ```
//!
//! ## Generated Data
//! - Categories: packaging, pallets, tools, safety
//! - Two suppliers, two customers
//! - A few dozen inventory items, SKU `{CATEGORY}-{INDEX}`
//! - An `admin` user (password `admin-password`)
//! - One purchase order part-received, one sales order shipped and paid
//! - Opening cash and bank deposits

use depot_core::{
    CashAccount, CashDirection, CashTransaction, Category, Customer, Entity, InventoryItem,
    LineQuantity, Money, OrderKind, PaymentTransaction, PurchaseOrder, PurchaseOrderLine, Record,
    Role, SalesOrder, SalesOrderLine, Supplier, User,
};
use depot_store::{BackendConfig, DbConfig, Dispatch, Warehouse};
use std::env;
use std::path::PathBuf;

/// Categories with their item names.
const CATALOGUE: &[(&str, &str, &[&str])] = &[
    (
        "PKG",
        "Packaging",
        &[
            "Carton Small",
            "Carton Medium",
            "Carton Large",
            "Bubble Wrap Roll",
            "Packing Tape",
            "Stretch Film",
            "Void Fill Paper",
            "Mailer Bag",
        ],
    ),
    (
        "PAL",
        "Pallets",
        &["Euro Pallet", "Half Pallet", "Plastic Pallet", "Pallet Collar"],
    ),
    (
        "TLS",
        "Tools",
        &[
            "Tape Gun",
            "Box Cutter",
            "Hand Truck",
            "Pallet Jack",
            "Label Printer",
            "Barcode Scanner",
        ],
    ),
    (
        "SAF",
        "Safety",
        &["Hi-Vis Vest", "Safety Gloves", "Steel Toe Boots", "Hard Hat"],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config = BackendConfig::Sqlite(DbConfig::new("./depot_dev.db"));
    let mut target = String::from("./depot_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    target = args[i + 1].clone();
                    config = BackendConfig::Sqlite(DbConfig::new(&target));
                    i += 1;
                }
            }
            "--snapshot" | "-s" => {
                if i + 1 < args.len() {
                    target = args[i + 1].clone();
                    config = BackendConfig::Memory {
                        snapshot: Some(PathBuf::from(&target)),
                    };
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Depot Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>         SQLite file (default: ./depot_dev.db)");
                println!("  -s, --snapshot <PATH>   Mock store snapshot file instead");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Depot Seed Data Generator");
    println!("============================");
    println!("Store: {}", target);
    println!();

    let warehouse = Warehouse::open(config).await?;
    println!("✓ Store opened ({})", warehouse.backend().kind());

    let existing = warehouse.inventory().list(true).await?.len();
    if existing > 0 {
        println!("⚠ Store already has {} inventory items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the store file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Parties
    let acme = warehouse
        .suppliers()
        .create(Supplier {
            email: Some("orders@acme-packaging.test".to_string()),
            ..Supplier::new("Acme Packaging")
        })
        .await?;
    let northern = warehouse.suppliers().create(Supplier::new("Northern Pallet Co")).await?;
    let harbour = warehouse
        .customers()
        .create(Customer {
            shipping_address: Some("12 Harbour Road, Dock 3".to_string()),
            ..Customer::new("Harbour Logistics")
        })
        .await?;
    warehouse.customers().create(Customer::new("Riverside Retail")).await?;
    println!("✓ Created suppliers and customers");

    // Catalogue
    let mut items = Vec::new();
    for (category_idx, (code, category_name, names)) in CATALOGUE.iter().enumerate() {
        let category = warehouse
            .categories()
            .create(Category {
                record: Record::new(),
                name: category_name.to_string(),
                description: None,
            })
            .await?;

        for (item_idx, name) in names.iter().enumerate() {
            let seed = (category_idx * 10 + item_idx) as i64;
            let mut item = InventoryItem::new(format!("{}-{:03}", code, item_idx + 1), *name);
            item.category_id = Some(category.id().to_string());
            let supplier = if *code == "PAL" { &northern } else { &acme };
            item.supplier_id = Some(supplier.id().to_string());
            item.location = Some(format!("A{}-{:02}", category_idx + 1, item_idx + 1));
            item.cost_price_cents = 150 + (seed * 37) % 2000;
            item.unit_price_cents = item.cost_price_cents * 14 / 10;
            item.quantity = 20 + (seed * 13) % 180;
            item.quantity_purchased = item.quantity;
            item.reorder_level = 25;
            items.push(warehouse.inventory().create(item).await?);
        }
    }
    println!("✓ Created {} inventory items", items.len());

    // Users
    warehouse
        .users()
        .create_with_password(
            User {
                display_name: Some("Administrator".to_string()),
                ..User::new("admin", Role::Admin)
            },
            "admin-password",
        )
        .await?;
    println!("✓ Created admin user");

    // A purchase order, part-received
    let pos = warehouse.purchase_orders();
    let mut po = PurchaseOrder::new("PO-0001", acme.id());
    for item in items.iter().take(3) {
        po.lines.push(PurchaseOrderLine::new(
            item.id(),
            50,
            Money::from_cents(item.cost_price_cents),
        ));
    }
    let po = pos.records().create(po).await?;
    pos.submit(po.id()).await?;
    pos.approve(po.id(), "admin").await?;
    pos.place(po.id()).await?;
    pos.receive(po.id(), &[LineQuantity::new(items[0].id(), 50)]).await?;
    println!("✓ Created purchase order {} (partially received)", po.po_number);

    // A sales order, shipped and paid
    let sos = warehouse.sales_orders();
    let mut so = SalesOrder::new("SO-0001", harbour.id());
    so.lines.push(SalesOrderLine::new(items[4].id(), 5, Money::zero()));
    let so = sos.records().create(so).await?;
    sos.confirm(so.id()).await?;
    let (so, _) = sos
        .ship(so.id(), &[LineQuantity::new(items[4].id(), 5)], Dispatch::default())
        .await?;
    warehouse
        .payments()
        .record(PaymentTransaction::new(
            OrderKind::SalesOrder,
            so.id(),
            Money::from_cents(so.total_cents),
        ))
        .await?;
    println!("✓ Created sales order {} (shipped, paid)", so.so_number);

    // Opening balances
    let cash = warehouse.cash();
    cash.records()
        .create(CashTransaction {
            description: Some("Opening float".to_string()),
            ..CashTransaction::new(CashAccount::Cash, CashDirection::Deposit, Money::from_cents(50_000))
        })
        .await?;
    cash.records()
        .create(CashTransaction {
            description: Some("Opening balance".to_string()),
            ..CashTransaction::new(CashAccount::Bank, CashDirection::Deposit, Money::from_cents(2_500_000))
        })
        .await?;
    println!("✓ Recorded opening balances");

    println!();
    println!("  Cash: {}", cash.balance(CashAccount::Cash).await?);
    println!("  Bank: {}", cash.balance(CashAccount::Bank).await?);
    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}
