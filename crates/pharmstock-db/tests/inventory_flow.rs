//! End-to-end stock flows through the public engine API.

use chrono::NaiveDate;
use pharmstock_core::{
    Actor, NewMedicine, NewPurchase, NewPurchaseItem, NewSale, NewSaleItem, NewSupplier,
    PaymentMethod, PaymentStatus, Role,
};
use pharmstock_db::{Database, DbConfig, InventoryError};
use std::path::PathBuf;
use uuid::Uuid;

struct Catalog {
    supplier_id: String,
    medicine_id: String,
}

async fn catalog(db: &Database) -> Catalog {
    let supplier = db
        .suppliers()
        .insert(&NewSupplier {
            name: "MedSupply".into(),
            company_name: None,
            phone: "+1 555 0100".into(),
        })
        .await
        .unwrap();
    let medicine = db
        .medicines()
        .insert(&NewMedicine {
            name: "Paracetamol 500mg".into(),
            generic_name: Some("Paracetamol".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    Catalog {
        supplier_id: supplier.id,
        medicine_id: medicine.id,
    }
}

fn purchase(c: &Catalog, invoice: &str) -> NewPurchase {
    NewPurchase {
        invoice_number: invoice.into(),
        supplier_id: c.supplier_id.clone(),
        purchase_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        total_cents: 0,
        tax_cents: 0,
        discount_cents: 0,
        net_cents: 0,
        payment_status: PaymentStatus::Paid,
        payment_method: None,
        notes: None,
    }
}

fn receive(c: &Catalog, batch: &str, quantity: i64, expiry: (i32, u32, u32)) -> NewPurchaseItem {
    NewPurchaseItem {
        medicine_id: c.medicine_id.clone(),
        batch_number: batch.into(),
        quantity,
        unit_price_cents: 100,
        expiry_date: NaiveDate::from_ymd_opt(expiry.0, expiry.1, expiry.2),
        ..Default::default()
    }
}

fn sale(invoice: &str) -> NewSale {
    NewSale {
        invoice_number: invoice.into(),
        customer_name: None,
        customer_phone: None,
        customer_email: None,
        sale_date: None,
        total_cents: 0,
        tax_cents: 0,
        discount_cents: 0,
        net_cents: 0,
        payment_method: PaymentMethod::Cash,
        payment_status: PaymentStatus::Paid,
        prescription_number: None,
        notes: None,
    }
}

fn sell(c: &Catalog, batch_id: &str, quantity: i64) -> NewSaleItem {
    NewSaleItem {
        medicine_id: c.medicine_id.clone(),
        batch_id: batch_id.into(),
        quantity,
        unit_price_cents: 130,
        total_price_cents: None,
    }
}

/// File-backed database so several connections can contend for the write lock.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("pharmstock-test-{}.db", Uuid::new_v4()));
        TempDb { path }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

#[tokio::test]
async fn test_restock_sell_and_undo() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let c = catalog(&db).await;
    let pharmacist = Actor::new("u-pharm", Role::Pharmacist);
    let admin = Actor::new("u-admin", Role::Admin);

    db.purchases()
        .submit(&pharmacist, purchase(&c, "PO-1"), vec![receive(&c, "B1", 100, (2027, 1, 1))])
        .await
        .unwrap();
    db.purchases()
        .submit(&pharmacist, purchase(&c, "PO-2"), vec![receive(&c, "B1", 20, (2027, 1, 1))])
        .await
        .unwrap();

    // Restocking merges into the existing batch
    let available = db.batches().get_available(&c.medicine_id).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].quantity, 120);
    let batch_id = available[0].id.clone();

    let sale_id = db
        .sales()
        .submit(&pharmacist, sale("S-1"), vec![sell(&c, &batch_id, 50)])
        .await
        .unwrap();
    assert_eq!(db.batches().total_quantity(&c.medicine_id).await.unwrap(), 70);

    assert!(db.sales().delete(&admin, &sale_id).await.unwrap());
    assert_eq!(db.batches().total_quantity(&c.medicine_id).await.unwrap(), 120);
}

#[tokio::test]
async fn test_multi_line_sale_is_all_or_nothing() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let c = catalog(&db).await;
    let admin = Actor::new("u-admin", Role::Admin);

    db.purchases()
        .submit(
            &admin,
            purchase(&c, "PO-1"),
            vec![
                receive(&c, "EARLY", 10, (2026, 6, 1)),
                receive(&c, "LATE", 2, (2027, 6, 1)),
            ],
        )
        .await
        .unwrap();

    let early = db.batches().find_by_number(&c.medicine_id, "EARLY").await.unwrap().unwrap();
    let late = db.batches().find_by_number(&c.medicine_id, "LATE").await.unwrap().unwrap();

    let err = db
        .sales()
        .submit(
            &admin,
            sale("S-1"),
            vec![sell(&c, &early.id, 8), sell(&c, &late.id, 5)],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InventoryError::InsufficientStock { ref batch_id, available: 2, requested: 5, .. }
            if *batch_id == late.id
    ));

    // The first line's decrement was rolled back with the rest
    let early = db.batches().get_by_id(&early.id).await.unwrap().unwrap();
    assert_eq!(early.quantity, 10);
    assert_eq!(db.batches().total_quantity(&c.medicine_id).await.unwrap(), 12);
}

#[tokio::test]
async fn test_sale_reads_back_in_submission_order() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let c = catalog(&db).await;
    let admin = Actor::new("u-admin", Role::Admin);

    db.purchases()
        .submit(
            &admin,
            purchase(&c, "PO-1"),
            vec![
                receive(&c, "Z-LOT", 10, (2027, 1, 1)),
                receive(&c, "A-LOT", 10, (2026, 1, 1)),
            ],
        )
        .await
        .unwrap();

    let z = db.batches().find_by_number(&c.medicine_id, "Z-LOT").await.unwrap().unwrap();
    let a = db.batches().find_by_number(&c.medicine_id, "A-LOT").await.unwrap().unwrap();

    let mut header = sale("S-1");
    header.customer_name = Some("Jane Roe".into());
    header.prescription_number = Some("RX-778".into());

    let id = db
        .sales()
        .submit(
            &admin,
            header,
            vec![sell(&c, &z.id, 3), sell(&c, &a.id, 1), sell(&c, &z.id, 2)],
        )
        .await
        .unwrap();

    let detail = db.sales().find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(detail.sale.customer_name.as_deref(), Some("Jane Roe"));
    assert_eq!(detail.sale.prescription_number.as_deref(), Some("RX-778"));

    let lines: Vec<(&str, i64)> = detail
        .items
        .iter()
        .map(|i| (i.batch_number.as_str(), i.item.quantity))
        .collect();
    assert_eq!(lines, vec![("Z-LOT", 3), ("A-LOT", 1), ("Z-LOT", 2)]);
    assert!(detail.items.iter().all(|i| i.medicine_name == "Paracetamol 500mg"));
    assert_eq!(detail.items[1].expiry_date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_sales_never_oversell() {
    let tmp = TempDb::new();
    let db = Database::new(DbConfig::new(&tmp.path).max_connections(4))
        .await
        .unwrap();
    let c = catalog(&db).await;
    let staff = Actor::new("u-staff", Role::Staff);
    let admin = Actor::new("u-admin", Role::Admin);

    db.purchases()
        .submit(&admin, purchase(&c, "PO-1"), vec![receive(&c, "B1", 10, (2027, 1, 1))])
        .await
        .unwrap();
    let batch = db.batches().find_by_number(&c.medicine_id, "B1").await.unwrap().unwrap();

    let handles: Vec<_> = ["S-1", "S-2"]
        .into_iter()
        .map(|invoice| {
            let db = db.clone();
            let staff = staff.clone();
            let item = sell(&c, &batch.id, 6);
            tokio::spawn(async move { db.sales().submit(&staff, sale(invoice), vec![item]).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(InventoryError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, 4);
                assert_eq!(requested, 6);
                insufficient += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(insufficient, 1);

    let batch = db.batches().get_by_id(&batch.id).await.unwrap().unwrap();
    assert_eq!(batch.quantity, 4);

    db.close().await;
}
