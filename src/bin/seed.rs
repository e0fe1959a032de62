//! Seed binary - populates the database with realistic demo data
//!
//! Run with: cargo run --bin seed
//!
//! This creates:
//! - the company profile and one user per role
//! - an active PPN 11% tax plus a retired 10% row
//! - 10 wholesale products and 6 customers
//! - order chains in every lifecycle stage, including an overdue invoice
//! - field visits and sales targets for the sales reps

use chrono::{Datelike, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use std::time::Duration as StdDuration;
use tracing::info;
use uuid::Uuid;

use niaga_api::auth::hash_password;
use niaga_api::entities::{
    company_profile, customer, delivery_note, field_visit, invoice, invoice_item, order,
    order_item, payment, product, purchase_order, sales_target, tax, user,
};
use niaga_api::migrator::Migrator;
use niaga_api::services::lifecycle::{
    DeliveryNoteStatus, InvoicePaymentStatus, InvoiceStatus, OrderStatus, PaymentStatus,
    PurchaseOrderStatus,
};
use niaga_api::services::numbering::{
    document_number, DELIVERY_NOTE_PREFIX, INVOICE_PREFIX, ORDER_PREFIX, PAYMENT_PREFIX,
    PURCHASE_ORDER_PREFIX,
};
use niaga_api::services::pricing::selling_price;

const PPN_RATE: Decimal = dec!(0.11);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Niaga API Seed Data ===");

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://niaga.db?mode=rwc".to_string());

    let mut options = ConnectOptions::new(database_url.clone());
    options
        .max_connections(5)
        .min_connections(1)
        .connect_timeout(StdDuration::from_secs(10))
        .acquire_timeout(StdDuration::from_secs(10));

    info!("Connecting to database: {}", database_url);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    info!("Connected, schema is current\n");

    info!("Creating company profile...");
    create_company_profile(&db).await?;

    info!("Creating users...");
    let users = create_users(&db).await?;
    info!("  Created {} users", users.len());

    info!("Creating taxes...");
    create_taxes(&db).await?;
    info!("  Active tax: PPN 11%");

    info!("Creating products...");
    let products = create_products(&db).await?;
    info!("  Created {} products", products.len());

    info!("Creating customers...");
    let customers = create_customers(&db).await?;
    info!("  Created {} customers", customers.len());

    let sales_reps: Vec<&user::Model> = users.iter().filter(|u| u.role == "SALES").collect();

    info!("Creating order chains...");
    let chain_count = create_order_chains(&db, &products, &customers, &sales_reps).await?;
    info!("  Created {} orders with their documents", chain_count);

    info!("Creating field visits...");
    let visit_count = create_field_visits(&db, &sales_reps, &customers).await?;
    info!("  Created {} field visits", visit_count);

    info!("Creating sales targets...");
    let target_count = create_sales_targets(&db, &sales_reps).await?;
    info!("  Created {} sales targets", target_count);

    info!("\n=== Seed Data Complete ===");
    info!("Log in with admin / rahasia-admin-123 (same password pattern per role)");
    info!("");
    info!("Try these API calls:");
    info!("  curl -X POST http://localhost:8080/auth/login -H 'content-type: application/json' \\");
    info!("       -d '{{\"username\":\"admin\",\"password\":\"rahasia-admin-123\"}}'");
    info!("  curl http://localhost:8080/api/v1/orders -H 'authorization: Bearer <token>'");
    info!("  curl http://localhost:8080/api/v1/receivables -H 'authorization: Bearer <token>'");
    info!("");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    Ok(())
}

async fn create_company_profile(db: &DatabaseConnection) -> anyhow::Result<()> {
    let profile = company_profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("PT Niaga Sejahtera Abadi".to_string()),
        address: Set(Some("Jl. Raya Industri No. 88, Kawasan Niaga Blok C".to_string())),
        city: Set(Some("Surabaya".to_string())),
        phone: Set(Some("+62-31-555-0188".to_string())),
        email: Set(Some("admin@niagasejahtera.co.id".to_string())),
        tax_id: Set(Some("01.234.567.8-901.000".to_string())),
        bank_name: Set(Some("Bank Mandiri".to_string())),
        bank_account_number: Set(Some("1400012345678".to_string())),
        bank_account_holder: Set(Some("PT Niaga Sejahtera Abadi".to_string())),
        logo_path: Set(None),
        updated_at: Set(Some(Utc::now())),
    };
    profile.insert(db).await?;
    Ok(())
}

async fn create_users(db: &DatabaseConnection) -> anyhow::Result<Vec<user::Model>> {
    let users_data = vec![
        ("admin", "Dewi Hartono", "ADMIN"),
        ("finance", "Rina Wijaya", "FINANCE"),
        ("budi", "Budi Santoso", "SALES"),
        ("agus", "Agus Prasetyo", "SALES"),
        ("gudang", "Joko Susilo", "WAREHOUSE"),
    ];

    let mut created = Vec::new();
    let now = Utc::now();

    for (username, full_name, role) in users_data {
        let password = format!("rahasia-{}-123", username);
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            password_hash: Set(hash_password(&password)?),
            full_name: Set(full_name.to_string()),
            role: Set(role.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;
        created.push(model);
    }

    Ok(created)
}

async fn create_taxes(db: &DatabaseConnection) -> anyhow::Result<()> {
    let now = Utc::now();

    tax::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("PPN 10% (sampai Maret 2022)".to_string()),
        rate: Set(dec!(0.10)),
        is_active: Set(false),
        created_at: Set(now - Duration::days(400)),
        updated_at: Set(Some(now)),
    }
    .insert(db)
    .await?;

    tax::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("PPN 11%".to_string()),
        rate: Set(PPN_RATE),
        is_active: Set(true),
        created_at: Set(now - Duration::days(400)),
        updated_at: Set(None),
    }
    .insert(db)
    .await?;

    Ok(())
}

async fn create_products(db: &DatabaseConnection) -> anyhow::Result<Vec<product::Model>> {
    let products_data = vec![
        ("MGR-001", "Minyak Goreng Sawit 1L (karton isi 12)", "karton", dec!(160_000), 120),
        ("MGR-002", "Minyak Goreng Sawit 2L (karton isi 6)", "karton", dec!(158_000), 80),
        ("BRS-005", "Beras Premium 5kg", "sak", dec!(62_000), 200),
        ("BRS-025", "Beras Medium 25kg", "sak", dec!(280_000), 90),
        ("GPS-001", "Gula Pasir 1kg (karton isi 24)", "karton", dec!(305_000), 60),
        ("TPT-001", "Tepung Terigu 1kg (karton isi 12)", "karton", dec!(125_000), 75),
        ("MIE-001", "Mie Instan Goreng (dus isi 40)", "dus", dec!(98_000), 300),
        ("MIE-002", "Mie Instan Kuah (dus isi 40)", "dus", dec!(92_000), 250),
        ("KCP-001", "Kecap Manis 600ml (karton isi 12)", "karton", dec!(210_000), 45),
        ("AQA-019", "Air Mineral 600ml (karton isi 24)", "karton", dec!(42_000), 400),
    ];

    let mut created = Vec::new();
    let now = Utc::now();

    for (sku, name, unit, base_price, stock) in products_data {
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(name.to_string()),
            unit: Set(unit.to_string()),
            base_price: Set(base_price),
            selling_price: Set(selling_price(base_price, PPN_RATE)),
            stock_quantity: Set(stock),
            description: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;
        created.push(model);
    }

    Ok(created)
}

async fn create_customers(db: &DatabaseConnection) -> anyhow::Result<Vec<customer::Model>> {
    let customers_data = vec![
        ("Toko Sumber Rejeki", Some("Pak Hasan"), Some("+62-812-3456-7801"), "Jl. Pasar Turi No. 12", "Surabaya"),
        ("UD Maju Bersama", Some("Bu Sri"), Some("+62-812-3456-7802"), "Jl. Ahmad Yani No. 45", "Sidoarjo"),
        ("Toko Berkah Jaya", Some("Pak Dedi"), None, "Jl. Diponegoro No. 3", "Gresik"),
        ("CV Sinar Terang", Some("Pak Anton"), Some("+62-812-3456-7804"), "Jl. Veteran No. 101", "Surabaya"),
        ("Warung Barokah", None, Some("+62-812-3456-7805"), "Jl. Kenjeran No. 77", "Surabaya"),
        ("Toko Lima Saudara", Some("Bu Yanti"), Some("+62-812-3456-7806"), "Jl. Raya Waru No. 21", "Sidoarjo"),
    ];

    let mut created = Vec::new();
    let now = Utc::now();

    for (name, contact_person, phone, address, city) in customers_data {
        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            contact_person: Set(contact_person.map(|c| c.to_string())),
            phone: Set(phone.map(|p| p.to_string())),
            email: Set(None),
            address: Set(Some(address.to_string())),
            city: Set(Some(city.to_string())),
            notes: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;
        created.push(model);
    }

    Ok(created)
}

/// Inserts one order per stage, each with the downstream documents that
/// stage implies. Amounts follow the same math the services use: item
/// amount = unit price x quantity, invoice tax applied on the subtotal.
async fn create_order_chains(
    db: &DatabaseConnection,
    products: &[product::Model],
    customers: &[customer::Model],
    sales_reps: &[&user::Model],
) -> anyhow::Result<usize> {
    // (stage, days_ago, item_count)
    let scenarios = vec![
        ("NEW", 0, 2),
        ("CONFIRMED", 1, 1),
        ("INVOICED", 5, 3),
        ("DELIVERING", 12, 2),
        ("COMPLETED", 30, 2),
        ("OVERDUE", 45, 1),
        ("CANCELLED", 3, 1),
    ];

    let now = Utc::now();
    let mut count = 0;

    for (i, (stage, days_ago, item_count)) in scenarios.iter().enumerate() {
        let customer = &customers[i % customers.len()];
        let sales_rep = sales_reps[i % sales_reps.len()];
        let order_date = now - Duration::days(*days_ago as i64);
        let order_id = Uuid::new_v4();

        let picked: Vec<&product::Model> = products
            .iter()
            .cycle()
            .skip(i * 2)
            .take(*item_count)
            .collect();

        let mut subtotal = Decimal::ZERO;
        let mut items = Vec::new();
        for (j, prod) in picked.iter().enumerate() {
            let quantity = ((i + j) % 4 + 1) as i32 * 5;
            let amount = prod.selling_price * Decimal::from(quantity);
            subtotal += amount;
            items.push((*prod, quantity, amount));
        }

        let order_status = match *stage {
            "NEW" => OrderStatus::New,
            "CANCELLED" => OrderStatus::Cancelled,
            "COMPLETED" => OrderStatus::Completed,
            _ => OrderStatus::Processing,
        };

        order::ActiveModel {
            id: Set(order_id),
            order_number: Set(document_number(ORDER_PREFIX, order_date)),
            customer_id: Set(customer.id),
            sales_rep_id: Set(sales_rep.id),
            status: Set(order_status.to_string()),
            order_date: Set(order_date),
            total_amount: Set(subtotal),
            notes: Set(match *stage {
                "CANCELLED" => Some("Cancelled: stok pelanggan masih penuh".to_string()),
                _ => None,
            }),
            confirmed_at: Set(match *stage {
                "NEW" | "CANCELLED" => None,
                _ => Some(order_date + Duration::hours(2)),
            }),
            completed_at: Set(match *stage {
                "COMPLETED" => Some(order_date + Duration::days(7)),
                _ => None,
            }),
            cancelled_at: Set(match *stage {
                "CANCELLED" => Some(order_date + Duration::hours(4)),
                _ => None,
            }),
            created_at: Set(order_date),
            updated_at: Set(Some(now)),
        }
        .insert(db)
        .await?;

        for (prod, quantity, amount) in &items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(prod.id),
                description: Set(prod.name.clone()),
                quantity: Set(*quantity),
                unit_price: Set(prod.selling_price),
                amount: Set(*amount),
                created_at: Set(order_date),
            }
            .insert(db)
            .await?;
        }

        count += 1;

        // NEW and CANCELLED orders have no downstream documents
        if matches!(*stage, "NEW" | "CANCELLED") {
            continue;
        }

        let po_status = match *stage {
            "CONFIRMED" => PurchaseOrderStatus::Pending,
            "DELIVERING" => PurchaseOrderStatus::ReadyForDelivery,
            "COMPLETED" => PurchaseOrderStatus::Completed,
            _ => PurchaseOrderStatus::Processing,
        };

        let po_id = Uuid::new_v4();
        purchase_order::ActiveModel {
            id: Set(po_id),
            po_number: Set(document_number(PURCHASE_ORDER_PREFIX, order_date)),
            order_id: Set(order_id),
            status: Set(po_status.to_string()),
            net_terms: Set(30),
            notes: Set(None),
            completed_at: Set(match po_status {
                PurchaseOrderStatus::Completed => Some(order_date + Duration::days(7)),
                _ => None,
            }),
            cancelled_at: Set(None),
            created_at: Set(order_date + Duration::hours(2)),
            updated_at: Set(Some(now)),
        }
        .insert(db)
        .await?;

        // A PENDING purchase order has not been invoiced yet
        if po_status == PurchaseOrderStatus::Pending {
            continue;
        }

        let invoice_date = order_date + Duration::days(1);
        let due_date = invoice_date + Duration::days(30);
        let tax_amount = subtotal * PPN_RATE;
        let total_amount = subtotal + tax_amount;

        let (invoice_status, paid_amount) = match *stage {
            "DELIVERING" => (InvoiceStatus::Delivered, total_amount / dec!(2)),
            "COMPLETED" => (InvoiceStatus::Completed, total_amount),
            _ => (InvoiceStatus::Sent, Decimal::ZERO),
        };
        let payment_status = InvoicePaymentStatus::from_amounts(paid_amount, total_amount);
        let use_delivery_note = matches!(*stage, "DELIVERING" | "COMPLETED");

        let invoice_id = Uuid::new_v4();
        invoice::ActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(document_number(INVOICE_PREFIX, invoice_date)),
            purchase_order_id: Set(po_id),
            customer_id: Set(customer.id),
            invoice_type: Set("PRODUCT".to_string()),
            use_delivery_note: Set(use_delivery_note),
            status: Set(invoice_status.to_string()),
            payment_status: Set(payment_status.to_string()),
            invoice_date: Set(invoice_date),
            due_date: Set(due_date),
            subtotal: Set(subtotal),
            tax_rate: Set(PPN_RATE),
            tax_amount: Set(tax_amount),
            discount_amount: Set(Decimal::ZERO),
            shipping_cost: Set(Decimal::ZERO),
            total_amount: Set(total_amount),
            paid_amount: Set(paid_amount),
            remaining_amount: Set(total_amount - paid_amount),
            notes: Set(None),
            created_at: Set(invoice_date),
            updated_at: Set(Some(now)),
        }
        .insert(db)
        .await?;

        for (prod, quantity, amount) in &items {
            invoice_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_id: Set(invoice_id),
                product_id: Set(Some(prod.id)),
                description: Set(prod.name.clone()),
                quantity: Set(*quantity),
                unit_price: Set(prod.selling_price),
                amount: Set(*amount),
                created_at: Set(invoice_date),
            }
            .insert(db)
            .await?;
        }

        if paid_amount > Decimal::ZERO {
            let payment_date = invoice_date + Duration::days(3);
            payment::ActiveModel {
                id: Set(Uuid::new_v4()),
                payment_number: Set(document_number(PAYMENT_PREFIX, payment_date)),
                invoice_id: Set(invoice_id),
                amount: Set(paid_amount),
                method: Set("TRANSFER".to_string()),
                status: Set(PaymentStatus::Cleared.to_string()),
                reference: Set(Some(format!("TRF/{}/{:04}", payment_date.format("%Y%m"), i + 1))),
                payment_date: Set(payment_date),
                cleared_at: Set(Some(payment_date + Duration::hours(6))),
                created_at: Set(payment_date),
                updated_at: Set(Some(now)),
            }
            .insert(db)
            .await?;
        }

        // The half-paid invoice also carries a giro still waiting to clear
        if *stage == "DELIVERING" {
            let payment_date = invoice_date + Duration::days(10);
            payment::ActiveModel {
                id: Set(Uuid::new_v4()),
                payment_number: Set(document_number(PAYMENT_PREFIX, payment_date)),
                invoice_id: Set(invoice_id),
                amount: Set(total_amount - paid_amount),
                method: Set("GIRO".to_string()),
                status: Set(PaymentStatus::Pending.to_string()),
                reference: Set(Some(format!("GIRO/BCA/{:06}", 240_000 + i))),
                payment_date: Set(payment_date),
                cleared_at: Set(None),
                created_at: Set(payment_date),
                updated_at: Set(Some(now)),
            }
            .insert(db)
            .await?;
        }

        if use_delivery_note {
            let delivery_date = invoice_date + Duration::days(2);
            delivery_note::ActiveModel {
                id: Set(Uuid::new_v4()),
                delivery_number: Set(document_number(DELIVERY_NOTE_PREFIX, delivery_date)),
                invoice_id: Set(invoice_id),
                driver_name: Set("Slamet Riyadi".to_string()),
                vehicle_number: Set("L 8821 UT".to_string()),
                delivery_date: Set(delivery_date),
                recipient_name: Set(customer.contact_person.clone()),
                status: Set(DeliveryNoteStatus::Delivered.to_string()),
                notes: Set(None),
                created_at: Set(delivery_date),
                updated_at: Set(Some(now)),
            }
            .insert(db)
            .await?;
        }
    }

    Ok(count)
}

async fn create_field_visits(
    db: &DatabaseConnection,
    sales_reps: &[&user::Model],
    customers: &[customer::Model],
) -> anyhow::Result<usize> {
    let visits_data = vec![
        ("Penawaran produk baru", 2),
        ("Penagihan faktur jatuh tempo", 5),
        ("Kunjungan rutin mingguan", 7),
        ("Cek stok dan display", 9),
    ];

    let now = Utc::now();
    let mut count = 0;

    for (i, (purpose, days_ago)) in visits_data.iter().enumerate() {
        field_visit::ActiveModel {
            id: Set(Uuid::new_v4()),
            sales_rep_id: Set(sales_reps[i % sales_reps.len()].id),
            customer_id: Set(customers[i % customers.len()].id),
            visit_date: Set(now - Duration::days(*days_ago)),
            purpose: Set(Some(purpose.to_string())),
            notes: Set(None),
            created_at: Set(now - Duration::days(*days_ago)),
        }
        .insert(db)
        .await?;
        count += 1;
    }

    Ok(count)
}

async fn create_sales_targets(
    db: &DatabaseConnection,
    sales_reps: &[&user::Model],
) -> anyhow::Result<usize> {
    let now = Utc::now();
    let mut count = 0;

    for rep in sales_reps {
        for month_offset in 0..3i32 {
            let mut year = now.year();
            let mut month = now.month() as i32 - month_offset;
            if month < 1 {
                month += 12;
                year -= 1;
            }

            sales_target::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(rep.id),
                year: Set(year),
                month: Set(month),
                target_amount: Set(dec!(150_000_000)),
                created_at: Set(now),
                updated_at: Set(None),
            }
            .insert(db)
            .await?;
            count += 1;
        }
    }

    Ok(count)
}
