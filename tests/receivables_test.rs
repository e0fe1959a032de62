//! Receivables aging over the HTTP surface: backdated invoices land in
//! the right buckets and OVERDUE shows up at read time.

mod common;

use axum::http::Method;
use chrono::{Duration, Utc};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;
use uuid::Uuid;

fn decimal_field(value: &Value, key: &str) -> Decimal {
    let raw = value[key]
        .as_str()
        .unwrap_or_else(|| panic!("{} should be a decimal string, got {}", key, value[key]));
    Decimal::from_str(raw).expect("decimal field parses")
}

struct Tokens {
    sales: String,
    finance: String,
}

/// Runs the chain up to a SENT invoice with the given backdated invoice
/// date, returning (invoice_id, total_amount).
async fn sent_invoice_aged(
    app: &TestApp,
    tokens: &Tokens,
    customer_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    invoice_age_days: i64,
) -> (String, Decimal) {
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id,
                "items": [{"product_id": product_id, "quantity": quantity}],
            })),
            Some(&tokens.sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let order_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    for step in ["submit", "confirm"] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/orders/{}/{}", order_id, step),
                None,
                Some(&tokens.sales),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/purchase-order", order_id),
            Some(json!({"net_terms": 30})),
            Some(&tokens.sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let po_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/status", po_id),
            Some(json!({"status": "PROCESSING"})),
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 200);

    let invoice_date = Utc::now() - Duration::days(invoice_age_days);
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/invoice", po_id),
            Some(json!({
                "invoice_type": "PRODUCT",
                "invoice_date": invoice_date,
            })),
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let invoice = response_json(response).await["data"].clone();
    let invoice_id = invoice["id"].as_str().unwrap().to_string();
    let total = decimal_field(&invoice, "total_amount");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/send", invoice_id),
            None,
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 200);

    (invoice_id, total)
}

#[tokio::test]
async fn aging_report_buckets_open_invoices() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let toko = app.seed_customer("Toko Sumber Rejeki").await;
    let warung = app.seed_customer("Warung Berkah").await;
    // 160_000 * 1.11 rounded up to thousands = 178_000 a karton
    let (product_id, _) = app.seed_product("MGR-001", dec!(160_000)).await;

    let tokens = Tokens {
        sales: app.login("sales").await,
        finance: app.login("finance").await,
    };

    // NET 30 throughout: age 0 is current, age 40 is 10 days past due,
    // age 100 is 70 days past due.
    let (_, current_total) = sent_invoice_aged(&app, &tokens, toko, product_id, 1, 0).await;
    let (late_id, late_total) = sent_invoice_aged(&app, &tokens, toko, product_id, 2, 40).await;
    let (old_id, old_total) = sent_invoice_aged(&app, &tokens, warung, product_id, 1, 100).await;

    assert_eq!(current_total, dec!(197_580));
    assert_eq!(late_total, dec!(395_160));
    assert_eq!(old_total, dec!(197_580));

    // A cleared partial payment shrinks the bucket, not the invoice count
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "invoice_id": late_id,
                "amount": "95160",
                "method": "GIRO",
                "reference": "GIRO/2026/0812",
            })),
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let payment_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/payments/{}/clear", payment_id),
            None,
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(Method::GET, "/api/v1/receivables", None, Some(&tokens.finance))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let report = &body["data"];

    let summary = &report["summary"];
    assert_eq!(decimal_field(summary, "current"), dec!(197_580));
    assert_eq!(decimal_field(summary, "overdue_1_30"), dec!(300_000));
    assert_eq!(decimal_field(summary, "overdue_31_60"), Decimal::ZERO);
    assert_eq!(decimal_field(summary, "overdue_60_plus"), dec!(197_580));
    assert_eq!(decimal_field(summary, "total_outstanding"), dec!(695_160));

    // Largest outstanding customer first
    let customers = report["customers"].as_array().unwrap();
    assert_eq!(customers.len(), 2);
    assert_eq!(customers[0]["customer_name"], "Toko Sumber Rejeki");
    assert_eq!(
        decimal_field(&customers[0], "total_outstanding"),
        dec!(497_580)
    );
    assert_eq!(customers[0]["invoices"].as_array().map(Vec::len), Some(2));
    assert_eq!(customers[1]["customer_name"], "Warung Berkah");

    let oldest = customers[1]["invoices"]
        .as_array()
        .unwrap()
        .iter()
        .find(|inv| inv["invoice_id"] == old_id.as_str())
        .expect("backdated invoice in the report");
    assert_eq!(oldest["days_overdue"], 70);
    assert_eq!(oldest["bucket"], "OVERDUE_60_PLUS");

    // The summary endpoint returns just the totals
    let response = app
        .request(
            Method::GET,
            "/api/v1/receivables/summary",
            None,
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(
        decimal_field(&body["data"], "total_outstanding"),
        dec!(695_160)
    );
}

#[tokio::test]
async fn settled_invoices_leave_the_report() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let customer_id = app.seed_customer("PT Maju Makmur").await;
    let (product_id, _) = app.seed_product("SRD-003", dec!(45_000)).await;

    let tokens = Tokens {
        sales: app.login("sales").await,
        finance: app.login("finance").await,
    };

    let (invoice_id, total) =
        sent_invoice_aged(&app, &tokens, customer_id, product_id, 3, 50).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "invoice_id": invoice_id,
                "amount": total.to_string(),
                "method": "TRANSFER",
            })),
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let payment_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/payments/{}/clear", payment_id),
            None,
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(Method::GET, "/api/v1/receivables", None, Some(&tokens.finance))
        .await;
    let body = response_json(response).await;
    assert_eq!(
        decimal_field(&body["data"]["summary"], "total_outstanding"),
        Decimal::ZERO
    );
    assert_eq!(body["data"]["customers"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn overdue_is_layered_over_sent_at_read_time() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let customer_id = app.seed_customer("CV Abadi Jaya").await;
    let (product_id, _) = app.seed_product("TPG-002", dec!(120_000)).await;

    let tokens = Tokens {
        sales: app.login("sales").await,
        finance: app.login("finance").await,
    };

    let (invoice_id, _) = sent_invoice_aged(&app, &tokens, customer_id, product_id, 1, 45).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{}", invoice_id),
            None,
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "OVERDUE");
    assert_eq!(body["data"]["days_overdue"], 15);

    // The stored status is still SENT, so the OVERDUE list filter finds it
    let response = app
        .request(
            Method::GET,
            "/api/v1/invoices?status=OVERDUE",
            None,
            Some(&tokens.finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let invoices = body["data"]["invoices"].as_array().unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0]["id"], invoice_id.as_str());
}
