//! End-to-end coverage of the order-to-cash chain over the HTTP surface:
//! order -> purchase order -> invoice -> delivery note -> payment, plus
//! the refusal paths that keep the chain consistent.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;

fn decimal_field(value: &Value, key: &str) -> Decimal {
    let raw = value[key]
        .as_str()
        .unwrap_or_else(|| panic!("{} should be a decimal string, got {}", key, value[key]));
    Decimal::from_str(raw).expect("decimal field parses")
}

fn id_field(value: &Value) -> String {
    value["id"].as_str().expect("document id").to_string()
}

#[tokio::test]
async fn order_to_cash_happy_path() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let customer_id = app.seed_customer("Toko Sumber Rejeki").await;
    let (product_id, selling_price) = app.seed_product("MGR-001", dec!(160_000)).await;
    // 160_000 * 1.11 = 177_600, rounded up to the next thousand
    assert_eq!(selling_price, dec!(178_000));

    let sales = app.login("sales").await;
    let finance = app.login("finance").await;
    let warehouse = app.login("warehouse").await;

    // Order: NEW, priced from the catalog
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id,
                "items": [{"product_id": product_id, "quantity": 10}],
            })),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    let order = &body["data"];
    assert_eq!(order["status"], "NEW");
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(decimal_field(order, "total_amount"), dec!(1_780_000));
    let order_id = id_field(order);

    // Submit hands it over, confirm starts processing
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/submit", order_id),
            None,
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response_json(response).await["data"]["status"],
        "PENDING_CONFIRMATION"
    );

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/confirm", order_id),
            None,
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "PROCESSING");
    assert!(body["data"]["confirmed_at"].is_string());

    // Purchase order for the confirmed order
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/purchase-order", order_id),
            Some(json!({"net_terms": 30})),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "PENDING");
    let po_id = id_field(&body["data"]);

    // A PENDING purchase order cannot be invoiced yet
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/invoice", po_id),
            Some(json!({"invoice_type": "PRODUCT"})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 422);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/status", po_id),
            Some(json!({"status": "PROCESSING"})),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 200);

    // Invoice: order lines copied, PPN applied on the subtotal
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/invoice", po_id),
            Some(json!({"invoice_type": "PRODUCT", "use_delivery_note": true})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    let invoice = &body["data"];
    assert_eq!(invoice["status"], "DRAFT");
    assert_eq!(invoice["payment_status"], "UNPAID");
    assert_eq!(decimal_field(invoice, "subtotal"), dec!(1_780_000));
    assert_eq!(decimal_field(invoice, "tax_amount"), dec!(195_800));
    assert_eq!(decimal_field(invoice, "total_amount"), dec!(1_975_800));
    assert_eq!(decimal_field(invoice, "remaining_amount"), dec!(1_975_800));
    assert_eq!(invoice["items"].as_array().map(Vec::len), Some(1));
    let invoice_id = id_field(invoice);

    // One invoice per purchase order
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/invoice", po_id),
            Some(json!({"invoice_type": "PRODUCT"})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 409);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/send", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "SENT");

    // Surat jalan for the sent invoice
    let response = app
        .request(
            Method::POST,
            "/api/v1/delivery-notes",
            Some(json!({
                "invoice_id": invoice_id,
                "driver_name": "Slamet Riyadi",
                "vehicle_number": "l 8821 ut",
            })),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["vehicle_number"], "L 8821 UT");
    let note_id = id_field(&body["data"]);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/delivery-notes/{}/deliver", note_id),
            Some(json!({"recipient_name": "Pak Hasan"})),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "DELIVERED");

    // The invoice follows the delivery
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{}", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response_json(response).await["data"]["status"], "DELIVERED");

    // Full payment, pending until it clears
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "invoice_id": invoice_id,
                "amount": "1975800",
                "method": "transfer",
                "reference": "TRF/202408/0001",
            })),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["method"], "TRANSFER");
    let payment_id = id_field(&body["data"]);

    // A pending payment settles nothing
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{}", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(decimal_field(&body["data"], "paid_amount"), Decimal::ZERO);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/payments/{}/clear", payment_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "CLEARED");
    assert!(body["data"]["cleared_at"].is_string());

    // Clearing settles the invoice in the same stroke
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{}", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "PAID");
    assert_eq!(body["data"]["payment_status"], "PAID");
    assert_eq!(decimal_field(&body["data"], "paid_amount"), dec!(1_975_800));
    assert_eq!(
        decimal_field(&body["data"], "remaining_amount"),
        Decimal::ZERO
    );

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/complete", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "COMPLETED");

    // Completing the purchase order completes the customer order
    for status in ["READY_FOR_DELIVERY", "COMPLETED"] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/purchase-orders/{}/status", po_id),
                Some(json!({"status": status})),
                Some(&warehouse),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&sales),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert!(body["data"]["completed_at"].is_string());
}

#[tokio::test]
async fn cancellation_walks_the_chain_backwards() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let customer_id = app.seed_customer("UD Maju Bersama").await;
    let (product_id, _) = app.seed_product("BRS-005", dec!(62_000)).await;

    let sales = app.login("sales").await;
    let finance = app.login("finance").await;
    let warehouse = app.login("warehouse").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id,
                "items": [{"product_id": product_id, "quantity": 4}],
            })),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let order_id = id_field(&response_json(response).await["data"]);

    for step in ["submit", "confirm"] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/orders/{}/{}", order_id, step),
                None,
                Some(&sales),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/purchase-order", order_id),
            None,
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let po_id = id_field(&response_json(response).await["data"]);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/status", po_id),
            Some(json!({"status": "PROCESSING"})),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/invoice", po_id),
            Some(json!({"invoice_type": "PRODUCT"})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let invoice_id = id_field(&response_json(response).await["data"]);

    // Order blocked by the live PO, PO blocked by the live invoice
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(json!({"reason": "Pelanggan membatalkan"})),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 422);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/cancel", po_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 422);

    // Walk backwards: invoice, then PO, then order
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/cancel", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "CANCELLED");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/cancel", po_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "CANCELLED");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(json!({"reason": "Pelanggan membatalkan"})),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "CANCELLED");
    assert_eq!(body["data"]["notes"], "Pelanggan membatalkan");
    assert!(body["data"]["cancelled_at"].is_string());
}

#[tokio::test]
async fn paid_invoices_refuse_cancellation() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let customer_id = app.seed_customer("Toko Berkah Jaya").await;
    let (product_id, _) = app.seed_product("MIE-001", dec!(98_000)).await;

    let sales = app.login("sales").await;
    let finance = app.login("finance").await;

    let invoice = setup_sent_invoice(&app, &sales, &finance, customer_id, product_id).await;
    let invoice_id = id_field(&invoice);
    let total = decimal_field(&invoice, "total_amount");

    // Record and clear a partial payment
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "invoice_id": invoice_id,
                "amount": (total / dec!(2)).to_string(),
                "method": "CASH",
            })),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let payment_id = id_field(&response_json(response).await["data"]);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/payments/{}/clear", payment_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);

    // Money on the invoice blocks cancellation
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/cancel", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 422);

    // Rejecting the cleared payment reverses the settlement
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/payments/{}/reject", payment_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "REJECTED");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{}", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(decimal_field(&body["data"], "paid_amount"), Decimal::ZERO);
    assert_eq!(decimal_field(&body["data"], "remaining_amount"), total);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/cancel", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "CANCELLED");
}

#[tokio::test]
async fn delivery_notes_are_guarded_and_issued_once() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let customer_id = app.seed_customer("PT Anugrah Pangan").await;
    let (product_id, _) = app.seed_product("GLA-002", dec!(13_500)).await;

    let sales = app.login("sales").await;
    let finance = app.login("finance").await;
    let warehouse = app.login("warehouse").await;

    let invoice = setup_sent_invoice(&app, &sales, &finance, customer_id, product_id).await;
    let invoice_id = id_field(&invoice);

    let note_request = |invoice: &str| {
        json!({
            "invoice_id": invoice,
            "driver_name": "Slamet Riyadi",
            "vehicle_number": "W 1301 NE",
        })
    };

    let response = app
        .request(
            Method::POST,
            "/api/v1/delivery-notes",
            Some(note_request(&invoice_id)),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 201);
    let note_id = id_field(&response_json(response).await["data"]);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/delivery-notes/{}/cancel", note_id),
            None,
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "CANCELLED");

    // A cancelled note does not free the slot
    let response = app
        .request(
            Method::POST,
            "/api/v1/delivery-notes",
            Some(note_request(&invoice_id)),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 409);

    // Service invoices never get a surat jalan
    let service_invoice =
        setup_sent_service_invoice(&app, &sales, &finance, customer_id, product_id).await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/delivery-notes",
            Some(note_request(&id_field(&service_invoice))),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn swap_returns_the_invoice_and_replaces_goods() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let customer_id = app.seed_customer("CV Sinar Terang").await;
    let (product_id, selling_price) = app.seed_product("KCP-001", dec!(210_000)).await;

    let sales = app.login("sales").await;
    let finance = app.login("finance").await;

    let invoice = setup_sent_invoice(&app, &sales, &finance, customer_id, product_id).await;
    let invoice_id = id_field(&invoice);

    let response = app
        .request(
            Method::POST,
            "/api/v1/swaps",
            Some(json!({
                "invoice_id": invoice_id,
                "original_value": selling_price.to_string(),
                "notes": "Barang rusak saat kirim",
                "items": [{
                    "product_id": product_id,
                    "description": "Pengganti karton penyok",
                    "quantity": 1,
                    "unit_price": selling_price.to_string(),
                }],
            })),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert!(body["data"]["swap_number"]
        .as_str()
        .unwrap()
        .starts_with("SWP-"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{}", invoice_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response_json(response).await["data"]["status"], "RETURNED");

    // A returned invoice is terminal: no second swap
    let response = app
        .request(
            Method::POST,
            "/api/v1/swaps",
            Some(json!({
                "invoice_id": invoice_id,
                "original_value": "1000",
                "items": [{"description": "x", "quantity": 1, "unit_price": "1000"}],
            })),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 422);
}

/// Drives a fresh order up to a SENT invoice and returns the invoice body.
async fn setup_sent_invoice(
    app: &TestApp,
    sales: &str,
    finance: &str,
    customer_id: uuid::Uuid,
    product_id: uuid::Uuid,
) -> Value {
    setup_invoice(app, sales, finance, customer_id, product_id, "PRODUCT").await
}

async fn setup_sent_service_invoice(
    app: &TestApp,
    sales: &str,
    finance: &str,
    customer_id: uuid::Uuid,
    product_id: uuid::Uuid,
) -> Value {
    setup_invoice(app, sales, finance, customer_id, product_id, "SERVICE").await
}

async fn setup_invoice(
    app: &TestApp,
    sales: &str,
    finance: &str,
    customer_id: uuid::Uuid,
    product_id: uuid::Uuid,
    invoice_type: &str,
) -> Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id,
                "items": [{"product_id": product_id, "quantity": 1}],
            })),
            Some(sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let order_id = id_field(&response_json(response).await["data"]);

    for step in ["submit", "confirm"] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/orders/{}/{}", order_id, step),
                None,
                Some(sales),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/purchase-order", order_id),
            None,
            Some(sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let po_id = id_field(&response_json(response).await["data"]);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/status", po_id),
            Some(json!({"status": "PROCESSING"})),
            Some(finance),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/invoice", po_id),
            Some(json!({
                "invoice_type": invoice_type,
                "use_delivery_note": invoice_type == "PRODUCT",
            })),
            Some(finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let invoice = response_json(response).await["data"].clone();
    let invoice_id = id_field(&invoice);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/send", invoice_id),
            None,
            Some(finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["data"].clone()
}
