//! Master-data rules over the HTTP surface: the single-active-tax
//! invariant, catalog repricing on activation, and the customer delete
//! guard.

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

#[tokio::test]
async fn at_most_one_tax_is_active() {
    let app = TestApp::new().await;
    let finance = app.login("finance").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/taxes",
            Some(json!({"name": "PPN 11%", "rate": "0.11", "is_active": true})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 201);
    let first_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Activating a second tax deactivates the first
    let response = app
        .request(
            Method::POST,
            "/api/v1/taxes",
            Some(json!({"name": "PPN 12%", "rate": "0.12", "is_active": true})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .request(Method::GET, "/api/v1/taxes", None, Some(&finance))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let taxes = body["data"].as_array().unwrap();
    assert_eq!(taxes.len(), 2);
    let active: Vec<&Value> = taxes.iter().filter(|t| t["is_active"] == true).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["name"], "PPN 12%");

    // Reactivating the first through an update flips them back
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/taxes/{}", first_id),
            Some(json!({"is_active": true})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(Method::GET, "/api/v1/taxes", None, Some(&finance))
        .await;
    let body = response_json(response).await;
    let active: Vec<&Value> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|t| t["is_active"] == true)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["name"], "PPN 11%");

    // Rates of one or more never enter the table
    let response = app
        .request(
            Method::POST,
            "/api/v1/taxes",
            Some(json!({"name": "Typo", "rate": "1.5", "is_active": false})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn activating_a_tax_reprices_the_catalog() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let (product_id, selling_price) = app.seed_product("MGR-001", dec!(160_000)).await;
    assert_eq!(selling_price, dec!(178_000));

    let finance = app.login("finance").await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/taxes",
            Some(json!({"name": "PPN 5%", "rate": "0.05", "is_active": true})),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 201);

    // 160_000 * 1.05 = 168_000, already a round thousand
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}", product_id),
            None,
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(decimal_field(&body["data"], "selling_price"), dec!(168_000));
}

#[tokio::test]
async fn referenced_customers_cannot_be_deleted() {
    let app = TestApp::new().await;
    app.seed_active_tax().await;
    let (product_id, _) = app.seed_product("BRS-005", dec!(62_000)).await;

    let sales = app.login("sales").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/customers",
            Some(json!({"name": "Toko Andalan", "city": "Gresik"})),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let customer_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id,
                "items": [{"product_id": product_id, "quantity": 2}],
            })),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 201);

    // The order pins the customer
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/customers/{}", customer_id),
            None,
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 422);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("reference"));

    // A customer nothing points at goes quietly
    let response = app
        .request(
            Method::POST,
            "/api/v1/customers",
            Some(json!({"name": "Toko Sementara"})),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 201);
    let spare_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/customers/{}", spare_id),
            None,
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 204);

    // Names are unique
    let response = app
        .request(
            Method::POST,
            "/api/v1/customers",
            Some(json!({"name": "Toko Andalan"})),
            Some(&sales),
        )
        .await;
    assert_eq!(response.status(), 409);
}
