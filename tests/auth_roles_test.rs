//! Authentication and role-gate coverage over the real middleware stack.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn api_requires_a_valid_token() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/orders", None, None)
        .await;
    assert_eq!(response.status(), 401);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Unauthorized"));

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders",
            None,
            Some("not-a-real-token"),
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "admin", "password": "admin-password-1"})),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["user"]["role"], "ADMIN");
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let response = app
        .request(Method::GET, "/auth/me", None, Some(&token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["username"], "admin");

    // Wrong password and unknown user read the same from outside
    for (username, password) in [("admin", "wrong-password"), ("ghost", "admin-password-1")] {
        let response = app
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({"username": username, "password": password})),
                None,
            )
            .await;
        assert_eq!(response.status(), 401);
    }
}

#[tokio::test]
async fn role_gates_follow_the_route_table() {
    let app = TestApp::new().await;
    let finance = app.login("finance").await;
    let sales = app.login("sales").await;
    let warehouse = app.login("warehouse").await;

    // Warehouse places no orders
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"customer_id": uuid::Uuid::new_v4(), "items": []})),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 403);

    // Sales sees no money
    for uri in ["/api/v1/invoices", "/api/v1/payments", "/api/v1/receivables"] {
        let response = app.request(Method::GET, uri, None, Some(&sales)).await;
        assert_eq!(response.status(), 403, "sales should be barred from {}", uri);
    }

    // Finance runs no user administration
    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&finance))
        .await;
    assert_eq!(response.status(), 403);

    // Warehouse owns the surat jalan desk, sales does not
    let response = app
        .request(Method::GET, "/api/v1/delivery-notes", None, Some(&warehouse))
        .await;
    assert_eq!(response.status(), 200);
    let response = app
        .request(Method::GET, "/api/v1/delivery-notes", None, Some(&sales))
        .await;
    assert_eq!(response.status(), 403);

    // Everyone reads the catalog
    for token in [&finance, &sales, &warehouse] {
        let response = app
            .request(Method::GET, "/api/v1/products", None, Some(token))
            .await;
        assert_eq!(response.status(), 200);
    }
}

#[tokio::test]
async fn write_only_gates_keep_reads_open() {
    let app = TestApp::new().await;
    let admin = app.login("admin").await;
    let finance = app.login("finance").await;
    let warehouse = app.login("warehouse").await;

    // Anyone may read the tax table, only admin and finance may change it
    let response = app
        .request(Method::GET, "/api/v1/taxes", None, Some(&warehouse))
        .await;
    assert_eq!(response.status(), 200);

    let tax_body = json!({"name": "PPN 11%", "rate": "0.11", "is_active": true});
    let response = app
        .request(
            Method::POST,
            "/api/v1/taxes",
            Some(tax_body.clone()),
            Some(&warehouse),
        )
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .request(Method::POST, "/api/v1/taxes", Some(tax_body), Some(&finance))
        .await;
    assert_eq!(response.status(), 201);

    // Company profile: admin-only writes
    let profile_body = json!({
        "name": "PT Niaga Sejahtera Abadi",
        "city": "Surabaya",
    });
    let response = app
        .request(
            Method::PUT,
            "/api/v1/company-profile",
            Some(profile_body.clone()),
            Some(&finance),
        )
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .request(
            Method::PUT,
            "/api/v1/company-profile",
            Some(profile_body),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["city"], "Surabaya");

    // Once configured, any authenticated role reads it
    let response = app
        .request(Method::GET, "/api/v1/company-profile", None, Some(&warehouse))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "PT Niaga Sejahtera Abadi");
}

#[tokio::test]
async fn admin_manages_users_end_to_end() {
    let app = TestApp::new().await;
    let admin = app.login("admin").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "siti",
                "password": "rahasia-siti-123",
                "full_name": "Siti Rahayu",
                "role": "SALES",
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    let user_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["role"], "SALES");
    assert!(body["data"].get("password_hash").is_none());

    // The new account can log in straight away
    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "siti", "password": "rahasia-siti-123"})),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    // Deactivating the account closes the door
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{}", user_id),
            Some(json!({"is_active": false})),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "siti", "password": "rahasia-siti-123"})),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);

    // Duplicate usernames are a conflict
    let response = app
        .request(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "siti",
                "password": "rahasia-ulang-123",
                "full_name": "Siti Kedua",
                "role": "SALES",
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), 409);
}
