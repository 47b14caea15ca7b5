use chrono::{Duration as ChronoDuration, Utc};
use fixtrack_auth::{JwtClaims, UserRole};
use fixtrack_core::UserId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = fixtrack_api::app::build_app(jwt_secret.to_string()).await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, role: UserRole) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        email: format!("{role}@example.com").to_lowercase(),
        role,
        iat: now,
        exp: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Seed a customer, device, ticket, and part; returns (ticket id, part id).
async fn seed_ticket_and_part(
    client: &reqwest::Client,
    base_url: &str,
    manager_token: &str,
    stock: i64,
) -> (String, String) {
    let res = client
        .post(format!("{}/customers", base_url))
        .json(&json!({
            "email": format!("{}@example.com", uuid::Uuid::now_v7()),
            "password": "hunter22",
            "name": "Jane Doe",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let customer: serde_json::Value = res.json().await.unwrap();
    let customer_id = customer["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/devices", base_url))
        .bearer_auth(manager_token)
        .json(&json!({
            "brand": "Apple",
            "model": "iPhone 13",
            "serialNumber": format!("SN-{}", uuid::Uuid::now_v7()),
            "customerId": customer_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let device: serde_json::Value = res.json().await.unwrap();

    let res = client
        .post(format!("{}/tickets", base_url))
        .bearer_auth(manager_token)
        .json(&json!({
            "deviceId": device["id"],
            "issueDescription": "Cracked screen",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let ticket: serde_json::Value = res.json().await.unwrap();

    let res = client
        .post(format!("{}/parts", base_url))
        .bearer_auth(manager_token)
        .json(&json!({
            "name": "iPhone 13 screen",
            "sku": format!("SCR-{}", uuid::Uuid::now_v7()),
            "stockQuantity": stock,
            "price": 129.99,
            "cost": 80.0,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let part: serde_json::Value = res.json().await.unwrap();

    (
        ticket["id"].as_str().unwrap().to_string(),
        part["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn("test-secret").await;

    let res = reqwest::Client::new()
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn("test-secret").await;

    let client = reqwest::Client::new();
    for path in ["/tickets", "/parts", "/ticket-parts"] {
        let res = client
            .get(format!("{}{}", srv.base_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "path {path}");
    }
}

#[tokio::test]
async fn customer_can_register_and_login() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/customers", srv.base_url))
        .json(&json!({
            "email": "jane@example.com",
            "password": "hunter22",
            "name": "Jane Doe",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["role"], "CUSTOMER");
    assert!(created.get("passwordHash").is_none());

    // Wrong password is rejected.
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "jane@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "jane@example.com", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let token = body["accessToken"].as_str().unwrap();
    assert_eq!(body["user"]["email"], "jane@example.com");

    // The issued token works against protected reads.
    let res = client
        .get(format!("{}/tickets", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn customers_cannot_manage_inventory() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let client = reqwest::Client::new();

    let customer_token = mint_jwt(jwt_secret, UserRole::Customer);

    let res = client
        .post(format!("{}/parts", srv.base_url))
        .bearer_auth(&customer_token)
        .json(&json!({ "name": "Battery", "stockQuantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(format!("{}/ticket-parts", srv.base_url))
        .bearer_auth(&customer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn attach_detach_lifecycle() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let client = reqwest::Client::new();

    let manager = mint_jwt(jwt_secret, UserRole::Manager);
    let (ticket_id, part_id) =
        seed_ticket_and_part(&client, &srv.base_url, &manager, 10).await;

    // Attach 4: stock 10 -> 6.
    let res = client
        .post(format!("{}/ticket-parts", srv.base_url))
        .bearer_auth(&manager)
        .json(&json!({ "ticketId": ticket_id, "partId": part_id, "quantity": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let first: serde_json::Value = res.json().await.unwrap();
    assert_eq!(first["quantity"], 4);
    assert_eq!(first["part"]["stockQuantity"], 6);
    assert_eq!(first["ticket"]["issueDescription"], "Cracked screen");

    // Attach 3 more: same row grows, no second row.
    let res = client
        .post(format!("{}/ticket-parts", srv.base_url))
        .bearer_auth(&manager)
        .json(&json!({ "ticketId": ticket_id, "partId": part_id, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let second: serde_json::Value = res.json().await.unwrap();
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["quantity"], 7);
    assert_eq!(second["part"]["stockQuantity"], 3);

    // Over-requesting fails and changes nothing.
    let res = client
        .post(format!("{}/ticket-parts", srv.base_url))
        .bearer_auth(&manager)
        .json(&json!({ "ticketId": ticket_id, "partId": part_id, "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "insufficient_stock");
    assert_eq!(err["message"], "Insufficient stock. Available: 3, Requested: 5");

    let res = client
        .get(format!("{}/parts/{}", srv.base_url, part_id))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    let part: serde_json::Value = res.json().await.unwrap();
    assert_eq!(part["stockQuantity"], 3);

    // Ticket-scoped listing carries the part join but no ticket summary.
    let res = client
        .get(format!("{}/ticket-parts/ticket/{}", srv.base_url, ticket_id))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rows: serde_json::Value = res.json().await.unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["quantity"], 7);
    assert!(rows[0].get("part").is_some());
    assert!(rows[0].get("ticket").is_none());

    // Detach restores the full reserved quantity.
    let row_id = first["id"].as_str().unwrap();
    let res = client
        .delete(format!("{}/ticket-parts/{}", srv.base_url, row_id))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/parts/{}", srv.base_url, part_id))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    let part: serde_json::Value = res.json().await.unwrap();
    assert_eq!(part["stockQuantity"], 10);

    // The row is gone; a second detach is a 404.
    let res = client
        .delete(format!("{}/ticket-parts/{}", srv.base_url, row_id))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attach_rejects_unknown_references_and_bad_ids() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let client = reqwest::Client::new();

    let manager = mint_jwt(jwt_secret, UserRole::Manager);
    let (ticket_id, part_id) =
        seed_ticket_and_part(&client, &srv.base_url, &manager, 10).await;

    let res = client
        .post(format!("{}/ticket-parts", srv.base_url))
        .bearer_auth(&manager)
        .json(&json!({
            "ticketId": uuid::Uuid::now_v7(),
            "partId": part_id,
            "quantity": 1,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/ticket-parts", srv.base_url))
        .bearer_auth(&manager)
        .json(&json!({
            "ticketId": ticket_id,
            "partId": uuid::Uuid::now_v7(),
            "quantity": 1,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Failed attaches must not consume stock.
    let res = client
        .get(format!("{}/parts/{}", srv.base_url, part_id))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    let part: serde_json::Value = res.json().await.unwrap();
    assert_eq!(part["stockQuantity"], 10);

    let res = client
        .get(format!("{}/ticket-parts/not-a-uuid", srv.base_url))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quantity_must_be_positive() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let client = reqwest::Client::new();

    let manager = mint_jwt(jwt_secret, UserRole::Manager);
    let (ticket_id, part_id) =
        seed_ticket_and_part(&client, &srv.base_url, &manager, 10).await;

    let res = client
        .post(format!("{}/ticket-parts", srv.base_url))
        .bearer_auth(&manager)
        .json(&json!({ "ticketId": ticket_id, "partId": part_id, "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "validation_error");
}
