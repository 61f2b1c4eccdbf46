use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use fatoura_api::app::services::AppServices;
use fatoura_auth::{JwtClaims, Role};
use fatoura_core::AccountId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = fatoura_api::app::build_app(
            Arc::new(AppServices::in_memory()),
            JWT_SECRET.to_string(),
        );
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

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: AccountId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn money(value: &Value) -> Decimal {
    value.as_str().expect("amounts serialize as strings").parse().unwrap()
}

fn admin_token() -> String {
    mint_jwt(AccountId::new(), vec![Role::admin()])
}

/// Provision an account through the back-office and return (id, owner token).
async fn provision(srv: &TestServer, client: &reqwest::Client, email: &str) -> (String, String) {
    let res = client
        .post(srv.url("/admin/accounts"))
        .bearer_auth(admin_token())
        .json(&json!({
            "name": "Yasmine Alaoui",
            "email": email,
            "companyName": "Atlas Conseil",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let account: Value = res.json().await.unwrap();
    let id = account["id"].as_str().unwrap().to_string();
    let token = mint_jwt(id.parse().unwrap(), vec![]);
    (id, token)
}

async fn create_client(srv: &TestServer, client: &reqwest::Client, token: &str) -> String {
    let res = client
        .post(srv.url("/clients"))
        .bearer_auth(token)
        .json(&json!({ "name": "Riad Menara", "ice": "001525489000088" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

fn invoice_body(number: &str, client_id: &str) -> Value {
    json!({
        "invoiceNumber": number,
        "clientId": client_id,
        "issueDate": "2026-03-01",
        "dueDate": "2026-03-31",
        "status": "sent",
        "items": [
            { "description": "Audit", "quantity": "2", "unitPrice": "100", "taxRatePercent": "20" },
            { "description": "Formation", "quantity": "1", "unitPrice": "50", "taxRatePercent": "0" }
        ]
    })
}

#[tokio::test]
async fn health_is_public_and_account_routes_require_auth() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let token = mint_jwt(AccountId::new(), vec![Role::new("owner")]);
    let res = client
        .get(srv.url("/admin/accounts"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn provisioned_account_sees_itself_with_initial_credits() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (id, token) = provision(&srv, &client, "yasmine@atlas.ma").await;

    let res = client.get(srv.url("/me")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["id"], id.as_str());
    assert_eq!(me["credits"], 5);
    assert_eq!(me["settings"]["name"], "Atlas Conseil");
}

#[tokio::test]
async fn account_holder_can_rename_themselves() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = provision(&srv, &client, "rename@atlas.ma").await;

    let res = client
        .patch(srv.url("/me"))
        .bearer_auth(&token)
        .json(&json!({ "name": "  Yasmine Alaoui Bennani " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let renamed: Value = res.json().await.unwrap();
    assert_eq!(renamed["name"], "Yasmine Alaoui Bennani");
    assert_eq!(renamed["credits"], 5);

    let me: Value = client
        .get(srv.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["name"], "Yasmine Alaoui Bennani");
    assert_eq!(me["settings"]["name"], "Atlas Conseil");

    let res = client
        .patch(srv.url("/me"))
        .bearer_auth(&token)
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn invoice_create_prices_server_side_and_consumes_a_credit() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = provision(&srv, &client, "owner@atlas.ma").await;
    let client_id = create_client(&srv, &client, &token).await;

    let mut body = invoice_body("INV-2026-001", &client_id);
    // Submitted totals are ignored.
    body["total"] = json!("1");

    let res = client
        .post(srv.url("/invoices"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let receipt: Value = res.json().await.unwrap();
    assert_eq!(receipt["charged"], true);
    assert_eq!(receipt["creditsRemaining"], 4);
    assert_eq!(money(&receipt["invoice"]["subTotal"]), Decimal::from(250));
    assert_eq!(money(&receipt["invoice"]["taxAmount"]), Decimal::from(40));
    assert_eq!(money(&receipt["invoice"]["total"]), Decimal::from(290));
    assert_eq!(receipt["invoice"]["editCount"], 0);

    // Same number again → 409, credits untouched.
    let res = client
        .post(srv.url("/invoices"))
        .bearer_auth(&token)
        .json(&invoice_body("INV-2026-001", &client_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "duplicate_invoice_number");

    let me: Value = client
        .get(srv.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["credits"], 4);
}

#[tokio::test]
async fn edits_are_free_once_then_charged_and_refused_at_zero_credits() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token();

    // Registration seeds exactly one credit.
    let res = client
        .put(srv.url("/admin/settings/general"))
        .bearer_auth(&admin)
        .json(&json!({
            "registration": { "allowRegistration": true, "initialCredits": 1 },
            "defaultInvoice": { "currency": "MAD", "taxRate": "20" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (account_id, token) = provision(&srv, &client, "edits@atlas.ma").await;
    let client_id = create_client(&srv, &client, &token).await;

    let res = client
        .post(srv.url("/invoices"))
        .bearer_auth(&token)
        .json(&invoice_body("INV-2026-001", &client_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let invoice_id = created["invoice"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["creditsRemaining"], 0);

    // First edit is free even at zero credits.
    let res = client
        .put(srv.url(&format!("/invoices/{invoice_id}")))
        .bearer_auth(&token)
        .json(&invoice_body("INV-2026-001", &client_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["charged"], false);
    assert_eq!(edited["invoice"]["editCount"], 1);

    // Second edit needs a credit.
    let res = client
        .put(srv.url(&format!("/invoices/{invoice_id}")))
        .bearer_auth(&token)
        .json(&invoice_body("INV-2026-001", &client_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "insufficient_credits");

    let res = client
        .post(srv.url(&format!("/admin/accounts/{account_id}/credits")))
        .bearer_auth(&admin)
        .json(&json!({ "amount": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(srv.url(&format!("/invoices/{invoice_id}")))
        .bearer_auth(&token)
        .json(&invoice_body("INV-2026-001", &client_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["charged"], true);
    assert_eq!(edited["creditsRemaining"], 1);
    assert_eq!(edited["invoice"]["editCount"], 2);
}

#[tokio::test]
async fn accounts_cannot_see_each_others_records() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, owner) = provision(&srv, &client, "a@atlas.ma").await;
    let (_, other) = provision(&srv, &client, "b@atlas.ma").await;
    let client_id = create_client(&srv, &client, &owner).await;

    let res = client
        .get(srv.url(&format!("/clients/{client_id}")))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Invoicing another account's client is a 404 too.
    let res = client
        .post(srv.url("/invoices"))
        .bearer_auth(&other)
        .json(&invoice_body("INV-2026-001", &client_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_ids_and_invalid_settings_are_422() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = provision(&srv, &client, "ids@atlas.ma").await;

    let res = client
        .get(srv.url("/invoices/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = client
        .patch(srv.url("/settings"))
        .bearer_auth(&token)
        .json(&json!({ "defaultTaxRate": "120" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "validation_error");
}

#[tokio::test]
async fn oversized_invoice_line_is_422_and_server_keeps_serving() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = provision(&srv, &client, "huge@atlas.ma").await;
    let client_id = create_client(&srv, &client, &token).await;

    let mut body = invoice_body("INV-HUGE", &client_id);
    body["items"][0]["quantity"] = json!("100000000000000000000");
    body["items"][0]["unitPrice"] = json!("100000000000000000000");
    let res = client
        .post(srv.url("/invoices"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = client.get(srv.url("/clients")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = client
        .get(srv.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["credits"], 5);
}

#[tokio::test]
async fn settings_patch_and_next_number() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = provision(&srv, &client, "num@atlas.ma").await;

    let res = client
        .patch(srv.url("/settings"))
        .bearer_auth(&token)
        .json(&json!({ "invoiceNumberPrefix": "FAC-" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let settings: Value = res.json().await.unwrap();
    assert_eq!(settings["invoiceNumberPrefix"], "FAC-");
    assert_eq!(settings["name"], "Atlas Conseil");

    let client_id = create_client(&srv, &client, &token).await;
    let res = client
        .post(srv.url("/invoices"))
        .bearer_auth(&token)
        .json(&invoice_body("FAC-001", &client_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let next: Value = client
        .get(srv.url("/invoices/next-number"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(next["invoiceNumber"], "FAC-002");
}

#[tokio::test]
async fn deleting_a_client_removes_its_invoices() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = provision(&srv, &client, "cascade@atlas.ma").await;
    let client_id = create_client(&srv, &client, &token).await;

    let res = client
        .post(srv.url("/invoices"))
        .bearer_auth(&token)
        .json(&invoice_body("INV-2026-001", &client_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .delete(srv.url(&format!("/clients/{client_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let data: Value = client
        .get(srv.url("/data/initial"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(data["clients"].as_array().unwrap().len(), 0);
    assert_eq!(data["invoices"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn reports_cover_tva_and_forecast() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = provision(&srv, &client, "reports@atlas.ma").await;
    let client_id = create_client(&srv, &client, &token).await;

    let due = (Utc::now().date_naive() + ChronoDuration::days(5)).to_string();
    let mut body = invoice_body("INV-2026-001", &client_id);
    body["dueDate"] = json!(due);
    let res = client
        .post(srv.url("/invoices"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let tva: Value = client
        .get(srv.url("/reports/tva?start=2026-03-01&end=2026-03-31"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(money(&tva["invoicedTax"]), Decimal::from(40));
    assert_eq!(money(&tva["collectedTax"]), Decimal::from(0));
    assert_eq!(tva["sales"].as_array().unwrap().len(), 1);

    let res = client
        .get(srv.url("/reports/tva?start=2026-04-01&end=2026-03-01"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let forecast: Value = client
        .get(srv.url("/reports/cash-flow?days=7"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let days = forecast["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(money(&days[5]["total"]), Decimal::from(290));
    assert_eq!(money(&days[0]["total"]), Decimal::from(0));
}

#[tokio::test]
async fn portal_is_public_and_shows_company_settings() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = provision(&srv, &client, "portal@atlas.ma").await;
    let client_id = create_client(&srv, &client, &token).await;

    let res = client
        .get(srv.url(&format!("/portal/clients/{client_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let portal: Value = res.json().await.unwrap();
    assert_eq!(portal["client"]["name"], "Riad Menara");
    assert_eq!(portal["settings"]["name"], "Atlas Conseil");
}
