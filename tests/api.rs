// HTTP contract tests: drive the router in-process with tower's oneshot

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use finfit::api::{router, AppState};
use finfit::{load_store, open_database, DebtStatus, EntityStore};

fn seeded_app() -> Router {
    router(Arc::new(AppState::in_memory(EntityStore::seeded())))
}

fn empty_app() -> Router {
    router(Arc::new(AppState::in_memory(EntityStore::new())))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_raw(app: &Router, method: &str, uri: &str, body: &str) -> StatusCode {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_create_client_and_debt_updates_statistics() {
    let app = seeded_app();

    let (status, before) = send(&app, "GET", "/statistics/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["total_debt_amount"], json!(5000.0));

    let (status, client) = send(
        &app,
        "POST",
        "/clients/",
        Some(json!({"name": "A", "email": "a@x.com", "phone": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(client["id"], json!(2));

    let (status, debt) = send(
        &app,
        "POST",
        "/debts/",
        Some(json!({"client_id": 2, "creditor": "Energy Co", "amount": 100.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(debt["status"], json!("active"));

    let (_, after) = send(&app, "GET", "/statistics/", None).await;
    assert_eq!(after["total_clients"], json!(2));
    assert_eq!(after["total_debts"], json!(2));
    assert_eq!(after["total_debt_amount"], json!(5100.0));
    assert_eq!(after["average_debt_amount"], json!(2550.0));
    assert_eq!(after["status_breakdown"]["active"], json!(2));
}

#[tokio::test]
async fn test_created_client_can_be_fetched() {
    let app = seeded_app();

    let (_, created) = send(
        &app,
        "POST",
        "/clients",
        Some(json!({
            "name": "Jane Roe",
            "email": "jane@example.com",
            "phone": "0611111111",
            "city": "Utrecht",
            "budget": {"income_items": [{"category": "income", "description": "salary", "amount": 1800.0, "frequency": "monthly"}]}
        })),
    )
    .await;
    let id = created["id"].as_u64().unwrap();

    let (status, fetched) = send(&app, "GET", &format!("/clients/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(created, fetched);
}

#[tokio::test]
async fn test_missing_entities_return_404() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/clients/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("not found"));

    assert_eq!(send(&app, "GET", "/debts/99", None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(send(&app, "DELETE", "/clients/99", None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&app, "GET", "/clients/99/debts/", None).await.0,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&app, "GET", "/debts/99/payments/", None).await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_debt_for_unknown_client_rejected() {
    let app = seeded_app();

    let (status, _) = send(
        &app,
        "POST",
        "/debts/",
        Some(json!({"client_id": 42, "creditor": "Bank", "amount": 10.0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "PUT", "/debts/1", Some(json!({"client_id": 42}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, stats) = send(&app, "GET", "/statistics/", None).await;
    assert_eq!(stats["total_debts"], json!(1));
}

#[tokio::test]
async fn test_status_update_validates_enum() {
    let app = seeded_app();

    let (status, body) = send(&app, "PUT", "/debts/1/status/?status=shredded", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("active"));

    let (status, body) = send(&app, "PUT", "/debts/1/status/?status=paid", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["debt_id"], json!(1));

    let (_, debt) = send(&app, "GET", "/debts/1", None).await;
    assert_eq!(debt["status"], json!("paid"));

    let (status, _) = send(&app, "PUT", "/debts/1/status", Some(json!({"status": "legal"}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, debt) = send(&app, "GET", "/debts/1", None).await;
    assert_eq!(debt["status"], json!("legal"));

    let (status, _) = send(&app, "PUT", "/debts/1/status/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "PUT", "/debts/9/status/?status=paid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_payment_lifecycle() {
    let app = seeded_app();

    let (status, added) = send(
        &app,
        "POST",
        "/debts/1/payments/",
        Some(json!({"payment_date": "2025-02-15", "amount": 150.0, "payment_method": "bank"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["payment"]["is_confirmed"], json!(false));

    let (_, payments) = send(&app, "GET", "/debts/1/payments/", None).await;
    assert_eq!(payments.as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "DELETE", "/debts/1/payments/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", "/debts/1/payments/-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, removed) = send(&app, "DELETE", "/debts/1/payments/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["payment"]["payment_date"], json!("2025-02-15"));

    let (_, payments) = send(&app, "GET", "/debts/1/payments", None).await;
    assert_eq!(payments.as_array().unwrap().len(), 1);
    assert_eq!(payments[0]["payment_date"], json!("2025-01-15"));
}

#[tokio::test]
async fn test_contact_updates_client_last_contact_date() {
    let app = seeded_app();

    let (status, _) = send(
        &app,
        "POST",
        "/debts/1/contacts/",
        Some(json!({"date": "2025-03-01", "contact_type": "email", "notes": "Sent overview"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, client) = send(&app, "GET", "/clients/1", None).await;
    assert_eq!(client["last_contact_date"], json!("2025-03-01"));

    let (status, removed) = send(&app, "DELETE", "/debts/1/contacts/0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["contact"]["contact_type"], json!("phone"));

    let (status, _) = send(&app, "DELETE", "/debts/1/contacts/3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_client_update() {
    let app = seeded_app();

    let (status, updated) = send(&app, "PUT", "/clients/1", Some(json!({"city": "Rotterdam"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["city"], json!("Rotterdam"));
    assert_eq!(updated["name"], json!("John Doe"));
    assert_eq!(updated["email"], json!("john@example.com"));
}

#[tokio::test]
async fn test_empty_store_statistics() {
    let app = empty_app();

    let (status, stats) = send(&app, "GET", "/statistics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_debts"], json!(0));
    assert_eq!(stats["average_debt_amount"], json!(0.0));
    assert_eq!(stats["recent_payments"], json!([]));
}

#[tokio::test]
async fn test_invalid_input_returns_400() {
    let app = seeded_app();

    assert_eq!(send_raw(&app, "POST", "/clients/", "{not json").await, StatusCode::BAD_REQUEST);
    assert_eq!(
        send_raw(&app, "POST", "/clients/", r#"{"name": "No email"}"#).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        send_raw(&app, "POST", "/clients/", r#"{"name": " ", "email": "e", "phone": "1"}"#).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        send_raw(
            &app,
            "POST",
            "/debts/",
            r#"{"client_id": 1, "creditor": "Bank", "amount": -5}"#
        )
        .await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        send_raw(
            &app,
            "POST",
            "/debts/",
            r#"{"client_id": 1, "creditor": "Bank", "amount": 5, "status": "shredded"}"#
        )
        .await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(send(&app, "GET", "/clients/abc", None).await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_client_notes_and_budget_summary() {
    let app = seeded_app();

    let (status, client) = send(&app, "POST", "/clients/1/notes", Some(json!({"note": "Called back"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(client["notes"].as_str().unwrap().ends_with("Called back"));

    let (status, summary) = send(&app, "GET", "/clients/1/budget/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["monthly_income"], json!(2100.0));
    assert_eq!(summary["monthly_expenses"], json!(850.0));
    assert_eq!(summary["monthly_balance"], json!(1250.0));
}

#[tokio::test]
async fn test_deleting_client_keeps_debts() {
    let app = seeded_app();

    let (status, body) = send(&app, "DELETE", "/clients/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Client deleted"));

    let (status, _) = send(&app, "GET", "/debts/1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, stats) = send(&app, "GET", "/statistics/", None).await;
    assert_eq!(stats["recent_payments"][0]["client_name"], Value::Null);
}

#[tokio::test]
async fn test_database_backed_state_persists_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finfit.db");

    let app = router(Arc::new(
        AppState::with_database(open_database(&path).unwrap(), true).unwrap(),
    ));
    let (status, client) = send(
        &app,
        "POST",
        "/clients/",
        Some(json!({"name": "B", "email": "b@x.com", "phone": "2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(client["id"], json!(2));

    let (status, _) = send(&app, "DELETE", "/clients/2", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "PUT", "/debts/1/status?status=paid", None).await;
    assert_eq!(status, StatusCode::OK);
    drop(app);

    let reloaded = load_store(&open_database(&path).unwrap()).unwrap();
    let names: Vec<String> = reloaded.clients().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["John Doe".to_string()]);
    assert_eq!(reloaded.get_debt(1).unwrap().status, DebtStatus::Paid);
    assert_eq!(reloaded.next_ids(), (3, 2));

    // A restarted server keeps counting from the persisted counters
    let app = router(Arc::new(
        AppState::with_database(open_database(&path).unwrap(), true).unwrap(),
    ));
    let (_, client) = send(
        &app,
        "POST",
        "/clients/",
        Some(json!({"name": "C", "email": "c@x.com", "phone": "3"})),
    )
    .await;
    assert_eq!(client["id"], json!(3));
}

#[tokio::test]
async fn test_out_of_range_path_integers_are_not_found() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/clients/-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("not found"));

    let (status, _) = send(&app, "GET", "/debts/18446744073709551616", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/debts/1/payments/99999999999999999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/debts/-3/contacts/0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/clients/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", "/debts/1/payments/first", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trailing_slash_and_unknown_routes() {
    let app = seeded_app();

    let (status, debt) = send(&app, "GET", "/debts/1/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(debt["id"], json!(1));

    let (status, body) = send(&app, "GET", "/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], json!("no route for /nowhere"));
}

#[tokio::test]
async fn test_debt_update_replaces_history_when_given() {
    let app = seeded_app();

    let (status, debt) = send(&app, "PUT", "/debts/1", Some(json!({"payment_history": []}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(debt["payment_history"], json!([]));

    let (_, payments) = send(&app, "GET", "/debts/1/payments/", None).await;
    assert_eq!(payments, json!([]));
}
