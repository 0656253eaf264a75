//! REST routes driven against a mocked MySQL connection.
//!
//! Run with: cargo test --test api_test

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use flameshield::common::AppState;
use flameshield::config::{Config, Deployment};
use flameshield::entity::{cylinders, machines, sensor_data, users};
use flameshield::routes::build_router;
use flameshield::sync::ListenerState;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Transaction};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_test::assert_ok;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        database_url: "mysql://localhost/flameshield".to_string(),
        run_migrations: false,
        firebase_database_url: "https://flameshield-test.firebaseio.com".to_string(),
        firebase_auth_token: None,
        firebase_machines_path: "machines".to_string(),
        firebase_reconnect_delay_seconds: 5,
        firebase_idle_timeout_seconds: 90,
        sync_event_buffer: 16,
        api_host: "127.0.0.1".to_string(),
        api_port: 5000,
        disable_rate_limiting: true,
        rate_limit_per_second: 10,
        rate_limit_burst: 60,
        trust_proxy_headers: false,
        deployment: Deployment::Local,
    }
}

trait IntoConnectionArc {
    fn into_connection_arc(self) -> Arc<DatabaseConnection>;
}

impl IntoConnectionArc for MockDatabase {
    fn into_connection_arc(self) -> Arc<DatabaseConnection> {
        Arc::new(self.into_connection())
    }
}

fn app(db: &Arc<DatabaseConnection>) -> Router {
    let (_status_tx, status_rx) = watch::channel(ListenerState::Connected);
    build_router(AppState::new(db.clone(), test_config(), status_rx))
}

/// Statements the mock saw. Call once the router has been consumed.
fn transaction_log(db: Arc<DatabaseConnection>) -> Vec<Transaction> {
    Arc::try_unwrap(db)
        .ok()
        .expect("connection still shared with a router")
        .into_transaction_log()
}

fn machine(machine_id: i32, user_id: i32) -> machines::Model {
    machines::Model {
        machine_id,
        user_id,
        machine_name: "Kitchen stove".to_string(),
        serial_number: Some("FS-001".to_string()),
        location: None,
        created_at: None,
    }
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = assert_ok!(to_bytes(response.into_body(), usize::MAX).await);
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn healthz_reports_sync_state() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();

    let (status, body) = send(app(&db), Method::GET, "/healthz", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "sync": "connected" }));
}

#[tokio::test]
async fn register_rejects_weak_passwords_without_writing() {
    for password in ["password", "pass word1!"] {
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();

        let (status, body) = send(
            app(&db),
            Method::POST,
            "/api/users/register",
            Some(json!({
                "name": "Asha",
                "email": "asha@example.com",
                "phone_no": "0771234567",
                "address": "12 Lake Rd",
                "password": password,
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "password {password:?}");
        assert!(body["error"].as_str().unwrap().contains("8 characters"));
        assert!(transaction_log(db).is_empty());
    }
}

#[tokio::test]
async fn register_requires_every_field() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();

    let (status, body) = send(
        app(&db),
        Method::POST,
        "/api/users/register",
        Some(json!({ "name": "Asha", "password": "secret12!" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "All fields are required." }));
}

#[tokio::test]
async fn register_returns_new_user_id() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_exec_results([MockExecResult {
            last_insert_id: 42,
            rows_affected: 1,
        }])
        .into_connection_arc();

    let (status, body) = send(
        app(&db),
        Method::POST,
        "/api/users/register",
        Some(json!({
            "name": "Asha",
            "email": "asha@example.com",
            "phone_no": "0771234567",
            "address": "12 Lake Rd",
            "password": "secret12!",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["userId"], json!(42));
    assert_eq!(transaction_log(db).len(), 1);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<users::Model>::new()])
        .into_connection_arc();

    let (status, body) = send(
        app(&db),
        Method::POST,
        "/api/users/login",
        Some(json!({ "phone_no": "0771234567", "password": "nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid phone number or password." }));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(&db).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_machine_needs_numeric_user_id() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();

    let (status, body) = send(
        app(&db),
        Method::POST,
        "/api/machines",
        Some(json!({ "user_id": "abc", "machine_name": "Stove" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid or missing user_id" }));
    assert!(transaction_log(db).is_empty());
}

#[tokio::test]
async fn create_machine_accepts_string_user_id() {
    let owner = users::Model {
        user_id: 3,
        name: "Asha".to_string(),
        email: "asha@example.com".to_string(),
        phone_no: "0771234567".to_string(),
        address: "12 Lake Rd".to_string(),
        password: "secret12!".to_string(),
        created_at: None,
    };
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![owner]])
        .append_exec_results([MockExecResult {
            last_insert_id: 5,
            rows_affected: 1,
        }])
        .into_connection_arc();

    let (status, body) = send(
        app(&db),
        Method::POST,
        "/api/machines",
        Some(json!({ "user_id": "3", "machine_name": "Kitchen stove" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({ "message": "Machine added successfully", "machine_id": 5 })
    );
}

#[tokio::test]
async fn delete_machine_of_another_user_is_forbidden() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![machine(5, 3)]])
        .into_connection_arc();

    let (status, body) = send(app(&db), Method::DELETE, "/api/machines/5?user_id=9", None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({ "error": "Unauthorized: You do not own this machine" })
    );
    // Only the ownership lookup ran.
    assert_eq!(transaction_log(db).len(), 1);
}

#[tokio::test]
async fn delete_machine_with_cylinder_is_a_conflict() {
    let cylinder = cylinders::Model {
        cylinder_id: 11,
        machine_id: 5,
        gas_weight: 12.5,
        replaced_date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
    };
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![machine(5, 3)]])
        .append_query_results([vec![cylinder]])
        .into_connection_arc();

    let (status, _) = send(app(&db), Method::DELETE, "/api/machines/5?user_id=3", None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(transaction_log(db).len(), 2);
}

#[tokio::test]
async fn delete_unknown_machine_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<machines::Model>::new()])
        .into_connection_arc();

    let (status, _) = send(app(&db), Method::DELETE, "/api/machines/5?user_id=3", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_machine_without_user_is_a_bad_request() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();

    let (status, body) = send(app(&db), Method::DELETE, "/api/machines/5", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Missing or invalid user_id or machine_id" })
    );
}

#[tokio::test]
async fn cylinder_on_occupied_machine_is_a_conflict() {
    let existing = cylinders::Model {
        cylinder_id: 11,
        machine_id: 5,
        gas_weight: 12.5,
        replaced_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
    };
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![machine(5, 3)]])
        .append_query_results([vec![existing]])
        .into_connection_arc();

    let (status, _) = send(
        app(&db),
        Method::POST,
        "/api/cylinders",
        Some(json!({
            "user_id": 3,
            "machine_id": "5",
            "gas_weight": 12.5,
            "replaced_date": "2024-03-09",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(transaction_log(db).len(), 2);
}

#[tokio::test]
async fn cylinder_with_bad_date_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();

    let (status, body) = send(
        app(&db),
        Method::POST,
        "/api/cylinders",
        Some(json!({
            "user_id": 3,
            "machine_id": 5,
            "gas_weight": 12.5,
            "replaced_date": "next tuesday",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid replaced_date format." }));
}

#[tokio::test]
async fn delete_cylinder_requires_user_id() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();

    let (status, body) = send(app(&db), Method::DELETE, "/api/cylinders/11", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "User ID is required." }));
}

#[tokio::test]
async fn readings_without_limit_return_every_row() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<sensor_data::Model>::new()])
        .into_connection_arc();

    let (status, body) = send(app(&db), Method::GET, "/api/sensors/sensor/7", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    let log = format!("{:?}", transaction_log(db));
    assert!(!log.contains("LIMIT"), "{log}");
}

#[tokio::test]
async fn readings_limit_is_applied_when_given() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<sensor_data::Model>::new()])
        .into_connection_arc();

    let (status, _) = send(app(&db), Method::GET, "/api/sensors/sensor/7?limit=2", None).await;

    assert_eq!(status, StatusCode::OK);
    let log = format!("{:?}", transaction_log(db));
    assert!(log.contains("LIMIT"), "{log}");
}

#[tokio::test]
async fn usage_matches_the_device_key_verbatim() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<BTreeMap<&str, sea_orm::Value>>::new()])
        .into_connection_arc();

    let (status, body) = send(app(&db), Method::GET, "/api/machines/007/usage", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(
        transaction_log(db),
        vec![Transaction::from_sql_and_values(
            DatabaseBackend::MySql,
            "SELECT DATE(recorded_at) AS day, MAX(current_weight) - MIN(current_weight) AS used \
             FROM sensor_data WHERE machine_id = ? \
             GROUP BY DATE(recorded_at) ORDER BY day DESC LIMIT 30",
            ["007".into()],
        )]
    );
}

#[tokio::test]
async fn usage_with_blank_key_is_a_bad_request() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection_arc();

    let (status, body) = send(app(&db), Method::GET, "/api/machines/%20/usage", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid or missing machine_id" }));
    assert!(transaction_log(db).is_empty());
}
