//! End-to-end tests of the sensor sync worker.
//!
//! Run with: cargo test --test sync_listener_test

use chrono::{TimeZone, Utc};
use flameshield::sync::{self, ChangeEvent, ListenerState, SensorRow, SensorSink};
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult, Transaction};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Sink that records rows and fails for selected machine ids.
#[derive(Clone, Default)]
struct RecordingSink {
    rows: Arc<Mutex<Vec<SensorRow>>>,
    failing: Arc<Vec<String>>,
}

impl RecordingSink {
    fn failing_for(machine_ids: &[&str]) -> Self {
        Self {
            rows: Arc::default(),
            failing: Arc::new(machine_ids.iter().map(|id| (*id).to_string()).collect()),
        }
    }

    fn rows(&self) -> Vec<SensorRow> {
        self.rows.lock().unwrap().clone()
    }
}

impl SensorSink for RecordingSink {
    fn append(&self, row: SensorRow) -> impl Future<Output = Result<(), DbErr>> + Send {
        let sink = self.clone();
        async move {
            if sink.failing.contains(&row.machine_id) {
                return Err(DbErr::Custom("connection reset".to_string()));
            }
            sink.rows.lock().unwrap().push(row);
            Ok(())
        }
    }
}

fn sample_node() -> Value {
    json!({
        "name": "Kitchen",
        "sensorData": {
            "currentWeight": 14.2,
            "gasContentWeight": 3.1,
            "gasLeakDetected": true,
            "tareWeight": 11.1,
            "timestamp": 1_700_000_000
        }
    })
}

/// Statements the mock saw. The worker has dropped its clones once
/// `run_events` returns.
fn transaction_log(db: Arc<DatabaseConnection>) -> Vec<Transaction> {
    Arc::try_unwrap(db)
        .ok()
        .expect("connection still shared with the worker")
        .into_transaction_log()
}

async fn run_events<S: SensorSink>(sink: S, events: Vec<ChangeEvent>) {
    let (tx, rx) = mpsc::channel(16);
    let handle = sync::start_with_events(sink, rx);
    assert_eq!(handle.state(), ListenerState::Connected);

    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    handle.wait().await;
}

#[tokio::test]
async fn changed_machine_with_sensor_data_inserts_one_row() {
    let sink = RecordingSink::default();
    run_events(sink.clone(), vec![ChangeEvent::changed("7", &sample_node())]).await;

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.machine_id, "7");
    assert_eq!(row.current_weight, Some(14.2));
    assert_eq!(row.gas_content_weight, Some(3.1));
    assert_eq!(row.tare_weight, Some(11.1));
    assert_eq!(row.gas_leak_detected, 1);
    assert_eq!(
        row.recorded_at,
        Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()
    );
}

#[tokio::test]
async fn leak_flag_false_is_stored_as_zero() {
    let sink = RecordingSink::default();
    let node = json!({ "sensorData": { "currentWeight": "9.5", "gasLeakDetected": false } });
    run_events(sink.clone(), vec![ChangeEvent::changed("3", &node)]).await;

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].gas_leak_detected, 0);
    assert_eq!(rows[0].current_weight, Some(9.5));
}

#[tokio::test]
async fn missing_timestamp_uses_processing_time() {
    let sink = RecordingSink::default();
    let before = Utc::now();
    run_events(
        sink.clone(),
        vec![ChangeEvent::changed("3", &json!({ "sensorData": { "currentWeight": 9.5 } }))],
    )
    .await;
    let after = Utc::now();

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].recorded_at >= before && rows[0].recorded_at <= after);
}

#[tokio::test]
async fn node_without_sensor_data_inserts_nothing() {
    let sink = RecordingSink::default();
    run_events(
        sink.clone(),
        vec![
            ChangeEvent::changed("7", &json!({ "name": "Kitchen" })),
            ChangeEvent::changed("8", &json!({ "sensorData": null })),
        ],
    )
    .await;

    assert!(sink.rows().is_empty());
}

#[tokio::test]
async fn added_machines_are_not_synced() {
    let sink = RecordingSink::default();
    run_events(sink.clone(), vec![ChangeEvent::added("7", &sample_node())]).await;

    assert!(sink.rows().is_empty());
}

#[tokio::test]
async fn insert_failure_does_not_block_later_events() {
    let sink = RecordingSink::failing_for(&["1"]);
    run_events(
        sink.clone(),
        vec![
            ChangeEvent::changed("1", &sample_node()),
            ChangeEvent::changed("2", &sample_node()),
            ChangeEvent::changed("1", &sample_node()),
            ChangeEvent::changed("3", &sample_node()),
        ],
    )
    .await;

    let mut machine_ids: Vec<String> = sink.rows().into_iter().map(|r| r.machine_id).collect();
    machine_ids.sort();
    assert_eq!(machine_ids, vec!["2".to_string(), "3".to_string()]);
}

#[tokio::test]
async fn stop_reports_stopped_state() {
    let (_tx, rx) = mpsc::channel::<ChangeEvent>(1);
    let handle = sync::start_with_events(RecordingSink::default(), rx);
    let status = handle.status();

    handle.stop().await;

    assert_eq!(*status.borrow(), ListenerState::Stopped);
}

#[tokio::test]
async fn database_sink_issues_one_insert() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_exec_results([MockExecResult {
            last_insert_id: 1,
            rows_affected: 1,
        }])
        .into_connection();
    let db = Arc::new(db);

    run_events(db.clone(), vec![ChangeEvent::changed("7", &sample_node())]).await;

    let recorded_at = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
    assert_eq!(
        transaction_log(db),
        [Transaction::from_sql_and_values(
            DatabaseBackend::MySql,
            "INSERT INTO `sensor_data` (`machine_id`, `current_weight`, `gas_content_weight`, `gas_leak_detected`, `tare_weight`, `recorded_at`) VALUES (?, ?, ?, ?, ?, ?)",
            [
                "7".into(),
                14.2_f64.into(),
                3.1_f64.into(),
                1_i8.into(),
                11.1_f64.into(),
                recorded_at.into(),
            ]
        )]
    );
}

#[tokio::test]
async fn database_errors_are_swallowed() {
    // No exec results queued: the mock insert fails.
    let db = Arc::new(MockDatabase::new(DatabaseBackend::MySql).into_connection());

    run_events(db.clone(), vec![ChangeEvent::changed("7", &sample_node())]).await;

    assert_eq!(transaction_log(db).len(), 1);
}
