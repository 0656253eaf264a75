use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::entity::sensor_data;
use crate::sync::event::{ChangeEvent, ChangeKind, SensorReading};

/// A normalized row of the `sensor_data` log.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRow {
    pub machine_id: String,
    pub current_weight: Option<f64>,
    pub gas_content_weight: Option<f64>,
    pub gas_leak_detected: i8,
    pub tare_weight: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl SensorRow {
    /// Build the row for a reading received at `processed_at`.
    #[must_use]
    pub fn from_reading(
        machine_id: &str,
        reading: &SensorReading,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            machine_id: machine_id.to_string(),
            current_weight: reading.current_weight,
            gas_content_weight: reading.gas_content_weight,
            gas_leak_detected: i8::from(reading.gas_leak_detected),
            tare_weight: reading.tare_weight,
            recorded_at: recorded_at(reading.timestamp, processed_at),
        }
    }
}

/// Convert a device timestamp (epoch seconds) to an instant.
///
/// Falls back to `processed_at` when the device sent no usable timestamp.
#[must_use]
pub fn recorded_at(timestamp: Option<f64>, processed_at: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .filter(|secs| secs.is_finite())
        .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0).round() as i64))
        .unwrap_or(processed_at)
}

/// Destination of synced rows.
pub trait SensorSink: Clone + Send + Sync + 'static {
    fn append(&self, row: SensorRow) -> impl Future<Output = Result<(), DbErr>> + Send;
}

impl SensorSink for Arc<DatabaseConnection> {
    fn append(&self, row: SensorRow) -> impl Future<Output = Result<(), DbErr>> + Send {
        let model = sensor_data::ActiveModel {
            sensor_id: sea_orm::ActiveValue::NotSet,
            machine_id: Set(row.machine_id),
            current_weight: Set(row.current_weight),
            gas_content_weight: Set(row.gas_content_weight),
            gas_leak_detected: Set(row.gas_leak_detected),
            tare_weight: Set(row.tare_weight),
            recorded_at: Set(row.recorded_at),
        };

        async move {
            sensor_data::Entity::insert(model).exec(self.as_ref()).await?;
            Ok(())
        }
    }
}

/// What happened to a single change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// `child_added`; nothing to do yet.
    Ignored,
    /// `child_changed` without `sensorData`.
    NoSensorData,
    Inserted,
    /// The insert failed and was logged. Never retried.
    Failed,
}

/// Map one event to a row and persist it.
///
/// Never returns an error: persistence failures are logged with the machine
/// id and the event counts as handled.
pub async fn handle_event<S: SensorSink>(
    sink: &S,
    event: ChangeEvent,
    processed_at: DateTime<Utc>,
) -> EventOutcome {
    match event.kind {
        ChangeKind::Added => {
            tracing::debug!(machine_id = %event.machine_id, "Machine added in Firebase");
            EventOutcome::Ignored
        }
        ChangeKind::Changed => {
            let Some(reading) = event.node.sensor_data else {
                tracing::debug!(machine_id = %event.machine_id, "No sensorData for machine");
                return EventOutcome::NoSensorData;
            };

            let row = SensorRow::from_reading(&event.machine_id, &reading, processed_at);
            let recorded_at = row.recorded_at;

            match sink.append(row).await {
                Ok(()) => {
                    tracing::info!(
                        machine_id = %event.machine_id,
                        recorded_at = %recorded_at.to_rfc3339(),
                        "Synced sensor data"
                    );
                    EventOutcome::Inserted
                }
                Err(e) => {
                    tracing::error!(
                        machine_id = %event.machine_id,
                        error = %e,
                        "Failed to sync sensor data"
                    );
                    EventOutcome::Failed
                }
            }
        }
    }
}

/// Drain the event channel, handling every event on its own task.
///
/// Inserts run concurrently; a panicking handler only loses its own event.
/// Returns once the channel is closed and in-flight events are done.
pub async fn run<S: SensorSink>(sink: S, mut events: mpsc::Receiver<ChangeEvent>) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else { break };
                let sink = sink.clone();
                in_flight.spawn(async move {
                    handle_event(&sink, event, Utc::now()).await;
                });
            }
            Some(result) = in_flight.join_next() => {
                if let Err(e) = result
                    && e.is_panic()
                {
                    tracing::error!(error = %e, "Sensor sync handler panicked");
                }
            }
        }
    }

    while let Some(result) = in_flight.join_next().await {
        if let Err(e) = result
            && e.is_panic()
        {
            tracing::error!(error = %e, "Sensor sync handler panicked");
        }
    }

    tracing::info!("Sensor sync worker stopped");
}
