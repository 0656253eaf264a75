use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::sensor_data;

pub const MAX_READINGS_LIMIT: u64 = 5000;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReadingsQuery {
    /// Maximum number of rows, newest first (at most 5000). Every row when absent.
    pub limit: Option<u64>,
}

impl ReadingsQuery {
    #[must_use]
    pub fn effective_limit(&self) -> Option<u64> {
        self.limit.map(|limit| limit.clamp(1, MAX_READINGS_LIMIT))
    }
}

/// One synced reading. `gas_leak_detected` stays the stored 0/1 flag.
#[derive(Debug, Serialize, ToSchema)]
pub struct SensorRowResponse {
    pub sensor_id: i64,
    pub machine_id: String,
    pub current_weight: Option<f64>,
    pub gas_content_weight: Option<f64>,
    pub gas_leak_detected: i8,
    pub tare_weight: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl From<sensor_data::Model> for SensorRowResponse {
    fn from(row: sensor_data::Model) -> Self {
        Self {
            sensor_id: row.sensor_id,
            machine_id: row.machine_id,
            current_weight: row.current_weight,
            gas_content_weight: row.gas_content_weight,
            gas_leak_detected: row.gas_leak_detected,
            tare_weight: row.tare_weight,
            recorded_at: row.recorded_at,
        }
    }
}
