use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only log of readings mirrored from Firebase.
///
/// `machine_id` is the Firebase node key and is not a foreign key: devices may
/// report under keys that were never registered through the API.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sensor_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub sensor_id: i64,
    pub machine_id: String,
    pub current_weight: Option<f64>,
    pub gas_content_weight: Option<f64>,
    pub gas_leak_detected: i8,
    pub tare_weight: Option<f64>,
    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
