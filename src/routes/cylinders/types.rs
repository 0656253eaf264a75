use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::entity::{cylinders, machines};

/// Create/update body. Ids and weight may be numbers or numeric strings;
/// `replaced_date` may be `YYYY-MM-DD`, an ISO datetime or epoch millis.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CylinderRequest {
    #[schema(value_type = Option<i32>)]
    pub user_id: Option<Value>,
    #[schema(value_type = Option<i32>)]
    pub machine_id: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub gas_weight: Option<Value>,
    #[schema(value_type = Option<String>, example = "2024-03-09")]
    pub replaced_date: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CylinderResponse {
    pub cylinder_id: i32,
    pub machine_id: i32,
    pub machine_name: Option<String>,
    pub gas_weight: f64,
    pub replaced_date: NaiveDate,
}

impl CylinderResponse {
    pub fn new(cylinder: cylinders::Model, machine: Option<machines::Model>) -> Self {
        Self {
            cylinder_id: cylinder.cylinder_id,
            machine_id: cylinder.machine_id,
            machine_name: machine.map(|m| m.machine_name),
            gas_weight: cylinder.gas_weight,
            replaced_date: cylinder.replaced_date,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateCylinderResponse {
    pub message: String,
    pub cylinder_id: i32,
}
