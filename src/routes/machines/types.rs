use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::entity::machines;

/// Create/update body. `user_id` may be a number or a numeric string.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MachineRequest {
    #[schema(value_type = Option<i32>)]
    pub user_id: Option<Value>,
    pub machine_name: Option<String>,
    pub serial_number: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OwnerQuery {
    /// Id of the user performing the request
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MachineSummary {
    pub machine_id: i32,
    pub machine_name: String,
}

impl From<machines::Model> for MachineSummary {
    fn from(m: machines::Model) -> Self {
        Self {
            machine_id: m.machine_id,
            machine_name: m.machine_name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MachineResponse {
    pub machine_id: i32,
    pub user_id: i32,
    pub machine_name: String,
    pub serial_number: Option<String>,
    pub location: Option<String>,
}

impl From<machines::Model> for MachineResponse {
    fn from(m: machines::Model) -> Self {
        Self {
            machine_id: m.machine_id,
            user_id: m.user_id,
            machine_name: m.machine_name,
            serial_number: m.serial_number,
            location: m.location,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateMachineResponse {
    pub message: String,
    pub machine_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
