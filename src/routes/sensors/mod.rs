mod handlers;
mod types;

pub use handlers::{list_user_machines, machine_readings};
pub use types::{ReadingsQuery, SensorRowResponse, MAX_READINGS_LIMIT};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_list_user_machines, __path_machine_readings};
