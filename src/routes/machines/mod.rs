mod handlers;
mod types;
mod usage;

pub use handlers::{create_machine, delete_machine, list_machines, list_user_machines, update_machine};
pub use types::{
    CreateMachineResponse, MachineRequest, MachineResponse, MachineSummary, MessageResponse,
    OwnerQuery,
};
pub use usage::{daily_usage, machine_usage, DailyUsage};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_create_machine, __path_delete_machine, __path_list_machines,
    __path_list_user_machines, __path_update_machine,
};
pub use usage::__path_machine_usage;
