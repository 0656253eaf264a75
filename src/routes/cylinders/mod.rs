mod handlers;
mod types;

pub use handlers::{create_cylinder, delete_cylinder, list_user_cylinders, update_cylinder};
pub use types::{CreateCylinderResponse, CylinderRequest, CylinderResponse};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_create_cylinder, __path_delete_cylinder, __path_list_user_cylinders,
    __path_update_cylinder,
};
