mod handlers;
mod types;
mod validation;

pub use handlers::{login, register};
pub use types::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
pub use validation::{is_valid_password, PASSWORD_RULES};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_login, __path_register};
