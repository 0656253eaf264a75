pub mod cylinders;
pub mod machines;
pub mod sensor_data;
pub mod users;
