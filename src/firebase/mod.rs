//! Firebase Realtime Database access over the REST streaming API.

pub mod client;
pub mod models;
pub mod tree;

pub use client::FirebaseClient;
pub use models::{PathUpdate, ServerEvent, SseDecoder};
pub use tree::MachineTree;
