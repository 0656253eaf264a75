//! FlameShield - LPG cylinder monitoring API
//!
//! REST endpoints for users, machines and cylinders, plus the listener that
//! mirrors Firebase sensor readings into the relational store.

pub mod common;
pub mod config;
pub mod entity;
pub mod error;
pub mod firebase;
pub mod routes;
pub mod sync;
