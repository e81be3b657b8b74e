//! HTTP and WebSocket API

pub mod auth;
pub mod extractors;
pub mod routes;
pub mod server;
pub mod types;

pub use server::{ApiServer, ApiState};
