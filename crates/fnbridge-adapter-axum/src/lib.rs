//! Axum host for the application handler: a tower service for embedding,
//! and the standalone listener used when the process is the entry point.

mod request;
mod response;
mod server;
mod service;

pub use request::into_core_request;
pub use response::into_axum_response;
pub use server::{run_app, StandaloneConfig, StandaloneServer};
pub use service::BridgeService;
