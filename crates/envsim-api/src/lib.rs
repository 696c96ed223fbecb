// envsim-api: Async Rust client for the environment simulation HTTP API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::GatewayClient;
pub use error::Error;
pub use models::FanStatus;
pub use transport::{TlsMode, TransportConfig};
