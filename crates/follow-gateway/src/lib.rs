pub mod api;
pub mod server;

pub use api::{AppendRequest, LogResponse};
pub use server::{GatewayServer, DEFAULT_REQUEST_TIMEOUT};
