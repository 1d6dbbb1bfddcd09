pub mod config;
pub mod routes;

pub use config::GatewayConfig;
pub use routes::{AppState, build_router};
