use std::env;

pub use common::Environment;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub listen_addr: String,
    pub static_dir: String,
    pub otel_endpoint: Option<String>,
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string());

        let otel_endpoint = env::var("OTEL_ENDPOINT").ok();

        Ok(Self {
            environment,
            listen_addr,
            static_dir,
            otel_endpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in ["LISTEN_ADDR", "STATIC_DIR", "OTEL_ENDPOINT"] {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_when_unset() {
        clear_env();
        let config = GatewayConfig::from_env().expect("config should load");

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.static_dir, "./static");
        assert!(config.otel_endpoint.is_none());
    }

    #[test]
    #[serial]
    fn reads_listen_addr_and_otel_endpoint() {
        clear_env();
        unsafe {
            env::set_var("LISTEN_ADDR", "127.0.0.1:9090");
            env::set_var("OTEL_ENDPOINT", "http://localhost:4317");
        }
        let config = GatewayConfig::from_env().expect("config should load");
        clear_env();

        assert_eq!(config.listen_addr, "127.0.0.1:9090");
        assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    }
}
