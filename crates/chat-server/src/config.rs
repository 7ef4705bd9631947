use std::net::IpAddr;

/// Startup configuration for the chat server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".parse().expect("valid default host"),
            port: 8765,
        }
    }
}
