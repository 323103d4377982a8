//! Server configuration from the environment.

use std::net::SocketAddr;

pub const ADDR_ENV: &str = "NOTEWELL_ADDR";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Read configuration from the environment, with logged fallbacks.
    pub fn from_env() -> Self {
        let addr = match std::env::var(ADDR_ENV) {
            Ok(raw) => match raw.parse() {
                Ok(addr) => addr,
                Err(_) => {
                    tracing::warn!(%raw, "invalid {ADDR_ENV}, using {DEFAULT_ADDR}");
                    default_addr()
                }
            },
            Err(_) => default_addr(),
        };
        Self { addr }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn default_addr() -> SocketAddr {
    DEFAULT_ADDR.parse().expect("default address parses")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }
}
