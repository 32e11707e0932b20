//! Reference relay for hush clients.
//!
//! Serves the conversation over `GET /api/v1/chats` and fans `message` and
//! `userTyping` events out to every client connected at `/gateway`.

pub mod connection;
pub mod dispatcher;
pub mod routes;

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use dispatcher::Dispatcher;

/// Where the relay listens. Read from `HUSH_HOST` / `HUSH_PORT`.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl RelayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HUSH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("HUSH_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()?;
        Ok(Self { host, port })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

pub fn app(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/api/v1/chats", get(routes::get_history))
        .route("/gateway", get(routes::ws_upgrade))
        .with_state(dispatcher)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_joins_host_and_port() {
        let config = RelayConfig {
            host: "127.0.0.1".into(),
            port: 4000,
        };
        assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:4000");
    }

    #[test]
    fn bad_host_is_an_error() {
        let config = RelayConfig {
            host: "not a host".into(),
            port: 4000,
        };
        assert!(config.addr().is_err());
    }
}
