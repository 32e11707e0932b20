use std::time::Duration;

use hush_gateway::{TransportConfig, gateway_url};

/// Relay the app talks to. History and the WebSocket gateway share it.
pub const DEFAULT_BASE_URL: &str = "https://calculator-app-backend-wy7h.onrender.com";

/// Presence decays this long after the most recent typing pulse.
pub const TYPING_WINDOW: Duration = Duration::from_millis(1000);

pub const SIMULATED_REPLY_DELAY: Duration = Duration::from_millis(1500);
pub const SIMULATED_COUNTERPART: &str = "friend";
pub const SIMULATED_REPLY: &str = "Got it! I'll get back to you soon.";

/// Scripted behaviour of a simulated session: every outgoing message is
/// answered once, after `reply_delay`, by `counterpart`.
#[derive(Debug, Clone)]
pub struct SimulatedScript {
    pub counterpart: String,
    pub reply_body: String,
    pub reply_delay: Duration,
}

impl Default for SimulatedScript {
    fn default() -> Self {
        Self {
            counterpart: SIMULATED_COUNTERPART.to_string(),
            reply_body: SIMULATED_REPLY.to_string(),
            reply_delay: SIMULATED_REPLY_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub typing_window: Duration,
    pub simulated: SimulatedScript,
    pub transport: TransportConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            typing_window: TYPING_WINDOW,
            simulated: SimulatedScript::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// WebSocket endpoint derived from `base_url`.
    pub fn gateway_url(&self) -> String {
        gateway_url(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_app() {
        let config = ClientConfig::default();
        assert_eq!(config.typing_window, Duration::from_millis(1000));
        assert_eq!(config.simulated.reply_delay, Duration::from_millis(1500));
        assert_eq!(config.simulated.counterpart, "friend");
        assert_eq!(
            config.gateway_url(),
            "wss://calculator-app-backend-wy7h.onrender.com/gateway"
        );
    }

    #[test]
    fn base_url_override_moves_gateway_too() {
        let config = ClientConfig::default().with_base_url("http://127.0.0.1:3000");
        assert_eq!(config.gateway_url(), "ws://127.0.0.1:3000/gateway");
    }
}
