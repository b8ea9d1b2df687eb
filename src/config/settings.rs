use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the broker's socket, the actors that talk to it,
/// and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub actor: ActorSettings,
    pub log: LogSettings,
}

/// Configuration settings for the broker server.
///
/// Defines the host and UDP port the broker binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for producers and consumers.
#[derive(Debug, Deserialize, Clone)]
pub struct ActorSettings {
    pub broker_host: String,
    pub broker_port: u16,
    /// Wait for a RegisterResponse before sending Register again.
    pub register_timeout_ms: u64,
    /// Wait for the reply to announce, list, subscribe and unsubscribe.
    pub request_timeout_ms: u64,
    /// Pause before rebinding the socket after a send failure.
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub actor: Option<PartialActorSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialActorSettings {
    pub broker_host: Option<String>,
    pub broker_port: Option<u16>,
    pub register_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub reconnect_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ActorSettings {
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.broker_host, self.broker_port)
    }

    pub fn register_timeout(&self) -> Duration {
        Duration::from_millis(self.register_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 2222,
        }
    }
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 2222,
            register_timeout_ms: 10_000,
            request_timeout_ms: 5_000,
            reconnect_delay_ms: 5_000,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            actor: ActorSettings::default(),
            log: LogSettings::default(),
        }
    }
}
