mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{ActorSettings, LogSettings, ServerSettings, Settings};

/// Loads the configuration from `config/default` and `POPSUB__*`
/// environment variables, falling back to defaults for anything missing.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("POPSUB")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let server = partial.server;
    let actor = partial.actor;
    let log = partial.log;

    Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        actor: ActorSettings {
            broker_host: actor
                .as_ref()
                .and_then(|a| a.broker_host.clone())
                .unwrap_or(default.actor.broker_host),
            broker_port: actor
                .as_ref()
                .and_then(|a| a.broker_port)
                .unwrap_or(default.actor.broker_port),
            register_timeout_ms: actor
                .as_ref()
                .and_then(|a| a.register_timeout_ms)
                .unwrap_or(default.actor.register_timeout_ms),
            request_timeout_ms: actor
                .as_ref()
                .and_then(|a| a.request_timeout_ms)
                .unwrap_or(default.actor.request_timeout_ms),
            reconnect_delay_ms: actor
                .as_ref()
                .and_then(|a| a.reconnect_delay_ms)
                .unwrap_or(default.actor.reconnect_delay_ms),
        },
        log: LogSettings {
            level: log
                .and_then(|l| l.level)
                .unwrap_or(default.log.level),
        },
    }
}
