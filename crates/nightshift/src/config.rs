//! Relay configuration.
//!
//! Everything has a sensible default, so a bare `nightshift` with no
//! environment listens on `0.0.0.0:3000`, never times out idle
//! connections, and hands out skins 1 to 3.
//!
//! | Variable                 | Field               | Default   |
//! |--------------------------|---------------------|-----------|
//! | `HOST`                   | `host`              | `0.0.0.0` |
//! | `PORT`                   | `port`              | `3000`    |
//! | `IDLE_TIMEOUT_SECS`      | `idle_timeout`      | disabled  |
//! | `HANDSHAKE_TIMEOUT_SECS` | `handshake_timeout` | `10`      |
//! | `OUTBOX_CAPACITY`        | `outbox_capacity`   | `256`     |
//! | `SKINS`                  | `skins`             | `1,2,3`   |

use std::time::Duration;

use nightshift_protocol::Skin;
use nightshift_session::SkinPalette;
use nightshift_world::DEFAULT_OUTBOX_CAPACITY;

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT value {0:?}")]
    InvalidPort(String),

    #[error("invalid IDLE_TIMEOUT_SECS value {0:?}")]
    InvalidTimeout(String),

    #[error("invalid HANDSHAKE_TIMEOUT_SECS value {0:?}: expected whole seconds above 0")]
    InvalidHandshakeTimeout(String),

    #[error("invalid OUTBOX_CAPACITY value {0:?}: expected at least {min}", min = RelayConfig::MIN_OUTBOX_CAPACITY)]
    InvalidOutboxCapacity(String),

    #[error("invalid SKINS value {0:?}: expected comma-separated numbers 0-255")]
    InvalidSkins(String),
}

/// Settings for one relay process.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Host or IP to bind.
    pub host: String,

    /// TCP port to bind. `0` lets the OS pick one.
    pub port: u16,

    /// Close a connection that sends nothing for this long. `None` keeps
    /// silent connections open until the transport reports them closed.
    pub idle_timeout: Option<Duration>,

    /// How long a new TCP peer has to finish the WebSocket upgrade.
    pub handshake_timeout: Duration,

    /// Events a connection may have queued before it is cut off as a slow
    /// consumer.
    pub outbox_capacity: usize,

    /// Skins new sessions are drawn from.
    pub skins: SkinPalette,
}

impl RelayConfig {
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
    /// A joining connection is sent two events before anything else.
    pub const MIN_OUTBOX_CAPACITY: usize = 2;

    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary lookup, falling back to
    /// defaults for unset or blank keys.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host;
        }

        if let Some(port) = get("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }

        if let Some(secs) = get("IDLE_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(secs))?;
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(secs) = get("HANDSHAKE_TIMEOUT_SECS") {
            config.handshake_timeout = secs
                .parse()
                .ok()
                .filter(|&secs: &u64| secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidHandshakeTimeout(secs))?;
        }

        if let Some(capacity) = get("OUTBOX_CAPACITY") {
            config.outbox_capacity = capacity
                .parse()
                .ok()
                .filter(|&n: &usize| n >= Self::MIN_OUTBOX_CAPACITY)
                .ok_or(ConfigError::InvalidOutboxCapacity(capacity))?;
        }

        if let Some(list) = get("SKINS") {
            config.skins = parse_skins(&list)?;
        }

        Ok(config)
    }

    /// The `host:port` string handed to the transport.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: Self::DEFAULT_PORT,
            idle_timeout: None,
            handshake_timeout: Self::DEFAULT_HANDSHAKE_TIMEOUT,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            skins: SkinPalette::default(),
        }
    }
}

fn parse_skins(list: &str) -> Result<SkinPalette, ConfigError> {
    let invalid = || ConfigError::InvalidSkins(list.to_owned());
    let skins = list
        .split(',')
        .map(|item| item.trim().parse::<u8>().map(Skin).map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    SkinPalette::new(skins).map_err(|_| invalid())
}
