//! Relay Configuration
//!
//! Layered configuration: built-in defaults, then an optional `relay.toml`,
//! then `RELAY_*` environment variables, then `CLIENT_URL` for the allowed
//! CORS origin.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::HeaderValue;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::server::DEFAULT_ACK_MESSAGE;
use crate::sessions::ReconnectPolicy;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listen address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Browser origin allowed by CORS; permissive when unset
    pub cors_origin: Option<String>,

    /// Fixed payload of `responseMessage`
    pub ack_message: String,

    /// Behaviour when a connection reuses a registered session identifier
    pub reconnect_policy: ReconnectPolicy,

    /// Refuse upgrades that carry no `sessionId`
    pub reject_empty_session_id: bool,

    /// Outbound frames buffered per connection before new ones are dropped
    pub client_buffer: usize,

    /// Expire sessions with no connections after this many idle seconds
    pub session_idle_ttl_secs: Option<u64>,

    /// How often the expiry sweep runs
    pub sweep_interval_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origin: None,
            ack_message: DEFAULT_ACK_MESSAGE.to_string(),
            reconnect_policy: ReconnectPolicy::default(),
            reject_empty_session_id: false,
            client_buffer: 64,
            session_idle_ttl_secs: None,
            sweep_interval_secs: 60,
        }
    }
}

impl RelayConfig {
    /// Config file looked up in the working directory when no path is given
    pub const FILE_NAME: &'static str = "relay.toml";

    /// Build the provider chain
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let file = match path {
            Some(path) if !path.exists() => {
                return Err(RelayError::ConfigNotFound(path.to_path_buf()));
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(Self::FILE_NAME),
        };

        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("RELAY_"))
            .merge(Env::raw().only(&["CLIENT_URL"]).map(|_| "cors_origin".into())))
    }

    /// Extract and validate a configuration from `figment`
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default provider chain
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_buffer == 0 {
            return Err(RelayError::InvalidConfig {
                field: "client_buffer",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.sweep_interval_secs == 0 {
            return Err(RelayError::InvalidConfig {
                field: "sweep_interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        if let Some(origin) = &self.cors_origin {
            if let Err(e) = HeaderValue::from_str(origin) {
                return Err(RelayError::InvalidConfig {
                    field: "cors_origin",
                    reason: e.to_string(),
                });
            }
        }

        self.bind_addr().map(|_| ())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| RelayError::InvalidConfig {
                field: "host",
                reason: e.to_string(),
            })
    }

    pub fn session_idle_ttl(&self) -> Option<Duration> {
        self.session_idle_ttl_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
