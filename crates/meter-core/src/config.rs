//! TOML configuration for the parking meter firmware.
//!
//! Every section is optional; missing keys fall back to the board defaults in
//! [`constants`](crate::constants).
//!
//! ```
//! use meter_core::MeterConfig;
//!
//! let config: MeterConfig = toml::from_str(r#"
//!     [endpoint]
//!     node_name = "meter-42"
//!
//!     [meter]
//!     initial_seconds = 120
//! "#).unwrap();
//!
//! assert_eq!(config.endpoint.node_name, "meter-42");
//! assert_eq!(config.meter.initial_seconds, 120);
//! assert_eq!(config.device.model, "K64F");
//! ```

use crate::constants::{
    DEFAULT_CONSOLE_BIND, DEFAULT_DEVICE_TYPE, DEFAULT_DM_PASSPHRASE, DEFAULT_DOMAIN,
    DEFAULT_LIFETIME_SECS, DEFAULT_MAX_CONNECTIONS, DEFAULT_NODE_NAME, DEFAULT_TICK_MS,
};
use crate::types::{DeviceIdentity, Passphrase};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    pub device: DeviceIdentity,
    pub device_manager: DeviceManagerConfig,
    pub endpoint: EndpointConfig,
    pub console: ConsoleConfig,
    pub meter: MeterSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceManagerConfig {
    pub enabled: bool,
    pub passphrase: Passphrase,
}

impl Default for DeviceManagerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            passphrase: Passphrase::new(DEFAULT_DM_PASSPHRASE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub node_name: String,
    pub domain: String,
    pub endpoint_type: String,
    pub lifetime_secs: u64,
    pub server_certificate: Option<PathBuf>,
    pub client_certificate: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub connection_handler: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            endpoint_type: DEFAULT_DEVICE_TYPE.to_string(),
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            server_certificate: None,
            client_certificate: None,
            client_key: None,
            connection_handler: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub bind: SocketAddr,
    pub max_connections: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_CONSOLE_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 5683))),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Which status LED driver the board carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedMode {
    /// Active-low RGB LED on PWM pins.
    #[default]
    Pwm,
    /// No RGB LED fitted; LED changes are logged.
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterSettings {
    /// Parking seconds loaded into the hourglass at boot (0 = expired).
    pub initial_seconds: i32,
    pub tick_ms: u64,
    pub hourglass_observable: bool,
    pub led: LedMode,
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            initial_seconds: 0,
            tick_ms: DEFAULT_TICK_MS,
            hourglass_observable: false,
            led: LedMode::Pwm,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl MeterConfig {
    /// Read and parse a TOML configuration file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read, `Error::ConfigParse` if
    /// it is not valid TOML for this model, and `Error::Config` if it fails
    /// [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MeterConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.node_name.trim().is_empty() {
            return Err(Error::Config("endpoint.node_name must not be empty".into()));
        }
        if self.endpoint.domain.trim().is_empty() {
            return Err(Error::Config("endpoint.domain must not be empty".into()));
        }
        if self.device_manager.enabled && self.device_manager.passphrase.is_empty() {
            return Err(Error::Config(
                "device_manager.passphrase is required when the device manager is enabled".into(),
            ));
        }
        if self.meter.tick_ms == 0 {
            return Err(Error::Config("meter.tick_ms must be greater than 0".into()));
        }
        if self.console.max_connections == 0 {
            return Err(Error::Config(
                "console.max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
