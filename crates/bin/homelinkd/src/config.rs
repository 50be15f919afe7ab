//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `homelink.toml` in the working directory, or at the path in
//! `HOMELINK_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::path::Path;

use serde::Deserialize;

use homelink_adapter_telnet::TelnetConfig;
use homelink_domain::button::Button;
use homelink_domain::device::{ConnectionSettings, Device};
use homelink_domain::error::{HubError, ValidationError};
use homelink_domain::id::{ButtonId, DeviceId, ZoneId};
use homelink_domain::recipe::RecipeDefinition;
use homelink_domain::zone::{OutputKind, Zone, ZoneType};

const DEFAULT_PATH: &str = "homelink.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Event bus settings.
    pub bus: BusConfig,
    /// Telnet transport settings shared by every hub.
    pub telnet: TelnetConfig,
    /// Hubs, with the zones, buttons and peripherals behind them.
    pub devices: Vec<DeviceConfig>,
    /// Automations started at boot.
    pub recipes: Vec<RecipeDefinition>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Event bus configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Broadcast buffer shared by every consumer.
    pub capacity: usize,
}

/// A device declared in the configuration file.
///
/// Top-level entries are hubs: they own a connection pool and stream unless
/// told otherwise. Nested entries are peripherals reached through their hub.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Fixed global id, so recipes can reference the device.
    pub id: Option<DeviceId>,
    pub local_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    pub login: Option<String>,
    pub password: Option<String>,
    /// Falls back to `[telnet] pool_size`.
    pub pool_size: Option<usize>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    pub id: Option<ZoneId>,
    pub local_id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub zone_type: ZoneType,
    #[serde(default)]
    pub output: OutputKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonConfig {
    pub id: Option<ButtonId>,
    pub local_id: String,
    pub name: Option<String>,
}

fn default_stream() -> bool {
    true
}

impl Config {
    /// Load configuration from `HOMELINK_CONFIG` or `homelink.toml` (if
    /// present) then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed or invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HOMELINK_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOMELINK_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check settings that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on a zero capacity or pool size, an
    /// invalid device tree or an invalid recipe.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "bus capacity must be non-zero".to_string(),
            ));
        }
        if self.telnet.pool_size == 0 {
            return Err(ConfigError::Validation(
                "telnet pool size must be non-zero".to_string(),
            ));
        }
        self.build_devices()?;
        for recipe in &self.recipes {
            recipe
                .validate()
                .map_err(|err| invalid(&format!("recipe {:?}", recipe.name), &err))?;
        }
        Ok(())
    }

    /// Turn the declared device trees into domain devices.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a device, zone or button is
    /// invalid or its credentials are incomplete.
    pub fn build_devices(&self) -> Result<Vec<Device>, ConfigError> {
        self.devices
            .iter()
            .map(|hub| {
                let settings = ConnectionSettings {
                    pool_size: hub.pool_size.unwrap_or(self.telnet.pool_size),
                    stream: hub.stream,
                };
                hub.build(Some(settings))
                    .map_err(|err| invalid(&format!("device {:?}", hub.name), &err))
            })
            .collect()
    }
}

impl DeviceConfig {
    fn build(&self, connection: Option<ConnectionSettings>) -> Result<Device, HubError> {
        let mut builder = Device::builder()
            .name(&self.name)
            .description(&self.description)
            .address(&self.address);
        if let Some(id) = self.id {
            builder = builder.id(id);
        }
        if let Some(local_id) = &self.local_id {
            builder = builder.local_id(local_id);
        }
        match (&self.login, &self.password) {
            (Some(login), Some(password)) => builder = builder.credentials(login, password),
            (None, None) => {}
            _ => {
                return Err(ValidationError::Missing("login and password").into());
            }
        }
        if let Some(settings) = connection {
            builder = builder.connection(settings);
        }
        let mut device = builder.build()?;

        for zone in &self.zones {
            let mut builder = Zone::builder()
                .local_id(&zone.local_id)
                .zone_type(zone.zone_type)
                .output(zone.output);
            if let Some(id) = zone.id {
                builder = builder.id(id);
            }
            if let Some(name) = &zone.name {
                builder = builder.name(name);
            }
            device.add_zone(builder.build()?)?;
        }
        for button in &self.buttons {
            let mut built = Button::new(&button.local_id, button.name.clone())?;
            if let Some(id) = button.id {
                built.id = id;
            }
            device.add_button(built)?;
        }
        for child in &self.devices {
            device.add_device(child.build(None)?)?;
        }
        Ok(device)
    }
}

fn invalid(what: &str, err: &HubError) -> ConfigError {
    let detail = std::error::Error::source(err).map_or_else(|| err.to_string(), ToString::to_string);
    ConfigError::Validation(format!("{what}: {detail}"))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homelinkd=info,homelink=info".to_string(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use homelink_domain::recipe::{ActionConfig, TriggerConfig};

    const FULL: &str = r#"
        [logging]
        filter = "debug"

        [bus]
        capacity = 32

        [telnet]
        pool_size = 3
        retry_delay_secs = 1

        [[devices]]
        name = "Smart Bridge"
        address = "192.168.1.20:23"
        login = "lutron"
        password = "integration"

        [[devices.zones]]
        id = "7d0c3b3e-1f7a-4d7e-9a3c-2b2f6f1c9e01"
        local_id = "12"
        name = "Kitchen"

        [[devices.buttons]]
        local_id = "1"
        name = "Evening scene"

        [[devices.devices]]
        local_id = "9"
        name = "Hallway keypad"

        [[devices.devices.buttons]]
        local_id = "3"

        [[recipes]]
        name = "Kitchen on"
        trigger = { type = "interval", seconds = 60 }
        action = { type = "set_zone_level", zone_id = "7d0c3b3e-1f7a-4d7e-9a3c-2b2f6f1c9e01", intensity = 75.0 }
    "#;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.bus.capacity, 256);
        assert_eq!(config.telnet.pool_size, 2);
        assert!(config.devices.is_empty());
        assert!(config.recipes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bus.capacity, 256);
        assert_eq!(config.logging.filter, "homelinkd=info,homelink=info");
    }

    #[test]
    fn should_parse_full_toml() {
        let config: Config = toml::from_str(FULL).unwrap();
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.bus.capacity, 32);
        assert_eq!(config.telnet.pool_size, 3);
        assert_eq!(config.telnet.probe_command, "#PING\r\n");
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.recipes.len(), 1);
        assert!(matches!(
            config.recipes[0].trigger,
            TriggerConfig::Interval { seconds: 60 }
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_build_device_tree_with_fixed_ids() {
        let config: Config = toml::from_str(FULL).unwrap();

        let devices = config.build_devices().unwrap();

        let hub = &devices[0];
        let ActionConfig::SetZoneLevel { zone_id, .. } = config.recipes[0].action else {
            panic!("expected set_zone_level");
        };
        assert_eq!(hub.zones["12"].id, zone_id);
        assert_eq!(hub.zones["12"].device_id, hub.id);
        assert_eq!(hub.buttons["1"].name, "Evening scene");
        assert_eq!(hub.credentials.as_ref().unwrap().login, "lutron");
        assert_eq!(
            hub.connection,
            Some(ConnectionSettings {
                pool_size: 3,
                stream: true
            })
        );

        let keypad = &hub.devices["9"];
        assert_eq!(keypad.hub_id, Some(hub.id));
        assert!(!keypad.is_addressable());
        assert_eq!(keypad.buttons["3"].name, "Button 3");
    }

    #[test]
    fn should_prefer_device_pool_size_over_telnet_default() {
        let config: Config = toml::from_str(
            "
            [[devices]]
            name = 'Bridge'
            address = '10.0.0.2:23'
            pool_size = 5
            stream = false
        ",
        )
        .unwrap();

        let devices = config.build_devices().unwrap();

        assert_eq!(
            devices[0].connection,
            Some(ConnectionSettings {
                pool_size: 5,
                stream: false
            })
        );
    }

    #[test]
    fn should_reject_hub_without_address() {
        let config: Config = toml::from_str("[[devices]]\nname = 'Bridge'").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(msg)) if msg.contains("Bridge")
        ));
    }

    #[test]
    fn should_reject_login_without_password() {
        let config: Config = toml::from_str(
            "
            [[devices]]
            name = 'Bridge'
            address = '10.0.0.2:23'
            login = 'lutron'
        ",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_invalid_recipe() {
        let config: Config = toml::from_str(
            "
            [[recipes]]
            name = 'Never'
            trigger = { type = 'interval', seconds = 0 }
            action = { type = 'set_zone_level', zone_id = '7d0c3b3e-1f7a-4d7e-9a3c-2b2f6f1c9e01', intensity = 10.0 }
        ",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(msg)) if msg.contains("Never")
        ));
    }

    #[test]
    fn should_reject_zero_bus_capacity() {
        let mut config = Config::default();
        config.bus.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.bus.capacity, 256);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
