//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `fleetsim.toml` in the working directory, or at the path in
//! `FLEETSIM_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use fleetsim_adapter_mqtt::MqttConfig;
use fleetsim_app::device::DeviceBuilder;
use fleetsim_domain::device::DeviceKind;
use fleetsim_domain::id::DeviceId;

/// Default config file, relative to the working directory.
const DEFAULT_PATH: &str = "fleetsim.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MQTT broker settings.
    pub mqtt: MqttConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Simulator behaviour.
    pub simulator: SimulatorConfig,
    /// The simulated fleet. Empty means the default fleet.
    pub devices: Vec<DeviceConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Simulator-wide settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Run against an in-memory transport instead of a broker.
    pub dry_run: bool,
    /// Pause after a failed publish, in milliseconds.
    pub retry_backoff_ms: u64,
}

/// One simulated device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    /// Seconds between publishes; the device type's default when omitted.
    pub interval_secs: Option<u64>,
    /// Seed for reproducible readings.
    pub seed: Option<u64>,
}

impl DeviceConfig {
    fn builder(&self) -> DeviceBuilder {
        let mut builder = DeviceBuilder::new(self.id.clone(), self.kind);
        if let Some(secs) = self.interval_secs {
            builder = builder.interval(Duration::from_secs(secs));
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder
    }
}

impl Config {
    /// Load configuration from `fleetsim.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("FLEETSIM_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FLEETSIM_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("FLEETSIM_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Ok(val) = std::env::var("FLEETSIM_MQTT_USERNAME") {
            self.mqtt.username = Some(val);
        }
        if let Ok(val) = std::env::var("FLEETSIM_MQTT_PASSWORD") {
            self.mqtt.password = Some(val);
        }
        if let Ok(val) = std::env::var("FLEETSIM_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt.broker_port must be non-zero".to_string(),
            ));
        }
        if let Err(err) = self.mqtt.qos() {
            return Err(ConfigError::Validation(err.to_string()));
        }
        if self.simulator.retry_backoff_ms == 0 {
            return Err(ConfigError::Validation(
                "simulator.retry_backoff_ms must be non-zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "device id {} is configured more than once",
                    device.id
                )));
            }
            if device.interval_secs == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "device {} must have a non-zero interval_secs",
                    device.id
                )));
            }
        }
        Ok(())
    }

    /// The configured devices, or the default fleet when none are listed.
    #[must_use]
    pub fn fleet(&self) -> Vec<DeviceConfig> {
        if self.devices.is_empty() {
            default_fleet()
        } else {
            self.devices.clone()
        }
    }

    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.simulator.retry_backoff_ms)
    }

    /// Device builders for the whole fleet, with the simulator-wide settings
    /// applied.
    #[must_use]
    pub fn device_builders(&self) -> Vec<DeviceBuilder> {
        self.fleet()
            .iter()
            .map(|device| device.builder().retry_backoff(self.retry_backoff()))
            .collect()
    }
}

fn default_fleet() -> Vec<DeviceConfig> {
    match DeviceId::new("temp_sensor_001") {
        Ok(id) => vec![DeviceConfig {
            id,
            kind: DeviceKind::TemperatureHumidity,
            interval_secs: Some(5),
            seed: None,
        }],
        Err(_) => Vec::new(),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fleetsimd=info,fleetsim_app=info,fleetsim_adapter_mqtt=info".to_string(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            retry_backoff_ms: 1_000,
        }
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
