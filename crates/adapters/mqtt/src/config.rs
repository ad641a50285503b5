//! MQTT broker connection settings.

use std::time::Duration;

use rumqttc::{MqttOptions, QoS};
use serde::Deserialize;

use crate::error::MqttError;

/// Configuration for the MQTT transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Username, sent only together with `password`.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Quality of service for telemetry and control subscriptions (0, 1 or 2).
    pub qos: u8,
    /// How long `connect` waits for the broker's CONNACK, in seconds.
    pub connect_timeout_secs: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "fleetsim".to_string(),
            keep_alive_secs: 60,
            username: None,
            password: None,
            qos: 0,
            connect_timeout_secs: 10,
        }
    }
}

impl MqttConfig {
    /// The configured QoS level.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidQos`] for values other than 0, 1 and 2.
    pub fn qos(&self) -> Result<QoS, MqttError> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(MqttError::InvalidQos(other)),
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.into())
    }

    /// Build rumqttc client options from this configuration.
    #[must_use]
    pub fn options(&self) -> MqttOptions {
        let mut options =
            MqttOptions::new(self.client_id.clone(), self.broker_host.clone(), self.broker_port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.into()));
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            options.set_credentials(username.clone(), password.clone());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "fleetsim");
        assert_eq!(config.keep_alive_secs, 60);
        assert!(config.username.is_none());
        assert_eq!(config.qos().unwrap(), QoS::AtMostOnce);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            broker_host = "broker.hivemq.com"
            broker_port = 8883
            client_id = "lab-fleet"
            keep_alive_secs = 30
            username = "sim"
            password = "secret"
            qos = 1
            connect_timeout_secs = 3
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "broker.hivemq.com");
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.client_id, "lab-fleet");
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.username.as_deref(), Some("sim"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.qos().unwrap(), QoS::AtLeastOnce);
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"broker_host = "192.168.1.100""#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "192.168.1.100");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "fleetsim");
    }

    #[test]
    fn should_reject_unknown_qos_level() {
        let config = MqttConfig {
            qos: 3,
            ..MqttConfig::default()
        };
        assert!(matches!(config.qos(), Err(MqttError::InvalidQos(3))));
    }

    #[test]
    fn should_build_client_options() {
        let config = MqttConfig {
            keep_alive_secs: 15,
            ..MqttConfig::default()
        };
        let options = config.options();
        assert_eq!(options.broker_address(), ("localhost".to_string(), 1883));
        assert_eq!(options.client_id(), "fleetsim");
        assert_eq!(options.keep_alive(), Duration::from_secs(15));
    }
}
