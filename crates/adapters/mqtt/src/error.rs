//! MQTT adapter error types.

use fleetsim_app::ports::TransportError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// No session is open; `connect` has not succeeded yet.
    #[error("MQTT client not connected")]
    NotConnected,

    /// The configured QoS level does not exist.
    #[error("invalid MQTT QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    /// The broker could not be reached or refused the connection.
    #[error("MQTT connection failed")]
    Connection(#[source] rumqttc::ConnectionError),

    /// No CONNACK arrived within the configured timeout.
    #[error("timed out waiting for MQTT broker acknowledgement")]
    ConnectTimeout,

    /// The client rejected a publish request.
    #[error("MQTT publish failed")]
    Publish(#[source] rumqttc::ClientError),

    /// The client rejected a subscribe request.
    #[error("MQTT subscribe failed")]
    Subscribe(#[source] rumqttc::ClientError),

    /// The client rejected the disconnect request.
    #[error("MQTT disconnect failed")]
    Disconnect(#[source] rumqttc::ClientError),
}

impl From<MqttError> for TransportError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::NotConnected => Self::NotConnected,
            MqttError::InvalidQos(_) | MqttError::Connection(_) | MqttError::ConnectTimeout => {
                Self::Connect(Box::new(err))
            }
            MqttError::Publish(_) => Self::Publish(Box::new(err)),
            MqttError::Subscribe(_) => Self::Subscribe(Box::new(err)),
            MqttError::Disconnect(_) => Self::Disconnect(Box::new(err)),
        }
    }
}
