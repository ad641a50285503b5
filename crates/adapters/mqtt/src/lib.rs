//! # fleetsim-adapter-mqtt
//!
//! MQTT transport — connects the simulator to a real broker.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker and wait for its acknowledgement
//! - Publish telemetry on the topics handed over by the core
//! - Subscribe to control topics and forward incoming messages
//! - Report connection loss and re-subscribe after automatic reconnects
//!
//! ## Dependency rule
//! Depends on `fleetsim-app` for the [`Transport`](fleetsim_app::ports::Transport)
//! port. The core never sees rumqttc types.

pub mod config;
pub mod error;
pub mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use transport::MqttTransport;
