//! # fleetsimd — IoT fleet simulator daemon
//!
//! Composition root that wires the transport and the simulated devices
//! together.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the tracing subscriber
//! - Pick the transport: MQTT broker, or in-memory for dry runs
//! - Register every configured device with the [`DeviceManager`]
//! - Connect, start all devices, and run until Ctrl+C
//! - Stop every device before disconnecting
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no simulation logic belongs here.

mod config;

use std::sync::Arc;

use fleetsim_adapter_mqtt::MqttTransport;
use fleetsim_app::manager::DeviceManager;
use fleetsim_app::memory::InMemoryTransport;
use fleetsim_app::ports::Transport;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    if config.simulator.dry_run {
        tracing::info!("dry run, readings are not sent anywhere");
        run(Arc::new(InMemoryTransport::discarding()), &config).await
    } else {
        run(Arc::new(MqttTransport::new(config.mqtt.clone())), &config).await
    }
}

async fn run<T: Transport>(
    transport: Arc<T>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager = DeviceManager::new(transport);
    for builder in config.device_builders() {
        let device = builder.build(Arc::clone(manager.transport()))?;
        manager.add_device(device)?;
    }

    manager.connect().await?;
    let started = manager.start_all();
    tracing::info!(started, "simulator running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested, stopping all devices");

    manager.disconnect().await?;
    tracing::info!("all devices stopped");
    Ok(())
}
