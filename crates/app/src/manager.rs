//! Device manager — the registry of devices sharing one transport.
//!
//! The manager owns the transport, the devices (in insertion order) and the
//! [`ControlListener`] registered with the transport on connect. All registry
//! mutation goes through `&mut self`, so it is driven from a single control
//! task by construction.
//!
//! Lifecycle order:
//!
//! 1. [`connect`](DeviceManager::connect) — connect and subscribe to control topics
//! 2. [`add_device`](DeviceManager::add_device) — register devices
//! 3. [`start_all`](DeviceManager::start_all) — spawn one publish loop per device
//! 4. [`stop_all`](DeviceManager::stop_all) — wait for every loop to exit
//! 5. [`disconnect`](DeviceManager::disconnect) — stop anything still running, then tear down

use std::sync::Arc;

use tokio::sync::broadcast;

use fleetsim_domain::control::ControlMessage;
use fleetsim_domain::id::DeviceId;
use fleetsim_domain::topic;

use crate::control::ControlListener;
use crate::device::{Device, DeviceError, DeviceStatus};
use crate::ports::{Transport, TransportError, TransportEvents};

/// Errors surfaced by [`DeviceManager`].
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The transport refused the connection.
    #[error("failed to connect to the message bus")]
    Connect(#[source] TransportError),

    /// Subscribing to the control topics failed after connecting.
    #[error("failed to subscribe to control topics")]
    Subscribe(#[source] TransportError),

    /// Closing the transport failed.
    #[error("failed to disconnect from the message bus")]
    Disconnect(#[source] TransportError),

    /// A device with the same id is already registered.
    #[error("device {0} is already registered")]
    DuplicateDevice(DeviceId),

    /// The device publishes through a different transport than the manager's.
    #[error("device {0} is bound to a different transport")]
    ForeignTransport(DeviceId),

    /// No device with this id is registered.
    #[error("device {0} is not registered")]
    UnknownDevice(DeviceId),

    /// A device lifecycle operation failed.
    #[error("device lifecycle error")]
    Device(#[from] DeviceError),
}

/// Registry and bulk lifecycle controller for simulated devices.
pub struct DeviceManager<T> {
    transport: Arc<T>,
    devices: Vec<Device<T>>,
    listener: Arc<ControlListener>,
    connected: bool,
}

impl<T> DeviceManager<T> {
    /// Create a manager around a shared transport.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            devices: Vec::new(),
            listener: Arc::new(ControlListener::default()),
            connected: false,
        }
    }

    /// The transport devices should be built with.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Status of every registered device, in registration order.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceStatus> {
        self.devices.iter().map(Device::status).collect()
    }

    /// Look up a registered device.
    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<&Device<T>> {
        self.devices.iter().find(|d| d.id() == id)
    }

    /// Receive control commands parsed from the control topics.
    #[must_use]
    pub fn subscribe_commands(&self) -> broadcast::Receiver<ControlMessage> {
        self.listener.subscribe()
    }

    /// Register a device.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::DuplicateDevice`] if a device with the same id
    /// is already registered, and [`ManagerError::ForeignTransport`] if the
    /// device was not built on [`transport`](Self::transport).
    pub fn add_device(&mut self, device: Device<T>) -> Result<(), ManagerError> {
        if !Arc::ptr_eq(device.transport(), &self.transport) {
            return Err(ManagerError::ForeignTransport(device.id().clone()));
        }
        if self.device(device.id()).is_some() {
            return Err(ManagerError::DuplicateDevice(device.id().clone()));
        }
        tracing::info!(device_id = %device.id(), kind = %device.kind(), "device added");
        self.devices.push(device);
        Ok(())
    }

    /// Unregister a device, stopping it first if it is running.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownDevice`] if no such device is
    /// registered, or [`ManagerError::Device`] if its loop did not exit
    /// cleanly (the device is removed regardless).
    pub async fn remove_device(&mut self, id: &DeviceId) -> Result<Device<T>, ManagerError> {
        let index = self
            .devices
            .iter()
            .position(|d| d.id() == id)
            .ok_or_else(|| ManagerError::UnknownDevice(id.clone()))?;
        let mut device = self.devices.remove(index);
        device.stop().await?;
        tracing::info!(device_id = %id, "device removed");
        Ok(device)
    }

    /// Stop every running device and wait until all their loops have exited.
    ///
    /// All loops are signalled first and then joined, so the total wait is
    /// that of the slowest device. A device whose loop fails to join is
    /// logged and counted as stopped. Returns the number of devices stopped.
    pub async fn stop_all(&mut self) -> usize {
        for device in &self.devices {
            device.request_stop();
        }

        let mut stopped = 0;
        for device in &mut self.devices {
            if !device.is_running() {
                continue;
            }
            if let Err(err) = device.stop().await {
                tracing::error!(device_id = %device.id(), %err, "device did not stop cleanly");
            }
            stopped += 1;
        }
        tracing::info!(stopped, "all devices stopped");
        stopped
    }
}

impl<T: Transport> DeviceManager<T> {
    /// Connect the transport and subscribe to every device's control topic.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Connect`] if the transport rejects the
    /// connection and [`ManagerError::Subscribe`] if the control
    /// subscription is refused.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&mut self) -> Result<(), ManagerError> {
        let events: Arc<dyn TransportEvents> = self.listener.clone();
        self.transport
            .connect(events)
            .await
            .map_err(ManagerError::Connect)?;
        self.connected = true;

        self.transport
            .subscribe(topic::CONTROL_FILTER)
            .await
            .map_err(ManagerError::Subscribe)?;
        tracing::info!(filter = topic::CONTROL_FILTER, "subscribed to control topics");
        Ok(())
    }

    /// Start every registered device that is not already running.
    ///
    /// Devices already running are skipped. Returns the number started.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start_all(&mut self) -> usize {
        let mut started = 0;
        for device in &mut self.devices {
            match device.start() {
                Ok(()) => started += 1,
                Err(err) => tracing::debug!(device_id = %device.id(), %err, "skipping device"),
            }
        }
        tracing::info!(started, total = self.devices.len(), "devices started");
        started
    }

    /// Stop all devices, then close the transport.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Disconnect`] if the transport fails to close.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&mut self) -> Result<(), ManagerError> {
        self.stop_all().await;
        if !self.connected {
            return Ok(());
        }
        self.transport
            .disconnect()
            .await
            .map_err(ManagerError::Disconnect)?;
        self.connected = false;
        tracing::info!("disconnected from the message bus");
        Ok(())
    }
}
