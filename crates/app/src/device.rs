//! Device — one simulated telemetry source and its publish loop.
//!
//! A [`Device`] owns its simulation state and, while running, a single tokio
//! task that repeats *generate → encode → publish → sleep*. The simulation
//! state is moved into the task on [`Device::start`] and handed back when the
//! task is joined in [`Device::stop`], so nothing outside the loop can touch
//! it while it runs, and a smart switch keeps its position across restarts.
//!
//! ## Failure handling
//!
//! A failed publish never ends the loop: the error is logged and the loop
//! sleeps for the retry backoff (1 s by default) instead of the full interval.
//!
//! ## Cancellation
//!
//! [`Device::stop`] flips the running flag and wakes the loop immediately,
//! whether it is sleeping or waiting on the transport. An in-flight publish is
//! abandoned. Dropping a running device also ends its loop at the next
//! suspension point.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use fleetsim_domain::device::DeviceKind;
use fleetsim_domain::error::ValidationError;
use fleetsim_domain::generator::Simulation;
use fleetsim_domain::id::DeviceId;
use fleetsim_domain::time;
use fleetsim_domain::topic;

use crate::ports::{Transport, TransportError};

/// Pause after a failed publish before the next attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Errors returned by [`Device`] lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// `start` was called on a device whose loop is already running.
    #[error("device {0} is already running")]
    AlreadyRunning(DeviceId),

    /// The publish loop task panicked or was aborted. The simulation state
    /// has been reset.
    #[error("publish loop of device {id} did not exit cleanly")]
    Task {
        id: DeviceId,
        #[source]
        source: JoinError,
    },
}

/// Why a single tick failed to publish.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode reading")]
    Encode(#[from] serde_json::Error),

    #[error("transport rejected reading")]
    Transport(#[from] TransportError),
}

/// Point-in-time view of a device, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub interval: Duration,
    pub running: bool,
}

/// Generator state plus the randomness source feeding it.
struct SimulationState {
    simulation: Simulation,
    rng: StdRng,
}

impl SimulationState {
    fn fresh(kind: DeviceKind, seed: Option<u64>) -> Self {
        Self {
            simulation: Simulation::new(kind),
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }
}

/// Handle on a running publish loop.
struct Worker {
    running: watch::Sender<bool>,
    handle: JoinHandle<SimulationState>,
}

/// A simulated device publishing through a shared transport.
pub struct Device<T> {
    id: DeviceId,
    kind: DeviceKind,
    interval: Duration,
    retry_backoff: Duration,
    seed: Option<u64>,
    transport: Arc<T>,
    /// `Some` exactly while idle; moved into the loop while running.
    state: Option<SimulationState>,
    worker: Option<Worker>,
}

impl<T> std::fmt::Debug for Device<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("interval", &self.interval)
            .field("running", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> Device<T> {
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the publish loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// The transport this device publishes through.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            id: self.id.clone(),
            kind: self.kind,
            interval: self.interval,
            running: self.is_running(),
        }
    }

    /// Ask the loop to exit without waiting for it.
    pub(crate) fn request_stop(&self) {
        if let Some(worker) = &self.worker {
            worker.running.send_replace(false);
        }
    }

    /// Stop the publish loop and wait until its task has exited.
    ///
    /// Stopping an idle device is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Task`] if the loop task panicked. The device
    /// is stopped either way and can be started again.
    pub async fn stop(&mut self) -> Result<(), DeviceError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker.running.send_replace(false);

        match worker.handle.await {
            Ok(state) => {
                self.state = Some(state);
                tracing::info!(device_id = %self.id, "device stopped");
                Ok(())
            }
            Err(source) => {
                self.state = Some(SimulationState::fresh(self.kind, self.seed));
                tracing::error!(device_id = %self.id, err = %source, "publish loop did not exit cleanly");
                Err(DeviceError::Task {
                    id: self.id.clone(),
                    source,
                })
            }
        }
    }
}

impl<T: Transport> Device<T> {
    /// Spawn the publish loop.
    ///
    /// The first reading is published immediately, then one per interval.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::AlreadyRunning`] if the loop is already active;
    /// no second loop is spawned.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        if self.worker.is_some() {
            return Err(DeviceError::AlreadyRunning(self.id.clone()));
        }

        let state = self
            .state
            .take()
            .unwrap_or_else(|| SimulationState::fresh(self.kind, self.seed));
        let (running, stop_rx) = watch::channel(true);
        let publish_loop = PublishLoop {
            id: self.id.clone(),
            topic: topic::telemetry(self.kind, &self.id),
            interval: self.interval,
            retry_backoff: self.retry_backoff,
            transport: Arc::clone(&self.transport),
        };
        let handle = tokio::spawn(publish_loop.run(state, stop_rx));
        self.worker = Some(Worker { running, handle });

        tracing::info!(
            device_id = %self.id,
            kind = %self.kind,
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "device started"
        );
        Ok(())
    }
}

/// Everything the loop task needs, detached from the [`Device`].
struct PublishLoop<T> {
    id: DeviceId,
    topic: String,
    interval: Duration,
    retry_backoff: Duration,
    transport: Arc<T>,
}

impl<T: Transport> PublishLoop<T> {
    async fn run(
        self,
        mut state: SimulationState,
        mut running: watch::Receiver<bool>,
    ) -> SimulationState {
        loop {
            let keep_running = *running.borrow_and_update();
            if !keep_running {
                break;
            }

            // A publish stuck on the transport must not hold up `stop`.
            let outcome = tokio::select! {
                result = self.tick(&mut state) => result,
                changed = running.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };
            let delay = match outcome {
                Ok(()) => self.interval,
                Err(err) => {
                    tracing::warn!(device_id = %self.id, topic = %self.topic, %err, "failed to publish reading, backing off");
                    self.retry_backoff
                }
            };

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                changed = running.changed() => {
                    // Sender gone: the device was dropped while running.
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        state
    }

    async fn tick(&self, state: &mut SimulationState) -> Result<(), PublishError> {
        let reading = state
            .simulation
            .reading(&self.id, &mut state.rng, time::now());
        let payload = reading.to_payload()?;
        let size = payload.len();
        self.transport.publish(&self.topic, payload).await?;
        tracing::debug!(device_id = %self.id, topic = %self.topic, size, timestamp = %reading.timestamp, "reading published");
        Ok(())
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug)]
pub struct DeviceBuilder {
    id: DeviceId,
    kind: DeviceKind,
    interval: Option<Duration>,
    retry_backoff: Duration,
    seed: Option<u64>,
}

impl DeviceBuilder {
    /// Start building a device with the given identity.
    #[must_use]
    pub fn new(id: DeviceId, kind: DeviceKind) -> Self {
        Self {
            id,
            kind,
            interval: None,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            seed: None,
        }
    }

    /// Time between publishes. Defaults to [`DeviceKind::default_interval`].
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    #[must_use]
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Seed the device's random generator for reproducible readings.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Consume the builder, validate, and return a [`Device`] bound to
    /// `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroInterval`] or
    /// [`ValidationError::ZeroRetryBackoff`] for zero durations.
    pub fn build<T>(self, transport: Arc<T>) -> Result<Device<T>, ValidationError> {
        let interval = self.interval.unwrap_or_else(|| self.kind.default_interval());
        if interval.is_zero() {
            return Err(ValidationError::ZeroInterval);
        }
        if self.retry_backoff.is_zero() {
            return Err(ValidationError::ZeroRetryBackoff);
        }

        Ok(Device {
            state: Some(SimulationState::fresh(self.kind, self.seed)),
            id: self.id,
            kind: self.kind,
            interval,
            retry_backoff: self.retry_backoff,
            seed: self.seed,
            transport,
            worker: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use fleetsim_domain::reading::{Measurements, Reading};
    use tokio::time::Instant;

    use super::*;
    use crate::memory::InMemoryTransport;

    fn device(
        transport: &Arc<InMemoryTransport>,
        id: &str,
        kind: DeviceKind,
        interval: Duration,
    ) -> Device<InMemoryTransport> {
        DeviceBuilder::new(DeviceId::new(id).unwrap(), kind)
            .interval(interval)
            .seed(7)
            .build(Arc::clone(transport))
            .unwrap()
    }

    fn connected() -> Arc<InMemoryTransport> {
        Arc::new(InMemoryTransport::connected())
    }

    #[test]
    fn should_reject_zero_interval() {
        let transport = Arc::new(InMemoryTransport::new());
        let result = DeviceBuilder::new(DeviceId::new("d").unwrap(), DeviceKind::Light)
            .interval(Duration::ZERO)
            .build(transport);
        assert!(matches!(result, Err(ValidationError::ZeroInterval)));
    }

    #[test]
    fn should_reject_zero_retry_backoff() {
        let transport = Arc::new(InMemoryTransport::new());
        let result = DeviceBuilder::new(DeviceId::new("d").unwrap(), DeviceKind::Light)
            .retry_backoff(Duration::ZERO)
            .build(transport);
        assert!(matches!(result, Err(ValidationError::ZeroRetryBackoff)));
    }

    #[test]
    fn should_default_interval_from_kind() {
        let transport = Arc::new(InMemoryTransport::new());
        let device = DeviceBuilder::new(DeviceId::new("m").unwrap(), DeviceKind::Motion)
            .build(transport)
            .unwrap();
        assert_eq!(device.interval(), Duration::from_secs(10));
        assert!(!device.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_every_interval_on_telemetry_topic() {
        let transport = connected();
        let mut device = device(
            &transport,
            "temp_sensor_001",
            DeviceKind::TemperatureHumidity,
            Duration::from_secs(5),
        );
        let started = Instant::now();

        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        device.stop().await.unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 3);
        let offsets: Vec<u64> = published
            .iter()
            .map(|m| (m.at - started).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 5, 10]);

        let readings: Vec<Reading> = published.iter().map(|m| m.reading().unwrap()).collect();
        for reading in &readings {
            assert_eq!(reading.device_id.as_str(), "temp_sensor_001");
            assert!(matches!(reading.data, Measurements::TemperatureHumidity(_)));
        }
        for m in &published {
            assert_eq!(m.topic, "devices/temperature_humidity/temp_sensor_001/data");
        }
        for pair in readings.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_second_start_while_running() {
        let transport = connected();
        let mut device = device(&transport, "l1", DeviceKind::Light, Duration::from_secs(5));

        device.start().unwrap();
        let result = device.start();
        assert!(matches!(result, Err(DeviceError::AlreadyRunning(_))));

        tokio::time::sleep(Duration::from_millis(100)).await;
        device.stop().await.unwrap();
        assert_eq!(transport.published().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_publish_after_stop_returns() {
        let transport = connected();
        let mut device = device(&transport, "m1", DeviceKind::Motion, Duration::from_secs(1));

        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        device.stop().await.unwrap();
        assert!(!device.is_running());

        let count = transport.published().len();
        assert!(count >= 1);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.published().len(), count);
    }

    #[tokio::test(start_paused = true)]
    async fn should_interrupt_sleep_when_stopped() {
        let transport = connected();
        let mut device = device(&transport, "s1", DeviceKind::SmartSwitch, Duration::from_secs(3_600));

        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let before = Instant::now();
        device.stop().await.unwrap();
        assert!(before.elapsed() < Duration::from_secs(1));
    }

    /// Transport whose publishes never complete, like a client whose request
    /// queue is full while the broker is away.
    struct Stalled;

    impl Transport for Stalled {
        async fn connect(
            &self,
            _events: Arc<dyn crate::ports::TransportEvents>,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn subscribe(&self, _filter: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_while_publish_is_pending() {
        let mut device = DeviceBuilder::new(DeviceId::new("stuck").unwrap(), DeviceKind::SmartSwitch)
            .seed(3)
            .build(Arc::new(Stalled))
            .unwrap();

        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let stopped = tokio::time::timeout(Duration::from_secs(3_600), device.stop()).await;
        assert!(matches!(stopped, Ok(Ok(()))));
        assert!(!device.is_running());

        // The simulation state came back from the loop, so a restart works.
        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        device.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_publishing_after_transient_failure() {
        let transport = connected();
        transport.fail_next_publishes(1);
        let mut device = device(&transport, "t1", DeviceKind::TemperatureHumidity, Duration::from_secs(5));
        let started = Instant::now();

        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(6_500)).await;
        device.stop().await.unwrap();

        assert_eq!(transport.attempts(), 3);
        let offsets: Vec<u64> = transport
            .published()
            .iter()
            .map(|m| (m.at - started).as_secs())
            .collect();
        assert_eq!(offsets, vec![1, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_retrying_while_transport_disconnected() {
        let transport = Arc::new(InMemoryTransport::new());
        let mut device = device(&transport, "t2", DeviceKind::Light, Duration::from_secs(5));

        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert!(device.is_running());
        device.stop().await.unwrap();

        assert_eq!(transport.attempts(), 4);
        assert!(transport.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_restart_after_stop() {
        let transport = connected();
        let mut device = device(&transport, "s2", DeviceKind::SmartSwitch, Duration::from_secs(1));

        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        device.stop().await.unwrap();
        device.start().unwrap();
        assert!(device.is_running());
        tokio::time::sleep(Duration::from_millis(500)).await;
        device.stop().await.unwrap();

        assert_eq!(transport.published().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_end_loop_when_device_dropped() {
        let transport = connected();
        let mut device = device(&transport, "d1", DeviceKind::Motion, Duration::from_secs(1));

        device.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(device);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(transport.published().len(), 1);
    }

    #[tokio::test]
    async fn should_treat_stop_on_idle_device_as_noop() {
        let transport = Arc::new(InMemoryTransport::new());
        let mut device = device(&transport, "idle", DeviceKind::Light, Duration::from_secs(1));
        assert!(device.stop().await.is_ok());
        assert!(!device.status().running);
    }

    #[test]
    fn should_report_status_snapshot() {
        let transport = Arc::new(InMemoryTransport::new());
        let device = device(&transport, "st", DeviceKind::Light, Duration::from_secs(8));
        assert_eq!(
            device.status(),
            DeviceStatus {
                id: DeviceId::new("st").unwrap(),
                kind: DeviceKind::Light,
                interval: Duration::from_secs(8),
                running: false,
            }
        );
    }
}
