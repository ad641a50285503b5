//! [`Transport`] implementation backed by a rumqttc client.
//!
//! `connect` polls the rumqttc event loop until the broker's CONNACK, then
//! hands the event loop to a driver task. The driver keeps polling (rumqttc
//! reconnects on the next poll after an error), forwards incoming publishes
//! and connection changes to the [`TransportEvents`] handler, and renews
//! subscriptions after every reconnect since sessions are clean.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;

use fleetsim_app::ports::{Transport, TransportError, TransportEvents};

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Capacity of the request channel between the client and its event loop.
const REQUEST_CAPACITY: usize = 64;

/// Pause before the driver polls again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// How long `disconnect` waits for the driver to observe the DISCONNECT.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct Session {
    client: AsyncClient,
    qos: QoS,
    driver: JoinHandle<()>,
}

/// MQTT transport shared by every simulated device.
pub struct MqttTransport {
    config: MqttConfig,
    subscriptions: Arc<Mutex<Vec<String>>>,
    session: Mutex<Option<Session>>,
}

impl MqttTransport {
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            subscriptions: Arc::default(),
            session: Mutex::new(None),
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone the client out of the session so no lock is held across awaits.
    fn client(&self) -> Result<(AsyncClient, QoS), MqttError> {
        self.session()
            .as_ref()
            .map(|session| (session.client.clone(), session.qos))
            .ok_or(MqttError::NotConnected)
    }

    async fn open(&self, events: Arc<dyn TransportEvents>) -> Result<(), MqttError> {
        let qos = self.config.qos()?;
        let (client, mut eventloop) = AsyncClient::new(self.config.options(), REQUEST_CAPACITY);

        tokio::time::timeout(self.config.connect_timeout(), wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| MqttError::ConnectTimeout)??;
        tracing::info!(
            host = %self.config.broker_host,
            port = self.config.broker_port,
            client_id = %self.config.client_id,
            "connected to MQTT broker"
        );

        lock(&self.subscriptions).clear();
        events.on_connect();

        let driver = Driver {
            client: client.clone(),
            qos,
            subscriptions: Arc::clone(&self.subscriptions),
            events,
        };
        let driver = tokio::spawn(driver.run(eventloop));

        let previous = self.session().replace(Session {
            client,
            qos,
            driver,
        });
        if let Some(previous) = previous {
            tracing::warn!("replacing an open MQTT session");
            previous.driver.abort();
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), MqttError> {
        let Some(mut session) = self.session().take() else {
            return Ok(());
        };
        let result = session
            .client
            .try_disconnect()
            .map_err(MqttError::Disconnect);

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut session.driver)
            .await
            .is_err()
        {
            tracing::warn!("MQTT driver did not stop in time, aborting it");
            session.driver.abort();
        }
        result
    }
}

impl Transport for MqttTransport {
    async fn connect(&self, events: Arc<dyn TransportEvents>) -> Result<(), TransportError> {
        self.open(events).await.map_err(TransportError::from)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        // Never wait for room in the request queue: while the broker is away
        // the event loop stops draining it, and the device backs off instead.
        let (client, qos) = self.client()?;
        client
            .try_publish(topic, qos, false, payload)
            .map_err(MqttError::Publish)?;
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        let (client, qos) = self.client()?;
        client
            .subscribe(filter, qos)
            .await
            .map_err(MqttError::Subscribe)?;
        lock(&self.subscriptions).push(filter.to_string());
        tracing::debug!(%filter, "subscribed");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.close().await?;
        tracing::info!("disconnected from MQTT broker");
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), MqttError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(err) => return Err(MqttError::Connection(err)),
        }
    }
}

/// Owns the event loop once the first connection is established.
struct Driver {
    client: AsyncClient,
    qos: QoS,
    subscriptions: Arc<Mutex<Vec<String>>>,
    events: Arc<dyn TransportEvents>,
}

impl Driver {
    async fn run(self, mut eventloop: EventLoop) {
        let mut online = true;
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.events.on_message(&publish.topic, &publish.payload);
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    online = true;
                    tracing::info!("reconnected to MQTT broker");
                    self.resubscribe();
                    self.events.on_connect();
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    self.events.on_disconnect(None);
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    if online {
                        online = false;
                        self.events.on_disconnect(Some(&err));
                    }
                    tracing::debug!(%err, "MQTT connection error, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// Queue subscriptions without awaiting: the request channel is drained
    /// by this very loop.
    fn resubscribe(&self) {
        let filters = lock(&self.subscriptions).clone();
        for filter in filters {
            if let Err(err) = self.client.try_subscribe(filter.as_str(), self.qos) {
                tracing::warn!(%filter, %err, "failed to renew subscription");
            }
        }
    }
}
