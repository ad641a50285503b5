//! End-to-end lifecycle tests for a simulated fleet.
//!
//! Each test wires a [`DeviceManager`] to the in-memory transport, the same
//! way `fleetsimd` does in dry-run mode, and drives it on a paused tokio
//! clock so intervals elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use fleetsim_app::device::DeviceBuilder;
use fleetsim_app::manager::{DeviceManager, ManagerError};
use fleetsim_app::memory::InMemoryTransport;
use fleetsim_domain::device::DeviceKind;
use fleetsim_domain::id::DeviceId;
use fleetsim_domain::reading::{Measurements, SwitchState};
use tokio::time::Instant;

fn fleet(transport: &Arc<InMemoryTransport>) -> DeviceManager<InMemoryTransport> {
    let mut manager = DeviceManager::new(Arc::clone(transport));
    let devices = [
        ("temp_sensor_001", DeviceKind::TemperatureHumidity, 5),
        ("light_sensor_001", DeviceKind::Light, 8),
        ("motion_sensor_001", DeviceKind::Motion, 10),
        ("smart_switch_001", DeviceKind::SmartSwitch, 15),
    ];
    for (seed, (id, kind, secs)) in (0_u64..).zip(devices) {
        let device = DeviceBuilder::new(DeviceId::new(id).unwrap(), kind)
            .interval(Duration::from_secs(secs))
            .seed(seed)
            .build(Arc::clone(transport))
            .unwrap();
        manager.add_device(device).unwrap();
    }
    manager
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_publish_every_device_on_its_own_schedule() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = fleet(&transport);
    manager.connect().await.unwrap();
    let started = Instant::now();

    assert_eq!(manager.start_all(), 4);
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(manager.stop_all().await, 4);

    let published = transport.published();
    let offsets = |topic: &str| -> Vec<u64> {
        published
            .iter()
            .filter(|m| m.topic == topic)
            .map(|m| (m.at - started).as_secs())
            .collect()
    };
    assert_eq!(
        offsets("devices/temperature_humidity/temp_sensor_001/data"),
        vec![0, 5, 10, 15, 20, 25, 30]
    );
    assert_eq!(offsets("devices/light/light_sensor_001/data"), vec![0, 8, 16, 24]);
    assert_eq!(offsets("devices/motion/motion_sensor_001/data"), vec![0, 10, 20, 30]);
    assert_eq!(offsets("devices/smart_switch/smart_switch_001/data"), vec![0, 15, 30]);
}

#[tokio::test(start_paused = true)]
async fn should_publish_readings_within_documented_ranges() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = fleet(&transport);
    manager.connect().await.unwrap();

    manager.start_all();
    tokio::time::sleep(Duration::from_secs(600)).await;
    manager.disconnect().await.unwrap();

    let published = transport.published();
    assert!(published.len() > 100);
    for message in &published {
        let reading = message.reading().unwrap();
        assert_eq!(message.topic, reading.topic());
        match reading.data {
            Measurements::TemperatureHumidity(data) => {
                assert!((0.0..=100.0).contains(&data.humidity));
            }
            Measurements::Light(data) => assert!(data.light_intensity >= 0.0),
            Measurements::Motion(data) => {
                assert!(data.detection_count <= 5);
                if !data.motion_detected {
                    assert_eq!(data.detection_count, 0);
                }
            }
            Measurements::SmartSwitch(data) => match data.switch_state {
                SwitchState::Off => assert!(data.power_consumption.abs() < f64::EPSILON),
                SwitchState::On => assert!((5.0..=100.0).contains(&data.power_consumption)),
            },
        }
    }
}

#[tokio::test(start_paused = true)]
async fn should_emit_documented_payload_shape() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = fleet(&transport);
    manager.connect().await.unwrap();

    manager.start_all();
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.stop_all().await;

    let message = transport
        .published()
        .into_iter()
        .find(|m| m.topic.ends_with("temp_sensor_001/data"))
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
    assert_eq!(json["device_id"], "temp_sensor_001");
    assert_eq!(json["device_type"], "temperature_humidity");
    assert!(json["timestamp"].is_string());
    assert_eq!(json["data"]["unit_temp"], "°C");
    assert_eq!(json["data"]["unit_humidity"], "%");
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_not_publish_after_stop_all_returns() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = fleet(&transport);
    manager.connect().await.unwrap();

    manager.start_all();
    tokio::time::sleep(Duration::from_secs(12)).await;
    manager.stop_all().await;
    assert!(manager.devices().iter().all(|status| !status.running));

    let count = transport.attempts();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.attempts(), count);
}

#[tokio::test(start_paused = true)]
async fn should_stop_promptly_even_with_long_intervals() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = DeviceManager::new(Arc::clone(&transport));
    let device = DeviceBuilder::new(DeviceId::new("slow").unwrap(), DeviceKind::Motion)
        .interval(Duration::from_secs(86_400))
        .build(Arc::clone(&transport))
        .unwrap();
    manager.add_device(device).unwrap();
    manager.connect().await.unwrap();
    manager.start_all();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let before = Instant::now();
    manager.disconnect().await.unwrap();
    assert!(before.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn should_restart_fleet_after_stop_all() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = fleet(&transport);
    manager.connect().await.unwrap();

    manager.start_all();
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.stop_all().await;
    assert_eq!(transport.published().len(), 4);

    assert_eq!(manager.start_all(), 4);
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.stop_all().await;
    assert_eq!(transport.published().len(), 8);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_keep_other_devices_publishing_after_a_failure() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = fleet(&transport);
    manager.connect().await.unwrap();
    transport.fail_next_publishes(1);

    manager.start_all();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    manager.stop_all().await;

    // One of the four initial publishes failed and was retried a second later.
    assert_eq!(transport.attempts(), 5);
    assert_eq!(transport.published().len(), 4);
}

#[tokio::test]
async fn should_surface_connection_failure() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.reject_connections(true);
    let mut manager = fleet(&transport);

    let result = manager.connect().await;
    assert!(matches!(result, Err(ManagerError::Connect(_))));
    assert!(!manager.is_connected());
}

#[test]
fn should_reject_duplicate_registration() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = fleet(&transport);
    let duplicate = DeviceBuilder::new(DeviceId::new("light_sensor_001").unwrap(), DeviceKind::Light)
        .build(Arc::clone(&transport))
        .unwrap();

    let result = manager.add_device(duplicate);
    assert!(matches!(result, Err(ManagerError::DuplicateDevice(_))));
    assert_eq!(manager.len(), 4);
}

// ---------------------------------------------------------------------------
// Control topics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_receive_control_commands_for_any_device() {
    let transport = Arc::new(InMemoryTransport::new());
    let mut manager = fleet(&transport);
    let mut commands = manager.subscribe_commands();
    manager.connect().await.unwrap();

    assert_eq!(transport.subscriptions(), vec!["devices/+/+/control"]);

    transport.deliver("devices/light/light_sensor_001/control", b"not json");
    transport.deliver(
        "devices/smart_switch/smart_switch_001/control",
        br#"{"action": "toggle"}"#,
    );

    let command = commands.recv().await.unwrap();
    assert_eq!(command.device_type, DeviceKind::SmartSwitch);
    assert_eq!(command.device_id.as_str(), "smart_switch_001");
    assert_eq!(command.command["action"], "toggle");
}
