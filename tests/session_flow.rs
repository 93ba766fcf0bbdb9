//! End-to-end session tests against the simulated locker service.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use locker_companion::locker::{Environment, LockerConfig, SimConfig, SimDevice};
use locker_companion::{
    ConnectionStatus, FixedGate, LockerDevice, LockerError, LockerService, LogJournal,
    PlatformGate, SessionController, SimulatedLocker, ValidationType,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn quick_sim() -> SimConfig {
    SimConfig {
        devices: vec![SimDevice::new(LockerDevice::new("JB-0001", true), ms(10))],
        connect_latency: ms(5),
        operation_latency: ms(5),
        ..SimConfig::default()
    }
}

struct Harness {
    gate: Arc<FixedGate>,
    journal: Arc<LogJournal>,
    controller: Arc<SessionController>,
}

fn start_session(sim: SimConfig, gate: FixedGate, timeout: Option<Duration>) -> Harness {
    let journal = Arc::new(LogJournal::new());
    let config = LockerConfig {
        environment: Environment::Test,
        ..LockerConfig::default()
    };
    let locker = Arc::new(SimulatedLocker::new(config, sim, journal.clone()));
    let gate = Arc::new(gate);
    let controller = SessionController::start(
        locker as Arc<dyn LockerService>,
        gate.clone() as Arc<dyn PlatformGate>,
        journal.clone(),
        timeout,
    );
    Harness {
        gate,
        journal,
        controller,
    }
}

async fn wait_for_status(controller: &SessionController, status: ConnectionStatus) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while controller.connection_status() != status {
            tokio::time::sleep(ms(5)).await;
        }
    })
    .await
    .expect("status not reached in time");
}

async fn wait_for_connectable(controller: &SessionController) -> LockerDevice {
    let mut nearby = controller.nearby_devices();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let snapshot = nearby.borrow_and_update();
                if let Some(found) = snapshot.iter().find(|d| d.is_connectable) {
                    return found.clone();
                }
            }
            nearby.changed().await.expect("device stream closed");
        }
    })
    .await
    .expect("no connectable device discovered")
}

#[tokio::test]
async fn scan_is_rejected_without_permissions() {
    let h = start_session(quick_sim(), FixedGate::new(), None);

    assert_eq!(
        h.controller.start_scan().await,
        Err(LockerError::PermissionDenied)
    );
    assert!(!h.controller.scan_active());
}

#[tokio::test]
async fn scan_is_rejected_when_radio_disabled() {
    let h = start_session(quick_sim(), FixedGate::pre_granted(), None);
    h.controller.refresh_permissions();
    h.gate.set_radio(false);

    assert_eq!(
        h.controller.start_scan().await,
        Err(LockerError::RadioDisabled)
    );
    assert!(!h.controller.scan_active());

    h.gate.set_radio(true);
    h.controller.start_scan().await.unwrap();
    assert!(h.controller.scan_active());
}

#[tokio::test]
async fn permission_flag_follows_the_platform_callback() {
    let h = start_session(quick_sim(), FixedGate::new(), None);
    assert!(!h.controller.permissions_granted());

    assert!(h.controller.request_permissions().await);
    assert!(h.controller.permissions_granted());

    let refused = start_session(quick_sim(), FixedGate::refusing(), None);
    assert!(!refused.controller.request_permissions().await);
    assert!(!refused.controller.permissions_granted());
}

#[tokio::test]
async fn open_lock_without_connection_is_not_connected() {
    let h = start_session(quick_sim(), FixedGate::pre_granted(), None);

    // Precisely NotConnected, not a connection failure.
    assert_eq!(
        h.controller.open_lock(12345).await,
        Err(LockerError::NotConnected)
    );
}

#[tokio::test]
async fn failed_connect_leaves_state_disconnected() {
    let mut sim = quick_sim();
    sim.refuse_connect = HashSet::from(["JB-0001".to_string()]);
    let h = start_session(sim, FixedGate::pre_granted(), None);

    let device = LockerDevice::new("JB-0001", true);
    assert!(matches!(
        h.controller.connect(&device).await,
        Err(LockerError::ConnectionFailed(_))
    ));
    assert_eq!(
        h.controller.connection_status(),
        ConnectionStatus::Disconnected
    );
    assert!(h.controller.connected_device().is_none());
}

#[tokio::test]
async fn full_session_flow() {
    let h = start_session(quick_sim(), FixedGate::new(), None);

    assert!(h.controller.request_permissions().await);
    assert!(h.controller.radio_enabled().await);
    h.controller.start_scan().await.unwrap();

    let device = wait_for_connectable(&h.controller).await;
    h.controller.connect(&device).await.unwrap();
    assert_eq!(
        h.controller.connection_status(),
        ConnectionStatus::Connected
    );
    assert_eq!(
        h.controller.connected_device().unwrap().device_id,
        device.device_id
    );

    let key = vec![0x04, 0x88, 0x20];
    let info = h
        .controller
        .get_device_info(ValidationType::DeviceKey, &key)
        .await
        .unwrap();
    assert_eq!(info.device_id, device.device_id);
    assert_eq!(info.project_id, 1734);
    assert_eq!(info.signature.len(), 64);

    h.controller.enable_encryption().await.unwrap();
    h.controller.open_lock(12345).await.unwrap();

    h.controller.disconnect();
    wait_for_status(&h.controller, ConnectionStatus::Disconnected).await;

    h.controller.stop_scan();
    assert!(!h.controller.scan_active());
    assert!(!h.journal.is_empty());

    h.controller.shutdown();
}

#[tokio::test]
async fn wrong_credential_is_an_operation_failure() {
    let h = start_session(quick_sim(), FixedGate::pre_granted(), None);

    let device = LockerDevice::new("JB-0001", true);
    h.controller.connect(&device).await.unwrap();

    assert_eq!(
        h.controller.open_lock(999).await,
        Err(LockerError::OperationFailed("invalid credential".into()))
    );
}

#[tokio::test]
async fn connect_while_connected_tears_down_first() {
    let mut sim = quick_sim();
    sim.devices = vec![
        SimDevice::new(LockerDevice::new("JB-0001", true), ms(10)),
        SimDevice::new(LockerDevice::new("JB-0002", true), ms(10)),
    ];
    let h = start_session(sim, FixedGate::pre_granted(), None);

    let first = LockerDevice::new("JB-0001", true);
    let second = LockerDevice::new("JB-0002", true);

    h.controller.connect(&first).await.unwrap();
    assert_eq!(h.controller.connected_device().unwrap().device_id, "JB-0001");

    // The simulator refuses overlapping connections, so success here
    // proves the previous one was fully torn down first.
    h.controller.connect(&second).await.unwrap();
    assert_eq!(h.controller.connected_device().unwrap().device_id, "JB-0002");

    let log = h.journal.export();
    assert!(log.contains("disconnecting previous connection"));
}

#[tokio::test]
async fn disconnect_when_disconnected_is_a_noop() {
    let h = start_session(quick_sim(), FixedGate::pre_granted(), None);

    h.controller.disconnect();
    h.controller.disconnect();
    assert_eq!(
        h.controller.connection_status(),
        ConnectionStatus::Disconnected
    );

    // stop_scan is likewise idempotent.
    h.controller.stop_scan();
    h.controller.stop_scan();
    assert!(!h.controller.scan_active());
}

#[tokio::test]
async fn configured_timeout_bounds_operations() {
    let mut sim = quick_sim();
    sim.operation_latency = ms(500);
    let h = start_session(sim, FixedGate::pre_granted(), Some(ms(30)));

    let device = LockerDevice::new("JB-0001", true);
    h.controller.connect(&device).await.unwrap();

    assert_eq!(
        h.controller.open_lock(12345).await,
        Err(LockerError::OperationFailed("timed out".into()))
    );
}
