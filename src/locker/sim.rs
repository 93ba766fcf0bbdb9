// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-process locker service simulator.
//!
//! Scripted stand-in for the vendor service: devices appear, change, and
//! vanish on a configurable timeline, connections carry latency, and the
//! per-connection operations behave like the real thing (connection
//! required, credential checked). Drives the demo binary and the tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::RngCore;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use super::config::LockerConfig;
use super::device::{DeviceInfo, LockerDevice, ValidationType};
use super::service::{ConnectionEvent, DeviceEvent, LockerService};
use crate::error::LockerError;
use crate::journal::LogJournal;

const TAG: &str = "locker";

/// One scripted device on the discovery timeline.
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub device: LockerDevice,
    /// Delay from scan start until the device is first reported.
    pub appears_after: Duration,
    /// If set, the device drops out of sight this long after appearing.
    pub lost_after: Option<Duration>,
    /// If set, the connectability flag flips this long after appearing.
    pub flips_connectable_after: Option<Duration>,
}

impl SimDevice {
    pub fn new(device: LockerDevice, appears_after: Duration) -> Self {
        Self {
            device,
            appears_after,
            lost_after: None,
            flips_connectable_after: None,
        }
    }
}

/// Simulator behavior knobs.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub devices: Vec<SimDevice>,
    /// Latency of a connect attempt.
    pub connect_latency: Duration,
    /// Latency of each per-connection operation.
    pub operation_latency: Duration,
    /// Device ids that refuse every connect attempt.
    pub refuse_connect: HashSet<String>,
    /// Credential the lock accepts.
    pub expected_credential: u64,
    pub project_id: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        let mut second = SimDevice::new(
            LockerDevice::new("JB-1734-0002", false),
            Duration::from_millis(900),
        );
        second.flips_connectable_after = Some(Duration::from_millis(600));

        let mut third = SimDevice::new(
            LockerDevice::new("JB-1734-0003", true),
            Duration::from_millis(400),
        );
        third.lost_after = Some(Duration::from_millis(1500));

        Self {
            devices: vec![
                SimDevice::new(
                    LockerDevice::new("JB-1734-0001", true),
                    Duration::from_millis(300),
                ),
                second,
                third,
            ],
            connect_latency: Duration::from_millis(150),
            operation_latency: Duration::from_millis(80),
            refuse_connect: HashSet::new(),
            expected_credential: 12345,
            project_id: 1734,
        }
    }
}

/// What happens at one point of the discovery timeline.
#[derive(Debug, Clone)]
enum TimelineStep {
    Appear(LockerDevice),
    Flip(String),
    Remove(String),
}

struct ActiveConnection {
    device: LockerDevice,
    encrypted: bool,
}

/// Simulated locker-connectivity service.
pub struct SimulatedLocker {
    sim: SimConfig,
    journal: Arc<LogJournal>,
    devices_tx: Arc<watch::Sender<Vec<LockerDevice>>>,
    device_events: broadcast::Sender<DeviceEvent>,
    connection_events: broadcast::Sender<ConnectionEvent>,
    connection: Mutex<Option<ActiveConnection>>,
    scan_task: Mutex<Option<JoinHandle<()>>>,
    signature: Vec<u8>,
}

impl SimulatedLocker {
    /// Initialize the service. One instance per process, like the real
    /// service's one-time init.
    pub fn new(config: LockerConfig, sim: SimConfig, journal: Arc<LogJournal>) -> Self {
        let (devices_tx, _) = watch::channel(Vec::new());
        let (device_events, _) = broadcast::channel(32);
        let (connection_events, _) = broadcast::channel(32);

        let mut signature = vec![0u8; 64];
        rand::thread_rng().fill_bytes(&mut signature);

        journal.append(
            TAG,
            format!(
                "initialized (environment = {:?}, log level = {})",
                config.environment, config.log_level
            ),
        );

        Self {
            sim,
            journal,
            devices_tx: Arc::new(devices_tx),
            device_events,
            connection_events,
            connection: Mutex::new(None),
            scan_task: Mutex::new(None),
            signature,
        }
    }

    fn build_timeline(&self) -> Vec<(Duration, TimelineStep)> {
        let mut timeline = Vec::new();
        for entry in &self.sim.devices {
            timeline.push((entry.appears_after, TimelineStep::Appear(entry.device.clone())));
            if let Some(after) = entry.flips_connectable_after {
                timeline.push((
                    entry.appears_after + after,
                    TimelineStep::Flip(entry.device.device_id.clone()),
                ));
            }
            if let Some(after) = entry.lost_after {
                timeline.push((
                    entry.appears_after + after,
                    TimelineStep::Remove(entry.device.device_id.clone()),
                ));
            }
        }
        timeline.sort_by_key(|(at, _)| *at);
        timeline
    }

    fn connected_device(&self) -> Option<LockerDevice> {
        self.connection.lock().as_ref().map(|c| c.device.clone())
    }

    async fn run_timeline(
        timeline: Vec<(Duration, TimelineStep)>,
        devices_tx: Arc<watch::Sender<Vec<LockerDevice>>>,
        device_events: broadcast::Sender<DeviceEvent>,
        journal: Arc<LogJournal>,
    ) {
        let started = Instant::now();
        let mut visible: Vec<LockerDevice> = Vec::new();

        for (at, step) in timeline {
            let elapsed = started.elapsed();
            if at > elapsed {
                sleep(at - elapsed).await;
            }

            match step {
                TimelineStep::Appear(device) => {
                    journal.append(TAG, format!("onFound: {}", device));
                    visible.push(device.clone());
                    let _ = device_events.send(DeviceEvent::Found(device));
                }
                TimelineStep::Flip(id) => {
                    if let Some(device) = visible.iter_mut().find(|d| d.device_id == id) {
                        device.is_connectable = !device.is_connectable;
                        let changed = device.clone();
                        journal.append(TAG, format!("onChanged: {}", changed));
                        let _ = device_events.send(DeviceEvent::Changed(changed));
                    }
                }
                TimelineStep::Remove(id) => {
                    if let Some(pos) = visible.iter().position(|d| d.device_id == id) {
                        let device = visible.remove(pos);
                        journal.append(TAG, format!("onLost: {}", device));
                        let _ = device_events.send(DeviceEvent::Lost(device));
                    }
                }
            }

            devices_tx.send_replace(visible.clone());
        }
    }
}

#[async_trait]
impl LockerService for SimulatedLocker {
    fn start_searching(&self) -> Result<(), LockerError> {
        let mut task = self.scan_task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            // Already scanning.
            return Ok(());
        }

        self.journal.append(TAG, "startSearching");
        let timeline = self.build_timeline();
        let devices_tx = Arc::clone(&self.devices_tx);
        let device_events = self.device_events.clone();
        let journal = Arc::clone(&self.journal);

        *task = Some(tokio::spawn(Self::run_timeline(
            timeline,
            devices_tx,
            device_events,
            journal,
        )));
        Ok(())
    }

    fn stop_searching(&self) {
        if let Some(task) = self.scan_task.lock().take() {
            task.abort();
            self.journal.append(TAG, "stopSearching");
        }
    }

    fn nearby_devices(&self) -> watch::Receiver<Vec<LockerDevice>> {
        self.devices_tx.subscribe()
    }

    async fn connect(&self, device: &LockerDevice) -> Result<(), LockerError> {
        self.journal
            .append(TAG, format!("connect requested: {}", device));

        if !device.is_connectable {
            return Err(LockerError::ConnectionFailed(
                "device is not connectable".into(),
            ));
        }
        if self.connection.lock().is_some() {
            return Err(LockerError::ConnectionFailed(
                "another connection is active".into(),
            ));
        }

        sleep(self.sim.connect_latency).await;

        if self.sim.refuse_connect.contains(&device.device_id) {
            self.journal
                .append(TAG, format!("connect refused: {}", device.device_id));
            return Err(LockerError::ConnectionFailed(
                "device refused the connection".into(),
            ));
        }

        *self.connection.lock() = Some(ActiveConnection {
            device: device.clone(),
            encrypted: false,
        });
        self.journal
            .append(TAG, format!("connected: {}", device.device_id));
        let _ = self
            .connection_events
            .send(ConnectionEvent::Connected(device.clone()));
        Ok(())
    }

    fn disconnect(&self) {
        let previous = self.connection.lock().take();
        if let Some(conn) = previous {
            self.journal
                .append(TAG, format!("disconnected: {}", conn.device.device_id));
            let _ = self.connection_events.send(ConnectionEvent::Disconnected);
        }
    }

    fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection_events.subscribe()
    }

    fn subscribe_devices(&self) -> broadcast::Receiver<DeviceEvent> {
        self.device_events.subscribe()
    }

    async fn get_device_info(
        &self,
        validation: ValidationType,
        key: &[u8],
    ) -> Result<DeviceInfo, LockerError> {
        let device = self.connected_device().ok_or(LockerError::NotConnected)?;
        if key.is_empty() {
            return Err(LockerError::OperationFailed("validation key is empty".into()));
        }

        self.journal.append(
            TAG,
            format!(
                "getDeviceInfo: validation = {:?}, key = {} bytes",
                validation,
                key.len()
            ),
        );
        sleep(self.sim.operation_latency).await;

        Ok(DeviceInfo {
            device_id: device.device_id,
            project_id: self.sim.project_id,
            signature: self.signature.clone(),
        })
    }

    async fn enable_encryption(&self) -> Result<(), LockerError> {
        if self.connection.lock().is_none() {
            return Err(LockerError::NotConnected);
        }

        sleep(self.sim.operation_latency).await;

        match self.connection.lock().as_mut() {
            Some(conn) => {
                conn.encrypted = true;
                self.journal
                    .append(TAG, format!("encryption enabled: {}", conn.device.device_id));
                Ok(())
            }
            // Connection dropped while the handshake was in flight.
            None => Err(LockerError::NotConnected),
        }
    }

    async fn open_lock(&self, credential: u64) -> Result<(), LockerError> {
        if self.connection.lock().is_none() {
            return Err(LockerError::NotConnected);
        }

        sleep(self.sim.operation_latency).await;

        let encrypted = match self.connection.lock().as_ref() {
            Some(conn) => conn.encrypted,
            None => return Err(LockerError::NotConnected),
        };
        if credential != self.sim.expected_credential {
            self.journal.append(TAG, "openLock rejected: invalid credential");
            return Err(LockerError::OperationFailed("invalid credential".into()));
        }

        self.journal
            .append(TAG, format!("openLock: lock opened (encrypted = {})", encrypted));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locker::Environment;

    fn quick_sim(devices: Vec<SimDevice>) -> SimulatedLocker {
        let sim = SimConfig {
            devices,
            connect_latency: Duration::from_millis(5),
            operation_latency: Duration::from_millis(5),
            ..SimConfig::default()
        };
        let config = LockerConfig {
            environment: Environment::Test,
            ..LockerConfig::default()
        };
        SimulatedLocker::new(config, sim, Arc::new(LogJournal::new()))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Wait until the snapshot matches the expected id list. Snapshots
    /// coalesce under load, so assert on the target state, not each step.
    async fn wait_for_ids(rx: &mut watch::Receiver<Vec<LockerDevice>>, expected: &[&str]) {
        let deadline = Duration::from_secs(2);
        tokio::time::timeout(deadline, async {
            loop {
                {
                    let snapshot = rx.borrow_and_update();
                    let ids: Vec<&str> =
                        snapshot.iter().map(|d| d.device_id.as_str()).collect();
                    if ids == expected {
                        return;
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_discovery_timeline_appear_and_lose() {
        let mut fleeting = SimDevice::new(LockerDevice::new("B", true), ms(30));
        fleeting.lost_after = Some(ms(40));
        let locker = quick_sim(vec![
            SimDevice::new(LockerDevice::new("A", true), ms(10)),
            fleeting,
        ]);

        let mut rx = locker.nearby_devices();
        locker.start_searching().unwrap();

        wait_for_ids(&mut rx, &["A", "B"]).await;
        wait_for_ids(&mut rx, &["A"]).await;
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let locker = quick_sim(vec![]);
        assert_eq!(
            locker.open_lock(12345).await,
            Err(LockerError::NotConnected)
        );
        assert_eq!(
            locker.enable_encryption().await,
            Err(LockerError::NotConnected)
        );
        assert!(matches!(
            locker.get_device_info(ValidationType::DeviceKey, &[1]).await,
            Err(LockerError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_non_connectable() {
        let locker = quick_sim(vec![]);
        let device = LockerDevice::new("A", false);
        assert!(matches!(
            locker.connect(&device).await,
            Err(LockerError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_second_connection_refused_until_disconnect() {
        let locker = quick_sim(vec![]);
        let first = LockerDevice::new("A", true);
        let second = LockerDevice::new("B", true);

        locker.connect(&first).await.unwrap();
        assert!(matches!(
            locker.connect(&second).await,
            Err(LockerError::ConnectionFailed(_))
        ));

        locker.disconnect();
        locker.connect(&second).await.unwrap();
        assert_eq!(locker.connected_device().unwrap().device_id, "B");
    }

    #[tokio::test]
    async fn test_open_lock_checks_credential() {
        let locker = quick_sim(vec![]);
        locker.connect(&LockerDevice::new("A", true)).await.unwrap();

        assert_eq!(
            locker.open_lock(999).await,
            Err(LockerError::OperationFailed("invalid credential".into()))
        );
        assert_eq!(locker.open_lock(12345).await, Ok(()));
    }

    #[tokio::test]
    async fn test_disconnect_emits_lifecycle_event() {
        let locker = quick_sim(vec![]);
        let mut events = locker.subscribe_connection();

        locker.connect(&LockerDevice::new("A", true)).await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::Connected(_)
        ));

        locker.disconnect();
        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::Disconnected
        ));

        // Disconnecting again is silent.
        locker.disconnect();
        assert!(events.try_recv().is_err());
    }
}
