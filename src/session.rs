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

//! Session controller.
//!
//! Sequences permission checks, radio checks, scan control, connect and
//! disconnect, and the per-connection locker operations, and translates
//! service events into state a UI can render. Owns no protocol logic.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::LockerError;
use crate::journal::LogJournal;
use crate::locker::{
    ConnectionEvent, DeviceEvent, DeviceInfo, LockerDevice, LockerService, ValidationType,
};
use crate::platform::PlatformGate;

const TAG: &str = "session";

/// Connection status as rendered to the user.
///
/// `Connecting` is derived from a request in flight; the controller itself
/// only stores connected-or-not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    connected: Option<LockerDevice>,
    connecting: bool,
    permissions_granted: bool,
    scan_active: bool,
}

/// Mediates between the UI and the locker service.
pub struct SessionController {
    locker: Arc<dyn LockerService>,
    gate: Arc<dyn PlatformGate>,
    journal: Arc<LogJournal>,
    operation_timeout: Option<Duration>,
    state: RwLock<SessionState>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Create the controller and subscribe to the service's device and
    /// connection streams. `operation_timeout` bounds each awaited service
    /// call when set; the default is to wait as long as the service does.
    pub fn start(
        locker: Arc<dyn LockerService>,
        gate: Arc<dyn PlatformGate>,
        journal: Arc<LogJournal>,
        operation_timeout: Option<Duration>,
    ) -> Arc<Self> {
        let controller = Arc::new(Self {
            locker,
            gate,
            journal,
            operation_timeout,
            state: RwLock::new(SessionState::default()),
            pump: Mutex::new(None),
        });
        controller.spawn_pump();
        controller
    }

    /// Drop the service subscriptions and stop processing events.
    pub fn shutdown(&self) {
        if let Some(task) = self.pump.lock().take() {
            task.abort();
            info!("Session listeners unregistered");
        }
    }

    // ---- state accessors ------------------------------------------------

    pub fn connection_status(&self) -> ConnectionStatus {
        let state = self.state.read();
        if state.connected.is_some() {
            ConnectionStatus::Connected
        } else if state.connecting {
            ConnectionStatus::Connecting
        } else {
            ConnectionStatus::Disconnected
        }
    }

    pub fn connected_device(&self) -> Option<LockerDevice> {
        self.state.read().connected.clone()
    }

    pub fn permissions_granted(&self) -> bool {
        self.state.read().permissions_granted
    }

    pub fn scan_active(&self) -> bool {
        self.state.read().scan_active
    }

    /// Live device-set snapshots, for the presenter layer.
    pub fn nearby_devices(&self) -> watch::Receiver<Vec<LockerDevice>> {
        self.locker.nearby_devices()
    }

    // ---- permission and radio gate --------------------------------------

    /// Prompt for the platform's required permissions. The granted flag
    /// changes only when the platform reports the outcome.
    pub async fn request_permissions(&self) -> bool {
        let list = self.gate.required_permissions();
        self.journal
            .append(TAG, format!("requestPermissions: {}", list.join(", ")));

        let granted = self.gate.request_permissions().await;
        self.journal.append(TAG, format!("permissions: {}", granted));
        self.state.write().permissions_granted = granted;
        granted
    }

    /// Re-read the platform's permission state, e.g. after returning from
    /// system settings.
    pub fn refresh_permissions(&self) -> bool {
        let granted = self.gate.permissions_granted();
        self.state.write().permissions_granted = granted;
        granted
    }

    pub async fn radio_enabled(&self) -> bool {
        self.gate.radio_enabled().await
    }

    pub async fn request_radio_enable(&self) -> Result<(), LockerError> {
        self.journal.append(TAG, "requestBluetoothEnable");
        self.gate.request_radio_enable().await
    }

    // ---- scan control ----------------------------------------------------

    /// Begin discovery. Fails without side effect when permissions are
    /// missing or the radio is off.
    pub async fn start_scan(&self) -> Result<(), LockerError> {
        self.journal.append(TAG, "startScan");

        if !self.state.read().permissions_granted {
            self.journal.append(TAG, "startScan rejected: permissions missing");
            return Err(LockerError::PermissionDenied);
        }
        if !self.gate.radio_enabled().await {
            self.journal.append(TAG, "startScan rejected: radio disabled");
            return Err(LockerError::RadioDisabled);
        }

        self.locker.start_searching().map_err(|e| {
            self.journal.append(TAG, format!("startSearching failed: {e}"));
            e
        })?;
        self.state.write().scan_active = true;
        Ok(())
    }

    /// Stop discovery. Always succeeds locally; idempotent.
    pub fn stop_scan(&self) {
        self.journal.append(TAG, "stopScan");
        self.locker.stop_searching();
        self.state.write().scan_active = false;
    }

    // ---- connection lifecycle -------------------------------------------

    /// Connect to `device`. An already-active connection is fully torn
    /// down first; the two never overlap.
    pub async fn connect(&self, device: &LockerDevice) -> Result<(), LockerError> {
        {
            let mut state = self.state.write();
            if state.connecting {
                return Err(LockerError::ConnectionFailed(
                    "connect already in progress".into(),
                ));
            }
            state.connecting = true;
        }

        let result = self.connect_inner(device).await;

        {
            let mut state = self.state.write();
            state.connecting = false;
            if result.is_ok() {
                state.connected = Some(device.clone());
            }
        }

        match &result {
            Ok(()) => self
                .journal
                .append(TAG, format!("connected: {}", device.device_id)),
            Err(e) => self.journal.append(TAG, format!("connect failed: {e}")),
        }
        result
    }

    async fn connect_inner(&self, device: &LockerDevice) -> Result<(), LockerError> {
        // Read and release; the lock must not be held across the awaits
        // below or the event pump stalls.
        let already_connected = self.state.read().connected.is_some();
        if already_connected {
            let mut events = self.locker.subscribe_connection();
            self.journal.append(TAG, "disconnecting previous connection");
            self.locker.disconnect();

            let wait = self.await_disconnected(&mut events);
            match self.operation_timeout {
                Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                    LockerError::ConnectionFailed("timed out waiting for disconnect".into())
                })??,
                None => wait.await?,
            }
            self.state.write().connected = None;
        }

        self.journal.append(
            TAG,
            format!("try connect, connectable = {}", device.is_connectable),
        );
        self.with_timeout(self.locker.connect(device), || {
            LockerError::ConnectionFailed("timed out".into())
        })
        .await
    }

    async fn await_disconnected(
        &self,
        events: &mut broadcast::Receiver<ConnectionEvent>,
    ) -> Result<(), LockerError> {
        loop {
            match events.recv().await {
                Ok(ConnectionEvent::Disconnected) => return Ok(()),
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => {
                    // Missed notifications; fall back to pumped state.
                    if self.state.read().connected.is_none() {
                        return Ok(());
                    }
                }
                Err(RecvError::Closed) => {
                    return Err(LockerError::ConnectionFailed(
                        "connection events closed".into(),
                    ))
                }
            }
        }
    }

    /// Request teardown of the active connection. State changes when the
    /// service reports the disconnect, not eagerly. No-op when already
    /// disconnected.
    pub fn disconnect(&self) {
        self.journal.append(TAG, "disconnect");
        self.locker.disconnect();
    }

    // ---- locker operations ----------------------------------------------

    /// Fetch device info from the connected locker.
    pub async fn get_device_info(
        &self,
        validation: ValidationType,
        key: &[u8],
    ) -> Result<DeviceInfo, LockerError> {
        let result = self
            .with_timeout(self.locker.get_device_info(validation, key), || {
                LockerError::OperationFailed("timed out".into())
            })
            .await;
        match &result {
            Ok(info) => self.journal.append(
                TAG,
                format!("getDeviceInfo: {} / project {}", info.device_id, info.project_id),
            ),
            Err(e) => self.journal.append(TAG, format!("getDeviceInfo failed: {e}")),
        }
        result
    }

    /// Upgrade the active connection to an encrypted channel.
    pub async fn enable_encryption(&self) -> Result<(), LockerError> {
        let result = self
            .with_timeout(self.locker.enable_encryption(), || {
                LockerError::OperationFailed("timed out".into())
            })
            .await;
        self.journal
            .append(TAG, format!("enableEncryption: {:?}", result));
        result
    }

    /// Ask the connected locker to open. The credential goes through
    /// unvalidated; the locker is the judge of it.
    pub async fn open_lock(&self, credential: u64) -> Result<(), LockerError> {
        let result = self
            .with_timeout(self.locker.open_lock(credential), || {
                LockerError::OperationFailed("timed out".into())
            })
            .await;
        self.journal.append(TAG, format!("openLock: {:?}", result));
        result
    }

    // ---- internals -------------------------------------------------------

    async fn with_timeout<T, F>(
        &self,
        fut: F,
        on_timeout: fn() -> LockerError,
    ) -> Result<T, LockerError>
    where
        F: Future<Output = Result<T, LockerError>>,
    {
        match self.operation_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(on_timeout()),
            },
            None => fut.await,
        }
    }

    fn spawn_pump(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let mut connection_rx = self.locker.subscribe_connection();
        let mut device_rx = self.locker.subscribe_devices();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = connection_rx.recv() => match event {
                        Ok(event) => {
                            let Some(controller) = weak.upgrade() else { break };
                            controller.on_connection_event(event);
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!("Connection events lagged, missed {}", missed);
                        }
                        Err(RecvError::Closed) => break,
                    },
                    event = device_rx.recv() => match event {
                        Ok(event) => {
                            let Some(controller) = weak.upgrade() else { break };
                            controller.on_device_event(&event);
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!("Device events lagged, missed {}", missed);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });
        *self.pump.lock() = Some(handle);
    }

    fn on_connection_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected(device) => {
                self.journal
                    .append(TAG, format!("onConnected: {}", device.device_id));
                self.state.write().connected = Some(device);
            }
            ConnectionEvent::Disconnected => {
                self.journal.append(TAG, "onDisconnected");
                self.state.write().connected = None;
            }
        }
    }

    fn on_device_event(&self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Found(device) => {
                self.journal.append(TAG, format!("onFound: {}", device));
            }
            DeviceEvent::Lost(device) => {
                self.journal.append(TAG, format!("onLost: {}", device));
            }
            DeviceEvent::Changed(device) => {
                self.journal.append(TAG, format!("onChanged: {}", device));
            }
            DeviceEvent::Error(message) => {
                self.journal
                    .append(TAG, format!("device listener error: {}", message));
            }
        }
    }
}
