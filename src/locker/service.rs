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

//! The locker service contract.

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use super::device::{DeviceInfo, LockerDevice, ValidationType};
use crate::error::LockerError;

/// Connection lifecycle notifications.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A connection to the device was established.
    Connected(LockerDevice),
    /// The active connection ended, whether requested or lost.
    Disconnected,
}

/// Discovery notifications for individual devices.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Found(LockerDevice),
    Lost(LockerDevice),
    Changed(LockerDevice),
    Error(String),
}

/// Client-facing surface of the locker-connectivity service.
///
/// Discovery publishes whole-set snapshots through [`nearby_devices`]
/// (replace-on-emit, insertion-ordered); the per-device and per-connection
/// listener registrations are modeled as broadcast subscriptions, where
/// dropping the receiver unsubscribes. Operations that need an active
/// connection fail with [`LockerError::NotConnected`] otherwise; that check
/// belongs to the service, not the caller.
///
/// [`nearby_devices`]: LockerService::nearby_devices
#[async_trait]
pub trait LockerService: Send + Sync {
    /// Begin device discovery.
    fn start_searching(&self) -> Result<(), LockerError>;

    /// Stop device discovery. Idempotent; never fails.
    fn stop_searching(&self);

    /// Live snapshots of the currently visible device set.
    fn nearby_devices(&self) -> watch::Receiver<Vec<LockerDevice>>;

    /// Establish a connection to `device`.
    async fn connect(&self, device: &LockerDevice) -> Result<(), LockerError>;

    /// Tear down the active connection, if any. Completion is reported
    /// through [`ConnectionEvent::Disconnected`], not the return.
    fn disconnect(&self);

    /// Subscribe to connection lifecycle events.
    fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionEvent>;

    /// Subscribe to device discovery events.
    fn subscribe_devices(&self) -> broadcast::Receiver<DeviceEvent>;

    /// Fetch identity and signature data from the connected device.
    async fn get_device_info(
        &self,
        validation: ValidationType,
        key: &[u8],
    ) -> Result<DeviceInfo, LockerError>;

    /// Upgrade the active connection to an encrypted channel.
    async fn enable_encryption(&self) -> Result<(), LockerError>;

    /// Ask the connected locker to open, presenting `credential`.
    async fn open_lock(&self, credential: u64) -> Result<(), LockerError>;
}
