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

//! Permission and radio gate.
//!
//! OS-level preconditions for talking to the locker service: runtime
//! permissions and Bluetooth radio enablement. The BlueZ implementation
//! covers Linux; the fixed implementation scripts both answers for the
//! demo fallback and the tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use crate::error::LockerError;

/// OS collaborator guarding locker access.
#[async_trait]
pub trait PlatformGate: Send + Sync {
    /// Permissions the platform requires before scanning.
    fn required_permissions(&self) -> Vec<String>;

    /// Whether every required permission is currently granted.
    fn permissions_granted(&self) -> bool;

    /// Prompt the user. Resolves once the platform reports back; `true`
    /// only when all required permissions were granted.
    async fn request_permissions(&self) -> bool;

    /// Whether the Bluetooth radio is powered.
    async fn radio_enabled(&self) -> bool;

    /// Ask the platform to power the radio on.
    async fn request_radio_enable(&self) -> Result<(), LockerError>;
}

/// BlueZ-backed gate.
///
/// Linux has no runtime-permission model for Bluetooth, so the permission
/// side is trivially granted; the radio side maps to adapter power.
pub struct BluezGate {
    adapter: bluer::Adapter,
}

impl BluezGate {
    /// Connect to the BlueZ daemon and pick the default adapter.
    pub async fn new() -> anyhow::Result<Self> {
        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        info!("Using Bluetooth adapter: {}", adapter.name());
        Ok(Self { adapter })
    }
}

#[async_trait]
impl PlatformGate for BluezGate {
    fn required_permissions(&self) -> Vec<String> {
        Vec::new()
    }

    fn permissions_granted(&self) -> bool {
        true
    }

    async fn request_permissions(&self) -> bool {
        true
    }

    async fn radio_enabled(&self) -> bool {
        self.adapter.is_powered().await.unwrap_or(false)
    }

    async fn request_radio_enable(&self) -> Result<(), LockerError> {
        self.adapter
            .set_powered(true)
            .await
            .map_err(|e| LockerError::OperationFailed(e.to_string()))
    }
}

/// Scriptable in-memory gate.
pub struct FixedGate {
    permissions: Vec<String>,
    granted: RwLock<bool>,
    grant_on_request: bool,
    radio_on: RwLock<bool>,
}

impl FixedGate {
    /// Permissions not yet granted, prompt will grant, radio on.
    pub fn new() -> Self {
        Self {
            permissions: vec![
                "bluetooth-scan".to_string(),
                "bluetooth-connect".to_string(),
                "fine-location".to_string(),
            ],
            granted: RwLock::new(false),
            grant_on_request: true,
            radio_on: RwLock::new(true),
        }
    }

    /// Everything already granted, radio on.
    pub fn pre_granted() -> Self {
        let gate = Self::new();
        *gate.granted.write() = true;
        gate
    }

    /// The prompt is always refused.
    pub fn refusing() -> Self {
        Self {
            grant_on_request: false,
            ..Self::new()
        }
    }

    pub fn set_radio(&self, on: bool) {
        *self.radio_on.write() = on;
    }
}

impl Default for FixedGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformGate for FixedGate {
    fn required_permissions(&self) -> Vec<String> {
        self.permissions.clone()
    }

    fn permissions_granted(&self) -> bool {
        *self.granted.read()
    }

    async fn request_permissions(&self) -> bool {
        if self.grant_on_request {
            *self.granted.write() = true;
        }
        *self.granted.read()
    }

    async fn radio_enabled(&self) -> bool {
        *self.radio_on.read()
    }

    async fn request_radio_enable(&self) -> Result<(), LockerError> {
        *self.radio_on.write() = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_gate_grants_on_request() {
        let gate = FixedGate::new();
        assert!(!gate.permissions_granted());
        assert!(gate.request_permissions().await);
        assert!(gate.permissions_granted());
    }

    #[tokio::test]
    async fn test_refusing_gate_stays_denied() {
        let gate = FixedGate::refusing();
        assert!(!gate.request_permissions().await);
        assert!(!gate.permissions_granted());
    }

    #[tokio::test]
    async fn test_radio_toggle() {
        let gate = FixedGate::new();
        gate.set_radio(false);
        assert!(!gate.radio_enabled().await);
        gate.request_radio_enable().await.unwrap();
        assert!(gate.radio_enabled().await);
    }
}
