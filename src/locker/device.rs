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

//! Locker device value types.

use std::fmt;

/// A discoverable locker peripheral.
///
/// Identity is the `device_id`; the connectability flag is advertisement
/// state and may change between emissions of the same device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockerDevice {
    /// Stable identifier reported by the service.
    pub device_id: String,
    /// Whether the device currently accepts connections.
    pub is_connectable: bool,
}

impl LockerDevice {
    pub fn new(device_id: impl Into<String>, is_connectable: bool) -> Self {
        Self {
            device_id: device_id.into(),
            is_connectable,
        }
    }

    /// Identity comparison, ignoring advertisement state.
    pub fn same_device(&self, other: &LockerDevice) -> bool {
        self.device_id == other.device_id
    }
}

impl fmt::Display for LockerDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (connectable = {})",
            self.device_id, self.is_connectable
        )
    }
}

/// How the validation key passed to a device-info request is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationType {
    /// Validate against the device's public key.
    DeviceKey,
}

/// Payload returned by a device-info request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub project_id: u32,
    /// Signature over the device identity, opaque to the client.
    pub signature: Vec<u8>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device id: {}\nProject id: {}\nSignature: {}",
            self.device_id,
            self.project_id,
            hex::encode(&self.signature)
        )
    }
}
