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

//! Locker service boundary.
//!
//! Everything the companion consumes from the locker-connectivity service:
//! discovery, connection lifecycle, and the per-connection operations. The
//! service itself (BLE transport, encryption handshake, command protocol)
//! lives behind the [`LockerService`] trait; the in-process simulator stands
//! in for it in the demo and the tests.

mod config;
mod device;
mod service;
mod sim;

pub use config::{Environment, LockerConfig};
pub use device::{DeviceInfo, LockerDevice, ValidationType};
pub use service::{ConnectionEvent, DeviceEvent, LockerService};
pub use sim::{SimConfig, SimDevice, SimulatedLocker};
