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

//! Locker Companion library.
//!
//! Client-side orchestration for a Bluetooth locker service: the session
//! controller that sequences permissions, radio state, scanning, and
//! connections; the diffing device-list presenter; the platform gate; and
//! the locker-service boundary with its in-process simulator.

pub mod config;
pub mod error;
pub mod journal;
pub mod locker;
pub mod platform;
pub mod presenter;
pub mod session;

pub use config::Config;
pub use error::LockerError;
pub use journal::LogJournal;
pub use locker::{
    ConnectionEvent, DeviceEvent, DeviceInfo, LockerDevice, LockerService, SimulatedLocker,
    ValidationType,
};
pub use platform::{BluezGate, FixedGate, PlatformGate};
pub use presenter::{DeviceListPresenter, ListEdit};
pub use session::{ConnectionStatus, SessionController};
