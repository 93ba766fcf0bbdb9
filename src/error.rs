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

//! Locker-domain error taxonomy.
//!
//! Every failure the locker service or the session controller can surface.
//! All variants are recoverable at the UI layer; none abort the process.

use thiserror::Error;

/// Errors surfaced by locker operations and session sequencing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockerError {
    /// Required runtime permissions have not been granted.
    #[error("required permissions have not been granted")]
    PermissionDenied,

    /// The Bluetooth radio is disabled.
    #[error("bluetooth radio is disabled")]
    RadioDisabled,

    /// The operation requires an active locker connection.
    #[error("no active locker connection")]
    NotConnected,

    /// A locker operation was accepted but failed.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Establishing a connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

impl LockerError {
    /// Whether the error indicates a missing precondition (permissions or
    /// radio) that the user can fix before retrying.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::RadioDisabled)
    }
}
