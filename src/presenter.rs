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

//! Device list presentation.
//!
//! Keeps the visible, insertion-ordered device list in sync with the
//! whole-set snapshots the service emits, producing a minimal edit script
//! per snapshot so a view only touches the rows that changed. Identity is
//! the device id; content changes on a surviving row become updates.

use crate::locker::LockerDevice;

/// One change to the visible list. Indices refer to the list as it stands
/// when the edit is applied, in script order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEdit {
    Inserted(usize),
    Removed(usize),
    Updated(usize),
}

/// Diffing presenter for the nearby-device region.
#[derive(Debug, Default)]
pub struct DeviceListPresenter {
    devices: Vec<LockerDevice>,
}

impl DeviceListPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently presented list.
    pub fn devices(&self) -> &[LockerDevice] {
        &self.devices
    }

    /// Whether the nearby-devices region should be shown.
    pub fn visible(&self) -> bool {
        !self.devices.is_empty()
    }

    /// Reconcile against a new snapshot and return the edit script.
    ///
    /// Snapshot order wins; no client-side re-sorting. An entry moving to a
    /// different position is reported as a remove plus an insert.
    pub fn apply(&mut self, snapshot: &[LockerDevice]) -> Vec<ListEdit> {
        let mut edits = Vec::new();

        // Drop entries that are gone, highest index first so earlier
        // removals don't shift later ones.
        for idx in (0..self.devices.len()).rev() {
            let id = &self.devices[idx].device_id;
            if !snapshot.iter().any(|d| &d.device_id == id) {
                self.devices.remove(idx);
                edits.push(ListEdit::Removed(idx));
            }
        }

        // Align the survivors to snapshot order and bring in new entries.
        for (idx, wanted) in snapshot.iter().enumerate() {
            let position = self
                .devices
                .iter()
                .position(|d| d.device_id == wanted.device_id);
            match position {
                Some(pos) if pos == idx => {
                    if self.devices[idx] != *wanted {
                        self.devices[idx] = wanted.clone();
                        edits.push(ListEdit::Updated(idx));
                    }
                }
                Some(pos) => {
                    self.devices.remove(pos);
                    edits.push(ListEdit::Removed(pos));
                    self.devices.insert(idx, wanted.clone());
                    edits.push(ListEdit::Inserted(idx));
                }
                None => {
                    self.devices.insert(idx, wanted.clone());
                    edits.push(ListEdit::Inserted(idx));
                }
            }
        }

        edits
    }
}
