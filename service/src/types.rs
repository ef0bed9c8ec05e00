//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Core types for the device gateway

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status value a device reports while it is capturing and reachable.
pub const STATUS_ACTIVE: &str = "active";

/// Sentinel status for a device with no live session (never connected,
/// remote close, or idle timeout).
pub const STATUS_INACTIVE: &str = "inactive";

/// Policy applied when a socket arrives for a device that already has a live
/// session.
///
/// The fleet is keyed by source address, so a duplicate bind usually means
/// the device rebooted and reconnected before the gateway noticed the old
/// session die. `Evict` favors the newcomer; `Reject` favors the incumbent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindPolicy {
    /// Tear down the old session, then bind the new socket.
    #[default]
    Evict,
    /// Refuse the new socket, leaving the old session untouched.
    Reject,
}

impl fmt::Display for BindPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evict => write!(f, "evict"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Point-in-time status snapshot of one device (for non-blocking queries).
///
/// Snapshots are taken from the connection's cached state; producing one
/// never touches device I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    /// The device's configured host address
    pub host: String,
    /// Last reported status, or [`STATUS_INACTIVE`] without a live session
    pub status: String,
    /// Filenames from the most recent report, in reported order
    pub files: Vec<String>,
}

impl DeviceStatus {
    /// Check whether the device most recently reported itself active.
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({} files)",
            self.host,
            self.status,
            self.files.len()
        )
    }
}
