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

//! Gateway configuration types
//!
//! The device fleet is a fixed, externally supplied set: every device the
//! gateway will ever talk to is listed in the configuration, and the registry
//! is populated from it exactly once at startup. Deployments ship the
//! configuration as a JSON document; in-code construction uses the builder
//! methods.
//!
//! # Examples
//!
//! ```
//! use vidgate_service::{BindPolicy, GatewayConfig};
//! use std::time::Duration;
//!
//! let config = GatewayConfig::default()
//!     .with_idle_timeout(Duration::from_secs(30))
//!     .with_bind_policy(BindPolicy::Reject)
//!     .with_device("10.0.0.5", "lab-a");
//! ```

use crate::{BindPolicy, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// One configured device identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceEntry {
    /// The device's host address; inbound sockets are matched against this
    pub host: String,
    /// Access-group label, opaque to the gateway core
    pub group: String,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the device-facing listener binds to
    pub bind_address: SocketAddr,

    /// Idle timeout: a bound session with no report for this long is
    /// force-closed
    pub idle_timeout: Duration,

    /// Interval at which the (external) polling layer refreshes device
    /// status; carried here for that layer, unused by the core
    pub poll_interval: Duration,

    /// Policy for a second socket arriving from an already-bound address
    pub bind_policy: BindPolicy,

    /// The fixed device fleet
    pub devices: Vec<DeviceEntry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            idle_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
            bind_policy: BindPolicy::default(),
            devices: Vec::new(),
        }
    }
}

/// On-disk shape of the configuration document. Durations are whole seconds.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    bind: SocketAddr,
    device_timeout: u64,
    poll_interval: u64,
    #[serde(default)]
    bind_policy: BindPolicy,
    devices: Vec<DeviceEntry>,
}

impl GatewayConfig {
    /// Create a configuration listening on the given address.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the status-poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the duplicate-bind policy
    pub fn with_bind_policy(mut self, policy: BindPolicy) -> Self {
        self.bind_policy = policy;
        self
    }

    /// Append one device to the fleet
    pub fn with_device(mut self, host: impl Into<String>, group: impl Into<String>) -> Self {
        self.devices.push(DeviceEntry {
            host: host.into(),
            group: group.into(),
        });
        self
    }

    /// Parse a configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        Ok(Self {
            bind_address: file.bind,
            idle_timeout: Duration::from_secs(file.device_timeout),
            poll_interval: Duration::from_secs(file.poll_interval),
            bind_policy: file.bind_policy,
            devices: file.devices,
        })
    }

    /// Load a configuration document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
