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

//! Device registry implementation
//!
//! The registry is the fixed directory from host address to
//! [`DeviceConnection`]. It is populated exactly once, from the configured
//! device list, and only read afterwards; any number of acceptor and
//! request-handling tasks may look devices up concurrently. It is
//! constructed explicitly and handed to the [`DeviceServer`](crate::DeviceServer)
//! and [`Gateway`](crate::Gateway) rather than living in process-wide state.

use crate::{DeviceConnection, GatewayConfig};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Fixed mapping from device host address to its connection slot.
pub struct DeviceRegistry {
    /// Connection slots, keyed by configured host (concurrent map, read-only
    /// after construction)
    connections: DashMap<String, Arc<DeviceConnection>>,
}

impl DeviceRegistry {
    /// Build the registry from the configured device fleet.
    ///
    /// Every configured device gets an unbound connection slot that lives
    /// for the whole process; slots are never added or removed afterwards.
    pub fn new(config: &GatewayConfig) -> Self {
        let connections = DashMap::new();
        for device in &config.devices {
            connections.insert(
                device.host.clone(),
                Arc::new(DeviceConnection::new(
                    device.host.clone(),
                    device.group.clone(),
                    config.idle_timeout,
                    config.bind_policy,
                )),
            );
        }
        info!(devices = connections.len(), "device registry initialized");
        Self { connections }
    }

    /// Look up the connection slot for a host address.
    pub fn lookup(&self, host: &str) -> Option<Arc<DeviceConnection>> {
        self.connections.get(host).map(|entry| entry.value().clone())
    }

    /// Get the configured host addresses.
    pub fn hosts(&self) -> Vec<String> {
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Get the number of configured devices.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check whether the fleet is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every bound session (used on server shutdown). The slots
    /// themselves remain.
    pub async fn close_all(&self) {
        for entry in self.connections.iter() {
            entry.value().close().await;
        }
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.connections.len())
            .finish()
    }
}
