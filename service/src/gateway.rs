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

//! Gateway facade
//!
//! The two operations the request-handling layer calls into this core with:
//! send a command to a device, and fetch the current status of a set of
//! devices. The facade hides registry lookup and error mapping; it holds no
//! state of its own beyond the shared registry handle.

use crate::{DeviceRegistry, DeviceStatus, GatewayError, Result};
use std::sync::Arc;
use tracing::instrument;
use vidgate_codec::Command;

/// Facade over the device registry for request handlers.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct Gateway {
    registry: Arc<DeviceRegistry>,
}

impl Gateway {
    /// Create a facade over a shared registry.
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Send a transfer command to the device at `host`.
    ///
    /// Fails with [`GatewayError::UnknownDevice`] for an unconfigured host
    /// and propagates [`GatewayError::NotBound`] /
    /// [`GatewayError::NotActive`] from the connection.
    #[instrument(skip(self))]
    pub async fn send(
        &self,
        method: &str,
        host: &str,
        src: &str,
        dest: &str,
        port: u16,
    ) -> Result<()> {
        let Some(conn) = self.registry.lookup(host) else {
            return Err(GatewayError::UnknownDevice(host.to_string()));
        };
        let cmd = Command::new(method, dest, port, src);
        conn.send(&cmd).await
    }

    /// Fetch the current status of the given hosts.
    ///
    /// Unknown hosts are silently skipped; callers may query a superset of
    /// possibly-stale identifiers. Never waits on device I/O; each entry is
    /// a snapshot of the connection's cached state.
    pub fn get_status<I, S>(&self, hosts: I) -> Vec<DeviceStatus>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        hosts
            .into_iter()
            .filter_map(|host| self.registry.lookup(host.as_ref()))
            .map(|conn| conn.snapshot())
            .collect()
    }
}
