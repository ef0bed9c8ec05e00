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

//! Device Gateway Service
//!
//! This crate implements the device-facing half of the video-capture
//! gateway: the TCP acceptor the devices dial into, the per-device
//! connection state machine, the concurrent device registry, and the facade
//! the request-handling layer calls to send commands and read status.
//!
//! # Architecture
//!
//! ```text
//! DeviceServer (accept loop)
//!     ↓ peer address lookup
//! DeviceRegistry (fixed map, one slot per configured device)
//!     ↓
//! DeviceConnection (read loop + idle watcher per bound session)
//!     ↑
//! Gateway (send / get_status, called by request handlers)
//! ```
//!
//! Status queries read only each connection's cached state; they never wait
//! on device I/O. Command writes are serialized per device. The registry is
//! built once from the configured fleet and never mutated afterwards.
//!
//! # Example
//!
//! ```no_run
//! use vidgate_service::{DeviceRegistry, DeviceServer, Gateway, GatewayConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_file("conf/gateway.json")?;
//!     let registry = Arc::new(DeviceRegistry::new(&config));
//!     let gateway = Gateway::new(registry.clone());
//!
//!     let server = DeviceServer::new(config, registry).await?;
//!     server.start().await?;
//!
//!     // Hand `gateway` to the request-handling layer...
//!     let statuses = gateway.get_status(["10.0.0.5"]);
//!     println!("{statuses:?}");
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod gateway;
mod registry;
mod server;
mod types;

pub use config::{DeviceEntry, GatewayConfig};
pub use connection::DeviceConnection;
pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use registry::DeviceRegistry;
pub use server::DeviceServer;
pub use types::{BindPolicy, DeviceStatus, STATUS_ACTIVE, STATUS_INACTIVE};
