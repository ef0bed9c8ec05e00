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

//! Device-facing TCP acceptor
//!
//! The DeviceServer owns the listener the capture devices dial into. Each
//! accepted socket is matched against the registry by peer IP: sockets from
//! unconfigured addresses are dropped on the spot, sockets from known
//! devices are bound to that device's connection slot, which then runs the
//! session (read loop and idle watcher).

use crate::{DeviceRegistry, GatewayConfig, GatewayError, Result};
use metrics::counter;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Device-facing TCP server
///
/// # Example
///
/// ```no_run
/// use vidgate_service::{DeviceRegistry, DeviceServer, GatewayConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = GatewayConfig::default().with_device("10.0.0.5", "lab-a");
///     let registry = Arc::new(DeviceRegistry::new(&config));
///
///     let server = DeviceServer::new(config, registry).await?;
///     server.start().await?;
///
///     // Accepting device connections now; wait for shutdown signal...
///     server.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct DeviceServer {
    /// Server configuration
    config: GatewayConfig,
    /// Shared device registry
    registry: Arc<DeviceRegistry>,
    /// TCP listener (wrapped in Arc<Mutex> for sharing with the accept loop)
    listener: Arc<tokio::sync::Mutex<TcpListener>>,
    /// Actual bind address
    bind_address: SocketAddr,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Shutdown notification
    shutdown_notify: Arc<Notify>,
    /// Accept loop task handle
    accept_handle: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl DeviceServer {
    /// Create a new server with the given configuration and registry.
    ///
    /// This binds to the configured address but does not start accepting
    /// connections. Call `start()` to begin accepting.
    pub async fn new(config: GatewayConfig, registry: Arc<DeviceRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_address).await?;
        let actual_addr = listener.local_addr()?;

        tracing::info!("device server bound to {}", actual_addr);

        Ok(Self {
            config,
            registry,
            listener: Arc::new(tokio::sync::Mutex::new(listener)),
            bind_address: actual_addr,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    /// Start accepting device connections.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(GatewayError::Other("Server already running".to_string()));
        }

        tracing::info!("starting device server on {}", self.config.bind_address);

        let handle = self.spawn_accept_loop();
        *self.accept_handle.lock().await = Some(handle);

        Ok(())
    }

    /// Spawn the accept loop task
    fn spawn_accept_loop(&self) -> JoinHandle<()> {
        let listener = self.listener.clone();
        let registry = self.registry.clone();
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();

        tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let accept_result = tokio::select! {
                    result = async {
                        listener.lock().await.accept().await
                    } => result,
                    _ = shutdown_notify.notified() => break,
                };

                match accept_result {
                    Ok((socket, peer_addr)) => {
                        tracing::debug!("accepted connection from {}", peer_addr);
                        counter!("vidgate.connections.accepted").increment(1);

                        // Devices are matched by source IP; the ephemeral
                        // port is not part of their identity.
                        let peer_host = peer_addr.ip().to_string();
                        let Some(conn) = registry.lookup(&peer_host) else {
                            tracing::warn!("unrecognized connection from {}", peer_addr);
                            counter!("vidgate.connections.unrecognized").increment(1);
                            drop(socket);
                            continue;
                        };

                        match conn.bind(socket).await {
                            Ok(()) => {
                                tracing::info!("device {} connected from {}", peer_host, peer_addr);
                            }
                            Err(GatewayError::SessionActive(host)) => {
                                tracing::warn!(
                                    "device {} already has a live session, rejecting {}",
                                    host,
                                    peer_addr
                                );
                                counter!("vidgate.connections.duplicate").increment(1);
                            }
                            Err(err) => {
                                tracing::error!("failed to bind device {}: {}", peer_host, err);
                            }
                        }
                    }
                    Err(err) => {
                        tracing::error!("failed to accept connection: {}", err);
                        counter!("vidgate.errors.accept").increment(1);

                        // Back off on errors to avoid a tight loop
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }

            tracing::info!("accept loop terminated");
        })
    }

    /// Shutdown the server gracefully
    ///
    /// Stops accepting new connections, then closes every bound device
    /// session. The registry itself survives for the process lifetime.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::ServerNotRunning);
        }

        tracing::info!("shutting down device server");

        self.shutdown_notify.notify_waiters();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        }

        self.registry.close_all().await;

        tracing::info!("device server shutdown complete");

        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the server's bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the shared device registry
    pub fn registry(&self) -> Arc<DeviceRegistry> {
        self.registry.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl std::fmt::Debug for DeviceServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceServer")
            .field("bind_address", &self.bind_address())
            .field("running", &self.is_running())
            .field("devices", &self.registry.len())
            .finish()
    }
}

// Implement Drop to ensure cleanup
impl Drop for DeviceServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("DeviceServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown_notify.notify_waiters();
        }
    }
}
