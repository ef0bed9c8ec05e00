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

//! Per-device connection state machine
//!
//! A [`DeviceConnection`] exists for every configured device for the whole
//! process lifetime; only its bound/unbound sub-state changes. While a TCP
//! session is bound, the connection owns two tasks:
//!
//! - the read loop, which drains every complete report frame from the socket
//!   and applies it to the cached status, and
//! - the idle watcher, which force-closes the session when no report arrives
//!   within the idle timeout.
//!
//! Both tasks are cancelled through a level-triggered watch channel, so a
//! close delivered before a task's first poll still terminates it. Sessions
//! carry a monotonically increasing id; teardown requests from a stale
//! session (the read loop of an evicted socket, a late idle watcher) are
//! no-ops.

use crate::{BindPolicy, DeviceStatus, GatewayError, Result, STATUS_ACTIVE, STATUS_INACTIVE};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::watch;
use tokio::time;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, warn};
use vidgate_codec::{Command, DeviceCodec, Report};

/// Cached device state; the protected region shared by report updates,
/// session teardown and status snapshots. Never held across an await point.
struct DeviceState {
    /// Last reported status, [`STATUS_INACTIVE`] while unbound
    status: String,
    /// Filenames from the most recent report; retained across close as
    /// last-known data
    files: Vec<String>,
    /// The live session, if any
    session: Option<SessionHandle>,
}

/// Identity and cancellation channel of one bound session.
struct SessionHandle {
    id: u64,
    close_tx: watch::Sender<bool>,
}

/// The session's write half, tagged with the owning session id so a stale
/// teardown cannot shut down a successor's socket.
struct SessionWriter {
    id: u64,
    framed: FramedWrite<OwnedWriteHalf, DeviceCodec>,
}

/// One device's connection slot.
///
/// Invariant: `session` absent implies `status == "inactive"`. Both are
/// updated inside the same critical section on every transition.
///
/// Bind attempts are serialized by the caller; the acceptor is the only
/// binder in the running system.
pub struct DeviceConnection {
    /// The device's configured host address
    host: String,
    /// Access-group label; opaque metadata for the embedding layer
    group: String,
    /// Idle timeout for bound sessions
    idle_timeout: Duration,
    /// Policy for duplicate binds
    bind_policy: BindPolicy,
    /// Cached state (short protected region)
    state: Mutex<DeviceState>,
    /// Single write serialization point for all senders to this device
    writer: tokio::sync::Mutex<Option<SessionWriter>>,
    /// Deadline renewed by every decoded report
    idle_deadline: Mutex<time::Instant>,
    /// Source of session ids
    next_session: AtomicU64,
}

impl DeviceConnection {
    /// Create an unbound connection slot for one configured device.
    pub fn new(
        host: impl Into<String>,
        group: impl Into<String>,
        idle_timeout: Duration,
        bind_policy: BindPolicy,
    ) -> Self {
        Self {
            host: host.into(),
            group: group.into(),
            idle_timeout,
            bind_policy,
            state: Mutex::new(DeviceState {
                status: STATUS_INACTIVE.to_string(),
                files: Vec::new(),
                session: None,
            }),
            writer: tokio::sync::Mutex::new(None),
            idle_deadline: Mutex::new(time::Instant::now()),
            next_session: AtomicU64::new(1),
        }
    }

    /// Get the device's host address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the device's access-group label
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Check whether a live session is currently bound
    pub fn is_bound(&self) -> bool {
        self.state.lock().unwrap().session.is_some()
    }

    /// Take a point-in-time status snapshot.
    ///
    /// Reads only the cached protected region; never waits on device I/O.
    pub fn snapshot(&self) -> DeviceStatus {
        let state = self.state.lock().unwrap();
        DeviceStatus {
            host: self.host.clone(),
            status: state.status.clone(),
            files: state.files.clone(),
        }
    }

    /// Bind an accepted socket to this device and start its session tasks.
    ///
    /// The status stays `"inactive"` until the first report arrives. A
    /// duplicate bind follows the configured [`BindPolicy`]: `Evict` tears
    /// the old session down first, `Reject` fails with
    /// [`GatewayError::SessionActive`] and leaves the old session untouched.
    #[instrument(skip(self, socket), fields(host = %self.host))]
    pub async fn bind(self: &Arc<Self>, socket: TcpStream) -> Result<()> {
        let evicted = {
            let mut state = self.state.lock().unwrap();
            if state.session.is_some() {
                if self.bind_policy == BindPolicy::Reject {
                    return Err(GatewayError::SessionActive(self.host.clone()));
                }
                state.status = STATUS_INACTIVE.to_string();
                state.session.take()
            } else {
                None
            }
        };
        if let Some(old) = evicted {
            info!(session = old.id, "evicting previous session");
            counter!("vidgate.sessions.evicted").increment(1);
            self.teardown(old).await;
        }

        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        let (read_half, write_half) = socket.into_split();
        let (close_tx, close_rx) = watch::channel(false);

        *self.idle_deadline.lock().unwrap() = time::Instant::now() + self.idle_timeout;
        *self.writer.lock().await = Some(SessionWriter {
            id,
            framed: FramedWrite::new(write_half, DeviceCodec::new()),
        });
        {
            let mut state = self.state.lock().unwrap();
            state.session = Some(SessionHandle { id, close_tx });
        }

        let frames = FramedRead::new(read_half, DeviceCodec::new());
        tokio::spawn(self.clone().read_loop(frames, id, close_rx.clone()));
        tokio::spawn(self.clone().idle_watch(id, close_rx));

        counter!("vidgate.sessions.bound").increment(1);
        gauge!("vidgate.devices.bound").increment(1.0);
        info!(session = id, "session bound");
        Ok(())
    }

    /// Encode and write one command to the device.
    ///
    /// Fails with [`GatewayError::NotBound`] without a live session and
    /// [`GatewayError::NotActive`] while the device has not reported itself
    /// active. All senders pass through the connection's write lock, so
    /// concurrent commands are serialized and frames never interleave. A
    /// write failure closes the session.
    #[instrument(skip(self, cmd), fields(host = %self.host))]
    pub async fn send(&self, cmd: &Command) -> Result<()> {
        let session_id = {
            let state = self.state.lock().unwrap();
            let Some(session) = &state.session else {
                return Err(GatewayError::NotBound(self.host.clone()));
            };
            if state.status != STATUS_ACTIVE {
                return Err(GatewayError::NotActive(self.host.clone()));
            }
            session.id
        };

        let mut writer = self.writer.lock().await;
        let Some(w) = writer.as_mut().filter(|w| w.id == session_id) else {
            // The session went away while we waited on the write lock.
            return Err(GatewayError::NotBound(self.host.clone()));
        };
        match w.framed.send(cmd).await {
            Ok(()) => {
                counter!("vidgate.commands.sent").increment(1);
                info!(command = %cmd, "command sent");
                Ok(())
            }
            Err(err) => {
                counter!("vidgate.errors.send").increment(1);
                warn!(error = %err, "failed to send command, closing session");
                drop(writer);
                self.close_session(session_id).await;
                Err(err.into())
            }
        }
    }

    /// Close the current session, if any.
    ///
    /// Idempotent: closing an unbound connection is a no-op.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn close(&self) {
        let id = {
            let state = self.state.lock().unwrap();
            match &state.session {
                Some(session) => session.id,
                None => return,
            }
        };
        self.close_session(id).await;
    }

    /// Close the session identified by `id`. A stale id (the session already
    /// closed or was replaced) is a no-op, which makes remote EOF, idle
    /// timeout and explicit close safe to race.
    async fn close_session(&self, id: u64) {
        let handle = {
            let mut state = self.state.lock().unwrap();
            if matches!(&state.session, Some(session) if session.id == id) {
                state.status = STATUS_INACTIVE.to_string();
                state.session.take()
            } else {
                None
            }
        };
        let Some(handle) = handle else {
            return;
        };
        self.teardown(handle).await;
        debug!(host = %self.host, session = id, "session closed");
    }

    /// Cancel the session's tasks and shut its write half down. The caller
    /// has already detached `handle` from the state under the lock.
    async fn teardown(&self, handle: SessionHandle) {
        let _ = handle.close_tx.send(true);
        let mut writer = self.writer.lock().await;
        if let Some(w) = writer.take() {
            if w.id == handle.id {
                let mut framed = w.framed;
                if let Err(err) = SinkExt::<&Command>::close(&mut framed).await {
                    debug!(host = %self.host, error = %err, "error closing device socket");
                }
            } else {
                // A successor session installed its writer already; not ours.
                *writer = Some(w);
            }
        }
        gauge!("vidgate.devices.bound").decrement(1.0);
    }

    /// Apply one decoded report: renew the idle deadline, then replace the
    /// cached status and file list atomically.
    fn on_report(&self, report: Report) {
        *self.idle_deadline.lock().unwrap() = time::Instant::now() + self.idle_timeout;
        counter!("vidgate.reports.received").increment(1);
        debug!(
            host = %self.host,
            status = %report.status,
            files = report.files.len(),
            "report received"
        );
        let mut state = self.state.lock().unwrap();
        state.status = report.status;
        state.files = report.files;
    }

    /// Drain report frames until the session ends.
    ///
    /// The framed stream extracts every complete frame buffered before
    /// waiting on more input; reports are applied in receipt order. Clean
    /// EOF and read errors close the session; cancellation ends the loop
    /// without side effects. Dropping the stream releases the read half.
    async fn read_loop(
        self: Arc<Self>,
        mut frames: FramedRead<OwnedReadHalf, DeviceCodec>,
        id: u64,
        mut closed: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = closed.changed() => return,
                frame = frames.next() => match frame {
                    Some(Ok(report)) => self.on_report(report),
                    Some(Err(err)) => {
                        warn!(host = %self.host, error = %err, "read error");
                        counter!("vidgate.errors.read").increment(1);
                        self.close_session(id).await;
                        return;
                    }
                    None => {
                        debug!(host = %self.host, "closed by remote");
                        self.close_session(id).await;
                        return;
                    }
                }
            }
        }
    }

    /// Force-close the session when the idle deadline lapses.
    ///
    /// Wakes at the deadline and re-checks it first: a report received while
    /// sleeping pushes the deadline out, in which case the watcher just goes
    /// back to sleep. Exits without side effects when the session closes
    /// first.
    async fn idle_watch(self: Arc<Self>, id: u64, mut closed: watch::Receiver<bool>) {
        loop {
            let deadline = *self.idle_deadline.lock().unwrap();
            tokio::select! {
                _ = closed.changed() => return,
                _ = time::sleep_until(deadline) => {
                    let current = *self.idle_deadline.lock().unwrap();
                    if time::Instant::now() >= current {
                        warn!(host = %self.host, session = id, "idle timeout, forcing close");
                        counter!("vidgate.sessions.idle_timeout").increment(1);
                        self.close_session(id).await;
                        return;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for DeviceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("DeviceConnection")
            .field("host", &self.host)
            .field("group", &self.group)
            .field("bound", &state.session.is_some())
            .field("status", &state.status)
            .finish()
    }
}
