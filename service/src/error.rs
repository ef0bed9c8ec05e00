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

//! Error types for the device gateway

use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Device gateway error types
///
/// No variant is retried internally; every failure is surfaced to the caller
/// as a value. An [`GatewayError::Io`] on a bound session additionally closes
/// that session.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the codec layer
    #[error("Protocol error: {0}")]
    Codec(vidgate_codec::CodecError),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// The address is not in the device registry
    #[error("Unknown device {0}")]
    UnknownDevice(String),

    /// The device is known but has no live session
    #[error("Device {0} is not connected")]
    NotBound(String),

    /// The device has a live session but has not reported as active
    #[error("Device {0} is not active")]
    NotActive(String),

    /// The device already has a live session (duplicate bind under
    /// [`BindPolicy::Reject`](crate::BindPolicy::Reject))
    #[error("Device {0} already has a live session")]
    SessionActive(String),

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Generic error with a message
    #[error("{0}")]
    Other(String),
}

impl From<vidgate_codec::CodecError> for GatewayError {
    fn from(err: vidgate_codec::CodecError) -> Self {
        match err {
            // A codec-level I/O failure is an I/O failure of the session.
            vidgate_codec::CodecError::IOError { kind, operation } => {
                GatewayError::Io(std::io::Error::new(kind, operation))
            }
            other => GatewayError::Codec(other),
        }
    }
}

impl GatewayError {
    /// Check if the error is transient
    ///
    /// Transient errors reflect the device's momentary connection state;
    /// retrying once the device reconnects or reports may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::NotBound(_) | GatewayError::NotActive(_) | GatewayError::Io(_)
        )
    }

    /// Check if the error is a caller error
    ///
    /// Caller errors are permanent for a given request: the caller asked for
    /// something the configuration does not know about.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, GatewayError::UnknownDevice(_))
    }
}
