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

//! Protocol message types

use crate::{CodecError, CodecResult};

/// A transfer instruction sent from the gateway to a capture device.
///
/// Encoded on the wire as `"<METHOD> <DEST> <PORT> <SRC>\r\n\r\n"`. Fields
/// are joined by single ASCII spaces and no escaping is performed, so field
/// values must not contain spaces or the frame terminator sequence. This is a
/// documented constraint on callers, not enforced by the encoder.
///
/// Commands are constructed per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Operation for the device to perform (e.g. a transfer start/stop verb)
    pub method: String,
    /// Destination address the device should stream to
    pub dest: String,
    /// Destination port
    pub port: u16,
    /// Source path on the device (which recording to act on)
    pub src: String,
}

impl Command {
    /// Create a new command.
    pub fn new(
        method: impl Into<String>,
        dest: impl Into<String>,
        port: u16,
        src: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            dest: dest.into(),
            port,
            src: src.into(),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", self.method, self.dest, self.port, self.src)
    }
}

/// A status report received from a capture device.
///
/// Decoded from one inbound frame: the first `\r\n`-separated line is the
/// device status (e.g. `"active"`), every subsequent line is one stored
/// filename, in the order the device reported them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Report {
    /// Free-form status string reported by the device
    pub status: String,
    /// Filenames currently stored on the device
    pub files: Vec<String>,
}

impl Report {
    /// Decode a report from the payload of one frame.
    ///
    /// `bytes` must hold the frame content up to, but not including, the
    /// terminator; the [`DeviceCodec`](crate::DeviceCodec) strips the
    /// terminator before calling this. An empty trailing line (payload ending
    /// in `\r\n`) yields an empty filename entry, mirroring the wire format.
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 {
            frame_len: bytes.len(),
        })?;
        let mut lines = text.split("\r\n");
        let status = lines.next().unwrap_or_default().to_string();
        let files = lines.map(str::to_string).collect();
        Ok(Self { status, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_status_and_files() {
        let report = Report::from_bytes(b"active\r\nfile1.mov\r\nfile2.mov").unwrap();
        assert_eq!(report.status, "active");
        assert_eq!(report.files, vec!["file1.mov", "file2.mov"]);
    }

    #[test]
    fn test_report_status_only() {
        let report = Report::from_bytes(b"inactive").unwrap();
        assert_eq!(report.status, "inactive");
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_report_empty_trailing_line() {
        let report = Report::from_bytes(b"active\r\nfile1.mov\r\n").unwrap();
        assert_eq!(report.files, vec!["file1.mov".to_string(), String::new()]);
    }

    #[test]
    fn test_report_rejects_invalid_utf8() {
        let err = Report::from_bytes(&[0x61, 0xFF, 0xFE]).unwrap_err();
        assert_eq!(err, CodecError::InvalidUtf8 { frame_len: 3 });
    }

    #[test]
    fn test_command_display() {
        let cmd = Command::new("START", "10.0.0.2", 9000, "cam1.mov");
        assert_eq!(cmd.to_string(), "START 10.0.0.2 9000 cam1.mov");
    }
}
