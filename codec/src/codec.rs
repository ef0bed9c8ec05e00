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

use crate::{CodecError, Command, Report};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// The frame boundary for both message directions.
pub const FRAME_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A codec for the device wire protocol: decodes inbound [`Report`] frames
/// and encodes outbound [`Command`] frames.
///
/// `DeviceCodec` buffers partial frames across reads; a framed stream driving
/// it extracts every complete frame currently buffered before waiting on more
/// input. A frame whose payload cannot be interpreted (not valid UTF-8) is
/// logged and dropped rather than surfaced as an error: capture devices are
/// long-lived and reconnect-unfriendly, so one garbled frame must not tear
/// the session down.
#[derive(Debug, Default)]
pub struct DeviceCodec {
    /// Index into the accumulated buffer below which no terminator exists.
    /// Avoids rescanning the same bytes when a frame arrives in many reads.
    scanned: usize,
}

impl DeviceCodec {
    /// Creates a new instance of `DeviceCodec`.
    pub fn new() -> DeviceCodec {
        DeviceCodec::default()
    }
}

/// Locate the frame terminator in `haystack`, if present.
fn find_terminator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(FRAME_TERMINATOR.len())
        .position(|window| window == FRAME_TERMINATOR)
}

impl Decoder for DeviceCodec {
    type Item = Report;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Report>, CodecError> {
        loop {
            let Some(found) = find_terminator(&src[self.scanned..]) else {
                // No complete frame yet. The terminator may straddle the next
                // read, so keep the last 3 bytes in the unscanned window.
                self.scanned = src.len().saturating_sub(FRAME_TERMINATOR.len() - 1);
                return Ok(None);
            };
            let frame = src.split_to(self.scanned + found);
            src.advance(FRAME_TERMINATOR.len());
            self.scanned = 0;
            match Report::from_bytes(&frame) {
                Ok(report) => return Ok(Some(report)),
                Err(err) => {
                    warn!(error = %err, "dropping malformed report frame");
                    // Keep scanning: later frames in the buffer are unaffected.
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Report>, CodecError> {
        match self.decode(src)? {
            Some(report) => Ok(Some(report)),
            None => {
                // A partial frame at EOF carries no recoverable message.
                if !src.is_empty() {
                    warn!(
                        remaining = src.len(),
                        "discarding partial frame at end of stream"
                    );
                    src.clear();
                    self.scanned = 0;
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<&Command> for DeviceCodec {
    type Error = CodecError;

    fn encode(&mut self, cmd: &Command, dst: &mut BytesMut) -> Result<(), CodecError> {
        let port = cmd.port.to_string();
        dst.reserve(
            cmd.method.len()
                + cmd.dest.len()
                + port.len()
                + cmd.src.len()
                + 3
                + FRAME_TERMINATOR.len(),
        );
        dst.put_slice(cmd.method.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(cmd.dest.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(port.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(cmd.src.as_bytes());
        dst.put_slice(FRAME_TERMINATOR);
        Ok(())
    }
}
