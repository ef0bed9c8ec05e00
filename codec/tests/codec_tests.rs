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

//! Integration tests for the vidgate-codec crate

use futures_util::{SinkExt, StreamExt};
use proptest::prelude::*;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{FramedRead, FramedWrite};
use vidgate_codec::{Command, DeviceCodec, FRAME_TERMINATOR, Report};

#[tokio::test]
async fn test_framed_read_decodes_reports() {
    let (mut tx, rx) = tokio::io::duplex(4096);
    let mut frames = FramedRead::new(rx, DeviceCodec::new());

    tx.write_all(b"active\r\nfile1.mov\r\nfile2.mov\r\n\r\n")
        .await
        .unwrap();

    let report = frames.next().await.unwrap().unwrap();
    assert_eq!(report.status, "active");
    assert_eq!(report.files, vec!["file1.mov", "file2.mov"]);
}

#[tokio::test]
async fn test_framed_read_two_frames_single_write() {
    let (mut tx, rx) = tokio::io::duplex(4096);
    let mut frames = FramedRead::new(rx, DeviceCodec::new());

    // Both frames land in one read; both must come out without further input.
    tx.write_all(b"active\r\nfile1.mov\r\n\r\nactive\r\nfile1.mov\r\nfile2.mov\r\n\r\n")
        .await
        .unwrap();
    drop(tx);

    let first = frames.next().await.unwrap().unwrap();
    assert_eq!(first.files.len(), 1);
    let second = frames.next().await.unwrap().unwrap();
    assert_eq!(second.files.len(), 2);
    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn test_framed_read_frame_split_across_writes() {
    let (mut tx, rx) = tokio::io::duplex(4096);
    let mut frames = FramedRead::new(rx, DeviceCodec::new());

    tx.write_all(b"active\r\nfile1").await.unwrap();
    tx.write_all(b".mov\r\n\r").await.unwrap();
    tx.write_all(b"\n").await.unwrap();

    let report = frames.next().await.unwrap().unwrap();
    assert_eq!(report.status, "active");
    assert_eq!(report.files, vec!["file1.mov"]);
}

#[tokio::test]
async fn test_framed_write_encodes_commands() {
    let (tx, mut rx) = tokio::io::duplex(4096);
    let mut frames = FramedWrite::new(tx, DeviceCodec::new());

    let cmd = Command::new("STOP", "192.168.1.10", 8080, "clip.mov");
    frames.send(&cmd).await.unwrap();

    use tokio::io::AsyncReadExt;
    let mut buffer = vec![0u8; 64];
    let len = rx.read(&mut buffer).await.unwrap();
    assert_eq!(&buffer[..len], b"STOP 192.168.1.10 8080 clip.mov\r\n\r\n");
}

#[test]
fn test_report_parse_examples() {
    let report = Report::from_bytes(b"active\r\nfile1.mov\r\nfile2.mov").unwrap();
    assert_eq!(report.status, "active");
    assert_eq!(report.files, vec!["file1.mov", "file2.mov"]);

    let report = Report::from_bytes(b"inactive").unwrap();
    assert_eq!(report.status, "inactive");
    assert!(report.files.is_empty());
}

proptest! {
    /// Encoding always terminates the frame, and splitting the payload on
    /// single spaces recovers the original four fields.
    #[test]
    fn prop_command_fields_recoverable(
        method in "[A-Z]{1,10}",
        dest in "[a-z0-9.-]{1,20}",
        port in any::<u16>(),
        src in "[a-zA-Z0-9._/-]{1,30}",
    ) {
        let cmd = Command::new(method.clone(), dest.clone(), port, src.clone());
        let mut codec = DeviceCodec::new();
        let mut buffer = bytes::BytesMut::new();
        tokio_util::codec::Encoder::encode(&mut codec, &cmd, &mut buffer).unwrap();

        prop_assert!(buffer.ends_with(FRAME_TERMINATOR));
        let payload = &buffer[..buffer.len() - FRAME_TERMINATOR.len()];
        let fields: Vec<&str> = std::str::from_utf8(payload).unwrap().split(' ').collect();
        let port_str = port.to_string();
        prop_assert_eq!(fields, vec![
            method.as_str(),
            dest.as_str(),
            port_str.as_str(),
            src.as_str(),
        ]);
    }
}
