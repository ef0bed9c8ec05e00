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

//! Wire protocol codec for the video-capture device fleet
//!
//! The gateway and the capture devices speak a small text-line protocol over
//! raw TCP. Both message kinds are framed by the 4-byte terminator
//! `\r\n\r\n`:
//!
//! ```text
//! Command (gateway -> device):  "<METHOD> <DEST> <PORT> <SRC>\r\n\r\n"
//! Report  (device -> gateway):  "<STATUS>[\r\n<FILE>]*\r\n\r\n"
//! ```
//!
//! This crate provides the pure framing layer: the [`Command`] and [`Report`]
//! message types and [`DeviceCodec`], a [`tokio_util::codec`] decoder/encoder
//! pair. The codec performs no I/O of its own and is typically driven through
//! `FramedRead`/`FramedWrite`.

mod codec;
mod frame;
mod result;

pub use codec::{DeviceCodec, FRAME_TERMINATOR};
pub use frame::{Command, Report};
pub use result::{CodecError, CodecResult};
