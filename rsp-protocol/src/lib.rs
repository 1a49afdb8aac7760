// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The RSP wire protocol: packet framing ([`codec`]) and command dispatch
//! ([`dispatcher`]) over a [`replay_core::CpuState`].
//!
//! Neither half knows about sockets; the server binary feeds bytes into
//! [`FrameReader`] and writes [`encode_packet`]'s output back out.

mod codec;
mod dispatcher;
mod hex;

pub use codec::{checksum, encode_packet, Frame, FrameReader};
pub use dispatcher::Session;
