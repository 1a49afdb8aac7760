// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The RSP command dispatcher: one `Session` per connection, and a single
//! `handle_packet` entry point mapping packet payloads onto `replay-core`
//! motions and `CpuState` queries.

use log::{debug, info};

use replay_core::{
    continue_backward, continue_forward, step_backward, step_forward, BreakpointKind,
    BreakpointTable, CpuState, StopReason,
};
use replay_trace::{Architecture, TraceSource};

use crate::hex;
use std::rc::Rc;

/// Features this server advertises in reply to `qSupported`. Target XML is
/// appended separately, only when the architecture provides one (spec §6).
const QSUPPORTED_BASE: &str =
    "PacketSize=4000;ReverseStep+;ReverseContinue+;QStartNoAckMode+;qXfer:features:read+";

/// Per-connection protocol state: the replay cursor, the breakpoint set, and
/// whether the debugger has switched us into noack mode.
///
/// One `Session` is constructed per accepted connection and discarded on
/// disconnect (spec §4.G); there is no cross-connection state.
pub struct Session {
    state: CpuState,
    breakpoints: BreakpointTable,
    noack: bool,
}

impl Session {
    pub fn new(trace: Rc<dyn TraceSource>) -> Self {
        Self {
            state: CpuState::new(trace),
            breakpoints: BreakpointTable::new(),
            noack: false,
        }
    }

    pub fn architecture(&self) -> &Architecture {
        self.state.architecture()
    }

    /// Whether the connection loop should stop sending unsolicited `+`/`-`
    /// acks for replies (the codec layer, not this module, acts on this).
    pub fn noack(&self) -> bool {
        self.noack
    }

    /// Handles one decoded packet payload, returning the reply payload (not
    /// yet framed). `interrupted` is polled by the run controller during
    /// `c`/`bc` so a waiting connection loop can interleave socket polling
    /// with cursor motions.
    pub fn handle_packet(
        &mut self,
        payload: &[u8],
        interrupted: &mut dyn FnMut() -> bool,
    ) -> Vec<u8> {
        let text = String::from_utf8_lossy(payload);
        debug!("dispatch: {text}");
        let reply = self.dispatch(&text, interrupted);
        debug!("reply: {}", String::from_utf8_lossy(&reply));
        reply
    }

    fn dispatch(&mut self, text: &str, interrupted: &mut dyn FnMut() -> bool) -> Vec<u8> {
        if text == "?" {
            return b"S05".to_vec();
        }
        if text == "g" {
            return self.read_all_registers();
        }
        if let Some(hex_regs) = text.strip_prefix('G') {
            return self.write_all_registers(hex_regs);
        }
        if let Some(rest) = text.strip_prefix('p') {
            return self.read_one_register(rest);
        }
        if let Some(rest) = text.strip_prefix('P') {
            return self.write_one_register(rest);
        }
        if let Some(rest) = text.strip_prefix('m') {
            return self.read_memory(rest);
        }
        if let Some(rest) = text.strip_prefix('M') {
            return self.write_memory(rest);
        }
        if let Some(rest) = text.strip_prefix("Z0,").or_else(|| text.strip_prefix("Z1,")) {
            let kind = if text.starts_with("Z0,") {
                BreakpointKind::Software
            } else {
                BreakpointKind::Hardware
            };
            return self.insert_breakpoint(kind, rest);
        }
        if text.starts_with("Z2,") || text.starts_with("Z3,") || text.starts_with("Z4,") {
            return Vec::new();
        }
        if let Some(rest) = text.strip_prefix("z0,").or_else(|| text.strip_prefix("z1,")) {
            let kind = if text.starts_with("z0,") {
                BreakpointKind::Software
            } else {
                BreakpointKind::Hardware
            };
            return self.remove_breakpoint(kind, rest);
        }
        if text.starts_with("z2,") || text.starts_with("z3,") || text.starts_with("z4,") {
            return Vec::new();
        }
        // `S`/`C` (step/continue "with a delivered signal") are motions
        // too, per the stopped->running transition list; there is no
        // signal to deliver during replay, so the trailing signal number
        // is accepted and ignored.
        if text == "s" || text == "vCont;s" || text.starts_with('S') {
            return self.step(interrupted);
        }
        if text == "c" || text == "vCont;c" || text.starts_with('C') {
            return self.cont(interrupted);
        }
        if text == "bs" {
            return self.step_back(interrupted);
        }
        if text == "bc" {
            return self.continue_back(interrupted);
        }
        if text == "qSupported" || text.starts_with("qSupported:") {
            return self.qsupported();
        }
        if let Some(rest) = text.strip_prefix('H') {
            info!("thread op request: {rest}");
            return b"OK".to_vec();
        }
        if text == "qC" {
            return b"QC1".to_vec();
        }
        if text == "qfThreadInfo" {
            return b"m1".to_vec();
        }
        if text == "qsThreadInfo" {
            return b"l".to_vec();
        }
        if text == "vMustReplyEmpty" {
            return Vec::new();
        }
        if text == "vCont?" {
            return b"vCont;s;c".to_vec();
        }
        if text == "qAttached" {
            return b"1".to_vec();
        }
        if let Some(rest) = text.strip_prefix("qXfer:features:read:target.xml:") {
            return self.read_target_xml(rest);
        }
        if text == "QStartNoAckMode" {
            self.noack = true;
            return b"OK".to_vec();
        }
        // Everything else a source-level debugger probes for: unsupported.
        Vec::new()
    }

    fn read_all_registers(&self) -> Vec<u8> {
        let arch = self.state.architecture();
        let mut out = String::new();
        for id in 0..arch.register_count() {
            let bytes = arch.register_bytes(id).unwrap_or(0);
            match self.state.read_reg(id) {
                Some(value) => out.push_str(&hex::encode_le_u64(value, bytes)),
                None => out.push_str(&"x".repeat(bytes * 2)),
            }
        }
        out.into_bytes()
    }

    fn write_all_registers(&mut self, hex_regs: &str) -> Vec<u8> {
        let arch = self.state.architecture().clone();
        let mut offset = 0;
        for id in 0..arch.register_count() {
            let bytes = arch.register_bytes(id).unwrap_or(0);
            let digits = bytes * 2;
            let Some(field) = hex_regs.get(offset..offset + digits) else {
                break;
            };
            if let Some(value) = hex::decode_le_u64(field) {
                self.state.write_reg(id, value);
            }
            offset += digits;
        }
        b"OK".to_vec()
    }

    fn read_one_register(&self, rest: &str) -> Vec<u8> {
        let Some(id) = usize::from_str_radix(rest, 16).ok() else {
            return error_reply(1);
        };
        let Some(bytes) = self.state.architecture().register_bytes(id) else {
            return error_reply(1);
        };
        match self.state.read_reg(id) {
            Some(value) => hex::encode_le_u64(value, bytes).into_bytes(),
            None => "x".repeat(bytes * 2).into_bytes(),
        }
    }

    fn write_one_register(&mut self, rest: &str) -> Vec<u8> {
        let Some((id_hex, value_hex)) = rest.split_once('=') else {
            return error_reply(1);
        };
        let (Ok(id), Some(value)) = (
            usize::from_str_radix(id_hex, 16),
            hex::decode_le_u64(value_hex),
        ) else {
            return error_reply(1);
        };
        self.state.write_reg(id, value);
        b"OK".to_vec()
    }

    fn read_memory(&self, rest: &str) -> Vec<u8> {
        let Some((addr_hex, len_hex)) = rest.split_once(',') else {
            return error_reply(1);
        };
        let (Ok(addr), Ok(len)) = (
            u64::from_str_radix(addr_hex, 16),
            usize::from_str_radix(len_hex, 16),
        ) else {
            return error_reply(1);
        };
        let bytes = self.state.read_mem(addr, len);
        if !bytes.is_empty() && bytes.iter().all(|b| b.is_none()) {
            return error_reply(0x14);
        }
        let mut out = String::with_capacity(len * 2);
        for byte in bytes {
            match byte {
                Some(b) => out.push_str(&hex::encode(&[b])),
                None => out.push_str("xx"),
            }
        }
        out.into_bytes()
    }

    fn write_memory(&mut self, rest: &str) -> Vec<u8> {
        let Some((header, data_hex)) = rest.split_once(':') else {
            return error_reply(1);
        };
        let Some((addr_hex, _len_hex)) = header.split_once(',') else {
            return error_reply(1);
        };
        let (Ok(addr), Some(bytes)) = (u64::from_str_radix(addr_hex, 16), hex::decode(data_hex))
        else {
            return error_reply(1);
        };
        self.state.write_mem(addr, &bytes);
        b"OK".to_vec()
    }

    fn insert_breakpoint(&mut self, kind: BreakpointKind, rest: &str) -> Vec<u8> {
        match parse_breakpoint_args(rest) {
            Some((addr, len)) => {
                self.breakpoints.insert(addr, kind, len);
                b"OK".to_vec()
            }
            None => error_reply(1),
        }
    }

    fn remove_breakpoint(&mut self, kind: BreakpointKind, rest: &str) -> Vec<u8> {
        match parse_breakpoint_args(rest) {
            Some((addr, len)) => {
                self.breakpoints.remove(addr, kind, len);
                b"OK".to_vec()
            }
            None => error_reply(1),
        }
    }

    fn step(&mut self, _interrupted: &mut dyn FnMut() -> bool) -> Vec<u8> {
        match step_forward(&mut self.state) {
            Ok(reason) => self.stop_reply(reason),
            Err(e) => fatal_reply(&e),
        }
    }

    fn step_back(&mut self, _interrupted: &mut dyn FnMut() -> bool) -> Vec<u8> {
        match step_backward(&mut self.state) {
            Ok(reason) => self.stop_reply(reason),
            Err(e) => fatal_reply(&e),
        }
    }

    fn cont(&mut self, interrupted: &mut dyn FnMut() -> bool) -> Vec<u8> {
        match continue_forward(&mut self.state, &self.breakpoints, interrupted) {
            Ok(reason) => self.stop_reply(reason),
            Err(e) => fatal_reply(&e),
        }
    }

    fn continue_back(&mut self, interrupted: &mut dyn FnMut() -> bool) -> Vec<u8> {
        match continue_backward(&mut self.state, &self.breakpoints, interrupted) {
            Ok(reason) => self.stop_reply(reason),
            Err(e) => fatal_reply(&e),
        }
    }

    fn stop_reply(&self, reason: StopReason) -> Vec<u8> {
        info!("stop: {reason:?}");
        match reason {
            StopReason::Interrupted => b"T02".to_vec(),
            StopReason::StepComplete => b"T05thread:1;".to_vec(),
            StopReason::TraceEnd => b"T05thread:1;reason:trace-end;".to_vec(),
            StopReason::TraceStart => b"T05thread:1;reason:trace-start;".to_vec(),
            StopReason::Breakpoint { pc, kind } => {
                let label = match kind {
                    BreakpointKind::Software => "swbreak",
                    BreakpointKind::Hardware => "hwbreak",
                };
                let pc_id = self.state.architecture().pc_register_id;
                let pc_bytes = self.state.architecture().register_bytes(pc_id).unwrap_or(4);
                format!(
                    "T05thread:1;{label}:;{pc_id:x}:{};",
                    hex::encode_le_u64(pc, pc_bytes)
                )
                .into_bytes()
            }
        }
    }

    fn qsupported(&self) -> Vec<u8> {
        // `qXfer:features:read+` is advertised unconditionally; when the
        // architecture has no `target_xml`, the debugger's own request for
        // it is simply answered empty by `read_target_xml`.
        QSUPPORTED_BASE.to_string().into_bytes()
    }

    fn read_target_xml(&self, rest: &str) -> Vec<u8> {
        let Some(xml) = self.state.architecture().target_xml else {
            return Vec::new();
        };
        let Some((offset_hex, length_hex)) = rest.split_once(',') else {
            return error_reply(1);
        };
        let (Ok(offset), Ok(length)) = (
            usize::from_str_radix(offset_hex, 16),
            usize::from_str_radix(length_hex, 16),
        ) else {
            return error_reply(1);
        };
        let bytes = xml.as_bytes();
        if offset >= bytes.len() {
            return b"l".to_vec();
        }
        let end = (offset + length).min(bytes.len());
        let chunk = &bytes[offset..end];
        let marker = if end < bytes.len() { b'm' } else { b'l' };
        let mut out = vec![marker];
        out.extend_from_slice(chunk);
        out
    }
}

fn parse_breakpoint_args(rest: &str) -> Option<(u64, u8)> {
    let mut parts = rest.splitn(2, ',');
    let addr = u64::from_str_radix(parts.next()?, 16).ok()?;
    let len = parts.next().and_then(|s| u8::from_str_radix(s, 16).ok())?;
    Some((addr, len))
}

fn error_reply(code: u8) -> Vec<u8> {
    format!("E{code:02x}").into_bytes()
}

fn fatal_reply(e: &replay_core::SessionError) -> Vec<u8> {
    log::error!("session error: {e}");
    error_reply(0x01)
}
