// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

/// One retired instruction, with enough delta information to apply *and*
/// unapply it.
///
/// Events are densely indexed by a parser: `event[i].pc_after` equals
/// `event[i + 1].pc_before` whenever both are defined. The replay core never
/// validates this across a whole trace up front; it only relies on it
/// locally, as each event is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Position of this event in the trace, 0-based and dense.
    pub index: u64,
    /// Instruction address before retirement.
    pub pc_before: u64,
    /// Instruction address after retirement.
    pub pc_after: u64,
    /// Register changes caused by this instruction.
    #[serde(default)]
    pub reg_writes: Vec<RegWrite>,
    /// Memory writes caused by this instruction, in program order.
    #[serde(default)]
    pub mem_writes: Vec<MemWrite>,
    /// Memory reads observed during this instruction's execution.
    ///
    /// These are monotone observations, not state transitions: retreating
    /// past an event never un-observes its reads (see the crate-level
    /// invariant discussion on [`crate::TraceSource`]).
    #[serde(default)]
    pub mem_reads: Vec<MemRead>,
    /// Optional disassembly text. Informational only; the protocol layer
    /// never looks at it.
    #[serde(default)]
    pub disasm_hint: Option<String>,
}

/// A single register's old/new value pair for one [`TraceEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegWrite {
    /// Architectural register index, as defined by the session's
    /// [`crate::Architecture`].
    pub reg: usize,
    /// Value before the write. Absent only for the very first event that
    /// touches this register; rewinding past such an event leaves the
    /// register unavailable rather than reconstructing a value.
    pub old_value: Option<u64>,
    pub new_value: u64,
}

/// A memory write caused by a retired instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemWrite {
    pub address: u64,
    pub width: u8,
    /// Bytes occupying `address..address+width` before the write, if the
    /// parser was able to recover them. Absent when the source format omits
    /// pre-images (see the `sifive-rtl` format in `replay-formats`); in
    /// that case retreating across this event marks the bytes unavailable
    /// instead of restoring stale data.
    #[serde(default)]
    pub old_bytes: Option<Vec<u8>>,
    pub new_bytes: Vec<u8>,
}

/// A memory read observed during instruction execution.
///
/// Reads never carry an "old" value because they don't change state; they
/// only populate the overlay lazily the first time an address becomes
/// observable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemRead {
    pub address: u64,
    pub width: u8,
    pub bytes: Vec<u8>,
}
