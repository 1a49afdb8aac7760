// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::rc::Rc;

use replay_trace::{Architecture, TraceSource};

use crate::error::{BoundaryKind, SessionError};

/// A cursor over a trace, holding the architectural register file and a
/// sparse memory overlay consistent with every event up to the cursor.
///
/// `cursor` ranges over `[-1, len(trace))`; `-1` means "before event 0".
/// Registers always match `events[0..=cursor]` applied in order, and the
/// memory overlay always holds the most recent write, or else most recent
/// read, at or before `cursor`.
///
/// Register and memory storage is a plain `HashMap` rather than a fixed
/// array: traces are replayed, never executed, so there is no hot loop here
/// that would reward a flatter layout, and a sparse map is the natural
/// match for "mostly absent" memory.
pub struct CpuState {
    trace: Rc<dyn TraceSource>,
    architecture: Architecture,
    cursor: i64,
    registers: HashMap<usize, u64>,
    /// Debugger-issued register pokes (`P`/`G`). Consulted by `read_reg`
    /// ahead of `registers`, cleared on every `advance`/`retreat`:
    /// acknowledged, but never allowed to perturb replay.
    register_shadow: HashMap<usize, u64>,
    memory: HashMap<u64, u8>,
}

impl CpuState {
    /// Builds a cursor positioned before the first event of `trace`.
    pub fn new(trace: Rc<dyn TraceSource>) -> Self {
        let architecture = trace.architecture();
        Self {
            trace,
            architecture,
            cursor: -1,
            registers: HashMap::new(),
            register_shadow: HashMap::new(),
            memory: HashMap::new(),
        }
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    fn len(&self) -> i64 {
        self.trace.len() as i64
    }

    /// True when the cursor is before the first event.
    pub fn at_start(&self) -> bool {
        self.cursor < 0
    }

    /// True when there is no next event to advance into.
    pub fn at_end(&self) -> bool {
        self.cursor + 1 >= self.len()
    }

    /// Applies `event[cursor + 1]` and advances the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Boundary`] if already [`Self::at_end`].
    pub fn advance(&mut self) -> Result<(), SessionError> {
        if self.at_end() {
            return Err(SessionError::Boundary(BoundaryKind::AdvancePastEnd));
        }
        let index = (self.cursor + 1) as usize;
        let event = self.trace.event(index)?;

        for write in &event.reg_writes {
            self.registers.insert(write.reg, write.new_value);
        }
        for write in &event.mem_writes {
            for (offset, byte) in write.new_bytes.iter().enumerate() {
                self.memory.insert(write.address + offset as u64, *byte);
            }
        }
        for read in &event.mem_reads {
            for (offset, byte) in read.bytes.iter().enumerate() {
                self.memory.entry(read.address + offset as u64).or_insert(*byte);
            }
        }
        // The PC is authoritative from the event itself, independent of
        // whether the parser also happened to list it among `reg_writes`.
        self.registers
            .insert(self.architecture.pc_register_id, event.pc_after);

        self.cursor += 1;
        self.register_shadow.clear();
        Ok(())
    }

    /// Unapplies `event[cursor]` and decrements the cursor.
    ///
    /// `mem_reads` are never unapplied; they are monotone observations.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Boundary`] if already [`Self::at_start`].
    pub fn retreat(&mut self) -> Result<(), SessionError> {
        if self.at_start() {
            return Err(SessionError::Boundary(BoundaryKind::RetreatPastStart));
        }
        let index = self.cursor as usize;
        let event = self.trace.event(index)?;

        for write in &event.reg_writes {
            match write.old_value {
                Some(value) => {
                    self.registers.insert(write.reg, value);
                }
                None => {
                    self.registers.remove(&write.reg);
                }
            }
        }
        for write in &event.mem_writes {
            match &write.old_bytes {
                Some(old) => {
                    for (offset, byte) in old.iter().enumerate() {
                        self.memory.insert(write.address + offset as u64, *byte);
                    }
                }
                None => {
                    for offset in 0..write.width as u64 {
                        self.memory.remove(&(write.address + offset));
                    }
                }
            }
        }

        self.cursor -= 1;
        if self.cursor >= 0 {
            let previous = self.trace.event(self.cursor as usize)?;
            self.registers
                .insert(self.architecture.pc_register_id, previous.pc_after);
        } else {
            self.registers.remove(&self.architecture.pc_register_id);
        }
        self.register_shadow.clear();
        Ok(())
    }

    /// Reads register `id`, preferring an unflushed shadow write. Returns
    /// `None` when the register is unavailable.
    pub fn read_reg(&self, id: usize) -> Option<u64> {
        self.register_shadow
            .get(&id)
            .or_else(|| self.registers.get(&id))
            .copied()
    }

    /// Records a debugger-issued register write. Acknowledged by the
    /// protocol layer but never allowed to affect replay; cleared by the
    /// next [`Self::advance`] or [`Self::retreat`].
    pub fn write_reg(&mut self, id: usize, value: u64) {
        self.register_shadow.insert(id, value);
    }

    /// Reads `len` bytes starting at `addr`. Each byte is `None` if it is
    /// not present in the overlay.
    pub fn read_mem(&self, addr: u64, len: usize) -> Vec<Option<u8>> {
        (0..len as u64)
            .map(|offset| self.memory.get(&(addr + offset)).copied())
            .collect()
    }

    /// Stores `bytes` into the overlay unconditionally, starting at `addr`.
    /// Used for debugger `load`/`M` writes; unlike register writes, these
    /// are real mutations.
    pub fn write_mem(&mut self, addr: u64, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            self.memory.insert(addr + offset as u64, *byte);
        }
    }
}
