// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `sifive-rtl`: a SiFive RTL simulation commit log.
//!
//! A line looks like:
//!
//! ```text
//! C0 0 0x80000000 (0x00000297) x5 0x80000000
//! C0 0 0x80000004 (0x00028293) x5 0x80000010 MEM 0x80002000 0xdeadbeef
//! ```
//!
//! Same shape as the `spike` log but the RTL trace does not retain old
//! memory contents anywhere upstream, so `old_bytes` is always `None` for a
//! memory write here: reversing across such an event leaves the affected
//! bytes unavailable rather than reconstructing stale data.
//! Register old values are still recoverable by the same forward pre-pass
//! `spike` uses, since the RTL log is dense in every register it touches.

use std::collections::HashMap;

use replay_trace::{Architecture, MaterializedTraceSource, MemWrite, RegWrite, TraceEvent};

use crate::FormatError;

pub fn parse(text: &str, architecture: Architecture) -> Result<MaterializedTraceSource, FormatError> {
    let mut last_reg_value: HashMap<usize, u64> = HashMap::new();
    let mut events = Vec::new();
    let mut index = 0u64;
    let mut previous_pc = None;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || !fields[0].starts_with('C') {
            return Err(FormatError::Malformed(format!("line {}: not an RTL commit record", lineno + 1)));
        }
        let pc = parse_hex_u64(fields[2])
            .ok_or_else(|| FormatError::Malformed(format!("line {}: bad pc", lineno + 1)))?;

        let mut reg_writes = Vec::new();
        let mut mem_writes = Vec::new();
        let mut i = 4; // skip C0, hart id, pc, instruction word
        while i < fields.len() {
            match fields[i] {
                "MEM" => {
                    let addr = fields
                        .get(i + 1)
                        .and_then(|s| parse_hex_u64(s))
                        .ok_or_else(|| FormatError::Malformed(format!("line {}: bad MEM addr", lineno + 1)))?;
                    let value = fields
                        .get(i + 2)
                        .and_then(|s| parse_hex_u64(s))
                        .ok_or_else(|| FormatError::Malformed(format!("line {}: bad MEM value", lineno + 1)))?;
                    // Same little-endian reasoning as the `spike` parser:
                    // the log prints the word's numeric value, and RISC-V
                    // stores it low byte first.
                    let new_bytes = value.to_le_bytes()[..4].to_vec();
                    mem_writes.push(MemWrite {
                        address: addr,
                        width: new_bytes.len() as u8,
                        old_bytes: None,
                        new_bytes,
                    });
                    i += 3;
                }
                field if field.starts_with('x') => {
                    let id: usize = field[1..]
                        .parse()
                        .map_err(|_| FormatError::Malformed(format!("line {}: bad register {field}", lineno + 1)))?;
                    let value = fields
                        .get(i + 1)
                        .and_then(|s| parse_hex_u64(s))
                        .ok_or_else(|| FormatError::Malformed(format!("line {}: bad register value", lineno + 1)))?;
                    let old_value = last_reg_value.insert(id, value);
                    reg_writes.push(RegWrite { reg: id, old_value, new_value: value });
                    i += 2;
                }
                _ => i += 1,
            }
        }

        events.push(TraceEvent {
            index,
            pc_before: previous_pc.unwrap_or(pc),
            pc_after: pc,
            reg_writes,
            mem_writes,
            mem_reads: vec![],
            disasm_hint: None,
        });
        previous_pc = Some(pc);
        index += 1;
    }

    Ok(MaterializedTraceSource::new(events, architecture)?)
}

fn parse_hex_u64(field: &str) -> Option<u64> {
    let field = field.trim_start_matches("0x");
    u64::from_str_radix(field, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_trace::TraceSource;

    #[test]
    fn memory_writes_never_carry_old_bytes() {
        let text = "C0 0 0x80000000 (0x00000297) MEM 0x80002000 0xdeadbeef\n";
        let source = parse(text, Architecture::riscv32()).unwrap();
        let event = source.event(0).unwrap();
        assert_eq!(event.mem_writes[0].old_bytes, None);
    }

    #[test]
    fn register_old_values_are_still_recovered() {
        let text = "\
C0 0 0x80000000 (0x00000297) x5 0x100
C0 0 0x80000004 (0x00028293) x5 0x200
";
        let source = parse(text, Architecture::riscv32()).unwrap();
        let second = source.event(1).unwrap();
        assert_eq!(second.reg_writes[0].old_value, Some(0x100));
    }

    #[test]
    fn non_commit_lines_are_rejected() {
        let err = parse("garbage\n", Architecture::riscv32()).unwrap_err();
        assert!(matches!(err, FormatError::Malformed(_)));
    }
}
