// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `spike`: Spike's `--log-commits` instruction retirement log.
//!
//! A line looks like:
//!
//! ```text
//! core   0: 0x0000000080000000 (0x00000297) x5  0x0000000080000000
//! core   0: 0x0000000080000004 (0x00028293) x5  0x0000000080000000 mem 0x0000000080001000 0xdeadbeef
//! ```
//!
//! `pc`, then the raw instruction word in parens, then zero or more
//! `<reg> <value>` pairs, then an optional `mem <addr> <value>` recording a
//! 4-byte store. Spike logs new values only; this parser reconstructs
//! `old_value`/`old_bytes` with a forward pre-pass that tracks the most
//! recently seen value at each register/address as it walks the log, so the
//! resulting trace is fully reversible.

use std::collections::HashMap;

use replay_trace::{Architecture, MaterializedTraceSource, MemWrite, RegWrite, TraceEvent};

use crate::FormatError;

struct ParsedLine {
    pc: u64,
    reg: Option<(usize, u64)>,
    mem: Option<(u64, u64)>,
}

fn parse_line(line: &str, lineno: usize) -> Result<Option<ParsedLine>, FormatError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    // core   0: 0x... (0x...) [xN value] [mem addr value]
    let colon = fields
        .iter()
        .position(|f| f.ends_with(':'))
        .ok_or_else(|| FormatError::Malformed(format!("line {lineno}: missing 'core N:'")))?;
    let rest = &fields[colon + 1..];
    let pc_field = rest
        .first()
        .ok_or_else(|| FormatError::Malformed(format!("line {lineno}: missing pc")))?;
    let pc = parse_hex_u64(pc_field)
        .ok_or_else(|| FormatError::Malformed(format!("line {lineno}: bad pc {pc_field}")))?;

    let mut reg = None;
    let mut mem = None;
    let mut i = 2; // skip pc and the parenthesized instruction word
    while i < rest.len() {
        match rest[i] {
            "mem" => {
                let addr = rest
                    .get(i + 1)
                    .and_then(|s| parse_hex_u64(s))
                    .ok_or_else(|| FormatError::Malformed(format!("line {lineno}: bad mem addr")))?;
                let value = rest
                    .get(i + 2)
                    .and_then(|s| parse_hex_u64(s))
                    .ok_or_else(|| FormatError::Malformed(format!("line {lineno}: bad mem value")))?;
                mem = Some((addr, value));
                i += 3;
            }
            field if field.starts_with('x') => {
                let id: usize = field[1..]
                    .parse()
                    .map_err(|_| FormatError::Malformed(format!("line {lineno}: bad register {field}")))?;
                let value = rest
                    .get(i + 1)
                    .and_then(|s| parse_hex_u64(s))
                    .ok_or_else(|| FormatError::Malformed(format!("line {lineno}: bad register value")))?;
                reg = Some((id, value));
                i += 2;
            }
            _ => i += 1,
        }
    }

    Ok(Some(ParsedLine { pc, reg, mem }))
}

fn parse_hex_u64(field: &str) -> Option<u64> {
    let field = field.trim_start_matches("0x");
    u64::from_str_radix(field, 16).ok()
}

pub fn parse(text: &str, architecture: Architecture) -> Result<MaterializedTraceSource, FormatError> {
    let mut last_reg_value: HashMap<usize, u64> = HashMap::new();
    let mut last_mem_byte: HashMap<u64, u8> = HashMap::new();
    let mut events = Vec::new();
    let mut index = 0u64;
    let mut previous_pc = None;

    for (lineno, line) in text.lines().enumerate() {
        let Some(parsed) = parse_line(line, lineno + 1)? else {
            continue;
        };
        let pc_before = previous_pc.unwrap_or(parsed.pc);

        let reg_writes = match parsed.reg {
            Some((id, new_value)) => {
                let old_value = last_reg_value.insert(id, new_value);
                vec![RegWrite { reg: id, old_value, new_value }]
            }
            None => vec![],
        };

        let mem_writes = match parsed.mem {
            Some((addr, value)) => {
                // The log prints the word's numeric value; RISC-V is
                // little-endian, so the stored byte order is the value's
                // little-endian encoding, low byte first.
                let new_bytes = value.to_le_bytes()[..4].to_vec();
                let mut old_bytes = Vec::with_capacity(new_bytes.len());
                let mut old_available = true;
                for (offset, byte) in new_bytes.iter().enumerate() {
                    let address = addr + offset as u64;
                    match last_mem_byte.insert(address, *byte) {
                        Some(old) => old_bytes.push(old),
                        None => old_available = false,
                    }
                }
                vec![MemWrite {
                    address: addr,
                    width: new_bytes.len() as u8,
                    old_bytes: if old_available { Some(old_bytes) } else { None },
                    new_bytes,
                }]
            }
            None => vec![],
        };

        events.push(TraceEvent {
            index,
            pc_before,
            pc_after: parsed.pc,
            reg_writes,
            mem_writes,
            mem_reads: vec![],
            disasm_hint: None,
        });
        previous_pc = Some(parsed.pc);
        index += 1;
    }

    Ok(MaterializedTraceSource::new(events, architecture)?)
}
