// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

/// Software and hardware breakpoints are behaviorally identical here: no
/// instructions execute, so there is nothing for a hardware breakpoint to
/// do differently. The kind is kept only so `Z`/`z` round-trip and stop
/// replies can report `swbreak`/`hwbreak` faithfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BreakpointKind {
    Software,
    Hardware,
}

/// Process-wide set of breakpoint addresses.
///
/// Equality, and therefore membership, is by address *and* kind only:
/// `Z0,1000` and `Z1,1000` are distinct entries, but the length field is not
/// part of the key — a debugger is not guaranteed to echo the same length on
/// `z` that it used on `Z`, so `remove` must find the entry by address+kind
/// alone. The inserted length is kept as a stored attribute in case it ever
/// needs to round-trip, not as part of the lookup. Watch points (`Z2`-`Z4`)
/// have no representation here; the dispatcher replies with an empty packet
/// for those instead of routing them to this table.
#[derive(Default)]
pub struct BreakpointTable {
    entries: HashMap<(u64, BreakpointKind), u8>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: u64, kind: BreakpointKind, length: u8) {
        self.entries.insert((address, kind), length);
    }

    pub fn remove(&mut self, address: u64, kind: BreakpointKind, _length: u8) {
        self.entries.remove(&(address, kind));
    }

    /// Whether any breakpoint, of either kind, sits at `address`.
    pub fn contains(&self, address: u64) -> bool {
        self.entries.keys().any(|(a, _)| *a == address)
    }

    /// The kind of breakpoint at `address`, if any. When both a software
    /// and a hardware breakpoint share an address, software wins, simply
    /// for a stable, deterministic answer.
    pub fn kind_at(&self, address: u64) -> Option<BreakpointKind> {
        let mut found_hardware = false;
        for (a, kind) in self.entries.keys() {
            if *a != address {
                continue;
            }
            if *kind == BreakpointKind::Software {
                return Some(BreakpointKind::Software);
            }
            found_hardware = true;
        }
        if found_hardware {
            Some(BreakpointKind::Hardware)
        } else {
            None
        }
    }

    /// Removes every breakpoint. Used when a session resets between
    /// connections.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut table = BreakpointTable::new();
        assert!(!table.contains(0x100));
        table.insert(0x100, BreakpointKind::Software, 4);
        assert!(table.contains(0x100));
        assert_eq!(table.kind_at(0x100), Some(BreakpointKind::Software));
    }

    #[test]
    fn remove_clears_membership() {
        let mut table = BreakpointTable::new();
        table.insert(0x100, BreakpointKind::Software, 4);
        table.remove(0x100, BreakpointKind::Software, 4);
        assert!(!table.contains(0x100));
    }

    #[test]
    fn software_and_hardware_are_distinct_entries() {
        let mut table = BreakpointTable::new();
        table.insert(0x100, BreakpointKind::Hardware, 4);
        table.remove(0x100, BreakpointKind::Software, 4);
        assert!(table.contains(0x100));
        assert_eq!(table.kind_at(0x100), Some(BreakpointKind::Hardware));
    }

    #[test]
    fn remove_ignores_a_mismatched_length() {
        let mut table = BreakpointTable::new();
        table.insert(0x200, BreakpointKind::Software, 4);
        // A debugger may not echo the same length on `z` that it sent on
        // `Z`; removal must still succeed by address+kind alone.
        table.remove(0x200, BreakpointKind::Software, 1);
        assert!(!table.contains(0x200));
    }
}
