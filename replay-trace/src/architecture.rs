// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Capability descriptor for a replayed target.
///
/// This is the "polymorphism over CPUs" mechanism: instead of a trait per
/// architecture, a `Session` is built from one of these, and every
/// register-shaped operation in `replay-core` and `rsp-protocol` goes
/// through it. A `TraceSource` hands one of these back from
/// [`crate::TraceSource::architecture`]; nothing downstream matches on a
/// target name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Architecture {
    /// Register names in architectural order. `g`/`G` encode/decode the
    /// register file in this order.
    pub register_names: &'static [&'static str],
    /// Width in bits of each register, same order as `register_names`.
    pub register_widths: &'static [u8],
    /// Index into both slices above of the program counter register.
    pub pc_register_id: usize,
    /// Static `qXfer:features:read:target.xml` payload, if this
    /// architecture wants to advertise one. When absent, the debugger
    /// falls back to its built-in description, and `register_names`/
    /// `register_widths` above must agree with that fallback's order.
    pub target_xml: Option<&'static str>,
}

impl Architecture {
    /// Number of architectural registers, including the PC.
    pub fn register_count(&self) -> usize {
        self.register_names.len()
    }

    /// Width in bits of register `id`, or `None` if `id` is out of range.
    pub fn register_width(&self, id: usize) -> Option<u8> {
        self.register_widths.get(id).copied()
    }

    /// Width in bytes of register `id`, or `None` if `id` is out of range.
    pub fn register_bytes(&self, id: usize) -> Option<usize> {
        self.register_width(id).map(|bits| (bits as usize + 7) / 8)
    }

    /// The generic 32-bit RISC-V target: `x0`..`x31` plus `pc`.
    pub fn riscv32() -> Self {
        Self {
            register_names: &RISCV_REGISTER_NAMES,
            register_widths: &[32; 33],
            pc_register_id: 32,
            target_xml: None,
        }
    }

    /// The generic 64-bit RISC-V target: same layout as [`Self::riscv32`]
    /// with doubled register width.
    pub fn riscv64() -> Self {
        Self {
            register_names: &RISCV_REGISTER_NAMES,
            register_widths: &[64; 33],
            pc_register_id: 32,
            target_xml: None,
        }
    }
}

#[rustfmt::skip]
const RISCV_REGISTER_NAMES: [&str; 33] = [
    "x0",  "x1",  "x2",  "x3",  "x4",  "x5",  "x6",  "x7",
    "x8",  "x9",  "x10", "x11", "x12", "x13", "x14", "x15",
    "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23",
    "x24", "x25", "x26", "x27", "x28", "x29", "x30", "x31",
    "pc",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn riscv32_has_33_registers_and_pc_last() {
        let arch = Architecture::riscv32();
        assert_eq!(arch.register_count(), 33);
        assert_eq!(arch.pc_register_id, 32);
        assert_eq!(arch.register_names[arch.pc_register_id], "pc");
        assert_eq!(arch.register_bytes(0), Some(4));
    }

    #[test]
    fn riscv64_doubles_register_width() {
        let arch = Architecture::riscv64();
        assert_eq!(arch.register_bytes(0), Some(8));
        assert_eq!(arch.register_bytes(32), Some(8));
    }

    #[test]
    fn out_of_range_register_is_none() {
        let arch = Architecture::riscv32();
        assert_eq!(arch.register_width(33), None);
    }
}
