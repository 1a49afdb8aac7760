// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use replay_core::{step_forward, CpuState, StopReason};
use replay_trace::Architecture;

#[test]
fn a_parsed_jsonl_trace_drives_the_replay_core() {
    let text = r#"
        {"index":0,"pc_before":0,"pc_after":4,"reg_writes":[{"reg":10,"new_value":1}]}
        {"index":1,"pc_before":4,"pc_after":8,"reg_writes":[{"reg":10,"old_value":1,"new_value":2}]}
    "#;
    let source = replay_formats::parse("jsonl", text, Architecture::riscv32()).unwrap();
    let mut state = CpuState::new(source);

    assert_eq!(step_forward(&mut state).unwrap(), StopReason::StepComplete);
    assert_eq!(state.read_reg(10), Some(1));
    assert_eq!(step_forward(&mut state).unwrap(), StopReason::StepComplete);
    assert_eq!(state.read_reg(10), Some(2));
    assert_eq!(step_forward(&mut state).unwrap(), StopReason::TraceEnd);
}

#[test]
fn a_parsed_spike_log_is_reversible_end_to_end() {
    let text = "\
core   0: 0x0000000080000000 (0x00000297) x5  0x0000000080000000
core   0: 0x0000000080000004 (0x00028293) x5  0x0000000080000010
";
    let source = replay_formats::parse("spike", text, Architecture::riscv32()).unwrap();
    let mut state = CpuState::new(source);

    step_forward(&mut state).unwrap();
    step_forward(&mut state).unwrap();
    assert_eq!(state.read_reg(5), Some(0x80000010));

    replay_core::step_backward(&mut state).unwrap();
    assert_eq!(state.read_reg(5), Some(0x80000000));
}
