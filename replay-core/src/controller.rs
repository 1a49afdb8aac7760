// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::breakpoints::{BreakpointKind, BreakpointTable};
use crate::cpu_state::CpuState;
use crate::error::SessionError;

/// Why a motion stopped, plus `Interrupted` for the `0x03` mid-motion break
/// (reported by the dispatcher as `T02`, not `T05`, since it is not a trap).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Breakpoint { pc: u64, kind: BreakpointKind },
    StepComplete,
    TraceEnd,
    TraceStart,
    Interrupted,
}

/// One instruction forward. Does not consult the breakpoint table: a
/// single step always completes, even onto a breakpoint address (the
/// debugger will simply see the updated PC and can act on it itself).
pub fn step_forward(state: &mut CpuState) -> Result<StopReason, SessionError> {
    if state.at_end() {
        return Ok(StopReason::TraceEnd);
    }
    state.advance()?;
    Ok(StopReason::StepComplete)
}

/// One instruction backward.
pub fn step_backward(state: &mut CpuState) -> Result<StopReason, SessionError> {
    if state.at_start() {
        return Ok(StopReason::TraceStart);
    }
    state.retreat()?;
    Ok(StopReason::StepComplete)
}

/// Advances until the post-advance PC hits a breakpoint, the trace ends, or
/// `interrupted` reports a pending `0x03`.
///
/// `interrupted` is polled once per iteration, before each `advance`, so
/// that a waiting connection loop can drain its socket for the interrupt
/// byte between events without this function knowing anything about
/// sockets — the only suspension points are socket I/O.
///
/// At least one `advance` happens before the breakpoint set is consulted,
/// so continuing again from a breakpoint stop does not immediately
/// re-trigger on the same address.
pub fn continue_forward(
    state: &mut CpuState,
    breakpoints: &BreakpointTable,
    mut interrupted: impl FnMut() -> bool,
) -> Result<StopReason, SessionError> {
    loop {
        if interrupted() {
            return Ok(StopReason::Interrupted);
        }
        if state.at_end() {
            return Ok(StopReason::TraceEnd);
        }
        state.advance()?;
        let pc = state
            .read_reg(state.architecture().pc_register_id)
            .expect("pc is always available immediately after advance");
        if let Some(kind) = breakpoints.kind_at(pc) {
            return Ok(StopReason::Breakpoint { pc, kind });
        }
    }
}

/// Retreats until the post-retreat PC hits a breakpoint, the trace start is
/// reached, or `interrupted` reports a pending `0x03`. See
/// [`continue_forward`] for the interrupt-polling and no-reentry
/// discussion; the same reasoning applies in reverse.
pub fn continue_backward(
    state: &mut CpuState,
    breakpoints: &BreakpointTable,
    mut interrupted: impl FnMut() -> bool,
) -> Result<StopReason, SessionError> {
    loop {
        if interrupted() {
            return Ok(StopReason::Interrupted);
        }
        if state.at_start() {
            return Ok(StopReason::TraceStart);
        }
        state.retreat()?;
        if state.at_start() {
            return Ok(StopReason::TraceStart);
        }
        let pc = state
            .read_reg(state.architecture().pc_register_id)
            .expect("pc is always available immediately after retreat when not at start");
        if let Some(kind) = breakpoints.kind_at(pc) {
            return Ok(StopReason::Breakpoint { pc, kind });
        }
    }
}
