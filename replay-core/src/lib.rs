// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The replayable CPU state machine and breakpoint/run controller.
//!
//! This crate owns components B, C, and D from the design: a trace cursor
//! that reconstructs architectural state by applying/unapplying recorded
//! deltas ([`CpuState`]), a process-wide breakpoint set
//! ([`BreakpointTable`]), and the four motions a debugger can request
//! ([`step_forward`], [`step_backward`], [`continue_forward`],
//! [`continue_backward`]). It never parses a trace file and never speaks
//! RSP; both of those are someone else's job.

mod breakpoints;
mod controller;
mod cpu_state;
mod error;

pub use breakpoints::{BreakpointKind, BreakpointTable};
pub use controller::{
    continue_backward, continue_forward, step_backward, step_forward, StopReason,
};
pub use cpu_state::CpuState;
pub use error::{BoundaryKind, SessionError};
