// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use replay_trace::TraceError;

/// Everything that can go wrong driving a [`crate::CpuState`] through the
/// [`crate::step_forward`]/[`crate::step_backward`]/[`crate::continue_forward`]/
/// [`crate::continue_backward`] motions.
///
/// This mirrors the `BoundaryError`/`TraceError` kinds from the error
/// taxonomy. `ProtocolError`, `StateError`, and `TransportError` live
/// closer to the wire and are handled in `rsp-protocol` and the server
/// binary instead, since this crate never sees a socket or a packet.
#[derive(Debug)]
pub enum SessionError {
    /// Tried to move the cursor past the boundary of the trace.
    Boundary(BoundaryKind),
    /// The underlying trace source could not produce the requested event.
    Trace(TraceError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryKind {
    /// `advance()` was called while already at the last event.
    AdvancePastEnd,
    /// `retreat()` was called while already before the first event.
    RetreatPastStart,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Boundary(BoundaryKind::AdvancePastEnd) => {
                write!(f, "cannot advance: already at the end of the trace")
            }
            SessionError::Boundary(BoundaryKind::RetreatPastStart) => {
                write!(f, "cannot retreat: already before the start of the trace")
            }
            SessionError::Trace(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<TraceError> for SessionError {
    fn from(e: TraceError) -> Self {
        SessionError::Trace(e)
    }
}
