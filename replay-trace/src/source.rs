// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use crate::{Architecture, TraceEvent};

/// Something went wrong producing a [`TraceEvent`] sequence.
///
/// This is the `TraceError` kind from the error taxonomy: a parser handed
/// back an invalid event, or ran out of events before the core expected.
/// It is always fatal to session setup; there is no recovery path other
/// than refusing the connection.
#[derive(Debug)]
pub enum TraceError {
    /// The underlying format could not be parsed at all.
    Malformed(String),
    /// Event indices were not dense (a gap, a duplicate, or non-monotonic
    /// order).
    NonDenseIndex { expected: u64, found: u64 },
    /// `index` was requested but the trace has fewer events than that.
    OutOfRange { index: u64, len: u64 },
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::Malformed(msg) => write!(f, "malformed trace: {msg}"),
            TraceError::NonDenseIndex { expected, found } => write!(
                f,
                "trace event indices are not dense: expected {expected}, found {found}"
            ),
            TraceError::OutOfRange { index, len } => {
                write!(f, "trace event index {index} out of range (len {len})")
            }
        }
    }
}

impl std::error::Error for TraceError {}

/// A finite, ordered, randomly indexable sequence of [`TraceEvent`]s.
///
/// The replay core requires O(1) random access by index for cursor jumps
/// (spec'd reverse-continue to an arbitrary breakpoint can visit events in
/// either direction). A format that can only stream forward should collect
/// itself into a [`MaterializedTraceSource`] rather than implement this
/// trait directly against a cursor-less reader.
pub trait TraceSource {
    /// Number of events in the trace.
    fn len(&self) -> usize;

    /// Whether the trace has any events at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches the event at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::OutOfRange`] if `index >= self.len()`.
    fn event(&self, index: usize) -> Result<TraceEvent, TraceError>;

    /// The capability descriptor for the target this trace was recorded
    /// against.
    fn architecture(&self) -> Architecture;
}

/// Wraps an in-memory `Vec<TraceEvent>` as a [`TraceSource`].
///
/// Streaming parsers that cannot supply random access on their own should
/// drain themselves into one of these on first use, per spec §6/§9: "the
/// core materializes events lazily in a vector on first access."
pub struct MaterializedTraceSource {
    events: Vec<TraceEvent>,
    architecture: Architecture,
}

impl MaterializedTraceSource {
    /// Builds a materialized source from an already-parsed, dense event
    /// vector.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::NonDenseIndex`] if `events[i].index != i`.
    pub fn new(
        events: Vec<TraceEvent>,
        architecture: Architecture,
    ) -> Result<Self, TraceError> {
        for (i, event) in events.iter().enumerate() {
            if event.index != i as u64 {
                return Err(TraceError::NonDenseIndex {
                    expected: i as u64,
                    found: event.index,
                });
            }
        }
        Ok(Self {
            events,
            architecture,
        })
    }
}

impl TraceSource for MaterializedTraceSource {
    fn len(&self) -> usize {
        self.events.len()
    }

    fn event(&self, index: usize) -> Result<TraceEvent, TraceError> {
        self.events
            .get(index)
            .cloned()
            .ok_or(TraceError::OutOfRange {
                index: index as u64,
                len: self.events.len() as u64,
            })
    }

    fn architecture(&self) -> Architecture {
        self.architecture.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(index: u64) -> TraceEvent {
        TraceEvent {
            index,
            pc_before: index * 4,
            pc_after: (index + 1) * 4,
            reg_writes: vec![],
            mem_writes: vec![],
            mem_reads: vec![],
            disasm_hint: None,
        }
    }

    #[test]
    fn materialized_source_round_trips_events() {
        let events = vec![event(0), event(1), event(2)];
        let source =
            MaterializedTraceSource::new(events, Architecture::riscv32())
                .unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.event(1).unwrap().pc_before, 4);
    }

    #[test]
    fn non_dense_index_is_rejected() {
        let events = vec![event(0), event(2)];
        let err =
            MaterializedTraceSource::new(events, Architecture::riscv32())
                .unwrap_err();
        assert!(matches!(err, TraceError::NonDenseIndex { expected: 1, found: 2 }));
    }

    #[test]
    fn out_of_range_event_is_an_error() {
        let source =
            MaterializedTraceSource::new(vec![event(0)], Architecture::riscv32())
                .unwrap();
        assert!(matches!(
            source.event(5),
            Err(TraceError::OutOfRange { index: 5, len: 1 })
        ));
    }
}
