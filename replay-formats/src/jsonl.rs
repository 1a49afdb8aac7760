// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `jsonl`: one `TraceEvent` per line, JSON-encoded. Not a simulator output
//! format; this is the format the test suite's fixtures and hand-authored
//! traces are written in, since it round-trips the data model exactly with
//! no reconstruction step.

use replay_trace::{Architecture, MaterializedTraceSource, TraceEvent};

use crate::FormatError;

/// Parses a buffer of newline-separated JSON `TraceEvent` objects.
///
/// Blank lines are skipped; everything else must parse as a `TraceEvent` or
/// the whole load fails (this format has no recovery story — it is either
/// a well-formed fixture or a mistake).
pub fn parse(text: &str, architecture: Architecture) -> Result<MaterializedTraceSource, FormatError> {
    let mut events = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(line)
            .map_err(|e| FormatError::Malformed(format!("line {}: {e}", lineno + 1)))?;
        events.push(event);
    }
    Ok(MaterializedTraceSource::new(events, architecture)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_trace::TraceSource;

    #[test]
    fn parses_a_minimal_two_event_trace() {
        let text = r#"
            {"index":0,"pc_before":0,"pc_after":4,"reg_writes":[{"reg":10,"new_value":1}]}
            {"index":1,"pc_before":4,"pc_after":8,"reg_writes":[{"reg":10,"old_value":1,"new_value":2}]}
        "#;
        let source = parse(text, Architecture::riscv32()).unwrap();
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse("{not json}", Architecture::riscv32()).unwrap_err();
        assert!(matches!(err, FormatError::Malformed(_)));
    }
}
