// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Concrete `TraceSource` implementors, and a small registry mapping a
//! `-f <format>` string to one of them.
//!
//! Nothing in `replay-core` or `rsp-protocol` knows any of these formats
//! exist; they are external collaborators that produce the same
//! `TraceSource` trait object the core already consumes.

mod jsonl;
mod sifive_rtl;
mod spike;

use std::fmt;
use std::rc::Rc;

use replay_trace::{Architecture, TraceError, TraceSource};

/// Everything that can go wrong turning raw trace bytes into events.
#[derive(Debug)]
pub enum FormatError {
    /// The format string passed to `-f` does not name a known format.
    UnknownFormat(String),
    /// The bytes did not parse as the named format.
    Malformed(String),
    /// Parsing succeeded but produced an invalid event sequence.
    Trace(TraceError),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::UnknownFormat(name) => write!(f, "unknown trace format: {name}"),
            FormatError::Malformed(msg) => write!(f, "malformed trace: {msg}"),
            FormatError::Trace(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<TraceError> for FormatError {
    fn from(e: TraceError) -> Self {
        FormatError::Trace(e)
    }
}

/// The formats recognized by `-f`/`--format`, for CLI help and validation.
pub const KNOWN_FORMATS: &[&str] = &["spike", "sifive-rtl", "jsonl"];

/// Parses `text` as `format`, assuming `architecture` (the `-f` flag
/// selects the parser; the target architecture is presently always
/// `riscv32`/`riscv64`, since that is what both simulator formats emit).
///
/// Returns a trait object so the server binary never names a concrete
/// format type.
pub fn parse(format: &str, text: &str, architecture: Architecture) -> Result<Rc<dyn TraceSource>, FormatError> {
    let source = match format {
        "spike" => spike::parse(text, architecture)?,
        "sifive-rtl" => sifive_rtl::parse(text, architecture)?,
        "jsonl" => jsonl::parse(text, architecture)?,
        other => return Err(FormatError::UnknownFormat(other.to_string())),
    };
    Ok(Rc::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected() {
        let err = parse("does-not-exist", "", Architecture::riscv32()).unwrap_err();
        assert!(matches!(err, FormatError::UnknownFormat(name) if name == "does-not-exist"));
    }
}
