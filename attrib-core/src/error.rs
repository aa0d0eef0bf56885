//! Typed errors raised by the attribution engine
//!
//! Everything else (I/O, configuration) uses `anyhow` with context.

use thiserror::Error;

/// Errors surfaced by the assignment resolver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributionError {
    /// The resolver was asked to attribute a line that no function contains.
    ///
    /// This is a caller contract violation: the boundary index handed to the
    /// resolver does not cover the line. It is never recovered from inside
    /// the engine.
    #[error("no function boundary contains line {line}")]
    NoContainingFunction { line: usize },
}
