//! Attrib core library - decision-point attribution for JavaScript and TypeScript
//!
//! Given source lines and the line boundaries of every function, finds the
//! `&&`, `||` and default-parameter decision points on each line and credits
//! each one to the function a cyclomatic-complexity rule would charge.

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Attribution is line-based and per-file
// - No global mutable state
// - Each decision site is attributed to exactly one function
// - Deterministic traversal order must be explicit
// - Parallel multi-file scans are re-sorted before they are returned
// - Identical input yields byte-for-byte identical output

pub mod boundary;
pub mod config;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod outline;
pub mod parsers;
pub mod patterns;
pub mod report;
pub mod resolver;
pub mod source;

pub use boundary::{Boundary, BoundaryIndex, FunctionBoundary, LineFunctionMap};
pub use config::ResolvedConfig;
pub use context::LineContext;
pub use decision::{DecisionKind, DecisionPoint};
pub use engine::{scan_path, scan_source, Engine, EngineOptions, FileScan, SourceScan};
pub use error::AttributionError;
pub use oracle::{LexicalOracle, LiteralOracle, OracleMode, PermissiveOracle, TernaryOracle};
pub use outline::FunctionOutline;
pub use report::{
    build_reports, render_json, render_points_jsonl, render_text, sort_reports,
    FunctionAttributionReport,
};
