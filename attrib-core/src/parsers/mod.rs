//! Decision-point parsers
//!
//! Each parser inspects one line and returns the points it found. The driver
//! merges their output; no parser sees another's results.

pub mod boolean;
pub mod default_params;
pub mod multiline;
