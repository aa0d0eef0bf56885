//! Multi-line condition parser
//!
//! Counts operators on continuation lines of conditions that span several
//! lines, e.g. the second and third line of
//!
//! ```text
//! if (
//!   ready &&
//!   !failed
//! ) {
//! ```
//!
//! Lines the boolean expression parser already owns (returns, boolean
//! assignments, parenthesized or markup expressions) are left alone.

use crate::context::{self, LineContext};
use crate::decision::{DecisionKind, DecisionPoint};
use crate::patterns;

/// How far back a continuation may sit from its condition
const LOOKBACK_LINES: usize = 5;

/// Emit one point per `&&` / `||` on `line`
pub fn process_multi_line_condition_operators(
    line: &str,
    line_num: usize,
    function_line: usize,
) -> Vec<DecisionPoint> {
    patterns::logical_operators(line)
        .into_iter()
        .filter_map(|(column, op)| {
            DecisionKind::from_operator(op)
                .map(|kind| DecisionPoint::new(line_num, kind, op, function_line, column))
        })
        .collect()
}

/// Does `lines[index]` continue a condition or operator chain started above?
pub fn is_continuing_multi_line_condition(index: usize, lines: &[&str]) -> bool {
    for back in 1..=LOOKBACK_LINES.min(index) {
        let previous = lines[index - back];
        let has_operator = patterns::has_logical_operator(previous);

        if (patterns::is_jsx_expression(previous) && has_operator)
            || patterns::is_boolean_assignment(previous)
        {
            return false;
        }
        let trimmed = previous.trim_end();
        if (trimmed.ends_with(';') || trimmed.ends_with('}')) && !has_operator {
            return false;
        }
        if patterns::is_condition_start(previous) || has_operator {
            return true;
        }
    }
    false
}

/// Lines this parser never touches
fn is_excluded(line: &str, index: usize, lines: &[&str]) -> bool {
    index == 0
        || patterns::is_if_statement(line)
        || patterns::is_else_if(line)
        || patterns::is_condition_start(line)
        || patterns::is_jsx_expression(line)
        || context::is_jsx_continuation(line, index, lines)
        || context::is_boolean_expression(line)
}

/// Does this parser own the operators on `lines[index]`?
///
/// Shared with [`LineContext`] so the boolean expression parser can skip the
/// same lines.
pub fn claims_line(line: &str, index: usize, lines: &[&str]) -> bool {
    if is_excluded(line, index, lines) || !patterns::has_logical_operator(line) {
        return false;
    }
    let previous = lines[index - 1];
    if context::is_boolean_expression(previous) {
        return false;
    }
    patterns::is_condition_start(previous) || is_continuing_multi_line_condition(index, lines)
}

/// Points for a continuation line of a multi-line condition
///
/// Whether the line continues a condition is read from `ctx` alone; callers
/// building their own context decide that themselves.
pub fn parse(
    line_without_comments: &str,
    line_num: usize,
    function_line: usize,
    ctx: &LineContext,
) -> Vec<DecisionPoint> {
    if !ctx.continues_multi_line_condition {
        return Vec::new();
    }
    tracing::trace!(line = line_num, function_line, "multi-line condition continuation");
    process_multi_line_condition_operators(line_without_comments, line_num, function_line)
}
