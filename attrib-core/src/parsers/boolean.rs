//! Boolean expression operator parser
//!
//! Counts `&&` / `||` on single-line boolean contexts: returns, boolean
//! assignments, parenthesized expressions, inline markup expressions and any
//! other operator line that is not a control header the multi-line condition
//! parser already owns.

use crate::boundary::BoundaryIndex;
use crate::context::LineContext;
use crate::decision::{DecisionKind, DecisionPoint};
use crate::oracle::{LiteralOracle, TernaryOracle};
use crate::patterns;

/// Does the line belong to this parser at all?
fn qualifies(ctx: &LineContext) -> bool {
    if ctx.continues_multi_line_condition {
        return false;
    }
    ctx.is_boolean_expression || (ctx.has_logical_operator && !ctx.is_control_structure)
}

/// Function owning an operator at `column`
///
/// When callbacks start on this line and an arrow or `function` keyword sits
/// before the operator, the operator goes to the innermost function that did
/// not start here.
fn operator_owner(
    original_line: &str,
    column: usize,
    line_num: usize,
    function_line: usize,
    boundaries: &BoundaryIndex,
) -> usize {
    if boundaries.starting_on(line_num).next().is_none()
        || !patterns::callback_marker_before(original_line, column)
    {
        return function_line;
    }
    boundaries
        .containing(line_num)
        .filter(|f| f.start() != line_num)
        .min_by(|a, b| a.size().cmp(&b.size()).then_with(|| b.start().cmp(&a.start())))
        .map_or(function_line, |f| f.function_line)
}

/// Points for `&&` / `||` on a boolean-expression line
#[allow(clippy::too_many_arguments)]
pub fn parse(
    line_without_comments: &str,
    original_line: &str,
    line_num: usize,
    index: usize,
    lines: &[&str],
    function_line: usize,
    boundaries: &BoundaryIndex,
    literals: &dyn LiteralOracle,
    ternaries: &dyn TernaryOracle,
    ctx: &LineContext,
) -> Vec<DecisionPoint> {
    if !qualifies(ctx) {
        return Vec::new();
    }
    if ctx.has_ternary {
        tracing::trace!(line = line_num, "skipping ternary line");
        return Vec::new();
    }
    let has_question_mark = patterns::ternary_question_mark(line_without_comments).is_some();
    let ternary = ternaries.detect_multi_line_ternaries(
        line_without_comments,
        index,
        lines,
        has_question_mark,
    );
    if ternary.is_multi_line_ternary_condition_line {
        tracing::trace!(line = line_num, "skipping multi-line ternary condition");
        return Vec::new();
    }

    let mut points = Vec::new();
    for (column, op) in patterns::logical_operators(original_line) {
        if literals.is_inside_comment(original_line, column)
            || literals.is_inside_string_literal(original_line, column)
            || literals.is_operator_in_string_literal(original_line, column)
        {
            continue;
        }
        let Some(kind) = DecisionKind::from_operator(op) else {
            continue;
        };
        let owner = operator_owner(original_line, column, line_num, function_line, boundaries);
        points.push(DecisionPoint::new(line_num, kind, op, owner, column));
    }
    points
}
