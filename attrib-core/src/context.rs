//! Per-line context computed once by the driver and shared by every parser

use crate::boundary::BoundaryIndex;
use crate::parsers::multiline;
use crate::patterns;

/// Classification of one comment-stripped source line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineContext {
    pub is_if_statement: bool,
    pub is_else_if: bool,
    pub is_condition_start: bool,
    /// `if`, `else if`, `for`, `while`, `switch` or `catch` header
    pub is_control_structure: bool,
    pub is_return_statement: bool,
    pub is_boolean_assignment: bool,
    /// Return, boolean assignment, parenthesized operator or inline markup
    pub is_boolean_expression: bool,
    pub is_jsx_expression: bool,
    pub is_jsx_continuation: bool,
    pub has_logical_operator: bool,
    pub has_ternary: bool,
    /// The multi-line condition parser owns this line's operators
    pub continues_multi_line_condition: bool,
    /// Some function's boundary starts on this line
    pub is_function_signature_line: bool,
}

impl LineContext {
    /// Classify `line`, the comment-stripped text of `lines[index]`
    pub fn analyze(line: &str, index: usize, lines: &[&str], boundaries: &BoundaryIndex) -> Self {
        let is_jsx_expression = patterns::is_jsx_expression(line);
        let is_jsx_continuation = is_jsx_continuation(line, index, lines);
        let is_boolean_assignment = patterns::is_boolean_assignment(line);
        let is_return_statement = patterns::is_return_statement(line);

        LineContext {
            is_if_statement: patterns::is_if_statement(line),
            is_else_if: patterns::is_else_if(line),
            is_condition_start: patterns::is_condition_start(line),
            is_control_structure: patterns::is_control_header(line),
            is_return_statement,
            is_boolean_assignment,
            is_boolean_expression: is_return_statement
                || is_boolean_assignment
                || patterns::has_logical_in_parens(line)
                || is_jsx_expression
                || is_jsx_continuation,
            is_jsx_expression,
            is_jsx_continuation,
            has_logical_operator: patterns::has_logical_operator(line),
            has_ternary: patterns::has_ternary(line),
            continues_multi_line_condition: multiline::claims_line(line, index, lines),
            is_function_signature_line: boundaries.starting_on(index + 1).next().is_some(),
        }
    }
}

/// Return, boolean assignment, parenthesized operator or inline markup, judged on one line
pub fn is_boolean_expression(line: &str) -> bool {
    patterns::is_return_statement(line)
        || patterns::is_boolean_assignment(line)
        || patterns::has_logical_in_parens(line)
        || patterns::is_jsx_expression(line)
}

/// Operator line inside a markup bracket opened on the previous line
pub fn is_jsx_continuation(line: &str, index: usize, lines: &[&str]) -> bool {
    if index == 0 || patterns::is_control_header(line) {
        return false;
    }
    let Some(previous) = lines.get(index - 1) else {
        return false;
    };
    patterns::opens_bracket(previous) && patterns::has_logical_operator(line) && !line.contains('{')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::FunctionBoundary;

    #[test]
    fn test_analyze_condition_header() {
        let lines = ["function f(a, b) {", "  if (a && b) {", "  }", "}"];
        let index = BoundaryIndex::new(vec![FunctionBoundary::new(1, 4)]);
        let ctx = LineContext::analyze(lines[1], 1, &lines, &index);
        assert!(ctx.is_if_statement);
        assert!(ctx.is_condition_start);
        assert!(ctx.is_control_structure);
        assert!(ctx.is_boolean_expression);
        assert!(!ctx.is_function_signature_line);
        assert!(!ctx.continues_multi_line_condition);

        let ctx = LineContext::analyze(lines[0], 0, &lines, &index);
        assert!(ctx.is_function_signature_line);
        assert!(!ctx.has_logical_operator);
    }

    #[test]
    fn test_jsx_continuation() {
        let lines = ["  <div>{", "    visible && <Panel />", "  }</div>"];
        assert!(is_jsx_continuation(lines[1], 1, &lines));
        assert!(!is_jsx_continuation(lines[0], 0, &lines));
        assert!(!is_jsx_continuation(lines[2], 2, &lines));
    }

    #[test]
    fn test_return_is_boolean_expression() {
        assert!(is_boolean_expression("  return a || b;"));
        assert!(is_boolean_expression("  const ok = a && b;"));
        assert!(!is_boolean_expression("    b &&"));
    }
}
