//! Default parameter parser
//!
//! Emits one `default parameter` point per `name = value` default found in
//! function signatures, arrow parameter lists (single- or multi-line,
//! destructured or not) and destructured variable declarations at the top of
//! a function body.
//!
//! Every line goes through a single qualification path, so one construct is
//! never reported twice by this parser.

use crate::boundary::{BoundaryIndex, FunctionBoundary};
use crate::decision::{DecisionKind, DecisionPoint};
use crate::patterns;
use crate::resolver;

/// Forward window searched for the end of a parameter list
const PARAM_SCAN_LINES: usize = 20;
/// Non-blank lines searched for an arrow after a parameter line
const ARROW_LOOKAHEAD_LINES: usize = 5;
/// Lines searched backwards for the opening tag of a markup element
const MARKUP_LOOKBACK_LINES: usize = 10;
/// Destructured defaults are only looked for this close to the function start
const DESTRUCTURE_WINDOW_LINES: usize = 15;
/// Lines searched backwards for a `const {` opener
const DESTRUCTURE_LOOKBACK_LINES: usize = 10;

/// One `name = value` default found on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultParamMatch {
    pub name: String,
    /// Byte column of the parameter name in the scanned line
    pub column: usize,
}

/// Byte range between a `(` and its matching `)`, exclusive of both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpan {
    pub start: usize,
    pub end: usize,
}

/// State threaded line by line while looking for the end of a parameter list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterScanState {
    pub paren_depth: usize,
    pub brace_depth: usize,
    pub found_param_start: bool,
    pub found_closing_paren: bool,
}

/// Parameter-list end found while feeding a line to the scan state
enum ScanStep {
    Continue,
    End,
}

impl ParameterScanState {
    fn feed(&mut self, line: &str) -> ScanStep {
        let bytes = line.as_bytes();
        let mut step = ScanStep::Continue;
        patterns::for_each_code_byte(line, |idx, b| {
            if matches!(step, ScanStep::End) {
                return;
            }
            match b {
                b'(' => {
                    self.paren_depth += 1;
                    self.found_param_start = true;
                }
                b')' => {
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    if self.found_param_start {
                        self.found_closing_paren = true;
                    }
                }
                b'{' => {
                    if self.found_closing_paren && self.paren_depth == 0 && self.brace_depth == 0 {
                        step = ScanStep::End;
                    } else {
                        self.brace_depth += 1;
                    }
                }
                b'}' => self.brace_depth = self.brace_depth.saturating_sub(1),
                b'=' if bytes.get(idx + 1) == Some(&b'>') => step = ScanStep::End,
                _ => {}
            }
        });
        step
    }
}

/// Span of the first parenthesized group starting at or after `from`
///
/// `None` when there is no `(` or it is never closed on this line.
pub fn find_param_boundaries_with_parens(line: &str, from: usize) -> Option<ParamSpan> {
    let mut depth = 0usize;
    let mut open = None;
    let mut span = None;
    patterns::for_each_code_byte(line, |idx, b| {
        if idx < from || span.is_some() {
            return;
        }
        match b {
            b'(' => {
                if open.is_none() {
                    open = Some(idx);
                }
                depth += 1;
            }
            b')' if open.is_some() => {
                depth -= 1;
                if depth == 0 {
                    span = open.map(|start| ParamSpan {
                        start: start + 1,
                        end: idx,
                    });
                }
            }
            _ => {}
        }
    });
    span
}

/// Defaults on `line`
///
/// With `within_param_list` the whole line is parameter text; otherwise only
/// the first parenthesized group (or everything after an unclosed `(`) is
/// searched. `limit` caps the number of matches.
pub fn match_default_parameters(
    line: &str,
    within_param_list: bool,
    limit: Option<usize>,
) -> Vec<DefaultParamMatch> {
    let (offset, text) = if within_param_list {
        (0, line)
    } else if let Some(span) = find_param_boundaries_with_parens(line, 0) {
        (span.start, &line[span.start..span.end])
    } else if let Some(open) = line.find('(') {
        (open + 1, &line[open + 1..])
    } else {
        return Vec::new();
    };

    let matches = patterns::default_parameter_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|name| DefaultParamMatch {
            name: name.as_str().to_string(),
            column: offset + name.start(),
        });
    match limit {
        Some(n) => matches.take(n).collect(),
        None => matches.collect(),
    }
}

/// Span of the parameter list belonging to the function declared on `line`
///
/// Whichever of a `function` keyword or an arrow comes first decides which
/// group that is. A bare-identifier arrow parameter has no span. Method
/// shorthand falls back to the first group when it closes before any arrow.
pub fn signature_parameters(line: &str) -> Option<ParamSpan> {
    let arrow = patterns::first_arrow_position(line);
    let keyword = patterns::function_keyword_position(line)
        .filter(|&k| arrow.map_or(true, |a| k < a));
    if let Some(k) = keyword {
        return find_param_boundaries_with_parens(line, k);
    }
    if let Some(span) = arrow.and_then(|a| arrow_parameters(line, a)) {
        return Some(span);
    }
    find_param_boundaries_with_parens(line, 0)
        .filter(|span| arrow.map_or(true, |a| span.end < a))
}

/// Group closed right before the arrow at `arrow`, allowing a return type annotation
fn arrow_parameters(line: &str, arrow: usize) -> Option<ParamSpan> {
    let head = &line[..arrow];
    let mut open = Vec::new();
    let mut last = None;
    patterns::for_each_code_byte(head, |idx, b| match b {
        b'(' => open.push(idx),
        b')' => {
            if let Some(start) = open.pop() {
                last = Some(ParamSpan {
                    start: start + 1,
                    end: idx,
                });
            }
        }
        _ => {}
    });
    let span = last?;
    let between = head[span.end + 1..].trim();
    (between.is_empty() || between.starts_with(':')).then_some(span)
}

fn match_in_span(line: &str, span: ParamSpan) -> Vec<DefaultParamMatch> {
    match_default_parameters(&line[span.start..span.end], true, None)
        .into_iter()
        .map(|m| DefaultParamMatch {
            column: m.column + span.start,
            ..m
        })
        .collect()
}

/// The group still open at the end of `lines[index]` closes on `lines[arrow_index]`
fn group_closes_on(lines: &[&str], index: usize, arrow_index: usize) -> bool {
    let mut depth = 0usize;
    patterns::for_each_code_byte(lines[index], |_, b| match b {
        b'(' => depth += 1,
        b')' => depth = depth.saturating_sub(1),
        _ => {}
    });
    if depth == 0 {
        return false;
    }
    let target = depth - 1;
    let mut closed_at = None;
    for (i, line) in lines.iter().enumerate().take(arrow_index + 1).skip(index + 1) {
        patterns::for_each_code_byte(line, |_, b| {
            if closed_at.is_some() {
                return;
            }
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == target {
                        closed_at = Some(i);
                    }
                }
                _ => {}
            }
        });
        if closed_at.is_some() {
            break;
        }
    }
    closed_at == Some(arrow_index)
}

/// Index of the first arrow within the next few non-blank lines after `index`
fn arrow_ahead(lines: &[&str], index: usize) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .skip(index + 1)
        .filter(|(_, l)| !l.trim().is_empty())
        .take(ARROW_LOOKAHEAD_LINES)
        .find(|(_, l)| patterns::has_arrow(l))
        .map(|(i, _)| i)
}

/// Index of the line ending the parameter list declared on `lines[decl_index]`
///
/// Scans forward at most [`PARAM_SCAN_LINES`]; an arrow or a body brace after
/// the closing parenthesis ends the list. The brace rule does not require a
/// `function` keyword, so method shorthand such as `load(retries = 2) {` ends
/// at its body too. When the scan is inconclusive:
/// 1. a default on the declaration line itself ends the list one line later;
/// 2. a default on `lines[current_index]` ends it at the first arrow among the
///    next few non-blank lines.
pub fn find_parameter_list_end(
    lines: &[&str],
    decl_index: usize,
    current_index: usize,
) -> Option<usize> {
    let mut state = ParameterScanState::default();
    for (i, line) in lines
        .iter()
        .enumerate()
        .skip(decl_index)
        .take(PARAM_SCAN_LINES)
    {
        if let ScanStep::End = state.feed(line) {
            return Some(i);
        }
    }

    let current = lines.get(current_index)?;
    let has_default = patterns::has_default_parameter_pattern(current);
    if current_index == decl_index && has_default {
        return Some(decl_index + 1);
    }
    if has_default {
        return arrow_ahead(lines, current_index);
    }
    None
}

/// Text before the first `)` that closes a parenthesis opened on an earlier line
fn before_unmatched_close(line: &str) -> &str {
    let mut depth = 0usize;
    let mut cut = None;
    patterns::for_each_code_byte(line, |idx, b| {
        if cut.is_some() {
            return;
        }
        match b {
            b'(' => depth += 1,
            b')' if depth == 0 => cut = Some(idx),
            b')' => depth -= 1,
            _ => {}
        }
    });
    &line[..cut.unwrap_or(line.len())]
}

/// Line is an attribute of a markup element opened at most ten lines above
fn is_markup_attribute_line(line: &str, index: usize, lines: &[&str]) -> bool {
    if patterns::has_markup_opening_tag(line) {
        return true;
    }
    for back in 1..=MARKUP_LOOKBACK_LINES.min(index) {
        let previous = lines[index - back];
        if patterns::has_markup_closing_tag(previous) || patterns::is_statement_keyword_line(previous) {
            return false;
        }
        if patterns::has_markup_opening_tag(previous) {
            return true;
        }
    }
    false
}

/// Line shapes whose `name = value` text is never a parameter default
fn is_excluded_context(line: &str, index: usize, lines: &[&str]) -> bool {
    patterns::is_type_declaration(line)
        || patterns::is_plain_variable_assignment(line)
        || patterns::is_return_statement(line)
        || patterns::is_bare_method_call(line)
        || patterns::is_multi_level_property_assignment(line)
        || patterns::is_dependency_array(line)
        || is_markup_attribute_line(line, index, lines)
}

/// Function whose multi-line parameter list contains `lines[index]`
fn enclosing_parameter_list(
    line_num: usize,
    index: usize,
    lines: &[&str],
    boundaries: &BoundaryIndex,
) -> Option<FunctionBoundary> {
    let mut declared: Vec<&FunctionBoundary> = boundaries
        .functions()
        .iter()
        .filter(|f| f.start() < line_num && line_num - f.start() < PARAM_SCAN_LINES)
        .collect();
    declared.sort_by(|a, b| b.start().cmp(&a.start()));
    declared
        .into_iter()
        .find(|f| {
            find_parameter_list_end(lines, f.start().saturating_sub(1), index)
                .is_some_and(|end| index <= end)
        })
        .copied()
}

fn to_points(matches: Vec<DefaultParamMatch>, line_num: usize, owner: usize) -> Vec<DecisionPoint> {
    matches
        .into_iter()
        .map(|m| DecisionPoint::new(line_num, DecisionKind::DefaultParameter, m.name, owner, m.column))
        .collect()
}

/// Defaults in function signatures and parameter lists
pub fn parse(
    line_without_comments: &str,
    line_num: usize,
    index: usize,
    lines: &[&str],
    function_line: usize,
    boundaries: &BoundaryIndex,
) -> Vec<DecisionPoint> {
    let line = line_without_comments;
    if !patterns::has_default_parameter_pattern(line) {
        return Vec::new();
    }

    // Signature lines bypass the context exclusions
    if boundaries.starting_on(line_num).next().is_some() {
        let owner = resolver::find_callback_function_line(line_num, boundaries, function_line);
        tracing::trace!(line = line_num, owner, "signature line defaults");
        let matches = signature_parameters(line)
            .map(|span| match_in_span(line, span))
            .unwrap_or_default();
        return to_points(matches, line_num, owner);
    }
    if is_excluded_context(line, index, lines) {
        return Vec::new();
    }

    if let Some(decl) = enclosing_parameter_list(line_num, index, lines, boundaries) {
        tracing::trace!(line = line_num, owner = decl.function_line, "parameter list defaults");
        let text = before_unmatched_close(line);
        return to_points(match_default_parameters(text, true, None), line_num, decl.function_line);
    }

    // Arrow parameter line whose function the boundaries place elsewhere
    if let Some(arrow) = line.find("=>") {
        let owner = resolver::find_callback_function_line(line_num, boundaries, function_line);
        return to_points(match_default_parameters(&line[..arrow], false, None), line_num, owner);
    }

    // Multi-line arrow parameters: the arrow shows up on a later line and
    // closes the group opened here; only a function starting there owns them
    if line.contains('(') && !patterns::is_control_header(line) {
        if let Some(arrow_index) = arrow_ahead(lines, index) {
            let arrow_line = arrow_index + 1;
            if boundaries.starting_on(arrow_line).next().is_none()
                || !group_closes_on(lines, index, arrow_index)
            {
                return Vec::new();
            }
            let owner = resolver::find_callback_function_line(arrow_line, boundaries, function_line);
            return to_points(match_default_parameters(line, false, None), line_num, owner);
        }
    }
    Vec::new()
}

/// Prefix of `line` that lies inside a `const { … } =` pattern, if any
fn destructuring_segment<'a>(
    line: &'a str,
    index: usize,
    lines: &[&str],
    function_start_index: usize,
) -> Option<&'a str> {
    let close = patterns::destructuring_close(line).unwrap_or(line.len());
    if patterns::is_destructuring_declaration_start(line) {
        return Some(&line[..close]);
    }

    let earliest = index
        .saturating_sub(DESTRUCTURE_LOOKBACK_LINES)
        .max(function_start_index);
    for back in (earliest..index).rev() {
        let previous = lines[back];
        if patterns::destructuring_close(previous).is_some() || previous.trim_end().ends_with(';') {
            return None;
        }
        if patterns::is_destructuring_declaration_start(previous) {
            return Some(&line[..close]);
        }
    }
    None
}

/// Defaults inside destructuring declarations near the top of a function
pub fn parse_destructured_assignments(
    line_without_comments: &str,
    line_num: usize,
    index: usize,
    lines: &[&str],
    function_line: usize,
    boundaries: &BoundaryIndex,
) -> Vec<DecisionPoint> {
    let line = line_without_comments;
    if !patterns::has_default_parameter_pattern(line) || patterns::is_plain_variable_assignment(line)
    {
        return Vec::new();
    }
    let Some(boundary) = boundaries.boundary_of(function_line) else {
        return Vec::new();
    };
    if line_num <= boundary.start || line_num - boundary.start >= DESTRUCTURE_WINDOW_LINES {
        return Vec::new();
    }

    match destructuring_segment(line, index, lines, boundary.start.saturating_sub(1)) {
        Some(segment) => {
            tracing::trace!(line = line_num, function_line, "destructured defaults");
            to_points(match_default_parameters(segment, true, None), line_num, function_line)
        }
        None => Vec::new(),
    }
}
