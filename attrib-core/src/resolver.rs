//! Assignment resolver - decides which function owns a line's decision points
//!
//! Global invariants enforced:
//! - Innermost open function wins for ordinary lines
//! - Control-structure headers are never owned by a callback that starts on
//!   the same line while an earlier-starting function also contains it
//! - Deterministic tie-breaks: smallest boundary, then latest start

use crate::boundary::{BoundaryIndex, FunctionBoundary, LineFunctionMap};
use crate::error::AttributionError;
use std::cmp::Ordering;

/// Functions from `functions` whose boundary contains `line`
pub fn containing_functions(line: usize, functions: &[FunctionBoundary]) -> Vec<FunctionBoundary> {
    functions
        .iter()
        .filter(|f| f.contains_line(line))
        .copied()
        .collect()
}

/// Smaller boundary first; for equal sizes the later start (more nested) first
fn innermost_order(a: &FunctionBoundary, b: &FunctionBoundary) -> Ordering {
    a.size()
        .cmp(&b.size())
        .then_with(|| b.start().cmp(&a.start()))
}

fn smallest<'a>(
    functions: impl Iterator<Item = &'a FunctionBoundary>,
) -> Option<&'a FunctionBoundary> {
    functions.min_by(|a, b| innermost_order(a, b))
}

/// Innermost function containing `line`
pub fn get_innermost_function(line: usize, functions: &[FunctionBoundary]) -> Option<usize> {
    smallest(functions.iter().filter(|f| f.contains_line(line))).map(|f| f.function_line)
}

/// Function line of a callback starting on `line`, or `default_line` if none does
///
/// Used where a construct on a declaration line (default parameters of an
/// arrow callback, for instance) belongs to the function being declared rather
/// than to the function the line sits in.
pub fn find_callback_function_line(line: usize, index: &BoundaryIndex, default_line: usize) -> usize {
    smallest(index.starting_on(line))
        .map(|f| f.function_line)
        .unwrap_or(default_line)
}

/// Resolve the function that owns an ordinary line
///
/// Errors when `line_map` holds no candidate for `line`: the caller handed the
/// resolver a line outside every function boundary.
pub fn resolve_owner(
    line: usize,
    line_map: &LineFunctionMap,
    index: &BoundaryIndex,
) -> Result<usize, AttributionError> {
    let candidates: &[FunctionBoundary] = line_map.get(&line).map(Vec::as_slice).unwrap_or(&[]);
    let Some(first) = candidates.first() else {
        return Err(AttributionError::NoContainingFunction { line });
    };
    if candidates.len() == 1 {
        return Ok(first.function_line);
    }

    let mut valid = containing_functions(line, candidates);
    match valid.as_slice() {
        [] => return Ok(first.function_line),
        [only] => return Ok(only.function_line),
        _ => {}
    }
    valid.sort_by_key(|f| f.start());

    if let Some(parent) = immediate_parent(line, &valid) {
        if let Some(owner) = resolve_against_parent(line, parent, &valid, index) {
            return Ok(owner);
        }
    }

    // Fallback: same-line functions first, then the smallest containing one
    if let Some(f) = smallest(valid.iter().filter(|f| f.start() == line)) {
        return Ok(f.function_line);
    }
    smallest(valid.iter())
        .map(|f| f.function_line)
        .ok_or(AttributionError::NoContainingFunction { line })
}

/// Function that opened before `line` and is still open on it, innermost first
fn immediate_parent(line: usize, valid: &[FunctionBoundary]) -> Option<FunctionBoundary> {
    smallest(
        valid
            .iter()
            .filter(|f| f.start() < line && line <= f.end()),
    )
    .copied()
}

/// Steps that weigh callbacks and nested functions against the immediate parent
fn resolve_against_parent(
    line: usize,
    parent: FunctionBoundary,
    valid: &[FunctionBoundary],
    index: &BoundaryIndex,
) -> Option<usize> {
    // Callbacks starting on this line inside the parent
    let starting_here: Vec<&FunctionBoundary> = valid
        .iter()
        .filter(|f| f.start() == line && parent.boundary.encloses(&f.boundary))
        .collect();
    if !starting_here.is_empty() {
        let single_line = smallest(
            starting_here
                .iter()
                .copied()
                .filter(|f| f.boundary.is_single_line_at(line)),
        );
        return Some(single_line.map_or(parent.function_line, |f| f.function_line));
    }

    let nested: Vec<&FunctionBoundary> = index
        .functions()
        .iter()
        .filter(|f| f.start() > parent.start() && f.end() <= parent.end())
        .collect();
    let ended: Vec<&FunctionBoundary> = nested.iter().copied().filter(|f| f.end() <= line).collect();

    if let Some(f) = smallest(
        ended
            .iter()
            .copied()
            .filter(|f| f.boundary.is_single_line_at(line)),
    ) {
        return Some(f.function_line);
    }
    let closed_before = ended
        .iter()
        .any(|f| f.end() < line || !f.boundary.is_single_line_at(line));
    if closed_before {
        return Some(parent.function_line);
    }

    smallest(
        nested
            .iter()
            .copied()
            .filter(|f| f.start() < line && f.end() > line),
    )
    .map(|f| f.function_line)
}

/// Resolve the owner of a control-structure header (`if`, `for`, `while`, `switch`)
///
/// `containing` is every function that started on or before the line, so it may
/// hold functions that already ended. Non-control lines and every case this
/// rule does not settle defer to [`resolve_owner`].
pub fn resolve_owner_for_control_structure(
    is_control_structure: bool,
    line: usize,
    containing: &[FunctionBoundary],
    index: &BoundaryIndex,
    line_map: &LineFunctionMap,
) -> Result<usize, AttributionError> {
    if !is_control_structure {
        return resolve_owner(line, line_map, index);
    }

    let open = containing_functions(line, containing);
    let Some(earliest) = open.iter().min_by_key(|f| f.start()) else {
        return resolve_owner(line, line_map, index);
    };

    let has_same_line_callback = open.iter().any(|f| f.start() == line);
    if has_same_line_callback && earliest.start() != line {
        // Most recent parent that is still open, ignoring the same-line callbacks
        let owner = open
            .iter()
            .filter(|f| f.start() != line)
            .max_by(|a, b| a.start().cmp(&b.start()).then_with(|| b.size().cmp(&a.size())));
        return match owner {
            Some(f) => Ok(f.function_line),
            None => resolve_owner(line, line_map, index),
        };
    }

    let some_already_ended = containing.iter().any(|f| f.end() < line);
    if !has_same_line_callback && open.len() > 1 && some_already_ended {
        if let Some(outermost) = open
            .iter()
            .max_by(|a, b| a.size().cmp(&b.size()).then_with(|| b.start().cmp(&a.start())))
        {
            return Ok(outermost.function_line);
        }
    }

    resolve_owner(line, line_map, index)
}
