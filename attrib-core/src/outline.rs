//! Function outline scanner
//!
//! Finds function boundaries in JavaScript/TypeScript text without a parser:
//! `function` declarations and expressions, arrow functions and method
//! shorthand. Works on masked text (comments and literal contents blanked, see
//! [`crate::source::mask_code`]) so braces inside strings do not count.
//!
//! Global invariants enforced:
//! - Every outline satisfies `start <= end`
//! - An arrow function starts on the line holding the `(` of its parameters
//! - Output order is sorted (start ascending, end descending, name)

use crate::boundary::{BoundaryIndex, FunctionBoundary};
use crate::patterns;
use crate::source;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Lines an expression-bodied arrow may span
const MAX_EXPRESSION_LINES: usize = 200;

/// Identifiers that look like method names but start statements
const KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "do", "else", "new",
    "typeof", "await", "yield", "super", "import", "export", "throw", "delete", "void", "in", "of",
];

/// A function found in source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionOutline {
    pub name: String,
    pub function: FunctionBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pos {
    line: usize,
    col: usize,
}

impl Pos {
    fn new(line: usize, col: usize) -> Self {
        Pos { line, col }
    }

    fn next(self) -> Self {
        Pos::new(self.line, self.col + 1)
    }
}

fn byte_at(lines: &[&str], pos: Pos) -> Option<u8> {
    lines.get(pos.line)?.as_bytes().get(pos.col).copied()
}

/// First position at or after `from` whose byte satisfies `hit`
fn scan_forward(lines: &[&str], from: Pos, mut hit: impl FnMut(u8) -> bool) -> Option<Pos> {
    for (li, line) in lines.iter().enumerate().skip(from.line) {
        let start = if li == from.line { from.col } else { 0 };
        for (col, &b) in line.as_bytes().iter().enumerate().skip(start) {
            if hit(b) {
                return Some(Pos::new(li, col));
            }
        }
    }
    None
}

/// Last position at or before `from` whose byte satisfies `hit`
fn scan_backward(lines: &[&str], from: Pos, mut hit: impl FnMut(u8) -> bool) -> Option<Pos> {
    for li in (0..=from.line).rev() {
        let Some(line) = lines.get(li) else {
            continue;
        };
        let bytes = line.as_bytes();
        let end = if li == from.line {
            from.col.saturating_add(1).min(bytes.len())
        } else {
            bytes.len()
        };
        for (col, &b) in bytes[..end].iter().enumerate().rev() {
            if hit(b) {
                return Some(Pos::new(li, col));
            }
        }
    }
    None
}

fn next_code(lines: &[&str], from: Pos) -> Option<Pos> {
    scan_forward(lines, from, |b| !b.is_ascii_whitespace())
}

/// Last non-whitespace byte strictly before `pos`
fn prev_code(lines: &[&str], pos: Pos) -> Option<Pos> {
    let before = if pos.col > 0 {
        Pos::new(pos.line, pos.col - 1)
    } else if pos.line > 0 {
        Pos::new(pos.line - 1, usize::MAX)
    } else {
        return None;
    };
    scan_backward(lines, before, |b| !b.is_ascii_whitespace())
}

/// Closing bracket matching the opening one at `open`
fn matching_close(lines: &[&str], open: Pos, open_b: u8, close_b: u8) -> Option<Pos> {
    let mut depth = 0usize;
    scan_forward(lines, open, |b| {
        if b == open_b {
            depth += 1;
        } else if b == close_b {
            depth = depth.saturating_sub(1);
            return depth == 0;
        }
        false
    })
}

/// Opening bracket matching the closing one at `close`
fn matching_open(lines: &[&str], close: Pos, open_b: u8, close_b: u8) -> Option<Pos> {
    let mut depth = 0usize;
    scan_backward(lines, close, |b| {
        if b == close_b {
            depth += 1;
        } else if b == open_b {
            depth = depth.saturating_sub(1);
            return depth == 0;
        }
        false
    })
}

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bfunction\b\s*\*?\s*([A-Za-z_$][\w$]*)?\s*(?:<[^>(]*>)?\s*\(").unwrap()
    })
}

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(?:public|private|protected|static|async|override|abstract|get|set)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\(",
        )
        .unwrap()
    })
}

/// `): ReturnType` at the end of an arrow head
fn return_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\)\s*:\s*[^()=]*$").unwrap())
}

/// Arrow in a type position, e.g. `(e: Event) => void`
fn is_type_arrow(after: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(?:(?:void|boolean|string|number|any|unknown|never|bigint|symbol)(?:\[\])?",
            r"|Promise\s*<[^>]*>+",
            r"|[A-Z][\w$]*(?:\.[\w$]+)*(?:<[^>]*>+)?(?:\[\])?)",
            r"\s*(?:[;,)>|&]|$)",
        ))
        .unwrap()
    });
    re.is_match(after)
}

fn assign_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*(?::[^=]*)?=$").unwrap())
}

fn property_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*:$").unwrap())
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Name a function from the text in front of it
///
/// `const name =`, `this.name =` and `name:` give `name`; anything else is
/// anonymous.
fn infer_name(prefix: &str) -> String {
    let mut text = prefix.trim_end();
    if let Some(head) = text.strip_suffix("async") {
        if !head.bytes().last().is_some_and(is_ident_byte) {
            text = head.trim_end();
        }
    }
    if text.ends_with('>') {
        if let Some(open) = text.rfind('<') {
            text = text[..open].trim_end();
        }
    }

    let is_assignment = text.ends_with('=')
        && !["==", "!=", "<=", ">=", "+=", "-=", "|=", "&="]
            .iter()
            .any(|op| text.ends_with(op));
    if is_assignment {
        if let Some(caps) = assign_name_re().captures(text) {
            return caps[1].to_string();
        }
    }
    if let Some(caps) = property_name_re().captures(text) {
        return caps[1].to_string();
    }
    "<anonymous>".to_string()
}

/// Last line of an expression-bodied arrow whose body starts at `body`
fn expression_end(lines: &[&str], body: Pos) -> usize {
    let mut depth = 0isize;
    let last = lines.len().min(body.line + MAX_EXPRESSION_LINES);
    for (li, line) in lines.iter().enumerate().take(last).skip(body.line) {
        let start = if li == body.line { body.col } else { 0 };
        for &b in line.as_bytes().iter().skip(start) {
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth -= 1;
                    if depth < 0 {
                        return li;
                    }
                }
                b',' | b';' if depth == 0 => return li,
                _ => {}
            }
        }
        if depth == 0 && !line.trim().is_empty() && !continues_past(lines, li) {
            return li;
        }
    }
    last.saturating_sub(1).max(body.line)
}

/// The expression on `lines[li]` carries on to the next line
fn continues_past(lines: &[&str], li: usize) -> bool {
    let trimmed = lines[li].trim_end();
    let trailing = [
        "&&", "||", "??", "?", ":", "+", "-", "*", "/", "=", "(", ".", "=>", "<", ">",
    ];
    if trailing.iter().any(|t| trimmed.ends_with(t)) {
        return true;
    }
    let next = lines
        .iter()
        .skip(li + 1)
        .map(|l| l.trim_start())
        .find(|l| !l.is_empty());
    next.is_some_and(|l| [".", "?", ":", "&&", "||"].iter().any(|p| l.starts_with(p)))
}

/// Start position and prefix text of the parameters of the arrow at `arrow`
fn arrow_params(lines: &[&str], arrow: Pos) -> Option<(usize, String)> {
    let last = prev_code(lines, arrow)?;
    let line = lines[last.line];

    let close = match byte_at(lines, last)? {
        b')' => Some(last),
        b if is_ident_byte(b) || b == b'>' || b == b']' || b == b'}' => return_type_re()
            .find(&line[..=last.col])
            .map(|m| Pos::new(last.line, m.start())),
        _ => None,
    };
    if let Some(close) = close {
        let open = matching_open(lines, close, b'(', b')')?;
        return Some((open.line, lines[open.line][..open.col].to_string()));
    }

    // Single bare parameter: `x => …`
    let bytes = line.as_bytes();
    if !is_ident_byte(bytes[last.col]) {
        return None;
    }
    let mut start = last.col;
    while start > 0 && is_ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    Some((last.line, line[..start].to_string()))
}

/// Last line of a `{ … }` body whose brace is the first code at or after `from`
fn block_end(lines: &[&str], from: Pos) -> Option<usize> {
    let open = next_code(lines, from)?;
    if byte_at(lines, open)? != b'{' {
        return None;
    }
    matching_close(lines, open, b'{', b'}').map(|p| p.line)
}

/// Line index just past a type or interface declaration starting on `li`
fn type_declaration_end(lines: &[&str], li: usize) -> usize {
    let Some(col) = lines[li].find('{') else {
        return li;
    };
    matching_close(lines, Pos::new(li, col), b'{', b'}').map_or(li, |p| p.line)
}

struct Collector {
    found: Vec<FunctionOutline>,
}

impl Collector {
    fn push(&mut self, start_index: usize, end_index: usize, name: String) {
        let start = start_index + 1;
        let end = (end_index + 1).max(start);
        self.found.push(FunctionOutline {
            name,
            function: FunctionBoundary::new(start, end),
        });
    }

    fn function_keywords(&mut self, lines: &[&str], li: usize) {
        let line = lines[li];
        for caps in function_re().captures_iter(line) {
            let Some(m) = caps.get(0) else {
                continue;
            };
            let open = Pos::new(li, m.end() - 1);
            let Some(close) = matching_close(lines, open, b'(', b')') else {
                continue;
            };
            // Body brace, unless a `;` ends an overload or ambient declaration first
            let Some(body) = scan_forward(lines, close.next(), |b| b == b'{' || b == b';') else {
                continue;
            };
            if byte_at(lines, body) != Some(b'{') {
                continue;
            }
            let Some(end) = matching_close(lines, body, b'{', b'}') else {
                continue;
            };
            let name = caps
                .get(1)
                .map(|n| n.as_str().to_string())
                .unwrap_or_else(|| infer_name(&line[..m.start()]));
            self.push(li, end.line, name);
        }
    }

    fn arrows(&mut self, lines: &[&str], li: usize) {
        let line = lines[li];
        for (col, _) in line.match_indices("=>") {
            if is_type_arrow(&line[col + 2..]) {
                continue;
            }
            let Some((start, prefix)) = arrow_params(lines, Pos::new(li, col)) else {
                continue;
            };
            let Some(body) = next_code(lines, Pos::new(li, col + 2)) else {
                continue;
            };
            let end = if byte_at(lines, body) == Some(b'{') {
                match matching_close(lines, body, b'{', b'}') {
                    Some(p) => p.line,
                    None => continue,
                }
            } else {
                expression_end(lines, body)
            };
            self.push(start, end, infer_name(&prefix));
        }
    }

    fn method(&mut self, lines: &[&str], li: usize) {
        let Some(caps) = method_re().captures(lines[li]) else {
            return;
        };
        let (Some(m), Some(name)) = (caps.get(0), caps.get(1)) else {
            return;
        };
        if KEYWORDS.contains(&name.as_str()) {
            return;
        }
        let Some(close) = matching_close(lines, Pos::new(li, m.end() - 1), b'(', b')') else {
            return;
        };
        let Some(after) = next_code(lines, close.next()) else {
            return;
        };
        let end = match byte_at(lines, after) {
            Some(b'{') => block_end(lines, after),
            // Return type annotation before the body
            Some(b':') => scan_forward(lines, after, |b| b == b'{' || b == b';' || b == b'=')
                .filter(|p| byte_at(lines, *p) == Some(b'{'))
                .and_then(|p| block_end(lines, p)),
            _ => None,
        };
        if let Some(end) = end {
            self.push(li, end, name.as_str().to_string());
        }
    }
}

/// Outline functions in already-masked lines
pub fn outline_lines(masked: &[&str]) -> Vec<FunctionOutline> {
    let mut collector = Collector { found: Vec::new() };
    let mut li = 0;
    while li < masked.len() {
        if patterns::is_type_declaration(masked[li]) {
            li = type_declaration_end(masked, li) + 1;
            continue;
        }
        collector.function_keywords(masked, li);
        collector.arrows(masked, li);
        collector.method(masked, li);
        li += 1;
    }

    let mut found = collector.found;
    found.sort_by(|a, b| {
        a.function
            .start()
            .cmp(&b.function.start())
            .then(b.function.end().cmp(&a.function.end()))
            .then_with(|| a.name.cmp(&b.name))
    });
    found.dedup();
    found
}

/// Outline functions in raw source text
pub fn outline_source(source: &str) -> Vec<FunctionOutline> {
    let masked = source::mask_code(source);
    let lines: Vec<&str> = masked.lines().collect();
    let outlines = outline_lines(&lines);
    tracing::trace!(functions = outlines.len(), "outline complete");
    outlines
}

/// Boundary index over outlined functions
pub fn boundary_index(outlines: &[FunctionOutline]) -> BoundaryIndex {
    BoundaryIndex::new(outlines.iter().map(|o| o.function).collect())
}

/// Name of the first outlined function declared on `function_line`
pub fn name_of(outlines: &[FunctionOutline], function_line: usize) -> Option<&str> {
    outlines
        .iter()
        .find(|o| o.function.function_line == function_line)
        .map(|o| o.name.as_str())
}
