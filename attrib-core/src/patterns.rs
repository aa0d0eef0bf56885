//! Named line predicates
//!
//! Every text heuristic the parsers rely on lives here behind a named
//! function so it can be tested on its own. Pure functions of the line text;
//! no I/O and no state beyond lazily compiled regexes.

use regex::Regex;
use std::sync::OnceLock;

/// Byte offsets and text of every `&&` / `||` in `line`
pub fn logical_operators(line: &str) -> Vec<(usize, &'static str)> {
    let bytes = line.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        let pair = &bytes[i..i + 2];
        if pair == b"&&" {
            found.push((i, "&&"));
            i += 2;
        } else if pair == b"||" {
            found.push((i, "||"));
            i += 2;
        } else {
            i += 1;
        }
    }
    found
}

pub fn has_logical_operator(line: &str) -> bool {
    line.contains("&&") || line.contains("||")
}

/// `if (`, `else if (`, `while (` or `for (` header
pub fn is_condition_start(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(?:\}\s*)?(?:else\s+)?(?:if|while|for(?:\s+await)?)\s*\(").unwrap()
    });
    re.is_match(line)
}

pub fn is_if_statement(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*(?:\}\s*)?if\s*\(").unwrap());
    re.is_match(line)
}

pub fn is_else_if(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*(?:\}\s*)?else\s+if\s*\(").unwrap());
    re.is_match(line)
}

/// Any control-flow header: `if`, `else if`, `for`, `while`, `switch`, `catch`
pub fn is_control_header(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:\}\s*)?(?:(?:else\s+)?if|for(?:\s+await)?|while|switch|catch)\s*\(",
        )
        .unwrap()
    });
    re.is_match(line)
}

pub fn is_return_statement(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*return\b").unwrap());
    re.is_match(line)
}

/// Right-hand side of a `const`/`let`/`var` declaration, if the line is one
fn declaration_rhs(line: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(?:export\s+)?(?:const|let|var)\s+[^=]*?=").unwrap()
    });
    let m = re.find(line)?;
    let rhs = &line[m.end()..];
    if rhs.starts_with('=') || rhs.starts_with('>') {
        return None;
    }
    Some(rhs)
}

/// Declaration whose right-hand side contains a logical operator
pub fn is_boolean_assignment(line: &str) -> bool {
    declaration_rhs(line).is_some_and(has_logical_operator)
}

/// Non-destructuring declaration that is not a function value
pub fn is_plain_variable_assignment(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(?:export\s+)?(?:const|let|var)\s+[\w$]+\s*(?::[^=]+)?=").unwrap()
    });
    let Some(m) = re.find(line) else {
        return false;
    };
    let rhs = &line[m.end()..];
    !rhs.starts_with('=') && !rhs.starts_with('>') && !has_arrow(line) && !has_function_keyword(line)
}

/// `const {`, `let {` or `var {` destructuring opener
pub fn is_destructuring_declaration_start(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re =
        RE.get_or_init(|| Regex::new(r"^\s*(?:export\s+)?(?:const|let|var)\s*\{").unwrap());
    re.is_match(line)
}

/// Byte offset of a `} =` that closes a destructuring pattern
pub fn destructuring_close(line: &str) -> Option<usize> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\}\s*=(?:[^=>]|$)").unwrap());
    re.find(line).map(|m| m.start())
}

/// A logical operator sits inside an (open or closed) parenthesis
pub fn has_logical_in_parens(line: &str) -> bool {
    let bytes = line.as_bytes();
    let mut depth = 0usize;
    let mut found = false;
    for_each_code_byte(line, |idx, b| match b {
        b'(' => depth += 1,
        b')' => depth = depth.saturating_sub(1),
        b'&' | b'|' if depth > 0 && bytes.get(idx + 1) == Some(&b) => found = true,
        _ => {}
    });
    found
}

/// Inline markup expression: an opening `{` followed by a logical operator
pub fn is_jsx_expression(line: &str) -> bool {
    if is_control_header(line) {
        return false;
    }
    match line.find('{') {
        Some(open) => has_logical_operator(&line[open..]),
        None => false,
    }
}

/// More `{` than `}` on the line
pub fn opens_bracket(line: &str) -> bool {
    let opens = line.matches('{').count();
    let closes = line.matches('}').count();
    opens > closes
}

/// Ternary `? … :` on the line, ignoring `?.` and `??`
pub fn has_ternary(line: &str) -> bool {
    ternary_question_mark(line).is_some_and(|q| line[q + 1..].contains(':'))
}

/// Offset of the first `?` that is not `?.`, `??` or an optional-parameter `?:`
pub fn ternary_question_mark(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut found = None;
    for_each_code_byte(line, |idx, b| {
        if found.is_some() || b != b'?' {
            return;
        }
        let prev = if idx > 0 { bytes.get(idx - 1) } else { None };
        let next = bytes.get(idx + 1);
        let is_chain = next == Some(&b'.')
            || next == Some(&b'?')
            || next == Some(&b':')
            || prev == Some(&b'?');
        if !is_chain {
            found = Some(idx);
        }
    });
    found
}

pub fn has_arrow(line: &str) -> bool {
    line.contains("=>")
}

pub fn has_function_keyword(line: &str) -> bool {
    function_keyword_position(line).is_some()
}

/// Byte offset of the first `function` keyword
pub fn function_keyword_position(line: &str) -> Option<usize> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\bfunction\b").unwrap());
    re.find(line).map(|m| m.start())
}

/// Byte offset of the first `=>` outside string literals
pub fn first_arrow_position(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut found = None;
    for_each_code_byte(line, |idx, b| {
        if found.is_none() && b == b'=' && bytes.get(idx + 1) == Some(&b'>') {
            found = Some(idx);
        }
    });
    found
}

/// An arrow or `function` keyword appears before byte offset `pos`
pub fn callback_marker_before(line: &str, pos: usize) -> bool {
    let head = &line[..pos.min(line.len())];
    has_arrow(head) || has_function_keyword(head)
}

/// `type X =` or `interface X` declaration
pub fn is_type_declaration(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(?:export\s+)?(?:declare\s+)?(?:type|interface)\s+[\w$]").unwrap()
    });
    re.is_match(line)
}

/// `obj.method(...)` statement with no function literal in it
pub fn is_bare_method_call(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(?:await\s+)?[\w$]+(?:\.[\w$]+)+\s*\(.*\)\s*;?\s*$").unwrap()
    });
    re.is_match(line) && !has_arrow(line) && !has_function_keyword(line)
}

/// `a.b = value` or deeper property assignment
pub fn is_multi_level_property_assignment(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*[\w$]+(?:\.[\w$]+)+\s*=").unwrap());
    match re.find(line) {
        Some(m) => {
            let rest = &line[m.end()..];
            !rest.starts_with('=') && !rest.starts_with('>')
        }
        None => false,
    }
}

/// `}, [` as in a hook dependency array
pub fn is_dependency_array(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\}\s*,\s*\[").unwrap());
    re.is_match(line)
}

pub fn has_markup_opening_tag(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"<[A-Za-z][\w.]*(?:\s|>|/>|$)").unwrap());
    re.is_match(line)
}

pub fn has_markup_closing_tag(line: &str) -> bool {
    line.contains("/>") || line.contains("</")
}

/// Line starts with a statement keyword unrelated to markup attributes
pub fn is_statement_keyword_line(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:const|let|var|return|if|else|for|while|switch|function|export|import|class)\b",
        )
        .unwrap()
    });
    re.is_match(line)
}

/// `identifier [: type] = value` default-value shape
///
/// Capture 1 is the identifier. Comparison and arrow operators never match
/// because no value alternative may begin with `=` or `>`.
pub fn default_parameter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"([A-Za-z_$][\w$]*)\s*",
            r#"(?::\s*[\w$<>\[\]|.'"\s]+?)?"#,
            r"\s*=\s*",
            r#"(?:'[^']*'|"[^"]*"|`[^`]*`|true|false|null|undefined|-?\d+(?:\.\d+)?|\{\s*\}|\[\s*\]|[\w$.]+(?:\(\))?)"#,
        ))
        .unwrap()
    })
}

pub fn has_default_parameter_pattern(line: &str) -> bool {
    default_parameter_regex().is_match(line)
}

/// Call `f(offset, byte)` for every byte outside quoted string literals
///
/// Quote characters themselves are reported. Escapes inside literals are
/// honoured; template substitutions are treated as literal text.
pub fn for_each_code_byte(line: &str, mut f: impl FnMut(usize, u8)) {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                    f(i, b);
                }
            }
            None => {
                if b == b'\'' || b == b'"' || b == b'`' {
                    quote = Some(b);
                }
                f(i, b);
            }
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_operators_positions() {
        let ops = logical_operators("a && b || c");
        assert_eq!(ops, vec![(2, "&&"), (7, "||")]);
        assert!(logical_operators("a & b | c").is_empty());
    }

    #[test]
    fn test_condition_start() {
        assert!(is_condition_start("if (a &&"));
        assert!(is_condition_start("  } else if (x) {"));
        assert!(is_condition_start("while (running)"));
        assert!(is_condition_start("for (const x of xs) {"));
        assert!(!is_condition_start("switch (x) {"));
        assert!(!is_condition_start("const iffy = 1;"));
    }

    #[test]
    fn test_control_header() {
        assert!(is_control_header("switch (kind) {"));
        assert!(is_control_header("} catch (err) {"));
        assert!(is_control_header("else if (a || b) {"));
        assert!(!is_control_header("return a && b;"));
    }

    #[test]
    fn test_if_and_else_if() {
        assert!(is_if_statement("  if (x) {"));
        assert!(!is_if_statement("} else if (x) {"));
        assert!(is_else_if("} else if (x) {"));
    }

    #[test]
    fn test_boolean_assignment() {
        assert!(is_boolean_assignment("const ok = a && b;"));
        assert!(is_boolean_assignment("let v: boolean = x || y"));
        assert!(!is_boolean_assignment("const n = 1;"));
        assert!(!is_boolean_assignment("if (a == b && c) {"));
        assert!(!is_boolean_assignment("x = a && b;"));
    }

    #[test]
    fn test_plain_variable_assignment() {
        assert!(is_plain_variable_assignment("const limit = 10;"));
        assert!(!is_plain_variable_assignment("const f = (a = 1) => a;"));
        assert!(!is_plain_variable_assignment("const { a = 1 } = props;"));
        assert!(!is_plain_variable_assignment("const g = function (x = 2) {"));
    }

    #[test]
    fn test_logical_in_parens() {
        assert!(has_logical_in_parens("foo(a && b)"));
        assert!(has_logical_in_parens("if (a &&"));
        assert!(!has_logical_in_parens("x = a && b"));
        assert!(!has_logical_in_parens("call(\"(a && b)\")"));
    }

    #[test]
    fn test_jsx_expression() {
        assert!(is_jsx_expression("{isOpen && <Modal />}"));
        assert!(is_jsx_expression("  {items.length > 0 || fallback}"));
        assert!(!is_jsx_expression("if (a && b) {"));
        assert!(!is_jsx_expression("a && b"));
    }

    #[test]
    fn test_ternary() {
        assert!(has_ternary("const x = a ? b : c;"));
        assert!(!has_ternary("const x = a?.b ?? c;"));
        assert!(!has_ternary("const label = \"why?\";"));
    }

    #[test]
    fn test_callback_marker_before() {
        let line = "items.filter(x => x && y)";
        let pos = line.find("&&").unwrap();
        assert!(callback_marker_before(line, pos));
        assert!(!callback_marker_before("a && items.map(x => x)", 2));
    }

    #[test]
    fn test_context_shapes() {
        assert!(is_type_declaration("export type Props = { a?: string };"));
        assert!(is_type_declaration("interface State {"));
        assert!(is_bare_method_call("this.setState(x = 1);"));
        assert!(!is_bare_method_call("items.map((x = 1) => x);"));
        assert!(is_multi_level_property_assignment("this.state.value = 3;"));
        assert!(!is_multi_level_property_assignment("a.b === c"));
        assert!(is_dependency_array("}, [value, other]);"));
    }

    #[test]
    fn test_markup_tags() {
        assert!(has_markup_opening_tag("  <Button"));
        assert!(has_markup_opening_tag("<div className=\"x\">"));
        assert!(!has_markup_opening_tag("a < b"));
        assert!(has_markup_closing_tag("/>"));
        assert!(has_markup_closing_tag("</div>"));
    }

    #[test]
    fn test_default_parameter_regex_excludes_comparisons() {
        assert!(has_default_parameter_pattern("x = 1"));
        assert!(has_default_parameter_pattern("name: string = 'anon'"));
        assert!(has_default_parameter_pattern("opts = {}"));
        assert!(!has_default_parameter_pattern("a == b"));
        assert!(!has_default_parameter_pattern("a === b"));
        assert!(!has_default_parameter_pattern("a <= b"));
        assert!(!has_default_parameter_pattern("a >= b"));
        assert!(!has_default_parameter_pattern("a != b"));
        assert!(!has_default_parameter_pattern("x => x"));
        assert!(!has_default_parameter_pattern("n += 1"));
    }

    #[test]
    fn test_for_each_code_byte_skips_literals() {
        let mut seen = String::new();
        for_each_code_byte("a'&&'b", |_, b| seen.push(b as char));
        assert_eq!(seen, "a''b");
    }

    #[test]
    fn test_keyword_and_arrow_positions() {
        assert_eq!(function_keyword_position("run(function (x) {"), Some(4));
        assert_eq!(function_keyword_position("const functional = 1;"), None);
        assert_eq!(first_arrow_position("f('=>', (x) => x)"), Some(12));
        assert_eq!(first_arrow_position("a >= b"), None);
    }
}
