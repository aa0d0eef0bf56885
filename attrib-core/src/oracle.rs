//! Literal, comment and ternary oracles
//!
//! The parsers ask these collaborators whether an operator position is real
//! code. [`PermissiveOracle`] answers "no" to every question and is the
//! default: operators inside strings, comments and multi-line ternary
//! conditions are therefore still counted unless [`LexicalOracle`] is
//! selected.

use crate::patterns;
use serde::{Deserialize, Serialize};

/// Answers position questions about string literals and comments
pub trait LiteralOracle {
    /// Is byte `column` of `line` inside a `//` or `/* */` comment?
    fn is_inside_comment(&self, line: &str, column: usize) -> bool;

    /// Is byte `column` of `line` inside a string or template literal?
    fn is_inside_string_literal(&self, line: &str, column: usize) -> bool;

    /// Secondary literal check consulted alongside `is_inside_string_literal`
    fn is_operator_in_string_literal(&self, line: &str, column: usize) -> bool;
}

/// Result of multi-line ternary detection for one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TernaryDetection {
    pub is_multi_line_ternary_condition_line: bool,
}

/// Answers whether a line belongs to a ternary condition spanning several lines
pub trait TernaryOracle {
    fn detect_multi_line_ternaries(
        &self,
        line: &str,
        index: usize,
        lines: &[&str],
        has_question_mark_outside_string: bool,
    ) -> TernaryDetection;
}

/// Which oracle implementation a scan uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleMode {
    #[default]
    Permissive,
    Lexical,
}

impl OracleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleMode::Permissive => "permissive",
            OracleMode::Lexical => "lexical",
        }
    }

    pub fn literal(&self) -> &'static dyn LiteralOracle {
        match self {
            OracleMode::Permissive => &PermissiveOracle,
            OracleMode::Lexical => &LexicalOracle,
        }
    }

    pub fn ternary(&self) -> &'static dyn TernaryOracle {
        match self {
            OracleMode::Permissive => &PermissiveOracle,
            OracleMode::Lexical => &LexicalOracle,
        }
    }
}

/// Oracle that never excludes anything
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveOracle;

impl LiteralOracle for PermissiveOracle {
    fn is_inside_comment(&self, _line: &str, _column: usize) -> bool {
        false
    }

    fn is_inside_string_literal(&self, _line: &str, _column: usize) -> bool {
        false
    }

    fn is_operator_in_string_literal(&self, _line: &str, _column: usize) -> bool {
        false
    }
}

impl TernaryOracle for PermissiveOracle {
    fn detect_multi_line_ternaries(
        &self,
        _line: &str,
        _index: usize,
        _lines: &[&str],
        _has_question_mark_outside_string: bool,
    ) -> TernaryDetection {
        TernaryDetection::default()
    }
}

/// Single-line quote and comment tracking
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOracle;

/// Lexical state at a byte offset, from a left-to-right scan of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Code,
    Literal,
    LineComment,
    BlockComment,
}

fn state_at(line: &str, column: usize) -> LexState {
    let bytes = line.as_bytes();
    let mut state = LexState::Code;
    let mut quote = 0u8;
    let mut i = 0;
    while i < bytes.len() && i < column {
        let b = bytes[i];
        match state {
            LexState::Code => match b {
                b'\'' | b'"' | b'`' => {
                    quote = b;
                    state = LexState::Literal;
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => return LexState::LineComment,
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = LexState::BlockComment;
                    i += 1;
                }
                _ => {}
            },
            LexState::Literal => {
                if b == b'\\' {
                    i += 1;
                } else if b == quote {
                    state = LexState::Code;
                }
            }
            LexState::BlockComment => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = LexState::Code;
                    i += 1;
                }
            }
            LexState::LineComment => return state,
        }
        i += 1;
    }
    state
}

impl LiteralOracle for LexicalOracle {
    fn is_inside_comment(&self, line: &str, column: usize) -> bool {
        matches!(
            state_at(line, column),
            LexState::LineComment | LexState::BlockComment
        )
    }

    fn is_inside_string_literal(&self, line: &str, column: usize) -> bool {
        state_at(line, column) == LexState::Literal
    }

    fn is_operator_in_string_literal(&self, line: &str, column: usize) -> bool {
        let head = &line.as_bytes()[..column.min(line.len())];
        [b'\'', b'"', b'`'].iter().any(|q| {
            let mut count = 0usize;
            let mut escaped = false;
            for &b in head {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == *q {
                    count += 1;
                }
            }
            count % 2 == 1
        })
    }
}

impl TernaryOracle for LexicalOracle {
    fn detect_multi_line_ternaries(
        &self,
        line: &str,
        index: usize,
        lines: &[&str],
        has_question_mark_outside_string: bool,
    ) -> TernaryDetection {
        let trimmed = line.trim_end();
        if trimmed.ends_with(';') || trimmed.ends_with('{') {
            return TernaryDetection::default();
        }
        if has_question_mark_outside_string
            && trimmed.ends_with('?')
            && patterns::ternary_question_mark(trimmed).is_some()
        {
            return TernaryDetection {
                is_multi_line_ternary_condition_line: true,
            };
        }

        for next in lines.iter().skip(index + 1).take(3) {
            let next = next.trim();
            if next.is_empty() {
                continue;
            }
            if next.starts_with('?') && !next.starts_with("?.") && !next.starts_with("??") {
                return TernaryDetection {
                    is_multi_line_ternary_condition_line: true,
                };
            }
            if next.ends_with(';') || next.ends_with('{') || next.ends_with('}') || next.contains('?')
            {
                break;
            }
        }
        TernaryDetection::default()
    }
}
