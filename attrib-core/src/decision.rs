//! Decision point records produced by the parsers

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three decision categories this engine attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    #[serde(rename = "&&")]
    LogicalAnd,
    #[serde(rename = "||")]
    LogicalOr,
    #[serde(rename = "default parameter")]
    DefaultParameter,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::LogicalAnd => "&&",
            DecisionKind::LogicalOr => "||",
            DecisionKind::DefaultParameter => "default parameter",
        }
    }

    /// Map an operator token to its kind
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "&&" => Some(DecisionKind::LogicalAnd),
            "||" => Some(DecisionKind::LogicalOr),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One countable contributor to a function's complexity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPoint {
    /// 1-indexed source line
    pub line: usize,
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    /// Operator text, or the parameter identifier for defaults
    pub name: String,
    /// Declaration line of the function credited with this point
    pub function_line: usize,
    /// 0-indexed byte column of the construct in the original line
    pub column: usize,
}

impl DecisionPoint {
    pub fn new(
        line: usize,
        kind: DecisionKind,
        name: impl Into<String>,
        function_line: usize,
        column: usize,
    ) -> Self {
        DecisionPoint {
            line,
            kind,
            name: name.into(),
            function_line,
            column,
        }
    }

    /// Key used for the single-attribution invariant
    pub fn site(&self) -> (usize, DecisionKind, usize) {
        (self.line, self.kind, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_uses_linter_type_names() {
        let dp = DecisionPoint::new(3, DecisionKind::DefaultParameter, "x", 1, 14);
        let json = serde_json::to_value(&dp).unwrap();
        assert_eq!(json["type"], "default parameter");
        assert_eq!(json["functionLine"], 1);
        assert_eq!(json["name"], "x");
    }

    #[test]
    fn test_from_operator() {
        assert_eq!(DecisionKind::from_operator("&&"), Some(DecisionKind::LogicalAnd));
        assert_eq!(DecisionKind::from_operator("||"), Some(DecisionKind::LogicalOr));
        assert_eq!(DecisionKind::from_operator("??"), None);
    }
}
