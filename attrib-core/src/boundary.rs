//! Function boundary index
//!
//! Maps each function's declaration line to the inclusive line range its body
//! occupies. Produced by [`crate::outline`] or loaded from JSON emitted by an
//! external structural scanner; immutable for the duration of a scan.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Inclusive, 1-indexed line range of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Boundary {
    /// First line of the function (inclusive)
    pub start: usize,
    /// Last line of the function (inclusive)
    pub end: usize,
}

impl Boundary {
    /// Create a new boundary
    pub fn new(start: usize, end: usize) -> Self {
        Boundary { start, end }
    }

    /// Number of lines spanned minus one (0 for single-line functions)
    pub fn size(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the boundary contains the given line
    pub fn contains_line(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }

    /// Check if this boundary fully contains another boundary
    pub fn encloses(&self, other: &Boundary) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if the function starts and ends on `line`
    pub fn is_single_line_at(&self, line: usize) -> bool {
        self.start == line && self.end == line
    }
}

/// A function's declaration line together with its boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionBoundary {
    pub function_line: usize,
    pub boundary: Boundary,
}

impl FunctionBoundary {
    /// Create a function boundary whose function line is its start line
    pub fn new(start: usize, end: usize) -> Self {
        FunctionBoundary {
            function_line: start,
            boundary: Boundary::new(start, end),
        }
    }

    pub fn start(&self) -> usize {
        self.boundary.start
    }

    pub fn end(&self) -> usize {
        self.boundary.end
    }

    pub fn size(&self) -> usize {
        self.boundary.size()
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.boundary.contains_line(line)
    }
}

/// Candidate functions for each line
///
/// A line maps to every function whose boundary contains it. Lines outside all
/// functions are absent.
pub type LineFunctionMap = BTreeMap<usize, Vec<FunctionBoundary>>;

/// Ordered collection of function boundaries for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryIndex {
    functions: Vec<FunctionBoundary>,
}

impl BoundaryIndex {
    /// Build an index, ordering functions by start ascending then end descending
    ///
    /// The sort is stable, so same-line functions keep their input order.
    pub fn new(mut functions: Vec<FunctionBoundary>) -> Self {
        functions.sort_by(|a, b| a.start().cmp(&b.start()).then(b.end().cmp(&a.end())));
        BoundaryIndex { functions }
    }

    /// Load a boundary list from a JSON file
    ///
    /// The file holds an array of `{"functionLine": n, "boundary": {"start": a, "end": b}}`.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read boundary file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("failed to parse boundary file: {}", path.display()))
    }

    /// Parse a boundary list from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let functions: Vec<FunctionBoundary> = serde_json::from_str(json)?;
        for f in &functions {
            if f.start() > f.end() {
                anyhow::bail!(
                    "function at line {} has start {} after end {}",
                    f.function_line,
                    f.start(),
                    f.end()
                );
            }
        }
        Ok(Self::new(functions))
    }

    pub fn functions(&self) -> &[FunctionBoundary] {
        &self.functions
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Boundary of the first function declared on `function_line`
    pub fn boundary_of(&self, function_line: usize) -> Option<Boundary> {
        self.functions
            .iter()
            .find(|f| f.function_line == function_line)
            .map(|f| f.boundary)
    }

    /// Functions whose boundary contains `line`
    pub fn containing(&self, line: usize) -> impl Iterator<Item = &FunctionBoundary> {
        self.functions.iter().filter(move |f| f.contains_line(line))
    }

    /// Functions whose boundary starts exactly on `line`
    pub fn starting_on(&self, line: usize) -> impl Iterator<Item = &FunctionBoundary> {
        self.functions.iter().filter(move |f| f.start() == line)
    }

    /// Functions that started on or before `line`, whether or not still open
    pub fn started_by(&self, line: usize) -> Vec<FunctionBoundary> {
        self.functions
            .iter()
            .filter(|f| f.start() <= line)
            .copied()
            .collect()
    }

    /// Build the candidate map for lines `1..=line_count`
    pub fn line_map(&self, line_count: usize) -> LineFunctionMap {
        let mut map = LineFunctionMap::new();
        for f in &self.functions {
            let last = f.end().min(line_count);
            for line in f.start()..=last {
                map.entry(line).or_default().push(*f);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_contains_line() {
        let b = Boundary::new(5, 10);
        assert!(b.contains_line(5));
        assert!(b.contains_line(10));
        assert!(!b.contains_line(4));
        assert!(!b.contains_line(11));
        assert_eq!(b.size(), 5);
    }

    #[test]
    fn test_single_line() {
        let b = Boundary::new(7, 7);
        assert!(b.is_single_line_at(7));
        assert!(!b.is_single_line_at(8));
        assert_eq!(b.size(), 0);
    }

    #[test]
    fn test_encloses() {
        let outer = Boundary::new(1, 20);
        let inner = Boundary::new(5, 10);
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
        assert!(outer.encloses(&outer));
    }

    #[test]
    fn test_index_ordering_outer_first() {
        let index = BoundaryIndex::new(vec![
            FunctionBoundary::new(5, 6),
            FunctionBoundary::new(1, 3),
            FunctionBoundary::new(5, 12),
        ]);
        let starts: Vec<(usize, usize)> =
            index.functions().iter().map(|f| (f.start(), f.end())).collect();
        assert_eq!(starts, vec![(1, 3), (5, 12), (5, 6)]);
    }

    #[test]
    fn test_line_map() {
        let index = BoundaryIndex::new(vec![
            FunctionBoundary::new(1, 4),
            FunctionBoundary::new(2, 3),
        ]);
        let map = index.line_map(5);
        assert_eq!(map.get(&1).map(Vec::len), Some(1));
        assert_eq!(map.get(&2).map(Vec::len), Some(2));
        assert_eq!(map.get(&4).map(Vec::len), Some(1));
        assert!(!map.contains_key(&5));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"functionLine": 2, "boundary": {"start": 2, "end": 20}},
            {"functionLine": 5, "boundary": {"start": 5, "end": 15}}
        ]"#;
        let index = BoundaryIndex::from_json(json).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.boundary_of(5), Some(Boundary::new(5, 15)));
        assert_eq!(index.boundary_of(3), None);
    }

    #[test]
    fn test_from_json_rejects_inverted_boundary() {
        let json = r#"[{"functionLine": 9, "boundary": {"start": 9, "end": 3}}]"#;
        assert!(BoundaryIndex::from_json(json).is_err());
    }

    #[test]
    fn test_started_by() {
        let index = BoundaryIndex::new(vec![
            FunctionBoundary::new(1, 4),
            FunctionBoundary::new(6, 9),
        ]);
        assert_eq!(index.started_by(5).len(), 1);
        assert_eq!(index.started_by(6).len(), 2);
    }
}
