//! Attribution driver
//!
//! Runs the resolver and the three parsers over every line of a file and
//! merges their output.
//!
//! Global invariants enforced:
//! - Lines are visited in ascending order; parser output order is fixed
//! - With dedupe on, each `(line, type, column)` site is reported once (first wins)
//! - Lines outside every function produce no points
//! - Multi-file scans return results sorted by path

use crate::boundary::BoundaryIndex;
use crate::config::ResolvedConfig;
use crate::context::LineContext;
use crate::decision::DecisionPoint;
use crate::oracle::{LiteralOracle, OracleMode, TernaryOracle};
use crate::outline::{self, FunctionOutline};
use crate::parsers::{boolean, default_params, multiline};
use crate::resolver;
use crate::source;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Knobs for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub dedupe: bool,
    pub oracle: OracleMode,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            dedupe: true,
            oracle: OracleMode::Permissive,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        EngineOptions {
            dedupe: config.dedupe,
            oracle: config.oracle,
        }
    }
}

/// Decision-point scanner for one file's boundaries
pub struct Engine<'a> {
    boundaries: &'a BoundaryIndex,
    literals: &'a dyn LiteralOracle,
    ternaries: &'a dyn TernaryOracle,
    options: EngineOptions,
}

impl<'a> Engine<'a> {
    pub fn new(
        boundaries: &'a BoundaryIndex,
        literals: &'a dyn LiteralOracle,
        ternaries: &'a dyn TernaryOracle,
        options: EngineOptions,
    ) -> Self {
        Engine {
            boundaries,
            literals,
            ternaries,
            options,
        }
    }

    /// Engine using the oracles selected by `options.oracle`
    pub fn with_options(boundaries: &'a BoundaryIndex, options: EngineOptions) -> Self {
        Self::new(
            boundaries,
            options.oracle.literal(),
            options.oracle.ternary(),
            options,
        )
    }

    /// Attribute every decision point in `lines` (index 0 is line 1)
    pub fn scan(&self, lines: &[&str]) -> Vec<DecisionPoint> {
        let stripped_owned = source::strip_comment_lines(lines);
        let stripped: Vec<&str> = stripped_owned.iter().map(String::as_str).collect();
        let line_map = self.boundaries.line_map(lines.len());

        let mut points = Vec::new();
        for (index, original) in lines.iter().enumerate() {
            let line_num = index + 1;
            let line = stripped[index];
            if !has_candidate(original, line) {
                continue;
            }
            if !line_map.contains_key(&line_num) {
                tracing::trace!(line = line_num, "outside every function");
                continue;
            }

            let ctx = LineContext::analyze(line, index, &stripped, self.boundaries);
            // Control headers see every function started so far, ended ones included
            let started = self.boundaries.started_by(line_num);
            let function_line = match resolver::resolve_owner_for_control_structure(
                ctx.is_control_structure,
                line_num,
                &started,
                self.boundaries,
                &line_map,
            ) {
                Ok(owner) => owner,
                Err(err) => {
                    tracing::debug!(error = %err, "line left unattributed");
                    continue;
                }
            };
            tracing::trace!(line = line_num, function_line, "resolved owner");

            points.extend(multiline::parse(line, line_num, function_line, &ctx));
            points.extend(boolean::parse(
                line,
                original,
                line_num,
                index,
                &stripped,
                function_line,
                self.boundaries,
                self.literals,
                self.ternaries,
                &ctx,
            ));
            points.extend(default_params::parse(
                line,
                line_num,
                index,
                &stripped,
                function_line,
                self.boundaries,
            ));
            points.extend(default_params::parse_destructured_assignments(
                line,
                line_num,
                index,
                &stripped,
                function_line,
                self.boundaries,
            ));
        }

        if self.options.dedupe {
            dedupe_points(points)
        } else {
            points
        }
    }
}

/// Cheap pre-filter: no operator and no `=` means nothing to find
fn has_candidate(original: &str, stripped: &str) -> bool {
    original.contains("&&") || original.contains("||") || stripped.contains('=')
}

/// Drop repeated `(line, type, column)` sites, keeping the first record
pub fn dedupe_points(mut points: Vec<DecisionPoint>) -> Vec<DecisionPoint> {
    let mut seen = HashSet::new();
    points.retain(|p| seen.insert(p.site()));
    points
}

/// Functions and points found in one source text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceScan {
    pub functions: Vec<FunctionOutline>,
    pub points: Vec<DecisionPoint>,
}

/// Outline `source` and scan it against the outlined boundaries
pub fn scan_source(source: &str, options: &EngineOptions) -> SourceScan {
    let functions = outline::outline_source(source);
    let index = outline::boundary_index(&functions);
    let lines: Vec<&str> = source.lines().collect();
    let points = Engine::with_options(&index, *options).scan(&lines);
    SourceScan { functions, points }
}

/// Scan `source` against externally supplied boundaries
///
/// Names come from the outline scanner where a function starts on the same
/// line; other boundaries are anonymous.
pub fn scan_source_with_boundaries(
    source: &str,
    boundaries: &BoundaryIndex,
    options: &EngineOptions,
) -> SourceScan {
    let outlines = outline::outline_source(source);
    let functions = name_boundaries(boundaries, &outlines);
    let lines: Vec<&str> = source.lines().collect();
    let points = Engine::with_options(boundaries, *options).scan(&lines);
    SourceScan { functions, points }
}

/// Attach outline names to external boundaries
pub fn name_boundaries(
    boundaries: &BoundaryIndex,
    outlines: &[FunctionOutline],
) -> Vec<FunctionOutline> {
    boundaries
        .functions()
        .iter()
        .map(|f| FunctionOutline {
            name: outline::name_of(outlines, f.function_line)
                .unwrap_or("<anonymous>")
                .to_string(),
            function: *f,
        })
        .collect()
}

/// Scan result for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileScan {
    pub file: PathBuf,
    pub functions: Vec<FunctionOutline>,
    pub points: Vec<DecisionPoint>,
}

impl FileScan {
    fn from_source_scan(file: PathBuf, scan: SourceScan) -> Self {
        FileScan {
            file,
            functions: scan.functions,
            points: scan.points,
        }
    }
}

/// Read and scan one file with outlined boundaries
pub fn scan_file(path: &Path, options: &EngineOptions) -> Result<FileScan> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let scan = scan_source(&source, options);
    tracing::debug!(
        file = %path.display(),
        functions = scan.functions.len(),
        points = scan.points.len(),
        "scanned file"
    );
    Ok(FileScan::from_source_scan(path.to_path_buf(), scan))
}

/// Read and scan one file against a boundary list loaded from JSON
pub fn scan_file_with_boundaries(
    path: &Path,
    boundaries: &BoundaryIndex,
    options: &EngineOptions,
) -> Result<FileScan> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let scan = scan_source_with_boundaries(&source, boundaries, options);
    Ok(FileScan::from_source_scan(path.to_path_buf(), scan))
}

/// Scan files in parallel; unreadable files are reported and skipped
///
/// `on_file` runs once per file after it is processed, from worker threads.
pub fn scan_files(
    files: &[PathBuf],
    options: &EngineOptions,
    on_file: impl Fn() + Sync,
) -> Vec<FileScan> {
    let results: Vec<Option<FileScan>> = files
        .par_iter()
        .map(|file| {
            let scan = match scan_file(file, options) {
                Ok(scan) => Some(scan),
                Err(e) => {
                    eprintln!("warning: skipping file {}: {:#}", file.display(), e);
                    None
                }
            };
            on_file();
            scan
        })
        .collect();

    let skipped = results.iter().filter(|r| r.is_none()).count();
    if skipped > 0 {
        eprintln!("Skipped {} file(s) due to read errors", skipped);
    }

    let mut scans: Vec<FileScan> = results.into_iter().flatten().collect();
    scans.sort_by(|a, b| a.file.cmp(&b.file));
    scans
}

/// Source files under `path` that the config includes
pub fn collect_files(path: &Path, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let files = source::collect_source_files(path)?;
    let total = files.len();
    let included: Vec<PathBuf> = files
        .into_iter()
        .filter(|f| config.should_include(f))
        .collect();
    tracing::debug!(total, included = included.len(), "collected source files");
    Ok(included)
}

/// Collect and scan every included source file under `path`
pub fn scan_path(path: &Path, config: &ResolvedConfig) -> Result<Vec<FileScan>> {
    let files = collect_files(path, config)?;
    Ok(scan_files(&files, &EngineOptions::from_config(config), || {}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::FunctionBoundary;
    use crate::decision::DecisionKind;

    fn count(points: &[DecisionPoint], kind: DecisionKind) -> usize {
        points.iter().filter(|p| p.kind == kind).count()
    }

    #[test]
    fn test_scan_source_counts_each_kind() {
        let src = "function check(a, b, c = 1) {\n  if (a && b) {\n    return a || c;\n  }\n}\n";
        let scan = scan_source(src, &EngineOptions::default());
        assert_eq!(scan.functions.len(), 1);
        assert_eq!(count(&scan.points, DecisionKind::LogicalAnd), 1);
        assert_eq!(count(&scan.points, DecisionKind::LogicalOr), 1);
        assert_eq!(count(&scan.points, DecisionKind::DefaultParameter), 1);
        assert!(scan.points.iter().all(|p| p.function_line == 1));
    }

    #[test]
    fn test_operator_after_arrow_goes_to_enclosing_function() {
        let src = "function outer(items) {\n  return items.filter(x => x.a && x.b);\n}\n";
        let scan = scan_source(src, &EngineOptions::default());
        assert_eq!(scan.functions.len(), 2);
        assert_eq!(scan.points.len(), 1);
        assert_eq!(scan.points[0].function_line, 1);
    }

    #[test]
    fn test_multi_line_condition() {
        let src = "function f(a, b, c) {\n  if (\n    a &&\n    b ||\n    c\n  ) {\n    return 1;\n  }\n}\n";
        let scan = scan_source(src, &EngineOptions::default());
        assert_eq!(scan.points.len(), 2);
        assert_eq!(scan.points[0].line, 3);
        assert_eq!(scan.points[1].line, 4);
        assert!(scan.points.iter().all(|p| p.function_line == 1));
    }

    #[test]
    fn test_control_header_after_ended_sibling_goes_to_outermost() {
        let mut lines = vec!["  run();"; 30];
        lines[9] = "    if (a && b) {";
        let src = lines.join("\n");
        let options = EngineOptions::default();

        let index = BoundaryIndex::new(vec![
            FunctionBoundary::new(1, 30),
            FunctionBoundary::new(2, 5),
            FunctionBoundary::new(8, 20),
        ]);
        let scan = scan_source_with_boundaries(&src, &index, &options);
        assert_eq!(scan.points.len(), 1);
        assert_eq!(scan.points[0].line, 10);
        assert_eq!(scan.points[0].function_line, 1);

        // Without the ended sibling the innermost function keeps it
        let index = BoundaryIndex::new(vec![FunctionBoundary::new(1, 30), FunctionBoundary::new(8, 20)]);
        let scan = scan_source_with_boundaries(&src, &index, &options);
        assert_eq!(scan.points[0].function_line, 8);
    }

    #[test]
    fn test_inline_callback_body_assignments_are_not_defaults() {
        let src = "function reset(items) {\n  items.forEach((item) => { item.count = 0; });\n}\n";
        let scan = scan_source(src, &EngineOptions::default());
        assert_eq!(count(&scan.points, DecisionKind::DefaultParameter), 0);

        let src = "function wait() {\n  let done = false;\n  setTimeout(() => { done = true; }, 0);\n}\n";
        let scan = scan_source(src, &EngineOptions::default());
        assert_eq!(count(&scan.points, DecisionKind::DefaultParameter), 0);
    }

    #[test]
    fn test_module_level_lines_skipped() {
        let src = "const ready = a && b;\nfunction f() {\n  return 1;\n}\n";
        assert!(scan_source(src, &EngineOptions::default()).points.is_empty());
    }

    #[test]
    fn test_operators_in_comments_ignored_on_plain_lines() {
        let src = "function f(a, b) {\n  go(); // a && b\n}\n";
        assert!(scan_source(src, &EngineOptions::default()).points.is_empty());
    }

    #[test]
    fn test_lexical_oracle_skips_string_operators() {
        let src = "function f(c) {\n  return 'a && b' || c;\n}\n";
        let permissive = scan_source(src, &EngineOptions::default());
        assert_eq!(permissive.points.len(), 2);

        let options = EngineOptions {
            oracle: OracleMode::Lexical,
            ..EngineOptions::default()
        };
        let lexical = scan_source(src, &options);
        assert_eq!(lexical.points.len(), 1);
        assert_eq!(lexical.points[0].kind, DecisionKind::LogicalOr);
    }

    #[test]
    fn test_dedupe_points_keeps_first() {
        let a = DecisionPoint::new(3, DecisionKind::DefaultParameter, "x", 1, 4);
        let mut b = a.clone();
        b.function_line = 2;
        let c = DecisionPoint::new(3, DecisionKind::DefaultParameter, "y", 1, 9);
        let out = dedupe_points(vec![a.clone(), b, c.clone()]);
        assert_eq!(out, vec![a, c]);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let src = "const f = (a = 1, b = 2) => {\n  return a && b;\n};\n";
        let first = scan_source(src, &EngineOptions::default());
        let second = scan_source(src, &EngineOptions::default());
        assert_eq!(first, second);
        assert_eq!(first.points.len(), 3);
    }

    #[test]
    fn test_external_boundaries_named_from_outline() {
        let src = "function a(x) {\n  return x && 1;\n}\n";
        let index = BoundaryIndex::new(vec![FunctionBoundary::new(1, 3)]);
        let scan = scan_source_with_boundaries(src, &index, &EngineOptions::default());
        assert_eq!(scan.functions[0].name, "a");
        assert_eq!(scan.points.len(), 1);

        let other = BoundaryIndex::new(vec![FunctionBoundary::new(2, 2)]);
        let named = name_boundaries(&other, &outline::outline_source(src));
        assert_eq!(named[0].name, "<anonymous>");
    }

    #[test]
    fn test_scan_path_sorted_and_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.ts"), "function b(x = 1) {\n}\n").unwrap();
        std::fs::write(dir.path().join("a.js"), "function a(x) {\n  return x && 1;\n}\n").unwrap();
        std::fs::write(dir.path().join("c.js"), [0xffu8, 0xfe, 0x00]).unwrap();

        let config = ResolvedConfig::defaults().unwrap();
        let scans = scan_path(dir.path(), &config).unwrap();
        let names: Vec<String> = scans
            .iter()
            .map(|s| s.file.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.js", "b.ts"]);
        assert_eq!(scans[0].points.len(), 1);
        assert_eq!(scans[1].points[0].kind, DecisionKind::DefaultParameter);
    }
}
