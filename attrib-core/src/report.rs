//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::decision::{DecisionKind, DecisionPoint};
use crate::engine::FileScan;
use crate::outline::FunctionOutline;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decision-point totals for one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FunctionAttributionReport {
    pub file: String,
    pub function: String,
    pub line: usize,
    pub end_line: usize,
    pub logical_and: usize,
    pub logical_or: usize,
    pub default_parameters: usize,
    pub total: usize,
}

impl FunctionAttributionReport {
    /// Empty report for an outlined function
    pub fn new(file: &str, outline: &FunctionOutline) -> Self {
        FunctionAttributionReport {
            file: file.to_string(),
            function: outline.name.clone(),
            line: outline.function.function_line,
            end_line: outline.function.end(),
            logical_and: 0,
            logical_or: 0,
            default_parameters: 0,
            total: 0,
        }
    }

    fn record(&mut self, kind: DecisionKind) {
        match kind {
            DecisionKind::LogicalAnd => self.logical_and += 1,
            DecisionKind::LogicalOr => self.logical_or += 1,
            DecisionKind::DefaultParameter => self.default_parameters += 1,
        }
        self.total += 1;
    }
}

/// One report per function in `scan`
///
/// Points go to the first function declared on their `function_line`.
pub fn summarize(scan: &FileScan) -> Vec<FunctionAttributionReport> {
    let file = scan.file.display().to_string();
    let mut reports: Vec<FunctionAttributionReport> = scan
        .functions
        .iter()
        .map(|f| FunctionAttributionReport::new(&file, f))
        .collect();

    let mut by_line: BTreeMap<usize, usize> = BTreeMap::new();
    for (i, report) in reports.iter().enumerate() {
        by_line.entry(report.line).or_insert(i);
    }
    for point in &scan.points {
        match by_line.get(&point.function_line) {
            Some(&i) => reports[i].record(point.kind),
            None => tracing::trace!(
                file = %file,
                function_line = point.function_line,
                "point for unknown function"
            ),
        }
    }
    reports
}

/// Summarize, filter and sort reports across files
///
/// `min_points` drops functions below the threshold; `top_n` keeps the first N
/// after sorting.
pub fn build_reports(
    scans: &[FileScan],
    min_points: Option<usize>,
    top_n: Option<usize>,
) -> Vec<FunctionAttributionReport> {
    let reports: Vec<FunctionAttributionReport> = scans
        .iter()
        .flat_map(summarize)
        .filter(|r| min_points.map_or(true, |min| r.total >= min))
        .collect();
    let sorted = sort_reports(reports);
    match top_n {
        Some(n) => sorted.into_iter().take(n).collect(),
        None => sorted,
    }
}

/// Sort reports deterministically
pub fn sort_reports(mut reports: Vec<FunctionAttributionReport>) -> Vec<FunctionAttributionReport> {
    reports.sort_by(|a, b| {
        // 1. Total descending
        b.total
            .cmp(&a.total)
            // 2. File path ascending
            .then_with(|| a.file.cmp(&b.file))
            // 3. Line number ascending
            .then_with(|| a.line.cmp(&b.line))
            // 4. Function name ascending
            .then_with(|| a.function.cmp(&b.function))
    });
    reports
}

/// Render reports as text output
pub fn render_text(reports: &[FunctionAttributionReport]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<6} {:<4} {:<4} {:<8} {:<30} {:<6} {}\n",
        "TOTAL", "&&", "||", "DEFAULTS", "FILE", "LINE", "FUNCTION"
    ));

    for report in reports {
        output.push_str(&format!(
            "{:<6} {:<4} {:<4} {:<8} {:<30} {:<6} {}\n",
            report.total,
            report.logical_and,
            report.logical_or,
            report.default_parameters,
            truncate_or_pad(&report.file, 30),
            report.line,
            report.function
        ));
    }

    output
}

/// Render reports as JSON output
pub fn render_json(reports: &[FunctionAttributionReport]) -> String {
    serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Serialize)]
struct PointRecord<'a> {
    file: &'a str,
    #[serde(flatten)]
    point: &'a DecisionPoint,
}

/// Render every decision point as one JSON object per line, tagged with its file
pub fn render_points_jsonl(scans: &[FileScan]) -> String {
    let mut output = String::new();
    for scan in scans {
        let file = scan.file.display().to_string();
        for point in &scan.points {
            let record = PointRecord { file: &file, point };
            if let Ok(line) = serde_json::to_string(&record) {
                output.push_str(&line);
                output.push('\n');
            }
        }
    }
    output
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::FunctionBoundary;
    use std::path::PathBuf;

    fn outline(name: &str, start: usize, end: usize) -> FunctionOutline {
        FunctionOutline {
            name: name.to_string(),
            function: FunctionBoundary::new(start, end),
        }
    }

    fn point(line: usize, kind: DecisionKind, function_line: usize) -> DecisionPoint {
        let name = match kind {
            DecisionKind::DefaultParameter => "x",
            other => other.as_str(),
        };
        DecisionPoint::new(line, kind, name, function_line, 4)
    }

    fn sample_scan() -> FileScan {
        FileScan {
            file: PathBuf::from("src/app.ts"),
            functions: vec![outline("outer", 1, 10), outline("inner", 3, 5)],
            points: vec![
                point(1, DecisionKind::DefaultParameter, 1),
                point(4, DecisionKind::LogicalAnd, 3),
                point(4, DecisionKind::LogicalOr, 3),
                point(8, DecisionKind::LogicalAnd, 1),
                point(9, DecisionKind::LogicalAnd, 42),
            ],
        }
    }

    fn report(file: &str, function: &str, line: usize, total: usize) -> FunctionAttributionReport {
        FunctionAttributionReport {
            file: file.to_string(),
            function: function.to_string(),
            line,
            end_line: line,
            logical_and: total,
            logical_or: 0,
            default_parameters: 0,
            total,
        }
    }

    #[test]
    fn test_summarize_counts_per_function() {
        let reports = summarize(&sample_scan());
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].function, "outer");
        assert_eq!(reports[0].default_parameters, 1);
        assert_eq!(reports[0].logical_and, 1);
        assert_eq!(reports[0].total, 2);
        assert_eq!(reports[1].logical_and, 1);
        assert_eq!(reports[1].logical_or, 1);
        assert_eq!(reports[1].end_line, 5);
    }

    #[test]
    fn test_sort_reports() {
        let sorted = sort_reports(vec![
            report("b.ts", "f", 1, 2),
            report("a.ts", "g", 9, 2),
            report("a.ts", "h", 3, 5),
            report("a.ts", "b", 9, 2),
        ]);
        let order: Vec<&str> = sorted.iter().map(|r| r.function.as_str()).collect();
        assert_eq!(order, vec!["h", "b", "g", "f"]);
    }

    #[test]
    fn test_build_reports_filters() {
        let scans = vec![sample_scan()];
        assert_eq!(build_reports(&scans, None, None).len(), 2);
        assert!(build_reports(&scans, Some(3), None).is_empty());
        let top = build_reports(&scans, None, Some(1));
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].function, "outer");
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&summarize(&sample_scan()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("TOTAL"));
        assert!(lines[1].contains("src/app.ts"));
        assert!(lines[1].ends_with("outer"));
    }

    #[test]
    fn test_truncate_or_pad() {
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
        assert_eq!(truncate_or_pad("abcdefgh", 6), "abc...");
        assert_eq!(truncate_or_pad("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&summarize(&sample_scan()));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["function"], "outer");
        assert_eq!(value[1]["logical_or"], 1);
        assert_eq!(value[0]["end_line"], 10);
    }

    #[test]
    fn test_render_points_jsonl() {
        let jsonl = render_points_jsonl(&[sample_scan()]);
        let records: Vec<serde_json::Value> = jsonl
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0]["file"], "src/app.ts");
        assert_eq!(records[0]["type"], "default parameter");
        assert_eq!(records[1]["type"], "&&");
        assert_eq!(records[1]["functionLine"], 3);
    }
}
