//! Integration tests for decision-point attribution over fixture files

use attrib_core::engine::{self, EngineOptions};
use attrib_core::{
    build_reports, render_points_jsonl, BoundaryIndex, DecisionKind, DecisionPoint,
    FunctionAttributionReport, ResolvedConfig,
};
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
}

fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

fn scan(name: &str) -> engine::FileScan {
    engine::scan_file(&fixture_path(name), &EngineOptions::default()).unwrap()
}

fn of_kind(points: &[DecisionPoint], kind: DecisionKind) -> Vec<&DecisionPoint> {
    points.iter().filter(|p| p.kind == kind).collect()
}

fn report_at(reports: &[FunctionAttributionReport], line: usize) -> &FunctionAttributionReport {
    reports
        .iter()
        .find(|r| r.line == line)
        .unwrap_or_else(|| panic!("no report for line {}", line))
}

#[test]
fn test_conditions() {
    let scan = scan("conditions.ts");
    assert_eq!(scan.functions.len(), 1);
    assert_eq!(scan.functions[0].name, "canSubmit");
    assert_eq!(scan.points.len(), 5);
    assert!(scan.points.iter().all(|p| p.function_line == 1));

    let ands: Vec<usize> = of_kind(&scan.points, DecisionKind::LogicalAnd)
        .iter()
        .map(|p| p.line)
        .collect();
    let ors: Vec<usize> = of_kind(&scan.points, DecisionKind::LogicalOr)
        .iter()
        .map(|p| p.line)
        .collect();
    assert_eq!(ands, vec![2, 6]);
    assert_eq!(ors, vec![7, 12]);

    let defaults = of_kind(&scan.points, DecisionKind::DefaultParameter);
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].name, "retries");
}

#[test]
fn test_callbacks() {
    let scan = scan("callbacks.js");
    assert_eq!(scan.functions.len(), 3);

    let reports = build_reports(std::slice::from_ref(&scan), None, None);
    let outer = report_at(&reports, 1);
    assert_eq!(outer.function, "filterActive");
    assert_eq!(outer.default_parameters, 1);
    assert_eq!(outer.logical_and, 2);
    // The `if` inside the forEach callback follows an ended sibling (the
    // filter callback), so the outermost function takes it
    assert_eq!(outer.logical_or, 1);
    assert_eq!(outer.total, 4);

    let for_each = report_at(&reports, 3);
    assert_eq!(for_each.function, "<anonymous>");
    assert_eq!(for_each.total, 0);
    assert_eq!(for_each.end_line, 7);

    // The filter callback owns nothing: its operator sits after the arrow
    assert_eq!(report_at(&reports, 2).total, 0);
    assert_eq!(reports[0].function, "filterActive");
}

#[test]
fn test_component_defaults_and_markup_operators() {
    let scan = scan("component.jsx");
    assert_eq!(scan.functions.len(), 1);
    assert_eq!(scan.functions[0].name, "Panel");

    let defaults: Vec<&str> = of_kind(&scan.points, DecisionKind::DefaultParameter)
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(defaults, vec!["title", "size", "tone"]);
    assert_eq!(of_kind(&scan.points, DecisionKind::LogicalAnd).len(), 1);
    assert_eq!(of_kind(&scan.points, DecisionKind::LogicalOr).len(), 1);
    assert!(scan.points.iter().all(|p| p.function_line == 1));
}

#[test]
fn test_class_methods() {
    let scan = scan("classes.ts");
    let names: Vec<&str> = scan.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["get", "load"]);

    let reports = build_reports(std::slice::from_ref(&scan), None, None);
    assert_eq!(report_at(&reports, 2).default_parameters, 1);
    let load = report_at(&reports, 6);
    assert_eq!(load.default_parameters, 2);
    assert_eq!(load.logical_and, 1);
    assert_eq!(load.end_line, 15);
}

#[test]
fn test_control_header_with_inline_callback() {
    let scan = scan("control-callback.ts");
    assert_eq!(scan.points.len(), 1);
    assert_eq!(scan.points[0].kind, DecisionKind::LogicalAnd);
    assert_eq!(scan.points[0].function_line, 1);
}

#[test]
fn test_loop_header_before_callback() {
    let scan = scan("loop-callback.ts");
    assert_eq!(scan.functions.len(), 2);
    assert!(of_kind(&scan.points, DecisionKind::DefaultParameter).is_empty());
    assert_eq!(scan.points.len(), 1);
    assert_eq!(scan.points[0].kind, DecisionKind::LogicalAnd);
    assert_eq!(scan.points[0].function_line, 1);
}

#[test]
fn test_external_boundaries() {
    let index = BoundaryIndex::load_json(&fixture_path("callbacks.boundaries.json")).unwrap();
    assert_eq!(index.len(), 2);

    let scan = engine::scan_file_with_boundaries(
        &fixture_path("callbacks.js"),
        &index,
        &EngineOptions::default(),
    )
    .unwrap();
    let names: Vec<&str> = scan.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["filterActive", "<anonymous>"]);

    let reports = build_reports(std::slice::from_ref(&scan), None, None);
    assert_eq!(report_at(&reports, 1).total, 3);
    assert_eq!(report_at(&reports, 3).logical_or, 1);
}

#[test]
fn test_scan_directory() {
    let config = ResolvedConfig::defaults().unwrap();
    let scans = engine::scan_path(&fixtures_dir(), &config).unwrap();
    let names: Vec<String> = scans
        .iter()
        .map(|s| s.file.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "callbacks.js",
            "classes.ts",
            "component.jsx",
            "conditions.ts",
            "control-callback.ts",
            "loop-callback.ts"
        ]
    );

    let total: usize = scans.iter().map(|s| s.points.len()).sum();
    let jsonl = render_points_jsonl(&scans);
    assert_eq!(jsonl.lines().count(), total);

    let top = build_reports(&scans, Some(1), Some(2));
    assert_eq!(top.len(), 2);
    assert!(top[0].total >= top[1].total);
}
