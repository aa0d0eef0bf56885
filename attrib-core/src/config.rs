//! Configuration file support for attrib
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.attribrc.json` in project root
//! 3. `attrib.config.json` in project root
//! 4. `"attrib"` key in `package.json`
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::oracle::OracleMode;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default exclude patterns applied when no config is specified
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/coverage/**",
    "**/*.min.js",
    "**/*.d.ts",
];

/// attrib configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttribConfig {
    /// Glob patterns for files to include (default: all supported extensions)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for files to exclude (default: node_modules, dist, build, bundles)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Drop repeated points for the same line, kind and column (default: true)
    #[serde(default)]
    pub dedupe: Option<bool>,

    /// Literal and ternary oracle (default: permissive)
    #[serde(default)]
    pub oracle: Option<OracleMode>,

    /// Only report functions with at least this many decision points
    #[serde(default)]
    pub min_points: Option<usize>,

    /// Maximum number of functions to show
    #[serde(default)]
    pub top: Option<usize>,
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Compiled include patterns (empty means include all)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    pub dedupe: bool,
    pub oracle: OracleMode,
    /// Filters
    pub min_points: Option<usize>,
    pub top_n: Option<usize>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl AttribConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if self.top == Some(0) {
            anyhow::bail!("top must be at least 1 (got 0)");
        }

        // Validate glob patterns compile
        for pattern in &self.include {
            Glob::new(pattern).with_context(|| format!("invalid include pattern: {}", pattern))?;
        }
        for pattern in &self.exclude {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        // Compile include patterns
        let include = if self.include.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.include {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };

        // Compile exclude patterns (defaults only when the user gave none)
        let exclude = {
            let mut builder = GlobSetBuilder::new();
            if self.exclude.is_empty() {
                for pattern in DEFAULT_EXCLUDES {
                    builder.add(Glob::new(pattern)?);
                }
            } else {
                for pattern in &self.exclude {
                    builder.add(Glob::new(pattern)?);
                }
            }
            builder.build()?
        };

        Ok(ResolvedConfig {
            include,
            exclude,
            dedupe: self.dedupe.unwrap_or(true),
            oracle: self.oracle.unwrap_or_default(),
            min_points: self.min_points,
            top_n: self.top,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Check if a file path should be included based on include/exclude patterns
    pub fn should_include(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        // Check exclude first
        if self.exclude.is_match(path_str.as_ref()) {
            return false;
        }

        // If include patterns exist, file must match at least one
        if let Some(ref include) = self.include {
            return include.is_match(path_str.as_ref());
        }

        true
    }

    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        AttribConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.attribrc.json`
/// 2. `attrib.config.json`
/// 3. `"attrib"` key in `package.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(AttribConfig, PathBuf)>> {
    for name in [".attribrc.json", "attrib.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            return Ok(Some((load_config_file(&path)?, path)));
        }
    }

    let pkg_path = project_root.join("package.json");
    if !pkg_path.exists() {
        return Ok(None);
    }
    Ok(load_from_package_json(&pkg_path)?.map(|config| (config, pkg_path)))
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<AttribConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: AttribConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load attrib config from the "attrib" key in package.json
fn load_from_package_json(path: &Path) -> Result<Option<AttribConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let pkg: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    match pkg.get("attrib") {
        Some(value) => {
            let config: AttribConfig = serde_json::from_value(value.clone())
                .with_context(|| format!("invalid attrib config in {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid attrib config in {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (AttribConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    tracing::debug!(
        config = ?resolved.config_path,
        oracle = resolved.oracle.as_str(),
        dedupe = resolved.dedupe,
        "configuration resolved"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(json: &str) -> AttribConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_skip_bundles_and_declarations() {
        let resolved = ResolvedConfig::defaults().unwrap();
        assert!(resolved.dedupe);
        assert_eq!(resolved.oracle, OracleMode::Permissive);
        assert_eq!((resolved.min_points, resolved.top_n), (None, None));

        for skipped in [
            "node_modules/react/index.js",
            "web/dist/app.js",
            "public/chart.min.js",
            "src/types/global.d.ts",
        ] {
            assert!(!resolved.should_include(Path::new(skipped)), "{}", skipped);
        }
        assert!(resolved.should_include(Path::new("src/components/Button.tsx")));
    }

    #[test]
    fn test_report_settings_flow_into_resolved_config() {
        let resolved = parse(
            r#"{ "dedupe": false, "oracle": "lexical", "min_points": 3, "top": 15 }"#,
        )
        .resolve()
        .unwrap();
        assert!(!resolved.dedupe);
        assert_eq!(resolved.oracle, OracleMode::Lexical);
        assert_eq!(resolved.min_points, Some(3));
        assert_eq!(resolved.top_n, Some(15));
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_user_excludes_replace_the_defaults() {
        let resolved = parse(r#"{ "include": ["src/**/*.ts"], "exclude": ["src/generated/**"] }"#)
            .resolve()
            .unwrap();
        assert!(resolved.should_include(Path::new("src/api.ts")));
        assert!(!resolved.should_include(Path::new("src/generated/client.ts")));
        assert!(!resolved.should_include(Path::new("scripts/release.ts")));
        // node_modules is only skipped by the default list
        let vendored = parse(r#"{ "exclude": ["src/generated/**"] }"#).resolve().unwrap();
        assert!(vendored.should_include(Path::new("node_modules/lib/index.js")));
    }

    #[test]
    fn test_rejected_configs() {
        for json in [r#"{"oracel": "lexical"}"#, r#"{"oracle": "psychic"}"#] {
            assert!(serde_json::from_str::<AttribConfig>(json).is_err(), "{}", json);
        }
        for json in [r#"{"top": 0}"#, r#"{"include": ["src/[ts"]}"#, r#"{"exclude": ["{a"]}"#] {
            assert!(parse(json).validate().is_err(), "{}", json);
        }
        assert!(parse("{}").validate().is_ok());
    }

    #[test]
    fn test_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".attribrc.json");
        let named = dir.path().join("attrib.config.json");
        let pkg = dir.path().join("package.json");
        fs::write(&rc, r#"{"min_points": 1}"#).unwrap();
        fs::write(&named, r#"{"min_points": 2}"#).unwrap();
        fs::write(&pkg, r#"{"name": "app", "attrib": {"min_points": 3, "oracle": "lexical"}}"#)
            .unwrap();

        let found = |expected: &Path| {
            let (config, path) = discover_config(dir.path()).unwrap().unwrap();
            assert_eq!(path.as_path(), expected);
            config.min_points
        };
        assert_eq!(found(rc.as_path()), Some(1));
        fs::remove_file(&rc).unwrap();
        assert_eq!(found(named.as_path()), Some(2));
        fs::remove_file(&named).unwrap();
        assert_eq!(found(pkg.as_path()), Some(3));
    }

    #[test]
    fn test_package_json_without_attrib_key() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());

        fs::write(dir.path().join("package.json"), r#"{"name": "app", "version": "1.0.0"}"#)
            .unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_config_fails_discovery() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"attrib": {"top": 0}}"#).unwrap();
        let err = discover_config(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("top must be at least 1"));
    }

    #[test]
    fn test_explicit_path_wins_over_discovery() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".attribrc.json"), r#"{"oracle": "lexical"}"#).unwrap();
        let custom = dir.path().join("ci.json");
        fs::write(&custom, r#"{"dedupe": false}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&custom)).unwrap();
        assert!(!resolved.dedupe);
        assert_eq!(resolved.oracle, OracleMode::Permissive);
        assert_eq!(resolved.config_path.as_deref(), Some(custom.as_path()));

        let discovered = load_and_resolve(dir.path(), None).unwrap();
        assert_eq!(discovered.oracle, OracleMode::Lexical);
    }
}
