//! Source text preparation and file collection
//!
//! Global invariants enforced:
//! - Comment stripping and literal masking preserve byte columns and line count
//! - File collection order is sorted and independent of directory iteration order

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Extensions scanned by default
const SUPPORTED_EXTENSIONS: &[&str] = &["ts", "mts", "cts", "tsx", "js", "mjs", "cjs", "jsx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Quote(char),
    Template,
    LineComment,
    BlockComment,
}

/// Walk `source` char by char, reporting each char with the lexical state it belongs to
fn walk(source: &str, mut emit: impl FnMut(char, Lex)) {
    let mut state = Lex::Code;
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            Lex::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    state = Lex::LineComment;
                    emit(c, state);
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = Lex::BlockComment;
                    emit(c, state);
                    if let Some(star) = chars.next() {
                        emit(star, state);
                    }
                }
                '\'' | '"' => {
                    emit(c, Lex::Code);
                    state = Lex::Quote(c);
                }
                '`' => {
                    emit(c, Lex::Code);
                    state = Lex::Template;
                }
                _ => emit(c, Lex::Code),
            },
            Lex::Quote(q) => {
                if c == '\\' {
                    emit(c, state);
                    if let Some(&next) = chars.peek() {
                        if next != '\n' {
                            chars.next();
                            emit(next, state);
                        }
                    }
                } else if c == q {
                    emit(c, Lex::Code);
                    state = Lex::Code;
                } else if c == '\n' {
                    // Unterminated quote (or markup text such as `Don't`) ends at the line
                    emit(c, Lex::Code);
                    state = Lex::Code;
                } else {
                    emit(c, state);
                }
            }
            Lex::Template => {
                if c == '\\' {
                    emit(c, state);
                    if let Some(next) = chars.next() {
                        emit(next, state);
                    }
                } else if c == '`' {
                    emit(c, Lex::Code);
                    state = Lex::Code;
                } else {
                    emit(c, state);
                }
            }
            Lex::LineComment => {
                if c == '\n' {
                    state = Lex::Code;
                    emit(c, state);
                } else {
                    emit(c, state);
                }
            }
            Lex::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    emit(c, state);
                    if let Some(slash) = chars.next() {
                        emit(slash, state);
                    }
                    state = Lex::Code;
                } else {
                    emit(c, state);
                }
            }
        }
    }
}

fn push_blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        for _ in 0..c.len_utf8() {
            out.push(' ');
        }
    }
}

/// Replace `//` and `/* */` comments with spaces
///
/// Newlines inside block comments are kept, so line numbers and byte columns
/// of the remaining code are unchanged.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    walk(source, |c, lex| match lex {
        Lex::LineComment | Lex::BlockComment => push_blank(&mut out, c),
        _ => out.push(c),
    });
    out
}

/// Strip comments and blank out string and template literal contents
///
/// Quote characters stay in place. Used by the outline scanner so braces and
/// parentheses inside literals are not mistaken for structure.
pub fn mask_code(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    walk(source, |c, lex| match lex {
        Lex::Code => out.push(c),
        _ => push_blank(&mut out, c),
    });
    out
}

/// Comment-stripped copy of each line, in order
pub fn strip_comment_lines(lines: &[&str]) -> Vec<String> {
    let stripped = strip_comments(&lines.join("\n"));
    let mut out: Vec<String> = stripped.split('\n').map(str::to_string).collect();
    out.resize(lines.len(), String::new());
    out
}

/// Check if a file is a supported source file
pub fn is_supported_source_file(filename: &str) -> bool {
    // Skip TypeScript declaration files (.d.ts)
    if filename.ends_with(".d.ts") {
        return false;
    }
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.')
        || name == "node_modules"
        || name == "dist"
        || name == "build"
        || name == "out"
        || name == "coverage"
        || name == "target"
}

/// Collect all supported source files from a path (file or directory)
///
/// Supported extensions: .ts, .mts, .cts, .tsx, .js, .mjs, .cjs, .jsx
/// (declaration files are skipped). The result is sorted.
pub fn collect_source_files(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            if is_supported_source_file(filename) {
                files.push(path.to_path_buf());
            }
        }
    } else if path.is_dir() {
        collect_source_files_recursive(path, &mut files)?;
    } else {
        anyhow::bail!("path does not exist: {}", path.display());
    }

    // Sort files for deterministic order
    files.sort();

    Ok(files)
}

/// Process one directory entry, pushing source files or recursing into dirs
fn process_dir_entry(
    path: PathBuf,
    metadata: std::fs::Metadata,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    if metadata.is_symlink() {
        return Ok(());
    }

    if metadata.is_dir() {
        if let Some(name) = path.file_name().and_then(|n: &OsStr| n.to_str()) {
            if is_skipped_dir(name) {
                tracing::trace!(dir = %path.display(), "skipping directory");
                return Ok(());
            }
        }
        collect_source_files_recursive(&path, files)?;
    } else if metadata.is_file() {
        if let Some(filename) = path.file_name().and_then(|n: &OsStr| n.to_str()) {
            if is_supported_source_file(filename) {
                files.push(path);
            }
        }
    }

    Ok(())
}

/// Recursively collect supported source files from a directory
fn collect_source_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry_result in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry_result?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
        process_dir_entry(path, metadata, files)?;
    }

    Ok(())
}
