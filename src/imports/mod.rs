//! Import reorganization for Dart sources.
//!
//! The transform is a fixed chain of line stages:
//!
//! 1. [`split_imports`] puts each of several imports sharing one line on a
//!    line of its own.
//! 2. [`Relativizer::apply`] rewrites `package:<self>/...` imports of files
//!    under the library root into path-relative imports.
//! 3. [`organize_imports`] buckets and sorts import lines. This is the only
//!    stage that buffers its whole input.
//! 4. [`terminate_lines`] re-appends `\n` to each line and hashes the result.
//!
//! A SHA-256 digest of the raw input is compared with the digest of the
//! emitted bytes to decide whether the file changed.
//!
//! Import statements spanning several physical lines are not supported: a
//! line that does not hold a complete `import ...;` statement is treated as
//! code.

use crate::task::{self, FileTask, TaskError};
use crate::{RepoEntry, TaskResult};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static DART_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+["']dart:[^;]+;\s*(?://.*)?$"#).expect("regex for dart imports")
});

static PACKAGE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+["']package:[^;]+;\s*(?://.*)?$"#)
        .expect("regex for package imports")
});

// Checked after the two above, so anything matching here is relative.
static ANY_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+["'][^;]+;\s*(?://.*)?$"#).expect("regex for relative imports")
});

static IMPORT_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+["'][^;]+;"#).expect("regex for import statements")
});

static SHARED_IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:import\s+["'][^;]+;\s*){2,}(//.*)?$"#)
        .expect("regex for lines with several imports")
});

/// Result of running the transform over one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reorganized {
    pub content: String,
    pub changed: bool,
}

/// Rewrites self-package imports relative to one importing file.
#[derive(Debug)]
pub struct Relativizer<'a> {
    import: &'a Regex,
    /// Directory of the importing file relative to the library root, or
    /// `None` when the file is outside of it.
    from_dir: Option<Vec<String>>,
}

impl<'a> Relativizer<'a> {
    /// `import` must be built with [`self_import_pattern`].
    pub fn new(import: &'a Regex, lib_dir: &Path, file: &Path) -> Self {
        let from_dir = file.strip_prefix(lib_dir).ok().map(|relative| {
            let mut parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            parts.pop();
            parts
        });
        Self { import, from_dir }
    }

    /// A relativizer that passes every line through.
    pub fn disabled(import: &'a Regex) -> Self {
        Self {
            import,
            from_dir: None,
        }
    }

    pub fn apply<I>(&self, lines: I) -> impl Iterator<Item = String>
    where
        I: IntoIterator<Item = String>,
    {
        lines.into_iter().map(move |line| self.rewrite(line))
    }

    fn rewrite(&self, line: String) -> String {
        let Some(from_dir) = &self.from_dir else {
            return line;
        };
        let rewritten = self.import.captures(line.trim()).map(|caps| {
            let quote = &caps[1];
            let target = relative_path(from_dir, &caps[2]);
            let postfix = &caps[3];
            let comment = caps
                .get(4)
                .map(|m| format!(" {}", m.as_str()))
                .unwrap_or_default();
            format!("import {quote}{target}{quote}{postfix};{comment}")
        });
        rewritten.unwrap_or(line)
    }
}

/// Split lines holding several complete import statements, one per line.
///
/// A trailing comment stays with the last statement. Other lines pass
/// through untouched.
pub fn split_imports<I>(lines: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = String>,
{
    lines.into_iter().flat_map(split_line)
}

fn split_line(line: String) -> Vec<String> {
    let split = SHARED_IMPORT_LINE.captures(&line).map(|caps| {
        let comment = caps.get(1);
        let code = &line[..comment.map_or(line.len(), |c| c.start())];
        let mut statements: Vec<String> = IMPORT_STATEMENT
            .find_iter(code)
            .map(|m| m.as_str().to_string())
            .collect();
        if let (Some(comment), Some(last)) = (comment, statements.last_mut()) {
            last.push(' ');
            last.push_str(comment.as_str());
        }
        statements
    });
    split.unwrap_or_else(|| vec![line])
}

/// Pattern matching `import 'package:<package_name>/...';` lines.
pub fn self_import_pattern(package_name: &str) -> Regex {
    let source = format!(
        r#"^\s*import\s*(['"])package:{}/([^'"]*)['"]([^;]*);\s*(//.*)?$"#,
        regex::escape(package_name)
    );
    Regex::new(&source).expect("regex for self package imports")
}

/// Path from directory `from_dir` to `target`, both relative to the same
/// root, using `/` separators.
fn relative_path(from_dir: &[String], target: &str) -> String {
    let mut target_parts: Vec<&str> = Vec::new();
    for part in target.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                target_parts.pop();
            }
            part => target_parts.push(part),
        }
    }

    let common = from_dir
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == *b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from_dir.len() - common];
    parts.extend_from_slice(&target_parts[common..]);
    parts.join("/")
}

/// Group imports into sorted `dart:`, `package:` and relative blocks.
///
/// Lines before the first import stay in place. Other non-import lines after
/// it form the body, emitted after the import blocks with leading and
/// trailing blank lines removed. Each non-empty block is followed by one
/// blank line.
pub fn organize_imports<I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut prefix = Vec::new();
    let mut body = Vec::new();
    let mut dart = Vec::new();
    let mut package = Vec::new();
    let mut relative = Vec::new();

    for line in lines {
        if DART_IMPORT.is_match(&line) {
            dart.push(line.trim().to_string());
        } else if PACKAGE_IMPORT.is_match(&line) {
            package.push(line.trim().to_string());
        } else if ANY_IMPORT.is_match(&line) {
            relative.push(line.trim().to_string());
        } else if dart.is_empty() && package.is_empty() && relative.is_empty() {
            prefix.push(line);
        } else {
            body.push(line);
        }
    }

    let start = body
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(body.len());
    let end = body
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |last| last + 1);

    let mut out = prefix;
    for mut block in [dart, package, relative] {
        if block.is_empty() {
            continue;
        }
        block.sort();
        out.append(&mut block);
        out.push(String::new());
    }
    out.extend(body.drain(start..end));
    out
}

/// Join lines with a `\n` after each one, hashing exactly the emitted bytes.
pub fn terminate_lines<I>(lines: I) -> (String, Vec<u8>)
where
    I: IntoIterator<Item = String>,
{
    let mut hasher = Sha256::new();
    let mut content = String::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
        content.push_str(&line);
        content.push('\n');
    }
    (content, hasher.finalize().to_vec())
}

/// Run the whole transform over `content`.
pub fn reorganize(content: &str, relativizer: &Relativizer<'_>) -> Reorganized {
    let input_digest = Sha256::digest(content.as_bytes()).to_vec();

    let lines = split_imports(content.lines().map(str::to_string));
    let organized = organize_imports(relativizer.apply(lines));
    let (content, output_digest) = terminate_lines(organized);

    Reorganized {
        changed: input_digest != output_digest,
        content,
    }
}

/// File task that relativizes and sorts imports in place.
pub struct FixImportsTask {
    lib_dir: PathBuf,
    self_import: Regex,
    pattern: Regex,
}

impl FixImportsTask {
    pub fn new(package_name: &str, lib_dir: impl Into<PathBuf>) -> Self {
        Self {
            lib_dir: lib_dir.into(),
            self_import: self_import_pattern(package_name),
            pattern: task::pattern(r"^(?:bin|lib|test)/.*\.dart$"),
        }
    }
}

impl FileTask for FixImportsTask {
    fn name(&self) -> &str {
        "fix-imports"
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    fn apply(&self, entry: &RepoEntry) -> task::Result<TaskResult> {
        let content = fs::read_to_string(&entry.file).map_err(|source| {
            if source.kind() == ErrorKind::InvalidData {
                TaskError::Malformed(format!("{} is not valid UTF-8", entry.path))
            } else {
                TaskError::Io {
                    path: entry.file.clone(),
                    source,
                }
            }
        })?;

        let relativizer = Relativizer::new(&self.self_import, &self.lib_dir, &entry.file);
        let result = reorganize(&content, &relativizer);
        if !result.changed {
            return Ok(TaskResult::Accepted);
        }

        debug!(path = %entry.path, "rewriting imports");
        fs::write(&entry.file, result.content).map_err(|source| TaskError::Io {
            path: entry.file.clone(),
            source,
        })?;
        Ok(TaskResult::Modified)
    }
}
