//! Structural editing of `meson.build` files
//!
//! This is not a Meson interpreter. A scanner separates code from strings and
//! comments and checks that brackets balance; the edits then work on the spans
//! it found. That is enough for the edits a split needs: bump the project
//! version, drop source entries that moved out, declare one external
//! dependency and list it where the moved sources used to be built.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::path::lexical_join;

/// File extensions treated as compilable sources or headers
const SOURCE_EXTENSIONS: &[&str] = &["c", "h", "cc", "cpp", "cxx", "hpp"];

/// A string literal found by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLit {
    /// Byte offset of the opening quote
    pub start: usize,
    /// Byte offset just past the closing quote
    pub end: usize,
    /// Raw text between the quotes
    pub value: String,
    /// Whether this is a `'''` literal
    pub multiline: bool,
}

/// Result of scanning a descriptor
#[derive(Debug, Clone)]
pub struct Scan {
    /// `true` for bytes that are code, `false` inside strings and comments
    code: Vec<bool>,
    strings: Vec<StringLit>,
}

impl Scan {
    fn is_code(&self, idx: usize) -> bool {
        self.code.get(idx).copied().unwrap_or(false)
    }

    /// All string literals, in file order
    pub fn strings(&self) -> &[StringLit] {
        &self.strings
    }

    /// Index of the bracket closing the one opened at `open`
    fn matching_close(&self, content: &str, open: usize) -> Option<usize> {
        let bytes = content.as_bytes();
        let mut depth = 0usize;
        for (idx, &b) in bytes.iter().enumerate().skip(open) {
            if !self.is_code(idx) {
                continue;
            }
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Scan `content`, failing on unterminated strings or unbalanced brackets.
///
/// Error messages carry a 1-based line number.
pub fn scan(content: &str) -> Result<Scan, String> {
    let bytes = content.as_bytes();
    let mut code = vec![true; bytes.len()];
    let mut strings = Vec::new();
    let mut stack: Vec<(u8, usize)> = Vec::new();
    let mut line = 1usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                line += 1;
                i += 1;
            }
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    code[i] = false;
                    i += 1;
                }
            }
            b'\'' if bytes[i..].starts_with(b"'''") => {
                let start = i;
                let close = content[i + 3..]
                    .find("'''")
                    .ok_or_else(|| format!("unterminated multi-line string on line {}", line))?;
                let end = i + 3 + close + 3;
                line += content[start..end].matches('\n').count();
                code[start..end].iter_mut().for_each(|c| *c = false);
                strings.push(StringLit {
                    start,
                    end,
                    value: content[start + 3..end - 3].to_string(),
                    multiline: true,
                });
                i = end;
            }
            b'\'' => {
                let start = i;
                i += 1;
                loop {
                    match bytes.get(i) {
                        None | Some(b'\n') => {
                            return Err(format!("unterminated string on line {}", line));
                        }
                        Some(b'\\') => i += 2,
                        Some(b'\'') => {
                            i += 1;
                            break;
                        }
                        Some(_) => i += 1,
                    }
                }
                code[start..i].iter_mut().for_each(|c| *c = false);
                strings.push(StringLit {
                    start,
                    end: i,
                    value: content[start + 1..i - 1].to_string(),
                    multiline: false,
                });
            }
            open @ (b'(' | b'[' | b'{') => {
                stack.push((open, line));
                i += 1;
            }
            close @ (b')' | b']' | b'}') => {
                let expected = match close {
                    b')' => b'(',
                    b']' => b'[',
                    _ => b'{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, opened_on)) => {
                        return Err(format!(
                            "'{}' on line {} does not close '{}' opened on line {}",
                            close as char, line, open as char, opened_on
                        ));
                    }
                    None => {
                        return Err(format!("unexpected '{}' on line {}", close as char, line));
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    if let Some((open, opened_on)) = stack.pop() {
        return Err(format!("unclosed '{}' opened on line {}", open as char, opened_on));
    }

    Ok(Scan { code, strings })
}

fn project_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bproject\s*\(").expect("static regex"))
}

fn version_kwarg_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bversion\s*:\s*$").expect("static regex"))
}

fn dependency_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bdependency\s*\(\s*'([^'\n]+)'").expect("static regex"))
}

fn dependencies_kwarg_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bdependencies\s*:\s*\[").expect("static regex"))
}

fn top_level_dependency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[A-Za-z_][A-Za-z0-9_]*\s*=\s*(?:dependency|subproject)\s*\(")
            .expect("static regex")
    })
}

/// Span of the `project(...)` call: (start of `project`, closing paren)
fn project_call(content: &str, scan: &Scan) -> Option<(usize, usize)> {
    project_call_regex()
        .find_iter(content)
        .find(|m| scan.is_code(m.start()))
        .and_then(|m| {
            let open = m.end() - 1;
            scan.matching_close(content, open).map(|close| (m.start(), close))
        })
}

/// Offset just past the end of the line containing `idx`
fn end_of_line(content: &str, idx: usize) -> usize {
    content[idx..]
        .find('\n')
        .map(|n| idx + n + 1)
        .unwrap_or(content.len())
}

/// Name and version declared by `project()`, if any
pub fn project_info(content: &str) -> Result<(Option<String>, Option<String>), String> {
    let scan = scan(content)?;
    let Some((start, close)) = project_call(content, &scan) else {
        return Ok((None, None));
    };

    let in_call: Vec<&StringLit> = scan
        .strings
        .iter()
        .filter(|s| s.start > start && s.end <= close)
        .collect();
    let name = in_call.first().map(|s| s.value.clone());
    let version = in_call
        .iter()
        .find(|s| version_kwarg_regex().is_match(&content[start..s.start]))
        .map(|s| s.value.clone());

    Ok((name, version))
}

/// Names passed to `dependency('...')` calls, in file order
pub fn dependency_names(content: &str) -> Result<Vec<String>, String> {
    let scan = scan(content)?;
    Ok(dependency_call_regex()
        .captures_iter(content)
        .filter(|c| c.get(0).map(|m| scan.is_code(m.start())).unwrap_or(false))
        .map(|c| c[1].to_string())
        .collect())
}

/// Source and header entries, resolved relative to the tree root
pub fn source_entries(content: &str, dir: &Path) -> Result<Vec<PathBuf>, String> {
    let scan = scan(content)?;
    Ok(scan
        .strings
        .iter()
        .filter(|s| !s.multiline && has_source_extension(&s.value))
        .filter_map(|s| lexical_join(dir, &s.value))
        .collect())
}

fn has_source_extension(value: &str) -> bool {
    Path::new(value)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Set the `version:` keyword of `project()`, adding it when absent.
pub fn set_project_version(content: &str, version: &str) -> Result<String, String> {
    let scan = scan(content)?;
    let (start, close) =
        project_call(content, &scan).ok_or_else(|| "no project() call".to_string())?;

    let existing = scan
        .strings
        .iter()
        .filter(|s| s.start > start && s.end <= close && !s.multiline)
        .find(|s| version_kwarg_regex().is_match(&content[start..s.start]));

    let mut out = String::with_capacity(content.len() + version.len() + 16);
    match existing {
        Some(lit) => {
            out.push_str(&content[..lit.start]);
            out.push('\'');
            out.push_str(version);
            out.push('\'');
            out.push_str(&content[lit.end..]);
        }
        None => {
            let before = content[..close].trim_end();
            let insert_at = before.len();
            out.push_str(&content[..insert_at]);
            if before.ends_with(',') || before.ends_with('(') {
                out.push_str(&format!(" version: '{}'", version));
            } else {
                out.push_str(&format!(", version: '{}'", version));
            }
            out.push_str(&content[insert_at..]);
        }
    }
    Ok(out)
}

/// Remove source entries that resolve (relative to `dir`) into `extracted`.
///
/// A line left empty by the removal is dropped. Returns the new content and
/// the resolved paths that were removed, in file order.
pub fn remove_sources(
    content: &str,
    dir: &Path,
    extracted: &BTreeSet<PathBuf>,
) -> Result<(String, Vec<PathBuf>), String> {
    let scan = scan(content)?;
    let bytes = content.as_bytes();

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut removed = Vec::new();
    for lit in scan.strings.iter().filter(|s| !s.multiline) {
        let Some(resolved) = lexical_join(dir, &lit.value) else {
            continue;
        };
        if !extracted.contains(&resolved) {
            continue;
        }

        // Swallow a following comma and the blanks around it
        let mut end = lit.end;
        while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
            end += 1;
        }
        if end < bytes.len() && bytes[end] == b',' {
            end += 1;
            while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
                end += 1;
            }
        }
        ranges.push((lit.start, end));
        removed.push(resolved);
    }

    if ranges.is_empty() {
        return Ok((content.to_string(), removed));
    }

    let mut out = String::with_capacity(content.len());
    let mut offset = 0usize;
    for line in content.split_inclusive('\n') {
        let line_start = offset;
        let line_end = offset + line.len();
        offset = line_end;

        let hits: Vec<&(usize, usize)> = ranges
            .iter()
            .filter(|(s, _)| *s >= line_start && *s < line_end)
            .collect();
        if hits.is_empty() {
            out.push_str(line);
            continue;
        }

        let mut kept = String::new();
        let mut cursor = line_start;
        for (s, e) in hits {
            kept.push_str(&content[cursor..*s]);
            cursor = (*e).min(line_end);
        }
        kept.push_str(&content[cursor..line_end]);

        // A trailing comment belonged to the removed entry
        let rest = kept.trim();
        if !rest.is_empty() && !rest.starts_with('#') {
            out.push_str(&kept);
        }
    }

    Ok((out, removed))
}

fn subdir_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*subdir\s*\(\s*'([^'\n]+)'\s*\)[ \t]*(?:#[^\n]*)?\n?")
            .expect("static regex")
    })
}

/// Drop `subdir('x')` lines whose target directory fails `exists`.
///
/// `exists` receives the resolved directory relative to the tree root.
/// Returns the new content and the dropped directories.
pub fn remove_subdir_calls<F>(
    content: &str,
    dir: &Path,
    exists: F,
) -> Result<(String, Vec<PathBuf>), String>
where
    F: Fn(&Path) -> bool,
{
    let scan = scan(content)?;
    let mut out = String::with_capacity(content.len());
    let mut dropped = Vec::new();
    let mut cursor = 0usize;

    for caps in subdir_call_regex().captures_iter(content) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // The name literal must be real code, not a comment or a string
        if !scan.strings.iter().any(|s| s.start + 1 == target.start()) {
            continue;
        }
        let Some(resolved) = lexical_join(dir, target.as_str()) else {
            continue;
        };
        if exists(&resolved) {
            continue;
        }
        out.push_str(&content[cursor..whole.start()]);
        cursor = whole.end();
        dropped.push(resolved);
    }
    out.push_str(&content[cursor..]);

    Ok((out, dropped))
}

/// Add `variable` to every `dependencies: [...]` list that lacks it.
///
/// Returns the new content and the number of lists changed.
pub fn add_to_dependency_lists(content: &str, variable: &str) -> Result<(String, usize), String> {
    let scan = scan(content)?;
    let bytes = content.as_bytes();
    let ident = Regex::new(&format!(r"\b{}\b", regex::escape(variable))).map_err(|e| e.to_string())?;

    // (offset, text) insertions, applied back to front
    let mut edits: Vec<(usize, String)> = Vec::new();
    let mut changed = 0usize;

    for m in dependencies_kwarg_regex().find_iter(content) {
        if !scan.is_code(m.start()) {
            continue;
        }
        let open = m.end() - 1;
        let Some(close) = scan.matching_close(content, open) else {
            continue;
        };

        let inner = &content[open + 1..close];
        if ident
            .find_iter(inner)
            .any(|found| scan.is_code(open + 1 + found.start()))
        {
            continue;
        }

        // Last code byte inside the list that is not whitespace
        let last_code = (open + 1..close)
            .rev()
            .find(|&i| scan.is_code(i) && !bytes[i].is_ascii_whitespace());

        match last_code {
            None => edits.push((open + 1, variable.to_string())),
            Some(last) => {
                let has_comma = bytes[last] == b',';
                let line_break = content[last..close].find('\n').map(|n| last + n);
                match line_break {
                    Some(nl) => {
                        let indent = line_indent(content, last);
                        // Same offset as the comma when nothing follows it;
                        // pushed first so it lands after the comma
                        edits.push((nl, format!("\n{}{},", indent, variable)));
                        if !has_comma {
                            edits.push((last + 1, ",".to_string()));
                        }
                    }
                    None => {
                        let text = if has_comma {
                            format!(" {}", variable)
                        } else {
                            format!(", {}", variable)
                        };
                        edits.push((last + 1, text));
                    }
                }
            }
        }
        changed += 1;
    }

    let mut out = content.to_string();
    edits.sort_by(|a, b| b.0.cmp(&a.0));
    for (at, text) in edits {
        out.insert_str(at, &text);
    }
    Ok((out, changed))
}

fn line_indent(content: &str, idx: usize) -> &str {
    let line_start = content[..idx].rfind('\n').map(|n| n + 1).unwrap_or(0);
    let line = &content[line_start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// Result of [`insert_declaration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    /// The dependency was already declared; nothing changed
    AlreadyPresent,
    /// An existing assignment to the variable was replaced
    Replaced,
    /// A new declaration was inserted
    Inserted,
}

/// Declare the external dependency `name` in a root descriptor.
///
/// An existing top-level assignment to `variable` is replaced. Otherwise the
/// declaration goes after the last top-level `dependency()`/`subproject()`
/// assignment, or after `project()` when there is none.
pub fn insert_declaration(
    content: &str,
    variable: &str,
    name: &str,
    declaration: &str,
) -> Result<(String, Declaration), String> {
    let scan = scan(content)?;
    if project_call(content, &scan).is_none() {
        return Err("no project() call".to_string());
    }

    let already = dependency_call_regex()
        .captures_iter(content)
        .any(|c| &c[1] == name && c.get(0).map(|m| scan.is_code(m.start())).unwrap_or(false));
    if already {
        return Ok((content.to_string(), Declaration::AlreadyPresent));
    }

    let assignment = Regex::new(&format!(r"(?m)^{}\s*=", regex::escape(variable)))
        .map_err(|e| e.to_string())?;
    if let Some(m) = assignment.find_iter(content).find(|m| scan.is_code(m.start())) {
        let end = statement_end(content, &scan, m.end());
        let line_break = if content[..end].ends_with('\n') { "\n" } else { "" };
        let mut out = String::with_capacity(content.len() + declaration.len());
        out.push_str(&content[..m.start()]);
        out.push_str(declaration);
        out.push_str(line_break);
        out.push_str(&content[end..]);
        return Ok((out, Declaration::Replaced));
    }

    let anchor = top_level_dependency_regex()
        .find_iter(content)
        .filter(|m| scan.is_code(m.start()))
        .last()
        .map(|m| statement_end(content, &scan, m.start()))
        .or_else(|| project_call(content, &scan).map(|(_, close)| end_of_line(content, close)))
        .unwrap_or(content.len());

    let mut out = String::with_capacity(content.len() + declaration.len() + 2);
    out.push_str(&content[..anchor]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(declaration);
    out.push('\n');
    out.push_str(&content[anchor..]);
    Ok((out, Declaration::Inserted))
}

/// End (past the newline) of the statement starting at or after `from`.
///
/// When the first code bracket on the statement's line opens a call, the
/// statement runs to its matching close.
fn statement_end(content: &str, scan: &Scan, from: usize) -> usize {
    let line_end = end_of_line(content, from);
    let open = (from..line_end).find(|&i| scan.is_code(i) && content.as_bytes()[i] == b'(');
    match open.and_then(|o| scan.matching_close(content, o)) {
        Some(close) => end_of_line(content, close),
        None => line_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = r#"project(
  'sway',
  'c',
  version: '1.11.0',
  license: 'MIT',
)

# wlroots comes from a subproject when available
wlroots = subproject('wlroots', default_options: ['examples=false']).get_variable('wlroots')
wayland_server = dependency('wayland-server', version: '>=1.21.0')

subdir('sway')
"#;

    const SWAY: &str = r#"sway_sources = files(
  'main.c',
  'tree/view.c',
  'tree/scene/scene.c',
  'tree/scene/color.c', # colour helpers
)

sway_deps = [
  wlroots,
  wayland_server,
]

executable(
  'sway',
  sway_sources,
  dependencies: [
    wlroots,
    wayland_server
  ],
)
"#;

    #[test]
    fn test_scan_accepts_valid_files() {
        assert!(scan(ROOT).is_ok());
        assert!(scan(SWAY).is_ok());
        assert!(scan("x = '''a\n(b\n'''\n").is_ok());
        assert!(scan("x = 'it\\'s' # (unbalanced in comment\n").is_ok());
    }

    #[test]
    fn test_scan_rejects_broken_files() {
        assert!(scan("files('a.c'\n").unwrap_err().contains("unclosed '('"));
        assert!(scan("x = 'open\n").unwrap_err().contains("unterminated string on line 1"));
        assert!(scan("a = [1)\n").unwrap_err().contains("does not close"));
        assert!(scan("\n)\n").unwrap_err().contains("line 2"));
        assert!(scan("x = '''never closed\n").is_err());
    }

    #[test]
    fn test_project_info() {
        let (name, version) = project_info(ROOT).unwrap();
        assert_eq!(name.as_deref(), Some("sway"));
        assert_eq!(version.as_deref(), Some("1.11.0"));

        assert_eq!(project_info("x = 1\n").unwrap(), (None, None));
    }

    #[test]
    fn test_dependency_names() {
        assert_eq!(dependency_names(ROOT).unwrap(), vec!["wayland-server".to_string()]);
        assert!(dependency_names("# dependency('commented')\n").unwrap().is_empty());
    }

    #[test]
    fn test_source_entries() {
        let entries = source_entries(SWAY, Path::new("sway")).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries.contains(&PathBuf::from("sway/tree/scene/scene.c")));
    }

    #[test]
    fn test_set_project_version_replaces() {
        let out = set_project_version(ROOT, "2.0.0").unwrap();
        assert!(out.contains("version: '2.0.0'"));
        assert!(!out.contains("1.11.0"));
        // other version kwargs untouched
        assert!(out.contains("version: '>=1.21.0'"));
    }

    #[test]
    fn test_set_project_version_inserts() {
        let out = set_project_version("project('a', 'c')\n", "0.3.0").unwrap();
        assert_eq!(out, "project('a', 'c', version: '0.3.0')\n");

        let out = set_project_version("project(\n  'a',\n)\n", "0.3.0").unwrap();
        assert_eq!(out, "project(\n  'a', version: '0.3.0'\n)\n");
    }

    #[test]
    fn test_set_project_version_requires_project() {
        assert_eq!(set_project_version("x = 1\n", "1.0.0").unwrap_err(), "no project() call");
    }

    #[test]
    fn test_remove_sources() {
        let extracted: BTreeSet<PathBuf> = [
            PathBuf::from("sway/tree/scene/scene.c"),
            PathBuf::from("sway/tree/scene/color.c"),
        ]
        .into_iter()
        .collect();

        let (out, removed) = remove_sources(SWAY, Path::new("sway"), &extracted).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!out.contains("tree/scene/"));
        assert!(out.contains("'main.c',\n  'tree/view.c',\n)"));
        assert!(scan(&out).is_ok());
    }

    #[test]
    fn test_remove_sources_inline_list() {
        let extracted: BTreeSet<PathBuf> = [PathBuf::from("a.c")].into_iter().collect();
        let (out, removed) =
            remove_sources("files('a.c', 'b.c')\n", Path::new(""), &extracted).unwrap();
        assert_eq!(removed, vec![PathBuf::from("a.c")]);
        assert_eq!(out, "files('b.c')\n");
    }

    #[test]
    fn test_remove_sources_nothing_to_do() {
        let (out, removed) = remove_sources(SWAY, Path::new("sway"), &BTreeSet::new()).unwrap();
        assert_eq!(out, SWAY);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_remove_subdir_calls() {
        let input = "subdir('config')\nsubdir('scene') # scene graph\n# subdir('scene')\nsubdir('input')\n";
        let (out, dropped) =
            remove_subdir_calls(input, Path::new("sway/tree"), |d| !d.ends_with("scene")).unwrap();
        assert_eq!(out, "subdir('config')\n# subdir('scene')\nsubdir('input')\n");
        assert_eq!(dropped, vec![PathBuf::from("sway/tree/scene")]);
    }

    #[test]
    fn test_add_to_dependency_lists() {
        let (out, changed) = add_to_dependency_lists(SWAY, "scene_scroll_dep").unwrap();
        assert_eq!(changed, 1);
        assert!(out.contains("    wayland_server,\n    scene_scroll_dep,\n  ],"));
        assert!(scan(&out).is_ok());

        // Already listed: untouched
        let (again, changed) = add_to_dependency_lists(&out, "scene_scroll_dep").unwrap();
        assert_eq!(changed, 0);
        assert_eq!(again, out);
    }

    #[test]
    fn test_add_to_inline_and_empty_lists() {
        let (out, _) = add_to_dependency_lists("x(dependencies: [a])\n", "d").unwrap();
        assert_eq!(out, "x(dependencies: [a, d])\n");

        let (out, _) = add_to_dependency_lists("x(dependencies: [a,])\n", "d").unwrap();
        assert_eq!(out, "x(dependencies: [a, d])\n");

        let (out, _) = add_to_dependency_lists("x(dependencies: [])\n", "d").unwrap();
        assert_eq!(out, "x(dependencies: [d])\n");
    }

    #[test]
    fn test_add_to_list_with_trailing_comment() {
        let input = "x(dependencies: [\n  a # keep\n])\n";
        let (out, _) = add_to_dependency_lists(input, "d").unwrap();
        assert_eq!(out, "x(dependencies: [\n  a, # keep\n  d,\n])\n");
    }

    #[test]
    fn test_insert_declaration_after_last_dependency() {
        let decl = "scene_scroll_dep = dependency('scene-scroll', required: true)";
        let (out, how) = insert_declaration(ROOT, "scene_scroll_dep", "scene-scroll", decl).unwrap();
        assert_eq!(how, Declaration::Inserted);

        let dep_pos = out.find(decl).unwrap();
        assert!(dep_pos > out.find("wayland_server = dependency").unwrap());
        assert!(dep_pos < out.find("subdir('sway')").unwrap());
        assert!(scan(&out).is_ok());

        let (again, how) = insert_declaration(&out, "scene_scroll_dep", "scene-scroll", decl).unwrap();
        assert_eq!(how, Declaration::AlreadyPresent);
        assert_eq!(again, out);
    }

    #[test]
    fn test_insert_declaration_replaces_internal_assignment() {
        let input = "project('sway', 'c')\nscene_scroll_dep = declare_dependency(\n  link_with: scene_lib,\n)\nsubdir('sway')\n";
        let decl = "scene_scroll_dep = dependency('scene-scroll')";
        let (out, how) = insert_declaration(input, "scene_scroll_dep", "scene-scroll", decl).unwrap();
        assert_eq!(how, Declaration::Replaced);
        assert_eq!(
            out,
            "project('sway', 'c')\nscene_scroll_dep = dependency('scene-scroll')\nsubdir('sway')\n"
        );
    }

    #[test]
    fn test_insert_declaration_after_project_when_no_dependencies() {
        let input = "project('a', 'c')\nsubdir('src')\n";
        let (out, _) = insert_declaration(input, "d", "lib", "d = dependency('lib')").unwrap();
        assert_eq!(out, "project('a', 'c')\n\nd = dependency('lib')\nsubdir('src')\n");
    }

    #[test]
    fn test_insert_declaration_requires_project() {
        assert!(insert_declaration("x = 1\n", "d", "lib", "d = dependency('lib')").is_err());
    }
}
