//! Path recovery from indented overview reports.
//!
//! Two layouts are handled. The deep layout lists symbols under each file:
//!
//! ```text
//! src/   (3 files)
//!   main.rs
//!     [function] main
//!
//! components/
//!   button.ts
//!     [class   ] Button
//! ```
//!
//! The summary layout omits the symbol lines and may nest directories by
//! indentation instead of printing full relative headers. Both are read with
//! the same [`DepthStack`] walk.

use crate::dialect::SOURCE_EXTENSIONS;
use crate::types::PathSymbolRef;
use regex::Regex;
use std::sync::OnceLock;

/// Spaces per nesting level.
pub const INDENT_UNIT: usize = 2;

/// Conventional module roots, preferred over scan order in [`first_file`].
pub const ENTRYPOINT_SUFFIXES: [&str; 3] = ["/main.rs", "/lib.rs", "/mod.rs"];

fn directory_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)(\S.*?/)(?:\s*\(.+\))?\s*$").expect("directory line pattern")
    })
}

fn file_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"^(\s{{{INDENT_UNIT},}})(\S.*\.(?:{}))\s*$",
            SOURCE_EXTENSIONS.join("|")
        );
        Regex::new(&pattern).expect("file line pattern")
    })
}

fn symbol_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s{4}\[[^\]]+\]\s+(.+?)\s*$").expect("symbol line pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportLine<'a> {
    Directory { depth: usize, name: &'a str },
    File { indent: usize, name: &'a str },
    Symbol { name: &'a str },
    Other,
}

fn indent_width(s: &str) -> usize {
    s.chars().count()
}

fn classify(line: &str) -> ReportLine<'_> {
    if let Some(caps) = symbol_pattern().captures(line) {
        if let Some(name) = caps.get(1) {
            return ReportLine::Symbol {
                name: name.as_str(),
            };
        }
    }

    if let Some(caps) = directory_pattern().captures(line) {
        let indent = caps.get(1).map_or(0, |m| indent_width(m.as_str()));
        let raw = caps.get(2).map_or("", |m| m.as_str().trim());
        let name = raw.strip_suffix('/').unwrap_or(raw);
        if name.is_empty() {
            return ReportLine::Other;
        }
        return ReportLine::Directory {
            depth: indent / INDENT_UNIT,
            name,
        };
    }

    if let Some(caps) = file_pattern().captures(line) {
        let indent = caps.get(1).map_or(0, |m| indent_width(m.as_str()));
        if let Some(name) = caps.get(2) {
            return ReportLine::File {
                indent,
                name: name.as_str().trim(),
            };
        }
    }

    ReportLine::Other
}

/// Directory names indexed by nesting depth.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DepthStack {
    dirs: Vec<String>,
}

impl DepthStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry at or beyond `depth`, then pushes `name`.
    pub fn enter(&mut self, depth: usize, name: impl Into<String>) {
        self.dirs.truncate(depth);
        self.dirs.push(name.into());
    }

    /// The first `depth` entries joined with `/`.
    pub fn prefix(&self, depth: usize) -> String {
        self.dirs
            .iter()
            .take(depth)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn path_for(&self, depth: usize, file: &str) -> String {
        let prefix = self.prefix(depth);
        if prefix.is_empty() {
            file.to_string()
        } else {
            format!("{prefix}/{file}")
        }
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.dirs
    }
}

/// Deep layout: the first symbol listed under a top-level file line.
///
/// Selection is first-match in scan order; scanning stops there.
pub fn first_symbol(report: &str) -> Option<PathSymbolRef> {
    let mut stack = DepthStack::new();
    let mut current_file: Option<String> = None;

    for line in report.lines() {
        match classify(line) {
            ReportLine::Symbol { name } => {
                let Some(path) = current_file.as_deref() else {
                    continue;
                };
                if let Some(found) = PathSymbolRef::with_symbol(path, name) {
                    return Some(found);
                }
            }
            ReportLine::Directory { depth, name } => stack.enter(depth, name),
            ReportLine::File { indent, name } if indent == INDENT_UNIT => {
                current_file = Some(stack.path_for(1, name));
            }
            ReportLine::File { .. } | ReportLine::Other => {}
        }
    }

    None
}

/// Summary layout: every file line, rebuilt into a path in scan order.
pub fn file_candidates(report: &str) -> Vec<String> {
    let mut stack = DepthStack::new();
    let mut candidates = Vec::new();

    for line in report.lines() {
        match classify(line) {
            ReportLine::Directory { depth, name } => stack.enter(depth, name),
            ReportLine::File { indent, name } => {
                candidates.push(stack.path_for(indent / INDENT_UNIT, name));
            }
            ReportLine::Symbol { .. } | ReportLine::Other => {}
        }
    }

    candidates
}

/// Picks one candidate, preferring [`ENTRYPOINT_SUFFIXES`] in their listed order.
pub fn pick_candidate(candidates: &[String]) -> Option<&str> {
    for suffix in ENTRYPOINT_SUFFIXES {
        if let Some(hit) = candidates
            .iter()
            .find(|c| c.to_ascii_lowercase().ends_with(suffix))
        {
            return Some(hit.as_str());
        }
    }
    candidates.first().map(String::as_str)
}

pub fn first_file(report: &str) -> Option<String> {
    let candidates = file_candidates(report);
    let picked = pick_candidate(&candidates).map(str::to_string);
    log::debug!(
        "overview yielded {} file candidates, picked {:?}",
        candidates.len(),
        picked
    );
    picked
}

/// Re-roots a report-relative path under the requested target directory.
///
/// Reports echo the target's base name as their root line, so a leading
/// segment equal to that name is dropped before joining.
pub fn qualify_under_target(rel: &str, target_dir: &str) -> String {
    let target = target_dir.trim_end_matches('/');
    if target.is_empty() {
        return rel.to_string();
    }
    let root_name = target.rsplit('/').next().unwrap_or(target);
    let rel = rel
        .strip_prefix(root_name)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(rel);
    format!("{target}/{rel}").replace("//", "/")
}
