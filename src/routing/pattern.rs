//! Path pattern compilation.
//!
//! # Responsibilities
//! - Turn a declared path like `/users/{id}` into an anchored matcher
//! - Record placeholder names in declaration order
//! - Reject malformed patterns (unbalanced or empty braces)
//!
//! # Design Decisions
//! - One placeholder captures exactly one path component (`[^/]+`)
//! - Literal text around placeholders is regex-escaped
//! - Placeholders may share a segment with literals (`/files/{name}.json`)

use regex::Regex;
use thiserror::Error;

/// Errors raised while compiling a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A `{` was opened inside another placeholder.
    #[error("nested '{{' at byte {0}")]
    NestedBrace(usize),

    /// A `}` appeared without a matching `{`.
    #[error("unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),

    /// A `{` was never closed.
    #[error("unclosed '{{' starting at byte {0}")]
    Unclosed(usize),

    /// `{}` with no name.
    #[error("empty placeholder at byte {0}")]
    EmptyName(usize),

    /// The generated expression failed to compile.
    #[error("invalid pattern: {0}")]
    Regex(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    param_names: Vec<String>,
    literal_segments: usize,
    literal_len: usize,
}

impl PathPattern {
    /// Compile a declared path into a matcher.
    pub fn compile(path: &str) -> Result<Self, PatternError> {
        let mut expr = String::with_capacity(path.len() + 8);
        expr.push('^');
        let mut param_names = Vec::new();
        let mut literal = String::new();
        let mut open: Option<usize> = None;

        for (idx, ch) in path.char_indices() {
            match (ch, open) {
                ('{', Some(_)) => return Err(PatternError::NestedBrace(idx)),
                ('{', None) => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    open = Some(idx);
                }
                ('}', None) => return Err(PatternError::UnmatchedClose(idx)),
                ('}', Some(start)) => {
                    let name = &path[start + 1..idx];
                    if name.is_empty() {
                        return Err(PatternError::EmptyName(start));
                    }
                    param_names.push(name.to_string());
                    expr.push_str("([^/]+)");
                    open = None;
                }
                (_, Some(_)) => {}
                (c, None) => literal.push(c),
            }
        }

        if let Some(start) = open {
            return Err(PatternError::Unclosed(start));
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| PatternError::Regex(e.to_string()))?;

        let literal_segments = path
            .split('/')
            .filter(|s| !s.is_empty() && !s.contains('{'))
            .count();
        let literal_len = path
            .split('/')
            .filter(|s| !s.contains('{'))
            .map(str::len)
            .sum();

        Ok(Self {
            regex,
            param_names,
            literal_segments,
            literal_len,
        })
    }

    /// Ordered placeholder names.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// True if the pattern has at least one placeholder.
    pub fn is_dynamic(&self) -> bool {
        !self.param_names.is_empty()
    }

    /// Returns true if the concrete path matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match a concrete path and return `(name, value)` pairs in declaration order.
    ///
    /// Values are percent-decoded after matching, so an encoded `/` never splits a segment.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        let pairs = self
            .param_names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                caps.get(i + 1)
                    .map(|m| (name.clone(), decode_segment(m.as_str())))
            })
            .collect();
        Some(pairs)
    }

    /// Ranking used when several patterns accept the same path.
    /// Higher is more specific: literal segments first, then literal characters.
    pub fn specificity(&self) -> (usize, usize) {
        (self.literal_segments, self.literal_len)
    }
}

/// Best-effort placeholder names, usable even when compilation fails.
pub fn placeholder_names(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find(['{', '}']) {
            Some(end) if after.as_bytes()[end] == b'}' => {
                if end > 0 {
                    names.push(after[..end].to_string());
                }
                rest = &after[end + 1..];
            }
            Some(end) => rest = &after[end..],
            None => break,
        }
    }
    names
}

/// Normalize a declared or requested path: leading slash, no trailing slash (except root).
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let mut out = String::with_capacity(trimmed.len() + 1);
    if !trimmed.starts_with('/') {
        out.push('/');
    }
    out.push_str(trimmed);
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Percent-decode one captured segment; invalid UTF-8 keeps the raw text.
fn decode_segment(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}
