/*
 * path.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Dotted/bracketed path expressions.
//!
//! A path such as `a.b[2].c[0]` addresses a node inside a variable tree.
//! [`parse_path`] splits it into dot-separated tokens, keeping bracket
//! suffixes attached (`["a", "b[2]", "c[0]"]`). [`parse_segments`] goes one
//! step further and resolves each token into the hops it stands for:
//! `b[2]` is a map lookup of `b` followed by a list lookup of index 2.

use std::fmt;

use crate::error::{Result, VariableError};

/// Split a path on `.` outside of brackets.
///
/// Empty tokens (leading, trailing or doubled dots) are dropped, so
/// `"a..b"` parses the same as `"a.b"`. An empty input yields no tokens.
pub fn parse_path(path: &str) -> Vec<String> {
    split_tokens(path).into_iter().map(String::from).collect()
}

/// One hop through a variable tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// Descend into a map by key. Lists also accept a key made of digits.
    Key(&'a str),
    /// Descend into a list by position (the `[i]` suffix).
    Index(usize),
}

impl fmt::Display for PathSegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

impl<'a> PathSegment<'a> {
    /// The list position this segment designates, if any.
    ///
    /// `Index(i)` always does; a `Key` does when it is a bare non-negative
    /// integer such as `"0"`.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(index) => Some(*index),
            PathSegment::Key(key) => parse_index(key),
        }
    }
}

/// Resolve a path into its hops.
///
/// `tags[0]` becomes `[Key("tags"), Index(0)]`, `m[0][1]` becomes
/// `[Key("m"), Index(0), Index(1)]` and a leading `[0]` is a bare index.
/// Unbalanced brackets and non-numeric or negative indices are
/// [`VariableError::Path`] errors.
pub fn parse_segments(path: &str) -> Result<Vec<PathSegment<'_>>> {
    let mut segments = Vec::new();
    for token in split_tokens(path) {
        let (key, mut rest) = match token.find('[') {
            Some(open) => token.split_at(open),
            None => (token, ""),
        };
        if key.contains(']') {
            return Err(VariableError::path(path, format!("unbalanced ']' in '{}'", token)));
        }
        if !key.is_empty() {
            segments.push(PathSegment::Key(key));
        }
        while !rest.is_empty() {
            let Some(close) = rest.find(']') else {
                return Err(VariableError::path(path, format!("unclosed '[' in '{}'", token)));
            };
            let inner = &rest[1..close];
            let index = parse_index(inner).ok_or_else(|| {
                VariableError::path(path, format!("invalid list index '{}'", inner))
            })?;
            segments.push(PathSegment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(VariableError::path(
                    path,
                    format!("unexpected '{}' after index in '{}'", rest, token),
                ));
            }
        }
    }
    Ok(segments)
}

fn split_tokens(path: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_brackets = false;
    for (i, c) in path.char_indices() {
        match c {
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            '.' if !in_brackets => {
                if i > start {
                    tokens.push(&path[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if path.len() > start {
        tokens.push(&path[start..]);
    }
    tokens
}

fn parse_index(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Extend a flattened key with a map key: `a` + `b` is `a.b`.
pub(crate) fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Extend a flattened key with a list index: `a` + `0` is `a[0]`.
pub(crate) fn join_index(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}
