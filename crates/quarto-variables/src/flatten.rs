/*
 * flatten.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Flattening of variable trees into `path -> string` maps.
//!
//! The keys use path-expression syntax (`a.b`, `a[0]`, `a[0].b`) so every
//! flattened key can be fed back into [`VariableSet::get`](crate::VariableSet::get).
//! Entries appear in depth-first order following map insertion order and
//! list order, which makes the output deterministic.

use indexmap::IndexMap;

use crate::path::{join_index, join_key};
use crate::variable::Variable;

/// Flatten `value` with every key prefixed by `prefix`.
///
/// With an empty prefix a scalar `value` produces no entry: unnamed leaves
/// are never emitted.
pub fn flatten_variable(prefix: &str, value: &Variable) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    flatten_into(prefix, value, &mut out);
    out
}

/// Walk `value` depth-first and append one entry per scalar leaf to `out`.
///
/// Uses an explicit stack so deep trees do not exhaust the call stack.
pub(crate) fn flatten_into(prefix: &str, value: &Variable, out: &mut IndexMap<String, String>) {
    let mut stack: Vec<(String, &Variable)> = vec![(prefix.to_string(), value)];

    while let Some((prefix, node)) = stack.pop() {
        match node {
            Variable::Map(map) => {
                // Reverse so the first key is popped first.
                for (key, child) in map.iter().rev() {
                    stack.push((join_key(&prefix, key), child));
                }
            }
            Variable::List(items) => {
                for (i, child) in items.iter().enumerate().rev() {
                    stack.push((join_index(&prefix, i), child));
                }
            }
            scalar => {
                if !prefix.is_empty() {
                    out.insert(prefix, scalar.to_canonical_string());
                }
            }
        }
    }
}
