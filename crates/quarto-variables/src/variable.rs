/*
 * variable.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The dynamic variable value model.
//!
//! A [`Variable`] is one node of a tree of template data: a string, number
//! or boolean leaf, an ordered list, or a keyed map. Nodes are addressed with
//! path expressions (see [`crate::path`]) and rendered to text with
//! [`Variable::to_canonical_string`].

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Result, VariableError};
use crate::path::{PathSegment, join_index, join_key, parse_segments};

/// Map children of a [`Variable::Map`], kept in insertion order.
pub type VariableMap = IndexMap<String, Variable>;

/// The kind of a [`Variable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    String,
    Number,
    Bool,
    List,
    Map,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::String => "string",
            VariableKind::Number => "number",
            VariableKind::Bool => "bool",
            VariableKind::List => "list",
            VariableKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// A node in a dynamic variable tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    /// A string leaf.
    String(String),

    /// A numeric leaf. Integers are widened to `f64`.
    Number(f64),

    /// A boolean leaf.
    Bool(bool),

    /// An ordered list of values. Duplicates are allowed.
    List(Vec<Variable>),

    /// A map of unique string keys to values.
    Map(VariableMap),
}

impl Default for Variable {
    fn default() -> Self {
        Variable::String(String::new())
    }
}

impl Variable {
    /// An empty map node.
    pub fn map() -> Self {
        Variable::Map(VariableMap::new())
    }

    /// An empty list node.
    pub fn list() -> Self {
        Variable::List(Vec::new())
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Variable::String(_) => VariableKind::String,
            Variable::Number(_) => VariableKind::Number,
            Variable::Bool(_) => VariableKind::Bool,
            Variable::List(_) => VariableKind::List,
            Variable::Map(_) => VariableKind::Map,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Variable::List(_) | Variable::Map(_))
    }

    /// True for the empty value of each kind: `""`, `0`, `false`, `[]`, `{}`.
    pub fn is_empty(&self) -> bool {
        match self {
            Variable::String(s) => s.is_empty(),
            Variable::Number(n) => *n == 0.0,
            Variable::Bool(b) => !b,
            Variable::List(items) => items.is_empty(),
            Variable::Map(map) => map.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variable::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variable::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variable::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Variable]> {
        match self {
            Variable::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Variable>> {
        match self {
            Variable::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&VariableMap> {
        match self {
            Variable::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut VariableMap> {
        match self {
            Variable::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a node by path.
    ///
    /// The empty path returns `self`. Malformed paths, missing keys,
    /// out-of-range indices and bracket suffixes on non-list nodes all
    /// yield `None`.
    ///
    /// At every map, a key that literally spells several segments (such as
    /// `"user.name"`, written by flatten placement) is matched before the
    /// segments are resolved one by one; the longest such key wins.
    pub fn get(&self, path: &str) -> Option<&Variable> {
        let segments = parse_segments(path).ok()?;
        self.get_segments(&segments)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Variable> {
        let segments = parse_segments(path).ok()?;
        self.get_segments_mut(&segments)
    }

    /// Look up a node by pre-parsed segments.
    pub fn get_segments(&self, segments: &[PathSegment<'_>]) -> Option<&Variable> {
        let mut node = self;
        let mut rest = segments;
        while let Some(first) = rest.first() {
            node = match node {
                Variable::Map(map) => {
                    let (consumed, index) = longest_key(map, rest)?;
                    rest = &rest[consumed..];
                    &map[index]
                }
                Variable::List(items) => {
                    rest = &rest[1..];
                    items.get(first.as_index()?)?
                }
                _ => return None,
            };
        }
        Some(node)
    }

    pub fn get_segments_mut(&mut self, segments: &[PathSegment<'_>]) -> Option<&mut Variable> {
        let mut node = self;
        let mut rest = segments;
        while let Some(first) = rest.first() {
            node = match node {
                Variable::Map(map) => {
                    let (consumed, index) = longest_key(map, rest)?;
                    rest = &rest[consumed..];
                    &mut map[index]
                }
                Variable::List(items) => {
                    rest = &rest[1..];
                    items.get_mut(first.as_index()?)?
                }
                _ => return None,
            };
        }
        Some(node)
    }

    /// Store `value` at `path`.
    ///
    /// - The empty path replaces this node; `value` must be of the same kind.
    /// - Existing keys are resolved as in [`Variable::get`], so a literal
    ///   dotted key is overwritten in place.
    /// - Missing map keys along the way are created as empty maps. Lists are
    ///   never created implicitly, so a list index below a missing key is an
    ///   error and nothing is created.
    /// - List positions must already exist.
    /// - Scalars cannot be descended into.
    pub fn set(&mut self, path: &str, value: Variable) -> Result<()> {
        let segments = parse_segments(path)?;
        self.set_segments(path, &segments, value)
    }

    pub(crate) fn set_segments(
        &mut self,
        path: &str,
        segments: &[PathSegment<'_>],
        value: Variable,
    ) -> Result<()> {
        if segments.is_empty() {
            return self.replace(path, value);
        }

        let mut node = self;
        let mut rest = segments;
        loop {
            node = match node {
                Variable::Map(map) => {
                    if let Some((consumed, index)) = longest_key(map, rest) {
                        rest = &rest[consumed..];
                        if rest.is_empty() {
                            map[index] = value;
                            return Ok(());
                        }
                        &mut map[index]
                    } else {
                        let PathSegment::Key(key) = rest[0] else {
                            return Err(VariableError::path(
                                path,
                                format!("cannot index a map with {}", rest[0]),
                            ));
                        };
                        if rest.len() == 1 {
                            map.insert(key.to_string(), value);
                            return Ok(());
                        }
                        // Everything below a missing key is created as maps, so
                        // reject the path before inserting anything.
                        if rest[1..].iter().any(|s| matches!(s, PathSegment::Index(_))) {
                            return Err(VariableError::path(
                                path,
                                format!("'{}' does not exist; lists are not created implicitly", key),
                            ));
                        }
                        rest = &rest[1..];
                        map.entry(key.to_string()).or_insert_with(Variable::map)
                    }
                }
                Variable::List(items) => {
                    let slot = list_slot(path, items, &rest[0])?;
                    rest = &rest[1..];
                    if rest.is_empty() {
                        *slot = value;
                        return Ok(());
                    }
                    slot
                }
                other => {
                    return Err(VariableError::path(
                        path,
                        format!("cannot descend into {} at '{}'", other.kind(), rest[0]),
                    ));
                }
            };
        }
    }

    /// Replace this node wholesale, refusing to change its kind.
    fn replace(&mut self, path: &str, value: Variable) -> Result<()> {
        if self.kind() != value.kind() {
            return Err(VariableError::TypeMismatch {
                path: path.to_string(),
                expected: self.kind(),
                found: value.kind(),
            });
        }
        *self = value;
        Ok(())
    }

    /// Remove and return the node at `path`. List elements after a removed
    /// one shift down.
    pub fn remove(&mut self, path: &str) -> Option<Variable> {
        let segments = parse_segments(path).ok()?;
        let mut node = self;
        let mut rest = segments.as_slice();
        loop {
            node = match node {
                Variable::Map(map) => {
                    let (consumed, index) = longest_key(map, rest)?;
                    rest = &rest[consumed..];
                    if rest.is_empty() {
                        return map.shift_remove_index(index).map(|(_, removed)| removed);
                    }
                    &mut map[index]
                }
                Variable::List(items) => {
                    let index = rest.first()?.as_index()?;
                    if index >= items.len() {
                        return None;
                    }
                    rest = &rest[1..];
                    if rest.is_empty() {
                        return Some(items.remove(index));
                    }
                    &mut items[index]
                }
                _ => return None,
            };
        }
    }

    /// Render this value as text.
    ///
    /// - String: verbatim
    /// - Number: shortest decimal form, never exponential (`3`, `0.25`)
    /// - Bool: `"true"` / `"false"`
    /// - List, Map: compact JSON
    pub fn to_canonical_string(&self) -> String {
        match self {
            Variable::String(s) => s.clone(),
            Variable::Number(n) => format_number(*n),
            Variable::Bool(b) => b.to_string(),
            Variable::List(_) | Variable::Map(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

/// Resolve `segments` starting at a bare map, as [`Variable::get_segments`]
/// does below a map node.
pub(crate) fn get_in_map<'v>(
    map: &'v VariableMap,
    segments: &[PathSegment<'_>],
) -> Option<&'v Variable> {
    let (consumed, index) = longest_key(map, segments)?;
    map[index].get_segments(&segments[consumed..])
}

pub(crate) fn get_in_map_mut<'v>(
    map: &'v mut VariableMap,
    segments: &[PathSegment<'_>],
) -> Option<&'v mut Variable> {
    let (consumed, index) = longest_key(map, segments)?;
    map[index].get_segments_mut(&segments[consumed..])
}

/// Find the entry of `map` named by the longest run of leading `segments`,
/// joined the way flattened keys are (`a.b`, `a[0]`). Returns how many
/// segments the key spells and the entry's position.
fn longest_key(map: &VariableMap, segments: &[PathSegment<'_>]) -> Option<(usize, usize)> {
    let mut keys = Vec::with_capacity(segments.len());
    let mut key = String::new();
    for segment in segments {
        key = match segment {
            PathSegment::Key(name) => join_key(&key, name),
            PathSegment::Index(index) => join_index(&key, *index),
        };
        keys.push(key.clone());
    }
    keys.iter()
        .enumerate()
        .rev()
        .find_map(|(i, key)| map.get_index_of(key.as_str()).map(|index| (i + 1, index)))
}

fn list_slot<'v>(
    path: &str,
    items: &'v mut [Variable],
    segment: &PathSegment<'_>,
) -> Result<&'v mut Variable> {
    let len = items.len();
    let index = segment
        .as_index()
        .ok_or_else(|| VariableError::path(path, format!("'{}' is not a list index", segment)))?;
    items.get_mut(index).ok_or_else(|| {
        VariableError::path(
            path,
            format!("index {} out of range for list of length {}", index, len),
        )
    })
}

/// Format a number the way it is substituted into templates.
pub(crate) fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Avoids rendering negative zero as "-0".
        return "0".to_string();
    }
    n.to_string()
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Variable::String(value.to_string())
    }
}

impl From<String> for Variable {
    fn from(value: String) -> Self {
        Variable::String(value)
    }
}

impl From<bool> for Variable {
    fn from(value: bool) -> Self {
        Variable::Bool(value)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Variable {
                fn from(value: $ty) -> Self {
                    Variable::Number(value as f64)
                }
            }
        )*
    };
}

number_from!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl From<Vec<Variable>> for Variable {
    fn from(value: Vec<Variable>) -> Self {
        Variable::List(value)
    }
}

impl<V: Into<Variable>, const N: usize> From<[V; N]> for Variable {
    fn from(value: [V; N]) -> Self {
        value.into_iter().collect()
    }
}

impl From<VariableMap> for Variable {
    fn from(value: VariableMap) -> Self {
        Variable::Map(value)
    }
}

impl<V: Into<Variable>> FromIterator<V> for Variable {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Variable::List(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Variable {
        let mut user = VariableMap::new();
        user.insert("name".to_string(), Variable::from("Ann"));
        user.insert("age".to_string(), Variable::from(3));
        user.insert("tags".to_string(), Variable::from(["a", "b"]));

        let mut root = VariableMap::new();
        root.insert("user".to_string(), Variable::Map(user));
        root.insert("ok".to_string(), Variable::Bool(true));
        Variable::Map(root)
    }

    #[test]
    fn test_kind() {
        assert_eq!(Variable::from("x").kind(), VariableKind::String);
        assert_eq!(Variable::from(1.5).kind(), VariableKind::Number);
        assert_eq!(Variable::from(false).kind(), VariableKind::Bool);
        assert_eq!(Variable::list().kind(), VariableKind::List);
        assert_eq!(Variable::map().kind(), VariableKind::Map);
    }

    #[test]
    fn test_get_path() {
        let value = sample();
        assert_eq!(value.get(""), Some(&value));
        assert_eq!(value.get("user.name"), Some(&Variable::from("Ann")));
        assert_eq!(value.get("user.tags[1]"), Some(&Variable::from("b")));
        assert_eq!(value.get("user.tags.0"), Some(&Variable::from("a")));
        assert_eq!(value.get("user.tags[2]"), None);
        assert_eq!(value.get("user.missing"), None);
    }

    #[test]
    fn test_get_bracket_on_non_list_is_not_found() {
        let value = sample();
        assert_eq!(value.get("user.name[0]"), None);
        assert_eq!(value.get("user[0]"), None);
        assert_eq!(value.get("ok.x"), None);
        assert_eq!(value.get("user.tags[x]"), None);
    }

    #[test]
    fn test_longest_literal_key_wins() {
        let mut map = VariableMap::new();
        map.insert("a".to_string(), Variable::from(1));
        map.insert("a.b".to_string(), Variable::from(2));
        let mut nested = VariableMap::new();
        nested.insert("c".to_string(), Variable::from(3));
        map.insert("a.b2".to_string(), Variable::Map(nested));
        let mut value = Variable::Map(map);

        assert_eq!(value.get("a.b"), Some(&Variable::from(2)));
        assert_eq!(value.get("a.b2.c"), Some(&Variable::from(3)));
        assert_eq!(value.get("a.x"), None);

        value.set("a.b2.c", Variable::from(4)).unwrap();
        assert_eq!(value.get("a.b2.c"), Some(&Variable::from(4)));
        assert_eq!(value.remove("a.b"), Some(Variable::from(2)));
        assert_eq!(value.get("a.b"), None);
    }

    #[test]
    fn test_scalar_get_only_empty_path() {
        let value = Variable::from("x");
        assert_eq!(value.get(""), Some(&value));
        assert_eq!(value.get("a"), None);
    }

    #[test]
    fn test_set_creates_intermediate_maps() {
        let mut value = Variable::map();
        value.set("a.b.c", Variable::from(1)).unwrap();
        assert_eq!(value.get("a.b.c"), Some(&Variable::from(1)));
        assert_eq!(value.get("a.b").map(Variable::kind), Some(VariableKind::Map));
    }

    #[test]
    fn test_set_overwrites_key() {
        let mut value = sample();
        value.set("user.name", Variable::from("Bob")).unwrap();
        assert_eq!(value.get("user.name"), Some(&Variable::from("Bob")));
        value.set("user", Variable::from(7)).unwrap();
        assert_eq!(value.get("user"), Some(&Variable::from(7)));
    }

    #[test]
    fn test_set_list_element() {
        let mut value = sample();
        value.set("user.tags[0]", Variable::from("z")).unwrap();
        assert_eq!(
            value.get("user.tags"),
            Some(&Variable::from(["z", "b"]))
        );
    }

    #[test]
    fn test_set_list_out_of_range_is_error() {
        let mut value = sample();
        let err = value.set("user.tags[2]", Variable::from("c")).unwrap_err();
        assert!(matches!(err, VariableError::Path { .. }));
        assert_eq!(value.get("user.tags").and_then(Variable::as_list).map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_set_bracket_on_missing_key_is_error() {
        let mut value = Variable::map();
        let err = value.set("tags[0]", Variable::from("a")).unwrap_err();
        assert!(matches!(err, VariableError::Path { .. }));
        assert_eq!(value, Variable::map());
    }

    #[test]
    fn test_set_index_below_missing_key_creates_nothing() {
        let mut value = Variable::map();
        assert!(value.set("a.b[0].c", Variable::from(1)).is_err());
        assert_eq!(value, Variable::map());
    }

    #[test]
    fn test_set_through_scalar_is_error() {
        let mut value = sample();
        let err = value.set("ok.deeper", Variable::from(1)).unwrap_err();
        assert!(matches!(err, VariableError::Path { .. }));
        let err = value.set("user.name.first", Variable::from(1)).unwrap_err();
        assert!(matches!(err, VariableError::Path { .. }));
    }

    #[test]
    fn test_set_empty_path_replaces_same_kind() {
        let mut value = Variable::map();
        value.set("", sample()).unwrap();
        assert_eq!(value, sample());

        let mut list = Variable::from([1, 2]);
        list.set("", Variable::from([3])).unwrap();
        assert_eq!(list, Variable::from([3]));
    }

    #[test]
    fn test_set_empty_path_kind_mismatch() {
        let mut value = Variable::map();
        let err = value.set("", Variable::list()).unwrap_err();
        match err {
            VariableError::TypeMismatch { expected, found, .. } => {
                assert_eq!(expected, VariableKind::Map);
                assert_eq!(found, VariableKind::List);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_set_on_list_root() {
        let mut value = Variable::from([Variable::map(), Variable::map()]);
        value.set("1.name", Variable::from("x")).unwrap();
        assert_eq!(value.get("[1].name"), Some(&Variable::from("x")));
        assert!(value.set("5", Variable::from("x")).is_err());
        assert!(value.set("name", Variable::from("x")).is_err());
    }

    #[test]
    fn test_remove() {
        let mut value = sample();
        assert_eq!(value.remove("user.tags[0]"), Some(Variable::from("a")));
        assert_eq!(value.get("user.tags"), Some(&Variable::from(["b"])));
        assert_eq!(value.remove("user.name"), Some(Variable::from("Ann")));
        assert_eq!(value.remove("user.name"), None);
        assert_eq!(value.remove(""), None);
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(Variable::from("hi").to_canonical_string(), "hi");
        assert_eq!(Variable::from(3).to_canonical_string(), "3");
        assert_eq!(Variable::from(0.25).to_canonical_string(), "0.25");
        assert_eq!(Variable::from(-0.0).to_canonical_string(), "0");
        assert_eq!(Variable::from(1e21).to_canonical_string(), "1000000000000000000000");
        assert_eq!(Variable::from(true).to_canonical_string(), "true");
        assert_eq!(Variable::from(false).to_canonical_string(), "false");
        assert_eq!(Variable::from([1, 2]).to_canonical_string(), "[1,2]");
    }

    #[test]
    fn test_is_empty() {
        assert!(Variable::from("").is_empty());
        assert!(Variable::from(0).is_empty());
        assert!(Variable::from(false).is_empty());
        assert!(Variable::list().is_empty());
        assert!(Variable::map().is_empty());
        assert!(!Variable::from("x").is_empty());
        assert!(!sample().is_empty());
    }
}
