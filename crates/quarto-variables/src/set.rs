/*
 * set.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The named root collection of variables.

use indexmap::IndexMap;

use crate::error::Result;
use crate::flatten::flatten_into;
use crate::path::parse_segments;
use crate::variable::{Variable, VariableMap, get_in_map, get_in_map_mut};

/// Key under which a non-map value is stored when it becomes a whole set.
pub const VALUE_KEY: &str = "value";

/// A set of named top-level variables.
///
/// This is the root of a variable tree: a map whose entries are addressed by
/// path (`user.name`, `tags[0]`) and which can be flattened into the
/// single-level `path -> string` view consumed by templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    variables: VariableMap,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a single variable.
    ///
    /// A map contributes its entries as the top-level variables; any other
    /// value is stored under [`VALUE_KEY`].
    pub fn from_variable(value: Variable) -> Self {
        match value {
            Variable::Map(variables) => Self { variables },
            other => {
                let mut variables = VariableMap::new();
                variables.insert(VALUE_KEY.to_string(), other);
                Self { variables }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }

    /// Insert a top-level variable, returning the one it replaced.
    ///
    /// `name` is taken literally; it is not parsed as a path.
    pub fn insert(&mut self, name: impl Into<String>, value: Variable) -> Option<Variable> {
        self.variables.insert(name.into(), value)
    }

    /// Remove a top-level variable by name.
    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.variables.shift_remove(name)
    }

    /// Look up a variable by path.
    ///
    /// The first path segment names the top-level variable; the rest is
    /// resolved inside it. Keys that literally spell several segments (as
    /// written by flatten placement, e.g. `"user.name"`) are matched before
    /// segment-by-segment resolution, at the top level and below it.
    pub fn get(&self, path: &str) -> Option<&Variable> {
        let segments = parse_segments(path).ok()?;
        get_in_map(&self.variables, &segments)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Variable> {
        let segments = parse_segments(path).ok()?;
        get_in_map_mut(&mut self.variables, &segments)
    }

    /// Store `value` at `path`, creating the top-level variable and any
    /// intermediate maps that do not exist yet. An existing entry is found
    /// the same way [`VariableSet::get`] finds it and replaced in place.
    pub fn set(&mut self, path: &str, value: Variable) -> Result<()> {
        let segments = parse_segments(path)?;
        let mut root = Variable::Map(std::mem::take(&mut self.variables));
        let result = root.set_segments(path, &segments, value);
        if let Variable::Map(variables) = root {
            self.variables = variables;
        }
        result
    }

    /// Look up a variable by path and render it as text.
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).map(Variable::to_canonical_string)
    }

    /// Store a string at `path`.
    pub fn set_string(&mut self, path: &str, value: impl Into<String>) -> Result<()> {
        self.set(path, Variable::String(value.into()))
    }

    /// Remove the node at `path`.
    pub fn remove_by_path(&mut self, path: &str) -> Option<Variable> {
        let mut root = Variable::Map(std::mem::take(&mut self.variables));
        let removed = root.remove(path);
        if let Variable::Map(variables) = root {
            self.variables = variables;
        }
        removed
    }

    /// Copy every top-level variable of `other` into this set, replacing
    /// variables with the same name.
    pub fn merge(&mut self, other: VariableSet) {
        self.variables.extend(other.variables);
    }

    /// Flatten into a single-level map from path to rendered value.
    ///
    /// Every scalar leaf produces one entry keyed by its full path
    /// (`user.name`, `tags[0]`); maps and lists never appear directly.
    pub fn flatten(&self) -> IndexMap<String, String> {
        let mut out = IndexMap::new();
        for (name, value) in &self.variables {
            flatten_into(name, value, &mut out);
        }
        out
    }

    pub fn as_map(&self) -> &VariableMap {
        &self.variables
    }

    pub fn into_variable(self) -> Variable {
        Variable::Map(self.variables)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }
}

impl From<VariableMap> for VariableSet {
    fn from(variables: VariableMap) -> Self {
        Self { variables }
    }
}

impl<K: Into<String>> FromIterator<(K, Variable)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (K, Variable)>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for VariableSet {
    type Item = (String, Variable);
    type IntoIter = indexmap::map::IntoIter<String, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.into_iter()
    }
}
