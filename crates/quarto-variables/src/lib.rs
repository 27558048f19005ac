/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Dynamic template variables for Quarto.
//!
//! This crate provides:
//! - [`Variable`]: a tree of strings, numbers, booleans, lists and maps
//! - [`VariableSet`]: a named root addressed by paths such as
//!   `author.name` or `tags[0]`, flattened into the `path -> string` map
//!   consumed by template substitution
//! - [`StructConverter`]: builds a [`VariableSet`] from any struct deriving
//!   [`Variables`], honoring field annotations (rename, skip, omitempty,
//!   flatten, inline)
//! - [`ConverterRegistry`]: per-type converters, with built-ins for
//!   timestamps, durations and URLs
//!
//! # Example
//!
//! ```
//! use quarto_variables::{Variable, VariableSet};
//!
//! let mut vars = VariableSet::new();
//! vars.set("author.name", Variable::from("Ann")).unwrap();
//! vars.insert("tags", Variable::from(["a", "b"]));
//!
//! assert_eq!(vars.get_string("tags[1]").as_deref(), Some("b"));
//!
//! let flat = vars.flatten();
//! assert_eq!(flat["author.name"], "Ann");
//! assert_eq!(flat["tags[0]"], "a");
//! ```

// Lets derived code name this crate by path from inside its own tests.
extern crate self as quarto_variables;

mod builtin;
pub mod convert;
pub mod error;
pub mod flatten;
pub mod options;
pub mod path;
pub mod reflect;
pub mod registry;
mod serialize;
pub mod set;
pub mod tag;
pub mod variable;

pub use convert::StructConverter;
pub use error::{ConversionError, Result, VariableError};
pub use flatten::flatten_variable;
pub use options::{ConverterOptions, DurationFormat, TimestampFormat};
pub use path::{PathSegment, parse_path, parse_segments};
pub use reflect::{Field, Record, Reflect, Shape, ToVariable};
pub use registry::{Capability, Converter, ConverterRegistry, TypeDescriptor};
pub use set::{VALUE_KEY, VariableSet};
pub use tag::{FieldTag, parse_tag};
pub use variable::{Variable, VariableKind, VariableMap};

pub use quarto_variables_derive::Variables;
