/*
 * reflect.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Runtime view of arbitrary values for the struct converter.
//!
//! Rust has no runtime reflection, so values describe themselves through
//! two object-safe traits:
//!
//! - [`Reflect`] classifies a value into a [`Shape`] (text, number, record,
//!   list, ...) and exposes its runtime type for converter lookup.
//! - [`Record`] lists a struct's fields in declaration order together with
//!   their annotations.
//!
//! Both are implemented for std and common third-party types here, and for
//! user structs by `#[derive(Variables)]`.

use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt::Display;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use indexmap::IndexMap;

use crate::error::ConversionError;
use crate::set::VariableSet;
use crate::variable::Variable;

/// What kind of value a [`Reflect`] implementor is.
pub enum Shape<'a> {
    /// Text of any origin (`String`, `&str`, `char`, paths, ...).
    Text(Cow<'a, str>),

    /// Signed integers.
    Int(i64),

    /// Unsigned integers.
    Uint(u64),

    /// Floating point numbers.
    Float(f64),

    Bool(bool),

    /// An optional or indirect value (`Option`, `Box`, `Rc`, `Arc`).
    /// `None` is the absent case.
    Pointer(Option<&'a dyn Reflect>),

    /// A struct whose fields can be walked.
    Record(&'a dyn Record),

    /// A sequence, in order.
    List(Vec<&'a dyn Reflect>),

    /// Keyed entries with keys already rendered to text.
    Map(Vec<(String, &'a dyn Reflect)>),

    /// Anything else, pre-rendered as text.
    Opaque(String),
}

impl Shape<'_> {
    /// The empty value of each kind: empty text, zero, `false`, absent,
    /// empty collections. Records are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Text(s) => s.is_empty(),
            Shape::Int(n) => *n == 0,
            Shape::Uint(n) => *n == 0,
            Shape::Float(n) => *n == 0.0,
            Shape::Bool(b) => !b,
            Shape::Pointer(inner) => inner.is_none(),
            Shape::Record(_) => false,
            Shape::List(items) => items.is_empty(),
            Shape::Map(entries) => entries.is_empty(),
            Shape::Opaque(s) => s.is_empty(),
        }
    }
}

/// A value the struct converter can walk.
pub trait Reflect: Any {
    /// Classify this value.
    fn shape(&self) -> Shape<'_>;

    /// Access to the concrete type, used for converter lookup and
    /// downcasting inside converters.
    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Self-describing conversion.
    ///
    /// Returning `Some` bypasses registered converters and field walking
    /// entirely. See [`ToVariable`].
    fn describe(&self) -> Option<Result<Variable, ConversionError>> {
        None
    }

    /// Whether this value offers the named capability. Capability-keyed
    /// registry entries consult this.
    fn implements(&self, capability: &str) -> bool {
        let _ = capability;
        false
    }

    /// Whether this value counts as empty for `omitempty`.
    fn is_zero(&self) -> bool {
        self.shape().is_empty()
    }
}

/// The field list of a struct.
pub trait Record {
    /// Fields in declaration order. Derived implementations leave out
    /// private fields and fields tagged `"-"`.
    fn fields(&self) -> Vec<Field<'_>>;
}

/// One struct field as seen by the converter.
pub struct Field<'a> {
    /// Declared name (`"0"`, `"1"`, ... for tuple structs).
    pub name: &'static str,

    /// Raw annotation, see [`crate::parse_tag`].
    pub tag: Option<&'static str>,

    /// Whether the field is visible outside its module (`pub`).
    pub exported: bool,

    pub value: &'a dyn Reflect,
}

/// A type that converts itself to a [`Variable`].
///
/// Pair with `#[variables(self_describing)]` on a derived type (or override
/// [`Reflect::describe`] by hand) to take precedence over every other
/// conversion mechanism.
pub trait ToVariable {
    fn to_variable(&self) -> Result<Variable, ConversionError>;
}

macro_rules! reflect_scalar {
    ($variant:ident as $repr:ty: $($ty:ty),*) => {
        $(
            impl Reflect for $ty {
                fn shape(&self) -> Shape<'_> {
                    Shape::$variant(*self as $repr)
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

reflect_scalar!(Int as i64: i8, i16, i32, i64, isize);
reflect_scalar!(Uint as u64: u8, u16, u32, u64, usize);
reflect_scalar!(Float as f64: f32, f64, i128, u128);

impl Reflect for bool {
    fn shape(&self) -> Shape<'_> {
        Shape::Bool(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for String {
    fn shape(&self) -> Shape<'_> {
        Shape::Text(Cow::Borrowed(self.as_str()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for &'static str {
    fn shape(&self) -> Shape<'_> {
        Shape::Text(Cow::Borrowed(*self))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for Cow<'static, str> {
    fn shape(&self) -> Shape<'_> {
        Shape::Text(Cow::Borrowed(&**self))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for char {
    fn shape(&self) -> Shape<'_> {
        Shape::Text(Cow::Owned(self.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for PathBuf {
    fn shape(&self) -> Shape<'_> {
        Shape::Text(self.to_string_lossy())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Pointer(self.as_ref().map(|v| v as &dyn Reflect))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

macro_rules! reflect_pointer {
    ($($ptr:ident),*) => {
        $(
            impl<T: Reflect> Reflect for $ptr<T> {
                fn shape(&self) -> Shape<'_> {
                    Shape::Pointer(Some(&**self as &dyn Reflect))
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

reflect_pointer!(Box, Rc, Arc);

fn list_of<'a, T: Reflect>(items: impl Iterator<Item = &'a T>) -> Shape<'a> {
    Shape::List(items.map(|v| v as &dyn Reflect).collect())
}

impl<T: Reflect> Reflect for Vec<T> {
    fn shape(&self) -> Shape<'_> {
        list_of(self.iter())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn shape(&self) -> Shape<'_> {
        list_of(self.iter())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn shape(&self) -> Shape<'_> {
        list_of(self.iter())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn shape(&self) -> Shape<'_> {
        list_of(self.iter())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn map_of<'a, K: Display + 'a, V: Reflect>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
) -> Vec<(String, &'a dyn Reflect)> {
    entries
        .map(|(k, v)| (k.to_string(), v as &dyn Reflect))
        .collect()
}

impl<K: Display + 'static, V: Reflect, S: 'static> Reflect for HashMap<K, V, S> {
    fn shape(&self) -> Shape<'_> {
        // Hash order is arbitrary; sort so conversion output is stable.
        let mut entries = map_of(self.iter());
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Shape::Map(entries)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<K: Display + 'static, V: Reflect> Reflect for BTreeMap<K, V> {
    fn shape(&self) -> Shape<'_> {
        Shape::Map(map_of(self.iter()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<K: Display + 'static, V: Reflect, S: 'static> Reflect for IndexMap<K, V, S> {
    fn shape(&self) -> Shape<'_> {
        Shape::Map(map_of(self.iter()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for Duration {
    fn shape(&self) -> Shape<'_> {
        Shape::Opaque(format!("{:?}", self))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_zero(&self) -> bool {
        Duration::is_zero(self)
    }
}

impl Reflect for SystemTime {
    fn shape(&self) -> Shape<'_> {
        Shape::Opaque(chrono::DateTime::<chrono::Utc>::from(*self).to_rfc3339())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<Tz> Reflect for chrono::DateTime<Tz>
where
    Tz: chrono::TimeZone + 'static,
    Tz::Offset: Display + 'static,
{
    fn shape(&self) -> Shape<'_> {
        Shape::Opaque(self.to_rfc3339())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

macro_rules! reflect_display {
    ($($ty:ty),*) => {
        $(
            impl Reflect for $ty {
                fn shape(&self) -> Shape<'_> {
                    Shape::Opaque(self.to_string())
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

reflect_display!(chrono::NaiveDate, chrono::NaiveTime, chrono::NaiveDateTime);

impl Reflect for chrono::TimeDelta {
    fn shape(&self) -> Shape<'_> {
        Shape::Opaque(self.to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_zero(&self) -> bool {
        chrono::TimeDelta::is_zero(self)
    }
}

impl Reflect for url::Url {
    fn shape(&self) -> Shape<'_> {
        Shape::Text(Cow::Borrowed(self.as_str()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for Variable {
    fn shape(&self) -> Shape<'_> {
        match self {
            Variable::String(s) => Shape::Text(Cow::Borrowed(s.as_str())),
            Variable::Number(n) => Shape::Float(*n),
            Variable::Bool(b) => Shape::Bool(*b),
            Variable::List(items) => list_of(items.iter()),
            Variable::Map(map) => Shape::Map(map_of(map.iter())),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self) -> Option<Result<Variable, ConversionError>> {
        Some(Ok(self.clone()))
    }
}

impl Reflect for VariableSet {
    fn shape(&self) -> Shape<'_> {
        Shape::Map(map_of(self.iter()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self) -> Option<Result<Variable, ConversionError>> {
        Some(Ok(self.clone().into_variable()))
    }
}
