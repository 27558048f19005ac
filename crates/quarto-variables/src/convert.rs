/*
 * convert.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Struct-to-variable conversion.
//!
//! [`StructConverter`] turns any [`Reflect`] value into a [`VariableSet`].
//! For every value it tries, in order:
//!
//! 1. the value's own [`Reflect::describe`] (self-describing types),
//! 2. a converter from the [`ConverterRegistry`],
//! 3. the value's [`Shape`], walking records field by field.
//!
//! Field annotations (see [`crate::parse_tag`]) control naming, omission and
//! placement of each field in the enclosing map.

use std::sync::Arc;

use crate::error::{Result, VariableError};
use crate::options::ConverterOptions;
use crate::path::{join_index, join_key};
use crate::reflect::{Record, Reflect, Shape};
use crate::registry::ConverterRegistry;
use crate::set::{VALUE_KEY, VariableSet};
use crate::tag::parse_tag;
use crate::variable::{Variable, VariableMap};

/// Converts records into variable sets.
///
/// # Example
///
/// ```
/// use quarto_variables::{StructConverter, Variables};
///
/// #[derive(Variables)]
/// pub struct Author {
///     pub name: String,
///     #[variable("orcid,omitempty")]
///     pub orcid: Option<String>,
/// }
///
/// let converter = StructConverter::new();
/// let vars = converter
///     .convert(&Author { name: "Ann".to_string(), orcid: None })
///     .unwrap();
/// assert_eq!(vars.get_string("name").as_deref(), Some("Ann"));
/// assert!(!vars.contains("orcid"));
/// ```
#[derive(Debug, Clone)]
pub struct StructConverter {
    registry: Arc<ConverterRegistry>,
    options: ConverterOptions,
}

impl Default for StructConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl StructConverter {
    /// A converter with default options and the built-in converters.
    pub fn new() -> Self {
        Self::with_options(ConverterOptions::default())
    }

    /// A converter with its own registry of built-ins configured by
    /// `options`.
    pub fn with_options(options: ConverterOptions) -> Self {
        let registry = Arc::new(ConverterRegistry::with_builtins(&options));
        Self { registry, options }
    }

    /// A converter sharing an existing registry.
    pub fn with_registry(registry: Arc<ConverterRegistry>, options: ConverterOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &Arc<ConverterRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Convert a top-level value.
    ///
    /// A map result becomes the set's top-level entries; any other result
    /// is stored under [`VALUE_KEY`]. Values that are neither
    /// self-describing, registered nor records are rejected with
    /// [`VariableError::UnsupportedRoot`].
    pub fn convert(&self, value: &dyn Reflect) -> Result<VariableSet> {
        tracing::debug!(type_name = value.type_name(), "converting value to variables");

        if let Some(converted) = self.custom(value)? {
            return Ok(VariableSet::from_variable(converted));
        }
        match value.shape() {
            Shape::Record(record) => Ok(VariableSet::from(self.convert_record(record)?)),
            Shape::Pointer(Some(inner)) => self.convert(inner),
            _ => Err(VariableError::UnsupportedRoot {
                type_name: value.type_name().to_string(),
            }),
        }
    }

    /// Convert any value to a single [`Variable`].
    ///
    /// Never fails on its own: absent values become empty strings and
    /// unrecognized values their text rendering. Errors come only from
    /// self-describing or registered converters.
    pub fn convert_value(&self, value: &dyn Reflect) -> Result<Variable> {
        if let Some(converted) = self.custom(value)? {
            return Ok(converted);
        }

        let converted = match value.shape() {
            Shape::Text(text) => Variable::String(text.into_owned()),
            Shape::Int(n) => Variable::Number(n as f64),
            Shape::Uint(n) => Variable::Number(n as f64),
            Shape::Float(n) => Variable::Number(n),
            Shape::Bool(b) => Variable::Bool(b),
            Shape::Pointer(None) => Variable::default(),
            Shape::Pointer(Some(inner)) => self.convert_value(inner)?,
            Shape::Record(record) => Variable::Map(self.convert_record(record)?),
            Shape::List(items) => Variable::List(
                items
                    .into_iter()
                    .map(|item| self.convert_value(item))
                    .collect::<Result<_>>()?,
            ),
            Shape::Map(entries) => Variable::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| Ok((key, self.convert_value(item)?)))
                    .collect::<Result<_>>()?,
            ),
            Shape::Opaque(text) => {
                tracing::trace!(
                    type_name = value.type_name(),
                    "no converter registered, using text rendering"
                );
                Variable::String(text)
            }
        };
        Ok(converted)
    }

    /// Self-describing conversion first, then the registry.
    fn custom(&self, value: &dyn Reflect) -> Result<Option<Variable>> {
        if let Some(described) = value.describe() {
            return Ok(Some(described?));
        }
        match self.registry.get(value) {
            Some(converter) => Ok(Some(converter.convert(value)?)),
            None => Ok(None),
        }
    }

    fn convert_record(&self, record: &dyn Record) -> Result<VariableMap> {
        let mut out = VariableMap::new();

        for field in record.fields() {
            if !field.exported {
                continue;
            }
            let tag = parse_tag(field.tag.unwrap_or_default());
            if tag.omit {
                continue;
            }
            let name = tag.effective_name(field.name);
            if (tag.omit_empty || self.options.omit_empty) && field.value.is_zero() {
                tracing::trace!(field = name, "omitting empty field");
                continue;
            }

            let value = self.convert_value(field.value)?;
            if tag.flatten {
                place_flattened(&mut out, name, value);
            } else if tag.inline {
                match value {
                    Variable::Map(entries) => out.extend(entries),
                    other => {
                        out.insert(VALUE_KEY.to_string(), other);
                    }
                }
            } else {
                out.insert(name.to_string(), value);
            }
        }

        Ok(out)
    }
}

/// Store every leaf of `value` in `out` under its full path below `name`
/// (`name.key`, `name[i]`). A scalar is stored under `name` itself.
fn place_flattened(out: &mut VariableMap, name: &str, value: Variable) {
    let mut stack = vec![(name.to_string(), value)];

    while let Some((key, node)) = stack.pop() {
        match node {
            Variable::Map(map) => {
                for (child_key, child) in map.into_iter().rev() {
                    stack.push((join_key(&key, &child_key), child));
                }
            }
            Variable::List(items) => {
                for (i, child) in items.into_iter().enumerate().rev() {
                    stack.push((join_index(&key, i), child));
                }
            }
            leaf => {
                out.insert(key, leaf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use crate::reflect::ToVariable;
    use crate::Variables;
    use pretty_assertions::assert_eq;

    #[derive(Variables)]
    pub struct Address {
        pub city: String,
        pub zip: u32,
    }

    #[derive(Variables)]
    pub struct Person {
        pub name: String,
        #[variable("years")]
        pub age: u8,
        #[variable("-")]
        pub secret: String,
        #[variable(",omitempty")]
        pub nickname: String,
        pub address: Option<Address>,
        internal: bool,
    }

    fn person() -> Person {
        Person {
            name: "Ann".to_string(),
            age: 3,
            secret: "hidden".to_string(),
            nickname: String::new(),
            address: Some(Address {
                city: "Oslo".to_string(),
                zip: 150,
            }),
            internal: true,
        }
    }

    #[test]
    fn test_field_walk() {
        let vars = StructConverter::new().convert(&person()).unwrap();
        let keys: Vec<&str> = vars.keys().collect();
        assert_eq!(keys, vec!["name", "years", "address"]);
        assert_eq!(vars.get_string("address.city").as_deref(), Some("Oslo"));
        assert_eq!(vars.get("years"), Some(&Variable::Number(3.0)));
        assert!(person().internal);
    }

    struct Manual {
        shown: u8,
        hidden: u8,
        dropped: u8,
    }

    impl Reflect for Manual {
        fn shape(&self) -> Shape<'_> {
            Shape::Record(self)
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    impl Record for Manual {
        fn fields(&self) -> Vec<crate::reflect::Field<'_>> {
            use crate::reflect::Field;
            vec![
                Field { name: "shown", tag: None, exported: true, value: &self.shown },
                Field { name: "hidden", tag: None, exported: false, value: &self.hidden },
                Field { name: "dropped", tag: Some("-"), exported: true, value: &self.dropped },
            ]
        }
    }

    #[test]
    fn test_hand_written_record_filters_fields() {
        let value = Manual { shown: 1, hidden: 2, dropped: 3 };
        let vars = StructConverter::new().convert(&value).unwrap();
        let keys: Vec<&str> = vars.keys().collect();
        assert_eq!(keys, vec!["shown"]);
    }

    #[test]
    fn test_absent_pointer_is_empty_string() {
        let mut p = person();
        p.address = None;
        let vars = StructConverter::new().convert(&p).unwrap();
        assert_eq!(vars.get("address"), Some(&Variable::from("")));
    }

    #[test]
    fn test_global_omit_empty() {
        let options = ConverterOptions {
            omit_empty: true,
            ..ConverterOptions::default()
        };
        let mut p = person();
        p.age = 0;
        p.address = None;
        let vars = StructConverter::with_options(options).convert(&p).unwrap();
        let keys: Vec<&str> = vars.keys().collect();
        assert_eq!(keys, vec!["name"]);
    }

    #[derive(Variables)]
    pub struct Placement {
        #[variable("meta,flatten")]
        pub meta: Address,
        #[variable("tags,flatten")]
        pub tags: Vec<String>,
        #[variable(",inline")]
        pub extra: Address,
        #[variable(",inline")]
        pub label: String,
    }

    #[test]
    fn test_flatten_and_inline_placement() {
        let value = Placement {
            meta: Address {
                city: "Rome".to_string(),
                zip: 1,
            },
            tags: vec!["a".to_string(), "b".to_string()],
            extra: Address {
                city: "Lima".to_string(),
                zip: 2,
            },
            label: "x".to_string(),
        };
        let vars = StructConverter::new().convert(&value).unwrap();
        let keys: Vec<&str> = vars.keys().collect();
        assert_eq!(
            keys,
            vec!["meta.city", "meta.zip", "tags[0]", "tags[1]", "city", "zip", "value"]
        );
        assert_eq!(vars.get_string("meta.city").as_deref(), Some("Rome"));
        assert_eq!(vars.get_string("tags[1]").as_deref(), Some("b"));
        assert_eq!(vars.get_string("value").as_deref(), Some("x"));
    }

    #[test]
    fn test_flattened_scalar_keeps_name() {
        let mut out = VariableMap::new();
        place_flattened(&mut out, "n", Variable::from(1));
        assert_eq!(out.get("n"), Some(&Variable::from(1)));
    }

    #[derive(Variables)]
    pub struct Collections {
        pub list: Vec<u8>,
        pub map: std::collections::BTreeMap<String, bool>,
    }

    #[test]
    fn test_collections() {
        let value = Collections {
            list: vec![1, 2],
            map: [("b".to_string(), true), ("a".to_string(), false)]
                .into_iter()
                .collect(),
        };
        let vars = StructConverter::new().convert(&value).unwrap();
        assert_eq!(vars.get("list"), Some(&Variable::from([1, 2])));
        assert_eq!(vars.get("map.a"), Some(&Variable::Bool(false)));
        assert_eq!(vars.get_string("list[1]").as_deref(), Some("2"));
    }

    #[test]
    fn test_unsupported_root() {
        let err = StructConverter::new().convert(&42i32).unwrap_err();
        assert!(matches!(err, VariableError::UnsupportedRoot { ref type_name } if type_name == "i32"));
    }

    #[test]
    fn test_registered_converter_for_root() {
        let converter = StructConverter::new();
        converter.registry().register_type::<i32>(
            |_: &dyn Reflect| -> std::result::Result<Variable, ConversionError> {
                Ok(Variable::from("forty-two"))
            },
        );
        let vars = converter.convert(&42i32).unwrap();
        assert_eq!(vars.get_string(VALUE_KEY).as_deref(), Some("forty-two"));
    }

    #[derive(Variables)]
    #[variables(self_describing)]
    pub struct Version {
        pub major: u32,
        pub minor: u32,
    }

    impl ToVariable for Version {
        fn to_variable(&self) -> std::result::Result<Variable, ConversionError> {
            Ok(Variable::from(format!("{}.{}", self.major, self.minor)))
        }
    }

    #[derive(Variables)]
    pub struct Release {
        pub version: Version,
    }

    #[test]
    fn test_self_describing_nested() {
        let release = Release {
            version: Version { major: 1, minor: 4 },
        };
        let vars = StructConverter::new().convert(&release).unwrap();
        assert_eq!(vars.get_string("version").as_deref(), Some("1.4"));
    }

    #[derive(Variables)]
    #[variables(self_describing)]
    pub struct Broken {
        pub x: u8,
    }

    impl ToVariable for Broken {
        fn to_variable(&self) -> std::result::Result<Variable, ConversionError> {
            Err(ConversionError::new("Broken", "always fails"))
        }
    }

    #[derive(Variables)]
    pub struct HoldsBroken {
        pub ok: u8,
        pub items: Vec<Broken>,
    }

    #[test]
    fn test_conversion_error_propagates() {
        let value = HoldsBroken {
            ok: 1,
            items: vec![Broken { x: 0 }],
        };
        let err = StructConverter::new().convert(&value).unwrap_err();
        match err {
            VariableError::Conversion(inner) => assert_eq!(inner.message, "always fails"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_convert_value_scalars() {
        let converter = StructConverter::new();
        assert_eq!(converter.convert_value(&-3i64).unwrap(), Variable::Number(-3.0));
        assert_eq!(converter.convert_value(&'z').unwrap(), Variable::from("z"));
        assert_eq!(
            converter.convert_value(&chrono::NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()).unwrap(),
            Variable::from("2024-05-06")
        );
    }
}
