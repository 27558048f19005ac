/*
 * serialize.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! JSON/YAML representation of variables.
//!
//! Variables serialize as the plain nested structure they describe: maps as
//! objects, lists as arrays and scalars as native scalars. Deserialization
//! inspects each leaf, so `true`, `3` and `"3"` come back as a bool, a number
//! and a string respectively. A `null` leaf becomes an empty string, the same
//! normalization the struct converter applies to absent values. NaN and the
//! infinities have no representation in either format and fail to
//! serialize.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Error as _, Serialize, Serializer};

use crate::set::VariableSet;
use crate::variable::{Variable, VariableMap};

/// Largest magnitude below which every integral `f64` is an exact integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Serialize for Variable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Variable::String(s) => serializer.serialize_str(s),
            Variable::Number(n) => {
                if !n.is_finite() {
                    return Err(S::Error::custom(format!(
                        "cannot serialize non-finite number {}",
                        n
                    )));
                }
                if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Variable::Bool(b) => serializer.serialize_bool(*b),
            Variable::List(items) => serializer.collect_seq(items),
            Variable::Map(map) => serializer.collect_map(map),
        }
    }
}

impl<'de> Deserialize<'de> for Variable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(VariableVisitor)
    }
}

struct VariableVisitor;

impl<'de> Visitor<'de> for VariableVisitor {
    type Value = Variable;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, number, boolean, sequence or map")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Variable::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Variable::Number(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Variable::Number(v as f64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Variable::Number(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Variable::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
        Ok(Variable::String(v))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Variable::default())
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(Variable::default())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Variable::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Variable::List(items))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = VariableMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Variable>()? {
            map.insert(key, value);
        }
        Ok(Variable::Map(map))
    }
}

impl Serialize for VariableSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for VariableSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let variables = VariableMap::deserialize(deserializer)?;
        Ok(VariableSet::from(variables))
    }
}
