//! # Typed Parameters
//!
//! Ordered map of named, typed values carried by every message and used as
//! the property bag of actor proxies.
//!
//! Reads go through [`FromParameter`], which reports a [`MessageError`] when a
//! parameter is missing or holds a different kind of value:
//!
//! ```rust
//! use sim_types::{Parameters, MessageError};
//!
//! let mut params = Parameters::new();
//! params.set("speed", 12.5);
//! params.set("name", "truck");
//!
//! let speed: f64 = params.get_as("speed").unwrap();
//! assert_eq!(speed, 12.5);
//! assert!(matches!(
//!     params.get_as::<bool>("name"),
//!     Err(MessageError::ParameterType { .. })
//! ));
//! ```

use crate::{ActorId, MessageError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    ActorId(ActorId),
    Vec3([f64; 3]),
    TextList(Vec<String>),
    Group(Parameters),
    GroupList(Vec<Parameters>),
}

impl ParameterValue {
    /// Human readable kind, used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::Text(_) => "text",
            ParameterValue::ActorId(_) => "actor_id",
            ParameterValue::Vec3(_) => "vec3",
            ParameterValue::TextList(_) => "text_list",
            ParameterValue::Group(_) => "group",
            ParameterValue::GroupList(_) => "group_list",
        }
    }
}

/// Ordered mapping of parameter names to typed values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    values: BTreeMap<String, ParameterValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder form of [`Parameters::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    /// Typed read that fails closed
    pub fn get_as<T: FromParameter>(&self, name: &str) -> Result<T, MessageError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| MessageError::missing(name))?;
        T::from_parameter(name, value)
    }

    /// Typed read of an optional parameter; a missing name is `Ok(None)`,
    /// a kind mismatch is still an error
    pub fn get_optional<T: FromParameter>(&self, name: &str) -> Result<Option<T>, MessageError> {
        match self.values.get(name) {
            Some(value) => T::from_parameter(name, value).map(Some),
            None => Ok(None),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParameterValue> {
        self.values.remove(name)
    }

    /// Copy every parameter of `other` over this one
    pub fn merge(&mut self, other: &Parameters) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Conversion from a stored parameter into a concrete Rust type
pub trait FromParameter: Sized {
    const KIND: &'static str;

    fn from_parameter(name: &str, value: &ParameterValue) -> Result<Self, MessageError>;
}

fn type_error(name: &str, expected: &'static str, value: &ParameterValue) -> MessageError {
    MessageError::ParameterType {
        name: name.to_string(),
        expected,
        found: value.kind(),
    }
}

macro_rules! impl_parameter_conversions {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl From<$ty> for ParameterValue {
            fn from(value: $ty) -> Self {
                ParameterValue::$variant(value)
            }
        }

        impl FromParameter for $ty {
            const KIND: &'static str = $kind;

            fn from_parameter(name: &str, value: &ParameterValue) -> Result<Self, MessageError> {
                match value {
                    ParameterValue::$variant(inner) => Ok(inner.clone()),
                    other => Err(type_error(name, Self::KIND, other)),
                }
            }
        }
    };
}

impl_parameter_conversions!(bool, Bool, "bool");
impl_parameter_conversions!(i64, Int, "int");
impl_parameter_conversions!(String, Text, "text");
impl_parameter_conversions!(ActorId, ActorId, "actor_id");
impl_parameter_conversions!([f64; 3], Vec3, "vec3");
impl_parameter_conversions!(Vec<String>, TextList, "text_list");
impl_parameter_conversions!(Parameters, Group, "group");
impl_parameter_conversions!(Vec<Parameters>, GroupList, "group_list");

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

/// Integers widen to floats on read; the reverse is a type error
impl FromParameter for f64 {
    const KIND: &'static str = "float";

    fn from_parameter(name: &str, value: &ParameterValue) -> Result<Self, MessageError> {
        match value {
            ParameterValue::Float(inner) => Ok(*inner),
            ParameterValue::Int(inner) => Ok(*inner as f64),
            other => Err(type_error(name, Self::KIND, other)),
        }
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(i64::from(value))
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        ParameterValue::Int(i64::from(value))
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_fails_closed() {
        let params = Parameters::new();
        let err = params.get_as::<f64>("speed").unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn test_kind_mismatch_reports_both_kinds() {
        let params = Parameters::new().with("alive", true);
        let err = params.get_as::<String>("alive").unwrap_err();
        assert_eq!(
            err,
            MessageError::ParameterType {
                name: "alive".into(),
                expected: "text",
                found: "bool",
            }
        );
    }

    #[test]
    fn test_int_widens_to_float() {
        let params = Parameters::new().with("count", 3i64);
        assert_eq!(params.get_as::<f64>("count").unwrap(), 3.0);
        let floats = Parameters::new().with("ratio", 0.5);
        assert!(floats.get_as::<i64>("ratio").is_err());
    }

    #[test]
    fn test_optional_read() {
        let params = Parameters::new().with("label", "tower");
        assert_eq!(params.get_optional::<String>("missing").unwrap(), None);
        assert_eq!(
            params.get_optional::<String>("label").unwrap(),
            Some("tower".to_string())
        );
        assert!(params.get_optional::<bool>("label").is_err());
    }

    #[test]
    fn test_merge_overwrites_and_keeps_order() {
        let mut base = Parameters::new().with("b", 1i64).with("a", 1i64);
        let update = Parameters::new().with("b", 2i64).with("c", 3i64);
        base.merge(&update);

        let names: Vec<&str> = base.names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(base.get_as::<i64>("b").unwrap(), 2);
    }

    #[test]
    fn test_nested_groups() {
        let inner = Parameters::new().with("x", 1.0);
        let params = Parameters::new()
            .with("group", inner.clone())
            .with("list", vec![inner.clone(), inner.clone()]);
        assert_eq!(params.get_as::<Parameters>("group").unwrap(), inner);
        assert_eq!(params.get_as::<Vec<Parameters>>("list").unwrap().len(), 2);
    }
}
