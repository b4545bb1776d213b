//! Typed config values.
//!
//! A [`ConfigValue`] is what a backup collector produces for one key and what
//! the schema decoder hands back to a restore worker. The text form written
//! into a backup file is produced by [`ConfigValue::render`].

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Number, Value};

use crate::literal;

/// One config value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Text written after `key = ` in a backup file.
    ///
    /// Plain text goes out raw; compound values use the literal form that
    /// [`literal::parse_literal`] reads back.
    pub fn render(&self) -> String {
        match self {
            ConfigValue::Text(text) => text.clone(),
            other => literal::format_literal(other),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ConfigValue::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Empty text, list or map.
    pub fn is_empty(&self) -> bool {
        match self {
            ConfigValue::None => true,
            ConfigValue::Text(text) => text.is_empty(),
            ConfigValue::List(items) => items.is_empty(),
            ConfigValue::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ConfigValue::None,
            Value::Bool(b) => ConfigValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Int(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => ConfigValue::Text(s.clone()),
            Value::Array(items) => ConfigValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => ConfigValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::None => Value::Null,
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::Int(n) => Value::Number((*n).into()),
            ConfigValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            ConfigValue::Text(s) => Value::String(s.clone()),
            ConfigValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ConfigValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(value: Vec<ConfigValue>) -> Self {
        ConfigValue::List(value)
    }
}

impl From<BTreeMap<String, ConfigValue>> for ConfigValue {
    fn from(value: BTreeMap<String, ConfigValue>) -> Self {
        ConfigValue::Map(value)
    }
}

impl From<&Value> for ConfigValue {
    fn from(value: &Value) -> Self {
        ConfigValue::from_json(value)
    }
}
