//! Decoding of JSON bodies and lookups into decoded objects.
//!
//! [`Extraction`] mirrors the combined "decode JSON text or index an object"
//! contract the console wrappers rely on; the free functions below are the
//! typed shortcuts most callers actually use.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{HmcError, Result};

const OPERATION: &str = "extract";

/// A single extraction request.
///
/// When both JSON text and an object are supplied, the JSON path runs first;
/// the object path is only consulted when the JSON key was missing and the
/// key is optional.
#[derive(Debug, Clone, Default)]
pub struct Extraction<'a> {
    json_text: Option<&'a str>,
    object: Option<&'a Value>,
    key: Option<&'a str>,
    list_index: Option<usize>,
    optional_key: bool,
}

impl<'a> Extraction<'a> {
    pub fn from_json(text: &'a str) -> Self {
        Extraction {
            json_text: Some(text),
            ..Default::default()
        }
    }

    pub fn from_object(object: &'a Value) -> Self {
        Extraction {
            object: Some(object),
            ..Default::default()
        }
    }

    pub fn json(mut self, text: &'a str) -> Self {
        self.json_text = Some(text);
        self
    }

    pub fn object(mut self, object: &'a Value) -> Self {
        self.object = Some(object);
        self
    }

    pub fn key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    /// Narrow an array-valued result to one element.
    ///
    /// An index past the end logs a warning and yields the whole array.
    pub fn list_index(mut self, index: usize) -> Self {
        self.list_index = Some(index);
        self
    }

    /// A missing key yields `None` instead of an error.
    pub fn optional(mut self) -> Self {
        self.optional_key = true;
        self
    }

    pub fn run(self) -> Result<Option<Value>> {
        if let Some(text) = self.json_text {
            debug!(json = text, "decoding JSON text");
            let decoded = match decode_json(text)? {
                None => return Ok(None),
                Some(decoded) => decoded,
            };
            let Some(key) = self.key else {
                return Ok(Some(decoded));
            };
            match lookup(&decoded, key)? {
                Some(value) => return Ok(Some(value.clone())),
                None if !self.optional_key => {
                    return Err(HmcError::extraction(
                        OPERATION,
                        format!("Key '{key}' should be presented in '{text}' JSON object"),
                    ));
                }
                None => {}
            }
        }

        if let (Some(object), Some(key)) = (self.object, self.key) {
            let Some(value) = lookup(object, key)? else {
                if self.optional_key {
                    return Ok(None);
                }
                return Err(HmcError::extraction(
                    OPERATION,
                    format!("Key '{key}' should be presented in '{object}' object"),
                ));
            };
            return Ok(Some(narrow(value, self.list_index).clone()));
        }

        Ok(None)
    }
}

fn lookup<'v>(object: &'v Value, key: &str) -> Result<Option<&'v Value>> {
    match object {
        Value::Object(map) => Ok(map.get(key)),
        other => Err(HmcError::extraction(
            OPERATION,
            format!("Cannot look up key '{key}' in non-object value '{other}'"),
        )),
    }
}

fn narrow(value: &Value, index: Option<usize>) -> &Value {
    match (value, index) {
        (Value::Array(items), Some(index)) => match items.get(index) {
            Some(item) => item,
            None => {
                warn!(
                    "extract: list index ({}) should be less than {}",
                    index,
                    items.len()
                );
                value
            }
        },
        _ => value,
    }
}

/// Decode a response body. Exactly `""`, `{}` or `[]` mean no content;
/// whitespace-only text is not JSON.
pub fn decode_json(text: &str) -> Result<Option<Value>> {
    if matches!(text, "" | "{}" | "[]") {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| HmcError::extraction(OPERATION, format!("Incorrect JSON object: {text} ({e})")))
}

/// Required value at `key`.
pub fn value_at<'v>(object: &'v Value, key: &str) -> Result<&'v Value> {
    lookup(object, key)?.ok_or_else(|| {
        HmcError::extraction(
            OPERATION,
            format!("Key '{key}' should be presented in '{object}' object"),
        )
    })
}

/// Optional value at `key`; JSON `null` counts as absent.
pub fn optional_value<'v>(object: &'v Value, key: &str) -> Option<&'v Value> {
    match object.get(key) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

pub fn str_at(object: &Value, key: &str) -> Result<String> {
    match value_at(object, key)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(type_mismatch(key, "string", other)),
    }
}

pub fn optional_str(object: &Value, key: &str) -> Option<String> {
    optional_value(object, key).and_then(|v| v.as_str().map(str::to_string))
}

pub fn i64_at(object: &Value, key: &str) -> Result<i64> {
    let value = value_at(object, key)?;
    value
        .as_i64()
        .ok_or_else(|| type_mismatch(key, "integer", value))
}

pub fn bool_at(object: &Value, key: &str) -> Result<bool> {
    let value = value_at(object, key)?;
    value
        .as_bool()
        .ok_or_else(|| type_mismatch(key, "boolean", value))
}

/// Array at `key`; `null` reads as an empty array.
pub fn array_at(object: &Value, key: &str) -> Result<Vec<Value>> {
    match value_at(object, key)? {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        other => Err(type_mismatch(key, "array", other)),
    }
}

fn type_mismatch(key: &str, expected: &str, actual: &Value) -> HmcError {
    HmcError::extraction(
        OPERATION,
        format!("Key '{key}' should hold a {expected}, found '{actual}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_json_means_no_content() {
        assert!(decode_json("").unwrap().is_none());
        assert!(decode_json("{}").unwrap().is_none());
        assert!(decode_json("[]").unwrap().is_none());
    }

    #[test]
    fn test_whitespace_is_not_empty_json() {
        let err = decode_json("   ").unwrap_err();
        assert!(err.to_string().starts_with("Incorrect JSON object"));
        assert_eq!(decode_json(" {} ").unwrap(), Some(json!({})));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = decode_json("{\"name\": ").unwrap_err();
        assert!(err.to_string().starts_with("Incorrect JSON object"));
    }

    #[test]
    fn test_json_key_lookup() {
        let value = Extraction::from_json("{\"cpcs\": [1, 2]}")
            .key("cpcs")
            .run()
            .unwrap();
        assert_eq!(value, Some(json!([1, 2])));
    }

    #[test]
    fn test_missing_optional_key_is_none() {
        let object = json!({"name": "PAR1"});
        let value = Extraction::from_object(&object)
            .key("description")
            .optional()
            .run()
            .unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_missing_required_key_raises() {
        let object = json!({"name": "PAR1"});
        let err = Extraction::from_object(&object)
            .key("description")
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("Key 'description'"));
    }

    #[test]
    fn test_list_index_in_range_narrows() {
        let object = json!({"hmc": ["10.0.0.1", "10.0.0.2"]});
        let value = Extraction::from_object(&object)
            .key("hmc")
            .list_index(1)
            .run()
            .unwrap();
        assert_eq!(value, Some(json!("10.0.0.2")));
    }

    #[test]
    fn test_list_index_out_of_range_returns_whole_list() {
        let object = json!({"hmc": ["10.0.0.1"]});
        let value = Extraction::from_object(&object)
            .key("hmc")
            .list_index(3)
            .run()
            .unwrap();
        assert_eq!(value, Some(json!(["10.0.0.1"])));
    }

    #[test]
    fn test_json_path_takes_precedence() {
        let object = json!({"name": "from-object"});
        let value = Extraction::from_json("{\"name\": \"from-json\"}")
            .object(&object)
            .key("name")
            .run()
            .unwrap();
        assert_eq!(value, Some(json!("from-json")));
    }

    #[test]
    fn test_optional_json_miss_falls_through_to_object() {
        let object = json!({"name": "from-object"});
        let value = Extraction::from_json("{\"other\": 1}")
            .object(&object)
            .key("name")
            .optional()
            .run()
            .unwrap();
        assert_eq!(value, Some(json!("from-object")));
    }

    #[test]
    fn test_typed_helpers() {
        let object = json!({
            "name": "PAR1",
            "ifl-processors": 4,
            "reserve-resources": false,
            "nic-uris": null,
            "ssc-ipv4-gateway": null
        });
        assert_eq!(str_at(&object, "name").unwrap(), "PAR1");
        assert_eq!(i64_at(&object, "ifl-processors").unwrap(), 4);
        assert!(!bool_at(&object, "reserve-resources").unwrap());
        assert!(array_at(&object, "nic-uris").unwrap().is_empty());
        assert!(optional_str(&object, "ssc-ipv4-gateway").is_none());
        assert!(str_at(&object, "ifl-processors").is_err());
    }
}
