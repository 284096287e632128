//! The root configuration document and field extraction.
//!
//! Extraction is by value: every call hands back the extracted field together
//! with the document that no longer contains it. Whatever is left once all
//! named fields have been taken is the passthrough set merged verbatim into the
//! application manifest.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Parsed root configuration blob
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    fields: Map<String, Value>,
}

impl ConfigDocument {
    /// Wraps an already-parsed JSON object
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Parses the root blob; anything but a JSON object is rejected
    pub fn from_json(text: &str) -> Result<Self> {
        match serde_json::from_str(text)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::invalid_field(
                "<root>",
                format!("expected an object, found {}", type_name(&other)),
            )),
        }
    }

    /// Removes `key`, returning its value and the remaining document.
    ///
    /// A `null` value counts as absent.
    pub fn extract(mut self, key: &str) -> (Option<Value>, Self) {
        let value = self.fields.shift_remove(key).filter(|v| !v.is_null());
        (value, self)
    }

    /// Like [`extract`](Self::extract), substituting `default` when absent
    pub fn extract_or(self, key: &str, default: Value) -> (Value, Self) {
        let (value, rest) = self.extract(key);
        (value.unwrap_or(default), rest)
    }

    /// Removes `key` and deserializes it into `T`
    pub fn extract_as<T: DeserializeOwned>(self, key: &str) -> Result<(Option<T>, Self)> {
        let (value, rest) = self.extract(key);
        let typed = value
            .map(|v| {
                serde_json::from_value(v)
                    .map_err(|e| Error::invalid_field(key, e.to_string()))
            })
            .transpose()?;
        Ok((typed, rest))
    }

    /// Returns true if `key` has not been extracted yet
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields not yet extracted
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if every field has been extracted
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields never extracted, in their original order
    pub fn residual(self) -> Map<String, Value> {
        self.fields
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        ConfigDocument::from_json(
            r#"{"entryPagePath":"index.html","pages":["index"],"debug":true,
                "networkTimeout":{"request":1000}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_extract_removes_key() {
        let (value, rest) = doc().extract("entryPagePath");
        assert_eq!(value, Some(json!("index.html")));
        assert!(!rest.contains("entryPagePath"));
        assert_eq!(rest.len(), 3);
    }

    #[test]
    fn test_extract_absent_is_none() {
        let (value, rest) = doc().extract("tabBar");
        assert!(value.is_none());
        assert_eq!(rest.len(), 4);
    }

    #[test]
    fn test_extract_or_default() {
        let (value, _) = doc().extract_or("global", json!({}));
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_null_counts_as_absent() {
        let doc = ConfigDocument::from_json(r#"{"ext":null}"#).unwrap();
        let (value, rest) = doc.extract("ext");
        assert!(value.is_none());
        assert!(rest.is_empty());
    }

    #[test]
    fn test_residual_preserves_order() {
        let (_, rest) = doc().extract("pages");
        let (_, rest) = rest.extract("entryPagePath");
        let keys: Vec<_> = rest.residual().keys().cloned().collect();
        assert_eq!(keys, vec!["debug", "networkTimeout"]);
    }

    #[test]
    fn test_extract_as_typed() {
        let (pages, _) = doc().extract_as::<Vec<String>>("pages").unwrap();
        assert_eq!(pages, Some(vec!["index".to_string()]));

        let err = doc().extract_as::<Vec<String>>("debug").unwrap_err();
        assert!(err.to_string().contains("invalid field 'debug'"));
    }

    #[test]
    fn test_non_object_root_rejected() {
        assert!(ConfigDocument::from_json("[1,2]").is_err());
        assert!(ConfigDocument::from_json("{").is_err());
    }
}
